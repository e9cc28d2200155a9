//! # Spec Walker / Command Builder
//!
//! Walks every `(path, verb)` operation of the loaded spec and produces one
//! [`Command`] per operation, grouped by the operation's single tag. The
//! full graph is built first, watchers are validated against it, and only
//! then is everything sorted for deterministic emission.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use oas3::spec::{ObjectOrReference, Operation, Parameter as SpecParameter, ParameterIn};
use oas3::OpenApiV3Spec;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::extensions;
use super::watcher::{extract_watcher_properties, validate_all_watchers};
use crate::docs;
use crate::model::{
    Command, CommandVersion, Group, HttpVerb, Parameter, ParameterKind, ParameterType,
    RequestParameters,
};
use crate::spec::SpecDocument;
use crate::version::{self, Version};

static CONTENT_TYPE_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^application/vnd\.atlas\.(?P<version>[^+]+)\+(?P<contentType>[\w]+)$")
        .expect("content type regex should be valid")
});

/// Build the full, sorted command tree from a spec.
///
/// `now` drives sunset filtering; it is a parameter instead of the wall
/// clock so the transformation stays pure and reproducible.
pub fn spec_to_commands(now: NaiveDate, doc: &SpecDocument) -> anyhow::Result<Vec<Group>> {
    let spec = &doc.spec;
    let mut groups: HashMap<String, Group> = HashMap::new();

    if let Some(paths) = spec.paths.as_ref() {
        for (path, item) in paths {
            for (method, operation) in item.methods() {
                let ref_extensions = doc.parameter_ref_extensions(path, method.as_str());
                let command = operation_to_command(now, spec, path, &method, operation, ref_extensions)
                    .with_context(|| format!("failed to convert operation to command: {method} {path}"))?;
                let Some(command) = command else {
                    continue;
                };

                if operation.tags.len() != 1 {
                    bail!(
                        "expect every operation to have exactly 1 tag, got: {} ({method} {path})",
                        operation.tags.len()
                    );
                }

                let tag = &operation.tags[0];
                if !groups.contains_key(tag) {
                    groups.insert(tag.clone(), group_for_tag(spec, tag)?);
                }
                if let Some(group) = groups.get_mut(tag) {
                    group.commands.push(command);
                }
            }
        }
    }

    // A watcher may reference any command regardless of build order, so the
    // whole-graph pass runs only once the tree is complete.
    validate_all_watchers(&groups)?;

    let mut sorted: Vec<Group> = groups.into_values().collect();
    for group in &mut sorted {
        group
            .commands
            .sort_by(|a, b| a.operation_id.cmp(&b.operation_id));
    }
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sorted)
}

fn group_for_tag(spec: &OpenApiV3Spec, tag: &str) -> anyhow::Result<Group> {
    let description = spec
        .tags
        .iter()
        .find(|t| t.name == tag)
        .and_then(|t| t.description.as_deref())
        .map(docs::clean)
        .transpose()
        .context("failed to clean description")?
        .unwrap_or_default();

    Ok(Group {
        name: tag.to_string(),
        description,
        commands: Vec::new(),
    })
}

fn operation_to_command(
    now: NaiveDate,
    spec: &OpenApiV3Spec,
    path: &str,
    method: &http::Method,
    operation: &Operation,
    ref_extensions: Option<&[BTreeMap<String, Value>]>,
) -> anyhow::Result<Option<Command>> {
    let ext = extensions::operation_extensions(&operation.extensions);
    if ext.skip {
        return Ok(None);
    }

    let operation_id = ext
        .operation_id
        .or_else(|| operation.operation_id.clone())
        .unwrap_or_default();

    let verb = HttpVerb::from_method(method)?;
    let parameters = extract_parameters(spec, &operation.parameters, ref_extensions)?;
    let versions = build_versions(now, operation)?;

    // No surviving version means no currently-valid wire contract.
    if versions.is_empty() {
        return Ok(None);
    }

    let description = operation.description.clone().unwrap_or_default();
    let description = extensions::description_override(&operation.extensions).unwrap_or(description);
    let description = docs::clean(&description).context("failed to clean description")?;

    let watcher = extract_watcher_properties(&operation.extensions)?;

    Ok(Some(Command {
        operation_id,
        short_operation_id: ext.short_operation_id,
        aliases: ext.aliases,
        description,
        request_parameters: RequestParameters {
            url: path.to_string(),
            verb,
            query_parameters: parameters.query,
            url_parameters: parameters.url,
        },
        versions,
        watcher,
    }))
}

/// Query and path parameters of one operation, already split.
struct ParameterSet {
    query: Vec<Parameter>,
    url: Vec<Parameter>,
}

fn resolve_parameter_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a SpecParameter> {
    let name = ref_path.strip_prefix("#/components/parameters/")?;
    spec.components
        .as_ref()?
        .parameters
        .get(name)
        .and_then(|param_ref| match param_ref {
            ObjectOrReference::Object(param) => Some(param),
            _ => None,
        })
}

fn extract_parameters(
    spec: &OpenApiV3Spec,
    parameters: &[ObjectOrReference<SpecParameter>],
    ref_extensions: Option<&[BTreeMap<String, Value>]>,
) -> anyhow::Result<ParameterSet> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    let mut query = Vec::new();
    let mut url = Vec::new();

    for (index, parameter_ref) in parameters.iter().enumerate() {
        let parameter = match parameter_ref {
            ObjectOrReference::Object(parameter) => parameter,
            ObjectOrReference::Ref { ref_path, .. } => resolve_parameter_ref(spec, ref_path)
                .with_context(|| format!("unresolvable parameter reference: {ref_path}"))?,
        };

        // Extensions written beside the `$ref` take priority over the ones
        // on the referenced parameter itself.
        let ref_ext = ref_extensions.and_then(|exts| exts.get(index));

        let override_source = ref_ext
            .filter(|ext| extensions::overrides(ext).is_some())
            .unwrap_or(&parameter.extensions);
        let name =
            extensions::name_override(override_source).unwrap_or_else(|| parameter.name.clone());
        let description = extensions::description_override(override_source)
            .or_else(|| parameter.description.clone())
            .unwrap_or_default();

        let mut parameter_ext = extensions::ParameterExtensions::default();
        if let Some(ref_ext) = ref_ext {
            parameter_ext.merge(ref_ext);
        }
        parameter_ext.merge(&parameter.extensions);

        // Parameters become flags; duplicates must be resolved by
        // customization if they ever appear.
        if names.contains(&name) {
            bail!("parameter with the name '{name}' already exists");
        }

        let description = docs::clean(&description).context("failed to clean description")?;
        let param_type = parameter_type(spec, parameter)
            .with_context(|| format!("failed to resolve type of parameter '{name}'"))?;

        let out = Parameter {
            name: name.clone(),
            short: parameter_ext.short,
            description,
            required: parameter.required.unwrap_or(false),
            param_type,
            aliases: parameter_ext.aliases,
        };

        match parameter.location {
            ParameterIn::Query => {
                query.push(out);
                names.insert(name);
            }
            ParameterIn::Path => {
                url.push(out);
                names.insert(name);
            }
            ref location => bail!("invalid parameter 'in' location: {location:?}"),
        }
    }

    Ok(ParameterSet { query, url })
}

fn parameter_schema_value(
    spec: &OpenApiV3Spec,
    parameter: &SpecParameter,
) -> anyhow::Result<Value> {
    let schema = parameter
        .schema
        .as_ref()
        .context("parameter schema is missing")?;
    let mut value = match schema {
        ObjectOrReference::Object(schema) => {
            serde_json::to_value(schema).context("failed to serialize parameter schema")?
        }
        ObjectOrReference::Ref { ref_path, .. } => {
            let schema = resolve_schema_ref(spec, ref_path)
                .with_context(|| format!("unresolvable schema reference: {ref_path}"))?;
            serde_json::to_value(schema).context("failed to serialize parameter schema")?
        }
    };
    expand_schema_refs(spec, &mut value);
    Ok(value)
}

fn resolve_schema_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::ObjectSchema> {
    let name = ref_path.strip_prefix("#/components/schemas/")?;
    spec.components
        .as_ref()?
        .schemas
        .get(name)
        .and_then(|schema_ref| match schema_ref {
            ObjectOrReference::Object(schema) => Some(schema),
            _ => None,
        })
}

/// Replace every `$ref` in a serialized schema with its resolved target.
fn expand_schema_refs(spec: &OpenApiV3Spec, value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(Value::as_str) {
                if let Some(schema) = resolve_schema_ref(spec, ref_path) {
                    if let Ok(mut new_val) = serde_json::to_value(schema) {
                        expand_schema_refs(spec, &mut new_val);
                        *value = new_val;
                        return;
                    }
                }
            }
            for v in obj.values_mut() {
                expand_schema_refs(spec, v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_schema_refs(spec, v);
            }
        }
        _ => {}
    }
}

fn parameter_type(spec: &OpenApiV3Spec, parameter: &SpecParameter) -> anyhow::Result<ParameterType> {
    let schema = parameter_schema_value(spec, parameter)?;

    // Arrays unwrap one level to their element type.
    if schema.get("type").and_then(Value::as_str) == Some("array") {
        let items = schema.get("items").context("array items schema is missing")?;
        let kind = resolve_scalar_type(items).context("failed to resolve array item type")?;
        return Ok(ParameterType {
            kind,
            is_array: true,
        });
    }

    let kind = resolve_scalar_type(&schema)?;
    Ok(ParameterType {
        kind,
        is_array: false,
    })
}

/// Resolve a schema to a basic scalar kind.
///
/// `oneOf`/`anyOf` resolve recursively to the first branch that yields a
/// basic type; anything else is unsupported.
fn resolve_scalar_type(schema: &Value) -> anyhow::Result<ParameterKind> {
    for combinator in ["oneOf", "anyOf"] {
        if let Some(branches) = schema.get(combinator).and_then(Value::as_array) {
            for branch in branches {
                if let Ok(kind) = resolve_scalar_type(branch) {
                    return Ok(kind);
                }
            }
            bail!("no valid basic type found in oneOf/anyOf");
        }
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("string") => Ok(ParameterKind::String),
        Some("integer") => Ok(ParameterKind::Int),
        Some("boolean") => Ok(ParameterKind::Bool),
        other => bail!("unsupported type: {}", other.unwrap_or("<none>")),
    }
}

/// Build the per-version wire contracts of one operation.
pub(crate) fn build_versions(
    now: NaiveDate,
    operation: &Operation,
) -> anyhow::Result<Vec<CommandVersion>> {
    let mut versions: HashMap<String, CommandVersion> = HashMap::new();

    process_responses(operation, &mut versions)?;
    process_request_body(operation, &mut versions)?;

    if operation.deprecated == Some(true) {
        for version in versions.values_mut() {
            version.deprecated = true;
        }
    }

    // A sunset strictly before "now" removes the version from the output.
    versions.retain(|_, version| !version.sunset.is_some_and(|sunset| sunset < now));

    Ok(sort_versions(versions))
}

fn process_responses(
    operation: &Operation,
    versions: &mut HashMap<String, CommandVersion>,
) -> anyhow::Result<()> {
    let Some(responses) = operation.responses.as_ref() else {
        return Ok(());
    };

    for (status_string, response_ref) in responses {
        let status: u16 = status_string
            .parse()
            .with_context(|| format!("http status code '{status_string}' is not numeric"))?;

        if !(200..300).contains(&status) {
            continue;
        }

        if let ObjectOrReference::Object(response) = response_ref {
            for (versioned_content_type, media) in &response.content {
                add_content_type_to_version(versioned_content_type, versions, &media.extensions, false)?;
            }
        }
    }
    Ok(())
}

fn process_request_body(
    operation: &Operation,
    versions: &mut HashMap<String, CommandVersion>,
) -> anyhow::Result<()> {
    let Some(ObjectOrReference::Object(request_body)) = operation.request_body.as_ref() else {
        return Ok(());
    };

    for (versioned_content_type, media) in &request_body.content {
        if media.schema.is_none() {
            continue;
        }
        add_content_type_to_version(versioned_content_type, versions, &media.extensions, true)?;
    }
    Ok(())
}

pub(crate) fn add_content_type_to_version(
    versioned_content_type: &str,
    versions: &mut HashMap<String, CommandVersion>,
    media_extensions: &BTreeMap<String, Value>,
    is_request: bool,
) -> anyhow::Result<()> {
    let (version, content_type) = extract_version_and_content_type(versioned_content_type)
        .with_context(|| format!("unsupported version {versioned_content_type:?}"))?;

    let sunset = extensions::sunset_date(media_extensions);
    let public_preview = extensions::public_preview(media_extensions);

    let entry = versions
        .entry(version.to_string())
        .or_insert_with(|| CommandVersion {
            version,
            deprecated: false,
            sunset: None,
            public_preview: false,
            request_content_type: None,
            response_content_types: Vec::new(),
        });

    // The earliest sunset across all contributing content types wins, and a
    // sunset planned at all marks the version deprecated.
    if let Some(sunset) = sunset {
        if entry.sunset.map_or(true, |current| sunset < current) {
            entry.sunset = Some(sunset);
        }
        entry.deprecated = true;
    }

    if public_preview == Some(true) {
        entry.public_preview = true;
    }

    if is_request {
        if entry.request_content_type.is_some() {
            bail!("multiple request content types is not supported");
        }
        entry.request_content_type = Some(content_type);
    } else {
        entry.response_content_types.push(content_type);
    }

    Ok(())
}

fn sort_versions(versions: HashMap<String, CommandVersion>) -> Vec<CommandVersion> {
    let mut out: Vec<CommandVersion> = versions
        .into_values()
        .map(|mut version| {
            version.response_content_types.sort();
            version
        })
        .collect();

    out.sort_by(|a, b| version::compare(&a.version, &b.version));
    out
}

/// Split a `application/vnd.atlas.<version>+<contentType>` header.
///
/// This parse is the only production source of `(Version, contentType)`
/// pairs.
pub fn extract_version_and_content_type(input: &str) -> anyhow::Result<(Version, String)> {
    let captures = CONTENT_TYPE_HEADER_REGEX
        .captures(input)
        .with_context(|| format!("invalid content type header: {input}"))?;

    let version_string = &captures["version"];
    let content_type = &captures["contentType"];

    let version: Version = version_string
        .parse()
        .context("invalid version")?;

    Ok((version, content_type.to_string()))
}
