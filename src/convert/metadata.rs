//! # Metadata Extractor
//!
//! Independent walk over the spec producing per-operation docs metadata:
//! flag usage strings plus per-version example invocations. Unlike the
//! command builder this pipeline never validates across operations; the
//! only hard errors are malformed version strings and a missing default
//! version.

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use oas3::spec::{ObjectOrReference, Operation, Parameter as SpecParameter};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use tracing::warn;

use super::commands::extract_version_and_content_type;
use super::extensions;
use crate::model::{Example, Metadata, OperationMetadata, ParameterMetadata};
use crate::version::Version;

/// Build the docs metadata map for every operation of the spec.
pub fn spec_to_metadata(now: NaiveDate, spec: &OpenApiV3Spec) -> anyhow::Result<Metadata> {
    let mut metadata: Metadata = BTreeMap::new();

    if let Some(paths) = spec.paths.as_ref() {
        for (path, item) in paths {
            for (method, operation) in item.methods() {
                let operation_metadata = extract_metadata(now, spec, &method, operation)
                    .with_context(|| format!("failed to extract example: {method} {path}"))?;
                let operation_id = operation.operation_id.clone().unwrap_or_default();
                metadata.insert(operation_id, operation_metadata);
            }
        }
    }

    Ok(metadata)
}

fn extract_metadata(
    now: NaiveDate,
    spec: &OpenApiV3Spec,
    method: &http::Method,
    operation: &Operation,
) -> anyhow::Result<OperationMetadata> {
    let parameters = resolve_parameters(spec, operation)?;

    let parameter_metadata = parameters
        .iter()
        .map(|parameter| {
            (
                parameter.name.clone(),
                ParameterMetadata {
                    usage: parameter.description.clone().unwrap_or_default(),
                },
            )
        })
        .collect();

    let request_body_examples = extract_request_body_examples(now, operation)?;
    let parameter_examples = extract_parameter_examples(&parameters);

    let examples = build_examples(
        &request_body_examples,
        &parameter_examples,
        method,
        operation,
        &parameters,
    )?;

    Ok(OperationMetadata {
        parameters: parameter_metadata,
        examples,
    })
}

fn resolve_parameters<'a>(
    spec: &'a OpenApiV3Spec,
    operation: &'a Operation,
) -> anyhow::Result<Vec<&'a SpecParameter>> {
    operation
        .parameters
        .iter()
        .map(|parameter_ref| match parameter_ref {
            ObjectOrReference::Object(parameter) => Ok(parameter),
            ObjectOrReference::Ref { ref_path, .. } => ref_path
                .strip_prefix("#/components/parameters/")
                .and_then(|name| spec.components.as_ref()?.parameters.get(name))
                .and_then(|resolved| match resolved {
                    ObjectOrReference::Object(parameter) => Some(parameter),
                    _ => None,
                })
                .with_context(|| format!("unresolvable parameter reference: {ref_path}")),
        })
        .collect()
}

/// A named example object as it appears in `examples` maps.
#[derive(Debug, Default, Clone)]
struct NamedExample {
    summary: String,
    description: String,
    value: Value,
}

/// The `example`/`examples` pair of one parameter or media type.
#[derive(Debug, Default, Clone)]
struct ExtractedExamples {
    example: Option<Value>,
    named: BTreeMap<String, NamedExample>,
}

/// Read `example` and `examples` out of a serialized spec object.
///
/// Going through `serde_json::Value` keeps this tolerant of the two wire
/// shapes (`example` scalar vs `examples` map) without leaning on the
/// exact enum the spec library models them with.
fn examples_from_value(value: &Value) -> ExtractedExamples {
    let example = value.get("example").filter(|v| !v.is_null()).cloned();

    let mut named = BTreeMap::new();
    if let Some(examples) = value.get("examples").and_then(Value::as_object) {
        for (name, example_object) in examples {
            let Some(example_object) = example_object.as_object() else {
                continue;
            };
            if example_object.contains_key("$ref") {
                continue;
            }
            named.insert(
                name.clone(),
                NamedExample {
                    summary: example_object
                        .get("summary")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    description: example_object
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    value: example_object.get("value").cloned().unwrap_or(Value::Null),
                },
            );
        }
    }

    ExtractedExamples { example, named }
}

fn extract_parameter_examples(
    parameters: &[&SpecParameter],
) -> BTreeMap<String, ExtractedExamples> {
    let mut result = BTreeMap::new();

    for parameter in parameters {
        let serialized = serde_json::to_value(parameter).unwrap_or(Value::Null);
        let mut examples = examples_from_value(&serialized);

        // The schema-level example is the fallback default.
        if examples.example.is_none() {
            examples.example = serialized
                .get("schema")
                .and_then(|schema| schema.get("example"))
                .filter(|v| !v.is_null())
                .cloned();
        }

        result.insert(parameter.name.clone(), examples);
    }

    result
}

fn extract_request_body_examples(
    now: NaiveDate,
    operation: &Operation,
) -> anyhow::Result<BTreeMap<String, ExtractedExamples>> {
    let mut results = BTreeMap::new();

    let Some(ObjectOrReference::Object(request_body)) = operation.request_body.as_ref() else {
        return Ok(results);
    };

    for (versioned_content_type, media) in &request_body.content {
        let (version, _) = extract_version_and_content_type(versioned_content_type)
            .with_context(|| format!("unsupported version {versioned_content_type:?}"))?;

        if should_ignore_version(&version, extensions::sunset_date(&media.extensions), now) {
            continue;
        }

        let serialized = serde_json::to_value(media).unwrap_or(Value::Null);
        results.insert(version.to_string(), examples_from_value(&serialized));
    }

    Ok(results)
}

/// Preview versions and versions already sunset carry no documented
/// examples.
fn should_ignore_version(version: &Version, sunset: Option<NaiveDate>, now: NaiveDate) -> bool {
    matches!(version, Version::Preview) || sunset.is_some_and(|sunset| sunset < now)
}

fn extract_default_version(operation: &Operation) -> anyhow::Result<String> {
    let Some(responses) = operation.responses.as_ref() else {
        bail!("default version not found");
    };

    let default_response = responses
        .iter()
        .find(|(status, _)| {
            status
                .parse::<u16>()
                .is_ok_and(|code| (200..300).contains(&code))
        })
        .map(|(_, response)| response);

    let Some(ObjectOrReference::Object(response)) = default_response else {
        bail!("default version not found");
    };

    let mut default_version = String::new();
    for versioned_content_type in response.content.keys() {
        let (version, _) = extract_version_and_content_type(versioned_content_type)
            .with_context(|| format!("unsupported version {versioned_content_type:?}"))?;
        default_version = version.to_string();
    }

    Ok(default_version)
}

fn required_flag_names(parameters: &[&SpecParameter]) -> BTreeMap<String, bool> {
    parameters
        .iter()
        .map(|parameter| {
            (
                parameter.name.clone(),
                parameter.required.unwrap_or(false),
            )
        })
        .collect()
}

fn extract_flag_value(
    key: &str,
    flag_name: &str,
    examples: &ExtractedExamples,
    required: bool,
) -> String {
    if key != "-" {
        if let Some(named) = examples.named.get(key) {
            return to_value_string(&named.value);
        }
    }
    if let Some(example) = examples.example.as_ref() {
        return to_value_string(example);
    }
    if required {
        return format!("[{flag_name}]");
    }
    String::new()
}

fn flags_for_key(
    key: &str,
    parameter_examples: &BTreeMap<String, ExtractedExamples>,
    required: &BTreeMap<String, bool>,
) -> BTreeMap<String, String> {
    let mut flags = BTreeMap::new();
    for (flag_name, flag_examples) in parameter_examples {
        let value = extract_flag_value(
            key,
            flag_name,
            flag_examples,
            required.get(flag_name).copied().unwrap_or(false),
        );
        if !value.is_empty() {
            flags.insert(flag_name.clone(), value);
        }
    }
    flags
}

fn build_examples(
    request_body_examples: &BTreeMap<String, ExtractedExamples>,
    parameter_examples: &BTreeMap<String, ExtractedExamples>,
    method: &http::Method,
    operation: &Operation,
    parameters: &[&SpecParameter],
) -> anyhow::Result<BTreeMap<String, Vec<Example>>> {
    let required = required_flag_names(parameters);

    let mut examples = if request_body_examples.is_empty() {
        build_examples_without_body(parameter_examples, &required, method, operation)?
    } else {
        build_examples_with_body(request_body_examples, parameter_examples, &required)
    };

    // Sorted by example source so regeneration never reorders output.
    for version_examples in examples.values_mut() {
        version_examples.sort_by(|a, b| a.source.cmp(&b.source));
    }
    Ok(examples)
}

fn build_examples_without_body(
    parameter_examples: &BTreeMap<String, ExtractedExamples>,
    required: &BTreeMap<String, bool>,
    method: &http::Method,
    operation: &Operation,
) -> anyhow::Result<BTreeMap<String, Vec<Example>>> {
    // Mutating verbs without body examples get no generated invocation.
    if *method == http::Method::POST || *method == http::Method::PUT {
        return Ok(BTreeMap::new());
    }

    let default_version = extract_default_version(operation)?;

    let mut all_keys: Vec<String> = Vec::new();
    if parameter_examples
        .values()
        .any(|examples| examples.example.is_some())
    {
        all_keys.push("-".to_string());
    }
    for examples in parameter_examples.values() {
        for key in examples.named.keys() {
            if !all_keys.contains(key) {
                all_keys.push(key.clone());
            }
        }
    }

    let mut out: BTreeMap<String, Vec<Example>> = BTreeMap::new();
    for key in all_keys {
        let mut example = Example {
            source: key.clone(),
            name: String::new(),
            description: String::new(),
            value: String::new(),
            flags: flags_for_key(&key, parameter_examples, required),
        };

        for flag_examples in parameter_examples.values() {
            if let Some(named) = flag_examples.named.get(&key) {
                if example.name.is_empty() && !named.summary.is_empty() {
                    example.name = named.summary.clone();
                }
                if example.description.is_empty() && !named.description.is_empty() {
                    example.description = named.description.clone();
                }
            }
        }

        out.entry(default_version.clone()).or_default().push(example);
    }

    Ok(out)
}

fn build_examples_with_body(
    request_body_examples: &BTreeMap<String, ExtractedExamples>,
    parameter_examples: &BTreeMap<String, ExtractedExamples>,
    required: &BTreeMap<String, bool>,
) -> BTreeMap<String, Vec<Example>> {
    let mut out: BTreeMap<String, Vec<Example>> = BTreeMap::new();

    for (version, body_examples) in request_body_examples {
        if let Some(example_value) = body_examples.example.as_ref() {
            out.entry(version.clone()).or_default().push(Example {
                source: "-".to_string(),
                name: String::new(),
                description: String::new(),
                value: to_value_string(example_value),
                flags: flags_for_key("-", parameter_examples, required),
            });
        }

        for (example_name, body_example) in &body_examples.named {
            out.entry(version.clone()).or_default().push(Example {
                source: example_name.clone(),
                name: body_example.summary.clone(),
                description: body_example.description.clone(),
                value: to_value_string(&body_example.value),
                flags: flags_for_key(example_name, parameter_examples, required),
            });
        }
    }

    out
}

/// Render an example value the way it should appear in docs: scalars
/// verbatim, containers pretty-printed JSON, empties as empty strings.
fn to_value_string(data: &Value) -> String {
    match data {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) if map.is_empty() => String::new(),
        Value::Array(arr) if arr.is_empty() => String::new(),
        Value::Object(_) | Value::Array(_) => match serde_json::to_string_pretty(data) {
            Ok(json) => json,
            Err(_) => {
                warn!("unable to convert to JSON string");
                String::new()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn operation(value: Value) -> Operation {
        serde_json::from_value(value).unwrap()
    }

    fn empty_spec() -> OpenApiV3Spec {
        serde_json::from_value(json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {}
        }))
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    #[test]
    fn test_to_value_string() {
        assert_eq!(to_value_string(&Value::Null), "");
        assert_eq!(to_value_string(&json!("32b6e34b3d91647abb20e7b8")), "32b6e34b3d91647abb20e7b8");
        assert_eq!(to_value_string(&json!(true)), "true");
        assert_eq!(to_value_string(&json!(8080)), "8080");
        assert_eq!(to_value_string(&json!({})), "");
        assert_eq!(to_value_string(&json!([])), "");
        assert_eq!(
            to_value_string(&json!({"name": "test"})),
            "{\n  \"name\": \"test\"\n}"
        );
    }

    #[test]
    fn test_parameter_metadata_and_flag_placeholders() {
        let spec = empty_spec();
        let op = operation(json!({
            "operationId": "listClusters",
            "parameters": [
                {
                    "name": "groupId",
                    "in": "path",
                    "required": true,
                    "description": "Project identifier.",
                    "schema": {"type": "string"}
                },
                {
                    "name": "envelope",
                    "in": "query",
                    "description": "Wrap the response.",
                    "schema": {"type": "boolean", "example": false}
                }
            ],
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {"application/vnd.atlas.2023-01-01+json": {}}
                }
            }
        }));

        let metadata = extract_metadata(today(), &spec, &http::Method::GET, &op).unwrap();
        assert_eq!(metadata.parameters["groupId"].usage, "Project identifier.");
        assert_eq!(metadata.parameters["envelope"].usage, "Wrap the response.");

        // One "-" example keyed by the default (only) response version,
        // with the schema-level example and a placeholder for the
        // example-less required flag.
        let examples = &metadata.examples["2023-01-01"];
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].source, "-");
        assert_eq!(examples[0].flags["groupId"], "[groupId]");
        assert_eq!(examples[0].flags["envelope"], "false");
    }

    #[test]
    fn test_no_body_named_parameter_examples() {
        let spec = empty_spec();
        let op = operation(json!({
            "operationId": "getCluster",
            "parameters": [
                {
                    "name": "groupId",
                    "in": "path",
                    "required": true,
                    "schema": {"type": "string"},
                    "examples": {
                        "basic": {
                            "summary": "Basic run",
                            "description": "Fetch one cluster.",
                            "value": "32b6e34b3d91647abb20e7b8"
                        }
                    }
                }
            ],
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {"application/vnd.atlas.2024-08-05+json": {}}
                }
            }
        }));

        let metadata = extract_metadata(today(), &spec, &http::Method::GET, &op).unwrap();
        let examples = &metadata.examples["2024-08-05"];
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].source, "basic");
        assert_eq!(examples[0].name, "Basic run");
        assert_eq!(examples[0].description, "Fetch one cluster.");
        assert_eq!(examples[0].flags["groupId"], "32b6e34b3d91647abb20e7b8");
    }

    #[test]
    fn test_post_without_body_examples_yields_none() {
        let spec = empty_spec();
        let op = operation(json!({
            "operationId": "createCluster",
            "responses": {
                "201": {
                    "description": "Created",
                    "content": {"application/vnd.atlas.2023-01-01+json": {}}
                }
            }
        }));

        let metadata = extract_metadata(today(), &spec, &http::Method::POST, &op).unwrap();
        assert!(metadata.examples.is_empty());
    }

    #[test]
    fn test_request_body_examples_grouped_by_version() {
        let spec = empty_spec();
        let op = operation(json!({
            "operationId": "createCluster",
            "requestBody": {
                "content": {
                    "application/vnd.atlas.2024-08-05+json": {
                        "schema": {"type": "object"},
                        "examples": {
                            "ZCluster": {"summary": "Z", "value": {"name": "z"}},
                            "ACluster": {"summary": "A", "value": {"name": "a"}}
                        }
                    },
                    "application/vnd.atlas.preview+json": {
                        "schema": {"type": "object"},
                        "example": {"name": "p"}
                    }
                }
            },
            "responses": {}
        }));

        let metadata = extract_metadata(today(), &spec, &http::Method::POST, &op).unwrap();
        // Preview request-body versions are ignored.
        assert_eq!(metadata.examples.len(), 1);
        let examples = &metadata.examples["2024-08-05"];
        let sources: Vec<&str> = examples.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["ACluster", "ZCluster"]);
        assert_eq!(examples[0].name, "A");
        assert!(examples[0].value.contains("\"name\": \"a\""));
    }

    #[test]
    fn test_sunset_request_body_version_is_ignored() {
        let spec = empty_spec();
        let op = operation(json!({
            "operationId": "createCluster",
            "requestBody": {
                "content": {
                    "application/vnd.atlas.2023-01-01+json": {
                        "schema": {"type": "object"},
                        "example": {"name": "old"},
                        "x-sunset": "2024-01-01"
                    }
                }
            },
            "responses": {}
        }));

        let metadata = extract_metadata(today(), &spec, &http::Method::POST, &op).unwrap();
        assert!(metadata.examples.is_empty());
    }

    #[test]
    fn test_missing_default_version_is_an_error() {
        let spec = empty_spec();
        let op = operation(json!({
            "operationId": "getCluster",
            "parameters": [
                {
                    "name": "groupId",
                    "in": "path",
                    "schema": {"type": "string", "example": "32b6e34b3d91647abb20e7b8"}
                }
            ],
            "responses": {"404": {"description": "missing"}}
        }));

        let err = extract_metadata(today(), &spec, &http::Method::GET, &op).unwrap_err();
        assert!(err.to_string().contains("default version not found"));
    }

    #[test]
    fn test_spec_to_metadata_keys_by_operation_id() {
        let spec: OpenApiV3Spec = serde_json::from_value(json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {
                "/api/atlas/v2/groups": {
                    "get": {
                        "operationId": "listGroups",
                        "tags": ["Projects"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": {"application/vnd.atlas.2023-01-01+json": {}}
                            }
                        }
                    }
                }
            }
        }))
        .unwrap();

        let metadata = spec_to_metadata(today(), &spec).unwrap();
        assert!(metadata.contains_key("listGroups"));
    }
}
