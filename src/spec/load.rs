use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use oas3::OpenApiV3Spec;
use serde_json::Value;

/// Extensions written beside a parameter `$ref`, keyed by `(path, verb)`
/// and aligned by index with the operation's `parameters` array.
pub type ParameterRefExtensions = BTreeMap<(String, String), Vec<BTreeMap<String, Value>>>;

/// A parsed spec plus the extension data the typed model drops.
///
/// The typed parser discards sibling keys of `$ref`, so `x-` extensions
/// written next to a parameter reference are collected from the raw
/// document before the typed parse and kept alongside it.
#[derive(Debug)]
pub struct SpecDocument {
    pub spec: OpenApiV3Spec,
    parameter_ref_extensions: ParameterRefExtensions,
}

impl SpecDocument {
    /// Build from an already-parsed raw document.
    pub fn from_raw(mut value: Value) -> anyhow::Result<Self> {
        strip_unknown_verbs(&mut value);
        let parameter_ref_extensions = collect_parameter_ref_extensions(&value);
        let spec: OpenApiV3Spec =
            serde_json::from_value(value).context("spec does not match the OpenAPI 3 model")?;
        Ok(Self {
            spec,
            parameter_ref_extensions,
        })
    }

    /// Extensions beside the parameter `$ref`s of one operation, aligned by
    /// index with its `parameters` array.
    pub fn parameter_ref_extensions(
        &self,
        path: &str,
        verb: &str,
    ) -> Option<&[BTreeMap<String, Value>]> {
        self.parameter_ref_extensions
            .get(&(path.to_string(), verb.to_ascii_lowercase()))
            .map(Vec::as_slice)
    }
}

fn collect_parameter_ref_extensions(value: &Value) -> ParameterRefExtensions {
    let mut out = ParameterRefExtensions::new();
    let Some(paths) = value.get("paths").and_then(Value::as_object) else {
        return out;
    };

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (verb, operation) in item {
            let Some(parameters) = operation.get("parameters").and_then(Value::as_array) else {
                continue;
            };
            // Inline parameters keep their extensions in the typed model;
            // only siblings of a `$ref` are lost and need collecting here.
            let entries: Vec<BTreeMap<String, Value>> = parameters
                .iter()
                .map(|entry| match entry.as_object() {
                    Some(obj) if obj.contains_key("$ref") => obj
                        .iter()
                        .filter(|(key, _)| key.starts_with("x-"))
                        .map(|(key, val)| (key.clone(), val.clone()))
                        .collect(),
                    _ => BTreeMap::new(),
                })
                .collect();
            if entries.iter().any(|ext| !ext.is_empty()) {
                out.insert((path.clone(), verb.to_ascii_lowercase()), entries);
            }
        }
    }
    out
}

/// Drop path-item keys that are neither HTTP methods nor extensions.
///
/// Specs in the wild carry custom keys on path items that the strict spec
/// model refuses; only methods, the documented metadata keys and `x-`
/// extensions survive.
fn strip_unknown_verbs(val: &mut serde_json::Value) {
    const METHODS: [&str; 8] = [
        "get", "post", "put", "delete", "patch", "options", "head", "trace",
    ];

    if let Some(serde_json::Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let serde_json::Value::Object(obj) = item {
                let keys: Vec<String> = obj.keys().cloned().collect();
                for k in keys {
                    let lk = k.to_ascii_lowercase();
                    let keep = match lk.as_str() {
                        "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                        m if METHODS.contains(&m) => true,
                        _ => k.starts_with("x-"),
                    };
                    if !keep {
                        obj.remove(&k);
                    }
                }
            }
        }
    }
}

/// Parse spec text into a [`SpecDocument`].
///
/// `json` selects the JSON parser; otherwise the text is treated as YAML
/// (which also accepts JSON documents).
pub fn parse_spec(content: &str, json: bool) -> anyhow::Result<SpecDocument> {
    let value: Value = if json {
        serde_json::from_str(content).context("failed to parse spec as JSON")?
    } else {
        serde_yaml::from_str(content).context("failed to parse spec as YAML")?
    };

    SpecDocument::from_raw(value)
}

/// Load the spec from a file, or from stdin when no path is given.
pub fn load_spec(path: Option<&Path>) -> anyhow::Result<SpecDocument> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read spec file {}", path.display()))?;
            let json = path.extension().is_some_and(|ext| ext == "json");
            parse_spec(&content, json)
        }
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("failed to read spec from stdin")?;
            parse_spec(&content, false)
        }
    }
}
