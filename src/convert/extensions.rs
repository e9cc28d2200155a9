//! Decoding of the `x-xgen-*` vendor extensions the generator consumes.
//!
//! All extensions are optional; absent or wrongly-typed values read as "not
//! set". The spec loader may surface extension keys with or without their
//! `x-` prefix depending on the parser version, so lookups accept both.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Root extension namespace for CLI generation hints.
pub const CLI_EXTENSION: &str = "x-xgen-atlascli";
/// Short operation ID override, outside the CLI namespace.
pub const OPERATION_ID_OVERRIDE_EXTENSION: &str = "x-xgen-operation-id-override";
/// Per-content-type sunset date.
pub const SUNSET_EXTENSION: &str = "x-sunset";
/// Per-content-type preview visibility.
pub const PREVIEW_EXTENSION: &str = "x-xgen-preview";

/// Look up an extension value, tolerating a stripped `x-` prefix.
pub fn extension<'a>(ext: &'a BTreeMap<String, Value>, name: &str) -> Option<&'a Value> {
    ext.get(name)
        .or_else(|| ext.get(name.strip_prefix("x-").unwrap_or(name)))
}

/// Nested object lookup inside an already-decoded extension object.
pub fn extension_object<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Map<String, Value>> {
    obj.get(name).and_then(Value::as_object)
}

/// The `x-xgen-atlascli` object on an operation, parameter or media type.
pub fn cli_extension(ext: &BTreeMap<String, Value>) -> Option<&Map<String, Value>> {
    extension(ext, CLI_EXTENSION).and_then(Value::as_object)
}

/// The `x-xgen-atlascli.override` object, if present.
pub fn overrides(ext: &BTreeMap<String, Value>) -> Option<&Map<String, Value>> {
    cli_extension(ext).and_then(|cli| extension_object(cli, "override"))
}

fn override_string(ext: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    overrides(ext)
        .and_then(|o| o.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// CLI-relevant extensions of one operation.
#[derive(Debug, Default, PartialEq)]
pub struct OperationExtensions {
    pub skip: bool,
    pub operation_id: Option<String>,
    pub short_operation_id: Option<String>,
    pub aliases: Vec<String>,
}

/// Decode the operation-level extensions.
///
/// `override.operationId` takes priority over `x-xgen-operation-id-override`
/// and clears the short ID when set.
pub fn operation_extensions(ext: &BTreeMap<String, Value>) -> OperationExtensions {
    let mut out = OperationExtensions {
        short_operation_id: extension(ext, OPERATION_ID_OVERRIDE_EXTENSION)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        ..OperationExtensions::default()
    };

    if let Some(cli) = cli_extension(ext) {
        if cli.get("skip").and_then(Value::as_bool) == Some(true) {
            out.skip = true;
        }

        if let Some(aliases) = cli.get("command-aliases").and_then(Value::as_array) {
            for alias in aliases {
                if let Some(alias) = alias.as_str().filter(|s| !s.is_empty()) {
                    out.aliases.push(alias.to_string());
                }
            }
        }
    }

    if let Some(overridden) = override_string(ext, "operationId") {
        out.operation_id = Some(overridden);
        out.short_operation_id = None;
    }

    out
}

/// Description override for an operation or parameter.
pub fn description_override(ext: &BTreeMap<String, Value>) -> Option<String> {
    override_string(ext, "description")
}

/// Name override for a parameter.
pub fn name_override(ext: &BTreeMap<String, Value>) -> Option<String> {
    override_string(ext, "name")
}

/// CLI-relevant extensions of one parameter.
#[derive(Debug, Default, PartialEq)]
pub struct ParameterExtensions {
    pub aliases: Vec<String>,
    pub short: Option<String>,
}

impl ParameterExtensions {
    /// Merge another extension map in; the first `flag-short` wins.
    pub fn merge(&mut self, ext: &BTreeMap<String, Value>) {
        let Some(cli) = cli_extension(ext) else {
            return;
        };

        if let Some(aliases) = cli.get("aliases").and_then(Value::as_array) {
            for alias in aliases {
                if let Some(alias) = alias.as_str() {
                    self.aliases.push(alias.to_string());
                }
            }
        }

        if self.short.is_none() {
            if let Some(short) = cli.get("flag-short").and_then(Value::as_str) {
                self.short = Some(short.to_string());
            }
        }
    }
}

/// Sunset date from a content-type entry, when present and well-formed.
pub fn sunset_date(ext: &BTreeMap<String, Value>) -> Option<NaiveDate> {
    extension(ext, SUNSET_EXTENSION)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Public-preview marker from a content-type entry.
///
/// The extension value is string-typed in the spec:
///
/// ```yaml
/// x-xgen-preview:
///   public: 'true'
/// ```
///
/// Returns `None` when the extension is absent.
pub fn public_preview(ext: &BTreeMap<String, Value>) -> Option<bool> {
    extension(ext, PREVIEW_EXTENSION)
        .and_then(Value::as_object)
        .and_then(|preview| preview.get("public"))
        .and_then(Value::as_str)
        .map(|public| public == "true")
}
