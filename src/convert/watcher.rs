//! # Watcher Extractor & Validator
//!
//! Decodes the `watcher` block of the CLI vendor extension into typed
//! properties, and validates the whole command graph afterwards: every
//! watcher must point at an existing command, a known version, and real
//! parameters.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{anyhow, bail, Context};
use serde_json::{Map, Value};

use super::extensions;
use crate::model::{
    Command, Group, Parameter, WatcherExpectProperties, WatcherGetProperties,
    WatcherMatchProperties, WatcherProperties,
};
use crate::version::Version;

/// Decode the watcher block of one operation, if present.
///
/// An absent `watcher` or `watcher.get` object means "no watcher"; a
/// present but malformed one is an error.
pub fn extract_watcher_properties(
    ext: &BTreeMap<String, Value>,
) -> anyhow::Result<Option<WatcherProperties>> {
    let Some(cli) = extensions::cli_extension(ext) else {
        return Ok(None);
    };
    let Some(watcher) = extensions::extension_object(cli, "watcher") else {
        return Ok(None);
    };
    let Some(get) = extensions::extension_object(watcher, "get") else {
        return Ok(None);
    };

    let get = watcher_get_properties(get)?;

    let expect = extensions::extension_object(watcher, "expect")
        .map(watcher_expect_properties)
        .transpose()?;

    Ok(Some(WatcherProperties { get, expect }))
}

fn watcher_get_properties(ext: &Map<String, Value>) -> anyhow::Result<WatcherGetProperties> {
    let operation_id = ext
        .get("operation-id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .context("watcher get property has an invalid operation-id")?
        .to_string();

    // Non-string version values are ignored; string ones must parse.
    let version = ext
        .get("version")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(str::parse::<Version>)
        .transpose()?;

    let mut params = BTreeMap::new();
    if let Some(params_ext) = extensions::extension_object(ext, "params") {
        for (key, value) in params_ext {
            if let Some(value) = value.as_str() {
                params.insert(key.clone(), value.to_string());
            }
        }
    }

    Ok(WatcherGetProperties {
        operation_id,
        version,
        params,
    })
}

fn watcher_expect_properties(ext: &Map<String, Value>) -> anyhow::Result<WatcherExpectProperties> {
    let http_code = match ext.get("http-code") {
        // The YAML layer is free to hand back any numeric representation.
        Some(value) => to_int(value)?,
        None => 0,
    };

    let match_ = extensions::extension_object(ext, "match")
        .map(watcher_match_properties)
        .transpose()?;

    Ok(WatcherExpectProperties { http_code, match_ })
}

fn watcher_match_properties(ext: &Map<String, Value>) -> anyhow::Result<WatcherMatchProperties> {
    let path = ext
        .get("path")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .context("watcher match path is empty or missing")?
        .to_string();

    let values = ext
        .get("values")
        .and_then(Value::as_array)
        .context("watcher match values are empty or missing")?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    Ok(WatcherMatchProperties { path, values })
}

fn to_int(value: &Value) -> anyhow::Result<i64> {
    if let Some(int) = value.as_i64() {
        return Ok(int);
    }
    if let Some(uint) = value.as_u64() {
        return i64::try_from(uint)
            .with_context(|| format!("value {uint} does not fit into an int"));
    }
    if let Some(float) = value.as_f64() {
        if float.fract() != 0.0 {
            bail!("value {float} has decimal places");
        }
        return Ok(float as i64);
    }
    bail!("value {value} cannot be converted to int");
}

/// Validate every watcher of the built command graph, collecting all
/// failures instead of stopping at the first.
pub fn validate_all_watchers(groups: &HashMap<String, Group>) -> anyhow::Result<()> {
    let mut errors = Vec::new();

    for group in groups.values() {
        for command in &group.commands {
            if let Err(err) = validate_watchers_for_command(groups, command) {
                errors.push(err.to_string());
            }
        }
    }

    if errors.is_empty() {
        return Ok(());
    }
    errors.sort();
    Err(anyhow!(errors.join("\n")))
}

fn find_command<'a>(groups: &'a HashMap<String, Group>, operation_id: &str) -> Option<&'a Command> {
    groups
        .values()
        .flat_map(|group| group.commands.iter())
        .find(|command| command.operation_id == operation_id)
}

fn validate_watchers_for_command(
    groups: &HashMap<String, Group>,
    command: &Command,
) -> anyhow::Result<()> {
    let Some(watcher) = command.watcher.as_ref() else {
        return Ok(());
    };

    let base = format!("watcher for operationID='{}' is invalid", command.operation_id);

    let operation_id = &watcher.get.operation_id;
    if operation_id.is_empty() {
        bail!("{base}: the watcher get operation operationID is empty");
    }

    let Some(target) = find_command(groups, operation_id) else {
        bail!("{base}: the watcher get operation with operationID '{operation_id}' was not found");
    };

    if let Some(version) = watcher.get.version.as_ref() {
        let version_found = target
            .versions
            .iter()
            .any(|command_version| command_version.version.equal(version));
        if !version_found {
            bail!(
                "{base}: the watcher get operation with operationID '{operation_id}' was found, but the version '{version}' was not found"
            );
        }
    }

    let mut parameter_names = BTreeSet::new();
    let mut required_parameter_names = BTreeSet::new();
    let mut add_parameters = |parameters: &[Parameter]| {
        for parameter in parameters {
            parameter_names.insert(parameter.name.clone());
            if parameter.required {
                required_parameter_names.insert(parameter.name.clone());
            }
        }
    };
    add_parameters(&target.request_parameters.query_parameters);
    add_parameters(&target.request_parameters.url_parameters);

    for parameter_name in watcher.get.params.keys() {
        if !parameter_names.contains(parameter_name) {
            bail!(
                "{base}: invalid parameter was provided, parameter does not exist: '{parameter_name}'"
            );
        }
        required_parameter_names.remove(parameter_name);
    }

    if !required_parameter_names.is_empty() {
        let missing: Vec<String> = required_parameter_names.into_iter().collect();
        bail!(
            "{base}: some required parameter(s) are missing: '{}'",
            missing.join(", ")
        );
    }

    Ok(())
}
