//! # Emission
//!
//! Turns the built IR into generated Rust source text. The IR is mapped
//! to view structs whose string fields are already valid Rust tokens
//! (escaped literals, `Some(..)`/`None`, `vec![..]`), substituted into a
//! minijinja template, then piped through `rustfmt`. A formatter failure
//! is a hard error so broken output never lands on stdout.

use std::io::Write as _;
use std::process::{Command as ProcessCommand, Stdio};

use anyhow::{bail, Context};
use clap::ValueEnum;
use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::model::{Command, Group, Metadata, Parameter, WatcherProperties};
use crate::version::Version;

/// Which generated file to produce.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Commands,
    Metadata,
}

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template("commands.rs.j2", include_str!("../../templates/commands.rs.j2"))
        .expect("commands template should parse");
    env.add_template("metadata.rs.j2", include_str!("../../templates/metadata.rs.j2"))
        .expect("metadata template should parse");
    env
});

/// Render the commands IR as formatted Rust source.
pub fn render_commands(groups: &[Group]) -> anyhow::Result<String> {
    format_source(&commands_source(groups)?)
}

/// Render the metadata map as formatted Rust source.
pub fn render_metadata(metadata: &Metadata) -> anyhow::Result<String> {
    format_source(&metadata_source(metadata)?)
}

fn commands_source(groups: &[Group]) -> anyhow::Result<String> {
    let views: Vec<GroupView> = groups.iter().map(GroupView::from).collect();
    let source = TEMPLATES
        .get_template("commands.rs.j2")?
        .render(context! { groups => views })
        .context("failed to render commands template")?;
    Ok(source)
}

fn metadata_source(metadata: &Metadata) -> anyhow::Result<String> {
    let views: Vec<OperationMetadataView> = metadata
        .iter()
        .map(|(operation_id, operation)| OperationMetadataView::new(operation_id, operation))
        .collect();
    let source = TEMPLATES
        .get_template("metadata.rs.j2")?
        .render(context! { operations => views })
        .context("failed to render metadata template")?;
    Ok(source)
}

/// Pipe generated source through rustfmt.
///
/// The binary can be overridden for tests without mutating `PATH`.
fn format_source(source: &str) -> anyhow::Result<String> {
    let rustfmt = std::env::var("API_GENERATOR_RUSTFMT").unwrap_or_else(|_| "rustfmt".to_string());

    let mut child = ProcessCommand::new(rustfmt)
        .args(["--edition", "2021"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to spawn rustfmt")?;

    child
        .stdin
        .take()
        .context("rustfmt stdin was not captured")?
        .write_all(source.as_bytes())
        .context("failed to write to rustfmt")?;

    let output = child.wait_with_output().context("rustfmt did not run")?;
    if !output.status.success() {
        bail!(
            "rustfmt failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    String::from_utf8(output.stdout).context("rustfmt produced non-utf8 output")
}

// --- token helpers -------------------------------------------------------

/// Escape a string as a Rust string literal, quotes included.
fn str_token(s: &str) -> String {
    format!("{s:?}")
}

fn opt_str_token(s: Option<&str>) -> String {
    match s {
        Some(s) => format!("Some({s:?})"),
        None => "None".to_string(),
    }
}

fn str_vec_token<'a, I: IntoIterator<Item = &'a str>>(items: I) -> String {
    let items: Vec<String> = items.into_iter().map(str_token).collect();
    format!("vec![{}]", items.join(", "))
}

fn version_token(version: &Version) -> String {
    match version {
        Version::Preview => "Version::Preview".to_string(),
        Version::Upcoming(date) => format!(
            "Version::Upcoming(VersionDate::new({}, {}, {}))",
            date.year, date.month, date.day
        ),
        Version::Stable(date) => format!(
            "Version::Stable(VersionDate::new({}, {}, {}))",
            date.year, date.month, date.day
        ),
    }
}

// --- view structs --------------------------------------------------------

#[derive(Serialize)]
struct GroupView {
    name: String,
    description: String,
    commands: Vec<CommandView>,
}

#[derive(Serialize)]
struct CommandView {
    operation_id: String,
    short_operation_id: String,
    aliases: String,
    description: String,
    url: String,
    verb: String,
    query_parameters: Vec<ParameterView>,
    url_parameters: Vec<ParameterView>,
    versions: Vec<VersionView>,
    watcher: String,
}

#[derive(Serialize)]
struct ParameterView {
    name: String,
    short: String,
    description: String,
    required: bool,
    kind: String,
    is_array: bool,
    aliases: String,
}

#[derive(Serialize)]
struct VersionView {
    version: String,
    deprecated: bool,
    sunset: String,
    public_preview: bool,
    request_content_type: String,
    response_content_types: String,
}

impl From<&Group> for GroupView {
    fn from(group: &Group) -> Self {
        Self {
            name: str_token(&group.name),
            description: str_token(&group.description),
            commands: group.commands.iter().map(CommandView::from).collect(),
        }
    }
}

impl From<&Command> for CommandView {
    fn from(command: &Command) -> Self {
        Self {
            operation_id: str_token(&command.operation_id),
            short_operation_id: opt_str_token(command.short_operation_id.as_deref()),
            aliases: str_vec_token(command.aliases.iter().map(String::as_str)),
            description: str_token(&command.description),
            url: str_token(&command.request_parameters.url),
            verb: format!("HttpVerb::{:?}", command.request_parameters.verb),
            query_parameters: command
                .request_parameters
                .query_parameters
                .iter()
                .map(ParameterView::from)
                .collect(),
            url_parameters: command
                .request_parameters
                .url_parameters
                .iter()
                .map(ParameterView::from)
                .collect(),
            versions: command.versions.iter().map(VersionView::from).collect(),
            watcher: watcher_token(command.watcher.as_ref()),
        }
    }
}

impl From<&Parameter> for ParameterView {
    fn from(parameter: &Parameter) -> Self {
        Self {
            name: str_token(&parameter.name),
            short: opt_str_token(parameter.short.as_deref()),
            description: str_token(&parameter.description),
            required: parameter.required,
            kind: format!("ParameterKind::{:?}", parameter.param_type.kind),
            is_array: parameter.param_type.is_array,
            aliases: str_vec_token(parameter.aliases.iter().map(String::as_str)),
        }
    }
}

impl From<&crate::model::CommandVersion> for VersionView {
    fn from(version: &crate::model::CommandVersion) -> Self {
        Self {
            version: version_token(&version.version),
            deprecated: version.deprecated,
            sunset: opt_str_token(version.sunset.map(|d| d.to_string()).as_deref()),
            public_preview: version.public_preview,
            request_content_type: opt_str_token(version.request_content_type.as_deref()),
            response_content_types: str_vec_token(
                version.response_content_types.iter().map(String::as_str),
            ),
        }
    }
}

/// Watchers nest three levels deep; the full `Option<WatcherProperties>`
/// literal is built here and dropped into the template as one token.
/// rustfmt reflows it afterwards.
fn watcher_token(watcher: Option<&WatcherProperties>) -> String {
    let Some(watcher) = watcher else {
        return "None".to_string();
    };

    let params: Vec<String> = watcher
        .get
        .params
        .iter()
        .map(|(key, value)| format!("({key:?}, {value:?})"))
        .collect();
    let version = match watcher.get.version.as_ref() {
        Some(version) => format!("Some({})", version_token(version)),
        None => "None".to_string(),
    };
    let get = format!(
        "WatcherGetProperties {{ operation_id: {}, version: {}, params: vec![{}] }}",
        str_token(&watcher.get.operation_id),
        version,
        params.join(", ")
    );

    let expect = match watcher.expect.as_ref() {
        None => "None".to_string(),
        Some(expect) => {
            let match_ = match expect.match_.as_ref() {
                None => "None".to_string(),
                Some(match_) => format!(
                    "Some(WatcherMatchProperties {{ path: {}, values: {} }})",
                    str_token(&match_.path),
                    str_vec_token(match_.values.iter().map(String::as_str))
                ),
            };
            format!(
                "Some(WatcherExpectProperties {{ http_code: {}, match_: {} }})",
                expect.http_code, match_
            )
        }
    };

    format!("Some(WatcherProperties {{ get: {get}, expect: {expect} }})")
}

#[derive(Serialize)]
struct OperationMetadataView {
    operation_id: String,
    parameters: Vec<ParameterMetadataView>,
    examples: Vec<VersionExamplesView>,
}

#[derive(Serialize)]
struct ParameterMetadataView {
    name: String,
    usage: String,
}

#[derive(Serialize)]
struct VersionExamplesView {
    version: String,
    examples: Vec<ExampleView>,
}

#[derive(Serialize)]
struct ExampleView {
    source: String,
    name: String,
    description: String,
    value: String,
    flags: String,
}

impl OperationMetadataView {
    fn new(operation_id: &str, operation: &crate::model::OperationMetadata) -> Self {
        Self {
            operation_id: str_token(operation_id),
            parameters: operation
                .parameters
                .iter()
                .map(|(name, parameter)| ParameterMetadataView {
                    name: str_token(name),
                    usage: str_token(&parameter.usage),
                })
                .collect(),
            examples: operation
                .examples
                .iter()
                .map(|(version, examples)| VersionExamplesView {
                    version: str_token(version),
                    examples: examples
                        .iter()
                        .map(|example| ExampleView {
                            source: str_token(&example.source),
                            name: str_token(&example.name),
                            description: str_token(&example.description),
                            value: str_token(&example.value),
                            flags: {
                                let flags: Vec<String> = example
                                    .flags
                                    .iter()
                                    .map(|(flag, value)| format!("({flag:?}, {value:?})"))
                                    .collect();
                                format!("vec![{}]", flags.join(", "))
                            },
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
