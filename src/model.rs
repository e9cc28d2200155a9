//! # Command IR
//!
//! In-memory representation of the generated command tree: [`Group`]s of
//! [`Command`]s, each carrying parameters, an ordered version list and an
//! optional watcher descriptor. The IR is assembled once per generator run
//! from the parsed OpenAPI document, validated as a whole, then handed to
//! emission. Nothing mutates it after the build pass returns.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use http::Method;

use crate::version::Version;

/// Scalar kind a CLI flag can decode into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Int,
    Bool,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::String => write!(f, "string"),
            ParameterKind::Int => write!(f, "int"),
            ParameterKind::Bool => write!(f, "bool"),
        }
    }
}

/// Resolved type of an operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterType {
    pub kind: ParameterKind,
    pub is_array: bool,
}

/// One query or path parameter of an operation, translated to a CLI flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Single-letter flag alias, when the spec provides one.
    pub short: Option<String>,
    pub description: String,
    pub required: bool,
    pub param_type: ParameterType,
    pub aliases: Vec<String>,
}

/// HTTP verbs the generated commands can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn from_method(method: &Method) -> anyhow::Result<Self> {
        match *method {
            Method::GET => Ok(HttpVerb::Get),
            Method::POST => Ok(HttpVerb::Post),
            Method::PUT => Ok(HttpVerb::Put),
            Method::PATCH => Ok(HttpVerb::Patch),
            Method::DELETE => Ok(HttpVerb::Delete),
            ref other => anyhow::bail!("unsupported http verb: {other}"),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpVerb::Get => write!(f, "GET"),
            HttpVerb::Post => write!(f, "POST"),
            HttpVerb::Put => write!(f, "PUT"),
            HttpVerb::Patch => write!(f, "PATCH"),
            HttpVerb::Delete => write!(f, "DELETE"),
        }
    }
}

/// URL, verb and flag set of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParameters {
    pub url: String,
    pub verb: HttpVerb,
    pub query_parameters: Vec<Parameter>,
    pub url_parameters: Vec<Parameter>,
}

/// Wire contract of one operation under one API version.
///
/// `request_content_type` holds at most one entry per version; response
/// content types are sorted lexicographically before emission.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandVersion {
    pub version: Version,
    pub deprecated: bool,
    pub sunset: Option<NaiveDate>,
    pub public_preview: bool,
    pub request_content_type: Option<String>,
    pub response_content_types: Vec<String>,
}

/// One generated CLI command, built from a single spec operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub operation_id: String,
    pub short_operation_id: Option<String>,
    pub aliases: Vec<String>,
    pub description: String,
    pub request_parameters: RequestParameters,
    /// Ascending under the version ordering.
    pub versions: Vec<CommandVersion>,
    pub watcher: Option<WatcherProperties>,
}

/// Commands sharing one spec tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub description: String,
    pub commands: Vec<Command>,
}

/// Declarative "wait until condition" descriptor attached to a command.
///
/// Tells the CLI runtime which follow-up GET operation to poll after a
/// mutating call, and what response condition terminates the wait.
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherProperties {
    pub get: WatcherGetProperties,
    pub expect: Option<WatcherExpectProperties>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatcherGetProperties {
    pub operation_id: String,
    pub version: Option<Version>,
    /// local parameter name -> source expression (e.g. `input:groupId`,
    /// `body:$.name`). The expression grammar is owned by the runtime
    /// watcher; it passes through here opaquely.
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatcherExpectProperties {
    pub http_code: i64,
    pub match_: Option<WatcherMatchProperties>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatcherMatchProperties {
    pub path: String,
    pub values: Vec<String>,
}

/// Docs metadata for the whole spec, keyed by operation ID.
pub type Metadata = BTreeMap<String, OperationMetadata>;

/// Flag usage strings and example invocations of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationMetadata {
    pub parameters: BTreeMap<String, ParameterMetadata>,
    pub examples: BTreeMap<String, Vec<Example>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMetadata {
    pub usage: String,
}

/// One documented invocation of a command.
///
/// `source` is the spec-side example name ("-" for the anonymous
/// `example` field); `value` is the rendered request body, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub source: String,
    pub name: String,
    pub description: String,
    pub value: String,
    pub flags: BTreeMap<String, String>,
}
