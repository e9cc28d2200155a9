//! # Atlas API Generator
//!
//! **atlas-api-generator** is a build-time code generator that turns an
//! [OpenAPI 3.x](https://spec.openapis.org/oas/v3.1.0) document into
//! versioned, typed CLI command definitions and docs metadata, emitted as
//! formatted Rust source text.
//!
//! ## Overview
//!
//! The generator reads an annotated OpenAPI spec (JSON or YAML), walks
//! every operation, and produces either a command tree (one command per
//! operation, grouped by tag, each with typed flags and an ordered list
//! of API versions) or a docs metadata map (flag usage strings and
//! per-version example invocations). The result is rendered through a
//! template, formatted with `rustfmt`, and written to stdout.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`spec`]** - OpenAPI document loading and parsing (file or stdin)
//! - **[`version`]** - The three-tier API version model (stable, upcoming, preview)
//! - **[`model`]** - The command IR: groups, commands, parameters, versions, watchers
//! - **[`convert`]** - Spec walkers: command builder, watcher extractor/validator, metadata extractor
//! - **[`docs`]** - Markdown/HTML description cleaning for terminal help text
//! - **[`render`]** - Template emission plus the `rustfmt` pipe
//! - **[`cli`]** - The `api-generator` command-line surface
//!
//! ### Generation Flow
//!
//! ```text
//! spec bytes
//!     │ spec::load_spec
//!     ▼
//! SpecDocument
//!     │ convert::spec_to_commands(now, ..)     convert::spec_to_metadata(now, ..)
//!     ▼                                        ▼
//! sorted Vec<Group>  ── watcher validation ──  Metadata
//!     │ render::render_commands                │ render::render_metadata
//!     ▼                                        ▼
//! formatted Rust source on stdout
//! ```
//!
//! Every map iteration is followed by an explicit sort before emission,
//! so regenerating from an unchanged spec is byte-identical.
//!
//! ## Example
//!
//! ```rust,ignore
//! use atlas_api_generator::{convert, render, spec};
//!
//! let doc = spec::load_spec(Some(std::path::Path::new("openapi.yaml")))?;
//! let groups = convert::spec_to_commands(chrono::Utc::now().date_naive(), &doc)?;
//! let source = render::render_commands(&groups)?;
//! print!("{source}");
//! ```

pub mod cli;
pub mod convert;
pub mod docs;
pub mod model;
pub mod render;
pub mod spec;
pub mod version;

pub use convert::{spec_to_commands, spec_to_metadata};
pub use model::{Command, Group, Metadata};
pub use version::Version;
