//! Spec-to-IR conversion.
//!
//! The submodules split along the seams of the pipeline: vendor extension
//! decoding, the command builder, watcher extraction and validation, and
//! the docs metadata extractor.

pub mod commands;
pub mod extensions;
pub mod metadata;
pub mod watcher;

pub use commands::spec_to_commands;
pub use metadata::spec_to_metadata;
