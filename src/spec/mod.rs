//! OpenAPI document loading.
//!
//! One spec read per generator run: a file given via `--spec`, or standard
//! input when the flag is omitted. JSON and YAML are both accepted.

mod load;

pub use load::{load_spec, parse_spec, ParameterRefExtensions, SpecDocument};
