//! # CLI Module
//!
//! Command-line surface of the generator.
//!
//! ## Usage
//!
//! ```bash
//! api-generator --spec openapi.yaml --output-type commands > api_commands.rs
//! api-generator --output-type metadata < openapi.yaml > api_metadata.rs
//! ```
//!
//! Options:
//! - `--spec <FILE>` - Path to the OpenAPI document; stdin when omitted
//! - `--output-type <commands|metadata>` - Which generated file to produce (required)
//!
//! The generated source goes to stdout; any structural error aborts the
//! run with a non-zero exit and no partial output.
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use atlas_api_generator::cli::{run, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! run(&cli, chrono::Utc::now().date_naive(), &mut std::io::stdout())?;
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::debug;

use crate::convert::{spec_to_commands, spec_to_metadata};
use crate::render::{render_commands, render_metadata, OutputType};
use crate::spec::load_spec;

#[derive(Parser, Debug)]
#[command(name = "api-generator")]
#[command(about = "Generate versioned CLI command definitions from an OpenAPI spec", long_about = None)]
pub struct Cli {
    /// Path to the OpenAPI document (JSON or YAML); reads stdin when omitted
    #[arg(long)]
    pub spec: Option<PathBuf>,

    /// Which generated file to produce
    #[arg(long, value_enum)]
    pub output_type: OutputType,
}

/// Run the full pipeline: load, build, validate, render, write.
pub fn run(cli: &Cli, now: NaiveDate, out: &mut impl Write) -> anyhow::Result<()> {
    let doc = load_spec(cli.spec.as_deref())?;

    let rendered = match cli.output_type {
        OutputType::Commands => {
            let groups = spec_to_commands(now, &doc)?;
            debug!(groups = groups.len(), "built command groups");
            render_commands(&groups)?
        }
        OutputType::Metadata => {
            let metadata = spec_to_metadata(now, &doc.spec)?;
            debug!(operations = metadata.len(), "built metadata");
            render_metadata(&metadata)?
        }
    };

    out.write_all(rendered.as_bytes())
        .context("failed to write generated source")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_type_is_required() {
        let result = Cli::try_parse_from(["api-generator", "--spec", "openapi.yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_type_values() {
        let cli = Cli::try_parse_from(["api-generator", "--output-type", "commands"]).unwrap();
        assert_eq!(cli.output_type, OutputType::Commands);
        assert!(cli.spec.is_none());

        let cli = Cli::try_parse_from([
            "api-generator",
            "--spec",
            "openapi.yaml",
            "--output-type",
            "metadata",
        ])
        .unwrap();
        assert_eq!(cli.output_type, OutputType::Metadata);

        assert!(Cli::try_parse_from(["api-generator", "--output-type", "other"]).is_err());
    }
}
