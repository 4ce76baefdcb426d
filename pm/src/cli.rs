//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// pipemigrate - Data Factory pipeline to Databricks job translator
#[derive(Parser)]
#[command(
    name = "pm",
    about = "Translate Data Factory pipelines into Databricks jobs",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Translate a pipeline and prepare its job, scripts and secret instructions
    Translate {
        /// Pipeline definition (.json, .yml or .yaml)
        #[arg(value_name = "PIPELINE")]
        pipeline: PathBuf,

        /// Separate trigger definition; overrides one embedded in the pipeline
        #[arg(short, long, value_name = "FILE")]
        trigger: Option<PathBuf>,

        /// Directory to write artifacts to; prints to stdout when omitted
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Fail on untranslatable activities instead of substituting placeholders
        #[arg(long)]
        strict: bool,

        /// Output format for stdout
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Translate a pipeline and print a summary of its tasks and diagnostics
    Inspect {
        /// Pipeline definition (.json, .yml or .yaml)
        #[arg(value_name = "PIPELINE")]
        pipeline: PathBuf,

        /// Fail on untranslatable activities instead of substituting placeholders
        #[arg(long)]
        strict: bool,
    },

    /// List code generation templates and where each resolves from
    Templates,
}

/// Output format for the translate command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(format!("Unknown format: {}. Use 'json' or 'yaml'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("yml".parse::<OutputFormat>(), Ok(OutputFormat::Yaml));
        assert!("toml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_translate_args() {
        let cli = Cli::try_parse_from([
            "pm",
            "-l",
            "debug",
            "translate",
            "pipeline.json",
            "--trigger",
            "trigger.json",
            "--strict",
            "-f",
            "yaml",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Some(Command::Translate {
                pipeline,
                trigger,
                output,
                strict,
                format,
            }) => {
                assert_eq!(pipeline, PathBuf::from("pipeline.json"));
                assert_eq!(trigger, Some(PathBuf::from("trigger.json")));
                assert!(output.is_none());
                assert!(strict);
                assert_eq!(format, OutputFormat::Yaml);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
