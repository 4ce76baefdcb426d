//! pipemigrate - Data Factory pipeline to Databricks job translator
//!
//! CLI entry point: reads pipeline documents, runs translation and preparation, and
//! writes the resulting job payload and artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use pipemigrate::cli::{Cli, Command, OutputFormat};
use pipemigrate::config::Config;
use pipemigrate::translate::{TranslateOptions, translate_pipeline_with_trigger};
use pipemigrate::workflow::{PreparedWorkflow, TaskPayload, WorkflowPreparer, embedded};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // stdout carries the prepared workflow, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install subscriber: {e}"))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Translate {
            pipeline,
            trigger,
            output,
            strict,
            format,
        }) => cmd_translate(&config, &pipeline, trigger.as_deref(), output.as_deref(), strict, format),
        Some(Command::Inspect { pipeline, strict }) => cmd_inspect(&config, &pipeline, strict),
        Some(Command::Templates) => cmd_templates(&config),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Read a JSON or YAML document, choosing the parser by extension
fn read_document(path: &Path) -> Result<Value> {
    debug!(path = %path.display(), "read_document: called");
    let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("yml" | "yaml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).context(format!("Failed to parse YAML from {}", path.display()))
    } else {
        serde_json::from_str(&content).context(format!("Failed to parse JSON from {}", path.display()))
    }
}

fn prepare(config: &Config, pipeline: &Path, trigger: Option<&Path>, strict: bool) -> Result<PreparedWorkflow> {
    let document = read_document(pipeline)?;
    let trigger = trigger.map(read_document).transpose()?;
    let options = TranslateOptions {
        strict: strict || config.translate.strict,
    };

    let translated = translate_pipeline_with_trigger(&document, trigger.as_ref(), options)
        .context(format!("Failed to translate {}", pipeline.display()))?;
    let prepared = WorkflowPreparer::new(config.prepare_options())
        .prepare(translated)
        .context(format!("Failed to prepare {}", pipeline.display()))?;
    Ok(prepared)
}

fn cmd_translate(
    config: &Config,
    pipeline: &Path,
    trigger: Option<&Path>,
    output: Option<&Path>,
    strict: bool,
    format: OutputFormat,
) -> Result<()> {
    debug!(pipeline = %pipeline.display(), ?output, strict, ?format, "cmd_translate: called");
    let prepared = prepare(config, pipeline, trigger, strict)?;

    match output {
        Some(dir) => {
            write_artifacts(&prepared, dir)?;
            println!(
                "{} Wrote job '{}' ({} tasks, {} notebooks) to {}",
                "✓".green(),
                prepared.job.name,
                prepared.job.tasks.len(),
                prepared.notebooks.len(),
                dir.display()
            );
            if !prepared.not_translatable.is_empty() {
                println!(
                    "{} {} items could not be translated; see not_translatable.json",
                    "⚠".yellow(),
                    prepared.not_translatable.len()
                );
            }
        }
        None => {
            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&prepared)?,
                OutputFormat::Yaml => serde_yaml::to_string(&prepared)?,
            };
            println!("{}", rendered);
        }
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content + "\n").context(format!("Failed to write {}", path.display()))
}

/// Write the job payload, scripts and instructions under `dir`
fn write_artifacts(prepared: &PreparedWorkflow, dir: &Path) -> Result<()> {
    debug!(dir = %dir.display(), "write_artifacts: called");
    fs::create_dir_all(dir).context(format!("Failed to create {}", dir.display()))?;

    write_json(&dir.join("job.json"), &prepared.job)?;
    write_json(&dir.join("pipelines.json"), &prepared.pipelines)?;
    write_json(&dir.join("secrets.json"), &prepared.secrets)?;
    write_json(&dir.join("not_translatable.json"), &prepared.not_translatable)?;

    for notebook in &prepared.notebooks {
        let path = notebook_file(dir, &notebook.file_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, &notebook.content).context(format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote notebook");
    }
    Ok(())
}

/// Local file mirroring a workspace notebook path
fn notebook_file(dir: &Path, workspace_path: &str) -> PathBuf {
    let relative = workspace_path.trim_start_matches('/');
    dir.join(format!("{relative}.py"))
}

fn cmd_inspect(config: &Config, pipeline: &Path, strict: bool) -> Result<()> {
    debug!(pipeline = %pipeline.display(), strict, "cmd_inspect: called");
    let prepared = prepare(config, pipeline, None, strict)?;

    println!("{} {}", "Job:".bold(), prepared.job.name.cyan());
    if let Some(schedule) = &prepared.job.schedule {
        println!(
            "  schedule: {} ({})",
            schedule.quartz_cron_expression, schedule.timezone_id
        );
    }
    println!("{} ({})", "Tasks".bold(), prepared.job.tasks.len());
    for task in &prepared.job.tasks {
        let placeholder = matches!(
            &task.payload,
            TaskPayload::NotebookTask { notebook_path, .. } if notebook_path == pipemigrate::ir::PLACEHOLDER_NOTEBOOK_PATH
        );
        let marker = if placeholder { "✗".red() } else { "✓".green() };
        let upstream: Vec<&str> = task.depends_on.iter().map(|d| d.task_key.as_str()).collect();
        let after = if upstream.is_empty() {
            String::new()
        } else {
            format!(" after {}", upstream.join(", "))
        };
        println!(
            "  {} {} [{}] {}{}",
            marker,
            task.task_key,
            task.task_type,
            task.payload.kind().dimmed(),
            after
        );
    }

    if !prepared.notebooks.is_empty() {
        println!("{} ({})", "Notebooks".bold(), prepared.notebooks.len());
        for notebook in &prepared.notebooks {
            println!("  {}", notebook.file_path);
        }
    }
    if !prepared.secrets.is_empty() {
        println!("{} ({})", "Secrets".bold(), prepared.secrets.len());
        for secret in &prepared.secrets {
            let status = if secret.user_input_required {
                "input required".yellow()
            } else {
                "provided".green()
            };
            println!("  {}/{} {}", secret.scope, secret.key, status);
        }
    }

    println!("{} ({})", "Not translatable".bold(), prepared.not_translatable.len());
    for diagnostic in &prepared.not_translatable {
        let activity = diagnostic.activity_name.as_deref().unwrap_or("pipeline");
        println!(
            "  {} {} {}: {}",
            "⚠".yellow(),
            activity,
            diagnostic.property.dimmed(),
            diagnostic.message
        );
    }
    Ok(())
}

fn cmd_templates(config: &Config) -> Result<()> {
    debug!("cmd_templates: called");
    let preparer = WorkflowPreparer::new(config.prepare_options());
    for name in embedded::NAMES {
        match preparer.templates().resolve(name) {
            Some(source) => println!("{} {}", name, source.to_string().dimmed()),
            None => println!("{} {}", name, "missing".red()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_notebook_file_mirrors_workspace_path() {
        let path = notebook_file(Path::new("/out"), "/pipemigrate/copy_data_notebooks/copy_a_to_b");
        assert_eq!(path, PathBuf::from("/out/pipemigrate/copy_data_notebooks/copy_a_to_b.py"));
    }

    #[test]
    fn test_read_document_by_extension() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("p.yaml");
        fs::write(&yaml, "name: p\nactivities: []\n").unwrap();
        assert_eq!(read_document(&yaml).unwrap()["name"], "p");

        let json = dir.path().join("p.json");
        fs::write(&json, r#"{"name": "q"}"#).unwrap();
        assert_eq!(read_document(&json).unwrap()["name"], "q");

        fs::write(&json, "name: q").unwrap();
        assert!(read_document(&json).is_err());
    }
}
