// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Terminscan — photographed weekly schedules to calendar appointments
//
// Entry point. Initialises logging, loads the configuration and dispatches the
// subcommand. Results go to stdout as JSON; logs and user messages go to stderr.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use terminscan_core::error::Result;
use terminscan_core::human_errors::{describe_issue, humanize_error};
use terminscan_core::QualityIssue;

use services::config_dir::load_config;
use services::pipeline::{Capture, CaptureOutcome, Pipeline};

#[derive(Debug, Parser)]
#[command(name = "terminscan", version, about = "Read appointments from photos of a weekly schedule")]
struct Cli {
    /// Configuration file (TOML). Defaults to `$XDG_CONFIG_HOME/terminscan/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read appointments from one or more schedule photos.
    Scan {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// The photos were taken with flash.
        #[arg(long)]
        flash: bool,
        /// Directory holding `text-detection.rten` and `text-recognition.rten`.
        #[arg(long)]
        model_dir: Option<PathBuf>,
        /// Recognise every enhancement variant and reconcile the passes.
        #[arg(long)]
        all_variants: bool,
        /// Give up on a single recognition call after this many seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Read appointments from text that was already recognised.
    Parse { file: PathBuf },
    /// Check whether a photo is good enough to read.
    Quality { image: PathBuf },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "Terminscan starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Terminscan failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Scan {
            images,
            flash,
            model_dir,
            all_variants,
            timeout,
        } => {
            if model_dir.is_some() {
                config.recognition.model_dir = model_dir;
            }
            if timeout.is_some() {
                config.recognition.timeout_secs = timeout;
            }
            config.recognition.recognize_variants |= all_variants;

            let pipeline = Pipeline::new(config)?;
            let captures = images
                .iter()
                .map(|path| Capture::open(path, flash))
                .collect::<Result<Vec<_>>>()?;
            let outcomes = scan(&pipeline, captures).await?;
            let appointments: usize = outcomes.iter().map(|o| o.appointments().len()).sum();
            tracing::info!(captures = outcomes.len(), appointments, "Scan finished");
            for outcome in &outcomes {
                if let CaptureOutcome::Rejected { issues, .. } = outcome {
                    explain_issues(issues);
                }
            }
            print_json(&outcomes)
        }

        Command::Parse { file } => {
            let pipeline = Pipeline::new(config)?;
            let text = std::fs::read_to_string(&file)?;
            print_json(&pipeline.extract_text(&text))
        }

        Command::Quality { image } => {
            let pipeline = Pipeline::new(config)?;
            let capture = Capture::open(&image, false)?;
            let (quality, issues) = pipeline.assess(&capture)?;
            explain_issues(&issues);
            print_json(&serde_json::json!({
                "quality": quality,
                "passed": issues.is_empty(),
                "issues": issues,
            }))
        }

        Command::Config => {
            config.validate()?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

#[cfg(feature = "ocr")]
async fn scan(pipeline: &Pipeline, captures: Vec<Capture>) -> Result<Vec<CaptureOutcome>> {
    use terminscan_scan::OcrsLoader;
    use terminscan_scan::ocr::OcrsConfig;

    let loader = OcrsLoader {
        config: OcrsConfig::from_optional_dir(pipeline.config().recognition.model_dir.as_deref()),
    };
    pipeline.process(&loader, captures).await
}

#[cfg(not(feature = "ocr"))]
async fn scan(_pipeline: &Pipeline, _captures: Vec<Capture>) -> Result<Vec<CaptureOutcome>> {
    Err(terminscan_core::TerminError::Recognition(
        "this build has no recognition engine; rebuild with the `ocr` feature".into(),
    ))
}

fn explain_issues(issues: &[QualityIssue]) {
    for issue in issues {
        let human = describe_issue(*issue);
        eprintln!("{}: {}", human.message, human.suggestion);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use terminscan_core::PipelineConfig;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_flags_parse() {
        let cli = Cli::parse_from([
            "terminscan",
            "--config",
            "plan.toml",
            "scan",
            "a.jpg",
            "b.jpg",
            "--flash",
            "--timeout",
            "30",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("plan.toml")));
        match cli.command {
            Command::Scan { images, flash, timeout, all_variants, .. } => {
                assert_eq!(images.len(), 2);
                assert!(flash);
                assert!(!all_variants);
                assert_eq!(timeout, Some(30));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn scan_needs_an_image() {
        assert!(Cli::try_parse_from(["terminscan", "scan"]).is_err());
    }

    #[tokio::test]
    async fn config_command_prints_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, PipelineConfig::default().to_toml_string().expect("render"))
            .expect("write");
        let cli = Cli::parse_from(["terminscan", "--config", path.to_str().expect("utf-8"), "config"]);
        run(cli).await.expect("config command");
    }
}
