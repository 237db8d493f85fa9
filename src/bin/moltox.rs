use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use moltox::config::{PipelineConfig, CONFIG_ENV};
use moltox::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "moltox")]
#[command(about = "SMILES analysis: 3D structure, descriptors, toxicity and depictions", long_about = None)]
struct Cli {
    /// Config TOML file
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full analysis report as JSON
    Analyze {
        smiles: Option<String>,
        /// Question for the explanation service
        #[arg(short, long)]
        question: Option<String>,
    },
    /// 3D structure as a MOL block
    Convert { smiles: Option<String> },
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing output")?);
    Ok(())
}

fn fail(code: u8, message: impl std::fmt::Display) -> anyhow::Result<ExitCode> {
    print_json(&json!({ "error": message.to_string() }))?;
    Ok(ExitCode::from(code))
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let (smiles, question) = match &cli.command {
        Command::Analyze { smiles, question } => (smiles, question.as_deref()),
        Command::Convert { smiles } => (smiles, None),
    };
    let Some(smiles) = smiles.as_deref().filter(|s| !s.trim().is_empty()) else {
        return fail(2, "No SMILES string provided");
    };

    let pipeline = Pipeline::from_config(config).context("loading toxicity model")?;
    match &cli.command {
        Command::Analyze { .. } => match pipeline.analyze(smiles, question) {
            Ok(analysis) => {
                print_json(&analysis.report())?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => fail(1, e),
        },
        Command::Convert { .. } => match pipeline.convert(smiles) {
            Ok(report) => {
                print_json(&report)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => fail(1, e),
        },
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moltox=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "moltox starting");
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
