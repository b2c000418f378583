use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use parsify_engine::{Engine, EngineSettings, load_handbook_file};
use parsify_types::Handbook;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "parsify", version, about = "Walk paginated HTTP APIs described by a handbook")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run parsers and print their results as JSON
    Run(RunArgs),
    /// Load and validate a handbook without sending requests
    Validate {
        /// Path to the handbook (YAML or JSON)
        handbook: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the handbook (YAML or JSON)
    handbook: PathBuf,
    /// Only run these scopes, in the given order
    #[arg(long = "scope", value_name = "NAME")]
    scopes: Vec<String>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
    /// Per-request timeout in seconds
    #[arg(long, value_name = "N")]
    timeout_secs: Option<u64>,
    /// Stop a chain after this many step invocations
    #[arg(long, value_name = "N")]
    max_invocations: Option<u32>,
}

impl RunArgs {
    fn settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::default();
        if let Some(seconds) = self.timeout_secs {
            settings.request_timeout = Duration::from_secs(seconds);
        }
        settings.max_invocations_per_chain = self.max_invocations;
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_handbook(&args),
        Command::Validate { handbook } => validate_handbook(&handbook),
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_handbook(args: &RunArgs) -> Result<()> {
    let handbook = load_handbook_file(&args.handbook).with_context(|| format!("failed to load {}", args.handbook.display()))?;
    let mut engine = Engine::http(handbook, args.settings())?;

    let results = if args.scopes.is_empty() {
        engine.run_all()?
    } else {
        let mut results = IndexMap::new();
        for scope in &args.scopes {
            let values = engine.run_scope(Some(scope.as_str().into()))?;
            results.insert(scope.clone(), values);
        }
        results
    };
    info!(scopes = results.len(), "handbook run finished");

    println!("{}", render_results(&results, args.pretty)?);
    Ok(())
}

fn render_results(results: &IndexMap<String, Vec<Value>>, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(results)?
    } else {
        serde_json::to_string(results)?
    };
    Ok(rendered)
}

fn validate_handbook(path: &Path) -> Result<()> {
    let handbook = load_handbook_file(path).with_context(|| format!("failed to load {}", path.display()))?;
    for line in summarize(&handbook) {
        println!("{line}");
    }
    Ok(())
}

fn summarize(handbook: &Handbook) -> Vec<String> {
    handbook
        .parsers
        .iter()
        .map(|parser| {
            let final_steps = parser
                .steps
                .iter()
                .filter(|step| step.output.is_parser_final)
                .map(|step| step.name.as_str())
                .collect::<Vec<_>>();
            let result = if final_steps.is_empty() {
                "no parser-final step".to_string()
            } else {
                format!("result from {}", final_steps.join(", "))
            };
            format!(
                "{}: {} chains, {} steps, {}",
                parser.scope,
                parser.chain_ids().len(),
                parser.steps.len(),
                result
            )
        })
        .collect()
}
