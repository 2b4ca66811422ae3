/*
 * Taint-path confirmation CLI
 *
 * Runs the symbolic engine on a serialized program and taint path.
 *
 * Usage:
 *   symex-confirm --program program.json --taint-path path.json
 *   symex-confirm --program program.json --taint-path path.json --method A.run --preset thorough
 *
 * Output formats:
 *   --format text    Human-readable output (default)
 *   --format json    JSON output (for CI parsing)
 *
 * Exit codes: 0 reachable, 1 unreachable, 2 failed or unknown.
 *
 * Without the `z3` feature the built-in solver searches candidate values
 * only; nonlinear conditions such as `x * 3 == 21` come back unknown (exit 2).
 */

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use codegraph_symex::{EngineConfig, Engine, Preset, Program, TaintPath};

#[derive(Debug, Parser)]
#[command(
    name = "symex-confirm",
    about = "Confirm taint-path reachability with interprocedural symbolic execution",
    after_help = "Builds without the `z3` feature use a candidate-search solver: \
                  conditions it cannot decide (e.g. nonlinear arithmetic) report \
                  unknown and exit with 2."
)]
struct Args {
    /// Program (JSON)
    #[arg(long)]
    program: PathBuf,

    /// Taint path (JSON), sink last
    #[arg(long)]
    taint_path: PathBuf,

    /// Entry method as `Class.name`; defaults to the first taint-path entry's method
    #[arg(long)]
    method: Option<String>,

    /// Engine configuration (YAML)
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Configuration preset: fast, balanced or thorough
    #[arg(long)]
    preset: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    if let Some(path) = &args.config {
        return EngineConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()));
    }
    match &args.preset {
        Some(name) => Ok(EngineConfig::preset(Preset::from_str(name)?)),
        None => Ok(EngineConfig::default()),
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let config = load_config(args)?;
    let program = Program::from_json_file(&args.program)
        .with_context(|| format!("loading {}", args.program.display()))?;
    let taint_path = TaintPath::from_json_file(&args.taint_path)
        .with_context(|| format!("loading {}", args.taint_path.display()))?;

    let method = match &args.method {
        Some(name) => program
            .find_method(name)
            .ok_or_else(|| anyhow!("no method named {} in the program", name))?,
        None => taint_path.first().method.clone(),
    };
    debug!("Entry method {}", method);

    let mut engine = Engine::new(config)?;
    let result = engine.analyze(&program, &method, &taint_path);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!("{}: {}", method, result);
            if let Some(witness) = &result.witness {
                println!("path:");
                for node in &witness.path {
                    println!("  {}", node);
                }
                for parameter in &witness.parameters {
                    let value = parameter.value.as_deref().unwrap_or("<any>");
                    println!("  {}: {} = {}", parameter.name, parameter.ty, value);
                }
            }
        }
    }

    Ok(if result.failed() {
        ExitCode::from(2)
    } else if result.reachable() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
