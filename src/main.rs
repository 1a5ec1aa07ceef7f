//! Release Gate CLI
//!
//! Entry point for the `release-gate` command-line tool.

use clap::{Parser, Subcommand};
use release_gate::config::{
    load_config, snapshot_env, ConfigError, LoadedConfig, DEFAULT_CONFIG_FILE,
};
use release_gate::net::{HttpFetcher, SystemResolver};
use release_gate::observability::init_logging;
use release_gate::signing::{GpgTool, HostCodeSigningTool};
use release_gate::{CheckContext, CheckName, ExitCode, Gate, VerificationMatrix};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "release-gate")]
#[command(about = "Release verification and promotion gate", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct GlobalArgs {
    /// Path to config file (default: release-gate.toml if present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Release version to verify (overrides VERSION and the package manifest)
    #[arg(long, global = true)]
    release_version: Option<String>,

    /// Required platforms, comma-separated (win,mac,linux)
    #[arg(long, global = true, value_delimiter = ',')]
    required_platforms: Option<Vec<String>>,

    /// Validate local feeds before upload
    #[arg(long, global = true)]
    pre_deploy: bool,

    /// Print the matrix as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

impl GlobalArgs {
    /// CLI configuration layer
    fn overrides(&self) -> Option<Value> {
        let mut layer = Map::new();
        if let Some(ref version) = self.release_version {
            layer.insert("version".to_string(), json!(version));
        }
        if let Some(ref platforms) = self.required_platforms {
            let platforms: Vec<String> = platforms
                .iter()
                .map(|p| p.trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
            layer.insert("required_platforms".to_string(), json!(platforms));
        }
        if self.pre_deploy {
            layer.insert("pre_deploy".to_string(), json!(true));
        }
        (!layer.is_empty()).then_some(Value::Object(layer))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check and decide whether the release may be promoted
    Verify,

    /// Run a single check
    Check {
        #[arg(value_enum)]
        name: CheckName,
    },

    /// Compare two versions (prints -1, 0 or 1)
    Compare { a: String, b: String },

    /// Print the effective configuration
    Config,
}

fn main() {
    let Cli { global, command } = Cli::parse();
    init_logging(global.verbose);

    let code = match command {
        Commands::Verify => run_gate(&global, None),
        Commands::Check { name } => run_gate(&global, Some(name)),
        Commands::Compare { a, b } => run_compare(&a, &b),
        Commands::Config => run_config(&global),
    };
    process::exit(code.as_i32());
}

fn load(global: &GlobalArgs, env: &BTreeMap<String, String>) -> Result<LoadedConfig, ConfigError> {
    let (file, required) = match global.config {
        Some(ref path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    load_config(Some(&file), required, env, global.overrides())
}

fn run_gate(global: &GlobalArgs, check: Option<CheckName>) -> ExitCode {
    let outcome = gate_matrix(global, check, &snapshot_env());
    match outcome {
        Ok(ref matrix) if global.json => match matrix.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing matrix: {}", e);
                return ExitCode::Blocked;
            }
        },
        Ok(ref matrix) => print!("{}", matrix.render()),
        Err(ref message) => eprintln!("{}", message),
    }
    gate_exit(&outcome)
}

/// Anything short of a passing matrix blocks promotion
fn gate_exit(outcome: &Result<VerificationMatrix, String>) -> ExitCode {
    match outcome {
        Ok(matrix) => matrix.exit_code(),
        Err(_) => ExitCode::Blocked,
    }
}

fn gate_matrix(
    global: &GlobalArgs,
    check: Option<CheckName>,
    env: &BTreeMap<String, String>,
) -> Result<VerificationMatrix, String> {
    let loaded = load(global, env).map_err(|e| format!("Error loading config: {}", e))?;
    let fetcher =
        HttpFetcher::new().map_err(|e| format!("Error creating HTTP client: {}", e))?;
    let resolver = SystemResolver;
    let tool = GpgTool::default();
    let code_signing = HostCodeSigningTool;

    let ctx = CheckContext {
        config: &loaded.config,
        fetcher: &fetcher,
        resolver: &resolver,
        signature_tool: &tool,
        code_signing: &code_signing,
    };
    let gate = Gate::new(ctx);
    Ok(match check {
        Some(check) => gate.run_check(check),
        None => gate.run(),
    })
}

fn run_compare(a: &str, b: &str) -> ExitCode {
    match release_version::compare_str(a, b) {
        Ok(ordering) => {
            println!("{}", ordering);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::Usage
        }
    }
}

fn run_config(global: &GlobalArgs) -> ExitCode {
    let loaded = match load(global, &snapshot_env()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::Usage;
        }
    };
    match loaded.effective.to_json() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            ExitCode::Usage
        }
    }
}
