use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use contract_core::config::DEFAULT_BASE_URL;
use contract_core::{run_scenarios, ContractConfig, ContractError, ContractRunner, ScenarioFile, StaticToken};

/// Run the contract scenarios in a JSON file against a live API.
#[derive(Debug, Parser)]
#[command(name = "contract-runner")]
struct Cli {
    /// Scenario file.
    scenarios: PathBuf,

    /// Base URL for relative scenario urls.
    #[arg(long, env = "CONTRACT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "CONTRACT_TIMEOUT", default_value = "30")]
    timeout: u64,

    /// Bearer token for scenarios with `"auth": true`.
    #[arg(long, env = "CONTRACT_BEARER_TOKEN")]
    token: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "CONTRACT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode, ContractError> {
    let cli = Cli::parse();
    contract_core::init_logging(&cli.log_level);

    let file = ScenarioFile::load(&cli.scenarios)?;
    let config = ContractConfig::new(&cli.base_url).with_timeout(Duration::from_secs(cli.timeout));
    let mut runner = ContractRunner::new(config)?;
    if let Some(token) = cli.token {
        runner = runner.with_credentials(StaticToken::new(token));
    }

    let reports = run_scenarios(&runner, &file).await;
    let mut failed = 0;
    for report in &reports {
        match &report.outcome {
            Ok(result) => {
                let verdict = if result.passed() { "ok" } else { "FAILED" };
                println!("{} ... {verdict} (status {})", report.name, result.response.status);
                print!("{result}");
            }
            Err(e) => println!("{} ... ERROR: {e}", report.name),
        }
        if !report.passed() {
            failed += 1;
        }
    }

    println!("\n{} scenarios, {} passed, {failed} failed", reports.len(), reports.len() - failed);
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
