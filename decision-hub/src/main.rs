//! Decision hub service binary
//!
//! Serves the HTTP API by default; with `--strategy-id` it runs a single
//! workflow in-process and prints the aggregated result as JSON.

use anyhow::{anyhow, Result};
use clap::Parser;
use decision_hub::{api, config::Settings, hub::DecisionHub, logging};
use decision_hub_sdk::WorkflowRequest;

/// Strategic-analysis decision hub
#[derive(Parser, Debug)]
#[command(name = "decision-hub", version, about)]
struct Args {
    /// Run one workflow for this strategy and print the result instead of
    /// serving HTTP
    #[arg(long)]
    strategy_id: Option<String>,

    /// Skip the compliance check stage
    #[arg(long)]
    no_rules: bool,

    /// Skip scenario simulations
    #[arg(long)]
    no_scenarios: bool,

    /// Run the optimization stage
    #[arg(long)]
    optimize: bool,

    /// Metadata entry as key=value; the value parses as JSON, falling back
    /// to a plain string (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    metadata: Vec<String>,

    /// Bind host override for serve mode
    #[arg(long)]
    host: Option<String>,

    /// Bind port override for serve mode
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let args = Args::parse();

    let mut settings = Settings::from_env()?;
    if let Some(host) = args.host.clone() {
        settings.api_host = host;
    }
    if let Some(port) = args.port {
        settings.api_port = port;
    }

    match args.strategy_id.clone() {
        Some(strategy_id) => run_once(settings, strategy_id, &args).await,
        None => api::serve(settings).await,
    }
}

async fn run_once(settings: Settings, strategy_id: String, args: &Args) -> Result<()> {
    let mut request = WorkflowRequest::new(strategy_id);
    request.run_rules = !args.no_rules;
    request.run_scenarios = !args.no_scenarios;
    request.run_optimization = args.optimize;

    for entry in &args.metadata {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("--meta expects key=value, got '{}'", entry))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        request.metadata.insert(key.to_string(), value);
    }

    request.validate()?;

    let hub = DecisionHub::from_settings(settings);
    let result = hub.run_workflow(request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
