//! Process entry point: loads the YAML risk configuration, wires the
//! state managers and rule registry into a [`RiskEngine`], and runs it
//! until shutdown.
//!
//! The broker connection itself is an external collaborator (§1/§6 of
//! the design this serves): this binary drives the engine against
//! [`MockSdk`] as a stand-in, the same way the rest of the workspace
//! tests against it. Wiring a real broker transport means constructing
//! an `Arc<dyn BrokerSdk>` from that transport's adapter crate and
//! passing it here instead - the engine itself is transport-agnostic.

use clap::Parser;
use riskguard_core::{
    clock::LiveClock,
    config::RiskConfig,
    engine::{fan_in, RiskEngine},
    error::EngineError,
    event_bus::EventBus,
    logging,
    shutdown::ShutdownSequence,
};
use riskguard_sdk::{
    event::SystemStarted, BrokerSdk, Event, EventKind, EventSource, MockSdk,
};
use riskguard_store::{SqliteStore, Store};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Always-on trading protection service")]
struct Cli {
    /// Path to the YAML risk configuration.
    #[arg(long, default_value = "riskguard.yaml")]
    config: std::path::PathBuf,

    /// Emit structured logs as JSON instead of human-readable text.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.json_logs {
        logging::init_json_logging();
    } else {
        logging::init_logging();
    }

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let code = riskguard_core::error::exit_code_for(&err);
            tracing::error!(error = %err, "riskguard exiting");
            std::process::exit(code)
        }
    }
}

async fn run(cli: Cli) -> Result<(), EngineError> {
    let raw = std::fs::read_to_string(&cli.config)
        .map_err(|err| EngineError::ConfigInvalid(format!("reading {}: {err}", cli.config.display())))?;
    let config = RiskConfig::from_yaml_str(&raw)?;

    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(std::path::Path::new(&config.general.database_path))
            .map_err(|err| EngineError::ConfigInvalid(format!("opening database: {err}")))?,
    );
    let clock = Arc::new(LiveClock);
    let sdk: Arc<dyn BrokerSdk> = Arc::new(MockSdk::new());

    let rules = config.build_rules()?;
    let automation_rules = config.build_automation_rules();
    let engine_config = config.engine_config()?;

    let engine = Arc::new(RiskEngine::new(rules, automation_rules, engine_config, store, clock, sdk));
    engine.bootstrap().await?;

    let event_bus = Arc::new(EventBus::new());
    event_bus.publish(Event::new(EventKind::SystemStarted(SystemStarted), chrono::Utc::now(), EventSource::Internal));

    let run_handle = tokio::spawn(Arc::clone(&engine).run(fan_in(&event_bus, 1024)));

    tokio::signal::ctrl_c().await.map_err(|err| EngineError::ConfigInvalid(format!("signal handler: {err}")))?;
    tracing::info!("shutdown requested");
    run_handle.abort();

    let sequence = ShutdownSequence::new(Arc::clone(engine.timers()), Arc::clone(engine.store()));
    sequence.run(async {}).await?;
    Ok(())
}
