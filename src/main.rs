use derivbot::config::Config;
use derivbot::cycle::{Connect, DerivConnect, SymbolCycle};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let config = Arc::new(Config::from_env()?);
    log_configuration(&config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let connector: Arc<dyn Connect> = Arc::new(DerivConnect);

    let mut tasks = Vec::new();
    for symbol in &config.symbols {
        let cycle = SymbolCycle::new(symbol.clone(), config.clone(), connector.clone());
        tasks.push(tokio::spawn(cycle.run(shutdown_rx.clone())));
    }
    tracing::info!("✅ {} symbol tasks spawned", tasks.len());
    tracing::info!("Press Ctrl+C to stop...\n");

    tokio::signal::ctrl_c().await?;
    tracing::info!("\n⚠️  Received Ctrl+C, draining symbol tasks...");
    let _ = shutdown_tx.send(true);

    // Graceful drain: a task inside a settlement wait finishes it first
    for task in tasks {
        let _ = task.await;
    }

    tracing::info!("👋 derivbot stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "derivbot=info".into()),
        )
        .init();
}

fn log_configuration(config: &Config) {
    tracing::info!("🚀 derivbot starting");
    tracing::info!("📊 Configuration:");
    tracing::info!("  Symbols: {}", config.symbols.join(", "));
    tracing::info!("  Candle granularity: {}s", config.granularity);
    // Granularity and contract length are configured independently;
    // surface both so drift between them is visible
    tracing::info!(
        "  Contract: {}{} (+{}s settle buffer)",
        config.contract_duration,
        config.duration_unit,
        config.settlement_buffer_secs
    );
    tracing::info!(
        "  Staking: {:?} | initial ${:.2} | cap {:?}",
        config.staking.policy,
        config.staking.initial_stake,
        config.staking.max_stake
    );
    tracing::info!("  Direction mapping: {:?}", config.direction_mapping);
}
