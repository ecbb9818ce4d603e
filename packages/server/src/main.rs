use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::storage::pinata::PinataBlobStore;
use ledger::EvmLedgerClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::aggregator::{Aggregator, AggregatorSettings};
use server::classifier::{HttpClassifier, SeverityClassifier};
use server::config::AppConfig;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let blobs = PinataBlobStore::new(config.pinata_settings())
        .context("Failed to initialise blob store client")?;
    let ledger = EvmLedgerClient::connect(config.evm_settings())
        .await
        .context("Failed to connect to ledger")?;

    let classifier: Option<Arc<dyn SeverityClassifier>> = match &config.classifier.url {
        Some(url) => {
            let classifier =
                HttpClassifier::new(url, Duration::from_secs(config.classifier.timeout_secs))
                    .context("Failed to initialise classifier client")?;
            info!(url = %url, "Severity classifier enabled");
            Some(Arc::new(classifier))
        }
        None => {
            info!("No severity classifier configured; unclassified FIRs get severity 1");
            None
        }
    };

    let aggregator = Aggregator::new(
        Arc::new(ledger),
        Arc::new(blobs),
        classifier,
        AggregatorSettings {
            max_concurrent_fetches: config.aggregator.max_concurrent_fetches,
            cache_capacity: config.aggregator.cache_capacity,
            retry: config.retry,
        },
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;

    let state = AppState {
        aggregator: Arc::new(aggregator),
        config,
    };
    let app = server::build_router(state);

    info!("FIR ledger gateway listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
