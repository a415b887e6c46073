//! Gate API server entrypoint
//!
//! Configuration comes from `WELLGATE_*` environment variables; see
//! `wellgate_core::config` for the full list.

use std::sync::Arc;

use wellgate_api::{run_server, ApiConfig};
use wellgate_core::chain::EvmRpcClient;
use wellgate_core::storage::{SledStorage, StorageConfig};
use wellgate_core::{AppConfig, ChainVerifier};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app_config = AppConfig::from_env();
    let storage_config = StorageConfig {
        data_dir: std::env::var("WELLGATE_DATA_DIR")
            .unwrap_or_else(|_| StorageConfig::default().data_dir),
        ..StorageConfig::default()
    };

    let api_config = ApiConfig {
        host: std::env::var("WELLGATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        port: std::env::var("WELLGATE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000),
        operator_token: std::env::var("WELLGATE_OPERATOR_TOKEN").ok(),
        ..ApiConfig::default()
    };

    let storage = Arc::new(SledStorage::new(&storage_config)?);
    let rpc = EvmRpcClient::new(app_config.chain.clone())?;

    // Refuse to start against a node on the wrong chain; a node that is
    // merely unreachable right now is not fatal
    match rpc.get_chain_id().await {
        Ok(reported) if reported != rpc.chain_id() => {
            return Err(format!(
                "chain id mismatch: node reports {}, configured {}",
                reported,
                rpc.chain_id()
            )
            .into());
        }
        Ok(reported) => tracing::info!("connected to chain {}", reported),
        Err(e) if e.is_transient() => {
            tracing::warn!("skipping chain id check, node unreachable: {}", e)
        }
        Err(e) => return Err(e.into()),
    }

    let verifier = Arc::new(ChainVerifier::new(rpc));

    run_server(api_config, app_config, storage, verifier).await
}
