//! Application state for the API server

use std::sync::Arc;

use wellgate_core::storage::GateStorage;
use wellgate_core::verify::PaymentVerifier;
use wellgate_core::{
    AppConfig, CoreError, GateMetrics, PaymentGate, RedemptionEngine, ReplayGuard,
    WeeklyPoolDistributor, XpLedger,
};

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Payment gate (free tier, credits, challenges, settlement)
    pub gate: Arc<PaymentGate>,
    /// Replay guard for transaction hashes
    pub replay: Arc<ReplayGuard>,
    /// XP ledger
    pub xp: Arc<XpLedger>,
    /// Redemption engine
    pub redeem: Arc<RedemptionEngine>,
    /// Weekly pool distributor
    pub pool: Arc<WeeklyPoolDistributor>,
    /// Shared storage backend
    pub storage: Arc<dyn GateStorage>,
    /// Process-wide metrics
    pub metrics: Arc<GateMetrics>,
    /// Bearer token required for operator endpoints; None disables auth
    pub operator_token: Option<String>,
    /// API version
    pub version: String,
}

impl AppState {
    /// Create new app state from a storage backend and verifier
    pub fn new(
        config: &AppConfig,
        storage: Arc<dyn GateStorage>,
        verifier: Arc<dyn PaymentVerifier>,
        operator_token: Option<String>,
    ) -> Result<Self, CoreError> {
        let gate = Arc::new(PaymentGate::new(
            storage.clone(),
            verifier,
            config.gate.clone(),
            &config.chain,
        )?);
        let replay = Arc::new(ReplayGuard::new(storage.clone()));
        let xp = Arc::new(XpLedger::new(storage.clone()));
        let redeem = Arc::new(RedemptionEngine::new(
            storage.clone(),
            config.redeem.clone(),
        ));
        let pool = Arc::new(WeeklyPoolDistributor::new(
            storage.clone(),
            config.pool.clone(),
        ));

        Ok(Self {
            gate,
            replay,
            xp,
            redeem,
            pool,
            storage,
            metrics: Arc::new(GateMetrics::new()),
            operator_token,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Bearer token required for operator endpoints (awards, distribution)
    pub operator_token: Option<String>,
    /// How often the expired-challenge sweeper runs, in seconds
    pub sweep_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            operator_token: None,
            sweep_interval_secs: 60,
        }
    }
}
