//! Wellgate API Server
//!
//! Provides REST APIs for the pay-per-use access gate, XP ledger,
//! redemption engine and weekly pool distributor.
//!
//! ## Endpoints
//!
//! ### Access & Payments
//! - POST /access - Consume one use of a resource (200 granted, 402 payment challenge)
//! - GET /accounts/:user_id?resource= - Get per-resource account state
//! - POST /payments/settle - Settle a challenge with a transaction hash
//! - GET /payments/:request_id - Get payment request status
//!
//! ### XP Ledger
//! - POST /xp/awards - Record an XP award (operator)
//! - GET /xp/:user_id - Get XP status with streak and level progress
//! - GET /xp/:user_id/history - Get award history
//!
//! ### Redemptions
//! - POST /redemptions - Redeem spendable XP for tokens (operator)
//! - GET /redemptions/:user_id - Get redemption history
//! - GET /redemptions/:user_id/status - Get cap usage and bonus tiers
//!
//! ### Weekly Pool
//! - POST /pool/distribute - Distribute an elapsed week (operator)
//! - GET /pool/status - Current week standing and leaderboard
//! - GET /pool/:week_index - Get payouts for a distributed week
//!
//! ### Observability
//! - GET /health - Health check with storage stats
//! - GET /metrics - Prometheus text exposition
//! - GET /metrics/snapshot - JSON metrics snapshot

pub mod dto;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use dto::*;
pub use error::*;
pub use routes::*;
pub use server::*;
pub use state::*;
