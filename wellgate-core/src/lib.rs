//! Wellgate Core
//!
//! Pay-per-use access control with on-chain payment verification,
//! XP accounting and reward distribution.
//!
//! # Components
//!
//! - **Payment gate**: free tier, prepaid credits and 402 payment
//!   challenges ([`gate`])
//! - **Chain verification**: independent verification of payment
//!   transactions over EVM JSON-RPC ([`chain`], [`verify`])
//! - **Replay guard**: global set of consumed transaction hashes
//!   ([`replay`])
//! - **XP ledger**: append-only activity awards with level tracking
//!   ([`xp`])
//! - **Redemption engine**: XP to token conversion with level and
//!   streak bonuses under a rolling daily cap ([`redeem`])
//! - **Weekly pool**: proportional distribution of a fixed weekly
//!   token pool ([`pool`])
//!
//! Storage is pluggable behind [`storage::GateStorage`], with in-memory
//! and sled-backed implementations.

pub mod chain;
pub mod config;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod pool;
pub mod redeem;
pub mod replay;
pub mod storage;
pub mod types;
pub mod verify;
pub mod xp;

pub use config::AppConfig;
pub use error::{CoreError, CoreResult};
pub use gate::PaymentGate;
pub use metrics::{GateMetrics, MetricsSnapshot};
pub use pool::{LeaderboardEntry, PoolOverview, WeeklyPoolDistributor};
pub use redeem::{RedeemStatus, RedemptionEngine};
pub use replay::ReplayGuard;
pub use storage::{GateStorage, MemoryStorage, SledStorage, StorageConfig};
pub use types::{
    AccessDecision, PaymentProof, PaymentRequest, UserAccount, XpActivity, XpStatus,
};
pub use verify::{ChainVerifier, FakeVerifier, PaymentVerifier};
pub use xp::XpLedger;
