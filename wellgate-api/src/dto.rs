//! Data transfer objects for API requests and responses

use serde::{Deserialize, Serialize};
use wellgate_core::pool::{LeaderboardEntry, PoolOverview};
use wellgate_core::redeem::RedeemStatus;
use wellgate_core::storage::StorageStats;
use wellgate_core::types::{
    PaymentRequest, PoolPayout, Redemption, UserAccount, XpActivity, XpAward, XpStatus,
    XpSummary,
};
use wellgate_core::xp::{xp_to_next_level, AwardOutcome};

/// Resource charged when the caller does not name one
pub const DEFAULT_RESOURCE: &str = "default";

pub(crate) fn default_resource() -> String {
    DEFAULT_RESOURCE.to_string()
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: Option<StorageStatsDto>,
}

/// Storage statistics
#[derive(Debug, Serialize, Deserialize)]
pub struct StorageStatsDto {
    pub total_accounts: u64,
    pub pending_requests: u64,
    pub settled_requests: u64,
    pub consumed_txs: u64,
    pub total_awards: u64,
    pub total_redemptions: u64,
    pub distributed_pools: u64,
}

impl From<StorageStats> for StorageStatsDto {
    fn from(s: StorageStats) -> Self {
        Self {
            total_accounts: s.total_accounts,
            pending_requests: s.pending_requests,
            settled_requests: s.settled_requests,
            consumed_txs: s.consumed_txs,
            total_awards: s.total_awards,
            total_redemptions: s.total_redemptions,
            distributed_pools: s.distributed_pools,
        }
    }
}

/// Access request body
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessRequest {
    pub user_id: String,
    /// Resource being accessed; priced per [`wellgate_core::config::GateConfig`]
    #[serde(default = "default_resource")]
    pub resource: String,
}

/// Granted access response
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessResponse {
    Free { remaining: u32 },
    Covered { credits_remaining: u32 },
}

/// Payment challenge, returned with HTTP 402
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub error: String,
    pub code: String,
    pub challenge: ChallengeDto,
}

/// Payment challenge details
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeDto {
    pub request_id: String,
    pub resource: String,
    pub description: String,
    pub pay_to: String,
    /// Minimum amount in the chain's smallest unit, as a decimal string
    pub amount: String,
    pub asset: Option<String>,
    pub chain_id: u64,
    pub credits_granted: u32,
    pub expires_at: u64,
}

impl From<&PaymentRequest> for ChallengeDto {
    fn from(req: &PaymentRequest) -> Self {
        Self {
            request_id: hex::encode(req.request_id),
            resource: req.resource.clone(),
            description: req.description.clone(),
            pay_to: req.pay_to.clone(),
            amount: req.amount.to_string(),
            asset: req.asset.clone(),
            chain_id: req.chain_id,
            credits_granted: req.credits_granted,
            expires_at: req.expires_at.as_millis(),
        }
    }
}

/// Settlement request body
#[derive(Debug, Serialize, Deserialize)]
pub struct SettleRequest {
    pub request_id: String,
    pub tx_hash: String,
    /// Chain the payment was made on; must match the challenge
    pub chain_id: u64,
    /// Proof timestamp in Unix milliseconds; checked against a freshness window
    pub signed_at: u64,
}

/// Account state response
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub user_id: String,
    pub resource: String,
    pub free_uses_used_today: u32,
    pub free_daily_limit: u32,
    pub prepaid_credits: u32,
}

impl AccountResponse {
    pub fn from_account(account: &UserAccount, free_daily_limit: u32) -> Self {
        Self {
            user_id: account.user_id.clone(),
            resource: account.resource.clone(),
            free_uses_used_today: account.free_uses_used,
            free_daily_limit,
            prepaid_credits: account.prepaid_credits,
        }
    }
}

/// Payment request status response
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestStatusResponse {
    pub request_id: String,
    pub user_id: String,
    pub resource: String,
    pub status: String,
    pub expires_at: u64,
    pub settled_tx: Option<String>,
}

impl From<&PaymentRequest> for RequestStatusResponse {
    fn from(req: &PaymentRequest) -> Self {
        Self {
            request_id: hex::encode(req.request_id),
            user_id: req.user_id.clone(),
            resource: req.resource.clone(),
            status: req.status.to_string(),
            expires_at: req.expires_at.as_millis(),
            settled_tx: req.settled_tx.clone(),
        }
    }
}

/// XP award request body
#[derive(Debug, Serialize, Deserialize)]
pub struct AwardRequest {
    pub user_id: String,
    pub activity: XpActivity,
    /// Optional free-form context stored with the ledger entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// XP award response
#[derive(Debug, Serialize, Deserialize)]
pub struct AwardResponse {
    pub user_id: String,
    pub xp_awarded: u64,
    pub total_xp: u64,
    pub spendable_xp: u64,
    pub level: u32,
    pub leveled_up: bool,
}

impl From<&AwardOutcome> for AwardResponse {
    fn from(o: &AwardOutcome) -> Self {
        Self {
            user_id: o.summary.user_id.clone(),
            xp_awarded: o.xp_awarded,
            total_xp: o.summary.total_xp,
            spendable_xp: o.summary.spendable_xp,
            level: o.summary.level,
            leveled_up: o.leveled_up,
        }
    }
}

/// XP status response with derived streak and level progress
#[derive(Debug, Serialize, Deserialize)]
pub struct XpStatusResponse {
    pub user_id: String,
    pub total_xp: u64,
    pub spendable_xp: u64,
    pub level: u32,
    pub xp_to_next_level: u64,
    pub progress_pct: u8,
    pub streak_days: u32,
    pub level_bonus_bps: u64,
    pub streak_bonus_bps: u64,
}

impl From<&XpStatus> for XpStatusResponse {
    fn from(s: &XpStatus) -> Self {
        Self {
            user_id: s.summary.user_id.clone(),
            total_xp: s.summary.total_xp,
            spendable_xp: s.summary.spendable_xp,
            level: s.summary.level,
            xp_to_next_level: xp_to_next_level(s.summary.total_xp),
            progress_pct: s.progress_pct,
            streak_days: s.streak_days,
            level_bonus_bps: s.level_bonus_bps,
            streak_bonus_bps: s.streak_bonus_bps,
        }
    }
}

/// Single XP award entry
#[derive(Debug, Serialize, Deserialize)]
pub struct AwardDto {
    pub activity: String,
    pub xp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub awarded_at: u64,
}

impl From<&XpAward> for AwardDto {
    fn from(a: &XpAward) -> Self {
        Self {
            activity: a.activity.to_string(),
            xp: a.xp,
            metadata: a.metadata.clone(),
            awarded_at: a.awarded_at.as_millis(),
        }
    }
}

/// XP history response
#[derive(Debug, Serialize, Deserialize)]
pub struct XpHistoryResponse {
    pub user_id: String,
    pub awards: Vec<AwardDto>,
}

/// Redemption request body
///
/// Streak bonuses are derived server-side from XP history.
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub user_id: String,
    pub xp: u64,
}

/// Redemption response
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub redemption_id: String,
    pub user_id: String,
    pub xp_spent: u64,
    pub tokens: u64,
    pub level_bonus_bps: u64,
    pub streak_bonus_bps: u64,
    pub spendable_xp_remaining: u64,
}

impl RedeemResponse {
    pub fn from_parts(redemption: &Redemption, summary: &XpSummary) -> Self {
        Self {
            redemption_id: hex::encode(redemption.redemption_id),
            user_id: redemption.user_id.clone(),
            xp_spent: redemption.xp_spent,
            tokens: redemption.tokens,
            level_bonus_bps: redemption.level_bonus_bps,
            streak_bonus_bps: redemption.streak_bonus_bps,
            spendable_xp_remaining: summary.spendable_xp,
        }
    }
}

/// Single redemption entry
#[derive(Debug, Serialize, Deserialize)]
pub struct RedemptionDto {
    pub redemption_id: String,
    pub xp_spent: u64,
    pub tokens: u64,
    pub redeemed_at: u64,
}

impl From<&Redemption> for RedemptionDto {
    fn from(r: &Redemption) -> Self {
        Self {
            redemption_id: hex::encode(r.redemption_id),
            xp_spent: r.xp_spent,
            tokens: r.tokens,
            redeemed_at: r.redeemed_at.as_millis(),
        }
    }
}

/// Redemption history response
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemHistoryResponse {
    pub user_id: String,
    pub redemptions: Vec<RedemptionDto>,
}

/// Redemption cap and bonus status response
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemStatusResponse {
    pub user_id: String,
    pub daily_cap_tokens: u64,
    pub tokens_redeemed_24h: u64,
    pub tokens_remaining_24h: u64,
    pub level_bonus_bps: u64,
    pub streak_bonus_bps: u64,
    pub streak_days: u32,
    pub spendable_xp: u64,
}

impl RedeemStatusResponse {
    pub fn from_status(user_id: &str, status: &RedeemStatus) -> Self {
        Self {
            user_id: user_id.to_string(),
            daily_cap_tokens: status.daily_cap_tokens,
            tokens_redeemed_24h: status.tokens_redeemed_24h,
            tokens_remaining_24h: status.tokens_remaining_24h,
            level_bonus_bps: status.level_bonus_bps,
            streak_bonus_bps: status.streak_bonus_bps,
            streak_days: status.streak_days,
            spendable_xp: status.spendable_xp,
        }
    }
}

/// Pool distribution request body
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DistributeRequest {
    /// Week to distribute; defaults to the last elapsed week
    #[serde(default)]
    pub week_index: Option<u64>,
}

/// Single payout entry
#[derive(Debug, Serialize, Deserialize)]
pub struct PayoutDto {
    pub user_id: String,
    pub xp_in_week: u64,
    pub amount: u64,
}

impl From<&PoolPayout> for PayoutDto {
    fn from(p: &PoolPayout) -> Self {
        Self {
            user_id: p.user_id.clone(),
            xp_in_week: p.xp_in_week,
            amount: p.amount,
        }
    }
}

/// Pool distribution response
#[derive(Debug, Serialize, Deserialize)]
pub struct DistributeResponse {
    pub week_index: u64,
    pub window_start: u64,
    pub window_end: u64,
    pub payouts: Vec<PayoutDto>,
    pub total_distributed: u64,
}

impl DistributeResponse {
    pub fn from_payouts(week_index: u64, payouts: &[PoolPayout]) -> Self {
        Self {
            week_index,
            window_start: wellgate_core::types::week_start(week_index).as_millis(),
            window_end: wellgate_core::types::week_end(week_index).as_millis(),
            total_distributed: payouts.iter().map(|p| p.amount).sum(),
            payouts: payouts.iter().map(PayoutDto::from).collect(),
        }
    }
}

/// Leaderboard entry in the pool status response
#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardEntryDto {
    pub user_id: String,
    pub xp_in_week: u64,
    pub estimated_share: u64,
}

impl From<&LeaderboardEntry> for LeaderboardEntryDto {
    fn from(e: &LeaderboardEntry) -> Self {
        Self {
            user_id: e.user_id.clone(),
            xp_in_week: e.xp_in_week,
            estimated_share: e.estimated_share,
        }
    }
}

/// Current pool standing response
#[derive(Debug, Serialize, Deserialize)]
pub struct PoolStatusResponse {
    pub week_index: u64,
    pub window_start: u64,
    pub window_end: u64,
    pub pool_amount: u64,
    pub total_xp: u64,
    pub participants: u64,
    pub distributed: bool,
    pub user_xp: Option<u64>,
    pub user_estimated_share: Option<u64>,
    pub leaderboard: Vec<LeaderboardEntryDto>,
}

impl From<&PoolOverview> for PoolStatusResponse {
    fn from(o: &PoolOverview) -> Self {
        Self {
            week_index: o.week_index,
            window_start: o.week_start.as_millis(),
            window_end: o.week_end.as_millis(),
            pool_amount: o.pool_amount,
            total_xp: o.total_xp,
            participants: o.participants,
            distributed: o.distributed,
            user_xp: o.user_xp,
            user_estimated_share: o.user_estimated_share,
            leaderboard: o.leaderboard.iter().map(LeaderboardEntryDto::from).collect(),
        }
    }
}
