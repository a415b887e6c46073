//! 核心类型定义
//!
//! 按域拆分：通用基础类型、支付、XP、兑换与周池。

pub mod common;
pub mod payment;
pub mod pool;
pub mod redeem;
pub mod xp;

pub use common::{
    compute_digest, digest_from_hex, digest_to_hex, generate_random_id, normalize_address,
    normalize_tx_hash, parse_hex_u128, parse_hex_u64, week_end, week_start, Address, AwardId,
    Digest32, RedemptionId, RequestId, Timestamp, TxHash, UserId, MILLIS_PER_DAY,
    MILLIS_PER_WEEK,
};
pub use payment::{
    AccessDecision, PaymentProof, PaymentRequest, RequestStatus, UserAccount, VerifiedTransfer,
};
pub use pool::{PoolClaim, PoolPayout, PoolStatus, WeeklyPool};
pub use redeem::{Redemption, BPS_DENOMINATOR};
pub use xp::{XpActivity, XpAward, XpStatus, XpSummary};
