//! 兑换域类型定义
//!
//! 包含 XP 兑换记录与加成明细。

use serde::{Deserialize, Serialize};

use super::common::{generate_random_id, RedemptionId, Timestamp, UserId};

/// 万分比基数
pub const BPS_DENOMINATOR: u64 = 10_000;

/// 兑换记录
///
/// 记录一次 XP 到代币的转换，含加成明细，便于审计。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    /// 兑换ID
    pub redemption_id: RedemptionId,
    /// 用户ID
    pub user_id: UserId,
    /// 消耗的 XP
    pub xp_spent: u64,
    /// 兑换得到的代币数
    pub tokens: u64,
    /// 等级加成（万分比）
    pub level_bonus_bps: u64,
    /// 连续打卡加成（万分比）
    pub streak_bonus_bps: u64,
    /// 兑换时用户等级
    pub level_at_redeem: u32,
    /// 兑换时连续打卡天数
    pub streak_days: u32,
    /// 兑换时间
    pub redeemed_at: Timestamp,
}

impl Redemption {
    /// 创建兑换记录
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        xp_spent: u64,
        tokens: u64,
        level_bonus_bps: u64,
        streak_bonus_bps: u64,
        level_at_redeem: u32,
        streak_days: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            redemption_id: generate_random_id(),
            user_id,
            xp_spent,
            tokens,
            level_bonus_bps,
            streak_bonus_bps,
            level_at_redeem,
            streak_days,
            redeemed_at: now,
        }
    }
}
