//! 兑换引擎模块
//!
//! 将可兑换 XP 按固定汇率转换为奖励代币。
//!
//! # 汇率构成
//!
//! - 基础：每 10 XP 兑 1 代币
//! - 等级加成：5-9 级 +10%，10-19 级 +25%，20 级以上 +50%
//! - 连续打卡加成：7 天以上 +50%，30 天以上 +100%
//! - 两项加成相加后一次性套用
//!
//! # 限额
//!
//! 单笔最低 100 XP；滚动 24 小时内每用户最多兑出 250 代币，
//! 超出即整笔拒绝。

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::RedeemConfig;
use crate::error::{CoreError, CoreResult};
use crate::storage::GateStorage;
use crate::types::{
    Redemption, Timestamp, UserId, XpSummary, BPS_DENOMINATOR, MILLIS_PER_DAY,
};
use crate::xp::streak_from_awards;

/// 等级加成（万分比）
pub fn level_bonus_bps(level: u32) -> u64 {
    match level {
        0..=4 => 0,
        5..=9 => 1_000,
        10..=19 => 2_500,
        _ => 5_000,
    }
}

/// 连续打卡加成（万分比）
pub fn streak_bonus_bps(streak_days: u32) -> u64 {
    if streak_days >= 30 {
        10_000
    } else if streak_days >= 7 {
        5_000
    } else {
        0
    }
}

/// 按加成后的汇率折算代币数（向下取整）
pub fn tokens_for_xp(xp: u64, bonus_bps: u64, xp_per_token: u64) -> u64 {
    let numerator = (xp as u128) * ((BPS_DENOMINATOR + bonus_bps) as u128);
    let denominator = (BPS_DENOMINATOR as u128) * (xp_per_token as u128);
    (numerator / denominator) as u64
}

/// 兑换报价
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RedeemQuote {
    /// 消耗的 XP
    pub xp: u64,
    /// 等级加成（万分比）
    pub level_bonus_bps: u64,
    /// 连续打卡加成（万分比）
    pub streak_bonus_bps: u64,
    /// 折算出的代币数
    pub tokens: u64,
}

/// 兑换限额状态（只读视图）
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RedeemStatus {
    /// 滚动 24 小时限额
    pub daily_cap_tokens: u64,
    /// 窗口内已兑出的代币数
    pub tokens_redeemed_24h: u64,
    /// 窗口内剩余可兑代币数
    pub tokens_remaining_24h: u64,
    /// 当前适用的等级加成（万分比）
    pub level_bonus_bps: u64,
    /// 当前适用的连续打卡加成（万分比）
    pub streak_bonus_bps: u64,
    /// 连续打卡天数
    pub streak_days: u32,
    /// 可兑换 XP 余额
    pub spendable_xp: u64,
}

/// 兑换引擎
pub struct RedemptionEngine {
    storage: Arc<dyn GateStorage>,
    config: RedeemConfig,
}

impl RedemptionEngine {
    /// 创建兑换引擎
    pub fn new(storage: Arc<dyn GateStorage>, config: RedeemConfig) -> Self {
        Self { storage, config }
    }

    /// 按等级与连续打卡天数报价（不触碰状态）
    pub fn quote(&self, xp: u64, level: u32, streak_days: u32) -> RedeemQuote {
        let level_bps = level_bonus_bps(level);
        let streak_bps = streak_bonus_bps(streak_days);
        RedeemQuote {
            xp,
            level_bonus_bps: level_bps,
            streak_bonus_bps: streak_bps,
            tokens: tokens_for_xp(xp, level_bps + streak_bps, self.config.xp_per_token),
        }
    }

    /// 执行一次兑换
    ///
    /// 连续打卡天数由记账历史推导，不接受调用方自报。
    /// 余额与滚动限额的最终检查在存储临界区内完成，
    /// 任一不满足则整笔拒绝。
    pub async fn redeem(&self, user_id: &UserId, xp: u64) -> CoreResult<(Redemption, XpSummary)> {
        if xp < self.config.min_xp {
            return Err(CoreError::BelowMinimumRedeem {
                minimum: self.config.min_xp,
                actual: xp,
            });
        }

        let summary = self
            .storage
            .get_xp_summary(user_id)
            .await?
            .ok_or(CoreError::InsufficientXp {
                required: xp,
                available: 0,
            })?;

        let awards = self.storage.list_awards(user_id).await?;
        let streak_days = streak_from_awards(&awards, Timestamp::now());
        let quote = self.quote(xp, summary.level, streak_days);
        debug!(
            "redeem quote for {}: {} xp -> {} tokens (level {} +{}bps, streak {} +{}bps)",
            user_id,
            xp,
            quote.tokens,
            summary.level,
            quote.level_bonus_bps,
            streak_days,
            quote.streak_bonus_bps
        );

        let redemption = Redemption::new(
            user_id.clone(),
            xp,
            quote.tokens,
            quote.level_bonus_bps,
            quote.streak_bonus_bps,
            summary.level,
            streak_days,
            Timestamp::now(),
        );
        let summary = self
            .storage
            .record_redemption(&redemption, self.config.daily_cap_tokens)
            .await?;
        info!(
            "redeemed {} xp for {} tokens, user {}",
            xp, redemption.tokens, user_id
        );
        Ok((redemption, summary))
    }

    /// 用户兑换历史（按时间升序）
    pub async fn history(&self, user_id: &UserId) -> CoreResult<Vec<Redemption>> {
        self.storage.list_redemptions(user_id).await
    }

    /// 限额与加成状态（不触碰状态）
    pub async fn status(&self, user_id: &UserId) -> CoreResult<RedeemStatus> {
        let now = Timestamp::now();
        let window_start = now.0.saturating_sub(MILLIS_PER_DAY);

        let redeemed: u64 = self
            .storage
            .list_redemptions(user_id)
            .await?
            .iter()
            .filter(|r| r.redeemed_at.0 > window_start)
            .map(|r| r.tokens)
            .sum();

        let summary = self.storage.get_xp_summary(user_id).await?;
        let (level, spendable_xp) = summary
            .map(|s| (s.level, s.spendable_xp))
            .unwrap_or((0, 0));
        let awards = self.storage.list_awards(user_id).await?;
        let streak_days = streak_from_awards(&awards, now);

        Ok(RedeemStatus {
            daily_cap_tokens: self.config.daily_cap_tokens,
            tokens_redeemed_24h: redeemed,
            tokens_remaining_24h: self.config.daily_cap_tokens.saturating_sub(redeemed),
            level_bonus_bps: level_bonus_bps(level),
            streak_bonus_bps: streak_bonus_bps(streak_days),
            streak_days,
            spendable_xp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::{XpActivity, XpAward};

    async fn engine_with_xp(total_awards: u32) -> (RedemptionEngine, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let user = "user-1".to_string();
        for _ in 0..total_awards {
            storage
                .record_award(&XpAward::new(
                    user.clone(),
                    XpActivity::StreakThirty,
                    Timestamp::now(),
                ))
                .await
                .unwrap();
        }
        (
            RedemptionEngine::new(storage.clone(), RedeemConfig::default()),
            storage,
        )
    }

    #[test]
    fn test_bonus_tiers() {
        assert_eq!(level_bonus_bps(1), 0);
        assert_eq!(level_bonus_bps(4), 0);
        assert_eq!(level_bonus_bps(5), 1_000);
        assert_eq!(level_bonus_bps(9), 1_000);
        assert_eq!(level_bonus_bps(10), 2_500);
        assert_eq!(level_bonus_bps(19), 2_500);
        assert_eq!(level_bonus_bps(20), 5_000);

        assert_eq!(streak_bonus_bps(6), 0);
        assert_eq!(streak_bonus_bps(7), 5_000);
        assert_eq!(streak_bonus_bps(29), 5_000);
        assert_eq!(streak_bonus_bps(30), 10_000);
    }

    #[test]
    fn test_conversion_values() {
        // 1000 XP 在各档位的折算
        assert_eq!(tokens_for_xp(1000, 0, 10), 100);
        assert_eq!(tokens_for_xp(1000, 1_000, 10), 110);
        assert_eq!(tokens_for_xp(1000, 2_500, 10), 125);
        assert_eq!(tokens_for_xp(1000, 5_000, 10), 150);
        // 155 XP 基础档向下取整
        assert_eq!(tokens_for_xp(155, 0, 10), 15);
        // 加成相加：+25% 等级 +50% 打卡
        assert_eq!(tokens_for_xp(1000, 7_500, 10), 175);
    }

    #[tokio::test]
    async fn test_below_minimum_rejected() {
        let (engine, _storage) = engine_with_xp(10).await;
        let err = engine
            .redeem(&"user-1".to_string(), 99)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::BelowMinimumRedeem { minimum: 100, actual: 99 }
        ));
    }

    #[tokio::test]
    async fn test_redeem_debits_spendable_only() {
        // 2000 XP，等级 4（无加成）
        let (engine, _storage) = engine_with_xp(10).await;
        let user = "user-1".to_string();

        let (redemption, summary) = engine.redeem(&user, 1000).await.unwrap();
        assert_eq!(redemption.tokens, 100);
        assert_eq!(summary.spendable_xp, 1000);
        // 等级按终身累计保持不变
        assert_eq!(summary.total_xp, 2000);
        assert_eq!(summary.level, 4);
    }

    #[tokio::test]
    async fn test_insufficient_xp() {
        let (engine, _storage) = engine_with_xp(1).await;
        let err = engine
            .redeem(&"user-1".to_string(), 500)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientXp { required: 500, available: 200 }
        ));
    }

    #[tokio::test]
    async fn test_daily_cap_rejects_in_full() {
        // 20000 XP，等级 14（+25%）
        let (engine, _storage) = engine_with_xp(100).await;
        let user = "user-1".to_string();

        // 1600 XP -> 200 代币，额度剩 50
        let (first, _) = engine.redeem(&user, 1600).await.unwrap();
        assert_eq!(first.tokens, 200);

        let err = engine.redeem(&user, 800).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::DailyCapExceeded { requested: 100, available: 50 }
        ));

        // 50 代币以内仍可兑换
        let (redemption, _) = engine.redeem(&user, 400).await.unwrap();
        assert_eq!(redemption.tokens, 50);
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let (engine, _storage) = engine_with_xp(0).await;
        let err = engine
            .redeem(&"nobody".to_string(), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientXp { .. }));
    }

    #[tokio::test]
    async fn test_streak_bonus_is_derived_from_history() {
        use crate::types::MILLIS_PER_DAY;
        let storage = Arc::new(MemoryStorage::new());
        let engine = RedemptionEngine::new(storage.clone(), RedeemConfig::default());
        let user = "user-1".to_string();

        // 连续 7 天各一枚徽章，终点为今天：触发 +50% 打卡加成
        let now = Timestamp::now();
        for days_ago in 0..7u64 {
            storage
                .record_award(&XpAward::new(
                    user.clone(),
                    XpActivity::BadgeEarned,
                    Timestamp::from_millis(now.0 - days_ago * MILLIS_PER_DAY),
                ))
                .await
                .unwrap();
        }

        // 700 XP，等级 2（无等级加成）
        let (redemption, _) = engine.redeem(&user, 200).await.unwrap();
        assert_eq!(redemption.streak_days, 7);
        assert_eq!(redemption.streak_bonus_bps, 5_000);
        assert_eq!(redemption.tokens, 30);
    }

    #[tokio::test]
    async fn test_status_reports_cap_headroom() {
        let (engine, _storage) = engine_with_xp(100).await;
        let user = "user-1".to_string();

        let (_, _) = engine.redeem(&user, 1600).await.unwrap();
        let status = engine.status(&user).await.unwrap();
        assert_eq!(status.daily_cap_tokens, 250);
        assert_eq!(status.tokens_redeemed_24h, 200);
        assert_eq!(status.tokens_remaining_24h, 50);
        assert_eq!(status.level_bonus_bps, 2_500);
        assert_eq!(status.streak_days, 1);
        assert_eq!(status.streak_bonus_bps, 0);
        assert_eq!(status.spendable_xp, 18_400);
    }

    #[tokio::test]
    async fn test_status_for_unknown_user_is_zero() {
        let (engine, _storage) = engine_with_xp(0).await;
        let status = engine.status(&"nobody".to_string()).await.unwrap();
        assert_eq!(status.tokens_redeemed_24h, 0);
        assert_eq!(status.tokens_remaining_24h, 250);
        assert_eq!(status.streak_days, 0);
        assert_eq!(status.spendable_xp, 0);
    }
}
