//! XP 账本模块
//!
//! 负责活动奖励的登记与用户汇总的维护。
//!
//! # 核心功能
//!
//! - 记账：按活动类型授予固定 XP，仅追加
//! - 汇总：终身累计与可兑换余额分开维护
//! - 等级：由终身累计 XP 推导，见 [`level`]
//! - 连续天数：由记账历史推导，不依赖调用方自报

pub mod level;

pub use level::{level_for_xp, xp_for_level, xp_to_next_level};

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::storage::GateStorage;
use crate::types::{Timestamp, UserId, XpActivity, XpAward, XpStatus, XpSummary};

/// 连续打卡天数：以 `now` 所在 UTC 日为终点的连续记账天数
///
/// 当天没有任何记账即为 0。
pub fn streak_from_awards(awards: &[XpAward], now: Timestamp) -> u32 {
    let days: HashSet<u64> = awards.iter().map(|a| a.awarded_at.day_index()).collect();
    let mut streak = 0u32;
    let mut day = now.day_index();
    loop {
        if !days.contains(&day) {
            break;
        }
        streak += 1;
        match day.checked_sub(1) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// 一次记账的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    /// 本次授予的 XP
    pub xp_awarded: u64,
    /// 记账后的汇总
    pub summary: XpSummary,
    /// 本次记账是否导致升级
    pub leveled_up: bool,
}

/// XP 账本
pub struct XpLedger {
    storage: Arc<dyn GateStorage>,
}

impl XpLedger {
    /// 创建 XP 账本
    pub fn new(storage: Arc<dyn GateStorage>) -> Self {
        Self { storage }
    }

    /// 登记一次活动奖励
    pub async fn award(
        &self,
        user_id: &UserId,
        activity: XpActivity,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<AwardOutcome> {
        self.award_at(user_id, activity, metadata, Timestamp::now())
            .await
    }

    /// 以指定时间登记活动奖励（补录历史数据）
    pub async fn award_at(
        &self,
        user_id: &UserId,
        activity: XpActivity,
        metadata: Option<serde_json::Value>,
        at: Timestamp,
    ) -> CoreResult<AwardOutcome> {
        if user_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("empty user id".to_string()));
        }
        let mut award = XpAward::new(user_id.clone(), activity, at);
        award.metadata = metadata;
        let summary = self.storage.record_award(&award).await?;
        debug!(
            "awarded {} xp to {} for {}, total {} level {}",
            award.xp, user_id, activity, summary.total_xp, summary.level
        );
        // 记账前的等级由记账后的累计值回推
        let leveled_up = level_for_xp(summary.total_xp - award.xp) < summary.level;
        Ok(AwardOutcome {
            xp_awarded: award.xp,
            summary,
            leveled_up,
        })
    }

    /// 用户 XP 汇总（无记录时返回零值汇总）
    pub async fn summary(&self, user_id: &UserId) -> CoreResult<XpSummary> {
        Ok(self
            .storage
            .get_xp_summary(user_id)
            .await?
            .unwrap_or_else(|| XpSummary::new(user_id.clone(), Timestamp::now())))
    }

    /// 用户记账历史（按时间升序）
    pub async fn history(&self, user_id: &UserId) -> CoreResult<Vec<XpAward>> {
        self.storage.list_awards(user_id).await
    }

    /// 当前连续打卡天数（由记账历史推导）
    pub async fn streak(&self, user_id: &UserId) -> CoreResult<u32> {
        let awards = self.storage.list_awards(user_id).await?;
        Ok(streak_from_awards(&awards, Timestamp::now()))
    }

    /// 状态视图：汇总、连续天数、等级进度与加成档位
    pub async fn status(&self, user_id: &UserId) -> CoreResult<XpStatus> {
        let summary = self.summary(user_id).await?;
        let streak = self.streak(user_id).await?;
        Ok(XpStatus::derive(summary, streak))
    }
}
