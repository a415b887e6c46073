//! XP 域类型定义
//!
//! 包含活动类型、XP 记账条目与用户 XP 汇总。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{generate_random_id, AwardId, Timestamp, UserId};
use crate::xp::{level_for_xp, xp_for_level};

/// 可获得 XP 的活动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpActivity {
    /// 每日签到
    CheckIn,
    /// 记录心情
    MoodLog,
    /// 完成目标
    GoalComplete,
    /// 连续 7 天打卡
    StreakSeven,
    /// 连续 30 天打卡
    StreakThirty,
    /// 获得徽章
    BadgeEarned,
    /// 与智能体交互
    AgentInteraction,
}

impl XpActivity {
    /// 活动的基础 XP 值
    pub fn base_xp(&self) -> u64 {
        match self {
            Self::CheckIn => 10,
            Self::MoodLog => 5,
            Self::GoalComplete => 25,
            Self::StreakSeven => 50,
            Self::StreakThirty => 200,
            Self::BadgeEarned => 100,
            Self::AgentInteraction => 2,
        }
    }
}

impl fmt::Display for XpActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckIn => write!(f, "check_in"),
            Self::MoodLog => write!(f, "mood_log"),
            Self::GoalComplete => write!(f, "goal_complete"),
            Self::StreakSeven => write!(f, "streak_seven"),
            Self::StreakThirty => write!(f, "streak_thirty"),
            Self::BadgeEarned => write!(f, "badge_earned"),
            Self::AgentInteraction => write!(f, "agent_interaction"),
        }
    }
}

/// XP 记账条目
///
/// 仅追加，不可修改；周池分配按其时间戳归入周窗口。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpAward {
    /// 记账ID
    pub award_id: AwardId,
    /// 用户ID
    pub user_id: UserId,
    /// 活动类型
    pub activity: XpActivity,
    /// 本次获得的 XP
    pub xp: u64,
    /// 自由附注（来源、关联对象等）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// 记账时间
    pub awarded_at: Timestamp,
}

impl XpAward {
    /// 创建新的记账条目
    pub fn new(user_id: UserId, activity: XpActivity, now: Timestamp) -> Self {
        Self {
            award_id: generate_random_id(),
            user_id,
            activity,
            xp: activity.base_xp(),
            metadata: None,
            awarded_at: now,
        }
    }
}

/// 用户 XP 汇总
///
/// `total_xp` 为终身累计值，决定等级；
/// `spendable_xp` 为可兑换余额，兑换时扣减。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpSummary {
    /// 用户ID
    pub user_id: UserId,
    /// 终身累计 XP
    pub total_xp: u64,
    /// 可兑换 XP 余额
    pub spendable_xp: u64,
    /// 当前等级
    pub level: u32,
    /// 更新时间
    pub updated_at: Timestamp,
}

impl XpSummary {
    /// 创建空汇总
    pub fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            total_xp: 0,
            spendable_xp: 0,
            level: 0,
            updated_at: now,
        }
    }

    /// 应用一条记账并重算等级
    pub fn apply_award(&mut self, award: &XpAward) {
        self.total_xp += award.xp;
        self.spendable_xp += award.xp;
        self.level = level_for_xp(self.total_xp);
        self.updated_at = award.awarded_at;
    }
}

/// 用户 XP 状态视图
///
/// 在汇总之上补充派生指标：连续打卡天数、当前等级进度
/// 与兑换时适用的加成档位。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XpStatus {
    /// 汇总
    pub summary: XpSummary,
    /// 以今天（UTC）为终点的连续记账天数
    pub streak_days: u32,
    /// 当前等级内的进度（0-100）
    pub progress_pct: u8,
    /// 等级加成（万分比）
    pub level_bonus_bps: u64,
    /// 连续打卡加成（万分比）
    pub streak_bonus_bps: u64,
}

impl XpStatus {
    /// 由汇总与连续天数推导各项指标
    pub fn derive(summary: XpSummary, streak_days: u32) -> Self {
        let floor = xp_for_level(summary.level);
        let ceiling = xp_for_level(summary.level + 1);
        let span = ceiling - floor;
        let progress_pct = if span == 0 {
            0
        } else {
            ((summary.total_xp.saturating_sub(floor)) * 100 / span).min(100) as u8
        };
        Self {
            level_bonus_bps: crate::redeem::level_bonus_bps(summary.level),
            streak_bonus_bps: crate::redeem::streak_bonus_bps(streak_days),
            summary,
            streak_days,
            progress_pct,
        }
    }
}
