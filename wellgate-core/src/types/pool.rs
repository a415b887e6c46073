//! 周池域类型定义
//!
//! 包含周池状态机与分配结果。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{Timestamp, UserId};

/// 周池状态
///
/// 状态机：Open -> Distributing -> Distributed。
/// Distributing 带租约，持有者失联后可被接管。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PoolStatus {
    /// 未开始分配
    #[default]
    Open,
    /// 分配进行中（持有租约）
    Distributing,
    /// 分配完成
    Distributed,
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Distributing => write!(f, "distributing"),
            Self::Distributed => write!(f, "distributed"),
        }
    }
}

/// 周池
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPool {
    /// 周索引（周一 00:00 UTC 起算）
    pub week_index: u64,
    /// 池总额（代币）
    pub pool_amount: u64,
    /// 状态
    pub status: PoolStatus,
    /// 分配租约持有者
    pub claim_owner: Option<String>,
    /// 租约到期时间
    pub claim_expires_at: Option<Timestamp>,
    /// 分配完成时间
    pub distributed_at: Option<Timestamp>,
    /// 实际分配出的代币总数
    pub distributed_total: u64,
}

impl WeeklyPool {
    /// 创建未分配的周池
    pub fn new(week_index: u64, pool_amount: u64) -> Self {
        Self {
            week_index,
            pool_amount,
            status: PoolStatus::Open,
            claim_owner: None,
            claim_expires_at: None,
            distributed_at: None,
            distributed_total: 0,
        }
    }
}

/// 周池分配结果（单用户）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPayout {
    /// 周索引
    pub week_index: u64,
    /// 用户ID
    pub user_id: UserId,
    /// 该用户在窗口内获得的 XP
    pub xp_in_week: u64,
    /// 分得的代币数
    pub amount: u64,
    /// 记账时间
    pub paid_at: Timestamp,
}

/// 周池租约获取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolClaim {
    /// 获得租约，可以开始分配
    Claimed(WeeklyPool),
    /// 其他持有者的租约仍然有效
    Busy {
        /// 当前持有者
        owner: String,
        /// 租约到期时间
        until: Timestamp,
    },
    /// 该周已分配完成
    AlreadyDistributed,
}
