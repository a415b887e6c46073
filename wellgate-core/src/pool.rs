//! 周池分配模块
//!
//! 每周（周一 00:00 UTC 起算）的固定代币池按窗口内
//! 各用户获得的 XP 占比分配，向下取整，余数留存。
//!
//! # 幂等与并发
//!
//! 分配走租约状态机：Open -> Distributing -> Distributed。
//! 分配完成后重复触发得到确定性拒绝；持有者失联后
//! 租约过期，他人可接管重新分配。

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::PoolConfig;
use crate::error::{CoreError, CoreResult};
use crate::storage::GateStorage;
use crate::types::{
    digest_to_hex, generate_random_id, week_end, week_start, PoolClaim, PoolPayout, PoolStatus,
    Timestamp, UserId,
};

/// 概览中的排行榜长度上限
const LEADERBOARD_LIMIT: usize = 10;

/// 排行榜条目
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LeaderboardEntry {
    /// 用户ID
    pub user_id: UserId,
    /// 窗口内获得的 XP
    pub xp_in_week: u64,
    /// 按当前占比估算的份额
    pub estimated_share: u64,
}

/// 周池概览（只读视图）
///
/// 份额为按当前窗口内 XP 占比的估算值，窗口结束前
/// 随新的记账持续变化。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PoolOverview {
    /// 周序号
    pub week_index: u64,
    /// 窗口起点
    pub week_start: Timestamp,
    /// 窗口终点
    pub week_end: Timestamp,
    /// 本周池子大小
    pub pool_amount: u64,
    /// 窗口内全体用户的 XP 合计
    pub total_xp: u64,
    /// 参与用户数
    pub participants: u64,
    /// 是否已完成分配
    pub distributed: bool,
    /// 查询用户在窗口内的 XP
    pub user_xp: Option<u64>,
    /// 查询用户的估算份额
    pub user_estimated_share: Option<u64>,
    /// 按 XP 降序的前若干名
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// 周池分配器
pub struct WeeklyPoolDistributor {
    storage: Arc<dyn GateStorage>,
    config: PoolConfig,
    /// 租约持有者标识（进程内唯一）
    owner: String,
}

impl WeeklyPoolDistributor {
    /// 创建周池分配器
    pub fn new(storage: Arc<dyn GateStorage>, config: PoolConfig) -> Self {
        let owner = format!("distributor-{}", &digest_to_hex(&generate_random_id())[..12]);
        Self {
            storage,
            config,
            owner,
        }
    }

    /// 默认分配目标：最近一个已结束的周窗口
    pub fn default_week(now: Timestamp) -> u64 {
        now.week_index().saturating_sub(1)
    }

    /// 分配一个周窗口的池子
    ///
    /// `week_index` 为 None 时取最近一个已结束的窗口。
    /// 窗口尚未结束、池子已分配、他人正在分配都会得到
    /// 明确的错误。
    pub async fn distribute(&self, week_index: Option<u64>) -> CoreResult<Vec<PoolPayout>> {
        let now = Timestamp::now();
        let week = week_index.unwrap_or_else(|| Self::default_week(now));

        if week_end(week) > now {
            return Err(CoreError::WindowNotElapsed(week));
        }

        let claim = self
            .storage
            .claim_pool(
                week,
                self.config.weekly_amount,
                &self.owner,
                self.config.claim_lease_secs,
                now,
            )
            .await?;
        let pool = match claim {
            PoolClaim::Claimed(pool) => pool,
            PoolClaim::AlreadyDistributed => {
                return Err(CoreError::AlreadyDistributed(week))
            }
            PoolClaim::Busy { owner, .. } => {
                return Err(CoreError::DistributionBusy {
                    week_index: week,
                    owner,
                })
            }
        };

        match self.split(week, pool.pool_amount, now).await {
            Ok(payouts) => {
                let distributed = self
                    .storage
                    .finish_pool(week, &self.owner, &payouts, now)
                    .await?;
                info!(
                    "distributed pool for week {}: {} tokens across {} users",
                    week,
                    distributed.distributed_total,
                    payouts.len()
                );
                Ok(payouts)
            }
            Err(e) => {
                // 分配失败时让池子回到可重试状态
                if let Err(release_err) = self.storage.release_pool(week, &self.owner).await {
                    warn!("failed to release pool {} lease: {}", week, release_err);
                }
                Err(e)
            }
        }
    }

    /// 按窗口内 XP 占比计算各用户份额
    async fn split(
        &self,
        week: u64,
        pool_amount: u64,
        now: Timestamp,
    ) -> CoreResult<Vec<PoolPayout>> {
        let shares = self
            .storage
            .xp_by_user_in_window(week_start(week), week_end(week))
            .await?;
        let total_xp: u64 = shares.iter().map(|(_, xp)| xp).sum();
        // 无人参与的一周照常关账，只是没有任何份额
        if total_xp == 0 {
            return Ok(Vec::new());
        }

        Ok(shares
            .into_iter()
            .map(|(user_id, xp)| PoolPayout {
                week_index: week,
                user_id,
                xp_in_week: xp,
                amount: ((pool_amount as u128) * (xp as u128) / (total_xp as u128)) as u64,
                paid_at: now,
            })
            .collect())
    }

    /// 某周的分配结果
    pub async fn payouts(&self, week_index: u64) -> CoreResult<Vec<PoolPayout>> {
        self.storage.list_payouts(week_index).await
    }

    /// 周池概览
    ///
    /// `week_index` 为 None 时取当前进行中的周窗口，
    /// `user_id` 给定时附带该用户的 XP 与估算份额。
    pub async fn overview(
        &self,
        week_index: Option<u64>,
        user_id: Option<&UserId>,
    ) -> CoreResult<PoolOverview> {
        let now = Timestamp::now();
        let week = week_index.unwrap_or_else(|| now.week_index());
        let start = week_start(week);
        let end = week_end(week);

        let mut shares = self.storage.xp_by_user_in_window(start, end).await?;
        let total_xp: u64 = shares.iter().map(|(_, xp)| xp).sum();
        let pool_amount = self.config.weekly_amount;
        let share_of = |xp: u64| -> u64 {
            if total_xp == 0 {
                0
            } else {
                ((pool_amount as u128) * (xp as u128) / (total_xp as u128)) as u64
            }
        };

        let user_xp = user_id.map(|uid| {
            shares
                .iter()
                .find(|(candidate, _)| candidate == uid)
                .map(|(_, xp)| *xp)
                .unwrap_or(0)
        });
        let user_estimated_share = user_xp.map(share_of);

        let distributed = self
            .storage
            .get_pool(week)
            .await?
            .map(|pool| pool.status == PoolStatus::Distributed)
            .unwrap_or(false);

        let participants = shares.len() as u64;
        shares.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        shares.truncate(LEADERBOARD_LIMIT);
        let leaderboard = shares
            .into_iter()
            .map(|(user_id, xp)| LeaderboardEntry {
                estimated_share: share_of(xp),
                user_id,
                xp_in_week: xp,
            })
            .collect();

        Ok(PoolOverview {
            week_index: week,
            week_start: start,
            week_end: end,
            pool_amount,
            total_xp,
            participants,
            distributed,
            user_xp,
            user_estimated_share,
            leaderboard,
        })
    }
}
