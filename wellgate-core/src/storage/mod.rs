//! 存储层
//!
//! 提供访问控制、XP 记账与分配状态的持久化接口和实现。
//!
//! # 设计原则
//!
//! - 结算、兑换、分配等复合操作必须原子完成，不留半程状态
//! - 已消费交易哈希永不删除，防止重放
//! - XP 记账仅追加，汇总由存储层同步维护

pub mod memory;
pub mod sled;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{
    PaymentRequest, PoolClaim, PoolPayout, Redemption, RequestId, Timestamp, TxHash, UserAccount,
    UserId, WeeklyPool, XpAward, XpSummary,
};

/// 访问控制存储接口
///
/// 定义支付门、XP 账本、兑换引擎与周池分配所需的所有存储操作。
/// 带有"原子"标注的方法必须在单个临界区内完成全部检查与写入。
#[async_trait]
pub trait GateStorage: Send + Sync {
    // ==================== 账户操作 ====================

    /// 获取用户对某一资源的账户
    async fn get_account(
        &self,
        user_id: &UserId,
        resource: &str,
    ) -> CoreResult<Option<UserAccount>>;

    /// 原子消耗一次当日免费额度
    ///
    /// 账户不存在时自动创建；跨 UTC 日时先清零当日计数。额度未满
    /// 时消耗一次并返回剩余次数；已满时返回 None，不做任何修改。
    async fn take_free_use(
        &self,
        user_id: &UserId,
        resource: &str,
        limit: u32,
        now: Timestamp,
    ) -> CoreResult<Option<u32>>;

    /// 原子消耗一个预付额度
    ///
    /// 余额大于零时扣减一个并返回剩余额度；否则返回 None。
    async fn take_credit(
        &self,
        user_id: &UserId,
        resource: &str,
        now: Timestamp,
    ) -> CoreResult<Option<u32>>;

    // ==================== 支付请求操作 ====================

    /// 保存支付请求
    async fn save_request(&self, request: &PaymentRequest) -> CoreResult<()>;

    /// 获取支付请求
    async fn get_request(&self, request_id: &RequestId) -> CoreResult<Option<PaymentRequest>>;

    /// 获取用户对某一资源当前未过期的待支付请求
    async fn get_open_request(
        &self,
        user_id: &UserId,
        resource: &str,
        now: Timestamp,
    ) -> CoreResult<Option<PaymentRequest>>;

    /// 将已超时的待支付请求标记为过期，返回处理数量
    async fn expire_requests(&self, now: Timestamp) -> CoreResult<u64>;

    // ==================== 重放防护 ====================

    /// 交易哈希是否已被消费
    async fn is_tx_consumed(&self, tx_hash: &TxHash) -> CoreResult<bool>;

    /// 原子结算支付
    ///
    /// 单个临界区内完成：请求必须处于待支付且未过期，交易哈希必须
    /// 未被消费；随后标记请求已结算、登记交易哈希、为该用户对应
    /// 资源的账户增加请求中声明的预付额度。任一检查失败则不产生
    /// 任何写入。
    async fn settle_payment(
        &self,
        request_id: &RequestId,
        tx_hash: &TxHash,
        now: Timestamp,
    ) -> CoreResult<UserAccount>;

    // ==================== XP 操作 ====================

    /// 原子登记一条 XP 记账并更新汇总
    async fn record_award(&self, award: &XpAward) -> CoreResult<XpSummary>;

    /// 获取用户 XP 汇总
    async fn get_xp_summary(&self, user_id: &UserId) -> CoreResult<Option<XpSummary>>;

    /// 列出用户的 XP 记账（按时间升序）
    async fn list_awards(&self, user_id: &UserId) -> CoreResult<Vec<XpAward>>;

    /// 统计窗口内各用户获得的 XP（按用户ID升序）
    async fn xp_by_user_in_window(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> CoreResult<Vec<(UserId, u64)>>;

    // ==================== 兑换操作 ====================

    /// 原子登记一次兑换
    ///
    /// 单个临界区内完成：可兑换余额必须覆盖消耗的 XP，且兑换时间
    /// 前滚动 24 小时内已兑换代币加上本次不得超过 `cap`；随后扣减
    /// 余额并记录兑换。超出上限时整笔拒绝，不做部分兑换。
    async fn record_redemption(&self, redemption: &Redemption, cap: u64) -> CoreResult<XpSummary>;

    /// 列出用户的兑换记录（按时间升序）
    async fn list_redemptions(&self, user_id: &UserId) -> CoreResult<Vec<Redemption>>;

    // ==================== 周池操作 ====================

    /// 获取周池
    async fn get_pool(&self, week_index: u64) -> CoreResult<Option<WeeklyPool>>;

    /// 原子获取周池分配租约
    ///
    /// 周池不存在时以 `pool_amount` 创建。已分配完成返回
    /// [`PoolClaim::AlreadyDistributed`]；他人租约未到期返回
    /// [`PoolClaim::Busy`]；否则（含过期租约接管）授予租约。
    async fn claim_pool(
        &self,
        week_index: u64,
        pool_amount: u64,
        owner: &str,
        lease_secs: u64,
        now: Timestamp,
    ) -> CoreResult<PoolClaim>;

    /// 原子完成周池分配
    ///
    /// 要求调用方仍持有租约。逐条写入分配结果（同一用户不会重复
    /// 写入），然后将周池置为已分配。
    async fn finish_pool(
        &self,
        week_index: u64,
        owner: &str,
        payouts: &[PoolPayout],
        now: Timestamp,
    ) -> CoreResult<WeeklyPool>;

    /// 释放持有的租约（分配失败时回退到 Open）
    async fn release_pool(&self, week_index: u64, owner: &str) -> CoreResult<()>;

    /// 列出某周的分配结果（按用户ID升序）
    async fn list_payouts(&self, week_index: u64) -> CoreResult<Vec<PoolPayout>>;

    // ==================== 统计 ====================

    /// 获取统计信息
    async fn get_stats(&self) -> CoreResult<StorageStats>;
}

/// 存储统计信息
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StorageStats {
    /// 账户总数
    pub total_accounts: u64,
    /// 待支付请求数
    pub pending_requests: u64,
    /// 已结算请求数
    pub settled_requests: u64,
    /// 已消费交易哈希数
    pub consumed_txs: u64,
    /// XP 记账总数
    pub total_awards: u64,
    /// 兑换记录总数
    pub total_redemptions: u64,
    /// 已分配周池数
    pub distributed_pools: u64,
}

/// 存储配置
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// 数据目录（空字符串表示内存存储）
    pub data_dir: String,
    /// 缓存大小（字节）
    pub cache_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./wellgate_data".to_string(),
            cache_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl StorageConfig {
    /// 创建开发配置
    pub fn development() -> Self {
        Self {
            data_dir: "./wellgate_dev_data".to_string(),
            cache_size: 16 * 1024 * 1024, // 16MB
        }
    }

    /// 创建测试配置（内存存储）
    pub fn test() -> Self {
        Self {
            data_dir: "".to_string(),
            cache_size: 4 * 1024 * 1024, // 4MB
        }
    }
}

// 重新导出
pub use self::sled::SledStorage;
pub use memory::MemoryStorage;
