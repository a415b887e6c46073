//! 支付域类型定义
//!
//! 包含支付请求（402 挑战）、支付证明、链上转账验证结果与用户账户。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{generate_random_id, Address, RequestId, Timestamp, TxHash, UserId};

/// 支付请求状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum RequestStatus {
    /// 等待支付证明
    #[default]
    Pending,
    /// 已结算（证明已验证并入账）
    Settled,
    /// 已过期（超出挑战有效期）
    Expired,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Settled => write!(f, "settled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// 支付请求（402 挑战）
///
/// 当用户免费额度与预付额度均耗尽时签发。
/// 请求中声明收款地址、最低金额与有效期；
/// 用户需在有效期内提交匹配的链上支付证明。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// 请求ID
    pub request_id: RequestId,
    /// 计费资源
    pub resource: String,
    /// 用户ID
    pub user_id: UserId,
    /// 最低金额（链上最小单位）
    pub amount: u128,
    /// 人类可读描述
    pub description: String,
    /// 资产合约地址（None 表示原生币）
    pub asset: Option<Address>,
    /// 收款地址
    pub pay_to: Address,
    /// 链ID
    pub chain_id: u64,
    /// 结算后授予的预付额度
    pub credits_granted: u32,
    /// 状态
    pub status: RequestStatus,
    /// 创建时间
    pub created_at: Timestamp,
    /// 过期时间
    pub expires_at: Timestamp,
    /// 结算时使用的交易哈希
    pub settled_tx: Option<TxHash>,
}

impl PaymentRequest {
    /// 创建新的支付请求
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resource: String,
        user_id: UserId,
        amount: u128,
        asset: Option<Address>,
        pay_to: Address,
        chain_id: u64,
        credits_granted: u32,
        now: Timestamp,
        ttl_secs: u64,
    ) -> Self {
        Self {
            request_id: generate_random_id(),
            description: format!("{} uses of {}", credits_granted, resource),
            resource,
            user_id,
            amount,
            asset,
            pay_to,
            chain_id,
            credits_granted,
            status: RequestStatus::Pending,
            created_at: now,
            expires_at: now.plus_secs(ttl_secs),
            settled_tx: None,
        }
    }

    /// 是否已过期
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// 支付证明
///
/// 用户提交的链上支付凭证，引用此前签发的请求。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    /// 引用的请求ID
    pub request_id: RequestId,
    /// 链上交易哈希
    pub tx_hash: TxHash,
    /// 交易所在链ID，必须与请求签发时一致
    pub chain_id: u64,
    /// 证明生成时间，须落在验证时刻的容忍窗口内
    pub signed_at: Timestamp,
}

/// 已验证的链上转账
///
/// 链上验证器对交易的独立验证结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTransfer {
    /// 交易哈希（规范化）
    pub tx_hash: TxHash,
    /// 付款地址
    pub from: Address,
    /// 收款地址
    pub to: Address,
    /// 转账金额（链上最小单位）
    pub amount: u128,
    /// 资产合约地址（None 表示原生币）
    pub asset: Option<Address>,
    /// 所在区块号
    pub block_number: u64,
    /// 所在区块时间戳
    pub block_timestamp: Timestamp,
}

/// 访问判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    /// 免费额度内放行
    Free {
        /// 剩余免费次数
        remaining: u32,
    },
    /// 预付额度覆盖
    Covered {
        /// 剩余预付额度
        credits_remaining: u32,
    },
    /// 需要支付（附带 402 挑战）
    PaymentRequired {
        /// 签发的支付请求
        request: PaymentRequest,
    },
}

/// 用户对某一资源的账户
///
/// 按（用户，资源）记录当日免费额度消耗与预付额度余额。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// 用户ID
    pub user_id: UserId,
    /// 资源名
    pub resource: String,
    /// 免费额度计数所属的 UTC 日索引
    pub free_day: u64,
    /// 当日已消耗的免费次数
    pub free_uses_used: u32,
    /// 预付额度余额
    pub prepaid_credits: u32,
    /// 创建时间
    pub created_at: Timestamp,
    /// 更新时间
    pub updated_at: Timestamp,
}

impl UserAccount {
    /// 创建新账户
    pub fn new(user_id: UserId, resource: String, now: Timestamp) -> Self {
        Self {
            user_id,
            resource,
            free_day: now.day_index(),
            free_uses_used: 0,
            prepaid_credits: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 翻到当前 UTC 日，跨日时清零免费额度计数
    pub fn roll_free_day(&mut self, now: Timestamp) {
        let today = now.day_index();
        if self.free_day != today {
            self.free_day = today;
            self.free_uses_used = 0;
        }
    }
}
