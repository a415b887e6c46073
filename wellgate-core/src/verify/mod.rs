//! 链上支付验证模块
//!
//! 提供独立的链上支付验证功能。
//!
//! # 核心功能
//!
//! - 交易验证：确认交易已上链且执行成功
//! - 转账匹配：收款人、金额与资产必须满足支付请求
//! - 测试替身：无链环境下的可编程验证器
//!
//! # 设计原则
//!
//! - 独立验证：不信任调用方提交的任何金额声明
//! - 确定性判定：同一交易与期望必然得到同一结论
//! - 可重试性：网络类失败与确定性拒绝严格区分

pub mod fake;
pub mod onchain;

pub use fake::FakeVerifier;
pub use onchain::ChainVerifier;

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};
use crate::types::{Address, TxHash, VerifiedTransfer};

/// ERC-20 Transfer(address,address,uint256) 事件主题
pub const TRANSFER_EVENT_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// 对链上转账的期望
///
/// 由支付请求派生，验证器据此判定转账是否可接受。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedPayment {
    /// 收款地址（小写）
    pub pay_to: Address,
    /// 最低金额（链上最小单位）
    pub min_amount: u128,
    /// 资产合约地址（None 表示原生币）
    pub asset: Option<Address>,
}

/// 支付验证器
///
/// 唯一的链读取入口。生产环境使用 [`ChainVerifier`]，
/// 测试使用 [`FakeVerifier`]。
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// 验证交易哈希对应的转账是否满足期望
    async fn verify(
        &self,
        tx_hash: &TxHash,
        expected: &ExpectedPayment,
    ) -> CoreResult<VerifiedTransfer>;
}

/// 用期望核对一笔已解析的转账
///
/// 收款人与资产不匹配、金额不足都会给出确定性拒绝。
pub fn check_transfer(transfer: &VerifiedTransfer, expected: &ExpectedPayment) -> CoreResult<()> {
    if transfer.asset != expected.asset {
        return Err(CoreError::NoTransferToRecipient(transfer.tx_hash.clone()));
    }
    if !transfer.to.eq_ignore_ascii_case(&expected.pay_to) {
        return Err(CoreError::WrongRecipient {
            expected: expected.pay_to.clone(),
            actual: transfer.to.clone(),
        });
    }
    if transfer.amount < expected.min_amount {
        return Err(CoreError::AmountBelowMinimum {
            required: expected.min_amount,
            actual: transfer.amount,
        });
    }
    Ok(())
}
