//! 重放防护模块
//!
//! 维护已消费交易哈希的全局集合，阻止同一笔链上支付
//! 被多次用于结算。哈希一经消费永不释放。

use std::sync::Arc;
use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::storage::GateStorage;
use crate::types::{normalize_tx_hash, TxHash};

/// 重放防护
///
/// 集合的写入发生在结算临界区内（见
/// [`GateStorage::settle_payment`]），本组件只提供规范化
/// 与前置快速检查。
pub struct ReplayGuard {
    storage: Arc<dyn GateStorage>,
}

impl ReplayGuard {
    /// 创建重放防护
    pub fn new(storage: Arc<dyn GateStorage>) -> Self {
        Self { storage }
    }

    /// 规范化哈希并确认尚未被消费
    ///
    /// 只是快速失败；最终裁决仍由结算临界区做出。
    pub async fn ensure_fresh(&self, raw_tx_hash: &str) -> CoreResult<TxHash> {
        let tx_hash = normalize_tx_hash(raw_tx_hash)?;
        if self.storage.is_tx_consumed(&tx_hash).await? {
            warn!("rejected replayed transaction {}", tx_hash);
            return Err(CoreError::AlreadyConsumed(tx_hash));
        }
        Ok(tx_hash)
    }

    /// 哈希是否已被消费
    pub async fn is_consumed(&self, raw_tx_hash: &str) -> CoreResult<bool> {
        let tx_hash = normalize_tx_hash(raw_tx_hash)?;
        self.storage.is_tx_consumed(&tx_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::{PaymentRequest, Timestamp};

    #[tokio::test]
    async fn test_fresh_hash_passes() {
        let storage = Arc::new(MemoryStorage::new());
        let guard = ReplayGuard::new(storage);
        let raw = format!("0X{}", "AB".repeat(32));
        let normalized = guard.ensure_fresh(&raw).await.unwrap();
        assert_eq!(normalized, format!("0x{}", "ab".repeat(32)));
    }

    #[tokio::test]
    async fn test_consumed_hash_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let now = Timestamp::from_millis(1000);
        let req = PaymentRequest::new(
            "agent_message".to_string(),
            "user-1".to_string(),
            1000,
            None,
            format!("0x{}", "aa".repeat(20)),
            31337,
            1,
            now,
            1800,
        );
        storage.save_request(&req).await.unwrap();
        let tx = format!("0x{}", "ab".repeat(32));
        storage.settle_payment(&req.request_id, &tx, now).await.unwrap();

        let guard = ReplayGuard::new(storage);
        let err = guard.ensure_fresh(&tx).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyConsumed(_)));
        assert!(guard.is_consumed(&tx).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let guard = ReplayGuard::new(storage);
        let err = guard.ensure_fresh("not-a-hash").await.unwrap_err();
        assert!(matches!(err, CoreError::MalformedTxHash(_)));
    }
}
