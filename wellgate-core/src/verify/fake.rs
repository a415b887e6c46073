//! 可编程验证器
//!
//! 无链环境（单元与集成测试）下使用的验证器替身。
//! 预先注入转账记录，验证逻辑与链上验证器共用同一套核对规则。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{check_transfer, ExpectedPayment, PaymentVerifier};
use crate::error::{CoreError, CoreResult};
use crate::types::{normalize_tx_hash, TxHash, VerifiedTransfer};

/// 可编程验证器
#[derive(Clone, Default)]
pub struct FakeVerifier {
    transfers: Arc<RwLock<HashMap<TxHash, VerifiedTransfer>>>,
    /// 注入的瞬态故障（按次消耗）
    outages: Arc<RwLock<u32>>,
}

impl FakeVerifier {
    /// 创建空的验证器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入一笔可验证的转账
    pub async fn add_transfer(&self, transfer: VerifiedTransfer) {
        self.transfers
            .write()
            .await
            .insert(transfer.tx_hash.clone(), transfer);
    }

    /// 注入 N 次瞬态故障，随后恢复正常
    pub async fn inject_outage(&self, count: u32) {
        *self.outages.write().await = count;
    }
}

#[async_trait]
impl PaymentVerifier for FakeVerifier {
    async fn verify(
        &self,
        tx_hash: &TxHash,
        expected: &ExpectedPayment,
    ) -> CoreResult<VerifiedTransfer> {
        {
            let mut outages = self.outages.write().await;
            if *outages > 0 {
                *outages -= 1;
                return Err(CoreError::RpcConnection("injected outage".to_string()));
            }
        }

        let tx_hash = normalize_tx_hash(tx_hash)?;
        let transfers = self.transfers.read().await;
        let transfer = transfers
            .get(&tx_hash)
            .ok_or_else(|| CoreError::TxNotIndexed(tx_hash.clone()))?;
        check_transfer(transfer, expected)?;
        Ok(transfer.clone())
    }
}
