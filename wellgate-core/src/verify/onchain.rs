//! 链上验证器
//!
//! 通过 EVM JSON-RPC 独立核实交易：存在性、执行状态、
//! 收款人、金额、资产与出块时间。

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{check_transfer, ExpectedPayment, PaymentVerifier, TRANSFER_EVENT_TOPIC};
use crate::chain::{EvmRpcClient, RpcReceipt};
use crate::error::{CoreError, CoreResult};
use crate::types::{
    normalize_address, normalize_tx_hash, parse_hex_u128, parse_hex_u64, Address, TxHash,
    VerifiedTransfer,
};

/// 链上验证器
pub struct ChainVerifier {
    rpc: EvmRpcClient,
}

impl ChainVerifier {
    /// 创建链上验证器
    pub fn new(rpc: EvmRpcClient) -> Self {
        Self { rpc }
    }

    /// 从收据日志中提取发给收款人的 ERC-20 转账
    ///
    /// 同一笔交易可能包含多条 Transfer 日志，取金额最大的一条。
    fn extract_erc20_transfer(
        receipt: &RpcReceipt,
        contract: &Address,
        pay_to: &Address,
    ) -> CoreResult<Option<(Address, u128)>> {
        let mut best: Option<(Address, u128)> = None;

        for log in &receipt.logs {
            if !log.address.eq_ignore_ascii_case(contract) {
                continue;
            }
            if log.topics.len() != 3 {
                continue;
            }
            if !log.topics[0].eq_ignore_ascii_case(TRANSFER_EVENT_TOPIC) {
                continue;
            }
            let to = topic_to_address(&log.topics[2])?;
            if !to.eq_ignore_ascii_case(pay_to) {
                continue;
            }
            let from = topic_to_address(&log.topics[1])?;
            let amount = parse_hex_u128(&log.data)?;
            if best.as_ref().map(|(_, a)| amount > *a).unwrap_or(true) {
                best = Some((from, amount));
            }
        }

        Ok(best)
    }
}

/// 把 32 字节的 indexed address 主题还原为地址
fn topic_to_address(topic: &str) -> CoreResult<Address> {
    let hex_part = topic
        .strip_prefix("0x")
        .ok_or_else(|| CoreError::InvalidInput(format!("bad log topic: {}", topic)))?;
    if hex_part.len() != 64 {
        return Err(CoreError::InvalidInput(format!("bad log topic: {}", topic)));
    }
    normalize_address(&format!("0x{}", &hex_part[24..]))
}

#[async_trait]
impl PaymentVerifier for ChainVerifier {
    async fn verify(
        &self,
        tx_hash: &TxHash,
        expected: &ExpectedPayment,
    ) -> CoreResult<VerifiedTransfer> {
        let tx_hash = normalize_tx_hash(tx_hash)?;

        let tx = self
            .rpc
            .get_transaction(&tx_hash)
            .await?
            .ok_or_else(|| CoreError::TxNotIndexed(tx_hash.clone()))?;

        // 未入块的交易按未索引处理，调用方可稍后重试
        let block_hex = tx
            .block_number
            .clone()
            .ok_or_else(|| CoreError::TxNotIndexed(tx_hash.clone()))?;

        let receipt = self
            .rpc
            .get_receipt(&tx_hash)
            .await?
            .ok_or_else(|| CoreError::TxNotIndexed(tx_hash.clone()))?;

        let status = receipt.status.as_deref().unwrap_or("0x1");
        if parse_hex_u64(status)? != 1 {
            warn!("transaction {} reverted on chain", tx_hash);
            return Err(CoreError::TxFailed(tx_hash.clone()));
        }

        let (from, to, amount) = match &expected.asset {
            None => {
                let to = tx
                    .to
                    .as_deref()
                    .ok_or_else(|| CoreError::NoTransferToRecipient(tx_hash.clone()))?;
                (
                    normalize_address(&tx.from)?,
                    normalize_address(to)?,
                    parse_hex_u128(&tx.value)?,
                )
            }
            Some(contract) => {
                let (from, amount) =
                    Self::extract_erc20_transfer(&receipt, contract, &expected.pay_to)?
                        .ok_or_else(|| CoreError::NoTransferToRecipient(tx_hash.clone()))?;
                (from, expected.pay_to.clone(), amount)
            }
        };

        let block_number = parse_hex_u64(&block_hex)?;
        let block_timestamp = self.rpc.get_block_timestamp(&block_hex).await?;

        let transfer = VerifiedTransfer {
            tx_hash: tx_hash.clone(),
            from,
            to,
            amount,
            asset: expected.asset.clone(),
            block_number,
            block_timestamp,
        };

        check_transfer(&transfer, expected)?;

        debug!(
            "verified transfer {}: {} -> {} amount {}",
            tx_hash, transfer.from, transfer.to, transfer.amount
        );

        Ok(transfer)
    }
}
