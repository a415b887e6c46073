//! EVM JSON-RPC Client
//!
//! Provides the read-only chain interface used for payment verification:
//! transaction lookup, receipt lookup and block timestamps.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ChainConfig;
use crate::error::{CoreError, CoreResult};
use crate::types::{parse_hex_u64, Timestamp};

/// EVM JSON-RPC client
pub struct EvmRpcClient {
    /// HTTP client
    client: Client,
    /// RPC configuration
    config: ChainConfig,
    /// Request ID counter
    request_id: std::sync::atomic::AtomicU64,
}

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<RpcError>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Transaction as returned by eth_getTransactionByHash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTransaction {
    /// Transaction hash
    pub hash: String,
    /// Sender address
    pub from: String,
    /// Recipient address (None for contract creation)
    pub to: Option<String>,
    /// Transferred value in wei (hex quantity)
    pub value: String,
    /// Block number (hex quantity, None while pending)
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    /// Calldata
    pub input: String,
}

/// Receipt as returned by eth_getTransactionReceipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReceipt {
    /// Execution status (hex quantity, "0x1" = success)
    pub status: Option<String>,
    /// Block number (hex quantity)
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    /// Emitted logs
    pub logs: Vec<RpcLog>,
}

/// Log entry within a receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcLog {
    /// Emitting contract address
    pub address: String,
    /// Indexed topics
    pub topics: Vec<String>,
    /// Unindexed data
    pub data: String,
}

/// Block header fields used for proof freshness checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBlock {
    /// Block number (hex quantity)
    pub number: String,
    /// Block timestamp in seconds (hex quantity)
    pub timestamp: String,
}

impl EvmRpcClient {
    /// Create a new EVM RPC client
    pub fn new(config: ChainConfig) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::RpcConnection(e.to_string()))?;

        Ok(Self {
            client,
            config,
            request_id: std::sync::atomic::AtomicU64::new(0),
        })
    }

    /// Make an RPC call; a JSON null result maps to None
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> CoreResult<Option<T>> {
        let id = self.request_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!("EVM RPC call: {} id={}", method, id);

        let response = self
            .client
            .post(&self.config.rpc_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::RpcRequest(format!("HTTP {} - {}", status, body)));
        }

        let rpc_response: RpcResponse = response
            .json()
            .await
            .map_err(|e| CoreError::RpcRequest(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            return Err(CoreError::RpcResponse {
                code: error.code,
                message: error.message,
            });
        }

        match rpc_response.result {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Fetch a transaction by hash; None if the node does not know it
    pub async fn get_transaction(&self, tx_hash: &str) -> CoreResult<Option<RpcTransaction>> {
        self.call("eth_getTransactionByHash", serde_json::json!([tx_hash]))
            .await
    }

    /// Fetch a transaction receipt; None while the transaction is unmined
    pub async fn get_receipt(&self, tx_hash: &str) -> CoreResult<Option<RpcReceipt>> {
        self.call("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await
    }

    /// Fetch the timestamp of a block (hex block number)
    pub async fn get_block_timestamp(&self, block_number: &str) -> CoreResult<Timestamp> {
        let block: RpcBlock = self
            .call("eth_getBlockByNumber", serde_json::json!([block_number, false]))
            .await?
            .ok_or_else(|| CoreError::TxNotIndexed(format!("block {} not found", block_number)))?;
        let secs = parse_hex_u64(&block.timestamp)?;
        Ok(Timestamp::from_secs(secs))
    }

    /// Fetch the node's chain ID
    pub async fn get_chain_id(&self) -> CoreResult<u64> {
        let raw: String = self
            .call("eth_chainId", serde_json::json!([]))
            .await?
            .ok_or_else(|| CoreError::RpcRequest("empty eth_chainId response".to_string()))?;
        parse_hex_u64(&raw)
    }

    /// Expected chain ID from configuration
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }
}
