//! JSON-RPC client for the node under test

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use shared::{ProcessId, process_debug};

use crate::core::{Block, Transaction};
use crate::error::{RunnerError, RunnerResult};
use crate::traits::{ChainClient, ClientProvider};

const RECEIPT_POLL: Duration = Duration::from_millis(200);
const RECEIPT_ATTEMPTS: u32 = 150;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(deserialize_with = "quantity")]
    pub gas_used: u64,
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    /// Pre-byzantium receipts carry no status and count as success
    pub fn succeeded(&self) -> bool {
        self.status.as_deref().is_none_or(|s| s != "0x0")
    }
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    input: String,
    #[serde(deserialize_with = "quantity")]
    gas: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    #[serde(deserialize_with = "quantity")]
    number: u64,
    #[serde(deserialize_with = "quantity")]
    gas_used: u64,
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

fn quantity<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_quantity(&text).ok_or_else(|| serde::de::Error::custom(format!("invalid quantity {text}")))
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_quantity(text: &str) -> Option<u64> {
    let digits = text.strip_prefix("0x")?;
    if digits.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(digits, 16).ok()
}

pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> RunnerResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response: RpcResponse = self.http.post(&self.url).json(&body).send().await?.json().await?;
        if let Some(error) = response.error {
            return Err(RunnerError::chain(format!("{method} failed ({}): {}", error.code, error.message)));
        }
        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }

    /// Submit a transaction and return its hash
    pub async fn send_transaction(&self, from: &str, to: Option<&str>, data: &str, gas: u64) -> RunnerResult<String> {
        let mut tx = json!({ "from": from, "data": data, "gas": format!("{gas:#x}") });
        if let Some(to) = to {
            tx["to"] = json!(to);
        }
        self.call("eth_sendTransaction", json!([tx])).await
    }

    pub async fn transaction_receipt(&self, hash: &str) -> RunnerResult<Option<TransactionReceipt>> {
        self.call("eth_getTransactionReceipt", json!([hash])).await
    }

    /// Poll until the transaction is mined
    pub async fn wait_for_receipt(&self, hash: &str) -> RunnerResult<TransactionReceipt> {
        for _ in 0..RECEIPT_ATTEMPTS {
            if let Some(receipt) = self.transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            tokio::time::sleep(RECEIPT_POLL).await;
        }
        Err(RunnerError::chain(format!("transaction {hash} was not mined")))
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn accounts(&self) -> RunnerResult<Vec<String>> {
        self.call("eth_accounts", json!([])).await
    }

    async fn block_number(&self) -> RunnerResult<u64> {
        let number: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&number).ok_or_else(|| RunnerError::chain(format!("invalid block number {number}")))
    }

    async fn block_by_number(&self, number: u64) -> RunnerResult<Option<Block>> {
        let raw: Option<RawBlock> = self
            .call("eth_getBlockByNumber", json!([format!("{number:#x}"), true]))
            .await?;
        Ok(raw.map(|block| Block {
            number: block.number,
            gas_used: block.gas_used,
            transactions: block
                .transactions
                .into_iter()
                .map(|tx| Transaction {
                    to: tx.to,
                    input: tx.input,
                    gas: tx.gas,
                })
                .collect(),
        }))
    }
}

/// Provider that hands out one shared client
pub struct RpcClientProvider {
    client: Arc<JsonRpcClient>,
}

impl RpcClientProvider {
    pub fn new(client: Arc<JsonRpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClientProvider for RpcClientProvider {
    async fn client(&self) -> RunnerResult<Arc<dyn ChainClient>> {
        process_debug!(ProcessId::current(), "🔌 Using node at {}", self.client.url());
        Ok(self.client.clone())
    }
}
