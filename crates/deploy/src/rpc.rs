//! Ethereum JSON-RPC client for the L1 endpoint.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Context;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::chain::{Connector, NetworkClient};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between polling attempts when waiting for a receipt.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// Returns an error if the request failed or the endpoint answered with an
/// error object.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {method} request"))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {method} response"))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {method} result"))
}

/// Parse a hex quantity such as `0x1a`.
pub fn parse_quantity(raw: &str) -> anyhow::Result<u64> {
    let digits = raw
        .strip_prefix("0x")
        .with_context(|| format!("Quantity {raw:?} is missing the 0x prefix"))?;
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid hex quantity {raw:?}"))
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_quantity(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_opt_quantity<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_quantity(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

/// The fields of `eth_getTransactionReceipt` the broadcaster reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default, deserialize_with = "deserialize_opt_quantity")]
    pub block_number: Option<u64>,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub status: u64,
}

impl TransactionReceipt {
    pub const fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// JSON-RPC client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: Url,
}

impl RpcClient {
    pub fn new(url: Url) -> anyhow::Result<Self> {
        Ok(Self {
            client: create_client()?,
            url,
        })
    }

    async fn quantity(&self, method: &str, params: Vec<Value>) -> anyhow::Result<u64> {
        let raw: String = json_rpc_call(&self.client, &self.url, method, params).await?;
        parse_quantity(&raw)
    }

    /// Submit a signed, RLP-encoded transaction.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> anyhow::Result<B256> {
        json_rpc_call(
            &self.client,
            &self.url,
            "eth_sendRawTransaction",
            vec![Value::String(raw.to_string())],
        )
        .await
    }

    /// The receipt of `hash`, or `None` while the transaction is pending.
    pub async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> anyhow::Result<Option<TransactionReceipt>> {
        json_rpc_call(
            &self.client,
            &self.url,
            "eth_getTransactionReceipt",
            vec![Value::String(hash.to_string())],
        )
        .await
    }

    /// Poll for the receipt of `hash` until it is mined or `timeout` elapses.
    pub async fn wait_for_receipt(
        &self,
        hash: B256,
        timeout: Duration,
    ) -> anyhow::Result<TransactionReceipt> {
        let start = std::time::Instant::now();

        loop {
            if start.elapsed() > timeout {
                anyhow::bail!("Timeout waiting for receipt of {hash}");
            }

            match self.transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => tracing::trace!(%hash, "Transaction pending, retrying..."),
                Err(e) => {
                    tracing::trace!(error = %e, %hash, "Receipt query failed, retrying...")
                }
            }

            tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
        }
    }
}

impl NetworkClient for RpcClient {
    async fn chain_id(&self) -> anyhow::Result<u64> {
        self.quantity("eth_chainId", vec![]).await
    }

    async fn nonce_at(&self, address: Address) -> anyhow::Result<u64> {
        self.quantity(
            "eth_getTransactionCount",
            vec![Value::String(address.to_string()), Value::from("latest")],
        )
        .await
    }
}

/// Opens [`RpcClient`]s over HTTP(S).
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcConnector;

impl Connector for RpcConnector {
    type Client = RpcClient;

    async fn connect(&self, endpoint: &Url) -> anyhow::Result<Self::Client> {
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!(
                "Unsupported L1 RPC scheme {:?}, expected http or https",
                endpoint.scheme()
            );
        }
        RpcClient::new(endpoint.clone())
    }
}
