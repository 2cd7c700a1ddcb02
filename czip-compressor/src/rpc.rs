//! Minimal JSON-RPC provider for reading the decompressor contract.

use czip_types::Address;
use serde::Deserialize;
use serde_json::json;

use crate::contract::Provider;

/// Blocking JSON-RPC client over HTTP.
pub struct HttpProvider {
    url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl HttpProvider {
    /// Client for the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn request(&self, method: &str, params: serde_json::Value) -> anyhow::Result<String> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let res: RpcResponse = self.client.post(&self.url).json(&body).send()?.json()?;

        if let Some(err) = res.error {
            anyhow::bail!("rpc error {}: {}", err.code, err.message);
        }

        res.result
            .ok_or_else(|| anyhow::anyhow!("rpc response carries no result"))
    }

    /// Chain id of the connected network.
    pub fn chain_id(&self) -> anyhow::Result<u64> {
        let hexed = self.request("eth_chainId", json!([]))?;
        Ok(u64::from_str_radix(hexed.trim_start_matches("0x"), 16)?)
    }
}

impl Provider for HttpProvider {
    fn call_contract(&self, contract: &Address, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let params = json!([
            {
                "to": contract.to_string(),
                "data": format!("0x{}", hex::encode(data)),
            },
            "latest",
        ]);

        let hexed = self.request("eth_call", params)?;
        Ok(hex::decode(hexed.trim_start_matches("0x"))?)
    }
}
