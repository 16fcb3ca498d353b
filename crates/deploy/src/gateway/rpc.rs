//! JSON-RPC gateway talking to a remote signing/execution client.

use anyhow::Context;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use super::{Actor, CodeId, ContractAddress, Gateway, GatewayError, Receipt};
use crate::{config::NetworkConfig, payload::Message};

/// Result of `cosmwasm_upload`.
#[derive(Debug, Deserialize)]
struct UploadResult {
    code_id: u64,
}

/// Result of `cosmwasm_instantiate`.
#[derive(Debug, Deserialize)]
struct InstantiateResult {
    contract_address: String,
}

/// Gateway backed by the execution client's JSON-RPC endpoint.
///
/// The remote client holds the keys for `actor` and signs each transaction.
/// Messages are sent in their base64 encoding, bytecode is base64 as well.
#[derive(Debug, Clone)]
pub struct RpcGateway {
    client: reqwest::Client,
    url: Url,
    chain_id: String,
    gas_price: String,
}

impl RpcGateway {
    /// Create a gateway for the endpoint in `network`.
    ///
    /// Every request carries the configured request timeout. Fails if the
    /// `rpc_url` is not a valid URL.
    pub fn new(network: &NetworkConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(network.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        let url = Url::parse(&network.rpc_url)
            .with_context(|| format!("Invalid network.rpc_url: {}", network.rpc_url))?;

        Ok(Self {
            client,
            url,
            chain_id: network.chain_id.clone(),
            gas_price: network.gas_price.clone(),
        })
    }

    /// Make a JSON-RPC call and deserialize the result.
    ///
    /// # Arguments
    /// * `method` - The RPC method name, e.g. `cosmwasm_upload`
    /// * `params` - The method parameters, sent as a single object
    ///
    /// # Returns
    /// The deserialized `result`. Failing to reach the endpoint or to read its
    /// answer is a [`GatewayError::Transport`]. A non-null `error` object is a
    /// [`GatewayError::Rejected`] carrying the server's message, followed by
    /// its `data` when present.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, GatewayError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": 1
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to send {method} request: {e}")))?;

        let result: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to parse {method} response: {e}")))?;

        // Some servers send `"error": null` next to a successful result.
        if let Some(error) = result.get("error").filter(|e| !e.is_null()) {
            return Err(GatewayError::Rejected(rejection_message(error)));
        }

        let result_value = result
            .get("result")
            .cloned()
            .ok_or_else(|| GatewayError::Transport(format!("No result in {method} response")))?;

        serde_json::from_value(result_value).map_err(|e| {
            GatewayError::Transport(format!("Failed to deserialize {method} result: {e}"))
        })
    }

    /// Fee terms attached to every transaction. Gas is estimated by the client.
    fn fee(&self) -> Value {
        serde_json::json!({ "chain_id": self.chain_id, "gas_price": self.gas_price, "gas": "auto" })
    }
}

/// Text of a JSON-RPC error object: its `message`, then its `data`.
fn rejection_message(error: &Value) -> String {
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("unknown");

    match error.get("data") {
        None | Some(Value::Null) => message.to_string(),
        Some(Value::String(data)) if data.is_empty() => message.to_string(),
        Some(Value::String(data)) => format!("{message}: {data}"),
        Some(data) => format!("{message}: {data}"),
    }
}

impl Gateway for RpcGateway {
    fn name(&self) -> &'static str {
        "rpc"
    }

    async fn upload(&self, actor: &Actor, bytecode: &[u8]) -> Result<CodeId, GatewayError> {
        let result: UploadResult = self
            .call(
                "cosmwasm_upload",
                serde_json::json!({
                    "sender": actor,
                    "wasm_byte_code": STANDARD.encode(bytecode),
                    "fee": self.fee(),
                }),
            )
            .await?;
        Ok(CodeId::new(result.code_id))
    }

    async fn instantiate(
        &self,
        actor: &Actor,
        code_id: CodeId,
        label: &str,
        msg: &Message,
        admin: Option<&str>,
    ) -> Result<ContractAddress, GatewayError> {
        let result: InstantiateResult = self
            .call(
                "cosmwasm_instantiate",
                serde_json::json!({
                    "sender": actor,
                    "code_id": code_id,
                    "label": label,
                    "msg": msg.encoded(),
                    "admin": admin,
                    "fee": self.fee(),
                }),
            )
            .await?;
        Ok(ContractAddress::new(result.contract_address))
    }

    async fn execute(
        &self,
        actor: &Actor,
        contract: &ContractAddress,
        msg: &Message,
    ) -> Result<Receipt, GatewayError> {
        self.call(
            "cosmwasm_execute",
            serde_json::json!({
                "sender": actor,
                "contract": contract,
                "msg": msg.encoded(),
                "fee": self.fee(),
            }),
        )
        .await
    }

    async fn migrate(
        &self,
        actor: &Actor,
        contract: &ContractAddress,
        new_code_id: CodeId,
        msg: &Message,
    ) -> Result<Receipt, GatewayError> {
        self.call(
            "cosmwasm_migrate",
            serde_json::json!({
                "sender": actor,
                "contract": contract,
                "code_id": new_code_id,
                "msg": msg.encoded(),
                "fee": self.fee(),
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    /// Serve a single HTTP request with `reply` as the JSON body.
    ///
    /// Returns the endpoint URL and a handle yielding the JSON-RPC request the
    /// server received.
    async fn serve_once(reply: Value) -> (String, JoinHandle<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let body_start = loop {
                let n = socket.read(&mut chunk).await.expect("read");
                assert!(n > 0, "connection closed before the headers ended");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let headers = String::from_utf8_lossy(&buf[..body_start]).to_lowercase();
            let length: usize = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().expect("content-length"))
                .unwrap_or(0);

            while buf.len() < body_start + length {
                let n = socket.read(&mut chunk).await.expect("read");
                assert!(n > 0, "connection closed before the body ended");
                buf.extend_from_slice(&chunk[..n]);
            }
            let request: Value =
                serde_json::from_slice(&buf[body_start..body_start + length]).expect("request json");

            let body = reply.to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.ok();
            request
        });

        (url, handle)
    }

    fn gateway(url: String) -> RpcGateway {
        let network = NetworkConfig {
            rpc_url: url,
            request_timeout_secs: 5,
            ..Default::default()
        };
        RpcGateway::new(&network).expect("gateway")
    }

    fn actor() -> Actor {
        Actor::new("juno1deployer")
    }

    #[tokio::test]
    async fn test_upload_ignores_null_error() {
        let (url, server) = serve_once(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "code_id": 42 },
            "error": null
        }))
        .await;

        let code_id = gateway(url)
            .upload(&actor(), b"\0asm")
            .await
            .expect("upload");
        assert_eq!(code_id, CodeId::new(42));

        let request = server.await.expect("server");
        assert_eq!(request["method"], "cosmwasm_upload");
        assert_eq!(request["params"]["sender"], "juno1deployer");
        assert_eq!(request["params"]["wasm_byte_code"], STANDARD.encode(b"\0asm"));
        assert_eq!(request["params"]["fee"]["chain_id"], "uni-6");
    }

    #[tokio::test]
    async fn test_instantiate_sends_encoded_message() {
        let (url, server) = serve_once(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "contract_address": "juno1vesting" }
        }))
        .await;

        let msg = Message::new(&json!({ "reward_token": "juno1reward", "vesting": null }))
            .expect("message");
        let address = gateway(url)
            .instantiate(&actor(), CodeId::new(278), "vesting", &msg, None)
            .await
            .expect("instantiate");
        assert_eq!(address, ContractAddress::from("juno1vesting"));

        let request = server.await.expect("server");
        let params = &request["params"];
        assert_eq!(request["method"], "cosmwasm_instantiate");
        assert_eq!(params["code_id"], 278);
        assert_eq!(params["label"], "vesting");
        assert_eq!(params["msg"], msg.encoded());
        assert_eq!(params["admin"], Value::Null);
    }

    #[tokio::test]
    async fn test_error_object_is_rejection() {
        let (url, _server) = serve_once(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": -32000,
                "message": "execute wasm contract failed",
                "data": "Unauthorized"
            }
        }))
        .await;

        let msg = Message::new(&json!({ "set_worker": { "worker": "juno1presale" } }))
            .expect("message");
        let result = gateway(url)
            .execute(&actor(), &ContractAddress::from("juno1vesting"), &msg)
            .await;
        assert_eq!(
            result,
            Err(GatewayError::Rejected(
                "execute wasm contract failed: Unauthorized".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_migrate_parses_receipt() {
        let (url, server) = serve_once(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "tx_hash": "0AB1", "gas_used": 182000 }
        }))
        .await;

        let msg = Message::new(&json!({})).expect("message");
        let receipt = gateway(url)
            .migrate(&actor(), &ContractAddress::from("juno1vesting"), CodeId::new(300), &msg)
            .await
            .expect("migrate");
        assert_eq!(
            receipt,
            Receipt {
                tx_hash: "0AB1".to_string(),
                gas_used: 182_000,
            }
        );

        let request = server.await.expect("server");
        assert_eq!(request["method"], "cosmwasm_migrate");
        assert_eq!(request["params"]["contract"], "juno1vesting");
        assert_eq!(request["params"]["code_id"], 300);
    }

    #[tokio::test]
    async fn test_missing_result_is_transport_error() {
        let (url, _server) = serve_once(json!({ "jsonrpc": "2.0", "id": 1 })).await;

        let result = gateway(url).upload(&actor(), b"\0asm").await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[test]
    fn test_rejection_message() {
        assert_eq!(rejection_message(&json!({ "message": "out of gas" })), "out of gas");
        assert_eq!(
            rejection_message(&json!({ "message": "failed", "data": null })),
            "failed"
        );
        assert_eq!(
            rejection_message(&json!({ "message": "failed", "data": { "log": "no funds" } })),
            r#"failed: {"log":"no funds"}"#
        );
        assert_eq!(rejection_message(&json!({ "code": 1 })), "unknown");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let network = NetworkConfig {
            // Port 9 (discard) is never serving JSON-RPC.
            rpc_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        };
        let gateway = RpcGateway::new(&network).expect("gateway");

        let result = gateway.upload(&actor(), b"\0asm").await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let network = NetworkConfig {
            rpc_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(RpcGateway::new(&network).is_err());
    }
}
