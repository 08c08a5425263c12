//! # EVM JSON-RPC Registry Client
//!
//! Talks to the credential registry contract on an EVM-compatible chain.
//!
//! ## How It Works
//!
//! - Reads (`getCount`, `getCred`) go through `eth_call` at `latest`. They
//!   are retried on transport failure and bounded by a semaphore sized from
//!   [`RegistryConfig::max_concurrent_reads`], sharing one HTTP connection
//!   pool.
//! - Writes (`issue`) are never retried. A client holds a write gate so that
//!   at most one transaction from its signing identity is in flight, and
//!   `issue` returns only after the receipt is mined. Confirmed order is
//!   therefore submitted order.
//! - A revert surfaced during `eth_estimateGas`, `eth_sendTransaction` or
//!   `eth_sendRawTransaction` is reported as
//!   [`RegistryError::TransactionReverted`], as is a receipt with status
//!   `0x0`.
//!
//! One client should own each signing identity. Two clients sharing a key
//! would each hold their own gate and could race on the account nonce.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use credchain_core::{Address, CredentialHash};
use serde_json::{json, Value};
use tokio::sync::{Mutex, Semaphore};

use crate::abi;
use crate::client::RegistryClient;
use crate::config::{ConfigError, RegistryConfig};
use crate::error::{CallContext, RegistryError};
use crate::record::{CredentialRecord, IssueReceipt};
use crate::retry::retry_read;
use crate::signer::{LegacyTransaction, LocalSigner, Signer};

/// Gas estimate headroom, in percent.
const GAS_HEADROOM_PERCENT: u64 = 20;

/// Credential registry client over EVM JSON-RPC.
#[derive(Debug)]
pub struct EvmRegistryClient {
    http: reqwest::Client,
    config: Arc<RegistryConfig>,
    signer: Option<Signer>,
    write_gate: Mutex<()>,
    read_permits: Semaphore,
    next_id: AtomicU64,
}

/// Why a single JSON-RPC exchange failed, before the caller attaches
/// operation semantics.
#[derive(Debug)]
enum RpcFailure {
    Transport { reason: String, timed_out: bool },
    Malformed(String),
    Rejected { code: i64, message: String },
}

impl RpcFailure {
    fn is_revert(&self) -> bool {
        match self {
            Self::Rejected { code, message } => {
                *code == 3 || message.to_ascii_lowercase().contains("revert")
            }
            _ => false,
        }
    }
}

impl EvmRegistryClient {
    /// Build a read-only client. Attach a signer with [`with_signer`](Self::with_signer)
    /// to enable `issue`.
    pub fn new(config: Arc<RegistryConfig>) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let permits = config.max_concurrent_reads.max(1);
        Ok(Self {
            http,
            config,
            signer: None,
            write_gate: Mutex::new(()),
            read_permits: Semaphore::new(permits),
            next_id: AtomicU64::new(1),
        })
    }

    /// Attach the signing identity used by `issue`.
    pub fn with_signer(mut self, signer: Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    /// The shared configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Address transactions are sent from, if a signer is attached.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(Signer::address)
    }

    /// Send a JSON-RPC request and return the `result` field.
    async fn rpc(&self, method: &str, params: Value, retry: bool) -> Result<Value, RpcFailure> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });
        let send = || self.http.post(self.config.rpc_url.clone()).json(&body).send();
        let sent = if retry {
            retry_read(method, send).await
        } else {
            send().await
        };
        let resp = sent.map_err(|e| RpcFailure::Transport {
            timed_out: e.is_timeout(),
            reason: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(RpcFailure::Transport {
                reason: format!("HTTP {}", resp.status()),
                timed_out: false,
            });
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| RpcFailure::Malformed(format!("invalid JSON response: {e}")))?;

        if let Some(error) = json.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error")
                .to_string();
            return Err(RpcFailure::Rejected { code, message });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| RpcFailure::Malformed("JSON-RPC response missing 'result' field".into()))
    }

    /// Attach call context to a failure with default semantics.
    fn registry_error(&self, failure: RpcFailure, context: CallContext) -> RegistryError {
        match failure {
            RpcFailure::Transport { timed_out: true, .. } => RegistryError::Timeout {
                context,
                waited_ms: self.config.timeout_secs.saturating_mul(1000),
            },
            RpcFailure::Transport { reason, .. } => RegistryError::Unavailable { context, reason },
            RpcFailure::Malformed(reason) => RegistryError::MalformedResponse { context, reason },
            RpcFailure::Rejected { code, message } => RegistryError::Unavailable {
                context,
                reason: format!("RPC error {code}: {message}"),
            },
        }
    }

    /// Failure semantics for steps of a write: reverts and node-side
    /// rejections are final, transport errors are reported as unavailable.
    fn write_error(&self, failure: RpcFailure, context: CallContext) -> RegistryError {
        match failure {
            RpcFailure::Rejected { message, .. } => RegistryError::TransactionReverted {
                context,
                reason: message,
                transaction_hash: None,
            },
            other => self.registry_error(other, context),
        }
    }

    /// Execute a view function and return the raw ABI-encoded output.
    async fn call_view(&self, data: Vec<u8>) -> Result<Vec<u8>, RpcFailure> {
        let _permit = self.read_permits.acquire().await.map_err(|_| RpcFailure::Transport {
            reason: "read pool closed".into(),
            timed_out: false,
        })?;
        let call = json!({
            "to": self.config.registry_address,
            "data": hex_data(&data),
        });
        let result = self.rpc("eth_call", json!([call, "latest"]), true).await?;
        decode_hex_data(&result)
    }

    async fn chain_id(&self, context: &CallContext) -> Result<u64, RegistryError> {
        if let Some(id) = self.config.chain_id {
            return Ok(id);
        }
        let value = self
            .rpc("eth_chainId", json!([]), true)
            .await
            .map_err(|f| self.registry_error(f, context.clone()))?;
        quantity_u64(&value).ok_or_else(|| RegistryError::MalformedResponse {
            context: context.clone(),
            reason: format!("eth_chainId returned {value}"),
        })
    }

    async fn read_quantity(
        &self,
        context: &CallContext,
        method: &str,
        params: Value,
    ) -> Result<u128, RegistryError> {
        let value = self
            .rpc(method, params, true)
            .await
            .map_err(|f| self.write_error(f, context.clone()))?;
        parse_quantity(&value).ok_or_else(|| RegistryError::MalformedResponse {
            context: context.clone(),
            reason: format!("{method} returned {value}"),
        })
    }

    /// Submit through the node's account management.
    async fn send_managed(
        &self,
        context: &CallContext,
        from: Address,
        data: &[u8],
    ) -> Result<String, RegistryError> {
        let tx = json!({
            "from": from,
            "to": self.config.registry_address,
            "data": hex_data(data),
        });
        let result = self
            .rpc("eth_sendTransaction", json!([tx]), false)
            .await
            .map_err(|f| self.write_error(f, context.clone()))?;
        tx_hash_of(result, context)
    }

    /// Build, sign and submit a raw transaction.
    async fn send_local(
        &self,
        context: &CallContext,
        signer: &LocalSigner,
        data: Vec<u8>,
    ) -> Result<String, RegistryError> {
        let from = signer.address();
        let call = json!({
            "from": from,
            "to": self.config.registry_address,
            "data": hex_data(&data),
        });

        // A revert here means the contract would reject the write; nothing
        // has been broadcast yet.
        let estimate = self
            .read_quantity(context, "eth_estimateGas", json!([call]))
            .await?;
        let nonce = self
            .read_quantity(context, "eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let gas_price = self.read_quantity(context, "eth_gasPrice", json!([])).await?;
        let chain_id = self.chain_id(context).await?;

        let malformed = |what: &str| RegistryError::MalformedResponse {
            context: context.clone(),
            reason: format!("{what} out of range"),
        };
        let estimate = u64::try_from(estimate).map_err(|_| malformed("gas estimate"))?;
        let tx = LegacyTransaction {
            nonce: u64::try_from(nonce).map_err(|_| malformed("nonce"))?,
            gas_price,
            gas_limit: estimate.saturating_add(estimate.saturating_mul(GAS_HEADROOM_PERCENT) / 100),
            to: self.config.registry_address,
            value: 0,
            data,
        };
        let raw = signer
            .sign_transaction(&tx, chain_id)
            .map_err(|e| RegistryError::TransactionReverted {
                context: context.clone(),
                reason: format!("signing failed: {e}"),
                transaction_hash: None,
            })?;

        tracing::debug!(nonce = tx.nonce, gas_limit = tx.gas_limit, chain_id, "broadcasting signed transaction");
        let result = self
            .rpc("eth_sendRawTransaction", json!([hex_data(&raw)]), false)
            .await
            .map_err(|f| match f {
                RpcFailure::Transport { reason, .. } => RegistryError::Unavailable {
                    context: context.clone(),
                    reason: format!("{reason}; transaction may have been broadcast"),
                },
                other => self.write_error(other, context.clone()),
            })?;
        tx_hash_of(result, context)
    }

    /// Poll for the receipt until mined or the confirmation window closes.
    /// Returns the block number.
    async fn await_confirmation(
        &self,
        context: &CallContext,
        tx_hash: &str,
    ) -> Result<u64, RegistryError> {
        let started = tokio::time::Instant::now();
        let window = Duration::from_secs(self.config.confirmation_timeout_secs);
        let poll = Duration::from_millis(self.config.confirmation_poll_ms.max(1));
        loop {
            let receipt = self
                .rpc("eth_getTransactionReceipt", json!([tx_hash]), true)
                .await
                .map_err(|f| self.registry_error(f, context.clone()))?;

            if !receipt.is_null() {
                let status = receipt.get("status").and_then(Value::as_str).unwrap_or("0x0");
                if status == "0x0" {
                    return Err(RegistryError::TransactionReverted {
                        context: context.clone(),
                        reason: "transaction mined with failed status".into(),
                        transaction_hash: Some(tx_hash.to_string()),
                    });
                }
                return receipt
                    .get("blockNumber")
                    .and_then(quantity_u64)
                    .ok_or_else(|| RegistryError::MalformedResponse {
                        context: context.clone(),
                        reason: "receipt missing blockNumber".into(),
                    });
            }

            let waited = started.elapsed();
            if waited >= window {
                return Err(RegistryError::Timeout {
                    context: context.clone(),
                    waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(poll).await;
        }
    }
}

#[async_trait]
impl RegistryClient for EvmRegistryClient {
    async fn issue(
        &self,
        subject: Address,
        hash: CredentialHash,
        locator: Option<&str>,
    ) -> Result<IssueReceipt, RegistryError> {
        let context = CallContext::issue(subject);
        let signer = self.signer.as_ref().ok_or(ConfigError::MissingSigner)?;
        let data = abi::encode_issue(&subject, &hash, locator.unwrap_or(""));

        let _gate = self.write_gate.lock().await;
        tracing::info!(%subject, %hash, from = %signer.address(), "submitting issue transaction");

        let tx_hash = match signer {
            Signer::RpcManaged { from } => self.send_managed(&context, *from, &data).await?,
            Signer::Local(local) => self.send_local(&context, local, data).await?,
        };
        let block_number = self.await_confirmation(&context, &tx_hash).await?;

        tracing::info!(%subject, %hash, %tx_hash, block_number, "credential issued");
        Ok(IssueReceipt {
            transaction_hash: tx_hash,
            block_number,
            subject,
            hash,
            locator: locator.filter(|l| !l.is_empty()).map(str::to_string),
        })
    }

    async fn get_count(&self, subject: Address) -> Result<u64, RegistryError> {
        let context = CallContext::get_count(subject);
        let output = self
            .call_view(abi::encode_get_count(&subject))
            .await
            .map_err(|f| self.registry_error(f, context.clone()))?;
        let count = abi::decode_u64(&output).map_err(|e| RegistryError::MalformedResponse {
            context,
            reason: e.to_string(),
        })?;
        tracing::debug!(%subject, count, "getCount");
        Ok(count)
    }

    async fn get_cred(&self, subject: Address, index: u64) -> Result<CredentialRecord, RegistryError> {
        let context = CallContext::get_cred(subject, index);
        let output = match self.call_view(abi::encode_get_cred(&subject, index)).await {
            Ok(output) => output,
            Err(f) if f.is_revert() => return Err(RegistryError::OutOfRange { subject, index }),
            Err(f) => return Err(self.registry_error(f, context)),
        };
        if output.is_empty() {
            // Some nodes report a revert as empty return data.
            return Err(RegistryError::OutOfRange { subject, index });
        }
        abi::decode_credential(&output).map_err(|e| RegistryError::MalformedResponse {
            context,
            reason: e.to_string(),
        })
    }
}

fn hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn decode_hex_data(value: &Value) -> Result<Vec<u8>, RpcFailure> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcFailure::Malformed(format!("expected hex string, got {value}")))?;
    let body = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(body).map_err(|e| RpcFailure::Malformed(format!("invalid hex data: {e}")))
}

/// Parse a JSON-RPC quantity (`0x`-prefixed, no leading zeros required).
fn parse_quantity(value: &Value) -> Option<u128> {
    let text = value.as_str()?;
    let body = text.strip_prefix("0x")?;
    if body.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(body, 16).ok()
}

fn quantity_u64(value: &Value) -> Option<u64> {
    parse_quantity(value).and_then(|q| u64::try_from(q).ok())
}

fn tx_hash_of(result: Value, context: &CallContext) -> Result<String, RegistryError> {
    match result.as_str() {
        Some(hash) if hash.starts_with("0x") && hash.len() == 66 => Ok(hash.to_ascii_lowercase()),
        _ => Err(RegistryError::MalformedResponse {
            context: context.clone(),
            reason: format!("expected transaction hash, got {result}"),
        }),
    }
}
