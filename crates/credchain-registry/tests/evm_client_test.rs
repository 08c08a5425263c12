//! # Contract Tests for the EVM Registry Client
//!
//! Runs `EvmRegistryClient` against a wiremock JSON-RPC node to check
//! request construction, return-data decoding, and the mapping of node
//! responses onto `RegistryError` variants.

use std::sync::Arc;

use credchain_core::{Address, CredentialHash, Timestamp};
use credchain_registry::abi;
use credchain_registry::{
    CredentialRecord, EvmRegistryClient, RegistryClient, RegistryConfig, RegistryError, Signer,
    SignerConfig,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const REGISTRY: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";
const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn subject() -> Address {
    "0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap()
}

fn tx_hash() -> String {
    format!("0x{}", "ab".repeat(32))
}

fn config(server: &MockServer) -> RegistryConfig {
    RegistryConfig::parse(&server.uri(), REGISTRY)
        .expect("config")
        .with_timeout_secs(5)
        .with_confirmation(10, 2)
}

fn client(server: &MockServer) -> EvmRegistryClient {
    EvmRegistryClient::new(Arc::new(config(server))).expect("client")
}

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
}

fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {"code": code, "message": message}
    }))
}

fn word(value: u64) -> Vec<u8> {
    let mut w = vec![0u8; 32];
    w[24..].copy_from_slice(&value.to_be_bytes());
    w
}

/// ABI-encode a `getCred` return tuple.
fn credential_return(record: &CredentialRecord) -> String {
    let locator = record.locator.clone().unwrap_or_default();
    let mut out = vec![0u8; 12];
    out.extend_from_slice(record.issuer.as_bytes());
    out.extend_from_slice(record.hash.as_bytes());
    out.extend(word(5 * 32));
    out.extend(word(record.issued_at.unix_seconds() as u64));
    out.extend(word(u64::from(record.revoked)));
    out.extend(word(locator.len() as u64));
    out.extend_from_slice(locator.as_bytes());
    out.resize(out.len() + (32 - locator.len() % 32) % 32, 0);
    format!("0x{}", hex::encode(out))
}

fn sample_record() -> CredentialRecord {
    CredentialRecord {
        issuer: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap(),
        hash: "0x0992510ca0fa9cc6d5ed4745fa0d2b568198bb284eb45f4fb6b58e6a34c7fb45"
            .parse()
            .unwrap(),
        locator: Some("ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".into()),
        issued_at: Timestamp::from_unix_seconds(1_714_521_600).unwrap(),
        revoked: false,
    }
}

fn receipt(status: &str, block: &str) -> Value {
    json!({"transactionHash": tx_hash(), "status": status, "blockNumber": block})
}

async fn requests_for(server: &MockServer, rpc_method: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r: &Request| r.body_json::<Value>().ok())
        .filter(|body| body["method"] == rpc_method)
        .collect()
}

// ── Reads ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_count_decodes_word_and_targets_registry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .respond_with(rpc_result(json!(format!("0x{}", hex::encode(word(3))))))
        .expect(1)
        .mount(&server)
        .await;

    let count = client(&server).get_count(subject()).await.expect("count");
    assert_eq!(count, 3);

    let calls = requests_for(&server, "eth_call").await;
    let params = &calls[0]["params"];
    assert_eq!(params[0]["to"], REGISTRY);
    assert_eq!(
        params[0]["data"],
        format!("0x{}", hex::encode(abi::encode_get_count(&subject())))
    );
    assert_eq!(params[1], "latest");
}

#[tokio::test]
async fn get_cred_decodes_record() {
    let server = MockServer::start().await;
    let record = sample_record();
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .respond_with(rpc_result(json!(credential_return(&record))))
        .mount(&server)
        .await;

    let fetched = client(&server).get_cred(subject(), 0).await.expect("record");
    assert_eq!(fetched, record);
}

#[tokio::test]
async fn get_cred_revert_is_out_of_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .respond_with(rpc_error(3, "execution reverted: index out of bounds"))
        .mount(&server)
        .await;

    let err = client(&server).get_cred(subject(), 7).await.unwrap_err();
    assert!(matches!(err, RegistryError::OutOfRange { index: 7, .. }), "{err}");
}

#[tokio::test]
async fn get_cred_empty_return_is_out_of_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .respond_with(rpc_result(json!("0x")))
        .mount(&server)
        .await;

    let err = client(&server).get_cred(subject(), 0).await.unwrap_err();
    assert!(matches!(err, RegistryError::OutOfRange { index: 0, .. }));
}

#[tokio::test]
async fn http_error_is_unavailable_with_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server).get_cred(subject(), 2).await.unwrap_err();
    match err {
        RegistryError::Unavailable { context, reason } => {
            assert_eq!(context.index, Some(2));
            assert!(reason.contains("500"));
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_return_data_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_call"})))
        .respond_with(rpc_result(json!("0x1234")))
        .mount(&server)
        .await;

    let err = client(&server).get_count(subject()).await.unwrap_err();
    assert!(matches!(err, RegistryError::MalformedResponse { .. }));
}

// ── Writes ───────────────────────────────────────────────────────────────

fn managed_client(server: &MockServer) -> EvmRegistryClient {
    let from: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
    client(server).with_signer(Signer::RpcManaged { from })
}

#[tokio::test]
async fn issue_without_signer_is_config_error() {
    let server = MockServer::start().await;
    let err = client(&server)
        .issue(subject(), CredentialHash::from_bytes([1; 32]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Config(_)));
    assert!(requests_for(&server, "eth_sendTransaction").await.is_empty());
}

#[tokio::test]
async fn managed_issue_waits_for_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_sendTransaction"})))
        .respond_with(rpc_result(json!(tx_hash())))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
        .respond_with(rpc_result(receipt("0x1", "0x10")))
        .mount(&server)
        .await;

    let hash = CredentialHash::from_bytes([0x42; 32]);
    let receipt = managed_client(&server)
        .issue(subject(), hash, Some("ipfs://bafy"))
        .await
        .expect("issue");

    assert_eq!(receipt.transaction_hash, tx_hash());
    assert_eq!(receipt.block_number, 16);
    assert_eq!(receipt.hash, hash);
    assert_eq!(receipt.locator.as_deref(), Some("ipfs://bafy"));

    let sent = requests_for(&server, "eth_sendTransaction").await;
    assert_eq!(
        sent[0]["params"][0]["data"],
        format!("0x{}", hex::encode(abi::encode_issue(&subject(), &hash, "ipfs://bafy")))
    );
}

#[tokio::test]
async fn failed_receipt_status_is_reverted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_sendTransaction"})))
        .respond_with(rpc_result(json!(tx_hash())))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
        .respond_with(rpc_result(receipt("0x0", "0x11")))
        .mount(&server)
        .await;

    let err = managed_client(&server)
        .issue(subject(), CredentialHash::from_bytes([1; 32]), None)
        .await
        .unwrap_err();
    match err {
        RegistryError::TransactionReverted { transaction_hash, .. } => {
            assert_eq!(transaction_hash, Some(tx_hash()));
        }
        other => panic!("expected TransactionReverted, got {other:?}"),
    }
}

#[tokio::test]
async fn write_transport_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_sendTransaction"})))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = managed_client(&server)
        .issue(subject(), CredentialHash::from_bytes([1; 32]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Unavailable { .. }));
    assert!(!err.is_retryable_read());
}

#[tokio::test]
async fn missing_receipt_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_sendTransaction"})))
        .respond_with(rpc_result(json!(tx_hash())))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
        .respond_with(rpc_result(Value::Null))
        .mount(&server)
        .await;

    let from: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
    let client = EvmRegistryClient::new(Arc::new(config(&server).with_confirmation(10, 0)))
        .expect("client")
        .with_signer(Signer::RpcManaged { from });
    let err = client
        .issue(subject(), CredentialHash::from_bytes([1; 32]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Timeout { .. }), "{err}");
}

fn local_client(server: &MockServer) -> EvmRegistryClient {
    let signer = Signer::from_config(&SignerConfig::local(DEV_KEY)).expect("signer");
    EvmRegistryClient::new(Arc::new(config(server).with_chain_id(31337)))
        .expect("client")
        .with_signer(signer)
}

async fn mount_gas_and_nonce(server: &MockServer) {
    for (rpc_method, result) in [
        ("eth_getTransactionCount", "0x0"),
        ("eth_gasPrice", "0x3b9aca00"),
    ] {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": rpc_method})))
            .respond_with(rpc_result(json!(result)))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn local_issue_signs_and_broadcasts_raw_transaction() {
    let server = MockServer::start().await;
    mount_gas_and_nonce(&server).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_estimateGas"})))
        .respond_with(rpc_result(json!("0x186a0")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_sendRawTransaction"})))
        .respond_with(rpc_result(json!(tx_hash())))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getTransactionReceipt"})))
        .respond_with(rpc_result(receipt("0x1", "0x2")))
        .mount(&server)
        .await;

    let client = local_client(&server);
    assert_eq!(
        client.signer_address().map(|a| a.to_string()).as_deref(),
        Some("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266")
    );

    let hash = CredentialHash::from_bytes([0x42; 32]);
    let receipt = client.issue(subject(), hash, None).await.expect("issue");
    assert_eq!(receipt.block_number, 2);

    let raw = requests_for(&server, "eth_sendRawTransaction").await;
    let raw_hex = raw[0]["params"][0].as_str().expect("raw tx");
    let calldata = hex::encode(abi::encode_issue(&subject(), &hash, ""));
    assert!(raw_hex.starts_with("0xf8") || raw_hex.starts_with("0xf9"));
    assert!(raw_hex.contains(&calldata));

    // Nonce is taken from the pending pool.
    let nonce_calls = requests_for(&server, "eth_getTransactionCount").await;
    assert_eq!(nonce_calls[0]["params"][1], "pending");
    // Chain id came from configuration.
    assert!(requests_for(&server, "eth_chainId").await.is_empty());
}

#[tokio::test]
async fn estimate_revert_is_reported_before_broadcast() {
    let server = MockServer::start().await;
    mount_gas_and_nonce(&server).await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_estimateGas"})))
        .respond_with(rpc_error(-32000, "execution reverted: not an authorized issuer"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_sendRawTransaction"})))
        .respond_with(rpc_result(json!(tx_hash())))
        .expect(0)
        .mount(&server)
        .await;

    let err = local_client(&server)
        .issue(subject(), CredentialHash::from_bytes([1; 32]), None)
        .await
        .unwrap_err();
    match err {
        RegistryError::TransactionReverted { reason, transaction_hash, .. } => {
            assert!(reason.contains("not an authorized issuer"));
            assert_eq!(transaction_hash, None);
        }
        other => panic!("expected TransactionReverted, got {other:?}"),
    }
}
