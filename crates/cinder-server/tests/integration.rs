//! End-to-end tests driving a bound server with real HTTP and WebSocket
//! clients.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use cinder_core::{NotificationHub, Provider, ProviderError, ProviderNotification};
use cinder_server::{RpcServer, ServerConfig};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Provider with canned answers, a call log, and a controllable
/// notification hub.
struct RecordingProvider {
    hub: NotificationHub,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl RecordingProvider {
    fn new() -> Self {
        Self {
            hub: NotificationHub::default(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls_for(&self, method: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, ProviderError> {
        self.calls.lock().push((method.to_owned(), params.clone()));
        match method {
            "eth_blockNumber" => Ok(json!("0x10")),
            "eth_chainId" => Ok(json!("0x7a69")),
            "eth_subscribe" => Ok(json!("0x1")),
            "eth_unsubscribe" => Ok(json!(true)),
            "slow_echo" => {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(Value::Array(params))
            }
            "fail_tx" => Err(ProviderError::new(-32003, "transaction rejected")
                .with_transaction_hash("0xdeadbeef")),
            other => Err(ProviderError::method_not_found(other)),
        }
    }

    fn notifications(&self) -> tokio::sync::broadcast::Receiver<ProviderNotification> {
        self.hub.subscribe()
    }
}

/// Boot a server on an ephemeral port; returns base URLs and the provider.
async fn boot_server() -> (String, String, Arc<RecordingProvider>, RpcServer) {
    let provider = Arc::new(RecordingProvider::new());
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let server = RpcServer::new(config, provider.clone());
    let (addr, _handle) = server.listen().await.unwrap();
    (
        format!("http://{addr}"),
        format!("ws://{addr}/ws"),
        provider,
        server,
    )
}

async fn ws_connect(ws_url: &str) -> WsStream {
    let (stream, _resp) = timeout(TIMEOUT, connect_async(ws_url))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    stream
}

async fn ws_send(ws: &mut WsStream, body: &str) {
    ws.send(Message::Text(body.to_owned().into()))
        .await
        .unwrap();
}

async fn ws_recv_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("recv timed out")
            .expect("stream ended")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Poll until `predicate` holds or the timeout expires.
async fn wait_for(mut predicate: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ── HTTP ────────────────────────────────────────────────────────────

#[tokio::test]
async fn http_single_request_round_trip() {
    let (http_url, _ws, _provider, _server) = boot_server().await;

    let resp = reqwest::Client::new()
        .post(&http_url)
        .body(r#"{"jsonrpc":"2.0","id":1,"method":"eth_blockNumber","params":[]}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let v: Value = resp.json().await.unwrap();
    assert_eq!(v, json!({"jsonrpc":"2.0","id":1,"result":"0x10"}));
}

#[tokio::test]
async fn http_parse_error_round_trip() {
    let (http_url, _ws, _provider, _server) = boot_server().await;

    let resp = reqwest::Client::new()
        .post(&http_url)
        .body("{not valid json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let v: Value = resp.json().await.unwrap();
    assert_eq!(v["jsonrpc"], "2.0");
    assert_eq!(v["id"], Value::Null);
    assert_eq!(v["error"]["code"], -32700);
}

#[tokio::test]
async fn http_batch_order_independent_of_latency() {
    let (http_url, _ws, _provider, _server) = boot_server().await;

    // Position 0 answers ~200ms late; position 1 is immediate.
    let body = r#"[{"jsonrpc":"2.0","id":1,"method":"slow_echo","params":["a"]},
                   {"jsonrpc":"2.0","id":2,"method":"eth_chainId","params":[]}]"#;
    let resp = reqwest::Client::new()
        .post(&http_url)
        .body(body)
        .send()
        .await
        .unwrap();

    let v: Value = resp.json().await.unwrap();
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[0]["result"], json!(["a"]));
    assert_eq!(items[1]["id"], 2);
    assert_eq!(items[1]["result"], "0x7a69");
}

#[tokio::test]
async fn http_batch_isolates_item_failures() {
    let (http_url, _ws, _provider, _server) = boot_server().await;

    let body = r#"[{"jsonrpc":"2.0","id":1,"method":"eth_blockNumber"},
                   {"jsonrpc":"2.0","id":2,"method":"eth_noSuchMethod"},
                   "not an object"]"#;
    let resp = reqwest::Client::new()
        .post(&http_url)
        .body(body)
        .send()
        .await
        .unwrap();

    let v: Value = resp.json().await.unwrap();
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["result"], "0x10");
    assert_eq!(items[1]["error"]["code"], -32601);
    assert_eq!(items[2]["error"]["code"], -32600);
}

#[tokio::test]
async fn http_domain_error_carries_tx_hash() {
    let (http_url, _ws, _provider, _server) = boot_server().await;

    let resp = reqwest::Client::new()
        .post(&http_url)
        .body(r#"{"jsonrpc":"2.0","id":1,"method":"fail_tx","params":[]}"#)
        .send()
        .await
        .unwrap();

    let v: Value = resp.json().await.unwrap();
    assert_eq!(v["error"]["code"], -32003);
    assert_eq!(v["error"]["data"]["txHash"], "0xdeadbeef");
}

#[tokio::test]
async fn http_options_preflight() {
    let (http_url, _ws, _provider, _server) = boot_server().await;

    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, &http_url)
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["access-control-allow-origin"].to_str().unwrap(),
        "*"
    );
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn http_health_reports_ws_connections() {
    let (http_url, ws_url, _provider, _server) = boot_server().await;

    let _ws = ws_connect(&ws_url).await;

    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let v: Value = client
            .get(format!("{http_url}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(v["status"], "ok");
        if v["connections"] == 1 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "gauge never updated");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ── WebSocket ───────────────────────────────────────────────────────

#[tokio::test]
async fn ws_request_response() {
    let (_http, ws_url, _provider, _server) = boot_server().await;
    let mut ws = ws_connect(&ws_url).await;

    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":1,"method":"eth_blockNumber","params":[]}"#).await;
    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v, json!({"jsonrpc":"2.0","id":1,"result":"0x10"}));
}

#[tokio::test]
async fn ws_parse_error() {
    let (_http, ws_url, _provider, _server) = boot_server().await;
    let mut ws = ws_connect(&ws_url).await;

    ws_send(&mut ws, "{not valid json").await;
    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v["id"], Value::Null);
    assert_eq!(v["error"]["code"], -32700);
}

#[tokio::test]
async fn ws_batch_frame_rejected() {
    let (_http, ws_url, _provider, _server) = boot_server().await;
    let mut ws = ws_connect(&ws_url).await;

    ws_send(&mut ws, r#"[{"jsonrpc":"2.0","id":1,"method":"eth_chainId"}]"#).await;
    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v["error"]["code"], -32600);
}

#[tokio::test]
async fn ws_subscribe_receives_only_owned_notifications() {
    let (_http, ws_url, provider, _server) = boot_server().await;
    let mut ws = ws_connect(&ws_url).await;

    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":1,"method":"eth_subscribe","params":["newHeads"]}"#)
        .await;
    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v["result"], "0x1");

    // Another connection's subscription id: filtered out. Then an owned one.
    let _ = provider
        .hub
        .publish(ProviderNotification::new("0xother", json!({"number": "0x1"})));
    let _ = provider
        .hub
        .publish(ProviderNotification::new("0x1", json!({"number": "0x2a"})));

    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v["jsonrpc"], "2.0");
    assert_eq!(v["method"], "eth_subscription");
    assert_eq!(v["params"]["subscription"], "0x1");
    assert_eq!(v["params"]["result"]["number"], "0x2a");
}

#[tokio::test]
async fn ws_unsubscribe_stops_delivery() {
    let (_http, ws_url, provider, _server) = boot_server().await;
    let mut ws = ws_connect(&ws_url).await;

    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":1,"method":"eth_subscribe","params":["newHeads"]}"#)
        .await;
    let _ = ws_recv_json(&mut ws).await;

    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":2,"method":"eth_unsubscribe","params":["0x1"]}"#)
        .await;
    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v["result"], true);

    // Published after the unsubscribe response: must not be delivered.
    let _ = provider
        .hub
        .publish(ProviderNotification::new("0x1", json!({"number": "0x2a"})));

    // The next frame must be the chainId response, not a notification.
    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":3,"method":"eth_chainId","params":[]}"#).await;
    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v["id"], 3);
    assert_eq!(v["result"], "0x7a69");
}

#[tokio::test]
async fn ws_close_unsubscribes_and_silences() {
    let (_http, ws_url, provider, _server) = boot_server().await;
    let mut ws = ws_connect(&ws_url).await;

    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":1,"method":"eth_subscribe","params":["newHeads"]}"#)
        .await;
    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v["result"], "0x1");
    assert_eq!(provider.hub.listener_count(), 1);

    ws.close(None).await.unwrap();

    // Best-effort cleanup reaches the provider with the orphaned id...
    wait_for(|| provider.calls_for("eth_unsubscribe") == vec![vec![json!("0x1")]]).await;
    // ...and the connection's listener is detached.
    wait_for(|| provider.hub.listener_count() == 0).await;

    // Publishing afterwards reaches nobody.
    let delivered = provider
        .hub
        .publish(ProviderNotification::new("0x1", json!({"number": "0x2a"})));
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn ws_concurrent_frames_all_answered() {
    let (_http, ws_url, _provider, _server) = boot_server().await;
    let mut ws = ws_connect(&ws_url).await;

    // A slow request followed by fast ones; responses may arrive in any
    // order, but every id must be answered exactly once.
    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":1,"method":"slow_echo","params":["x"]}"#).await;
    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":2,"method":"eth_chainId","params":[]}"#).await;
    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":3,"method":"eth_blockNumber","params":[]}"#).await;

    let mut seen = std::collections::HashSet::new();
    for _ in 0..3 {
        let v = ws_recv_json(&mut ws).await;
        assert!(seen.insert(v["id"].as_i64().unwrap()));
    }
    assert_eq!(seen, [1, 2, 3].into_iter().collect());
}

#[tokio::test]
async fn ws_upgrade_available_on_root_path() {
    let (http_url, _ws, _provider, _server) = boot_server().await;
    let root_ws = http_url.replace("http://", "ws://");
    let mut ws = ws_connect(&root_ws).await;

    ws_send(&mut ws, r#"{"jsonrpc":"2.0","id":1,"method":"eth_chainId","params":[]}"#).await;
    let v = ws_recv_json(&mut ws).await;
    assert_eq!(v["result"], "0x7a69");
}

#[tokio::test]
async fn graceful_shutdown_stops_accepting() {
    let (http_url, _ws, _provider, server) = boot_server().await;

    server.shutdown().trigger();
    // The serve task winds down; new requests eventually fail.
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let result = client
            .post(&http_url)
            .body(r#"{"jsonrpc":"2.0","id":1,"method":"eth_chainId"}"#)
            .timeout(Duration::from_millis(250))
            .send()
            .await;
        if result.is_err() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "server kept accepting after shutdown"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
