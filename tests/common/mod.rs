#![allow(dead_code)]

use std::sync::Arc;

use rn_bridge::{Bridge, BridgeConfig, BridgeHandle, ChannelTransport, RemoteEndpoint};
use serde_json::{json, Value};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Bridge wired to an in-process remote end, already marked ready.
pub fn ready_bridge() -> (Bridge, BridgeHandle, RemoteEndpoint) {
    ready_bridge_with(BridgeConfig::default())
}

pub fn ready_bridge_with(config: BridgeConfig) -> (Bridge, BridgeHandle, RemoteEndpoint) {
    let (transport, remote) = ChannelTransport::pair();
    let bridge = Bridge::start(&config, Arc::new(transport));
    let handle = bridge.handle();
    handle.notify_ready().unwrap();
    (bridge, handle, remote)
}

/// What the remote side would answer to `request`.
pub fn response_to(request: &Value, data: Value) -> Value {
    json!({
        "id": request["id"],
        "name": request["name"],
        "type": "response",
        "data": data,
    })
}

pub fn event(name: &str, data: Option<Value>) -> Value {
    let mut event = json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "name": name,
        "type": "event",
    });
    if let Some(data) = data {
        event["data"] = data;
    }
    event
}

pub fn request(id: &str, name: &str, data: Option<Value>) -> Value {
    let mut request = json!({"id": id, "name": name, "type": "request"});
    if let Some(data) = data {
        request["data"] = data;
    }
    request
}
