//! A minimal server exercising the full inbound pipeline: registers an
//! `echo` and an `add` method, enables CORS, and starts listening.
//!
//! Run with `cargo run --example echo_server`, then:
//! `curl -X POST localhost:3000/echo -d '{"m":"hi"}'`

use rpc_endpoint::config::{CorsOptions, EndpointConfig};
use rpc_endpoint::{Endpoint, Params};
use serde_json::Value;
use std::time::Duration;

#[tokio::main]
async fn main() {
    rpc_endpoint::logging::init(rpc_endpoint::logging::LogConfig { json: false });

    let config = EndpointConfig::builder()
        .port(3000)
        .host("127.0.0.1")
        .start_server(true)
        .cors(CorsOptions::default())
        .build()
        .expect("default config is always valid");

    let endpoint = Endpoint::new(config).expect("resilience registries always construct from a valid config");

    endpoint.method("echo", |params: Params| async move { Ok(Value::Object(params)) });

    endpoint.method("add", |params: Params| async move {
        let a = params.get("a").and_then(Value::as_f64).unwrap_or(0.0);
        let b = params.get("b").and_then(Value::as_f64).unwrap_or(0.0);
        Ok(serde_json::json!({ "result": a + b }))
    });

    endpoint.start().await.expect("binding 127.0.0.1:3000");
    println!("listening on http://127.0.0.1:3000 ({:?})", endpoint.methods());

    tokio::signal::ctrl_c().await.ok();
    endpoint.stop(Duration::from_secs(5)).await;
}
