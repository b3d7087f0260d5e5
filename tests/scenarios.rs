//! End-to-end scenarios from the concrete-scenarios list: a real
//! `Endpoint` bound to an ephemeral loopback port, driven over the wire.

use rpc_endpoint::client::CallOptions;
use rpc_endpoint::config::{EndpointConfig, MethodBulkheadSettings, RetrySettings};
use rpc_endpoint::{ApiError, Endpoint, Params};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn start_server(config: EndpointConfig) -> Endpoint {
    let endpoint = Endpoint::new(config).unwrap();
    endpoint.start().await.unwrap();
    endpoint
}

fn base_url(endpoint: &Endpoint) -> String {
    format!("http://{}", endpoint.local_addr().unwrap())
}

#[tokio::test]
async fn echo_returns_the_submitted_params() {
    let server = start_server(
        EndpointConfig::builder().port(0).start_server(true).build().unwrap(),
    )
    .await;
    server.method("echo", |params: Params| async move { Ok(Value::Object(params)) });

    let client = Endpoint::new(EndpointConfig::default()).unwrap();
    let result = client
        .call(&base_url(&server), "echo", json!({"m": "hi"}), CallOptions::default())
        .await
        .unwrap();

    assert_eq!(result, json!({"m": "hi"}));
}

#[tokio::test]
async fn not_found_lists_available_methods() {
    let server = start_server(
        EndpointConfig::builder().port(0).start_server(true).build().unwrap(),
    )
    .await;
    server.method("echo", |params: Params| async move { Ok(Value::Object(params)) });

    let client = Endpoint::new(EndpointConfig::default()).unwrap();
    let err = client
        .call(&base_url(&server), "ghost", json!({}), CallOptions::default())
        .await
        .unwrap_err();

    match err {
        ApiError::MethodNotFound { method, available } => {
            assert_eq!(method, "ghost");
            assert_eq!(available, vec!["echo".to_string()]);
        }
        other => panic!("expected MethodNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn arithmetic_add_sums_the_operands() {
    let server = start_server(
        EndpointConfig::builder().port(0).start_server(true).build().unwrap(),
    )
    .await;
    server.method("add", |params: Params| async move {
        let a = params.get("a").and_then(Value::as_f64).unwrap_or(0.0);
        let b = params.get("b").and_then(Value::as_f64).unwrap_or(0.0);
        Ok(json!({ "result": a + b }))
    });

    let client = Endpoint::new(EndpointConfig::default()).unwrap();
    let result = client
        .call(&base_url(&server), "add", json!({"a": 5, "b": 3}), CallOptions::default())
        .await
        .unwrap();

    assert_eq!(result, json!({"result": 8.0}));
}

#[tokio::test]
async fn circuit_opens_after_failure_threshold_and_blocks_without_io() {
    let mut config = EndpointConfig::default();
    config.resilience.circuit_breaker.failure_threshold = 2;
    config.resilience.retry.max_retries = 0;
    let client = Endpoint::new(config).unwrap();

    // Nothing listens on this loopback port; every attempt fails fast
    // with a connection-refused transport error.
    let dead_target = "http://127.0.0.1:1";

    let first = client.call(dead_target, "anything", json!({}), CallOptions::default()).await;
    assert!(first.is_err());
    assert!(!matches!(first.unwrap_err(), ApiError::CircuitOpen { .. }));

    let second = client.call(dead_target, "anything", json!({}), CallOptions::default()).await;
    assert!(second.is_err());
    assert!(!matches!(second.unwrap_err(), ApiError::CircuitOpen { .. }));

    let third = client.call(dead_target, "anything", json!({}), CallOptions::default()).await;
    assert!(matches!(third.unwrap_err(), ApiError::CircuitOpen { .. }));
}

#[tokio::test]
async fn retry_then_succeed_after_backoff() {
    let server = start_server(
        EndpointConfig::builder().port(0).start_server(true).build().unwrap(),
    )
    .await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_in_handler = Arc::clone(&attempts);
    server.method("flaky", move |_: Params| {
        let attempts = Arc::clone(&attempts_in_handler);
        async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ApiError::Internal("not yet".to_string()))
            } else {
                Ok(json!({ "success": true }))
            }
        }
    });

    let client = Endpoint::new(EndpointConfig::default()).unwrap();
    let options = CallOptions {
        retry: Some(RetrySettings {
            max_retries: 5,
            initial_delay_ms: 50,
            backoff_factor: 1.5,
            jitter_enabled: false,
            ..RetrySettings::default()
        }),
        ..CallOptions::default()
    };

    let start = Instant::now();
    let result = client
        .call(&base_url(&server), "flaky", json!({}), options)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result, json!({"success": true}));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(elapsed >= Duration::from_millis(50 + 75));
}

#[tokio::test]
async fn bulkhead_admits_up_to_capacity_queues_one_and_rejects_the_rest() {
    let mut config = EndpointConfig::builder().port(0).start_server(true);
    config = config.method_bulkhead(
        "slow",
        MethodBulkheadSettings {
            max_concurrent: 2,
            max_queue: 1,
            queue_timeout_ms: 10_000,
        },
    );
    let server = start_server(config.build().unwrap()).await;
    server.method("slow", |_: Params| async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(json!({"done": true}))
    });

    let client = Endpoint::new(EndpointConfig::default()).unwrap();
    let url = base_url(&server);

    let mut calls = Vec::new();
    for _ in 0..4 {
        let client_url = url.clone();
        // Each Endpoint is independent per spec's client-construction
        // model, but they all target the same server so the server-side
        // per-method bulkhead is what's actually under test here.
        calls.push(tokio::spawn(async move {
            let client = Endpoint::new(EndpointConfig::default()).unwrap();
            client
                .call(&client_url, "slow", json!({}), CallOptions::default())
                .await
        }));
    }

    let results: Vec<_> = futures::future::join_all(calls).await;
    let oks = results.iter().filter(|r| r.as_ref().unwrap().is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r.as_ref().unwrap(), Err(ApiError::MethodBulkheadExceeded { .. })))
        .count();

    assert_eq!(oks, 3, "two immediate admits plus one queued admit");
    assert_eq!(rejections, 1);
}
