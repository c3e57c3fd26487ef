//! HTTP transport tests against a live server.

use fcore::{Error, FunctionDescriptor, Registry, Reply, Serving, run_blocking};
use fnserve_gateway::{GatewayConfig, ServeHandle, serve};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};

static STRICT_CALLED: AtomicBool = AtomicBool::new(false);

fn registry() -> Registry {
    let mut registry = Registry::new();

    let greet = FunctionDescriptor::builder("greet")
        .description("Greet someone.")
        .param("name", "String")
        .returns("String")
        .build();
    registry.register(Serving::new(greet, |mut args, _ctx| async move {
        let name: String = args.take("name")?;
        run_blocking(move || format!("hello, {name}"))
            .await
            .and_then(Reply::value)
    }));

    let strict = FunctionDescriptor::builder("strict")
        .param("count", "i64")
        .returns("i64")
        .build();
    registry.register(Serving::new(strict, |mut args, _ctx| async move {
        STRICT_CALLED.store(true, Ordering::SeqCst);
        let count: i64 = args.take("count")?;
        Reply::value(count * 2)
    }));

    let divide = FunctionDescriptor::builder("divide")
        .param("a", "f64")
        .param("b", "f64")
        .returns("Result<f64, String>")
        .build();
    registry.register(Serving::new(divide, |mut args, _ctx| async move {
        let a: f64 = args.take("a")?;
        let b: f64 = args.take("b")?;
        Reply::from_result(if b == 0.0 {
            Err("division by zero")
        } else {
            Ok(a / b)
        })
    }));

    let chatty = FunctionDescriptor::builder("chatty")
        .context("ctx")
        .returns("Option<String>")
        .build();
    registry.register(Serving::new(chatty, |_args, ctx| async move {
        ctx.println("looking up FNSERVE_HTTP_USER");
        ctx.println("done");
        Reply::value(ctx.env("FNSERVE_HTTP_USER"))
    }));

    let explode = FunctionDescriptor::builder("explode").build();
    registry.register(Serving::new(explode, |_args, _ctx| async move {
        run_blocking(|| -> u8 { panic!("kaboom") }).await?;
        Reply::value(())
    }));

    let ask = FunctionDescriptor::builder("ask").returns("String").build();
    registry.register(Serving::new(ask, |_args, ctx| async move {
        Reply::value(ctx.ask("name?").await?)
    }));

    let live = FunctionDescriptor::builder("live")
        .returns("StreamingResponse")
        .websocket()
        .build();
    registry.register(Serving::new(live, |_args, _ctx| async move {
        Err::<Reply, _>(Error::Execution("unreachable over http".into()))
    }));

    registry
}

async fn start() -> (ServeHandle, String) {
    let mut config = GatewayConfig::default();
    config.server.bind = "127.0.0.1:0".into();
    let handle = serve(registry(), &config).await.unwrap();
    let base = format!("http://127.0.0.1:{}", handle.port);
    (handle, base)
}

async fn post(base: &str, name: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/{name}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn greet_returns_one_output() {
    let (handle, base) = start().await;

    let (status, body) = post(&base, "greet", json!({ "name": "Ann" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "result": "hello, Ann", "error": "", "stdout": "" })
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn wrong_types_never_reach_the_function() {
    let (handle, base) = start().await;

    let (status, body) = post(&base, "greet", json!({ "name": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "");
    assert_eq!(body["error"], "name: expected a string, got an integer");

    let (status, body) = post(&base, "strict", json!({ "count": "two" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 0);
    assert!(!STRICT_CALLED.load(Ordering::SeqCst));

    let (status, body) = post(&base, "strict", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "count: field required");
    assert!(!STRICT_CALLED.load(Ordering::SeqCst));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_json_is_a_validation_failure() {
    let (handle, base) = start().await;

    let response = reqwest::Client::new()
        .post(format!("{base}/greet"))
        .body("{ name: ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("request: invalid JSON"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn failures_are_reported_with_status_ok() {
    let (handle, base) = start().await;

    let (status, body) = post(&base, "divide", json!({ "a": 1, "b": 4 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 0.25);

    let (status, body) = post(&base, "divide", json!({ "a": 1, "b": 0 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], 0.0);
    assert_eq!(body["error"], "division by zero");

    let (status, body) = post(&base, "explode", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "function panicked: kaboom");

    let (_, body) = post(&base, "ask", json!({})).await;
    assert_eq!(body["error"], "human input is only available over websocket");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn stdout_and_envs_are_per_request() {
    let (handle, base) = start().await;

    let (_, body) = post(
        &base,
        "chatty",
        json!({ "envs": { "FNSERVE_HTTP_USER": "ann" } }),
    )
    .await;
    assert_eq!(
        body,
        json!({
            "result": "ann",
            "error": "",
            "stdout": "looking up FNSERVE_HTTP_USER\ndone",
        })
    );

    let (_, body) = post(&base, "chatty", json!({})).await;
    assert_eq!(body["result"], Value::Null);

    let (status, _) = post(&base, "chatty", json!({ "envs": { "X": 1 } })).await;
    assert_eq!(status, StatusCode::OK);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_and_websocket_routes_are_not_found() {
    let (handle, base) = start().await;

    let (status, body) = post(&base, "missing", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not Found" }));

    let (status, _) = post(&base, "live", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = reqwest::get(format!("{base}/a/b")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn health_probes() {
    let (handle, base) = start().await;

    for path in ["healthz", "dry_run"] {
        let response = reqwest::get(format!("{base}/{path}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "status": "ok" }));
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn routes_are_listed() {
    let (handle, base) = start().await;

    let routes: Vec<Value> = reqwest::get(format!("{base}/routes"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = routes.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        ["Ask", "Chatty", "Divide", "Explode", "Greet", "Live", "Strict"]
    );

    let greet = &routes[4];
    assert_eq!(greet["path"], "/greet");
    assert_eq!(greet["transport"], "http");
    assert_eq!(greet["description"], "Greet someone.");
    assert_eq!(greet["input_schema"]["required"], json!(["name"]));

    let live = &routes[5];
    assert_eq!(live["transport"], "websocket");
    assert_eq!(live["mode"], "externally_streaming");

    handle.shutdown().await.unwrap();
}
