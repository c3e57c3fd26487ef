//! HTTP invocation handler.

use crate::state::Gateway;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fcore::{Context, Error, Invocation, Reply, Result, Route, Transport, env, guarded};
use serde_json::{Value, json};

/// `POST /{name}`: validate, invoke once, answer with one output.
///
/// Every resolved route answers 200; validation and call failures travel in
/// the output's `error`.
pub async fn invoke(
    State(state): State<Gateway>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let Some(route) = state.route(&name, Transport::Http) else {
        return not_found();
    };
    let output = route.output();

    let invocation = match validate(&route, &body) {
        Ok(invocation) => invocation,
        Err(e) => {
            tracing::warn!("{}: rejected request: {e}", route.name());
            return Json(output.failure(e.to_string(), String::new())).into_response();
        }
    };

    tracing::debug!("{}: invoking", route.name());
    let Invocation { args, envs } = invocation;
    let ctx = Context::new(envs.clone());
    let stdout = ctx.stdout();
    let reply = env::scoped(
        state.invoke.env_scope,
        &envs,
        guarded(route.call(args, ctx)),
    )
    .await;

    let result = match reply {
        Ok(Reply::Value(value)) => output.success(value, stdout.take()),
        Ok(other) => output.failure(
            format!("a {} reply needs a websocket session", other.kind()),
            stdout.take(),
        ),
        Err(e) => {
            tracing::debug!("{}: call failed: {e}", route.name());
            output.failure(e.to_string(), stdout.take())
        }
    };
    Json(result).into_response()
}

/// `404 {"detail": "Not Found"}`.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" }))).into_response()
}

fn validate(route: &Route, body: &[u8]) -> Result<Invocation> {
    let body: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body)
            .map_err(|e| Error::Validation(format!("request: invalid JSON: {e}")))?
    };
    route.input().validate(&body)
}
