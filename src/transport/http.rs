//! HTTP handlers: the publish endpoint and a health probe.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::warn;

use crate::relay::Payload;
use crate::transport::AppState;
use crate::utils::RelayError;

/// `POST /sync`: the body becomes the new state and is pushed to every
/// subscriber. The acknowledgement means "stored and fan-out attempted".
///
/// A body that is not a JSON object or array is refused before the stored
/// state is touched.
pub async fn publish(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<&'static str, RelayError> {
    let Json(value) = body.map_err(|rejection| {
        warn!("Rejected publish: {}", rejection.body_text());
        RelayError::RejectedPayload {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    })?;

    if !(value.is_object() || value.is_array()) {
        warn!("Rejected publish: top-level value is not an object or array");
        return Err(RelayError::RejectedPayload {
            status: StatusCode::BAD_REQUEST,
            message: "Snapshot must be a JSON object or array".to_string(),
        });
    }

    state.relay.publish(Payload::from_json(&value));
    Ok("ok")
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let stored = state.relay.state();
    Json(json!({
        "status": "ok",
        "connections": state.relay.connection_count(),
        "revision": stored.as_ref().map_or(0, |s| s.revision),
        "updated_at": stored.map(|s| s.updated_at.to_rfc3339()),
    }))
}
