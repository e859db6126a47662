use std::time::Duration;

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    // Store ping is capped at 3 s.
    let data_api_ok = state.data_api.ping(Duration::from_secs(3)).await;

    let status = if data_api_ok { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "now": Utc::now().to_rfc3339(),
        "data_api": data_api_ok
    }))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{send, state_for};
    use axum::http::{Method, StatusCode};
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn reports_ok_when_store_answers() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/properties");
                then.status(200).json_body(json!([]));
            })
            .await;

        let (status, body) = send(&state_for(&server), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["data_api"], true);
    }

    #[tokio::test]
    async fn reports_degraded_when_store_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/properties");
                then.status(500);
            })
            .await;

        let (_, body) = send(&state_for(&server), Method::GET, "/health", None).await;
        assert_eq!(body["status"], "degraded");
    }
}
