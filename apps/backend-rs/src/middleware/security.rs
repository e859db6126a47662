use axum::{
    extract::{Request, State},
    http::{header::HOST, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::state::AppState;

/// Rejects requests whose `Host` is not listed in `TRUSTED_HOSTS`. An empty
/// list or a `*` entry disables the check.
pub async fn enforce_trusted_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let trusted = &state.config.trusted_hosts;
    if trusted.is_empty() || trusted.iter().any(|host| host == "*") {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(strip_port)
        .unwrap_or_default();

    if trusted.iter().any(|allowed| allowed.eq_ignore_ascii_case(&host)) {
        return next.run(request).await;
    }

    tracing::warn!(host = %host, "Rejected request from untrusted host");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "Invalid host header" })),
    )
        .into_response()
}

fn strip_port(raw: &str) -> String {
    let value = raw.trim();
    if let Some(rest) = value.strip_prefix('[') {
        // IPv6 literal, e.g. `[::1]:8000`.
        return rest.split(']').next().unwrap_or_default().to_string();
    }
    value.split(':').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::strip_port;

    #[test]
    fn strips_ports_from_host_headers() {
        assert_eq!(strip_port("localhost:8000"), "localhost");
        assert_eq!(strip_port("127.0.0.1"), "127.0.0.1");
        assert_eq!(strip_port("[::1]:8000"), "::1");
    }
}
