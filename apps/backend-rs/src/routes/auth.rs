use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::AppResult, extract::AppJson, schemas::CredentialsInput, state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/sign-in", axum::routing::post(sign_in))
        .route("/sign-up", axum::routing::post(sign_up))
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    user: Value,
}

async fn sign_in(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CredentialsInput>,
) -> AppResult<Json<Value>> {
    let credentials = payload.into_credentials()?;
    let session: LoginResponse = state.data_api.post("login", &credentials).await?;

    tracing::info!(email = %credentials.email, "User signed in");
    Ok(Json(json!({
        "accessToken": session.access_token,
        "user": session.user,
    })))
}

async fn sign_up(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CredentialsInput>,
) -> AppResult<impl IntoResponse> {
    let credentials = payload.into_credentials()?;
    let created: Value = state.data_api.post("signup", &credentials).await?;

    tracing::info!(email = %credentials.email, "User signed up");
    Ok((StatusCode::CREATED, Json(created)))
}
