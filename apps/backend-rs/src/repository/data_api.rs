use std::time::Duration;

use axum::http::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, AppResult};

const ALLOWED_RESOURCES: &[&str] = &["bookings", "properties", "login", "signup"];

/// JSON REST client for the external data store (`/bookings`, `/properties`,
/// `/login`, `/signup`).
#[derive(Debug, Clone)]
pub struct DataApi {
    http: reqwest::Client,
    base_url: Url,
}

impl DataApi {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn list_rows<T>(&self, resource: &str) -> AppResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.resource_url(resource, None)?;
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    pub async fn get_row<T>(&self, resource: &str, row_id: i64) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.resource_url(resource, Some(row_id))?;
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    pub async fn create_row<B, T>(&self, resource: &str, payload: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(resource, payload).await
    }

    /// Plain POST for endpoints that are not collections, like `/login`.
    pub async fn post<B, T>(&self, resource: &str, payload: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resource_url(resource, None)?;
        let response = self.http.post(url).json(payload).send().await?;
        read_json(response).await
    }

    pub async fn update_row<B, T>(&self, resource: &str, row_id: i64, payload: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resource_url(resource, Some(row_id))?;
        let response = self.http.put(url).json(payload).send().await?;
        read_json(response).await
    }

    pub async fn delete_row(&self, resource: &str, row_id: i64) -> AppResult<Value> {
        let url = self.resource_url(resource, Some(row_id))?;
        let response = self.http.delete(url).send().await?;
        read_json(response).await
    }

    /// Reachability check used by the health check.
    pub async fn ping(&self, timeout: Duration) -> bool {
        let Ok(url) = self.resource_url("properties", None) else {
            return false;
        };
        match self.http.get(url).timeout(timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::error!(error = %error, "Data store health check failed");
                false
            }
        }
    }

    fn resource_url(&self, resource: &str, row_id: Option<i64>) -> AppResult<Url> {
        let name = resource.trim();
        if !ALLOWED_RESOURCES.contains(&name) {
            return Err(AppError::Internal(format!(
                "Resource '{name}' is not exposed by the data store."
            )));
        }
        let path = match row_id {
            Some(id) => format!("{name}/{id}"),
            None => name.to_string(),
        };
        self.base_url
            .join(&path)
            .map_err(|error| AppError::Internal(format!("Invalid data store URL: {error}")))
    }
}

async fn read_json<T>(response: reqwest::Response) -> AppResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(upstream_error(status, &text));
    }
    Ok(response.json::<T>().await?)
}

/// Store error bodies are relayed verbatim; json-server-auth answers with plain
/// strings such as `"Incorrect password"`.
fn upstream_error(status: StatusCode, text: &str) -> AppError {
    let trimmed = text.trim();
    let body = if trimmed.is_empty() {
        Value::String("Internal server error".to_string())
    } else {
        serde_json::from_str::<Value>(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
    };
    tracing::warn!(status = status.as_u16(), body = %body, "Data store returned an error");
    AppError::Upstream { status, body }
}

#[cfg(test)]
mod tests {
    use super::{upstream_error, DataApi};
    use crate::{error::AppError, models::Booking};
    use axum::http::StatusCode;
    use httpmock::prelude::*;
    use serde_json::{json, Value};
    use url::Url;

    fn client(server: &MockServer) -> DataApi {
        let base = Url::parse(&format!("{}/", server.base_url())).unwrap();
        DataApi::new(reqwest::Client::new(), base)
    }

    #[test]
    fn relays_text_and_json_error_bodies() {
        match upstream_error(StatusCode::BAD_REQUEST, "\"Incorrect password\"") {
            AppError::Upstream { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, json!("Incorrect password"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        match upstream_error(StatusCode::NOT_FOUND, "") {
            AppError::Upstream { body, .. } => assert_eq!(body, json!("Internal server error")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn lists_typed_rows() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/bookings");
                then.status(200).json_body(json!([{
                    "id": 1,
                    "propertyId": 2,
                    "name": "Ana",
                    "startDate": "2023-06-01",
                    "endDate": "2023-06-03",
                    "pricePerDay": "120"
                }]));
            })
            .await;

        let rows: Vec<Booking> = client(&server).list_rows("bookings").await.unwrap();
        mock.assert_async().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].property_id, 2);
        assert_eq!(rows[0].price_per_day, 120.0);
    }

    #[tokio::test]
    async fn maps_missing_rows_to_upstream_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/properties/9");
                then.status(404).json_body(json!({}));
            })
            .await;

        let error = client(&server)
            .get_row::<Value>("properties", 9)
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn refuses_unknown_resources() {
        let server = MockServer::start_async().await;
        let error = client(&server)
            .list_rows::<Value>("users")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn unreachable_store_is_a_dependency_error() {
        let api = DataApi::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:9/").unwrap(),
        );
        let error = api.list_rows::<Value>("bookings").await.unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
    }
}
