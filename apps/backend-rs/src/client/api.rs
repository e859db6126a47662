use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::{
    client::error::{ClientError, ClientResult},
    models::{Booking, BookingDraft, BookingId, Property, PropertyDraft, PropertyId},
};

/// Body returned by `POST /sign-in`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: Value,
}

/// Typed client for the staydesk backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("staydesk-cli/1.0")
            .build()?;

        let mut raw = base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }

        Ok(Self {
            http,
            base_url: Url::parse(&raw)?,
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|value| !value.trim().is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        let body = json!({ "email": email, "password": password });
        self.send(Method::POST, "sign-in", Some(&body)).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> ClientResult<Value> {
        let body = json!({ "email": email, "password": password });
        self.send(Method::POST, "sign-up", Some(&body)).await
    }

    pub async fn list_properties(&self) -> ClientResult<Vec<Property>> {
        self.send(Method::GET, "properties", None::<&()>).await
    }

    pub async fn get_property(&self, property_id: PropertyId) -> ClientResult<Property> {
        self.send(Method::GET, &format!("properties/{property_id}"), None::<&()>)
            .await
    }

    pub async fn create_property(&self, draft: &PropertyDraft) -> ClientResult<Property> {
        self.send(Method::POST, "properties", Some(draft)).await
    }

    pub async fn update_property(
        &self,
        property_id: PropertyId,
        draft: &PropertyDraft,
    ) -> ClientResult<Property> {
        self.send(Method::PUT, &format!("properties/{property_id}"), Some(draft))
            .await
    }

    pub async fn delete_property(&self, property_id: PropertyId) -> ClientResult<()> {
        self.send::<Value, ()>(Method::DELETE, &format!("properties/{property_id}"), None)
            .await
            .map(|_| ())
    }

    pub async fn list_bookings(&self, property_id: Option<PropertyId>) -> ClientResult<Vec<Booking>> {
        let path = match property_id {
            Some(id) => format!("bookings?propertyId={id}"),
            None => "bookings".to_string(),
        };
        self.send(Method::GET, &path, None::<&()>).await
    }

    pub async fn get_booking(&self, booking_id: BookingId) -> ClientResult<Booking> {
        self.send(Method::GET, &format!("bookings/{booking_id}"), None::<&()>)
            .await
    }

    pub async fn create_booking(&self, draft: &BookingDraft) -> ClientResult<Booking> {
        self.send(Method::POST, "bookings", Some(draft)).await
    }

    pub async fn update_booking(
        &self,
        booking_id: BookingId,
        draft: &BookingDraft,
    ) -> ClientResult<Booking> {
        self.send(Method::PUT, &format!("bookings/{booking_id}"), Some(draft))
            .await
    }

    pub async fn delete_booking(&self, booking_id: BookingId) -> ClientResult<()> {
        self.send::<Value, ()>(Method::DELETE, &format!("bookings/{booking_id}"), None)
            .await
            .map(|_| ())
    }

    pub async fn calendar(
        &self,
        property_id: PropertyId,
        month: Option<NaiveDate>,
    ) -> ClientResult<Value> {
        self.send(
            Method::GET,
            &with_month(&format!("properties/{property_id}/calendar"), month),
            None::<&()>,
        )
        .await
    }

    pub async fn stats(&self, property_id: PropertyId, month: Option<NaiveDate>) -> ClientResult<Value> {
        self.send(
            Method::GET,
            &with_month(&format!("properties/{property_id}/stats"), month),
            None::<&()>,
        )
        .await
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.base_url.join(path)?;
        tracing::debug!(method = %method, url = %url, "Calling backend");

        let mut request = self.http.request(method, url);
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = self.authorize(request).send().await?;
        read_json(response).await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn with_month(path: &str, month: Option<NaiveDate>) -> String {
    match month {
        Some(day) => format!("{path}?month={}", day.format("%Y-%m-%d")),
        None => path.to_string(),
    }
}

async fn read_json<T>(response: Response) -> ClientResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), body = %text, "Backend request failed");
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }
    let payload = if text.trim().is_empty() { "null" } else { text.as_str() };
    Ok(serde_json::from_str(payload)?)
}

/// Pulls `message` out of the backend's error body; store errors may nest it
/// one level deeper or be a bare string.
fn error_message(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(body)) => match body.get("message") {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Object(nested)) => nested
                .get("message")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| Value::Object(nested.clone()).to_string()),
            Some(other) => other.to_string(),
            None => Value::Object(body).to_string(),
        },
        Ok(Value::String(message)) => message,
        _ if text.trim().is_empty() => "An unexpected error occurred".to_string(),
        _ => text.trim().to_string(),
    }
}
