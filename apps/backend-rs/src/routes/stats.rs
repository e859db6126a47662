use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    extract::{AppPath, AppQuery},
    routes::{bookings::property_bookings, properties::PropertyPath},
    schemas::MonthQuery,
    services::{calendar::start_of_month, revenue::property_stats},
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route(
        "/properties/{property_id}/stats",
        axum::routing::get(property_stats_report),
    )
}

async fn property_stats_report(
    State(state): State<AppState>,
    AppPath(path): AppPath<PropertyPath>,
    AppQuery(query): AppQuery<MonthQuery>,
) -> AppResult<Json<Value>> {
    let today = state.config.today();
    let selected_month = start_of_month(query.reference_or(today)?);

    let cache_key = state.stats_cache_key(path.property_id, today, selected_month);
    if let Some(cached) = state.stats_cache.get(&cache_key).await {
        tracing::debug!(property_id = path.property_id, "Stats served from cache");
        return Ok(Json(cached));
    }

    let bookings = property_bookings(&state, path.property_id).await?;
    let stats = property_stats(path.property_id, today, selected_month, &bookings);
    let payload = serde_json::to_value(&stats)
        .map_err(|error| AppError::Internal(format!("Could not encode stats: {error}")))?;

    state.stats_cache.insert(cache_key, payload.clone()).await;
    Ok(Json(payload))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{send, state_for};
    use axum::http::{Method, StatusCode};
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn reports_selected_month_and_caches() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/bookings");
                then.status(200).json_body(json!([
                    { "id": 1, "propertyId": 1, "name": "Ana", "startDate": "2023-05-30", "endDate": "2023-06-02", "pricePerDay": "100" },
                    { "id": 2, "propertyId": 1, "name": "Luis", "startDate": "2023-06-10", "endDate": "2023-06-14", "pricePerDay": "200" },
                    { "id": 3, "propertyId": 1, "name": "Eva", "startDate": "2023-05-01", "endDate": "2023-05-02", "pricePerDay": "100" },
                    { "id": 4, "propertyId": 2, "name": "Noa", "startDate": "2023-06-01", "endDate": "2023-06-30", "pricePerDay": "500" }
                ]));
            })
            .await;
        let state = state_for(&server);

        let (status, body) = send(
            &state,
            Method::GET,
            "/properties/1/stats?month=2023-06-15",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selectedMonth"], "2023-06-01");
        assert_eq!(body["selectedMonthLabel"], "June 2023");
        assert_eq!(body["selectedMonthRevenue"]["current"], 1200.0);
        assert_eq!(body["selectedMonthRevenue"]["previous"], 400.0);
        assert_eq!(body["selectedMonthRevenue"]["change"], "200.00%");

        let (status, _) = send(
            &state,
            Method::GET,
            "/properties/1/stats?month=2023-06-01",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        list.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn late_insert_from_before_a_write_is_not_served() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/bookings");
                then.status(200).json_body(json!([
                    { "id": 1, "propertyId": 1, "name": "Ana", "startDate": "2023-06-10", "endDate": "2023-06-11", "pricePerDay": "100" }
                ]));
            })
            .await;
        let state = state_for(&server);
        let today = state.config.today();
        let month = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();

        // A slow request takes its key, a write lands, then it stores its figures.
        let stale_key = state.stats_cache_key(1, today, month);
        state.invalidate_stats();
        state
            .stats_cache
            .insert(stale_key, json!({ "selectedMonthRevenue": { "current": 0.0 } }))
            .await;

        let (status, body) = send(
            &state,
            Method::GET,
            "/properties/1/stats?month=2023-06-01",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selectedMonthRevenue"]["current"], 200.0);
        list.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn store_errors_are_relayed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/bookings");
                then.status(503).body("down");
            })
            .await;

        let (status, body) = send(&state_for(&server), Method::GET, "/properties/1/stats", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "down");
    }
}
