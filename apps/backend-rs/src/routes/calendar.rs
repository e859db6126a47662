use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    extract::{AppPath, AppQuery},
    routes::{bookings::property_bookings, properties::PropertyPath},
    schemas::{AvailabilityQuery, MonthQuery},
    services::{
        calendar::{calendar_days, month_window},
        overlap::conflicting_bookings,
        revenue::quote_total,
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/properties/{property_id}/calendar",
            axum::routing::get(property_calendar),
        )
        .route(
            "/properties/{property_id}/availability",
            axum::routing::get(property_availability),
        )
}

async fn property_calendar(
    State(state): State<AppState>,
    AppPath(path): AppPath<PropertyPath>,
    AppQuery(query): AppQuery<MonthQuery>,
) -> AppResult<Json<Value>> {
    let today = state.config.today();
    let reference = query.reference_or(today)?;
    let bookings = property_bookings(&state, path.property_id).await?;

    let month = month_window(reference);
    let weeks = calendar_days(reference, today, &bookings)
        .chunks(7)
        .map(<[_]>::to_vec)
        .collect::<Vec<_>>();
    let visible = bookings
        .iter()
        .filter(|booking| booking.range().overlaps(&month))
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "propertyId": path.property_id,
        "month": month.start,
        "label": month.start.format("%B %Y").to_string(),
        "today": today,
        "weeks": weeks,
        "bookings": visible,
    })))
}

async fn property_availability(
    State(state): State<AppState>,
    AppPath(path): AppPath<PropertyPath>,
    AppQuery(query): AppQuery<AvailabilityQuery>,
) -> AppResult<Json<Value>> {
    let range = query.range()?;
    let bookings = property_bookings(&state, path.property_id).await?;
    let conflicts = conflicting_bookings(
        range,
        path.property_id,
        query.exclude_booking_id,
        &bookings,
    )
    .collect::<Vec<_>>();

    let total_price = query
        .price_per_day
        .filter(|price| *price > 0.0)
        .map(|price| quote_total(range, price));

    Ok(Json(json!({
        "propertyId": path.property_id,
        "start": range.start,
        "end": range.end,
        "days": range.days(),
        "available": conflicts.is_empty(),
        "conflicts": conflicts,
        "totalPrice": total_price,
    })))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{send, state_for};
    use axum::http::{Method, StatusCode};
    use httpmock::prelude::*;
    use serde_json::json;

    async fn mock_bookings(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/bookings");
                then.status(200).json_body(json!([
                    { "id": 1, "propertyId": 1, "name": "Ana", "startDate": "2023-07-10", "endDate": "2023-07-12", "pricePerDay": "100" },
                    { "id": 2, "propertyId": 1, "name": "Luis", "startDate": "2023-08-20", "endDate": "2023-08-22", "pricePerDay": "100" },
                    { "id": 3, "propertyId": 2, "name": "Eva", "startDate": "2023-07-10", "endDate": "2023-07-12", "pricePerDay": "100" }
                ]));
            })
            .await;
    }

    #[tokio::test]
    async fn renders_month_weeks() {
        let server = MockServer::start_async().await;
        mock_bookings(&server).await;

        let (status, body) = send(
            &state_for(&server),
            Method::GET,
            "/properties/1/calendar?month=2023-07-15",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["month"], "2023-07-01");
        assert_eq!(body["label"], "July 2023");

        let weeks = body["weeks"].as_array().unwrap();
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[0][0]["date"], "2023-06-25");
        assert_eq!(weeks[0][0]["inMonth"], false);
        assert_eq!(weeks[2][1]["date"], "2023-07-10");
        assert_eq!(weeks[2][1]["bookingIds"], json!([1]));

        let visible = body["bookings"].as_array().unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0]["id"], 1);
    }

    #[tokio::test]
    async fn rejects_unparseable_month() {
        let server = MockServer::start_async().await;
        let (status, body) = send(
            &state_for(&server),
            Method::GET,
            "/properties/1/calendar?month=July",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid date format");
    }

    #[tokio::test]
    async fn rejects_extended_year_month() {
        let server = MockServer::start_async().await;
        let (status, body) = send(
            &state_for(&server),
            Method::GET,
            "/properties/1/calendar?month=%2B262142-12-15",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid date format");
    }

    #[tokio::test]
    async fn reports_conflicts_and_quote() {
        let server = MockServer::start_async().await;
        mock_bookings(&server).await;
        let state = state_for(&server);

        let (status, body) = send(
            &state,
            Method::GET,
            "/properties/1/availability?start=2023-07-12&end=2023-07-14&pricePerDay=50",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], false);
        assert_eq!(body["conflicts"][0]["id"], 1);
        assert_eq!(body["days"], 3);
        assert_eq!(body["totalPrice"], 150.0);

        let (_, body) = send(
            &state,
            Method::GET,
            "/properties/1/availability?start=2023-07-12&end=2023-07-14&excludeBookingId=1",
            None,
        )
        .await;
        assert_eq!(body["available"], true);
        assert_eq!(body["totalPrice"], json!(null));
    }

    #[tokio::test]
    async fn inverted_range_is_a_bad_request() {
        let server = MockServer::start_async().await;
        let (status, _) = send(
            &state_for(&server),
            Method::GET,
            "/properties/1/availability?start=2023-07-14&end=2023-07-12",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
