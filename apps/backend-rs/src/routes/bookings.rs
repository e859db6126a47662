use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    models::{Booking, BookingDraft, BookingId, PropertyId},
    schemas::{BookingInput, BookingsQuery},
    services::overlap::conflicting_bookings,
    state::AppState,
};

const OVERLAP_MESSAGE: &str = "The selected dates overlap with an existing booking.";

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/bookings",
            axum::routing::get(list_bookings).post(create_booking),
        )
        .route(
            "/bookings/{booking_id}",
            axum::routing::get(get_booking)
                .put(update_booking)
                .delete(delete_booking),
        )
}

#[derive(Debug, serde::Deserialize)]
pub struct BookingPath {
    pub booking_id: BookingId,
}

/// Every booking in the store. Rows that do not parse are skipped so one bad
/// record cannot take the dashboard down.
pub(crate) async fn load_bookings(state: &AppState) -> AppResult<Vec<Booking>> {
    let rows: Vec<Value> = state.data_api.list_rows("bookings").await?;
    let total = rows.len();
    let bookings = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<Booking>(row.clone()) {
            Ok(booking) => Some(booking),
            Err(error) => {
                tracing::warn!(row = %row, error = %error, "Skipping malformed booking row");
                None
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(total, parsed = bookings.len(), "Loaded bookings");
    Ok(bookings)
}

pub(crate) async fn property_bookings(
    state: &AppState,
    property_id: PropertyId,
) -> AppResult<Vec<Booking>> {
    let mut bookings = load_bookings(state).await?;
    bookings.retain(|booking| booking.property_id == property_id);
    Ok(bookings)
}

async fn list_bookings(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<BookingsQuery>,
) -> AppResult<Json<Vec<Booking>>> {
    let bookings = match query.property_id {
        Some(property_id) => property_bookings(&state, property_id).await?,
        None => load_bookings(&state).await?,
    };
    Ok(Json(bookings))
}

async fn create_booking(
    State(state): State<AppState>,
    AppJson(payload): AppJson<BookingInput>,
) -> AppResult<impl IntoResponse> {
    let draft = payload.into_draft()?;
    ensure_available(&state, &draft, None).await?;

    let created: Booking = state.data_api.create_row("bookings", &draft).await?;
    state.invalidate_stats();

    tracing::info!(
        booking_id = created.id,
        property_id = created.property_id,
        start_date = %created.start_date,
        end_date = %created.end_date,
        "Booking created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_booking(
    State(state): State<AppState>,
    AppPath(path): AppPath<BookingPath>,
) -> AppResult<Json<Booking>> {
    let booking = state.data_api.get_row("bookings", path.booking_id).await?;
    Ok(Json(booking))
}

async fn update_booking(
    State(state): State<AppState>,
    AppPath(path): AppPath<BookingPath>,
    AppJson(payload): AppJson<BookingInput>,
) -> AppResult<Json<Booking>> {
    let draft = payload.into_draft()?;
    ensure_available(&state, &draft, Some(path.booking_id)).await?;

    let updated: Booking = state
        .data_api
        .update_row("bookings", path.booking_id, &draft)
        .await?;
    state.invalidate_stats();

    tracing::info!(booking_id = updated.id, "Booking updated");
    Ok(Json(updated))
}

async fn delete_booking(
    State(state): State<AppState>,
    AppPath(path): AppPath<BookingPath>,
) -> AppResult<Json<Value>> {
    let response = state
        .data_api
        .delete_row("bookings", path.booking_id)
        .await?;
    state.invalidate_stats();

    tracing::info!(booking_id = path.booking_id, "Booking deleted");
    Ok(Json(response))
}

async fn ensure_available(
    state: &AppState,
    draft: &BookingDraft,
    exclude_booking_id: Option<BookingId>,
) -> AppResult<()> {
    let bookings = load_bookings(state).await?;
    let conflicts = conflicting_bookings(
        draft.range(),
        draft.property_id,
        exclude_booking_id,
        &bookings,
    )
    .map(|booking| booking.id)
    .collect::<Vec<_>>();

    if conflicts.is_empty() {
        return Ok(());
    }
    tracing::info!(
        property_id = draft.property_id,
        conflicts = ?conflicts,
        "Rejected overlapping booking"
    );
    Err(AppError::Conflict(OVERLAP_MESSAGE.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{send, send_raw, state_for};
    use axum::http::{Method, StatusCode};
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    fn existing_bookings() -> Value {
        json!([
            { "id": 1, "propertyId": 1, "name": "Ana", "startDate": "2023-07-10", "endDate": "2023-07-12", "pricePerDay": "100" },
            { "id": 2, "propertyId": 2, "name": "Luis", "startDate": "2023-07-01", "endDate": "2023-07-31", "pricePerDay": 80 },
            { "id": 3, "propertyId": 1, "name": "broken", "startDate": "someday", "endDate": "2023-07-12", "pricePerDay": "100" }
        ])
    }

    async fn mock_existing(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/bookings");
                then.status(200).json_body(existing_bookings());
            })
            .await;
    }

    #[tokio::test]
    async fn lists_bookings_for_a_property() {
        let server = MockServer::start_async().await;
        mock_existing(&server).await;

        let (status, body) = send(
            &state_for(&server),
            Method::GET,
            "/bookings?propertyId=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], 1);
        assert_eq!(rows[0]["pricePerDay"], "100");
    }

    #[tokio::test]
    async fn creates_a_free_booking() {
        let server = MockServer::start_async().await;
        mock_existing(&server).await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/bookings").json_body(json!({
                    "propertyId": 1,
                    "name": "Eva",
                    "startDate": "2023-07-13",
                    "endDate": "2023-07-15",
                    "pricePerDay": "90"
                }));
                then.status(201).json_body(json!({
                    "id": 4,
                    "propertyId": 1,
                    "name": "Eva",
                    "startDate": "2023-07-13",
                    "endDate": "2023-07-15",
                    "pricePerDay": "90"
                }));
            })
            .await;

        let (status, body) = send(
            &state_for(&server),
            Method::POST,
            "/bookings",
            Some(json!({
                "name": "Eva",
                "propertyId": "1",
                "startDate": "2023-07-13",
                "endDate": "2023-07-15",
                "pricePerDay": "90"
            })),
        )
        .await;
        create.assert_async().await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 4);
    }

    #[tokio::test]
    async fn rejects_touching_stays() {
        let server = MockServer::start_async().await;
        mock_existing(&server).await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/bookings");
                then.status(201).json_body(json!({}));
            })
            .await;

        let (status, body) = send(
            &state_for(&server),
            Method::POST,
            "/bookings",
            Some(json!({
                "name": "Eva",
                "propertyId": 1,
                "startDate": "2023-07-12",
                "endDate": "2023-07-14",
                "pricePerDay": 90
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], super::OVERLAP_MESSAGE);
        create.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn update_ignores_the_booking_itself() {
        let server = MockServer::start_async().await;
        mock_existing(&server).await;
        let update = server
            .mock_async(|when, then| {
                when.method(PUT).path("/bookings/1");
                then.status(200).json_body(json!({
                    "id": 1,
                    "propertyId": 1,
                    "name": "Ana",
                    "startDate": "2023-07-11",
                    "endDate": "2023-07-13",
                    "pricePerDay": "100"
                }));
            })
            .await;

        let (status, body) = send(
            &state_for(&server),
            Method::PUT,
            "/bookings/1",
            Some(json!({
                "name": "Ana",
                "propertyId": 1,
                "startDate": "2023-07-11",
                "endDate": "2023-07-13",
                "pricePerDay": "100"
            })),
        )
        .await;
        update.assert_async().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endDate"], "2023-07-13");
    }

    #[tokio::test]
    async fn missing_fields_and_bad_dates_are_bad_requests() {
        let server = MockServer::start_async().await;
        let state = state_for(&server);

        let (status, body) = send(
            &state,
            Method::POST,
            "/bookings",
            Some(json!({ "name": "Eva", "propertyId": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "name, propertyId, startDate, endDate, and pricePerDay are required"
        );

        let (status, body) = send(
            &state,
            Method::POST,
            "/bookings",
            Some(json!({
                "name": "Eva",
                "propertyId": 1,
                "startDate": "13/07/2023",
                "endDate": "2023-07-15",
                "pricePerDay": 90
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid date format");
    }

    #[tokio::test]
    async fn delete_passes_through_store_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/bookings/99");
                then.status(404).json_body(json!({}));
            })
            .await;

        let (status, _) = send(&state_for(&server), Method::DELETE, "/bookings/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_json_gets_a_json_error() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/bookings");
                then.status(201).json_body(json!({}));
            })
            .await;

        let (status, body) = send_raw(
            &state_for(&server),
            Method::POST,
            "/bookings",
            r#"{"name": "Eva", "propertyId": 1,"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().is_some_and(|message| !message.is_empty()));
        create.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn non_numeric_ids_get_json_errors() {
        let server = MockServer::start_async().await;
        let state = state_for(&server);

        let (status, body) = send(&state, Method::GET, "/bookings/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, body) = send(&state, Method::GET, "/bookings?propertyId=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }
}
