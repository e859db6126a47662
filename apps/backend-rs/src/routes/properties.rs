use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;
use tokio::task::JoinSet;

use crate::{
    error::{AppError, AppResult},
    extract::{AppJson, AppPath},
    models::{Property, PropertyId},
    routes::bookings::load_bookings,
    schemas::PropertyInput,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/properties",
            axum::routing::get(list_properties).post(create_property),
        )
        .route(
            "/properties/{property_id}",
            axum::routing::get(get_property)
                .put(update_property)
                .delete(delete_property),
        )
}

#[derive(Debug, serde::Deserialize)]
pub struct PropertyPath {
    pub property_id: PropertyId,
}

async fn list_properties(State(state): State<AppState>) -> AppResult<Json<Vec<Property>>> {
    let mut properties: Vec<Property> = state.data_api.list_rows("properties").await?;
    sort_by_name(&mut properties);
    Ok(Json(properties))
}

async fn create_property(
    State(state): State<AppState>,
    AppJson(payload): AppJson<PropertyInput>,
) -> AppResult<impl IntoResponse> {
    let draft = payload.into_draft()?;
    let created: Property = state.data_api.create_row("properties", &draft).await?;

    tracing::info!(property_id = created.id, name = %created.name, "Property created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_property(
    State(state): State<AppState>,
    AppPath(path): AppPath<PropertyPath>,
) -> AppResult<Json<Property>> {
    let property = state
        .data_api
        .get_row("properties", path.property_id)
        .await?;
    Ok(Json(property))
}

async fn update_property(
    State(state): State<AppState>,
    AppPath(path): AppPath<PropertyPath>,
    AppJson(payload): AppJson<PropertyInput>,
) -> AppResult<Json<Property>> {
    let draft = payload.into_draft()?;
    let updated: Property = state
        .data_api
        .update_row("properties", path.property_id, &draft)
        .await?;

    tracing::info!(property_id = updated.id, "Property updated");
    Ok(Json(updated))
}

/// Deletes the property's bookings first so no booking is left pointing at a
/// missing property.
async fn delete_property(
    State(state): State<AppState>,
    AppPath(path): AppPath<PropertyPath>,
) -> AppResult<Json<Value>> {
    let booking_ids = load_bookings(&state)
        .await?
        .into_iter()
        .filter(|booking| booking.property_id == path.property_id)
        .map(|booking| booking.id)
        .collect::<Vec<_>>();

    let mut deletions = JoinSet::new();
    for booking_id in booking_ids {
        let data_api = state.data_api.clone();
        deletions.spawn(async move {
            data_api
                .delete_row("bookings", booking_id)
                .await
                .map(|_| booking_id)
        });
    }

    let mut removed = 0_usize;
    while let Some(joined) = deletions.join_next().await {
        let booking_id = joined
            .map_err(|error| AppError::Internal(format!("Booking cleanup task failed: {error}")))??;
        tracing::debug!(booking_id, property_id = path.property_id, "Removed booking of deleted property");
        removed += 1;
    }

    let response = state
        .data_api
        .delete_row("properties", path.property_id)
        .await?;
    state.invalidate_stats();

    tracing::info!(
        property_id = path.property_id,
        removed_bookings = removed,
        "Property deleted"
    );
    Ok(Json(response))
}

/// Case-insensitive name order, ties broken by the raw name.
fn sort_by_name(properties: &mut [Property]) {
    properties.sort_by(|left, right| {
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(|| left.name.cmp(&right.name))
    });
}
