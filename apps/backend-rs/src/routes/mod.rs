use axum::{routing::get, Router};

use crate::state::AppState;

pub mod auth;
pub mod bookings;
pub mod calendar;
pub mod health;
pub mod properties;
pub mod stats;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(auth::router())
        .merge(properties::router())
        .merge(bookings::router())
        .merge(calendar::router())
        .merge(stats::router())
}
