use axum::Router;

use crate::state::AppState;

pub mod assignments;
pub mod doc;
pub mod health;
pub mod params;
pub mod payments;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/payments", payments::router())
        .nest("/assignments", assignments::router())
        .nest("/orders", payments::orders_router())
}
