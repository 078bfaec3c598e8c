pub mod features;
pub mod health;
pub mod reports;
pub mod rows;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Protected routes
        .route("/features", get(features::list_features))
        // Reports
        .route("/admin/:feature/report", get(reports::get_report))
        .route("/admin/:feature/refresh", post(reports::refresh_report))
        // Row actions
        .route("/admin/:feature/rows", post(rows::create_row))
        .route(
            "/admin/:feature/rows/:id",
            put(rows::edit_row).delete(rows::delete_row),
        )
        .route("/admin/:feature/rows/:id/status", post(rows::set_row_status))
}
