use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod mem;
pub mod repo;
pub mod repo_types;
pub mod search;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::farmer_routes())
        .merge(handlers::catalog_routes())
}
