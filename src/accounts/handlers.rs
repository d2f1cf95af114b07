use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::jwt::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{ActivateFarmerRequest, FarmerSummary, OnboardFarmerRequest};
use super::repo_types::Role;
use super::services;

pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/employee/farmers", get(list_farmers).post(onboard_farmer))
        .route("/employee/farmers/activate", post(activate_farmer))
}

#[instrument(skip(state, payload))]
pub async fn onboard_farmer(
    State(state): State<AppState>,
    AuthUser(employee_id): AuthUser,
    Json(payload): Json<OnboardFarmerRequest>,
) -> Result<(StatusCode, Json<FarmerSummary>), ApiError> {
    services::require_role(&state, employee_id, Role::Employee).await?;
    let account = services::onboard_farmer(&state, employee_id, payload).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

#[instrument(skip(state))]
pub async fn list_farmers(
    State(state): State<AppState>,
    AuthUser(employee_id): AuthUser,
) -> Result<Json<Vec<FarmerSummary>>, ApiError> {
    services::require_role(&state, employee_id, Role::Employee).await?;
    let farmers = services::list_farmers(&state, employee_id).await?;
    Ok(Json(farmers.into_iter().map(FarmerSummary::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn activate_farmer(
    State(state): State<AppState>,
    AuthUser(employee_id): AuthUser,
    Json(payload): Json<ActivateFarmerRequest>,
) -> Result<Json<FarmerSummary>, ApiError> {
    services::require_role(&state, employee_id, Role::Employee).await?;
    let account = services::activate_farmer(&state, &payload.email).await?;
    Ok(Json(account.into()))
}
