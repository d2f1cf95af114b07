use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    accounts::{
        repo::CreateAccountError,
        repo_types::{Account, AccountStatus, NewAccount, Role},
        services::{is_valid_email, is_valid_phone},
    },
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
    },
    error::{ApiError, FieldError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn public_user(account: &Account, roles: Vec<Role>) -> PublicUser {
    PublicUser {
        id: account.id,
        email: account.email.clone(),
        first_name: account.first_name.clone(),
        last_name: account.last_name.clone(),
        roles,
    }
}

fn token_pair(keys: &JwtKeys, account_id: Uuid) -> Result<(String, String), ApiError> {
    let access = keys.sign_access(account_id)?;
    let refresh = keys.sign_refresh(account_id)?;
    Ok((access, refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if payload.first_name.trim().is_empty() {
        errors.push(FieldError::new("first_name", "First name is required"));
    }
    if payload.last_name.trim().is_empty() {
        errors.push(FieldError::new("last_name", "Last name is required"));
    }
    if !is_valid_email(&payload.email) {
        errors.push(FieldError::new("email", "Invalid email address"));
    }
    if !is_valid_phone(&payload.phone) {
        errors.push(FieldError::new("phone", "Invalid phone number"));
    }
    if payload.password.len() < 8 {
        errors.push(FieldError::new("password", "Password too short"));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_password(&payload.password)?;

    // Self-registered accounts start Active; only employee-onboarded
    // farmers go through the Pending gate.
    let account = state
        .accounts
        .create(NewAccount {
            email: payload.email,
            password_hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            status: AccountStatus::Active,
            registered_by: None,
        })
        .await
        .map_err(|e| match e {
            CreateAccountError::DuplicateEmail => {
                ApiError::field("email", "email already registered")
            }
            CreateAccountError::Other(e) => ApiError::Persistence(e),
        })?;

    if let Err(e) = state.roles.grant(account.id, payload.role).await {
        warn!(account_id = %account.id, error = %e, "role grant failed during registration");
    }
    let roles = state.roles.roles_of(account.id).await?;

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = token_pair(&keys, account.id)?;

    info!(account_id = %account.id, email = %account.email, "account registered");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&account, roles),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::bad_request("Invalid email"));
    }

    let account = match state.accounts.find_by_email(&payload.email).await? {
        Some(a) => a,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    };

    if !verify_password(&payload.password, &account.password_hash)? {
        warn!(email = %payload.email, account_id = %account.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let roles = state.roles.roles_of(account.id).await?;

    // FarmerLifecycle gate: an onboarded farmer cannot log in until an
    // employee activates the account.
    if roles.contains(&Role::Farmer) && account.status == AccountStatus::Pending {
        warn!(account_id = %account.id, "login rejected, account pending activation");
        return Err(ApiError::Forbidden("Account pending activation"));
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = token_pair(&keys, account.id)?;

    info!(account_id = %account.id, email = %account.email, "logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&account, roles),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let account = state
        .accounts
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account not found".into()))?;
    let roles = state.roles.roles_of(account.id).await?;

    let (access_token, refresh_token) = token_pair(&keys, account.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&account, roles),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let account = state
        .accounts
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account not found".into()))?;
    let roles = state.roles.roles_of(account.id).await?;
    Ok(Json(public_user(&account, roles)))
}
