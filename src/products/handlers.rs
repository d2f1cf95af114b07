use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use rust_decimal::Decimal;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;
use tracing::instrument;

use crate::accounts::repo_types::Role;
use crate::accounts::services::require_role;
use crate::auth::jwt::AuthUser;
use crate::error::{ApiError, FieldError};
use crate::state::AppState;

use super::dto::{CatalogItem, CatalogQuery, ProductInput, ProductResponse};
use super::services::{self, ImageUpload};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn farmer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/farmer/products",
            get(list_own_products).post(create_product),
        )
        .route(
            "/farmer/products/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/employee/products", get(search_catalog))
        .route("/products/:id/image", get(get_product_image))
}

// --- multipart form ---

#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    category: Option<String>,
    production_date: Option<String>,
    image: Option<ImageUpload>,
}

async fn read_product_form(mut mp: Multipart) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();
    while let Ok(Some(field)) = mp.next_field().await {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data: Bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("unreadable image upload"))?;
                if !data.is_empty() {
                    form.image = Some(ImageUpload {
                        body: data,
                        content_type,
                    });
                }
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("unreadable form field"))?;
                match other {
                    "name" => form.name = Some(value),
                    "description" => form.description = Some(value),
                    "price" => form.price = Some(value),
                    "category" => form.category = Some(value),
                    "production_date" => form.production_date = Some(value),
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

fn parse_product_form(form: ProductForm) -> Result<(ProductInput, Option<ImageUpload>), ApiError> {
    let mut errors = Vec::new();

    let price = match form.price.as_deref().map(str::parse::<Decimal>) {
        Some(Ok(p)) => Some(p),
        Some(Err(_)) => {
            errors.push(FieldError::new("price", "Invalid price"));
            None
        }
        None => {
            errors.push(FieldError::new("price", "Price is required"));
            None
        }
    };
    let production_date = match form
        .production_date
        .as_deref()
        .map(|s| Date::parse(s, DATE_FORMAT))
    {
        Some(Ok(d)) => Some(d),
        Some(Err(_)) => {
            errors.push(FieldError::new(
                "production_date",
                "Invalid production date, expected YYYY-MM-DD",
            ));
            None
        }
        None => {
            errors.push(FieldError::new(
                "production_date",
                "Production date is required",
            ));
            None
        }
    };

    let (Some(price), Some(production_date)) = (price, production_date) else {
        return Err(ApiError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let input = ProductInput {
        name: form.name.unwrap_or_default(),
        description: form.description.unwrap_or_default(),
        price,
        production_date,
        category: form.category.unwrap_or_default(),
    };
    Ok((input, form.image))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_own_products(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    require_role(&state, account_id, Role::Farmer).await?;
    let products = services::own_products(&state, account_id).await?;
    Ok(Json(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    require_role(&state, account_id, Role::Farmer).await?;
    let (input, image) = parse_product_form(read_product_form(mp).await?)?;
    let product = services::create_product(&state, account_id, input, image).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

#[instrument(skip(state, mp))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
    Path(id): Path<i64>,
    mp: Multipart,
) -> Result<Json<ProductResponse>, ApiError> {
    require_role(&state, account_id, Role::Farmer).await?;
    let (input, image) = parse_product_form(read_product_form(mp).await?)?;
    let product = services::update_product(&state, account_id, id, input, image).await?;
    Ok(Json(product.into()))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_role(&state, account_id, Role::Farmer).await?;
    services::delete_product(&state, account_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn search_catalog(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
    Query(q): Query<CatalogQuery>,
) -> Result<Json<Vec<CatalogItem>>, ApiError> {
    require_role(&state, account_id, Role::Employee).await?;
    let catalog = services::search_catalog(&state, q.search_term.as_deref()).await?;
    Ok(Json(catalog.into_iter().map(CatalogItem::from).collect()))
}

/// 302 to a presigned URL for the product image.
#[instrument(skip(state))]
pub async fn get_product_image(
    State(state): State<AppState>,
    AuthUser(_account_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .products
        .find(id)
        .await?
        .ok_or(ApiError::NotFound("product"))?;
    let key = product.image_key.ok_or(ApiError::NotFound("image"))?;
    let url = state.storage.presign_get(&key, 600).await?;
    Ok(Redirect::temporary(&url))
}
