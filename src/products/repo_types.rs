use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Product record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub production_date: Date,
    /// Opaque blob-store handle; None when no image was uploaded.
    pub image_key: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Input for creating a product; the store assigns id and created_at.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub production_date: Date,
    pub image_key: Option<String>,
}

/// Catalog row: product joined with its owning farmer's display name.
/// This is what the search filter runs over.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CatalogProduct {
    pub id: i64,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub production_date: Date,
    pub image_key: Option<String>,
    pub farmer_first_name: String,
    pub farmer_last_name: String,
}
