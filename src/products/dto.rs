use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{CatalogProduct, Product};

/// Validated product fields common to create and update.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub production_date: Date,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub production_date: Date,
    pub has_image: bool,
    pub created_at: OffsetDateTime,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            category: p.category,
            production_date: p.production_date,
            has_image: p.image_key.is_some(),
            created_at: p.created_at,
        }
    }
}

/// Catalog row as shown to employees browsing/searching products.
#[derive(Debug, Serialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub production_date: Date,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub has_image: bool,
}

impl From<CatalogProduct> for CatalogItem {
    fn from(p: CatalogProduct) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            category: p.category,
            production_date: p.production_date,
            farmer_id: p.owner_id,
            farmer_name: format!("{} {}", p.farmer_first_name, p.farmer_last_name),
            has_image: p.image_key.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub search_term: Option<String>,
}
