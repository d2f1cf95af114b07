use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::accounts::repo::AccountStore;

use super::repo::ProductStore;
use super::repo_types::{CatalogProduct, NewProduct, Product};

/// In-memory product store; resolves farmer names for the catalog through
/// the account store, like the SQL join does.
pub struct MemoryProductStore {
    accounts: Arc<dyn AccountStore>,
    products: Mutex<Vec<Product>>,
    next_id: AtomicI64,
}

impl MemoryProductStore {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            accounts,
            products: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product> {
        let product = Product {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            owner_id: new.owner_id,
            name: new.name,
            description: new.description,
            price: new.price,
            category: new.category,
            production_date: new.production_date,
            image_key: new.image_key,
            created_at: OffsetDateTime::now_utc(),
        };
        self.products.lock().await.push(product.clone());
        Ok(product)
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Product>> {
        let products = self.products.lock().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let products = self.products.lock().await;
        let mut out: Vec<Product> = products
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.production_date.cmp(&a.production_date));
        Ok(out)
    }

    async fn all_with_farmers(&self) -> anyhow::Result<Vec<CatalogProduct>> {
        let products = self.products.lock().await.clone();
        let mut out = Vec::with_capacity(products.len());
        for p in products {
            let Some(owner) = self.accounts.find_by_id(p.owner_id).await? else {
                continue;
            };
            out.push(CatalogProduct {
                id: p.id,
                owner_id: p.owner_id,
                name: p.name,
                description: p.description,
                price: p.price,
                category: p.category,
                production_date: p.production_date,
                image_key: p.image_key,
                farmer_first_name: owner.first_name,
                farmer_last_name: owner.last_name,
            });
        }
        Ok(out)
    }

    async fn update(&self, product: &Product) -> anyhow::Result<()> {
        let mut products = self.products.lock().await;
        if let Some(existing) = products.iter_mut().find(|p| p.id == product.id) {
            *existing = product.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<()> {
        self.products.lock().await.retain(|p| p.id != id);
        Ok(())
    }
}
