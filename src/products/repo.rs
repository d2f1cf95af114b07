use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{CatalogProduct, NewProduct, Product};

/// Product persistence seam. Postgres in production, in-memory in tests.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product>;
    async fn find(&self, id: i64) -> anyhow::Result<Option<Product>>;
    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Product>>;
    /// Whole catalog joined with farmer names; the search filter runs over
    /// this in memory.
    async fn all_with_farmers(&self) -> anyhow::Result<Vec<CatalogProduct>>;
    async fn update(&self, product: &Product) -> anyhow::Result<()>;
    async fn delete(&self, id: i64) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create(&self, new: NewProduct) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (owner_id, name, description, price, category,
                                  production_date, image_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            RETURNING id, owner_id, name, description, price, category,
                      production_date, image_key, created_at
            "#,
        )
        .bind(new.owner_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(&new.category)
        .bind(new.production_date)
        .bind(&new.image_key)
        .fetch_one(&self.db)
        .await
        .context("insert product")?;
        Ok(product)
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, owner_id, name, description, price, category,
                   production_date, image_key, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find product")?;
        Ok(product)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, owner_id, name, description, price, category,
                   production_date, image_key, created_at
            FROM products
            WHERE owner_id = $1
            ORDER BY production_date DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .context("list products by owner")?;
        Ok(products)
    }

    async fn all_with_farmers(&self) -> anyhow::Result<Vec<CatalogProduct>> {
        let products = sqlx::query_as::<_, CatalogProduct>(
            r#"
            SELECT p.id, p.owner_id, p.name, p.description, p.price, p.category,
                   p.production_date, p.image_key,
                   a.first_name AS farmer_first_name,
                   a.last_name  AS farmer_last_name
            FROM products p
            JOIN accounts a ON a.id = p.owner_id
            ORDER BY p.created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("load catalog")?;
        Ok(products)
    }

    async fn update(&self, product: &Product) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET name = $1, description = $2, price = $3, category = $4,
                production_date = $5, image_key = $6
            WHERE id = $7
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.category)
        .bind(product.production_date)
        .bind(&product.image_key)
        .bind(product.id)
        .execute(&self.db)
        .await
        .context("update product")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete product")?;
        Ok(())
    }
}
