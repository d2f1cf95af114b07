use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::state::AppState;

use super::dto::ProductInput;
use super::repo_types::{CatalogProduct, NewProduct, Product};
use super::search;

pub struct ImageUpload {
    pub body: Bytes,
    pub content_type: String,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

fn validate_product(input: &ProductInput) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if input.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if input.description.trim().is_empty() {
        errors.push(FieldError::new("description", "Description is required"));
    }
    if input.category.trim().is_empty() {
        errors.push(FieldError::new("category", "Category is required"));
    }
    if input.price.is_sign_negative() {
        errors.push(FieldError::new("price", "Price must not be negative"));
    }
    errors
}

async fn upload_image(
    state: &AppState,
    owner_id: Uuid,
    image: ImageUpload,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("products/{}/{}.{}", owner_id, Uuid::new_v4(), ext);
    state
        .storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {key}"))?;
    Ok(key)
}

pub async fn create_product(
    state: &AppState,
    owner_id: Uuid,
    input: ProductInput,
    image: Option<ImageUpload>,
) -> Result<Product, ApiError> {
    let errors = validate_product(&input);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let image_key = match image {
        Some(img) => Some(upload_image(state, owner_id, img).await?),
        None => None,
    };

    let product = state
        .products
        .create(NewProduct {
            owner_id,
            name: input.name,
            description: input.description,
            price: input.price,
            category: input.category,
            production_date: input.production_date,
            image_key,
        })
        .await
        .map_err(ApiError::Persistence)?;

    info!(product_id = product.id, owner_id = %owner_id, "product created");
    Ok(product)
}

/// Loads a product and checks ownership; a product owned by someone else is
/// indistinguishable from a missing one.
async fn find_owned(state: &AppState, owner_id: Uuid, id: i64) -> Result<Product, ApiError> {
    let product = state
        .products
        .find(id)
        .await?
        .filter(|p| p.owner_id == owner_id)
        .ok_or(ApiError::NotFound("product"))?;
    Ok(product)
}

pub async fn update_product(
    state: &AppState,
    owner_id: Uuid,
    id: i64,
    input: ProductInput,
    image: Option<ImageUpload>,
) -> Result<Product, ApiError> {
    let mut product = find_owned(state, owner_id, id).await?;

    let errors = validate_product(&input);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let previous_key = product.image_key.clone();
    if let Some(img) = image {
        product.image_key = Some(upload_image(state, owner_id, img).await?);
    }

    product.name = input.name;
    product.description = input.description;
    product.price = input.price;
    product.category = input.category;
    product.production_date = input.production_date;

    state
        .products
        .update(&product)
        .await
        .map_err(ApiError::Persistence)?;

    // Only drop the old blob once the row points at the new one.
    if product.image_key != previous_key {
        if let Some(old) = previous_key {
            if let Err(e) = state.storage.delete_object(&old).await {
                warn!(key = %old, error = %e, "stale product image not deleted");
            }
        }
    }

    info!(product_id = product.id, owner_id = %owner_id, "product updated");
    Ok(product)
}

pub async fn delete_product(state: &AppState, owner_id: Uuid, id: i64) -> Result<(), ApiError> {
    let product = find_owned(state, owner_id, id).await?;

    if let Some(key) = &product.image_key {
        state
            .storage
            .delete_object(key)
            .await
            .with_context(|| format!("delete_object {key}"))?;
    }

    state
        .products
        .delete(product.id)
        .await
        .map_err(ApiError::Persistence)?;

    info!(product_id = id, owner_id = %owner_id, "product deleted");
    Ok(())
}

pub async fn own_products(state: &AppState, owner_id: Uuid) -> Result<Vec<Product>, ApiError> {
    let products = state.products.list_by_owner(owner_id).await?;
    Ok(products)
}

/// Catalog search: load everything with farmer names, filter in memory.
pub async fn search_catalog(
    state: &AppState,
    term: Option<&str>,
) -> Result<Vec<CatalogProduct>, ApiError> {
    let catalog = state.products.all_with_farmers().await?;
    Ok(search::filter_products(catalog, term))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use super::*;
    use crate::accounts::repo::AccountStore;
    use crate::accounts::repo_types::{AccountStatus, NewAccount};

    fn input(name: &str) -> ProductInput {
        ProductInput {
            name: name.into(),
            description: "Hand picked".into(),
            price: Decimal::new(1200, 2),
            category: "Fruit".into(),
            production_date: date!(2024 - 06 - 01),
        }
    }

    async fn seeded_farmer(state: &AppState, email: &str) -> Uuid {
        state
            .accounts
            .create(NewAccount {
                email: email.into(),
                password_hash: "x".into(),
                first_name: "Thandi".into(),
                last_name: "Mokoena".into(),
                phone: "0825550101".into(),
                status: AccountStatus::Active,
                registered_by: None,
            })
            .await
            .expect("account should be created")
            .id
    }

    #[tokio::test]
    async fn create_rejects_blank_fields() {
        let state = AppState::fake();
        let owner = seeded_farmer(&state, "t@farm.test").await;

        let mut bad = input("");
        bad.category = " ".into();
        let err = create_product(&state, owner, bad, None).await.unwrap_err();
        match err {
            ApiError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field).collect();
                assert!(names.contains(&"name"));
                assert!(names.contains(&"category"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_rejects_negative_price() {
        let state = AppState::fake();
        let owner = seeded_farmer(&state, "t@farm.test").await;

        let mut bad = input("Apples");
        bad.price = Decimal::new(-100, 2);
        let err = create_product(&state, owner, bad, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn create_with_image_stores_a_handle() {
        let state = AppState::fake();
        let owner = seeded_farmer(&state, "t@farm.test").await;

        let product = create_product(
            &state,
            owner,
            input("Apples"),
            Some(ImageUpload {
                body: Bytes::from_static(b"fake-jpeg"),
                content_type: "image/jpeg".into(),
            }),
        )
        .await
        .unwrap();

        let key = product.image_key.expect("image key should be set");
        assert!(key.starts_with(&format!("products/{owner}/")));
        assert!(key.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn update_is_owner_scoped() {
        let state = AppState::fake();
        let owner = seeded_farmer(&state, "owner@farm.test").await;
        let intruder = seeded_farmer(&state, "intruder@farm.test").await;

        let product = create_product(&state, owner, input("Apples"), None)
            .await
            .unwrap();

        let err = update_product(&state, intruder, product.id, input("Stolen"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let updated = update_product(&state, owner, product.id, input("Braeburn"), None)
            .await
            .unwrap();
        assert_eq!(updated.name, "Braeburn");
    }

    #[tokio::test]
    async fn delete_is_owner_scoped_and_removes_the_row() {
        let state = AppState::fake();
        let owner = seeded_farmer(&state, "owner@farm.test").await;
        let intruder = seeded_farmer(&state, "intruder@farm.test").await;

        let product = create_product(&state, owner, input("Apples"), None)
            .await
            .unwrap();

        let err = delete_product(&state, intruder, product.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        delete_product(&state, owner, product.id).await.unwrap();
        assert!(state.products.find(product.id).await.unwrap().is_none());
        assert!(own_products(&state, owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_catalog_sees_farmer_names() {
        let state = AppState::fake();
        let owner = seeded_farmer(&state, "thandi@farm.test").await;
        create_product(&state, owner, input("Apples"), None)
            .await
            .unwrap();
        create_product(&state, owner, input("Pears"), None)
            .await
            .unwrap();

        let all = search_catalog(&state, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let by_farmer = search_catalog(&state, Some("mokoena")).await.unwrap();
        assert_eq!(by_farmer.len(), 2);

        let by_name = search_catalog(&state, Some("pear")).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Pears");
    }
}
