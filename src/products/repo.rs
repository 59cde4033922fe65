use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::dto::{CategoryCount, NewProduct, ProductUpdate, RecentProduct};
use super::model::Product;

pub(super) const PRODUCT_COLUMNS: &str =
    "id, name, description, price, original_price, category, subcategory, brand, model, sku, \
     images, specifications, stock, is_active, is_featured, rating_average, rating_count, \
     tags, weight, dimensions, warranty, created_by, updated_by, created_at, updated_at";

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn sku_exists(db: &PgPool, sku: &str) -> anyhow::Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE sku = $1)")
            .bind(sku)
            .fetch_one(db)
            .await?;
    Ok(exists)
}

/// SKU uniqueness is backstopped by the store constraint; callers map the
/// violation to a duplicate-SKU error.
pub async fn insert(
    db: &PgPool,
    product: NewProduct,
    created_by: Uuid,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products \
           (name, description, price, original_price, category, subcategory, brand, model, \
            sku, images, specifications, stock, is_featured, tags, weight, dimensions, \
            warranty, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.original_price)
    .bind(product.category)
    .bind(product.subcategory)
    .bind(product.brand)
    .bind(product.model)
    .bind(product.sku)
    .bind(Json(product.images))
    .bind(Json(product.specifications))
    .bind(product.stock)
    .bind(product.is_featured)
    .bind(product.tags)
    .bind(product.weight)
    .bind(product.dimensions.map(Json))
    .bind(product.warranty.map(Json))
    .bind(created_by)
    .fetch_one(db)
    .await
}

/// Partial update; absent fields keep their stored value. The updater is
/// always recorded.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    update: ProductUpdate,
    updated_by: Uuid,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "UPDATE products SET \
           name = COALESCE($2, name), \
           description = COALESCE($3, description), \
           price = COALESCE($4, price), \
           original_price = COALESCE($5, original_price), \
           category = COALESCE($6, category), \
           subcategory = COALESCE($7, subcategory), \
           brand = COALESCE($8, brand), \
           model = COALESCE($9, model), \
           sku = COALESCE($10, sku), \
           images = COALESCE($11, images), \
           specifications = COALESCE($12, specifications), \
           stock = COALESCE($13, stock), \
           is_active = COALESCE($14, is_active), \
           is_featured = COALESCE($15, is_featured), \
           tags = COALESCE($16, tags), \
           weight = COALESCE($17, weight), \
           dimensions = COALESCE($18, dimensions), \
           warranty = COALESCE($19, warranty), \
           updated_by = $20, \
           updated_at = now() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(update.name)
    .bind(update.description)
    .bind(update.price)
    .bind(update.original_price)
    .bind(update.category)
    .bind(update.subcategory)
    .bind(update.brand)
    .bind(update.model)
    .bind(update.sku)
    .bind(update.images.map(Json))
    .bind(update.specifications.map(Json))
    .bind(update.stock)
    .bind(update.is_active)
    .bind(update.is_featured)
    .bind(update.tags)
    .bind(update.weight)
    .bind(update.dimensions.map(Json))
    .bind(update.warranty.map(Json))
    .bind(updated_by)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, FromRow)]
pub struct ProductCounts {
    pub total: i64,
    pub active: i64,
    pub featured: i64,
    pub out_of_stock: i64,
    pub low_stock: i64,
}

pub async fn counts(db: &PgPool) -> anyhow::Result<ProductCounts> {
    let counts = sqlx::query_as::<_, ProductCounts>(
        "SELECT COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE is_active) AS active, \
                COUNT(*) FILTER (WHERE is_featured) AS featured, \
                COUNT(*) FILTER (WHERE stock = 0) AS out_of_stock, \
                COUNT(*) FILTER (WHERE stock > 0 AND stock <= 10) AS low_stock \
         FROM products",
    )
    .fetch_one(db)
    .await?;
    Ok(counts)
}

pub async fn counts_by_category(db: &PgPool) -> anyhow::Result<Vec<CategoryCount>> {
    let rows = sqlx::query_as::<_, CategoryCount>(
        "SELECT category, COUNT(*) AS count FROM products \
         GROUP BY category ORDER BY count DESC",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<RecentProduct>> {
    let rows = sqlx::query_as::<_, RecentProduct>(
        "SELECT id, name, price, category, created_at FROM products \
         ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
