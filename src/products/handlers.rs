use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    error::{on_unique_violation, ApiError},
    response::{ApiResponse, Pagination},
    state::AppState,
};

use super::{
    dto::{NewProduct, ProductStats, ProductUpdate},
    model::Product,
    query::{self, ListParams, ListQuery},
    repo, upload,
};

#[instrument(skip(state, _admin))]
pub async fn list_products(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Product>>>, ApiError> {
    let q = ListQuery::from_params(params)?;
    let (records, total) = query::run(&state.db, &q).await?;
    Ok(ApiResponse::paginated(
        records,
        "Products fetched successfully",
        Pagination::new(q.page, q.limit, total),
    ))
}

#[instrument(skip(state, _admin))]
pub async fn get_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Product"))?;
    Ok(ApiResponse::ok(product, "Product fetched successfully"))
}

#[instrument(skip(state, admin, multipart))]
pub async fn create_product(
    State(state): State<AppState>,
    admin: AdminUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let form = upload::read_product_form(multipart).await?;

    // Text fields are settled before any file hits the store, so a rejected
    // request never leaves uploaded blobs behind.
    let mut payload = NewProduct::from_form(&form.fields, Vec::new())?;

    // Friendly pre-check; the unique constraint settles concurrent creates.
    if repo::sku_exists(&state.db, &payload.sku).await? {
        return Err(ApiError::DuplicateSku);
    }

    payload.images = upload::store_images(&state, &payload.name, form.images).await?;

    let product = repo::insert(&state.db, payload, admin.0.id)
        .await
        .map_err(|e| on_unique_violation(e, ApiError::DuplicateSku))?;

    info!(product_id = %product.id, sku = %product.sku, "product created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(product, "Product created successfully"),
    ))
}

#[instrument(skip(state, admin, multipart))]
pub async fn update_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let form = upload::read_product_form(multipart).await?;

    // New files replace the image list wholesale; no files leaves it alone.
    let images = if form.images.is_empty() {
        None
    } else {
        let name = form
            .fields
            .get("name")
            .cloned()
            .unwrap_or_else(|| "Product".into());
        Some(upload::store_images(&state, &name, form.images).await?)
    };

    let payload = ProductUpdate::from_form(&form.fields, images)?;
    let product = repo::update(&state.db, id, payload, admin.0.id)
        .await
        .map_err(|e| on_unique_violation(e, ApiError::DuplicateSku))?
        .ok_or(ApiError::NotFound("Product"))?;

    Ok(ApiResponse::ok(product, "Product updated successfully"))
}

#[instrument(skip(state, _admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Product"));
    }
    info!(product_id = %id, "product deleted");
    Ok(ApiResponse::message("Product deleted successfully"))
}

#[instrument(skip(state, _admin))]
pub async fn product_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<ProductStats>>, ApiError> {
    let counts = repo::counts(&state.db).await?;
    let category_stats = repo::counts_by_category(&state.db).await?;
    let recent_products = repo::recent(&state.db, 5).await?;

    Ok(ApiResponse::ok(
        ProductStats {
            total_products: counts.total,
            active_products: counts.active,
            featured_products: counts.featured,
            out_of_stock: counts.out_of_stock,
            low_stock: counts.low_stock,
            category_stats,
            recent_products,
        },
        "Product statistics fetched successfully",
    ))
}
