use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Serialize;

use crate::{
    entities::product,
    errors::ServiceError,
    services::catalog::{AdminProductPage, AdminProductQuery, UpsertProductRequest},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<product::Model>,
}

#[derive(Debug, Serialize)]
pub struct UpsertProductResponse {
    pub message: String,
    pub product: product::Model,
}

#[derive(Debug, Serialize)]
pub struct DeleteProductResponse {
    pub message: String,
}

// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ProductListResponse>, ServiceError> {
    let products = state.services.catalog.list_products().await?;
    Ok(Json(ProductListResponse { products }))
}

// GET /api/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<product::Model>, ServiceError> {
    let product = state.services.catalog.get_product(&id).await?;
    Ok(Json(product))
}

// GET /api/products-admin
pub async fn list_products_admin(
    State(state): State<AppState>,
    Query(query): Query<AdminProductQuery>,
) -> Result<Json<AdminProductPage>, ServiceError> {
    let page = state.services.catalog.list_products_admin(query).await?;
    Ok(Json(page))
}

// POST /admin/products
pub async fn upsert_product(
    State(state): State<AppState>,
    Json(payload): Json<UpsertProductRequest>,
) -> Result<Json<UpsertProductResponse>, ServiceError> {
    let product = state.services.catalog.upsert_product(payload).await?;
    Ok(Json(UpsertProductResponse {
        message: "Product saved successfully".to_string(),
        product,
    }))
}

// DELETE /admin/products/:product_code
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_code): Path<String>,
) -> Result<Json<DeleteProductResponse>, ServiceError> {
    state.services.catalog.delete_product(&product_code).await?;
    Ok(Json(DeleteProductResponse {
        message: format!("Product {} deleted successfully", product_code),
    }))
}
