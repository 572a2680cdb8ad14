//! Product catalog: storefront listings plus the admin upsert/delete
//! surface. Image files themselves are handled elsewhere; this service
//! only stores the URLs it is given.

use crate::{
    entities::product,
    errors::ServiceError,
    services::checkout::JsonScalar,
};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize)]
pub struct AdminProductQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(rename = "excludeId", default)]
    pub exclude_id: Option<String>,
}

fn default_limit() -> u64 {
    10
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProductPage {
    pub products: Vec<product::Model>,
    pub total_count: u64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpsertProductRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "product code is required"))]
    pub product_code: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "product name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "product description is required"))]
    pub description: String,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub technical_specifications: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<JsonScalar>,
    #[serde(default)]
    pub cost_price: Option<JsonScalar>,
    #[serde(default)]
    pub size_type: Option<String>,
    #[serde(default)]
    pub available_sizes: Option<serde_json::Value>,
    #[serde(default)]
    pub colors: Option<serde_json::Value>,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Full catalog, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = product::Entity::find()
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to list products");
                ServiceError::DatabaseError(e)
            })?;
        Ok(products)
    }

    /// Single product by id; anything unparseable is simply not found.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> Result<product::Model, ServiceError> {
        let product_id = Uuid::parse_str(id)
            .map_err(|_| ServiceError::NotFound("Product not found".to_string()))?;

        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "failed to fetch product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    /// Paginated admin listing with code, free-text and exclusion
    /// filters.
    #[instrument(skip(self))]
    pub async fn list_products_admin(
        &self,
        query: AdminProductQuery,
    ) -> Result<AdminProductPage, ServiceError> {
        let mut select = product::Entity::find();

        if let Some(code) = query.product_code.as_deref().filter(|c| !c.is_empty()) {
            select = select.filter(product::Column::ProductCode.eq(code));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(product::Column::Name.contains(search))
                    .add(product::Column::Description.contains(search)),
            );
        }
        if let Some(exclude) = query
            .exclude_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            select = select.filter(product::Column::Id.ne(exclude));
        }

        let total_count = select.clone().count(&*self.db).await.map_err(|e| {
            error!(error = %e, "failed to count products");
            ServiceError::DatabaseError(e)
        })?;

        let products = select
            .order_by_desc(product::Column::CreatedAt)
            .offset(query.offset)
            .limit(query.limit)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to fetch product page");
                ServiceError::DatabaseError(e)
            })?;

        let has_more = query.offset + query.limit < total_count;
        Ok(AdminProductPage {
            products,
            total_count,
            has_more,
        })
    }

    /// Creates or updates a product keyed on its code. Image URLs are
    /// only replaced when the request carries new ones.
    #[instrument(skip(self, request), fields(product_code = %request.product_code))]
    pub async fn upsert_product(
        &self,
        request: UpsertProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let price = request
            .price
            .as_ref()
            .and_then(JsonScalar::as_decimal)
            .ok_or_else(|| {
                ServiceError::ValidationError("product price is required".to_string())
            })?;
        let cost_price = request.cost_price.as_ref().and_then(JsonScalar::as_decimal);

        let now = Utc::now();
        let row = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_code: Set(request.product_code.clone()),
            name: Set(request.name.clone()),
            description: Set(request.description.clone()),
            long_description: Set(request.long_description.clone()),
            technical_specifications: Set(request.technical_specifications.clone()),
            price: Set(price),
            cost_price: Set(cost_price),
            size_type: Set(request
                .size_type
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "none".to_string())),
            available_sizes: Set(request.available_sizes.clone()),
            colors: Set(request.colors.clone()),
            image_urls: Set(request
                .image_urls
                .clone()
                .filter(|urls| !urls.is_empty())
                .map(serde_json::Value::from)),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let mut update_columns = vec![
            product::Column::Name,
            product::Column::Description,
            product::Column::LongDescription,
            product::Column::TechnicalSpecifications,
            product::Column::Price,
            product::Column::CostPrice,
            product::Column::SizeType,
            product::Column::AvailableSizes,
            product::Column::Colors,
            product::Column::UpdatedAt,
        ];
        // Existing images stay in place unless the request replaces them
        if request
            .image_urls
            .as_ref()
            .is_some_and(|urls| !urls.is_empty())
        {
            update_columns.push(product::Column::ImageUrls);
        }

        product::Entity::insert(row)
            .on_conflict(
                OnConflict::column(product::Column::ProductCode)
                    .update_columns(update_columns)
                    .to_owned(),
            )
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, product_code = %request.product_code, "failed to upsert product");
                ServiceError::DatabaseError(e)
            })?;

        let saved = product::Entity::find()
            .filter(product::Column::ProductCode.eq(request.product_code.as_str()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::DataInconsistency(format!(
                    "product {} vanished after upsert",
                    request.product_code
                ))
            })?;

        info!(product_id = %saved.id, product_code = %saved.product_code, "product upserted");
        Ok(saved)
    }

    /// Removes a product by code.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_code: &str) -> Result<(), ServiceError> {
        let result = product::Entity::delete_many()
            .filter(product::Column::ProductCode.eq(product_code))
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, product_code, "failed to delete product");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            warn!(product_code, "delete requested for unknown product");
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        info!(product_code, "product deleted");
        Ok(())
    }
}
