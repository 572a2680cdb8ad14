//! Admin-facing order queries: overview listing, manual status updates
//! and the delivered-orders search.

use crate::{
    entities::{order, order_item},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// An order joined with its line items, as the admin panel consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub order_items: Vec<order_item::Model>,
}

#[derive(Clone)]
pub struct OrderAdminService {
    db: Arc<DatabaseConnection>,
}

impl OrderAdminService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All orders with their items, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderDetail>, ServiceError> {
        let orders = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to list orders");
                ServiceError::DatabaseError(e)
            })?;

        let items = orders
            .load_many(order_item::Entity, &*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to load order items");
                ServiceError::DatabaseError(e)
            })?;

        Ok(orders
            .into_iter()
            .zip(items)
            .map(|(order, order_items)| OrderDetail { order, order_items })
            .collect())
    }

    /// Sets an arbitrary status on an order; the only path to
    /// `delivered`. The webhook reconciler never calls this.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: &str,
    ) -> Result<order::Model, ServiceError> {
        let existing = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "failed to find order for status update");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                warn!(order_id = %order_id, "order not found for status update");
                ServiceError::NotFound("Order not found".to_string())
            })?;

        let old_status = existing.status.clone();
        let mut update: order::ActiveModel = existing.into();
        update.status = Set(new_status.to_string());
        update.updated_at = Set(Some(Utc::now()));

        let updated = update.update(&*self.db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, old_status = %old_status, new_status = %new_status, "order status updated");
        Ok(updated)
    }

    /// Delivered orders with their items, optionally filtered by a
    /// normalized free-text query across customer, address, code and
    /// item fields. Filtering runs server-side, after the status query.
    #[instrument(skip(self))]
    pub async fn delivered_orders(
        &self,
        query: Option<&str>,
    ) -> Result<Vec<OrderDetail>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::Status.eq(order::STATUS_DELIVERED))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to list delivered orders");
                ServiceError::DatabaseError(e)
            })?;

        let items = orders
            .load_many(order_item::Entity, &*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to load delivered order items");
                ServiceError::DatabaseError(e)
            })?;

        let details = orders
            .into_iter()
            .zip(items)
            .map(|(order, order_items)| OrderDetail { order, order_items });

        match query.map(normalize).filter(|q| !q.is_empty()) {
            Some(needle) => Ok(details
                .filter(|detail| searchable_text(detail).contains(&needle))
                .collect()),
            None => Ok(details.collect()),
        }
    }
}

fn searchable_text(detail: &OrderDetail) -> String {
    let order = &detail.order;
    let mut fields = vec![
        normalize(&order.customer_name),
        normalize(&order.customer_phone),
        normalize(&order.shipping_address),
        normalize(order.shipping_number.as_deref().unwrap_or_default()),
        normalize(order.shipping_complement.as_deref().unwrap_or_default()),
        normalize(order.shipping_neighborhood.as_deref().unwrap_or_default()),
        normalize(&order.shipping_city),
        normalize(&order.shipping_state),
        normalize(&order.shipping_zip_code),
        normalize(&order.order_code),
    ];
    for item in &detail.order_items {
        fields.push(normalize(&item.product_name));
        fields.push(normalize(item.product_code.as_deref().unwrap_or_default()));
    }
    fields.join(" ")
}

/// Lowercases, folds common Latin accents and drops punctuation so that
/// "São Paulo" matches "sao paulo".
fn normalize(text: &str) -> String {
    text.chars().filter_map(fold_char).collect()
}

fn fold_char(c: char) -> Option<char> {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => Some('a'),
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => Some('e'),
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => Some('i'),
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => Some('o'),
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => Some('u'),
        'ç' | 'Ç' => Some('c'),
        'ñ' | 'Ñ' => Some('n'),
        c if c.is_alphanumeric() => c.to_lowercase().next(),
        c if c.is_whitespace() => Some(' '),
        _ => None,
    }
}
