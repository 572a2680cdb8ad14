//! Payment-webhook reconciliation.
//!
//! Notifications arrive at-least-once and out of order. The payload is
//! only trusted as a pointer (type + resource id); payment state always
//! comes from a fresh provider lookup. Responses are biased toward
//! keeping the provider retrying: transient lookup failures are
//! acknowledged with success, while malformed or unassociable payloads
//! are the only client errors.

use crate::{
    entities::order,
    errors::ServiceError,
    mercadopago::PaymentGateway,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, SqlErr};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// What happened to a notification; the handler maps each variant to a
/// success response with a distinct body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// Payment details fetched and the matching order updated.
    OrderUpdated,
    /// The payment id was already recorded on another row; a replay.
    AlreadyProcessed,
    /// The provider lookup failed; acknowledged so retries continue.
    RetryLater,
    /// Recognized-but-unhandled or unknown notification type.
    Ignored,
}

#[derive(Clone)]
pub struct WebhookService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
}

impl WebhookService {
    pub fn new(db: Arc<DatabaseConnection>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { db, gateway }
    }

    /// Applies one provider notification. `kind` and `resource_id` come
    /// from the webhook query string or body; extraction already
    /// happened in the handler.
    #[instrument(skip(self))]
    pub async fn process_notification(
        &self,
        kind: &str,
        resource_id: &str,
    ) -> Result<WebhookDisposition, ServiceError> {
        match kind {
            "payment" => self.reconcile_payment(resource_id).await,
            "merchant_order" => {
                info!(resource_id, "merchant_order notification acknowledged");
                Ok(WebhookDisposition::Ignored)
            }
            other => {
                info!(kind = other, resource_id, "unhandled notification type");
                Ok(WebhookDisposition::Ignored)
            }
        }
    }

    async fn reconcile_payment(
        &self,
        payment_id: &str,
    ) -> Result<WebhookDisposition, ServiceError> {
        let details = match self.gateway.get_payment(payment_id).await {
            Ok(details) => details,
            Err(e) => {
                // Treated as transient: answer success so the provider
                // keeps retrying, and change nothing locally.
                warn!(error = %e, payment_id, "payment lookup failed; awaiting provider retry");
                return Ok(WebhookDisposition::RetryLater);
            }
        };

        let external_reference = details
            .external_reference
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                ServiceError::BadRequest(
                    "payment record carries no external reference; cannot associate an order"
                        .to_string(),
                )
            })?;

        let order_id = Uuid::parse_str(external_reference).map_err(|_| {
            ServiceError::BadRequest(format!(
                "external reference {external_reference} is not a valid order id"
            ))
        })?;

        let existing = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "order lookup failed during reconciliation");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                // Orders are never created from webhooks.
                ServiceError::DataInconsistency(format!(
                    "payment {payment_id} references order {order_id}, which does not exist"
                ))
            })?;

        let mut update: order::ActiveModel = existing.into();
        update.mp_payment_id = Set(Some(details.id.clone()));
        update.mp_status = Set(Some(details.status.clone()));
        update.status = Set(map_provider_status(&details.status));
        if let Some(preference_id) = details.preference_id.clone() {
            update.mp_preference_id = Set(Some(preference_id));
        }
        update.updated_at = Set(Some(Utc::now()));

        match update.update(&*self.db).await {
            Ok(updated) => {
                info!(
                    order_id = %order_id,
                    payment_id = %details.id,
                    status = %updated.status,
                    "order reconciled from payment webhook"
                );
                Ok(WebhookDisposition::OrderUpdated)
            }
            Err(e) => {
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    warn!(payment_id = %details.id, "duplicate payment id on replayed webhook");
                    return Ok(WebhookDisposition::AlreadyProcessed);
                }
                error!(error = %e, order_id = %order_id, "failed to persist reconciled status");
                Err(ServiceError::DatabaseError(e))
            }
        }
    }
}

/// Maps the provider's payment status onto the order state machine:
/// `approved` terminates in `payment_approved`, anything else lands in a
/// `payment_<status>` variant.
pub fn map_provider_status(provider_status: &str) -> String {
    if provider_status == "approved" {
        order::STATUS_PAYMENT_APPROVED.to_string()
    } else {
        format!("payment_{provider_status}")
    }
}
