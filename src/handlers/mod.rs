pub mod checkout;
pub mod orders;
pub mod products;
pub mod webhooks;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::mercadopago::PaymentGateway;
use crate::services::checkout::{CheckoutService, CheckoutSettings};
use crate::services::catalog::ProductCatalogService;
use crate::services::orders::OrderAdminService;
use crate::services::webhook::WebhookService;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub orders: Arc<OrderAdminService>,
    pub checkout: Arc<CheckoutService>,
    pub webhooks: Arc<WebhookService>,
}

impl AppServices {
    /// Wires every service against the shared pool and the payment
    /// gateway chosen at startup.
    pub fn new(db_pool: Arc<DbPool>, gateway: Arc<dyn PaymentGateway>, cfg: &AppConfig) -> Self {
        let catalog = Arc::new(ProductCatalogService::new(db_pool.clone()));
        let orders = Arc::new(OrderAdminService::new(db_pool.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db_pool.clone(),
            gateway.clone(),
            CheckoutSettings::from(cfg),
        ));
        let webhooks = Arc::new(WebhookService::new(db_pool, gateway));

        Self {
            catalog,
            orders,
            checkout,
            webhooks,
        }
    }
}
