//! Shared harness for integration tests: an in-memory SQLite database
//! migrated with the crate's own migrator, a fake payment gateway, and
//! the real router driven through `tower::ServiceExt`.

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use storefront_api as api;

use api::mercadopago::{
    GatewayError, PaymentDetails, PaymentGateway, PreferenceRequest, PreferenceResponse,
};

/// In-process stand-in for the Mercado Pago API. Records created
/// preferences and serves canned payment lookups.
#[derive(Default)]
pub struct FakeGateway {
    pub created: Mutex<Vec<PreferenceRequest>>,
    pub fail_create: AtomicBool,
    pub fail_get: AtomicBool,
    pub payments: Mutex<HashMap<String, PaymentDetails>>,
}

impl FakeGateway {
    pub fn stub_payment(&self, payment_id: &str, details: PaymentDetails) {
        self.payments
            .lock()
            .unwrap()
            .insert(payment_id.to_string(), details);
    }

    pub fn created_preferences(&self) -> Vec<PreferenceRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_preference(
        &self,
        preference: &PreferenceRequest,
    ) -> Result<PreferenceResponse, GatewayError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                body: "provider unavailable".to_string(),
            });
        }
        self.created.lock().unwrap().push(preference.clone());
        Ok(PreferenceResponse {
            id: format!("pref-{}", preference.external_reference),
            init_point: "https://www.mercadopago.com/checkout/start".to_string(),
            sandbox_init_point: Some("https://sandbox.mercadopago.com/checkout/start".to_string()),
        })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetails, GatewayError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "lookup unavailable".to_string(),
            });
        }
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or(GatewayError::Api {
                status: reqwest::StatusCode::NOT_FOUND,
                body: "payment not found".to_string(),
            })
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<DatabaseConnection>,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_environment("development").await
    }

    pub async fn with_environment(environment: &str) -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1);
        let db = Database::connect(options)
            .await
            .expect("in-memory sqlite connection");
        api::db::run_migrations(&db).await.expect("migrations");
        let db = Arc::new(db);

        let gateway = Arc::new(FakeGateway::default());
        let cfg = api::config::AppConfig::new(
            "sqlite::memory:",
            "https://shop.test",
            "TEST-TOKEN",
            environment,
        );
        let services = api::handlers::AppServices::new(db.clone(), gateway.clone(), &cfg);
        let state = api::AppState {
            db: db.clone(),
            config: cfg,
            services,
        };
        let router = api::app_router().with_state(state);

        Self {
            router,
            db,
            gateway,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Response {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> Response {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn get(&self, path: &str) -> Response {
        self.request(Method::GET, path, None).await
    }
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// A fully-populated checkout submission; tests tweak fields as needed.
pub fn checkout_payload() -> serde_json::Value {
    serde_json::json!({
        "cartItems": [
            {
                "id": "p1",
                "name": "Shirt",
                "price": "49.9",
                "quantity": 2,
                "selected_size": "M",
                "product_code": "SHIRT-001",
                "image_url": "https://shop.test/images/shirt.png"
            }
        ],
        "customerInfo": {
            "email": "ana@x.com",
            "name": "Ana Clara Souza",
            "phone": "11987654321",
            "address": {
                "street": "Rua das Flores",
                "number": "100",
                "neighborhood": "Centro",
                "city": "São Paulo",
                "state": "SP",
                "cep": "01310-100"
            }
        }
    })
}
