//! Checkout orchestration: turns a validated cart submission into a
//! persisted order plus a provider-hosted payment session.
//!
//! The steps run sequentially and are not wrapped in one transaction;
//! each failure aborts immediately and leaves the documented partial
//! state behind (an order without items, or an order that never gets a
//! preference). There is no compensating cleanup here — that is an
//! admin concern.

use crate::{
    config::AppConfig,
    entities::{order, order_item},
    errors::ServiceError,
    mercadopago::{
        BackUrls, PayerAddress, PayerPhone, PaymentGateway, PreferenceItem, PreferencePayer,
        PreferenceRequest,
    },
    services::codes,
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Scalar that may arrive as a JSON string or number; the storefront
/// cart is untrusted client state and sends prices both ways.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum JsonScalar {
    Text(String),
    Number(serde_json::Number),
}

impl JsonScalar {
    pub fn as_text(&self) -> String {
        match self {
            JsonScalar::Text(s) => s.clone(),
            JsonScalar::Number(n) => n.to_string(),
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            JsonScalar::Text(s) => s.trim().parse().ok(),
            JsonScalar::Number(n) => n.to_string().parse().ok(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            JsonScalar::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
            }
            JsonScalar::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        }
    }
}

/// Image reference as sent by the cart: a single URL or an array of
/// them (only the first is used).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ImageRef {
    One(String),
    Many(Vec<String>),
}

impl ImageRef {
    pub fn first(&self) -> Option<&str> {
        let url = match self {
            ImageRef::One(url) => url.as_str(),
            ImageRef::Many(urls) => urls.first().map(String::as_str).unwrap_or(""),
        };
        if url.is_empty() {
            None
        } else {
            Some(url)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartItem {
    pub id: JsonScalar,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<JsonScalar>,
    #[serde(default)]
    pub quantity: Option<JsonScalar>,
    #[serde(default)]
    pub selected_size: Option<String>,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub image_url: Option<ImageRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInput {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: Option<JsonScalar>,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub cep: Option<JsonScalar>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CustomerInfo {
    #[serde(default)]
    #[validate(length(min = 1, message = "customer email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "customer name is required"))]
    pub name: String,
    #[serde(default)]
    pub address: Option<AddressInput>,
    #[serde(default)]
    #[validate(length(min = 1, message = "customer phone is required"))]
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[serde(rename = "cartItems", default)]
    #[validate(length(min = 1, message = "cart must contain at least one item"))]
    pub cart_items: Vec<CartItem>,
    #[serde(rename = "customerInfo", default)]
    #[validate]
    pub customer_info: CustomerInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub redirect_url: String,
    pub order_id: Uuid,
    pub order_code: String,
}

/// One coerced, validated cart line.
#[derive(Debug, Clone)]
struct CheckoutLine {
    product_id: String,
    product_code: Option<String>,
    base_name: String,
    title: String,
    selected_size: Option<String>,
    selected_color: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    picture_url: String,
}

/// Settings the orchestrator needs from the process configuration.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub app_base_url: String,
    pub production: bool,
    pub placeholder_image_url: String,
}

impl From<&AppConfig> for CheckoutSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            app_base_url: cfg.app_base_url.clone(),
            production: cfg.is_production(),
            placeholder_image_url: cfg.placeholder_image_url(),
        }
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            db,
            gateway,
            settings,
        }
    }

    /// Runs the full checkout sequence and returns the provider redirect
    /// target. Validation happens before any persistence call.
    #[instrument(skip(self, request), fields(items = request.cart_items.len()))]
    pub async fn create_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, ServiceError> {
        request.validate()?;
        let customer = &request.customer_info;
        let address = customer.address.as_ref().ok_or_else(|| {
            ServiceError::ValidationError("customer address is required".to_string())
        })?;

        let lines = build_lines(&request.cart_items, &self.settings.placeholder_image_url)?;
        let total_quantity: i32 = lines.iter().map(|line| line.quantity).sum();
        let total_amount: Decimal = lines
            .iter()
            .map(|line| line.unit_price * Decimal::from(line.quantity))
            .sum();

        let order_code = codes::generate_order_code();
        let customer_code = codes::generate_customer_code(&customer.name, &customer.email);

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let order_row = order::ActiveModel {
            id: Set(order_id),
            order_code: Set(order_code.clone()),
            customer_code: Set(customer_code),
            total_amount: Set(total_amount),
            total_quantity: Set(total_quantity),
            status: Set(order::STATUS_PENDING_PAYMENT.to_string()),
            payer_email: Set(customer.email.clone()),
            customer_name: Set(customer.name.clone()),
            customer_email: Set(customer.email.clone()),
            customer_phone: Set(customer.phone.clone()),
            shipping_address: Set(address.street.clone()),
            shipping_number: Set(address.number.as_ref().map(JsonScalar::as_text)),
            shipping_complement: Set(address.complement.clone()),
            shipping_neighborhood: Set(address.neighborhood.clone()),
            shipping_city: Set(address.city.clone()),
            shipping_state: Set(address.state.clone()),
            shipping_zip_code: Set(zip_digits(address)),
            mp_preference_id: Set(None),
            mp_payment_id: Set(None),
            mp_status: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        order_row.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, order_code = %order_code, "failed to create order row");
            ServiceError::DatabaseError(e)
        })?;
        info!(order_id = %order_id, order_code = %order_code, "order created");

        let item_rows: Vec<order_item::ActiveModel> = lines
            .iter()
            .map(|line| order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id.clone()),
                product_code: Set(line.product_code.clone()),
                product_name: Set(line.base_name.clone()),
                selected_size: Set(line.selected_size.clone()),
                selected_color: Set(line.selected_color.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                image_url: Set(line.picture_url.clone()),
                created_at: Set(now),
            })
            .collect();

        // An insert failure here strands the order row without items;
        // accepted and left for administrative cleanup.
        order_item::Entity::insert_many(item_rows)
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "failed to persist order items");
                ServiceError::DatabaseError(e)
            })?;
        info!(order_id = %order_id, count = lines.len(), "order items persisted");

        let preference_request = self.build_preference(order_id, &lines, customer, address);
        let preference = self
            .gateway
            .create_preference(&preference_request)
            .await
            .map_err(|e| {
                // Order and items stay persisted in pending state; this
                // order will never receive a webhook until retried.
                error!(error = %e, order_id = %order_id, "preference creation failed");
                ServiceError::PaymentProvider(e.to_string())
            })?;
        info!(order_id = %order_id, preference_id = %preference.id, "payment preference created");

        // Best effort: the redirect works without this update and the
        // webhook joins on the order id, not the preference id.
        let attach = order::ActiveModel {
            id: Set(order_id),
            mp_preference_id: Set(Some(preference.id.clone())),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        if let Err(e) = attach.update(&*self.db).await {
            warn!(error = %e, order_id = %order_id, "could not attach preference id to order");
        }

        let redirect_url = if self.settings.production {
            preference.init_point
        } else {
            preference
                .sandbox_init_point
                .unwrap_or(preference.init_point)
        };

        Ok(CheckoutOutcome {
            redirect_url,
            order_id,
            order_code,
        })
    }

    fn build_preference(
        &self,
        order_id: Uuid,
        lines: &[CheckoutLine],
        customer: &CustomerInfo,
        address: &AddressInput,
    ) -> PreferenceRequest {
        let (first_name, surname) = split_name(&customer.name);
        let (area_code, number) = split_phone(&customer.phone);
        let base = &self.settings.app_base_url;

        PreferenceRequest {
            items: lines
                .iter()
                .map(|line| PreferenceItem {
                    id: line.product_id.clone(),
                    title: line.title.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    picture_url: line.picture_url.clone(),
                })
                .collect(),
            payer: PreferencePayer {
                email: customer.email.clone(),
                name: first_name,
                surname,
                address: PayerAddress {
                    zip_code: zip_digits(address),
                    street_name: address.street.clone(),
                    street_number: address.number.as_ref().map(JsonScalar::as_text),
                    neighborhood: address.neighborhood.clone(),
                    city: address.city.clone(),
                    state: address.state.clone(),
                },
                phone: PayerPhone { area_code, number },
            },
            back_urls: BackUrls {
                success: format!("{base}/success"),
                failure: format!("{base}/failure"),
                pending: format!("{base}/pending"),
            },
            notification_url: format!("{base}/webhook"),
            auto_return: "approved".to_string(),
            external_reference: order_id.to_string(),
        }
    }
}

/// Coerces every cart item into a validated checkout line. Rejects the
/// whole submission if any price or quantity is non-positive after
/// coercion.
fn build_lines(items: &[CartItem], placeholder_url: &str) -> Result<Vec<CheckoutLine>, ServiceError> {
    items
        .iter()
        .map(|item| {
            let unit_price = item
                .price
                .as_ref()
                .and_then(JsonScalar::as_decimal)
                .map(|p| p.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
                .filter(|p| p.is_sign_positive() && !p.is_zero())
                .ok_or_else(|| {
                    ServiceError::ValidationError(
                        "every item must have a price greater than zero".to_string(),
                    )
                })?;

            let quantity = item
                .quantity
                .as_ref()
                .and_then(JsonScalar::as_int)
                .filter(|q| *q > 0)
                .and_then(|q| i32::try_from(q).ok())
                .ok_or_else(|| {
                    ServiceError::ValidationError(
                        "every item must have a quantity greater than zero".to_string(),
                    )
                })?;

            let mut title = item.name.clone();
            if let Some(size) = item.selected_size.as_deref().filter(|s| !s.is_empty()) {
                title.push_str(&format!(" (Size: {size})"));
            }
            if let Some(color) = item.selected_color.as_deref().filter(|c| !c.is_empty()) {
                title.push_str(&format!(" (Color: {color})"));
            }

            let picture_url = item
                .image_url
                .as_ref()
                .and_then(ImageRef::first)
                .map(str::to_string)
                .unwrap_or_else(|| placeholder_url.to_string());

            Ok(CheckoutLine {
                product_id: item.id.as_text(),
                product_code: item.product_code.clone(),
                base_name: item.name.clone(),
                title,
                selected_size: item.selected_size.clone().filter(|s| !s.is_empty()),
                selected_color: item.selected_color.clone().filter(|c| !c.is_empty()),
                quantity,
                unit_price,
                picture_url,
            })
        })
        .collect()
}

/// First token becomes the given name; the remainder the surname.
fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.splitn(2, ' ');
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.next().unwrap_or_default().to_string();
    (first, rest)
}

/// Brazilian phone numbers lead with a two-digit area code.
fn split_phone(phone: &str) -> (String, String) {
    let area_code: String = phone.chars().take(2).collect();
    let number: String = phone.chars().skip(2).collect();
    (area_code, number)
}

fn zip_digits(address: &AddressInput) -> String {
    address
        .cep
        .as_ref()
        .map(JsonScalar::as_text)
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price: serde_json::Value, quantity: serde_json::Value) -> CartItem {
        serde_json::from_value(serde_json::json!({
            "id": "p1",
            "name": "Shirt",
            "price": price,
            "quantity": quantity,
        }))
        .unwrap()
    }

    #[test]
    fn string_prices_are_coerced_to_two_decimals() {
        let lines = build_lines(&[item("49.9".into(), 2.into())], "ph").unwrap();
        assert_eq!(lines[0].unit_price, dec!(49.90));
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn numeric_prices_round_half_away_from_zero() {
        let lines = build_lines(&[item(serde_json::json!(10.005), 1.into())], "ph").unwrap();
        assert_eq!(lines[0].unit_price, dec!(10.01));
    }

    #[test]
    fn zero_or_negative_values_are_rejected() {
        assert!(build_lines(&[item(0.into(), 1.into())], "ph").is_err());
        assert!(build_lines(&[item("10.0".into(), 0.into())], "ph").is_err());
        assert!(build_lines(&[item(serde_json::json!(-5), 1.into())], "ph").is_err());
        assert!(build_lines(&[item("abc".into(), 1.into())], "ph").is_err());
    }

    #[test]
    fn titles_gain_size_and_color_annotations() {
        let mut cart_item = item("10".into(), 1.into());
        cart_item.selected_size = Some("M".into());
        cart_item.selected_color = Some("Blue".into());
        let lines = build_lines(&[cart_item], "ph").unwrap();
        assert_eq!(lines[0].title, "Shirt (Size: M) (Color: Blue)");
        assert_eq!(lines[0].base_name, "Shirt");
    }

    #[test]
    fn picture_defaults_to_placeholder() {
        let lines = build_lines(
            &[item("10".into(), 1.into())],
            "https://shop.example.com/images/placeholder.png",
        )
        .unwrap();
        assert_eq!(
            lines[0].picture_url,
            "https://shop.example.com/images/placeholder.png"
        );
    }

    #[test]
    fn first_image_of_an_array_wins() {
        let mut cart_item = item("10".into(), 1.into());
        cart_item.image_url = Some(ImageRef::Many(vec![
            "https://img/one.png".into(),
            "https://img/two.png".into(),
        ]));
        let lines = build_lines(&[cart_item], "ph").unwrap();
        assert_eq!(lines[0].picture_url, "https://img/one.png");
    }

    #[test]
    fn totals_accumulate_without_drift() {
        let lines = build_lines(
            &[item("49.9".into(), 2.into()), item("0.1".into(), 3.into())],
            "ph",
        )
        .unwrap();
        let amount: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        let quantity: i32 = lines.iter().map(|l| l.quantity).sum();
        assert_eq!(amount, dec!(100.10));
        assert_eq!(quantity, 5);
    }

    #[test]
    fn name_splits_on_first_space() {
        assert_eq!(
            split_name("Ana Clara Souza"),
            ("Ana".to_string(), "Clara Souza".to_string())
        );
        assert_eq!(split_name("Ana"), ("Ana".to_string(), String::new()));
    }

    #[test]
    fn phone_splits_into_area_code_and_number() {
        assert_eq!(
            split_phone("11987654321"),
            ("11".to_string(), "987654321".to_string())
        );
    }

    #[test]
    fn zip_keeps_digits_only() {
        let address = AddressInput {
            cep: Some(JsonScalar::Text("01310-100".into())),
            ..Default::default()
        };
        assert_eq!(zip_digits(&address), "01310100");
    }

    #[test]
    fn request_validation_rejects_empty_cart_and_blank_customer_fields() {
        let empty_cart: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "cartItems": [],
            "customerInfo": {
                "email": "a@b.com", "name": "Ana", "phone": "11987654321",
                "address": {"street": "Rua A", "city": "SP", "state": "SP", "cep": "01310100"}
            }
        }))
        .unwrap();
        assert!(empty_cart.validate().is_err());

        let blank_email: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "cartItems": [{"id": "p1", "name": "Shirt", "price": "10", "quantity": 1}],
            "customerInfo": {"email": "", "name": "Ana", "phone": "11987654321"}
        }))
        .unwrap();
        assert!(blank_email.validate().is_err());
    }
}
