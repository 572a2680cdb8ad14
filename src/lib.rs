//! Storefront API Library
//!
//! This crate provides the catalog, checkout and payment-reconciliation
//! backend for the storefront.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod mercadopago;
pub mod migrator;
pub mod services;

use axum::{
    routing::{delete, get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Builds the full HTTP surface: the checkout/webhook core plus the
/// storefront and admin CRUD routes.
pub fn app_router() -> Router<AppState> {
    Router::new()
        // Checkout and payment reconciliation
        .route(
            "/create_preference",
            post(handlers::checkout::create_preference),
        )
        .route("/webhook", post(handlers::webhooks::payment_webhook))
        // Storefront catalog
        .route("/api/products", get(handlers::products::list_products))
        .route("/api/products/:id", get(handlers::products::get_product))
        // Admin catalog
        .route(
            "/api/products-admin",
            get(handlers::products::list_products_admin),
        )
        .route("/admin/products", post(handlers::products::upsert_product))
        .route(
            "/admin/products/:product_code",
            delete(handlers::products::delete_product),
        )
        // Admin orders
        .route("/api/orders", get(handlers::orders::list_orders))
        .route(
            "/api/orders/update-status",
            post(handlers::orders::update_order_status),
        )
        .route(
            "/api/delivered-orders",
            get(handlers::orders::delivered_orders),
        )
}
