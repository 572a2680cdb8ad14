//! Integration tests for the catalog and admin order surfaces.

mod common;

use axum::http::Method;
use common::{checkout_payload, response_json, TestApp};
use sea_orm::EntityTrait;

use storefront_api::entities::product;

fn product_payload(code: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "product_code": code,
        "name": name,
        "description": "Soft cotton tee",
        "price": "79.90",
        "size_type": "clothing",
        "available_sizes": ["P", "M", "G"],
        "colors": ["black", "white"],
        "image_urls": ["https://shop.test/images/tee.png"]
    })
}

#[tokio::test]
async fn product_upsert_roundtrip() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/admin/products", product_payload("TEE-001", "Basic Tee"))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let product_id = body["product"]["id"].as_str().unwrap().to_string();

    // Storefront listing sees it
    let listing = response_json(app.get("/api/products").await).await;
    assert_eq!(listing["products"].as_array().unwrap().len(), 1);

    // Lookup by id
    let fetched = response_json(app.get(&format!("/api/products/{product_id}")).await).await;
    assert_eq!(fetched["name"], "Basic Tee");
    assert_eq!(fetched["product_code"], "TEE-001");

    // Upserting the same code updates in place
    let response = app
        .post_json("/admin/products", product_payload("TEE-001", "Premium Tee"))
        .await;
    assert_eq!(response.status(), 200);
    let products = product::Entity::find().all(&*app.db).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Premium Tee");
}

#[tokio::test]
async fn product_upsert_requires_core_fields() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/admin/products",
            serde_json::json!({"name": "No code", "description": "x", "price": "10"}),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post_json(
            "/admin/products",
            serde_json::json!({"product_code": "X-1", "name": "No price", "description": "x"}),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unknown_products_are_not_found() {
    let app = TestApp::new().await;

    let response = app.get("/api/products/not-a-uuid").await;
    assert_eq!(response.status(), 404);

    let response = app
        .get("/api/products/3f6c2a1e-9f30-4a2e-8c55-000000000000")
        .await;
    assert_eq!(response.status(), 404);

    let response = app
        .request(Method::DELETE, "/admin/products/MISSING-1", None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn admin_listing_paginates_and_filters() {
    let app = TestApp::new().await;

    for i in 0..3 {
        let response = app
            .post_json(
                "/admin/products",
                product_payload(&format!("TEE-{i:03}"), &format!("Tee {i}")),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let page = response_json(app.get("/api/products-admin?limit=2&offset=0").await).await;
    assert_eq!(page["products"].as_array().unwrap().len(), 2);
    assert_eq!(page["totalCount"], 3);
    assert_eq!(page["hasMore"], true);

    let page = response_json(app.get("/api/products-admin?limit=2&offset=2").await).await;
    assert_eq!(page["products"].as_array().unwrap().len(), 1);
    assert_eq!(page["hasMore"], false);

    let page = response_json(app.get("/api/products-admin?product_code=TEE-001").await).await;
    assert_eq!(page["products"].as_array().unwrap().len(), 1);
    assert_eq!(page["products"][0]["name"], "Tee 1");

    let page = response_json(app.get("/api/products-admin?search=Tee").await).await;
    assert_eq!(page["totalCount"], 3);
}

#[tokio::test]
async fn deleting_a_product_removes_it() {
    let app = TestApp::new().await;

    app.post_json("/admin/products", product_payload("TEE-001", "Basic Tee"))
        .await;
    let response = app
        .request(Method::DELETE, "/admin/products/TEE-001", None)
        .await;
    assert_eq!(response.status(), 200);

    assert!(product::Entity::find()
        .all(&*app.db)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn order_overview_includes_line_items() {
    let app = TestApp::new().await;
    let response = app.post_json("/create_preference", checkout_payload()).await;
    assert_eq!(response.status(), 200);

    let body = response_json(app.get("/api/orders").await).await;
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "pending_mp");
    let items = orders[0]["order_items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_name"], "Shirt");
}

#[tokio::test]
async fn status_updates_flow_into_the_delivered_view() {
    let app = TestApp::new().await;
    app.post_json("/create_preference", checkout_payload()).await;
    let body = response_json(app.get("/api/orders").await).await;
    let order_id = body["orders"][0]["id"].as_str().unwrap().to_string();

    // Nothing delivered yet
    let delivered = response_json(app.get("/api/delivered-orders").await).await;
    assert!(delivered.as_array().unwrap().is_empty());

    let response = app
        .post_json(
            "/api/orders/update-status",
            serde_json::json!({"orderId": order_id, "newStatus": "delivered"}),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["status"], "delivered");

    let delivered = response_json(app.get("/api/delivered-orders").await).await;
    assert_eq!(delivered.as_array().unwrap().len(), 1);

    // Accent-insensitive search across customer and address fields
    let hit = response_json(app.get("/api/delivered-orders?q=sao%20paulo").await).await;
    assert_eq!(hit.as_array().unwrap().len(), 1);
    let hit = response_json(app.get("/api/delivered-orders?q=ana").await).await;
    assert_eq!(hit.as_array().unwrap().len(), 1);
    let miss = response_json(app.get("/api/delivered-orders?q=nobody").await).await;
    assert!(miss.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn status_update_validates_its_input() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/orders/update-status",
            serde_json::json!({"orderId": "", "newStatus": "delivered"}),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post_json(
            "/api/orders/update-status",
            serde_json::json!({"orderId": "3f6c2a1e-9f30-4a2e-8c55-000000000000", "newStatus": "delivered"}),
        )
        .await;
    assert_eq!(response.status(), 404);
}
