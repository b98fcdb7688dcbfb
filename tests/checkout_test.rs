//! Integration tests for store settings, shipping quotes and checkout

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use storefront::config::Config;
use storefront::database::{AppState, CatalogStore};
use storefront::model::{NewProduct, Seller};
use storefront::route::create_app;

fn setup_test_app() -> (axum::Router, CatalogStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let catalog = CatalogStore::open(dir.path().join("test.db")).expect("Failed to open db");
    let config = Config {
        media_dir: dir.path().join("media"),
        order_email: "orders@shop.test".into(),
        ..Config::default()
    };
    let state = AppState::new(catalog.clone(), config).expect("Failed to load settings");
    (create_app(state), catalog, dir)
}

async fn send(app: &axum::Router, method: &str, uri: &str, payload: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match payload {
        Some(payload) => {
            builder = builder.header("content-type", "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse JSON")
    };

    (status, json)
}

fn seed(catalog: &CatalogStore, title: &str, price: rust_decimal::Decimal, stock: u32) -> String {
    let product = NewProduct {
        title: title.into(),
        description: format!("{title} description"),
        price,
        category: "Test".into(),
        tags: Vec::new(),
        stock,
        seller: Seller::default(),
    };
    catalog.create(product, Vec::new(), None).unwrap().id
}

async fn add_courier(app: &axum::Router) {
    let option = json!({
        "id": "courier",
        "name": "Local Courier",
        "days": "1-2",
        "isDistanceBased": true,
        "basePrice": 2.99,
        "pricePerKm": 0.10,
        "maxDistance": 500
    });
    let (status, body) = send(app, "POST", "/api/settings/shipping", Some(option)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isDefault"], false);
}

fn assert_price(body: &Value, expected: f64) {
    let price = body["price"].as_f64().expect("price should be a number");
    assert!((price - expected).abs() < 1e-9, "expected {expected}, got {price}");
}

#[tokio::test]
async fn test_default_settings() {
    let (app, _catalog, _dir) = setup_test_app();

    let (status, body) = send(&app, "GET", "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);

    let options = body["shipping"]["options"].as_array().unwrap();
    assert_eq!(options.len(), 3);
    assert_eq!(options[0]["id"], "standard");
    assert_eq!(options[0]["isDefault"], true);
    assert_eq!(body["payment"]["methods"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_quote_distance_based_option() {
    let (app, _catalog, _dir) = setup_test_app();
    add_courier(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/shipping/quote",
        Some(json!({ "optionId": "courier", "distanceKm": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_price(&body, 14.99);

    let (status, body) = send(
        &app,
        "POST",
        "/api/shipping/quote",
        Some(json!({ "optionId": "courier", "distanceKm": 600 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "unavailable" }));
}

#[tokio::test]
async fn test_quote_requires_distance_for_distance_option() {
    let (app, _catalog, _dir) = setup_test_app();
    add_courier(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/shipping/quote",
        Some(json!({ "optionId": "courier" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "shipping_error");
}

#[tokio::test]
async fn test_quote_flat_and_unknown_options() {
    let (app, _catalog, _dir) = setup_test_app();

    let (_, body) = send(
        &app,
        "POST",
        "/api/shipping/quote",
        Some(json!({ "optionId": "express", "distanceKm": 900 })),
    )
    .await;
    assert_price(&body, 9.99);

    let (_, body) = send(
        &app,
        "POST",
        "/api/shipping/quote",
        Some(json!({ "optionId": "teleport" })),
    )
    .await;
    assert_eq!(body["status"], "ok");
    assert_price(&body, 0.0);
}

#[tokio::test]
async fn test_quote_from_destination_uses_store_location() {
    let (app, _catalog, _dir) = setup_test_app();
    add_courier(&app).await;
    let destination = json!({ "lat": 1.0, "lng": 0.0 });

    let (status, _) = send(
        &app,
        "POST",
        "/api/shipping/quote",
        Some(json!({ "optionId": "courier", "destination": destination })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let location = json!({ "lat": 0.0, "lng": 0.0, "address": "Null Island", "city": "Atlantic" });
    let (status, _) = send(&app, "PUT", "/api/settings/location", Some(location)).await;
    assert_eq!(status, StatusCode::OK);

    // 111 km away
    let (_, body) = send(
        &app,
        "POST",
        "/api/shipping/quote",
        Some(json!({ "optionId": "courier", "destination": destination })),
    )
    .await;
    assert_price(&body, 14.09);
}

#[tokio::test]
async fn test_settings_invariants_over_http() {
    let (app, _catalog, _dir) = setup_test_app();

    let (status, body) = send(&app, "DELETE", "/api/settings/shipping/standard", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "settings_conflict");

    let (status, _) = send(&app, "DELETE", "/api/settings/shipping/pickup", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", "/api/settings/shipping/pickup", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let disable_card = json!({ "id": "card", "name": "Card", "enabled": false });
    let (status, _) = send(&app, "PUT", "/api/settings/payment/card", Some(disable_card)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let incomplete = json!({ "name": "Broken", "days": "1", "isDistanceBased": true, "basePrice": 1 });
    let (status, _) = send(&app, "POST", "/api/settings/shipping", Some(incomplete)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", "/api/settings/shipping/express/default", None).await;
    assert_eq!(status, StatusCode::OK);
    let defaults: Vec<&str> = body["shipping"]["options"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|o| o["isDefault"] == true)
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(defaults, ["express"]);
}

#[tokio::test]
async fn test_checkout_composes_order_email() {
    let (app, catalog, _dir) = setup_test_app();
    let mug = seed(&catalog, "Mug", dec!(12.50), 10);
    let plate = seed(&catalog, "Plate", dec!(8), 3);

    let request = json!({
        "items": [
            { "productId": mug, "quantity": 2 },
            { "productId": plate, "quantity": 1 },
            { "productId": mug, "quantity": 1 }
        ],
        "customer": {
            "name": "Eleni",
            "address": "Tsimiski 10, Thessaloniki",
            "phone": "2310000000",
            "message": "Leave at the door"
        }
    });
    let (status, body) = send(&app, "POST", "/api/checkout", Some(request)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["itemCount"], 4);
    assert_eq!(body["lines"].as_array().unwrap().len(), 2);
    assert_eq!(body["shippingOptionId"], "standard");
    assert_eq!(body["paymentMethod"], "Credit/Debit Card");
    assert_price(&json!({ "price": body["total"] }), 51.49);

    let email = &body["email"];
    assert_eq!(email["to"], "orders@shop.test");
    assert_eq!(email["subject"], "New Order");
    let text = email["body"].as_str().unwrap();
    assert!(text.contains("Mug - Quantity: 3\r\n"));
    assert!(text.contains("Plate - Quantity: 1\r\n"));
    assert!(text.contains("Address: Tsimiski 10, Thessaloniki\r\n"));
    assert!(email["mailtoLink"]
        .as_str()
        .unwrap()
        .starts_with("mailto:orders@shop.test?subject=New%20Order&body="));

    // Checkout never touches stored stock
    assert_eq!(catalog.get(&mug).unwrap().unwrap().stock, 10);
}

#[tokio::test]
async fn test_checkout_rejects_over_stock() {
    let (app, catalog, _dir) = setup_test_app();
    let plate = seed(&catalog, "Plate", dec!(8), 3);

    let request = json!({
        "items": [{ "productId": plate, "quantity": 4 }],
        "customer": { "name": "A", "address": "B", "phone": "C" }
    });
    let (status, body) = send(&app, "POST", "/api/checkout", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "only 3 of Plate in stock");
}

#[tokio::test]
async fn test_checkout_rejects_unknown_product_and_empty_cart() {
    let (app, _catalog, _dir) = setup_test_app();
    let customer = json!({ "name": "A", "address": "B", "phone": "C" });

    let request = json!({ "items": [{ "productId": "missing", "quantity": 1 }], "customer": customer });
    let (status, _) = send(&app, "POST", "/api/checkout", Some(request)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = json!({ "items": [], "customer": customer });
    let (status, _) = send(&app, "POST", "/api/checkout", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_out_of_range_delivery() {
    let (app, catalog, _dir) = setup_test_app();
    add_courier(&app).await;
    let mug = seed(&catalog, "Mug", dec!(12.50), 10);

    let request = json!({
        "items": [{ "productId": mug, "quantity": 1 }],
        "customer": { "name": "A", "address": "B", "phone": "C" },
        "shippingOptionId": "courier",
        "distanceKm": 501
    });
    let (status, body) = send(&app, "POST", "/api/checkout", Some(request)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "delivery_unavailable");
}

#[tokio::test]
async fn test_checkout_rejects_disabled_payment_method() {
    let (app, catalog, _dir) = setup_test_app();
    let mug = seed(&catalog, "Mug", dec!(12.50), 10);

    let disable = json!({ "id": "paypal", "name": "PayPal", "enabled": false });
    let (status, _) = send(&app, "PUT", "/api/settings/payment/paypal", Some(disable)).await;
    assert_eq!(status, StatusCode::OK);

    let request = json!({
        "items": [{ "productId": mug, "quantity": 1 }],
        "customer": { "name": "A", "address": "B", "phone": "C" },
        "paymentMethodId": "paypal"
    });
    let (status, _) = send(&app, "POST", "/api/checkout", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
