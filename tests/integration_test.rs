//! Integration tests for the catalog API
//!
//! These tests verify the entire application stack including:
//! - HTTP routing
//! - Multipart product submission and media serving
//! - Database operations
//! - Error handling

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

const BOUNDARY: &str = "storefront-test-boundary";

/// Creates a test application backed by a temporary directory
fn setup_test_app() -> (axum::Router, CatalogStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let catalog = CatalogStore::open(dir.path().join("test.db"))
        .expect("Failed to initialize test database");
    let config = Config {
        media_dir: dir.path().join("media"),
        ..Config::default()
    };
    let state = AppState::new(catalog.clone(), config).expect("Failed to load settings");

    (create_app(state), catalog, dir)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

/// Builds a `multipart/form-data` body with a `product` field and files
fn multipart_body(product: Option<&Value>, files: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(product) = product {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"product\"\r\n\r\n{product}\r\n"
            )
            .as_bytes(),
        );
    }
    for (field, file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn create_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/products")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn product_payload() -> Value {
    json!({
        "title": "Ceramic Mug",
        "description": "Hand-glazed, 350ml",
        "price": 12.5,
        "category": "Kitchen",
        "tags": ["mug", "ceramic"],
        "stock": 8,
        "seller": { "id": "s1", "name": "Studio", "avatar": "" }
    })
}

fn new_product(title: &str, category: &str, price: rust_decimal::Decimal) -> NewProduct {
    NewProduct {
        title: title.into(),
        description: format!("{title} description"),
        price,
        category: category.into(),
        tags: Vec::new(),
        stock: 5,
        seller: Seller::default(),
    }
}

#[tokio::test]
async fn test_welcome_and_health() {
    let (app, _catalog, _dir) = setup_test_app();

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api")).await.unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["status"], "API is running");
}

#[tokio::test]
async fn test_create_product_with_media() {
    let (app, _catalog, _dir) = setup_test_app();

    let body = multipart_body(
        Some(&product_payload()),
        &[
            ("images", "front.png", "image/png", &b"front-bytes"[..]),
            ("images", "back.jpg", "image/jpeg", &b"back-bytes"[..]),
            ("video", "spin.mp4", "video/mp4", &b"video-bytes"[..]),
        ],
    );
    let response = app.clone().oneshot(create_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["title"], "Ceramic Mug");
    assert_eq!(body["price"], 12.5);
    assert_eq!(body["rating"], 0.0);
    assert_eq!(body["reviews"], json!([]));
    assert_eq!(body["id"].as_str().unwrap().len(), 24);

    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    let video = body["videoUrl"].as_str().unwrap();
    assert!(video.starts_with("/media/") && video.ends_with(".mp4"));

    // Uploaded files are served back
    let image_url = images[0].as_str().unwrap();
    let response = app.oneshot(get(image_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"front-bytes");
}

#[tokio::test]
async fn test_create_product_requires_product_field() {
    let (app, catalog, _dir) = setup_test_app();

    let body = multipart_body(None, &[("images", "a.png", "image/png", &b"x"[..])]);
    let response = app.oneshot(create_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(catalog.count().unwrap(), 0);
}

#[tokio::test]
async fn test_create_product_validates_fields() {
    let (app, catalog, _dir) = setup_test_app();

    let mut payload = product_payload();
    payload["title"] = json!("  ");
    let response = app
        .oneshot(create_request(multipart_body(Some(&payload), &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "validation_error");
    assert_eq!(catalog.count().unwrap(), 0);
}

#[tokio::test]
async fn test_create_product_rejects_too_many_images() {
    let (app, catalog, _dir) = setup_test_app();

    let files: Vec<(&str, &str, &str, &[u8])> =
        (0..6).map(|_| ("images", "a.png", "image/png", &b"x"[..])).collect();
    let body = multipart_body(Some(&product_payload()), &files);
    let response = app.oneshot(create_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(catalog.count().unwrap(), 0);
}

#[tokio::test]
async fn test_create_product_rejects_wrong_media_type() {
    let (app, _catalog, _dir) = setup_test_app();

    let body = multipart_body(
        Some(&product_payload()),
        &[("images", "notes.txt", "text/plain", &b"hello"[..])],
    );
    let response = app.oneshot(create_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "unsupported_media");
}

#[tokio::test]
async fn test_get_product() {
    let (app, catalog, _dir) = setup_test_app();
    let product = catalog
        .create(new_product("Lamp", "Home", dec!(40)), Vec::new(), None)
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/products/{}", product.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["title"], "Lamp");

    let response = app.oneshot(get("/api/products/nonexistent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_list_products_filters_and_sorts() {
    let (app, catalog, _dir) = setup_test_app();
    for (title, category, price) in [
        ("Kettle", "Kitchen", dec!(35)),
        ("Pan", "Kitchen", dec!(20)),
        ("Rug", "Home", dec!(80)),
        ("Whisk", "Kitchen", dec!(5)),
    ] {
        catalog
            .create(new_product(title, category, price), Vec::new(), None)
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get("/api/products?category=kitchen&minPrice=10&sortBy=price"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Pan", "Kettle"]);

    let response = app.oneshot(get("/api/products")).await.unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_list_products_pagination() {
    let (app, catalog, _dir) = setup_test_app();
    for i in 1..=15 {
        catalog
            .create(new_product(&format!("Item {i}"), "Bulk", dec!(1)), Vec::new(), None)
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get("/api/products?page=1&limit=10"))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 10);

    let response = app
        .oneshot(get("/api/products?page=2&limit=10"))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_list_products_page_past_the_end() {
    let (app, catalog, _dir) = setup_test_app();
    catalog
        .create(new_product("Only", "Bulk", dec!(1)), Vec::new(), None)
        .unwrap();

    let uri = format!("/api/products?page={}&limit=100", usize::MAX);
    let response = app.oneshot(get(&uri)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_update_product() {
    let (app, catalog, _dir) = setup_test_app();
    let product = catalog
        .create(new_product("Chair", "Home", dec!(60)), Vec::new(), None)
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/products/{}", product.id),
            &json!({ "price": 55.0, "stock": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["price"], 55.0);
    assert_eq!(body["stock"], 2);
    assert_eq!(body["title"], "Chair");

    let stored = catalog.get(&product.id).unwrap().unwrap();
    assert_eq!(stored.price, dec!(55));
    assert_eq!(stored.created_at, product.created_at);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/products/nonexistent",
            &json!({ "stock": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_product() {
    let (app, catalog, _dir) = setup_test_app();
    let product = catalog
        .create(new_product("Vase", "Home", dec!(25)), Vec::new(), None)
        .unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/products/{}", product.id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["deletedId"], product.id.as_str());

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/products/{}", product.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(catalog.count().unwrap(), 0);
}

#[tokio::test]
async fn test_add_review_updates_rating() {
    let (app, catalog, _dir) = setup_test_app();
    let product = catalog
        .create(new_product("Book", "Books", dec!(15)), Vec::new(), None)
        .unwrap();
    let uri = format!("/api/products/{}/reviews", product.id);

    for rating in [5, 3] {
        let review = json!({ "userId": "u1", "userName": "Nikos", "rating": rating, "comment": "ok" });
        let response = app
            .clone()
            .oneshot(json_request("POST", &uri, &review))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let stored = catalog.get(&product.id).unwrap().unwrap();
    assert_eq!(stored.reviews.len(), 2);
    assert_eq!(stored.rating, 4.0);

    let review = json!({ "userId": "u1", "userName": "Nikos", "rating": 6 });
    let response = app
        .oneshot(json_request("POST", &uri, &review))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
