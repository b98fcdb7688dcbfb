//! HTTP request handlers for the storefront API
//!
//! This module implements the request-level logic for:
//! - Browsing, creating, editing and deleting catalog products
//! - Appending customer reviews
//! - Reading and changing store settings
//! - Quoting shipping costs
//! - Checking out a cart into an order e-mail

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::cart::{build_order, Cart, OrderSummary};
use crate::database::AppState;
use crate::error::AppError;
use crate::geo;
use crate::media::{MediaKind, MAX_IMAGES, MAX_VIDEOS};
use crate::model::{
    CheckoutRequest, Coordinates, ListParams, NewProduct, NewReview, PaymentMethod, Product,
    ProductUpdate, QuoteRequest, ShippingOption, SortBy, StoreLocation, StoreSettings,
};
use crate::shipping::{resolve_shipping_cost, ShippingQuote};

/// Welcome message at the site root
pub async fn welcome() -> impl IntoResponse {
    Json(json!({ "message": "Storefront API is running!" }))
}

/// Health check
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "API is running" }))
}

/// Lists products with optional filtering, sorting and pagination
///
/// # Query Parameters
///
/// - `category` - exact category match, case-insensitive
/// - `minPrice` / `maxPrice` - inclusive price bounds
/// - `rating` - minimum average rating
/// - `sortBy` - `price` (ascending), `rating` (descending) or `newest`
/// - `page` / `limit` - pagination, only applied when either is given;
///   `limit` defaults to 10 and is capped at 100
///
/// # Response
///
/// A JSON array of products.
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Product>>, AppError> {
    let mut products: Vec<Product> = state
        .catalog
        .list()?
        .into_iter()
        .filter(|p| params.matches(p))
        .collect();

    match params.sort_by {
        Some(SortBy::Price) => products.sort_by(|a, b| a.price.cmp(&b.price)),
        Some(SortBy::Rating) => products.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        Some(SortBy::Newest) => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        None => {}
    }

    if params.page.is_some() || params.limit.is_some() {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(10).clamp(1, 100);
        products = products
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();
    }

    Ok(Json(products))
}

/// Creates a product from an admin submission
///
/// # Request Body
///
/// `multipart/form-data` with:
/// - `product` - JSON-encoded [`NewProduct`]
/// - `images` - up to 5 image files
/// - `video` - at most 1 video file
///
/// # Response
///
/// - **201 Created** - the stored product
/// - **400 Bad Request** - missing/invalid product or unsupported media
pub async fn create_product(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut product: Option<NewProduct> = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "product" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| AppError::Validation(format!("invalid product: {e}")))?;
                product = Some(parsed);
            }
            "images" | "video" => {
                let kind = if name == "images" {
                    MediaKind::Image
                } else {
                    MediaKind::Video
                };
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                uploads.push((kind, file_name, content_type, bytes));
            }
            _ => {}
        }
    }

    let product = product.ok_or_else(|| AppError::Validation("product field is required".into()))?;
    product.validate().map_err(AppError::Validation)?;

    let count = |kind: MediaKind| uploads.iter().filter(|(k, ..)| *k == kind).count();
    if count(MediaKind::Image) > MAX_IMAGES || count(MediaKind::Video) > MAX_VIDEOS {
        return Err(AppError::Validation(format!(
            "at most {MAX_IMAGES} images and {MAX_VIDEOS} video per product"
        )));
    }

    let mut images = Vec::new();
    let mut video_url = None;
    for (kind, file_name, content_type, bytes) in uploads {
        let url = state
            .media
            .save(kind, &file_name, &content_type, &bytes)
            .await?;
        match kind {
            MediaKind::Image => images.push(url),
            MediaKind::Video => video_url = Some(url),
        }
    }

    let created = state.catalog.create(product, images, video_url)?;
    info!(id = %created.id, title = %created.title, "product created");

    Ok((StatusCode::CREATED, Json(created)))
}

/// Fetches one product
///
/// - **200 OK** - the product
/// - **404 Not Found** - no product with this id
pub async fn get_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Product>, AppError> {
    state
        .catalog
        .get(&id)?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

/// Applies an admin edit; absent fields are left unchanged
pub async fn update_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>, AppError> {
    update.validate().map_err(AppError::Validation)?;

    let updated = state
        .catalog
        .update(&id, update)?
        .ok_or(AppError::NotFound("product"))?;
    info!(id = %updated.id, "product updated");

    Ok(Json(updated))
}

/// Deletes a product
///
/// - **200 OK** - product deleted
/// - **404 Not Found** - no product with this id
pub async fn delete_product(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state
        .catalog
        .delete(&id)?
        .ok_or(AppError::NotFound("product"))?;
    info!(id = %id, "product deleted");

    Ok(Json(json!({
        "message": "Product deleted successfully",
        "deletedId": id
    })))
}

/// Appends a customer review and returns the updated product
pub async fn add_review(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(review): Json<NewReview>,
) -> Result<impl IntoResponse, AppError> {
    if review.rating > 5 {
        return Err(AppError::Validation("rating must be between 0 and 5".into()));
    }
    if review.user_name.trim().is_empty() {
        return Err(AppError::Validation("userName is required".into()));
    }

    let product = state
        .catalog
        .append_review(&id, review)?
        .ok_or(AppError::NotFound("product"))?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_settings(State(state): State<AppState>) -> Json<StoreSettings> {
    Json(state.settings.settings())
}

pub async fn add_shipping_option(
    State(state): State<AppState>,
    Json(option): Json<ShippingOption>,
) -> Result<impl IntoResponse, AppError> {
    let option = state.settings.add_shipping_option(option)?;
    Ok((StatusCode::CREATED, Json(option)))
}

/// Replaces a shipping option; the id in the path wins over the body
pub async fn update_shipping_option(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(option): Json<ShippingOption>,
) -> Result<Json<ShippingOption>, AppError> {
    let option = ShippingOption { id, ..option };
    Ok(Json(state.settings.update_shipping_option(option)?))
}

pub async fn delete_shipping_option(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.settings.delete_shipping_option(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_default_shipping_option(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoreSettings>, AppError> {
    state.settings.set_default_shipping_option(&id)?;
    Ok(Json(state.settings.settings()))
}

/// Replaces a payment method; the id in the path wins over the body
pub async fn update_payment_method(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(method): Json<PaymentMethod>,
) -> Result<Json<PaymentMethod>, AppError> {
    let method = PaymentMethod { id, ..method };
    Ok(Json(state.settings.update_payment_method(method)?))
}

pub async fn set_default_payment_method(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoreSettings>, AppError> {
    state.settings.set_default_payment_method(&id)?;
    Ok(Json(state.settings.settings()))
}

pub async fn set_store_location(
    State(state): State<AppState>,
    Json(location): Json<StoreLocation>,
) -> Result<Json<StoreSettings>, AppError> {
    state.settings.set_store_location(location)?;
    Ok(Json(state.settings.settings()))
}

/// Quotes a shipping option for a distance or a destination
///
/// # Response
///
/// ```json
/// { "status": "ok", "price": 14.99 }
/// { "status": "unavailable" }
/// ```
pub async fn quote_shipping(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<ShippingQuote>, AppError> {
    let distance = resolve_distance(&state, request.distance_km, request.destination)?;
    let quote = resolve_shipping_cost(
        &state.settings.shipping_options(),
        &request.option_id,
        distance,
    )?;

    Ok(Json(quote))
}

/// Prices a cart and returns the order e-mail for the customer to send
///
/// Nothing is stored; stock is checked but not reserved.
///
/// - **200 OK** - order summary with e-mail and `mailto:` link
/// - **400 Bad Request** - empty cart, bad quantities or customer details
/// - **404 Not Found** - unknown product or payment method
/// - **422 Unprocessable Entity** - destination beyond the shipping range
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<OrderSummary>, AppError> {
    if request.items.is_empty() {
        return Err(AppError::Validation("cart is empty".into()));
    }
    let customer = &request.customer;
    if [&customer.name, &customer.address, &customer.phone]
        .iter()
        .any(|v| v.trim().is_empty())
    {
        return Err(AppError::Validation(
            "name, address and phone are required".into(),
        ));
    }

    let mut cart = Cart::new();
    for item in &request.items {
        if item.quantity == 0 {
            return Err(AppError::Validation("quantities must be positive".into()));
        }
        let product = state
            .catalog
            .get(&item.product_id)?
            .ok_or(AppError::NotFound("product"))?;
        cart.add(product, item.quantity);
    }

    if let Some(item) = cart.over_stock().next() {
        return Err(AppError::Validation(format!(
            "only {} of {} in stock",
            item.product.stock, item.product.title
        )));
    }

    let settings = state.settings.settings();

    let option_id = match request.shipping_option_id {
        Some(id) => id,
        None => settings
            .shipping
            .options
            .iter()
            .find(|o| o.is_default)
            .map(|o| o.id.clone())
            .ok_or_else(|| AppError::Validation("no shipping option selected".into()))?,
    };
    let distance = resolve_distance(&state, request.distance_km, request.destination)?;
    let shipping = resolve_shipping_cost(&settings.shipping.options, &option_id, distance)?
        .price()
        .ok_or(AppError::DeliveryUnavailable)?;

    let payment = settings
        .payment
        .methods
        .iter()
        .find(|m| match &request.payment_method_id {
            Some(id) => &m.id == id,
            None => m.is_default,
        })
        .ok_or(AppError::NotFound("payment method"))?;
    if !payment.enabled {
        return Err(AppError::Validation(format!(
            "payment method {} is disabled",
            payment.name
        )));
    }

    let order = build_order(
        &cart,
        request.customer,
        &option_id,
        shipping,
        payment,
        &state.config.order_email,
    );
    info!(
        items = order.item_count,
        total = %order.total,
        shipping = %order.shipping_option_id,
        "order composed"
    );

    Ok(Json(order))
}

/// An explicit distance wins; otherwise the destination is measured from the
/// configured store location
fn resolve_distance(
    state: &AppState,
    distance_km: Option<f64>,
    destination: Option<Coordinates>,
) -> Result<Option<f64>, AppError> {
    if distance_km.is_some() {
        return Ok(distance_km);
    }
    let Some(destination) = destination else {
        return Ok(None);
    };

    let origin = state
        .settings
        .store_location()
        .ok_or_else(|| AppError::Validation("store location is not configured".into()))?;
    let origin = Coordinates {
        lat: origin.lat,
        lng: origin.lng,
    };

    Ok(Some(f64::from(geo::distance_km(origin, destination))))
}
