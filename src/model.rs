//! Data models for the storefront
//!
//! Catalog records, store settings, and the request/response shapes used by
//! the HTTP API. All JSON field names are camelCase, which is also the layout
//! of the backup files.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Seller shown on a product page
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Seller {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

/// A customer review attached to a product
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub user_name: String,

    /// Star rating, 0 to 5
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub helpful: u32,
}

/// A catalog record as stored in the database
///
/// The store owns these exclusively. Admins create, edit and delete them;
/// customers only append reviews.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Generated 24-character hex identifier
    pub id: String,
    pub title: String,
    pub description: String,

    /// Unit price in the store currency
    pub price: Decimal,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,
    pub stock: u32,

    /// Average review rating, 0 to 5
    #[serde(default)]
    pub rating: f64,

    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub seller: Seller,
}

/// Admin submission for a new product
///
/// Sent as the `product` field of the multipart form; media URLs come from
/// the uploaded files, so they are not part of this payload.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,
    pub stock: u32,

    #[serde(default)]
    pub seller: Seller,
}

impl NewProduct {
    /// Checks the required fields an admin must fill in
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is required".into());
        }
        if self.description.trim().is_empty() {
            return Err("description is required".into());
        }
        if self.category.trim().is_empty() {
            return Err("category is required".into());
        }
        if self.price.is_sign_negative() {
            return Err("price must not be negative".into());
        }
        Ok(())
    }
}

/// Partial update from the admin dashboard; absent fields are left untouched
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub stock: Option<u32>,
    pub seller: Option<Seller>,
}

impl ProductUpdate {
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
        ] {
            if value.as_ref().is_some_and(|v| v.trim().is_empty()) {
                return Err(format!("{field} must not be empty"));
            }
        }
        if self.price.is_some_and(|p| p.is_sign_negative()) {
            return Err("price must not be negative".into());
        }
        Ok(())
    }

    pub(crate) fn apply(self, product: &mut Product) {
        if let Some(title) = self.title {
            product.title = title;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(video_url) = self.video_url {
            product.video_url = Some(video_url).filter(|url| !url.is_empty());
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(tags) = self.tags {
            product.tags = tags;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(seller) = self.seller {
            product.seller = seller;
        }
    }
}

/// Review submitted by a customer
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub user_id: String,
    pub user_name: String,
    pub rating: u8,

    #[serde(default)]
    pub comment: String,
}

/// Sort order for catalog listings
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Price,
    Rating,
    Newest,
}

/// Query parameters for listing products
///
/// # Example
/// Query string: `?category=Shoes&minPrice=10&sortBy=price&page=2&limit=20`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,

    /// Minimum average rating
    pub rating: Option<f64>,
    pub sort_by: Option<SortBy>,

    /// Page number, starting from 1
    pub page: Option<usize>,

    /// Items per page, at most 100
    pub limit: Option<usize>,
}

impl ListParams {
    pub fn matches(&self, product: &Product) -> bool {
        self.category
            .as_ref()
            .is_none_or(|c| product.category.eq_ignore_ascii_case(c))
            && self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
            && self.rating.is_none_or(|r| product.rating >= r)
    }
}

/// A shipping method offered at checkout
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    #[serde(default)]
    pub id: String,
    pub name: String,

    /// Flat price, used when the option is not distance-based
    #[serde(default)]
    pub price: Decimal,

    /// Delivery time label, e.g. "3-5"
    pub days: String,

    #[serde(default)]
    pub is_default: bool,

    #[serde(default)]
    pub is_distance_based: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_km: Option<Decimal>,

    /// Cutoff in kilometers beyond which the option cannot deliver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
}

impl ShippingOption {
    pub fn flat(id: &str, name: &str, price: Decimal, days: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            days: days.to_string(),
            is_default: false,
            is_distance_based: false,
            base_price: None,
            price_per_km: None,
            max_distance: None,
        }
    }

    pub fn distance_based(
        id: &str,
        name: &str,
        base_price: Decimal,
        price_per_km: Decimal,
        max_distance: f64,
    ) -> Self {
        Self {
            is_distance_based: true,
            base_price: Some(base_price),
            price_per_km: Some(price_per_km),
            max_distance: Some(max_distance),
            ..Self::flat(id, name, Decimal::ZERO, "")
        }
    }

    /// Distance-based options need all three pricing fields, none negative,
    /// and a finite max distance
    pub fn is_complete(&self) -> bool {
        if !self.is_distance_based {
            return true;
        }
        let non_negative = |d: Option<Decimal>| d.is_some_and(|d| !d.is_sign_negative());

        non_negative(self.base_price)
            && non_negative(self.price_per_km)
            && self
                .max_distance
                .is_some_and(|km| km.is_finite() && km >= 0.0)
    }
}

/// A payment method the customer may pick at checkout
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub enabled: bool,

    #[serde(default)]
    pub is_default: bool,
}

/// Coordinates and address of the store, origin for distance-based shipping
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreLocation {
    pub lat: f64,
    pub lng: f64,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub city: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingSettings {
    pub options: Vec<ShippingOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_location: Option<StoreLocation>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaymentSettings {
    pub methods: Vec<PaymentMethod>,
}

/// All admin-configurable store settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub shipping: ShippingSettings,
    pub payment: PaymentSettings,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let mut standard = ShippingOption::flat("standard", "Standard Shipping", dec!(5.99), "3-5");
        standard.is_default = true;

        let method = |id: &str, name: &str, is_default: bool| PaymentMethod {
            id: id.to_string(),
            name: name.to_string(),
            enabled: true,
            is_default,
        };

        Self {
            shipping: ShippingSettings {
                options: vec![
                    standard,
                    ShippingOption::flat("express", "Express Shipping", dec!(9.99), "1-2"),
                    ShippingOption::flat("pickup", "Local Pickup", Decimal::ZERO, "1"),
                ],
                store_location: None,
            },
            payment: PaymentSettings {
                methods: vec![
                    method("card", "Credit/Debit Card", true),
                    method("paypal", "PayPal", false),
                    method("cash", "Cash on Delivery", false),
                ],
            },
        }
    }
}

/// Latitude/longitude pair in decimal degrees
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Request body for `POST /api/shipping/quote`
///
/// Either `distanceKm` or `destination` may be given; the destination is
/// measured against the configured store location.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub option_id: String,
    pub distance_km: Option<f64>,
    pub destination: Option<Coordinates>,
}

/// One cart line sent at checkout
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Customer details typed into the checkout form
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CustomerDetails {
    pub name: String,
    pub address: String,
    pub phone: String,

    #[serde(default)]
    pub message: String,
}

/// Request body for `POST /api/checkout`
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub customer: CustomerDetails,

    /// Falls back to the default shipping option
    pub shipping_option_id: Option<String>,

    /// Falls back to the default payment method
    pub payment_method_id: Option<String>,
    pub distance_km: Option<f64>,
    pub destination: Option<Coordinates>,
}
