//! Shopping cart and order e-mail composition
//!
//! Carts belong to the client session and are never stored. At checkout the
//! server rebuilds a [`Cart`] from product ids, prices it, and turns it into an
//! [`OrderEmail`] the customer sends from their own mail client.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{CustomerDetails, PaymentMethod, Product};

pub const ORDER_SUBJECT: &str = "New Order";

/// A product snapshot with a positive quantity
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `quantity` of `product`, merging with an existing line
    pub fn add(&mut self, product: Product, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem { product, quantity }),
        }
    }

    /// Sets the quantity of a line; zero removes it
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
        } else if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) {
            item.quantity = quantity;
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product.id != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of units across all lines
    pub fn total_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Lines whose quantity exceeds the product's stock
    pub fn over_stock(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter().filter(|i| i.quantity > i.product.stock)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Message the customer sends to the shop
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub mailto_link: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub lines: Vec<OrderLine>,
    pub item_count: u32,
    pub subtotal: Decimal,
    pub shipping_option_id: String,
    pub shipping: Decimal,
    pub total: Decimal,
    pub payment_method: String,
    pub customer: CustomerDetails,
    pub email: OrderEmail,
}

/// Prices a cart and composes the order e-mail
pub fn build_order(
    cart: &Cart,
    customer: CustomerDetails,
    shipping_option_id: &str,
    shipping: Decimal,
    payment: &PaymentMethod,
    shop_email: &str,
) -> OrderSummary {
    let lines = cart
        .items()
        .iter()
        .map(|item| OrderLine {
            product_id: item.product.id.clone(),
            title: item.product.title.clone(),
            quantity: item.quantity,
            unit_price: item.product.price,
            line_total: item.line_total(),
        })
        .collect::<Vec<_>>();

    let subtotal = cart.subtotal();
    let total = subtotal + shipping;
    let body = order_body(&lines, &customer, shipping, total, &payment.name);

    OrderSummary {
        email: OrderEmail {
            to: shop_email.to_string(),
            subject: ORDER_SUBJECT.to_string(),
            mailto_link: mailto_link(shop_email, ORDER_SUBJECT, &body),
            body,
        },
        lines,
        item_count: cart.total_count(),
        subtotal,
        shipping_option_id: shipping_option_id.to_string(),
        shipping,
        total,
        payment_method: payment.name.clone(),
        customer,
    }
}

fn order_body(
    lines: &[OrderLine],
    customer: &CustomerDetails,
    shipping: Decimal,
    total: Decimal,
    payment: &str,
) -> String {
    let mut body = String::from("Order Details:\r\n");
    for line in lines {
        body.push_str(&format!("{} - Quantity: {}\r\n", line.title, line.quantity));
    }
    body.push_str(&format!("Shipping: {shipping:.2}\r\n"));
    body.push_str(&format!("Total: {total:.2}\r\n"));
    body.push_str(&format!("Payment: {payment}\r\n"));

    body.push_str("\r\nCustomer Details:\r\n");
    body.push_str(&format!("Name: {}\r\n", customer.name));
    body.push_str(&format!("Address: {}\r\n", customer.address));
    body.push_str(&format!("Phone: {}\r\n", customer.phone));
    body.push_str(&format!("Message: {}\r\n", customer.message));
    body
}

/// `mailto:` link with percent-encoded subject and body
pub fn mailto_link(to: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{to}?subject={}&body={}",
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}
