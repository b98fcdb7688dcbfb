//! Error types for every layer of the storefront
//!
//! Each layer has its own `thiserror` enum. HTTP handlers convert all of them
//! into [`AppError`], which renders a JSON body with a stable `code` field.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the embedded document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the backup and restore job
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("catalog store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("backup file I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backup file {path} is malformed: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid backup file name: {0}")]
    InvalidFileName(String),
}

/// Violations of the store settings invariants
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("shipping option {0} not found")]
    ShippingOptionNotFound(String),

    #[error("shipping option {0} already exists")]
    DuplicateShippingOption(String),

    #[error("cannot delete the default shipping option")]
    DeleteDefaultShippingOption,

    #[error("cannot delete the only shipping option")]
    DeleteLastShippingOption,

    #[error("distance-based option {0} needs non-negative base price, price per km and max distance")]
    IncompleteDistanceOption(String),

    #[error("payment method {0} not found")]
    PaymentMethodNotFound(String),

    #[error("at least one payment method must stay enabled")]
    LastEnabledPaymentMethod,

    #[error("the default payment method must be enabled")]
    DisabledDefaultPaymentMethod,

    #[error("settings storage failed: {0}")]
    Persistence(String),
}

/// Errors raised while pricing a shipping option
#[derive(Debug, Error, PartialEq)]
pub enum ShippingError {
    #[error("shipping option {0} is distance-based and needs a distance")]
    DistanceRequired(String),

    #[error("distance-based option {0} is missing its pricing fields")]
    IncompleteDistanceOption(String),

    #[error("invalid distance: {0}")]
    InvalidDistance(f64),
}

/// Errors raised while storing uploaded media
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to store media file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported media type for {0}")]
    UnsupportedType(String),
}

/// Error returned from HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("delivery unavailable for this distance")]
    DeliveryUnavailable,

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::DeliveryUnavailable => {
                (StatusCode::UNPROCESSABLE_ENTITY, "delivery_unavailable")
            }
            AppError::Settings(SettingsError::ShippingOptionNotFound(_))
            | AppError::Settings(SettingsError::PaymentMethodNotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            AppError::Settings(SettingsError::Persistence(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            AppError::Settings(_) => (StatusCode::CONFLICT, "settings_conflict"),
            AppError::Shipping(_) => (StatusCode::BAD_REQUEST, "shipping_error"),
            AppError::Media(MediaError::UnsupportedType(_)) => {
                (StatusCode::BAD_REQUEST, "unsupported_media")
            }
            AppError::Store(_) | AppError::Media(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Internal details stay in the log
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
