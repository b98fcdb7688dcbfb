//! Storefront backend: product catalog, store settings, shipping quotes,
//! checkout and catalog backups
//!
//! This module exposes internal components for the binaries and tests.

pub mod backup;
pub mod cart;
pub mod config;
pub mod database;
pub mod error;
pub mod geo;
pub mod handler;
pub mod media;
pub mod middleware;
pub mod model;
pub mod retry;
pub mod route;
pub mod settings;
pub mod shipping;
