//! # Feira Infrastructure
//!
//! Remote-backend client for the Feira storefront.
//!
//! This crate contains:
//! - The HTTP client over the hosted backend's REST, auth and storage
//!   surfaces
//! - Data services (auth, products, orders, storage, health) that funnel
//!   every call through the resilience layer in `feira-common`
//! - Configuration loading from environment variables or files
//!
//! ## Architecture
//! - Depends on `feira-domain` for types and `feira-common` for resilience
//! - Contains all "impure" code (network I/O, environment access)

pub mod api;
pub mod config;
pub mod errors;

// Re-export commonly used items
pub use api::{
    check_backend_health, AuthService, OrderService, ProductService, StorageService, StoreClient,
};
pub use errors::IntoFeiraError;
