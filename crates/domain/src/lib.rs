//! # Feira Domain
//!
//! Business domain types and models for the Feira storefront.
//!
//! This crate contains:
//! - Domain data types (User, Product, Order, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants (table and bucket names)
//!
//! ## Architecture
//! - No dependencies on other Feira crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use constants::*;
pub use errors::*;
pub use types::*;
