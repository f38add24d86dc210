//! Remote backend client and data services.
//!
//! `StoreClient` owns the HTTP plumbing; the services own the flows the
//! screens call (login, checkout, product CRUD, image upload). Everything
//! here goes through the resilience layer in `feira-common`.

pub mod auth;
pub mod client;
pub mod health;
pub mod orders;
pub mod products;
pub mod storage;

pub use auth::AuthService;
pub use client::StoreClient;
pub use health::check_backend_health;
pub use orders::OrderService;
pub use products::ProductService;
pub use storage::StorageService;
