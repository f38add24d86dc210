//! Domain constants shared by the backend client and services.

/// Table holding user profiles (distinct from the auth provider's own users).
pub const USERS_TABLE: &str = "users";

/// Table holding product listings.
pub const PRODUCTS_TABLE: &str = "products";

/// Table holding product categories.
pub const CATEGORIES_TABLE: &str = "categories";

/// Table holding orders, one row per buyer/seller pair at checkout.
pub const ORDERS_TABLE: &str = "orders";

/// Table holding the line items of an order.
pub const ORDER_ITEMS_TABLE: &str = "order_items";

/// Storage bucket for product images.
pub const PRODUCTS_BUCKET: &str = "products";

/// Storage bucket for user avatars.
pub const AVATARS_BUCKET: &str = "avatars";
