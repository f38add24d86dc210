//! Checkout and order history.
//!
//! A cart may mix products from several sellers. Checkout splits it into
//! one order per seller so each seller sees only their own sales.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use feira_domain::{
    CartItem, FeiraError, NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, ORDERS_TABLE,
    ORDER_ITEMS_TABLE, PRODUCTS_TABLE,
};

use crate::api::client::StoreClient;
use crate::errors::IntoFeiraError;

#[derive(Debug, Deserialize)]
struct SellerRef {
    seller_id: Uuid,
}

pub struct OrderService {
    client: Arc<StoreClient>,
}

impl OrderService {
    pub fn new(client: Arc<StoreClient>) -> Self {
        Self { client }
    }

    /// Places one order per seller represented in the cart.
    ///
    /// Returns the stored orders in seller-id order. Stock decrements run
    /// after each order commits; a failed decrement is logged and skipped
    /// rather than failing a checkout that has already been accepted.
    pub async fn place_orders(
        &self,
        buyer_id: Uuid,
        items: &[CartItem],
        delivery_address: &str,
        payment_method: PaymentMethod,
    ) -> Result<Vec<Order>, FeiraError> {
        if items.is_empty() {
            return Err(FeiraError::InvalidInput("cart is empty".to_string()));
        }

        let grouped = self.group_by_seller(items).await?;
        let mut orders = Vec::with_capacity(grouped.len());

        for (seller_id, seller_items) in grouped {
            let total_price = seller_items.iter().map(CartItem::line_total).sum();
            let new_order = NewOrder {
                buyer_id,
                seller_id,
                total_price,
                delivery_address: delivery_address.to_string(),
                payment_method,
                status: OrderStatus::Pending,
            };
            let order: Order = self
                .client
                .insert_returning(ORDERS_TABLE, &new_order)
                .await
                .into_result()
                .map_err(|e| e.into_feira())?;
            info!(order_id = %order.id, seller_id = %seller_id, total = total_price, "order placed");

            let rows: Vec<OrderItem> = seller_items
                .iter()
                .map(|item| OrderItem {
                    order_id: order.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect();
            let result = self.client.insert_rows(ORDER_ITEMS_TABLE, &rows).await;
            if let Some(err) = result.error {
                return Err(err.into_feira());
            }

            self.decrement_stock(&seller_items).await;
            orders.push(order);
        }

        Ok(orders)
    }

    /// Orders placed by a buyer, or received by a seller.
    pub async fn fetch_orders_for(
        &self,
        column: &str,
        user_id: Uuid,
    ) -> Result<Vec<Order>, FeiraError> {
        self.client
            .select(ORDERS_TABLE, &[(column, user_id.to_string())])
            .await
            .into_result()
            .map_err(|e| e.into_feira())
    }

    pub async fn buyer_orders(&self, buyer_id: Uuid) -> Result<Vec<Order>, FeiraError> {
        self.fetch_orders_for("buyer_id", buyer_id).await
    }

    pub async fn seller_orders(&self, seller_id: Uuid) -> Result<Vec<Order>, FeiraError> {
        self.fetch_orders_for("seller_id", seller_id).await
    }

    /// Moves an order through its lifecycle (pending, processing,
    /// completed, cancelled).
    pub async fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<(), FeiraError> {
        self.client
            .update_by_id(ORDERS_TABLE, order_id, &json!({ "status": status }))
            .await
            .error
            .map_or(Ok(()), |err| Err(err.into_feira()))
    }

    /// Looks up each product's seller and buckets the cart accordingly.
    /// BTreeMap keeps the resulting order list deterministic.
    async fn group_by_seller(
        &self,
        items: &[CartItem],
    ) -> Result<BTreeMap<Uuid, Vec<CartItem>>, FeiraError> {
        let mut grouped: BTreeMap<Uuid, Vec<CartItem>> = BTreeMap::new();
        for item in items {
            let product_id = item.product_id.to_string();
            let seller: SellerRef = self
                .client
                .select_one(PRODUCTS_TABLE, "id", &product_id)
                .await
                .into_result()
                .map_err(|e| e.into_feira())?;
            grouped
                .entry(seller.seller_id)
                .or_default()
                .push(item.clone());
        }
        Ok(grouped)
    }

    async fn decrement_stock(&self, items: &[CartItem]) {
        for item in items {
            let remaining = item.stock - i64::from(item.quantity);
            let result = self
                .client
                .update_by_id(PRODUCTS_TABLE, item.product_id, &json!({ "stock": remaining }))
                .await;
            if let Some(err) = result.error {
                warn!(product_id = %item.product_id, error = %err, "stock decrement failed");
            }
        }
    }
}
