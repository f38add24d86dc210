//! Catalog reads and seller-side product management.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use feira_domain::{
    Category, FeiraError, NewProduct, Product, ProductFilter, ProductPatch, CATEGORIES_TABLE,
    PRODUCTS_TABLE,
};

use crate::api::client::StoreClient;
use crate::errors::IntoFeiraError;

pub struct ProductService {
    client: Arc<StoreClient>,
}

impl ProductService {
    pub fn new(client: Arc<StoreClient>) -> Self {
        Self { client }
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, FeiraError> {
        self.client
            .select(CATEGORIES_TABLE, &[])
            .await
            .into_result()
            .map_err(|e| e.into_feira())
    }

    /// Lists products, optionally narrowed to one seller or one category.
    pub async fn fetch_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, FeiraError> {
        let mut filters: Vec<(&str, String)> = Vec::new();
        if let Some(seller_id) = filter.seller_id {
            filters.push(("seller_id", seller_id.to_string()));
        }
        if let Some(category_id) = filter.category_id {
            filters.push(("category_id", category_id.to_string()));
        }
        self.client
            .select(PRODUCTS_TABLE, &filters)
            .await
            .into_result()
            .map_err(|e| e.into_feira())
    }

    pub async fn add_product(&self, product: &NewProduct) -> Result<Product, FeiraError> {
        let stored: Product = self
            .client
            .insert_returning(PRODUCTS_TABLE, product)
            .await
            .into_result()
            .map_err(|e| e.into_feira())?;
        info!(product_id = %stored.id, seller_id = %stored.seller_id, "product created");
        Ok(stored)
    }

    /// Applies only the fields set in `patch`; unset fields are untouched.
    pub async fn update_product(&self, id: Uuid, patch: &ProductPatch) -> Result<(), FeiraError> {
        self.client
            .update_by_id(PRODUCTS_TABLE, id, patch)
            .await
            .error
            .map_or(Ok(()), |err| Err(err.into_feira()))
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<(), FeiraError> {
        self.client
            .delete_by_id(PRODUCTS_TABLE, id)
            .await
            .error
            .map_or(Ok(()), |err| Err(err.into_feira()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feira_domain::{BackendConfig, Config, RetrySettings};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> ProductService {
        let config = Config {
            backend: BackendConfig {
                url: server.uri(),
                anon_key: "test-anon-key".to_string(),
            },
            retry: RetrySettings {
                max_attempts: 2,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                backoff_multiplier: 2.0,
            },
        };
        ProductService::new(Arc::new(StoreClient::new(&config).unwrap()))
    }

    #[tokio::test]
    async fn fetch_products_filters_by_seller() {
        let server = MockServer::start().await;
        let seller_id = Uuid::from_u128(5);
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("seller_id", format!("eq.{seller_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": Uuid::from_u128(1),
                "name": "Manga Palmer",
                "description": "Doce e madura",
                "price": 8.5,
                "stock": 12,
                "image_url": null,
                "category_id": null,
                "seller_id": seller_id,
                "created_at": null
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        let filter = ProductFilter {
            seller_id: Some(seller_id),
            category_id: None,
        };
        let products = service.fetch_products(&filter).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Manga Palmer");
    }

    #[tokio::test]
    async fn missing_table_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/categories"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "relation does not exist"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        let err = service.fetch_categories().await.unwrap_err();
        assert!(matches!(err, FeiraError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_succeeds_on_no_content() {
        let server = MockServer::start().await;
        let id = Uuid::from_u128(3);
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/products"))
            .and(query_param("id", format!("eq.{id}")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        assert!(service.delete_product(id).await.is_ok());
    }
}
