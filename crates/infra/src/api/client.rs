//! HTTP client for the PostgREST-style backend.
//!
//! Every call site hands `StoreClient` a request description rather than a
//! prebuilt request. The description is cheap to rebuild, so each retry
//! attempt issues a fresh request instead of fighting with body reuse.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use feira_common::{QueryResult, RemoteError, RetryConfig, RetryExecutor};
use feira_domain::{Config, FeiraError, RetrySettings};

use crate::errors::transport_error;

/// PostgREST returns a bare object instead of a one-element array when asked.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed to rebuild one REST call from scratch.
struct RestRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl RestRequest {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// Client for the remote store backend.
///
/// Cheap to share behind an `Arc`; the underlying `reqwest::Client` already
/// pools connections.
pub struct StoreClient {
    http: Client,
    base_url: Url,
    executor: RetryExecutor,
}

impl StoreClient {
    /// Builds a client from loaded configuration.
    ///
    /// Fails with [`FeiraError::Config`] when the backend section is still
    /// on placeholder values or the retry settings are inconsistent.
    pub fn new(config: &Config) -> Result<Self, FeiraError> {
        if !config.backend.is_configured() {
            return Err(FeiraError::Config(
                "backend url and anon key are not configured".to_string(),
            ));
        }

        let mut raw_url = config.backend.url.clone();
        if !raw_url.ends_with('/') {
            raw_url.push('/');
        }
        let base_url = Url::parse(&raw_url)
            .map_err(|e| FeiraError::Config(format!("invalid backend url: {e}")))?;

        let mut headers = HeaderMap::new();
        let anon = &config.backend.anon_key;
        let api_key = HeaderValue::from_str(anon)
            .map_err(|e| FeiraError::Config(format!("invalid anon key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {anon}"))
            .map_err(|e| FeiraError::Config(format!("invalid anon key: {e}")))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| FeiraError::Config(format!("failed to build http client: {e}")))?;

        let executor = RetryExecutor::new(retry_config(&config.retry))
            .map_err(|e| FeiraError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            executor,
        })
    }

    /// Fetches all rows from `table` matching the equality `filters`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> QueryResult<Vec<T>> {
        let mut req = RestRequest::new(Method::GET, format!("rest/v1/{table}"));
        req.query.push(("select".to_string(), "*".to_string()));
        for (column, value) in filters {
            req.query.push(((*column).to_string(), format!("eq.{value}")));
        }
        self.run(req).await
    }

    /// Fetches the single row of `table` where `column` equals `value`.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> QueryResult<T> {
        let mut req = RestRequest::new(Method::GET, format!("rest/v1/{table}"));
        req.query.push(("select".to_string(), "*".to_string()));
        req.query.push((column.to_string(), format!("eq.{value}")));
        req.headers.push(("Accept", SINGLE_OBJECT.to_string()));
        self.run(req).await
    }

    /// Inserts one row and returns the stored representation.
    pub async fn insert_returning<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        row: &B,
    ) -> QueryResult<T> {
        let body = match serde_json::to_value(row) {
            Ok(body) => body,
            Err(e) => {
                return QueryResult::err(RemoteError::from_message(format!(
                    "failed to encode row: {e}"
                )))
            }
        };
        let mut req = RestRequest::new(Method::POST, format!("rest/v1/{table}"));
        req.headers.push(("Prefer", "return=representation".to_string()));
        req.headers.push(("Accept", SINGLE_OBJECT.to_string()));
        req.body = Some(body);
        self.run(req).await
    }

    /// Inserts a batch of rows without asking for them back.
    pub async fn insert_rows<B: Serialize>(
        &self,
        table: &str,
        rows: &[B],
    ) -> QueryResult<serde_json::Value> {
        let body = match serde_json::to_value(rows) {
            Ok(body) => body,
            Err(e) => {
                return QueryResult::err(RemoteError::from_message(format!(
                    "failed to encode rows: {e}"
                )))
            }
        };
        let mut req = RestRequest::new(Method::POST, format!("rest/v1/{table}"));
        req.headers.push(("Prefer", "return=minimal".to_string()));
        req.body = Some(body);
        self.run(req).await
    }

    /// Applies `patch` to the row of `table` with the given id.
    pub async fn update_by_id<B: Serialize>(
        &self,
        table: &str,
        id: Uuid,
        patch: &B,
    ) -> QueryResult<serde_json::Value> {
        let body = match serde_json::to_value(patch) {
            Ok(body) => body,
            Err(e) => {
                return QueryResult::err(RemoteError::from_message(format!(
                    "failed to encode patch: {e}"
                )))
            }
        };
        let mut req = RestRequest::new(Method::PATCH, format!("rest/v1/{table}"));
        req.query.push(("id".to_string(), format!("eq.{id}")));
        req.headers.push(("Prefer", "return=minimal".to_string()));
        req.body = Some(body);
        self.run(req).await
    }

    /// Deletes the row of `table` with the given id.
    pub async fn delete_by_id(&self, table: &str, id: Uuid) -> QueryResult<serde_json::Value> {
        let mut req = RestRequest::new(Method::DELETE, format!("rest/v1/{table}"));
        req.query.push(("id".to_string(), format!("eq.{id}")));
        self.run(req).await
    }

    /// POSTs to an auth endpoint and decodes the response body.
    ///
    /// Auth endpoints surface errors directly instead of carrying them in a
    /// result pair, so this uses the throwing call path.
    pub async fn auth_post<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: serde_json::Value,
    ) -> Result<T, RemoteError> {
        let mut req = RestRequest::new(Method::POST, path.to_string());
        for (key, value) in query {
            req.query.push(((*key).to_string(), (*value).to_string()));
        }
        req.body = Some(body);
        self.executor
            .execute(|| async { self.perform::<T>(&req).await.into_result() })
            .await
    }

    /// POSTs to an auth endpoint that replies with an empty body.
    pub async fn auth_post_empty(&self, path: &str) -> Result<(), RemoteError> {
        let req = RestRequest::new(Method::POST, path.to_string());
        self.executor
            .execute(|| async {
                let result: QueryResult<serde_json::Value> = self.perform(&req).await;
                match result.error {
                    Some(err) => Err(err),
                    None => Ok(()),
                }
            })
            .await
    }

    /// Uploads raw bytes into a storage bucket, overwriting any existing
    /// object at the same path.
    pub async fn upload_object(
        &self,
        bucket: &str,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), RemoteError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{object_path}"))?;
        self.executor
            .execute(|| {
                let builder = self
                    .http
                    .post(url.clone())
                    .header(CONTENT_TYPE, content_type)
                    .header(CACHE_CONTROL, "max-age=3600")
                    .header("x-upsert", "true")
                    .body(bytes.clone());
                async move {
                    let response = builder.send().await.map_err(|e| transport_error(&e))?;
                    let status = response.status();
                    if status.is_success() {
                        Ok(())
                    } else {
                        let body = response.bytes().await.unwrap_or_default();
                        Err(parse_error_body(status, &body))
                    }
                }
            })
            .await
    }

    /// Public URL for an object in a storage bucket.
    pub fn public_object_url(&self, bucket: &str, object_path: &str) -> String {
        format!(
            "{}storage/v1/object/public/{bucket}/{object_path}",
            self.base_url
        )
    }

    /// Single probe of the REST root, with no retries.
    ///
    /// Returns `false` on any transport failure and on 503, which the
    /// backend serves while paused.
    pub async fn health_check(&self) -> bool {
        let url = match self.endpoint("rest/v1/") {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "health check skipped");
                return false;
            }
        };
        match self.http.get(url).send().await {
            Ok(response) => response.status() != StatusCode::SERVICE_UNAVAILABLE,
            Err(err) => {
                warn!(error = %err, "health check failed");
                false
            }
        }
    }

    async fn run<T: DeserializeOwned>(&self, req: RestRequest) -> QueryResult<T> {
        self.executor.execute_query(|| self.perform(&req)).await
    }

    /// Executes one attempt of `req`. Never panics and never retries;
    /// retry policy lives entirely in the executor above this.
    async fn perform<T: DeserializeOwned>(&self, req: &RestRequest) -> QueryResult<T> {
        let url = match self.endpoint(&req.path) {
            Ok(url) => url,
            Err(err) => return QueryResult::err(err),
        };

        let mut builder = self.http.request(req.method.clone(), url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        for (name, value) in &req.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        debug!(method = %req.method, path = %req.path, "sending backend request");
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return QueryResult::err(transport_error(&e)),
        };

        let status = response.status();
        debug!(method = %req.method, path = %req.path, status = %status, "backend responded");

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return QueryResult::err(parse_error_body(status, &body));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return QueryResult::err(transport_error(&e)),
        };
        if body.is_empty() {
            return QueryResult::empty();
        }
        match serde_json::from_slice(&body) {
            Ok(data) => QueryResult::ok(data),
            Err(e) => QueryResult::err(RemoteError::from_message(format!(
                "failed to decode response: {e}"
            ))),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::from_message(format!("invalid endpoint {path}: {e}")))
    }
}

fn retry_config(settings: &RetrySettings) -> RetryConfig {
    RetryConfig {
        max_attempts: settings.max_attempts,
        initial_delay: Duration::from_millis(settings.initial_delay_ms),
        max_delay: Duration::from_millis(settings.max_delay_ms),
        backoff_multiplier: settings.backoff_multiplier,
        ..RetryConfig::default()
    }
}

/// Turns an error response body into a structured [`RemoteError`].
///
/// The backend is inconsistent about which field carries the human message,
/// so several are probed in order. The full decoded body rides along in
/// `details` for logging.
fn parse_error_body(status: StatusCode, body: &[u8]) -> RemoteError {
    let status = status.as_u16();
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        let mut err = RemoteError::from_status(status);
        if !text.is_empty() {
            err.message = Some(text.to_string());
        }
        return err;
    };

    let message = ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string);
    let code = value.get("code").map(|v| match v.as_str() {
        Some(code) => code.to_string(),
        None => v.to_string(),
    });

    RemoteError {
        status: Some(status),
        message,
        code,
        details: Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feira_domain::BackendConfig;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: u32,
        name: String,
    }

    fn test_config(server_url: &str) -> Config {
        Config {
            backend: BackendConfig {
                url: server_url.to_string(),
                anon_key: "test-anon-key".to_string(),
            },
            retry: RetrySettings {
                max_attempts: 3,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                backoff_multiplier: 2.0,
            },
        }
    }

    fn client_for(server: &MockServer) -> StoreClient {
        match StoreClient::new(&test_config(&server.uri())) {
            Ok(client) => client,
            Err(e) => panic!("client construction failed: {e}"),
        }
    }

    #[test]
    fn rejects_unconfigured_backend() {
        let config = Config {
            backend: BackendConfig {
                url: String::new(),
                anon_key: String::new(),
            },
            retry: RetrySettings::default(),
        };
        assert!(matches!(
            StoreClient::new(&config),
            Err(FeiraError::Config(_))
        ));
    }

    #[tokio::test]
    async fn select_sends_credentials_and_decodes_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("select", "*"))
            .and(query_param("category_id", "eq.7"))
            .and(header("apikey", "test-anon-key"))
            .and(header("authorization", "Bearer test-anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "mango"},
                {"id": 2, "name": "papaya"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: QueryResult<Vec<Row>> = client
            .select("products", &[("category_id", "7".to_string())])
            .await;
        let rows = result.data.unwrap_or_default();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "mango");
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "mango"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: QueryResult<Vec<Row>> = client.select("products", &[]).await;
        assert!(!result.is_err());
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "malformed filter",
                "code": "PGRST100"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: QueryResult<Vec<Row>> = client.select("users", &[]).await;
        let Some(err) = result.error else {
            panic!("expected an error result");
        };
        assert_eq!(err.status, Some(400));
        assert_eq!(err.message.as_deref(), Some("malformed filter"));
        assert_eq!(err.code.as_deref(), Some("PGRST100"));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/orders"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "message": "database unavailable"
            })))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: QueryResult<Vec<Row>> = client.select("orders", &[]).await;
        let Some(err) = result.error else {
            panic!("expected an error result");
        };
        assert_eq!(err.status, Some(500));
        assert_eq!(err.message.as_deref(), Some("database unavailable"));
    }

    #[tokio::test]
    async fn insert_asks_for_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/products"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({"name": "mango"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": 9, "name": "mango"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: QueryResult<Row> = client
            .insert_returning("products", &json!({"name": "mango"}))
            .await;
        assert_eq!(
            result.data,
            Some(Row {
                id: 9,
                name: "mango".to_string()
            })
        );
    }

    #[tokio::test]
    async fn empty_success_body_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/products"))
            .and(query_param("id", "eq.00000000-0000-0000-0000-000000000001"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let id = Uuid::from_u128(1);
        let result = client
            .update_by_id("products", id, &json!({"stock": 4}))
            .await;
        assert!(!result.is_err());
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn health_check_is_false_on_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn health_check_is_true_on_any_other_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.health_check().await);
    }

    #[test]
    fn error_bodies_probe_alternate_message_fields() {
        let err = parse_error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            br#"{"msg": "signup disabled"}"#,
        );
        assert_eq!(err.message.as_deref(), Some("signup disabled"));

        let err = parse_error_body(StatusCode::BAD_REQUEST, b"not json");
        assert_eq!(err.status, Some(400));
        assert_eq!(err.message.as_deref(), Some("not json"));
    }
}
