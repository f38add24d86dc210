//! Backend reachability probe.

use crate::api::client::StoreClient;

/// Single-shot reachability check, used before sync-heavy screens load.
///
/// Deliberately bypasses the retry layer so the caller gets an answer
/// within one request timeout.
pub async fn check_backend_health(client: &StoreClient) -> bool {
    client.health_check().await
}
