//! Image upload into storage buckets.
//!
//! Object names are regenerated on every upload. Phone cameras produce
//! long, unicode-heavy file names that the storage backend rejects, so
//! only the extension of the original name survives.

use std::sync::Arc;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use feira_common::RemoteError;
use feira_domain::{FeiraError, AVATARS_BUCKET, PRODUCTS_BUCKET};

use crate::api::client::StoreClient;
use crate::errors::IntoFeiraError;

const KEY_TOO_LONG_HINT: &str =
    "file name is too long, rename the image to something shorter and try again";

pub struct StorageService {
    client: Arc<StoreClient>,
}

impl StorageService {
    pub fn new(client: Arc<StoreClient>) -> Self {
        Self { client }
    }

    /// Uploads a product photo under the seller's folder and returns its
    /// public URL.
    pub async fn upload_product_image(
        &self,
        seller_id: Uuid,
        original_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, FeiraError> {
        let object = format!("{seller_id}/{}", short_object_name(original_name, ""));
        self.upload(PRODUCTS_BUCKET, &object, bytes, content_type)
            .await
    }

    /// Uploads a profile photo and returns its public URL.
    pub async fn upload_avatar(
        &self,
        user_id: Uuid,
        original_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, FeiraError> {
        let object = format!("{user_id}/{}", short_object_name(original_name, "avatar-"));
        self.upload(AVATARS_BUCKET, &object, bytes, content_type)
            .await
    }

    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, FeiraError> {
        match self
            .client
            .upload_object(bucket, object, bytes, content_type)
            .await
        {
            Ok(()) => {
                let url = self.client.public_object_url(bucket, object);
                info!(bucket, object, "image uploaded");
                Ok(url)
            }
            Err(err) if is_key_too_long(&err) => {
                Err(FeiraError::Storage(KEY_TOO_LONG_HINT.to_string()))
            }
            Err(err) => Err(err.into_feira()),
        }
    }
}

/// True when the backend rejected the object key for being too long.
fn is_key_too_long(err: &RemoteError) -> bool {
    let in_text = |text: &str| {
        let lower = text.to_lowercase();
        lower.contains("keytoolong") || lower.contains("key too long")
    };
    err.code.as_deref().is_some_and(in_text) || err.message.as_deref().is_some_and(in_text)
}

/// Short, collision-resistant object name keeping only the extension of
/// the original file name.
fn short_object_name(original_name: &str, prefix: &str) -> String {
    let extension = original_name
        .rsplit_once('.')
        .map_or_else(|| "jpg".to_string(), |(_, ext)| ext.to_lowercase());
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    let timestamp = Utc::now().timestamp_millis();
    format!("{prefix}{timestamp}-{}.{extension}", suffix.to_lowercase())
}
