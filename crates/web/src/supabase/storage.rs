//! Storage API operations.

use tracing::instrument;

use super::{Caller, SupabaseClient, SupabaseError};

impl SupabaseClient {
    /// Upload `bytes` to `path` in the configured bucket, replacing any
    /// existing object, and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected.
    #[instrument(skip(self, caller, bytes), fields(size = bytes.len()))]
    pub async fn upload_object(
        &self,
        caller: Caller<'_>,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, SupabaseError> {
        let bucket = self.storage_bucket();
        let request = self
            .inner
            .client
            .post(self.url(&format!("/storage/v1/object/{bucket}/{path}")))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        let response = self.authorize(request, caller)?.send().await?;
        Self::check_status(response).await?;
        Ok(self.public_url(path))
    }

    /// Public URL of an object in the configured bucket.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        self.url(&format!(
            "/storage/v1/object/public/{}/{path}",
            self.storage_bucket()
        ))
    }
}

/// File extension for an image content type.
#[must_use]
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}
