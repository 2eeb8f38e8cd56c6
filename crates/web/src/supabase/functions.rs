//! Edge function invocation.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{Caller, SupabaseClient, SupabaseError};

impl SupabaseClient {
    /// Call an edge function with a JSON body and decode its JSON reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the function fails or replies with malformed JSON.
    #[instrument(skip(self, caller, body), fields(function = %name))]
    pub async fn invoke_function<B, T>(
        &self,
        caller: Caller<'_>,
        name: &str,
        body: &B,
    ) -> Result<T, SupabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .inner
            .client
            .post(self.url(&format!("/functions/v1/{name}")))
            .json(body);
        let response = self.authorize(request, caller)?.send().await?;
        Self::handle_response(response).await
    }
}
