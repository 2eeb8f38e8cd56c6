//! Data API (`PostgREST`) operations.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{Caller, Query, SupabaseClient, SupabaseError};

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";

impl SupabaseClient {
    fn table_url(&self, table: &str) -> String {
        self.url(&format!("/rest/v1/{table}"))
    }

    /// Read rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows cannot be decoded.
    #[instrument(skip(self, caller, query), fields(table = %table))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, SupabaseError> {
        let request = self
            .inner
            .client
            .get(self.table_url(table))
            .query(query.pairs());
        let response = self.authorize(request, caller)?.send().await?;
        Self::handle_response(response).await
    }

    /// Read the first row matching `query`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row cannot be decoded.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: Query,
    ) -> Result<Option<T>, SupabaseError> {
        let rows = self.select(caller, table, &query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Count rows matching `query` using an exact count.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or `Content-Range` is missing.
    #[instrument(skip(self, caller, query), fields(table = %table))]
    pub async fn count(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
    ) -> Result<u64, SupabaseError> {
        let request = self
            .inner
            .client
            .get(self.table_url(table))
            .query(query.pairs())
            .query(&[("select", "id"), ("limit", "1")])
            .header(PREFER, "count=exact");
        let response = Self::check_status(self.authorize(request, caller)?.send().await?).await?;

        response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| SupabaseError::Parse("missing Content-Range total".to_string()))
    }

    /// Insert rows and return them as stored.
    ///
    /// `rows` may be a single object or a slice; the response is always a list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the rows.
    #[instrument(skip(self, caller, rows), fields(table = %table))]
    pub async fn insert<B, T>(
        &self,
        caller: Caller<'_>,
        table: &str,
        rows: &B,
    ) -> Result<Vec<T>, SupabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .inner
            .client
            .post(self.table_url(table))
            .header(PREFER, RETURN_REPRESENTATION)
            .json(rows);
        let response = self.authorize(request, caller)?.send().await?;
        Self::handle_response(response).await
    }

    /// Apply `changes` to every row matching `query` in a single request.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, caller, query, changes), fields(table = %table))]
    pub async fn update<B, T>(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
        changes: &B,
    ) -> Result<Vec<T>, SupabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .inner
            .client
            .patch(self.table_url(table))
            .query(query.pairs())
            .header(PREFER, RETURN_REPRESENTATION)
            .json(changes);
        let response = self.authorize(request, caller)?.send().await?;
        Self::handle_response(response).await
    }

    /// Delete every row matching `query`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    #[instrument(skip(self, caller, query), fields(table = %table))]
    pub async fn delete(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &Query,
    ) -> Result<usize, SupabaseError> {
        let request = self
            .inner
            .client
            .delete(self.table_url(table))
            .query(query.pairs())
            .query(&[("select", "id")])
            .header(PREFER, RETURN_REPRESENTATION);
        let response = self.authorize(request, caller)?.send().await?;
        let rows: Vec<serde_json::Value> = Self::handle_response(response).await?;
        Ok(rows.len())
    }
}

/// Parse the total from `Content-Range: 0-9/42` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-0/42"), Some(42));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-0/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
