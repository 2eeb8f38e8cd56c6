//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::WebConfig;
use crate::content::{ContentError, ContentStore};
use crate::supabase::{SupabaseClient, SupabaseError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Supabase(#[from] SupabaseError),
    #[error("content: {0}")]
    Content(#[from] ContentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    pool: PgPool,
    supabase: SupabaseClient,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The pool backs the session store and readiness probe only; business
    /// data lives in the hosted backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built or the
    /// content directory cannot be read.
    pub fn new(config: WebConfig, pool: PgPool) -> Result<Self, StateError> {
        let supabase = SupabaseClient::new(&config.supabase)?;
        let content = ContentStore::load(&config.content_dir)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                supabase,
                content,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Session database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }

    /// Marketing pages.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }
}
