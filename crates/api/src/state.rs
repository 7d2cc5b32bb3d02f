//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Datastore;
use crate::middleware::TokenVerifier;
use crate::services::{InvitationMailer, ProductLookupClient, ProductLookupError};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The datastore and mailer are trait objects so
/// tests can substitute in-memory implementations.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn Datastore>,
    mailer: Arc<dyn InvitationMailer>,
    tokens: TokenVerifier,
    products: ProductLookupClient,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the product lookup HTTP client cannot be built.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Datastore>,
        mailer: Arc<dyn InvitationMailer>,
    ) -> Result<Self, ProductLookupError> {
        let tokens = TokenVerifier::new(&config.jwt);
        let products = ProductLookupClient::new(&config.product_lookup_url)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                mailer,
                tokens,
                products,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// The datastore every service runs against.
    #[must_use]
    pub fn store(&self) -> &dyn Datastore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn InvitationMailer {
        self.inner.mailer.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenVerifier {
        &self.inner.tokens
    }

    #[must_use]
    pub fn products(&self) -> &ProductLookupClient {
        &self.inner.products
    }
}
