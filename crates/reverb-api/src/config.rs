//! API server configuration.

use std::net::SocketAddr;

use reverb_logs::{DEFAULT_LIMIT, DEFAULT_MAX_ENTRIES};

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
    /// Maximum records kept by the in-memory store.
    pub store_max_entries: usize,
    /// Page size used when a request gives no `limit`.
    pub default_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_origins: Vec::new(),
            store_max_entries: DEFAULT_MAX_ENTRIES,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl ApiConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Add a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }

    /// Set the store capacity.
    #[must_use]
    pub const fn with_store_max_entries(mut self, max: usize) -> Self {
        self.store_max_entries = max;
        self
    }

    /// Set the default page size. Zero is ignored.
    #[must_use]
    pub const fn with_default_limit(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.default_limit = limit;
        }
        self
    }
}
