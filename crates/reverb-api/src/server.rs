//! API server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use reverb_logs::StoreClientFactory;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::ingest::JobQueue;
use crate::routes::create_router;
use crate::state::ApiState;

/// HTTP server exposing log queries and event ingestion.
#[derive(Debug, Clone)]
pub struct ApiServer {
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Create a server over the given store and job queue.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn StoreClientFactory>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            state: Arc::new(ApiState::new(config, store, queue)),
        }
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }

    /// Create the router without starting the server.
    ///
    /// Useful for testing or embedding in another server.
    pub fn router(&self) -> axum::Router {
        create_router(self.state())
    }

    /// Start the server on the configured address.
    ///
    /// This method runs until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self) -> ApiResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided future completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> ApiResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.state.config().bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::BindFailed(addr, e))?;

        info!(addr = %addr, "Reverb API listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        info!("Reverb API shut down");
        Ok(())
    }
}
