//! Shared state for the API server.

use std::sync::Arc;
use std::time::Instant;

use reverb_logs::{LogQueryService, StoreClientFactory};

use crate::config::ApiConfig;
use crate::ingest::JobQueue;

/// Shared state handed to every request handler.
pub struct ApiState {
    config: Arc<ApiConfig>,
    logs: LogQueryService,
    queue: Arc<dyn JobQueue>,
    start_time: Instant,
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("config", &self.config)
            .field("logs", &self.logs)
            .finish_non_exhaustive()
    }
}

impl ApiState {
    /// Create the state from a store factory and a job queue.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn StoreClientFactory>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            logs: LogQueryService::new(store),
            queue,
            start_time: Instant::now(),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Get the log query service.
    #[must_use]
    pub const fn logs(&self) -> &LogQueryService {
        &self.logs
    }

    /// Get the job queue.
    #[must_use]
    pub const fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    /// Get server uptime in seconds.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::MemoryJobQueue;
    use reverb_logs::MemoryStore;

    #[test]
    fn test_state_accessors() {
        let config = ApiConfig::default().with_default_limit(5);
        let state = ApiState::new(
            config,
            Arc::new(MemoryStore::default()),
            Arc::new(MemoryJobQueue::new()),
        );

        assert_eq!(state.config().default_limit, 5);
        assert!(state.uptime_secs() < 5);
        assert!(format!("{state:?}").contains("ApiState"));
    }
}
