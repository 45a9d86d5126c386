//! Web server shared state.

use std::sync::Arc;

use tunerd_protocol::{StatusResponse, TunerStatus};

use crate::tuner::{Allocator, TunerRegistry};

/// Shared state for the HTTP handlers.
pub struct WebState {
    /// Tuner allocator; owns the registry.
    pub allocator: Arc<Allocator>,
}

impl WebState {
    pub fn new(allocator: Arc<Allocator>) -> Self {
        Self { allocator }
    }

    pub fn registry(&self) -> &Arc<TunerRegistry> {
        self.allocator.registry()
    }

    /// Status document for `/api/status`.
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            tuners: self
                .registry()
                .snapshot()
                .into_iter()
                .map(TunerStatus::from)
                .collect(),
        }
    }
}
