//! Remote-control collaborator.
//!
//! Tuners are driven by an external service that accepts two commands per
//! device: tune to a channel, and stop. The allocator and the stream
//! session only see the [`RemoteControl`] trait.

pub mod home_assistant;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{info, warn};
use thiserror::Error;

pub use home_assistant::HomeAssistantRemote;

/// Default timeout for establishing a connection to the remote service.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for receiving response headers from the remote service.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors returned by a remote-control call.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Connection or protocol failure.
    #[error("remote control request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// No response within the response timeout.
    #[error("remote control did not respond within {0:?}")]
    Timeout(Duration),

    /// Service answered with a non-success status.
    #[error("remote control returned status {0}")]
    Status(u16),
}

/// Commands accepted by the remote-control service.
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// Start playback of `channel` on `device`.
    async fn tune(&self, device: &str, channel: &str) -> Result<(), RemoteError>;

    /// Halt or reset `device`.
    async fn stop(&self, device: &str) -> Result<(), RemoteError>;
}

/// Settings for [`HomeAssistantRemote`].
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the service, e.g. `http://10.0.0.22:8123`.
    pub base_url: String,
    /// Long-lived bearer token.
    pub token: Option<String>,
    /// Prepended to the channel to form the media content id.
    pub content_id_prefix: String,
    /// Command sent to the device's remote entity on stop.
    pub stop_command: String,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8123".to_string(),
            token: None,
            content_id_prefix: "spectrumTV://watch.spectrum.net/livetv/".to_string(),
            stop_command: "menu".to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Issue a stop and log the outcome. Never fails.
pub async fn stop_best_effort(remote: &dyn RemoteControl, device: &str) {
    let started = Instant::now();
    info!("Stopping tuner {}", device);
    match remote.stop(device).await {
        Ok(()) => info!("Stopped tuner {} in {:?}", device, started.elapsed()),
        Err(e) => warn!("Tuner stop call failed for {}: {}", device, e),
    }
}
