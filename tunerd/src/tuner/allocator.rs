//! Tuner allocation.
//!
//! [`Allocator::acquire`] picks a slot, commands the remote service to tune
//! it, opens the slot's stream source and hands back a [`StreamSession`].
//!
//! Acquisitions are serialized by a FIFO gate: at most one selection,
//! tune and source fetch is in flight at any time, since the devices
//! cannot usefully be tuned concurrently. The gate is separate from the
//! registry lock, so status snapshots and session release never wait on
//! network I/O.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use tunerd_protocol::{SelectorError, TunerSelector};

use crate::remote::{stop_best_effort, RemoteControl};
use crate::tuner::registry::TunerRegistry;
use crate::tuner::session::StreamSession;
use crate::tuner::source::{SourceError, SourceFetcher};

/// Errors returned by [`Allocator::acquire`].
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Every candidate is busy or failed to tune, or the explicit index is
    /// out of range.
    #[error("tuner not available")]
    NoTunerAvailable,

    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),

    /// The selected tuner's stream could not be opened.
    #[error("failed to fetch source for {tuner}: {source}")]
    SourceFetch {
        tuner: String,
        #[source]
        source: SourceError,
    },
}

/// Treatment of an explicit slot index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplicitSelection {
    /// Use the slot as-is: no tune call, busy flag ignored.
    #[default]
    Bypass,
    /// The slot must be idle and is tuned like an automatic candidate.
    Checked,
}

/// Stop owed to a device that tuned successfully but has not been handed
/// to a session yet. Dropping an armed value (cancelled acquisition) issues
/// the stop on a spawned task.
struct PendingTune {
    remote: Arc<dyn RemoteControl>,
    device: String,
    armed: bool,
}

impl PendingTune {
    fn new(remote: Arc<dyn RemoteControl>, device: &str) -> Self {
        Self {
            remote,
            device: device.to_string(),
            armed: true,
        }
    }

    async fn stop(mut self) {
        self.armed = false;
        stop_best_effort(self.remote.as_ref(), &self.device).await;
    }

    fn hand_off(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingTune {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Acquisition of {} abandoned after tuning, stopping it", self.device);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let remote = Arc::clone(&self.remote);
            let device = std::mem::take(&mut self.device);
            handle.spawn(async move {
                stop_best_effort(remote.as_ref(), &device).await;
            });
        }
    }
}

/// Hands out tuners from a [`TunerRegistry`].
pub struct Allocator {
    registry: Arc<TunerRegistry>,
    remote: Arc<dyn RemoteControl>,
    source: Arc<dyn SourceFetcher>,
    explicit_selection: ExplicitSelection,
    gate: Mutex<()>,
}

impl Allocator {
    pub fn new(
        registry: Arc<TunerRegistry>,
        remote: Arc<dyn RemoteControl>,
        source: Arc<dyn SourceFetcher>,
        explicit_selection: ExplicitSelection,
    ) -> Self {
        Self {
            registry,
            remote,
            source,
            explicit_selection,
            gate: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<TunerRegistry> {
        &self.registry
    }

    /// Acquire a tuner playing `channel`.
    ///
    /// With [`TunerSelector::Auto`], idle slots are tried in declaration
    /// order and the first one whose tune call succeeds is used. A slot
    /// that fails to tune stays idle. With [`TunerSelector::Index`] the
    /// behavior depends on [`ExplicitSelection`].
    ///
    /// If the stream source cannot be opened after a successful tune, the
    /// device is stopped before the error is returned and the slot stays
    /// idle.
    pub async fn acquire(
        &self,
        selector: TunerSelector,
        channel: &str,
    ) -> Result<StreamSession, AcquireError> {
        let _gate = self.gate.lock().await;
        info!("tune for {} {}", selector, channel);

        let (index, pending) = match selector {
            TunerSelector::Auto => self.select_auto(channel).await?,
            TunerSelector::Index(index) => self.select_explicit(index, channel).await?,
        };
        let descriptor = self
            .registry
            .descriptor(index)
            .ok_or(AcquireError::NoTunerAvailable)?;

        let stream = match self.source.open(&descriptor.url).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("[{}] Failed to fetch source {}: {}", descriptor.name, descriptor.url, e);
                if let Some(pending) = pending {
                    pending.stop().await;
                }
                return Err(AcquireError::SourceFetch {
                    tuner: descriptor.name.clone(),
                    source: e,
                });
            }
        };

        if let Some(pending) = pending {
            pending.hand_off();
        }
        self.registry.mark_active(index);
        info!(
            "[{}] Streaming channel {} ({}/{} tuners active)",
            descriptor.name,
            channel,
            self.registry.active_count(),
            self.registry.len()
        );

        Ok(StreamSession::new(
            index,
            descriptor,
            channel,
            stream,
            Arc::clone(&self.registry),
            Arc::clone(&self.remote),
        ))
    }

    async fn select_auto(
        &self,
        channel: &str,
    ) -> Result<(usize, Option<PendingTune>), AcquireError> {
        let candidates = self.registry.idle_slots();
        if candidates.is_empty() {
            debug!("All {} tuners are active", self.registry.len());
            return Err(AcquireError::NoTunerAvailable);
        }

        for index in candidates {
            if let Some(pending) = self.try_tune(index, channel).await {
                return Ok((index, Some(pending)));
            }
        }
        Err(AcquireError::NoTunerAvailable)
    }

    async fn select_explicit(
        &self,
        index: usize,
        channel: &str,
    ) -> Result<(usize, Option<PendingTune>), AcquireError> {
        if index >= self.registry.len() {
            debug!("Tuner index {} out of range (have {})", index, self.registry.len());
            return Err(AcquireError::NoTunerAvailable);
        }

        match self.explicit_selection {
            ExplicitSelection::Bypass => {
                if self.registry.is_active(index) {
                    warn!("Tuner {} is already active, taking it over", index);
                }
                Ok((index, None))
            }
            ExplicitSelection::Checked => {
                if self.registry.is_active(index) {
                    return Err(AcquireError::NoTunerAvailable);
                }
                self.try_tune(index, channel)
                    .await
                    .map(|pending| (index, Some(pending)))
                    .ok_or(AcquireError::NoTunerAvailable)
            }
        }
    }

    async fn try_tune(&self, index: usize, channel: &str) -> Option<PendingTune> {
        let descriptor = self.registry.descriptor(index)?;
        match self.remote.tune(&descriptor.device, channel).await {
            Ok(()) => Some(PendingTune::new(Arc::clone(&self.remote), &descriptor.device)),
            Err(e) => {
                warn!("Failed to tune {}, trying next tuner: {}", descriptor.device, e);
                None
            }
        }
    }
}
