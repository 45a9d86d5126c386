//! Stream session: one in-flight playback bound to one tuner slot.
//!
//! A session is released exactly once. [`StreamSession::close`] consumes
//! the session and releases inline; dropping a session that was never
//! closed (client disconnect, write failure, cancelled request) performs
//! the same release on a spawned task.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures::stream::Stream;
use log::{debug, info, warn};

use crate::remote::{stop_best_effort, RemoteControl};
use crate::tuner::registry::{TunerDescriptor, TunerRegistry};
use crate::tuner::source::ByteStream;

/// Everything needed to give a slot back.
struct Release {
    registry: Arc<TunerRegistry>,
    remote: Arc<dyn RemoteControl>,
    index: usize,
    device: String,
}

impl Release {
    /// Stop the device, clear the slot's flag, then drop the stream.
    async fn run(self, stream: Option<ByteStream>) {
        stop_best_effort(self.remote.as_ref(), &self.device).await;
        self.registry.release(self.index);
        drop(stream);
    }
}

/// Live playback on one tuner.
///
/// Implements [`Stream`] so it can be handed straight to an HTTP response
/// body; the body owns the session and dropping it releases the tuner.
pub struct StreamSession {
    index: usize,
    name: String,
    channel: String,
    stream: Option<ByteStream>,
    release: Option<Release>,
    started: bool,
    bytes_forwarded: u64,
    opened_at: Instant,
}

impl StreamSession {
    pub(crate) fn new(
        index: usize,
        descriptor: &TunerDescriptor,
        channel: &str,
        stream: ByteStream,
        registry: Arc<TunerRegistry>,
        remote: Arc<dyn RemoteControl>,
    ) -> Self {
        Self {
            index,
            name: descriptor.name.clone(),
            channel: channel.to_string(),
            stream: Some(stream),
            release: Some(Release {
                registry,
                remote,
                index,
                device: descriptor.device.clone(),
            }),
            started: false,
            bytes_forwarded: 0,
            opened_at: Instant::now(),
        }
    }

    pub fn tuner_index(&self) -> usize {
        self.index
    }

    pub fn tuner_name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether any byte has been read from the tuner yet.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn bytes_forwarded(&self) -> u64 {
        self.bytes_forwarded
    }

    /// Stop the tuner and return it to the pool, waiting for the release.
    #[cfg(test)]
    pub async fn close(mut self) {
        if let Some(release) = self.release.take() {
            self.log_closed();
            release.run(self.stream.take()).await;
        }
    }

    fn log_closed(&self) {
        info!(
            "[{}] Session closed: channel={} started={} bytes={} elapsed={:?}",
            self.tuner_name(),
            self.channel(),
            self.is_started(),
            self.bytes_forwarded(),
            self.opened_at.elapsed()
        );
    }
}

impl Stream for StreamSession {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let stream = match this.stream.as_mut() {
            Some(stream) => stream,
            None => return Poll::Ready(None),
        };

        let res = stream.as_mut().poll_next(cx);
        match &res {
            Poll::Ready(Some(Ok(chunk))) if !chunk.is_empty() => {
                if !this.started {
                    this.started = true;
                    debug!("[{}] First bytes received for channel {}", this.name, this.channel);
                }
                this.bytes_forwarded += chunk.len() as u64;
            }
            Poll::Ready(Some(Err(e))) => {
                warn!("[{}] Stream read error: {}", this.name, e);
            }
            _ => {}
        }
        res
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let release = match self.release.take() {
            Some(release) => release,
            None => return,
        };
        self.log_closed();

        let stream = self.stream.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(release.run(stream));
            }
            Err(_) => {
                warn!(
                    "[{}] No runtime available, releasing without stopping {}",
                    self.name, release.device
                );
                release.registry.release(release.index);
            }
        }
    }
}
