//! In-memory fakes of the remote-control service and stream sources.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::remote::{RemoteControl, RemoteError};
use crate::tuner::source::{ByteStream, SourceError, SourceFetcher};

/// Ordered log of every remote call and source open, shared between fakes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

pub struct FakeRemote {
    journal: Journal,
    failing_tunes: Mutex<HashSet<String>>,
    fail_stop: AtomicBool,
    delay: Duration,
    stops: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new(journal: Journal) -> Self {
        Self::with_delay(journal, Duration::ZERO)
    }

    pub fn with_delay(journal: Journal, delay: Duration) -> Self {
        Self {
            journal,
            failing_tunes: Mutex::new(HashSet::new()),
            fail_stop: AtomicBool::new(false),
            delay,
            stops: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_tune_on(&self, device: &str) {
        self.failing_tunes.lock().insert(device.to_string());
    }

    pub fn fail_stop(&self) {
        self.fail_stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_calls(&self) -> Vec<String> {
        self.stops.lock().clone()
    }
}

#[async_trait]
impl RemoteControl for FakeRemote {
    async fn tune(&self, device: &str, channel: &str) -> Result<(), RemoteError> {
        self.journal.push(format!("tune {} {}", device, channel));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing_tunes.lock().contains(device) {
            return Err(RemoteError::Status(500));
        }
        Ok(())
    }

    async fn stop(&self, device: &str) -> Result<(), RemoteError> {
        self.journal.push(format!("stop {}", device));
        self.stops.lock().push(device.to_string());
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(RemoteError::Status(503));
        }
        Ok(())
    }
}

pub struct FakeSource {
    journal: Journal,
    failing: Mutex<HashSet<String>>,
    breaking: Mutex<HashSet<String>>,
    delay: Duration,
    payload: &'static [u8],
}

impl FakeSource {
    pub fn new(journal: Journal) -> Self {
        Self::with_delay(journal, Duration::ZERO)
    }

    pub fn with_delay(journal: Journal, delay: Duration) -> Self {
        Self {
            journal,
            failing: Mutex::new(HashSet::new()),
            breaking: Mutex::new(HashSet::new()),
            delay,
            payload: b"\x47\x40\x00\x10",
        }
    }

    pub fn fail_on(&self, url: &str) {
        self.failing.lock().insert(url.to_string());
    }

    /// Streams opened from `url` fail with a read error after one chunk.
    pub fn break_after_first_chunk(&self, url: &str) {
        self.breaking.lock().insert(url.to_string());
    }

    pub fn payload(&self) -> &'static [u8] {
        self.payload
    }
}

#[async_trait]
impl SourceFetcher for FakeSource {
    async fn open(&self, url: &str) -> Result<ByteStream, SourceError> {
        self.journal.push(format!("open {}", url));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.lock().contains(url) {
            return Err(SourceError::Status(404));
        }
        let second = if self.breaking.lock().contains(url) {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "source reset"))
        } else {
            Ok(Bytes::from_static(self.payload))
        };
        let chunks: Vec<io::Result<Bytes>> = vec![Ok(Bytes::from_static(self.payload)), second];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Poll `condition` until it holds, giving spawned release tasks time to run.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
