//! Tuner pool management.
//!
//! This module provides:
//! - [`TunerRegistry`]: fixed slots with lock-guarded active flags
//! - [`Allocator`]: slot selection, tuning and source fetch
//! - [`session::StreamSession`]: one live playback with guaranteed release
//! - [`source`]: network byte-stream sources

pub mod allocator;
pub mod registry;
pub mod session;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use allocator::{AcquireError, Allocator, ExplicitSelection};
pub use registry::{TunerDescriptor, TunerRegistry};
pub use source::HttpSource;
