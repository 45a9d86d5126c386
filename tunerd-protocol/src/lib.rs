//! Wire types for the tunerd tuner-pool streaming proxy.
//!
//! This crate defines the JSON shapes exchanged over HTTP:
//!
//! - [`StatusResponse`]: the `/api/status` document
//! - [`ErrorBody`]: the body of a failed `/play` request
//! - [`TunerSelector`]: the `tuner` path segment (`auto` or a slot index)
//! - [`PlayMediaRequest`] / [`SendCommandRequest`]: service calls sent to
//!   the remote-control service
//!
//! # Example
//!
//! ```rust
//! use tunerd_protocol::TunerSelector;
//!
//! assert_eq!(TunerSelector::parse("auto").unwrap(), TunerSelector::Auto);
//! assert_eq!(TunerSelector::parse("").unwrap(), TunerSelector::Auto);
//! assert_eq!(TunerSelector::parse("2").unwrap(), TunerSelector::Index(2));
//! assert!(TunerSelector::parse("two").is_err());
//! ```

pub mod error;
pub mod types;

pub use error::{ErrorBody, SelectorError};
pub use types::{
    PlayMediaRequest, SendCommandRequest, StatusResponse, TunerSelector, TunerStatus,
    AUTO_SELECTOR, MPEG_TS_CONTENT_TYPE,
};
