//! Message type definitions for the tunerd HTTP surface.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SelectorError;

/// Selector value that asks the allocator to pick the first tunable idle slot.
pub const AUTO_SELECTOR: &str = "auto";

/// Content type of the live transport stream.
pub const MPEG_TS_CONTENT_TYPE: &str = "video/mp2t";

/// How a playback request chooses its tuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunerSelector {
    /// Scan slots in declaration order and use the first one that tunes.
    Auto,
    /// Use the slot at this index.
    Index(usize),
}

impl TunerSelector {
    /// Parse the `tuner` path segment.
    ///
    /// An empty segment is treated as [`TunerSelector::Auto`].
    pub fn parse(value: &str) -> Result<Self, SelectorError> {
        if value.is_empty() || value == AUTO_SELECTOR {
            return Ok(TunerSelector::Auto);
        }
        value
            .parse::<usize>()
            .map(TunerSelector::Index)
            .map_err(|_| SelectorError::Invalid(value.to_string()))
    }
}

impl fmt::Display for TunerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunerSelector::Auto => f.write_str(AUTO_SELECTOR),
            TunerSelector::Index(i) => write!(f, "{}", i),
        }
    }
}

/// One entry of the status document.
///
/// Field names are PascalCase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TunerStatus {
    pub name: String,
    pub url: String,
    pub active: bool,
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusResponse {
    pub tuners: Vec<TunerStatus>,
}

/// `media_player.play_media` service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayMediaRequest {
    pub entity_id: String,
    pub media_content_type: String,
    pub media_content_id: String,
}

impl PlayMediaRequest {
    /// Build a request that plays `channel` on `device`.
    ///
    /// The content id is `content_id_prefix` followed by the channel verbatim.
    pub fn for_channel(device: &str, channel: &str, content_id_prefix: &str) -> Self {
        Self {
            entity_id: format!("media_player.{}", device),
            media_content_type: "url".to_string(),
            media_content_id: format!("{}{}", content_id_prefix, channel),
        }
    }
}

/// `remote.send_command` service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendCommandRequest {
    pub entity_id: String,
    pub command: String,
}

impl SendCommandRequest {
    pub fn new(device: &str, command: &str) -> Self {
        Self {
            entity_id: format!("remote.{}", device),
            command: command.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse() {
        assert_eq!(TunerSelector::parse("auto"), Ok(TunerSelector::Auto));
        assert_eq!(TunerSelector::parse(""), Ok(TunerSelector::Auto));
        assert_eq!(TunerSelector::parse("0"), Ok(TunerSelector::Index(0)));
        assert_eq!(TunerSelector::parse("17"), Ok(TunerSelector::Index(17)));
        assert!(matches!(
            TunerSelector::parse("-1"),
            Err(SelectorError::Invalid(_))
        ));
        assert!(matches!(
            TunerSelector::parse("Auto"),
            Err(SelectorError::Invalid(_))
        ));
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(TunerSelector::Auto.to_string(), "auto");
        assert_eq!(TunerSelector::Index(3).to_string(), "3");
    }

    #[test]
    fn test_status_field_names() {
        let status = StatusResponse {
            tuners: vec![TunerStatus {
                name: "tuner1".to_string(),
                url: "http://10.0.0.28/0.ts".to_string(),
                active: true,
            }],
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["Tuners"][0]["Name"], "tuner1");
        assert_eq!(value["Tuners"][0]["Url"], "http://10.0.0.28/0.ts");
        assert_eq!(value["Tuners"][0]["Active"], true);
    }

    #[test]
    fn test_play_media_payload() {
        let req = PlayMediaRequest::for_channel(
            "tuner3",
            "12345",
            "spectrumTV://watch.spectrum.net/livetv/",
        );
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["entity_id"], "media_player.tuner3");
        assert_eq!(value["media_content_type"], "url");
        assert_eq!(
            value["media_content_id"],
            "spectrumTV://watch.spectrum.net/livetv/12345"
        );
    }

    #[test]
    fn test_send_command_payload() {
        let req = SendCommandRequest::new("tuner0", "menu");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["entity_id"], "remote.tuner0");
        assert_eq!(value["command"], "menu");
    }
}
