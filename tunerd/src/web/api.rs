//! HTTP endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::{info, warn};

use tunerd_protocol::{ErrorBody, StatusResponse, TunerSelector, MPEG_TS_CONTENT_TYPE};

use crate::tuner::AcquireError;
use crate::web::state::WebState;

/// Path segment prefix in front of the tuner selector: `/play/tuner<selector>/...`.
const TUNER_SEGMENT_PREFIX: &str = "tuner";

impl IntoResponse for AcquireError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(self.to_string())),
        )
            .into_response()
    }
}

/// `GET /play/tuner{tuner}/{channel}`: stream a channel from a tuner.
///
/// The response body owns the session. When the client goes away or the
/// upstream stream ends, the body is dropped and the tuner is released.
pub async fn play(
    State(state): State<Arc<WebState>>,
    Path((slot, channel)): Path<(String, String)>,
) -> Response {
    let selector = match slot.strip_prefix(TUNER_SEGMENT_PREFIX) {
        Some(selector) => selector,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    let result = match TunerSelector::parse(selector) {
        Ok(selector) => state.allocator.acquire(selector, &channel).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(session) => {
            info!(
                "Serving channel {} from {} (slot {})",
                channel,
                session.tuner_name(),
                session.tuner_index()
            );
            (
                [(CONTENT_TYPE, MPEG_TS_CONTENT_TYPE)],
                Body::from_stream(session),
            )
                .into_response()
        }
        Err(e) => {
            warn!("Playback request {}/{} failed: {}", slot, channel, e);
            e.into_response()
        }
    }
}

/// `GET /api/status`: snapshot of every tuner in declaration order.
pub async fn get_status(State(state): State<Arc<WebState>>) -> Json<StatusResponse> {
    Json(state.status())
}
