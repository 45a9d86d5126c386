//! Network byte-stream sources for tuners.

use std::io;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, TryStreamExt};
use log::debug;
use reqwest::Client;
use thiserror::Error;

/// Live transport stream delivered by a tuner.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Errors returned while opening a tuner's stream source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Response headers did not arrive in time.
    #[error("source did not respond within {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    Status(u16),
}

/// Opens the byte stream behind a tuner's source address.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn open(&self, url: &str) -> Result<ByteStream, SourceError>;
}

/// HTTP GET source.
///
/// Only connection setup and the wait for response headers are bounded;
/// the body is a live stream and may run indefinitely.
pub struct HttpSource {
    client: Client,
    response_timeout: Duration,
}

impl HttpSource {
    pub fn new(connect_timeout: Duration, response_timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            client,
            response_timeout,
        })
    }
}

#[async_trait]
impl SourceFetcher for HttpSource {
    async fn open(&self, url: &str) -> Result<ByteStream, SourceError> {
        debug!("GET {}", url);
        let response = tokio::time::timeout(self.response_timeout, self.client.get(url).send())
            .await
            .map_err(|_| SourceError::Timeout(self.response_timeout))??;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use futures::StreamExt;

    async fn spawn_source() -> String {
        let app = Router::new()
            .route("/0.ts", get(|| async { vec![0x47u8; 376] }))
            .route("/missing.ts", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/slow.ts",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn source() -> HttpSource {
        HttpSource::new(Duration::from_secs(1), Duration::from_millis(300)).unwrap()
    }

    #[tokio::test]
    async fn test_open_streams_body() {
        let base = spawn_source().await;
        let mut stream = source().open(&format!("{}/0.ts", base)).await.unwrap();

        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received.len(), 376);
        assert!(received.iter().all(|b| *b == 0x47));
    }

    #[tokio::test]
    async fn test_open_rejects_error_status() {
        let base = spawn_source().await;
        let err = source()
            .open(&format!("{}/missing.ts", base))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::Status(404)));
        assert_eq!(err.to_string(), "invalid response: 404");
    }

    #[tokio::test]
    async fn test_open_times_out_waiting_for_headers() {
        let base = spawn_source().await;
        let err = source()
            .open(&format!("{}/slow.ts", base))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::Timeout(_)));
    }
}
