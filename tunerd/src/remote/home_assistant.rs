//! Remote control through the Home Assistant service-call API.
//!
//! Tune calls `media_player.play_media` on `media_player.<device>`; stop
//! sends a remote command to `remote.<device>`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Serialize;

use tunerd_protocol::{PlayMediaRequest, SendCommandRequest};

use super::{RemoteConfig, RemoteControl, RemoteError};

const PLAY_MEDIA_SERVICE: &str = "media_player/play_media";
const SEND_COMMAND_SERVICE: &str = "remote/send_command";

/// [`RemoteControl`] backed by a Home Assistant instance.
pub struct HomeAssistantRemote {
    client: Client,
    base_url: String,
    token: Option<String>,
    content_id_prefix: String,
    stop_command: String,
    response_timeout: Duration,
}

impl HomeAssistantRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            content_id_prefix: config.content_id_prefix.clone(),
            stop_command: config.stop_command.clone(),
            response_timeout: config.response_timeout,
        })
    }

    fn service_url(&self, service: &str) -> String {
        format!("{}/api/services/{}", self.base_url, service)
    }

    async fn call<T>(&self, service: &str, body: &T) -> Result<(), RemoteError>
    where
        T: Serialize + ?Sized,
    {
        let url = self.service_url(service);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = tokio::time::timeout(self.response_timeout, request.send())
            .await
            .map_err(|_| RemoteError::Timeout(self.response_timeout))??;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteControl for HomeAssistantRemote {
    async fn tune(&self, device: &str, channel: &str) -> Result<(), RemoteError> {
        let started = Instant::now();
        info!("Started tuning channel {} on {}", channel, device);

        let body = PlayMediaRequest::for_channel(device, channel, &self.content_id_prefix);
        match self.call(PLAY_MEDIA_SERVICE, &body).await {
            Ok(()) => {
                info!("Finished tuning {} in {:?}", device, started.elapsed());
                Ok(())
            }
            Err(e) => {
                warn!("Tuning call failed on {}: {}", device, e);
                Err(e)
            }
        }
    }

    async fn stop(&self, device: &str) -> Result<(), RemoteError> {
        let body = SendCommandRequest::new(device, &self.stop_command);
        self.call(SEND_COMMAND_SERVICE, &body).await
    }
}
