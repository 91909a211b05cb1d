use crate::config::Config;
use crate::error::AtlasError;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(2)
        .with_jitter()
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    style: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    image: String,
}

/// Client for the external image generation endpoint.
#[derive(Clone)]
pub struct ImageClient {
    client: reqwest::Client,
    endpoint: Option<Url>,
    api_key: Option<String>,
}

impl ImageClient {
    pub fn new(cfg: &Config) -> Result<Self, AtlasError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("muniscope/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(120));
        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: cfg.image_service_url.clone(),
            api_key: cfg.image_service_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Render `prompt` in `style`; returns the image URL (or data URI) the
    /// service hands back. Server errors are retried, client errors are not.
    pub async fn generate(&self, prompt: &str, style: &str) -> Result<String, AtlasError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or(AtlasError::ImageServiceUnavailable)?;
        let body = ImageRequest { prompt, style };

        let resp = (|| async {
            let mut req = self.client.post(endpoint.clone()).json(&body);
            if let Some(key) = self.api_key.as_deref() {
                req = req.bearer_auth(key);
            }
            let resp = req.send().await?;
            if resp.status().is_server_error() {
                let status = resp.status();
                error!(%status, "image service server error (will retry)");
                return resp.error_for_status();
            }
            Ok(resp)
        })
        .retry(default_retry_policy())
        .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AtlasError::UpstreamStatus(status));
        }
        let parsed: ImageResponse = resp.json().await?;
        debug!(style, "image generated");
        Ok(parsed.image)
    }
}
