//! HTTP probe with connection pooling and decode verification.
//!
//! `data:` URLs (uploaded covers) are decoded in place instead of fetched.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageReader;
use inkwell_config::HttpProbeConfig;
use reqwest::Client;
use std::io::Cursor;
use url::Url;

use super::{ImageProbe, ProbeError, ProbedImage, Result};

/// Probe backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpImageProbe {
    client: Client,
    timeout: Duration,
}

impl HttpImageProbe {
    pub fn new(config: &HttpProbeConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout());
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(ProbeError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

/// Payload of an image `data:` URL. Non-base64 payloads are taken as-is.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let unsupported = || ProbeError::UnsupportedUrl(url.to_string());
    let rest = url.strip_prefix("data:").ok_or_else(unsupported)?;
    let (header, payload) = rest.split_once(',').ok_or_else(unsupported)?;

    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let media_type = mime.split(';').next().unwrap_or_default().trim();
    if !media_type.is_empty() && !media_type.starts_with("image/") {
        return Err(unsupported());
    }

    if is_base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| ProbeError::Decode(e.to_string()))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Decode enough of `data` to prove it is an image.
pub fn decode_dimensions(data: &[u8]) -> Result<ProbedImage> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProbeError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ProbeError::Decode(e.to_string()))?;

    Ok(ProbedImage {
        width,
        height,
        bytes: data.len(),
    })
}

#[async_trait::async_trait]
impl ImageProbe for HttpImageProbe {
    async fn probe(&self, url: &str) -> Result<ProbedImage> {
        if !self.supports_url(url) {
            return Err(ProbeError::UnsupportedUrl(url.to_string()));
        }

        if url.starts_with("data:") {
            return decode_dimensions(&decode_data_url(url)?);
        }

        let data = self.fetch(url).await?;
        log::debug!("Fetched {} bytes from {}", data.len(), url);
        decode_dimensions(&data)
    }

    fn supports_url(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|parsed| matches!(parsed.scheme(), "http" | "https" | "data"))
            .unwrap_or(false)
    }
}
