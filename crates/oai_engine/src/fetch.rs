use std::time::Duration;

use engine_logging::engine_debug;
use futures_util::StreamExt;
use oai_core::TransportOptions;

use crate::spoof::{SpoofSettings, SpoofedFetcher};
use crate::types::{ConfigError, TransportError, TransportFailure};

/// Performs one HTTP GET and returns the raw body.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub user_agent: Option<String>,
    /// No overall timeout unless set.
    pub request_timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
    pub max_bytes: u64,
}

impl FetchSettings {
    pub fn from_options(options: &TransportOptions) -> Self {
        Self {
            user_agent: options.user_agent.clone(),
            request_timeout: options.timeout_secs.map(Duration::from_secs),
            accept_invalid_certs: options.accept_invalid_certs,
            max_bytes: options.max_body_bytes,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from_options(&TransportOptions::default())
    }
}

/// Standard transport over reqwest's default stack.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = settings.user_agent.as_deref() {
            builder = builder.user_agent(user_agent);
        }
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        if settings.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|err| ConfigError::Client(err.to_string()))?;
        Ok(Self { settings, client })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| TransportError::new(TransportFailure::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                TransportFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(TransportError::new(
                    TransportFailure::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(TransportError::new(
                    TransportFailure::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(TransportFailure::Timeout, err.to_string());
    }
    if err.is_connect() {
        return TransportError::new(TransportFailure::Connect, err.to_string());
    }
    TransportError::new(TransportFailure::Network, err.to_string())
}

/// Pick the transport the options ask for. Configuration problems, such as
/// an unknown fingerprint name, surface here before any request is sent.
pub fn build_fetcher(options: &TransportOptions) -> Result<Box<dyn Fetcher>, ConfigError> {
    if options.spoof_tls {
        let settings = SpoofSettings::from_options(options)?;
        engine_debug!("using spoofed transport ({})", settings.identity);
        Ok(Box::new(SpoofedFetcher::new(settings)?))
    } else {
        engine_debug!("using standard transport");
        Ok(Box::new(ReqwestFetcher::new(FetchSettings::from_options(
            options,
        ))?))
    }
}
