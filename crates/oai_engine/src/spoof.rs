use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use http::header::USER_AGENT;
use http::Method;
use oai_core::{FingerprintIdentity, TransportOptions, DEFAULT_SPOOF_TIMEOUT_SECS};
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::{Host, Url};

use crate::fetch::Fetcher;
use crate::fingerprints::{ClientHelloSpec, ALPN_H2};
use crate::types::{ConfigError, TransportError, TransportFailure};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SpoofSettings {
    pub identity: FingerprintIdentity,
    pub user_agent: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
    pub max_bytes: u64,
}

impl SpoofSettings {
    /// Resolves the fingerprint name; an unknown name fails here, before any I/O.
    pub fn from_options(options: &TransportOptions) -> Result<Self, ConfigError> {
        let identity = options.fingerprint.parse::<FingerprintIdentity>()?;
        Ok(Self {
            identity,
            user_agent: options.user_agent.clone(),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: Duration::from_secs(
                options.timeout_secs.unwrap_or(DEFAULT_SPOOF_TIMEOUT_SECS),
            ),
            accept_invalid_certs: options.accept_invalid_certs,
            max_bytes: options.max_body_bytes,
        })
    }
}

/// HTTP/2 over a TLS session whose ClientHello follows a browser preset.
pub struct SpoofedFetcher {
    settings: SpoofSettings,
    connector: TlsConnector,
}

impl SpoofedFetcher {
    pub fn new(settings: SpoofSettings) -> Result<Self, ConfigError> {
        let spec = ClientHelloSpec::for_identity(settings.identity);
        let config = spec.client_config(settings.accept_invalid_certs)?;
        engine_debug!(
            "spoofed transport ready: fingerprint={} suites={} groups={}",
            settings.identity,
            spec.cipher_suites.len(),
            spec.kx_groups.len()
        );
        Ok(Self {
            settings,
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    pub fn settings(&self) -> &SpoofSettings {
        &self.settings
    }

    async fn round_trip(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => {
                return Err(TransportError::new(
                    TransportFailure::InvalidUrl,
                    "url has no host",
                ))
            }
        };
        let port = url.port_or_known_default().unwrap_or(443);
        let server_name = ServerName::try_from(host.clone())
            .map_err(|err| TransportError::new(TransportFailure::InvalidUrl, err.to_string()))?;

        let tcp = tokio::time::timeout(
            self.settings.connect_timeout,
            TcpStream::connect((host.as_str(), port)),
        )
        .await
        .map_err(|_| TransportError::new(TransportFailure::Timeout, "connect timed out"))?
        .map_err(|err| TransportError::new(TransportFailure::Connect, err.to_string()))?;

        let tls = self
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(|err| TransportError::new(TransportFailure::Handshake, err.to_string()))?;
        let (_, session) = tls.get_ref();
        if session.alpn_protocol() != Some(ALPN_H2) {
            return Err(TransportError::new(
                TransportFailure::Handshake,
                "server did not negotiate h2",
            ));
        }
        engine_trace!("tls session established with {host}:{port}");

        let (client, connection) = h2::client::handshake(tls).await.map_err(map_h2_error)?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                engine_debug!("h2 connection ended with error: {err}");
            }
        });

        let mut request = http::Request::builder()
            .method(Method::GET)
            .uri(url.as_str());
        if let Some(user_agent) = self.settings.user_agent.as_deref() {
            request = request.header(USER_AGENT, user_agent);
        }
        let request = request
            .body(())
            .map_err(|err| TransportError::new(TransportFailure::InvalidUrl, err.to_string()))?;

        let mut client = client.ready().await.map_err(map_h2_error)?;
        let (response, _) = client.send_request(request, true).map_err(map_h2_error)?;
        let response = response.await.map_err(map_h2_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                TransportFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let mut body = response.into_body();
        let mut bytes = Vec::new();
        while let Some(chunk) = body.data().await {
            let chunk = chunk.map_err(map_h2_error)?;
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
            body.flow_control()
                .release_capacity(chunk.len())
                .map_err(map_h2_error)?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl Fetcher for SpoofedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let parsed = Url::parse(url)
            .map_err(|err| TransportError::new(TransportFailure::InvalidUrl, err.to_string()))?;
        if parsed.scheme() != "https" {
            return Err(TransportError::new(
                TransportFailure::UnsupportedScheme(parsed.scheme().to_string()),
                "spoofed transport speaks h2 over tls only",
            ));
        }

        tokio::time::timeout(self.settings.request_timeout, self.round_trip(&parsed))
            .await
            .map_err(|_| {
                TransportError::new(
                    TransportFailure::Timeout,
                    format!("request exceeded {:?}", self.settings.request_timeout),
                )
            })?
    }
}

fn map_h2_error(err: h2::Error) -> TransportError {
    TransportError::new(TransportFailure::Network, err.to_string())
}
