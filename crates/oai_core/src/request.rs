use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Default fingerprint used by the spoofed transport.
pub const DEFAULT_FINGERPRINT: &str = "chrome";
/// Timeout applied by the spoofed transport when none is configured.
pub const DEFAULT_SPOOF_TIMEOUT_SECS: u64 = 30;
/// Upper bound on a single response body.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Identify,
    ListMetadataFormats,
    ListSets,
    ListIdentifiers,
    ListRecords,
    GetRecord,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Identify => "Identify",
            Verb::ListMetadataFormats => "ListMetadataFormats",
            Verb::ListSets => "ListSets",
            Verb::ListIdentifiers => "ListIdentifiers",
            Verb::ListRecords => "ListRecords",
            Verb::GetRecord => "GetRecord",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How requests reach the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    pub user_agent: Option<String>,
    pub spoof_tls: bool,
    /// Name of the ClientHello preset used when `spoof_tls` is set.
    pub fingerprint: String,
    pub timeout_secs: Option<u64>,
    /// Skips certificate validation. Off unless deliberately enabled.
    pub accept_invalid_certs: bool,
    pub max_body_bytes: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            spoof_tls: false,
            fingerprint: DEFAULT_FINGERPRINT.to_string(),
            timeout_secs: None,
            accept_invalid_certs: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// A single OAI-PMH request. Each pagination cycle works on its own value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestRequest {
    pub base_url: String,
    pub verb: Option<Verb>,
    pub set: Option<String>,
    pub metadata_prefix: Option<String>,
    pub resumption_token: Option<String>,
    pub identifier: Option<String>,
    pub from: Option<String>,
    pub until: Option<String>,
    pub transport: TransportOptions,
}

impl HarvestRequest {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_verb(mut self, verb: Verb) -> Self {
        self.verb = Some(verb);
        self
    }

    pub fn with_set(mut self, set: impl Into<String>) -> Self {
        self.set = Some(set.into());
        self
    }

    pub fn with_metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata_prefix = Some(prefix.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// Request for the next page. The protocol forbids combining a
    /// resumption token with `set`, `metadataPrefix` or `from`.
    pub fn resume_with(&self, token: impl Into<String>) -> Self {
        Self {
            set: None,
            metadata_prefix: None,
            from: None,
            resumption_token: Some(token.into()),
            ..self.clone()
        }
    }

    /// Canonical query URL. Empty fields are omitted; field order is fixed.
    pub fn full_url(&self) -> String {
        let verb = self.verb.map(Verb::as_str);
        let fields = [
            ("verb", verb),
            ("set", self.set.as_deref()),
            ("metadataPrefix", self.metadata_prefix.as_deref()),
            ("resumptionToken", self.resumption_token.as_deref()),
            ("identifier", self.identifier.as_deref()),
            ("from", self.from.as_deref()),
            ("until", self.until.as_deref()),
        ];

        let query = fields
            .iter()
            .filter_map(|(name, value)| match value {
                Some(value) if !value.is_empty() => Some(format!("{name}={}", encode(value))),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.base_url, query)
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
