use std::fs;
use std::path::Path;

use engine_logging::engine_info;
use oai_core::{HarvestRequest, TransportOptions, Verb};
use serde::{Deserialize, Serialize};

use crate::types::ConfigError;

/// Harvest session settings as stored in a RON file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub base_url: String,
    pub verb: Option<Verb>,
    pub set: Option<String>,
    pub metadata_prefix: Option<String>,
    pub identifier: Option<String>,
    pub from: Option<String>,
    pub until: Option<String>,
    pub transport: TransportOptions,
}

impl HarvestConfig {
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&content)?;
        engine_info!("Loaded harvest config from {:?}", path);
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn into_request(self) -> HarvestRequest {
        HarvestRequest {
            base_url: self.base_url,
            verb: self.verb,
            set: self.set,
            metadata_prefix: self.metadata_prefix,
            resumption_token: None,
            identifier: self.identifier,
            from: self.from,
            until: self.until,
            transport: self.transport,
        }
    }
}
