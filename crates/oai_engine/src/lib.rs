//! Harvest engine: transports, response decoding and the pagination loop.
mod config;
mod decode;
mod distribute;
mod engine;
mod fetch;
mod fingerprints;
mod harvest;
mod spoof;
mod types;

pub use config::HarvestConfig;
pub use decode::{decode_response, normalize, DecodeError};
pub use distribute::{log_protocol_error, BatchSink, DirectSink, FanOut, Outlet};
pub use engine::{HarvestEvent, HarvestHandle};
pub use fetch::{build_fetcher, FetchSettings, Fetcher, ReqwestFetcher};
pub use fingerprints::{ClientHelloSpec, ALPN_H2};
pub use harvest::{harvest_identifiers, harvest_records, Harvester};
pub use spoof::{SpoofSettings, SpoofedFetcher, CONNECT_TIMEOUT};
pub use types::{
    ConfigError, DispatchError, HarvestError, HarvestSummary, OutletClosed, TransportError,
    TransportFailure,
};
