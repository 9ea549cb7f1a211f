//! OAI core: request encoding, response model and the pure pagination state machine.
mod continuation;
mod effect;
mod fingerprint;
mod item;
mod msg;
mod request;
mod response;
mod state;
mod update;

pub use continuation::Continuation;
pub use effect::{Effect, Outcome};
pub use fingerprint::{FingerprintIdentity, UnknownFingerprint};
pub use item::HarvestItem;
pub use msg::Msg;
pub use request::{
    HarvestRequest, TransportOptions, Verb, DEFAULT_FINGERPRINT, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_SPOOF_TIMEOUT_SECS,
};
pub use response::{
    HarvestResponse, Header, ListIdentifiers, ListRecords, Listing, ProtocolError, Record,
    ResumptionToken,
};
pub use state::{HarvestSession, Phase};
pub use update::update;
