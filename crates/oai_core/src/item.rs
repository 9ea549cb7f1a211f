use crate::request::Verb;
use crate::response::{HarvestResponse, Header, Record};

/// An item kind delivered by a list verb.
pub trait HarvestItem: Clone + Send + Sync + 'static {
    /// Verb that produces this kind of item.
    const VERB: Verb;

    fn from_response(response: &HarvestResponse) -> &[Self];
}

impl HarvestItem for Header {
    const VERB: Verb = Verb::ListIdentifiers;

    fn from_response(response: &HarvestResponse) -> &[Self] {
        response.headers()
    }
}

impl HarvestItem for Record {
    const VERB: Verb = Verb::ListRecords;

    fn from_response(response: &HarvestResponse) -> &[Self] {
        response.records()
    }
}
