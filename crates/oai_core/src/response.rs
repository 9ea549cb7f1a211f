use crate::continuation::Continuation;
use crate::request::Verb;

/// Repository-reported error, e.g. `noRecordsMatch` or `badResumptionToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub identifier: String,
    pub datestamp: String,
    pub set_specs: Vec<String>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub header: Header,
    /// Raw inner XML of the `<metadata>` element, passed through untouched.
    pub metadata: Option<String>,
}

/// The `resumptionToken` element. Attributes are carried, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResumptionToken {
    pub token: String,
    pub cursor: Option<String>,
    pub complete_list_size: Option<String>,
    pub expiration_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListIdentifiers {
    pub headers: Vec<Header>,
    pub resumption_token: Option<ResumptionToken>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListRecords {
    pub records: Vec<Record>,
    pub resumption_token: Option<ResumptionToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Identifiers(ListIdentifiers),
    Records(ListRecords),
}

impl Listing {
    pub fn verb(&self) -> Verb {
        match self {
            Listing::Identifiers(_) => Verb::ListIdentifiers,
            Listing::Records(_) => Verb::ListRecords,
        }
    }

    pub fn resumption_token(&self) -> Option<&ResumptionToken> {
        match self {
            Listing::Identifiers(list) => list.resumption_token.as_ref(),
            Listing::Records(list) => list.resumption_token.as_ref(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Identifiers(list) => list.headers.len(),
            Listing::Records(list) => list.records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestResponse {
    pub response_date: Option<String>,
    pub error: Option<ProtocolError>,
    pub listing: Option<Listing>,
}

impl HarvestResponse {
    /// Continuation for the next cycle.
    ///
    /// A decoded response holds at most one listing; when a body carried both
    /// containers the decoder keeps ListIdentifiers, so that list wins over
    /// ListRecords here too.
    pub fn continuation(&self) -> Continuation {
        let token = self
            .listing
            .as_ref()
            .and_then(Listing::resumption_token)
            .map(|token| token.token.as_str());
        Continuation::from_token(token)
    }

    pub fn item_count(&self) -> usize {
        self.listing.as_ref().map_or(0, Listing::len)
    }

    pub fn headers(&self) -> &[Header] {
        match &self.listing {
            Some(Listing::Identifiers(list)) => &list.headers,
            _ => &[],
        }
    }

    pub fn records(&self) -> &[Record] {
        match &self.listing {
            Some(Listing::Records(list)) => &list.records,
            _ => &[],
        }
    }
}
