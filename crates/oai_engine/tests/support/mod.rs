#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use oai_engine::{Fetcher, TransportError, TransportFailure};

pub const BASE_URL: &str = "https://example.org/oai";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// Serves canned bodies in order and records every requested URL.
pub struct ScriptedFetcher {
    replies: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub fn new(replies: Vec<Result<String, TransportError>>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let urls = Arc::new(Mutex::new(Vec::new()));
        let fetcher = Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| reply.map(String::into_bytes))
                    .collect(),
            ),
            urls: urls.clone(),
        };
        (fetcher, urls)
    }

    pub fn pages(pages: Vec<String>) -> (Self, Arc<Mutex<Vec<String>>>) {
        Self::new(pages.into_iter().map(Ok).collect())
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.urls.lock().unwrap().push(url.to_string());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                TransportFailure::Network,
                "script exhausted",
            ))
        })
    }
}

/// Never answers; only cancellation or a timeout ends the fetch.
pub struct HangingFetcher;

#[async_trait::async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, TransportError> {
        std::future::pending().await
    }
}

pub fn transport_error(message: &str) -> TransportError {
    TransportError::new(TransportFailure::Connect, message)
}

fn token_element(token: Option<&str>) -> String {
    match token {
        Some(token) => format!(
            r#"<resumptionToken cursor="0" completeListSize="99">{token}</resumptionToken>"#
        ),
        None => "<resumptionToken/>".to_string(),
    }
}

fn header_element(id: &str) -> String {
    format!(
        "<header><identifier>{id}</identifier><datestamp>2024-05-01</datestamp>\
         <setSpec>physics</setSpec></header>"
    )
}

fn envelope(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2024-05-01T00:00:00Z</responseDate>
  <request verb="ListIdentifiers">{BASE_URL}</request>
  {inner}
</OAI-PMH>"#
    )
}

pub fn identifiers_page(ids: &[&str], token: Option<&str>) -> String {
    let headers: String = ids.iter().map(|id| header_element(id)).collect();
    envelope(&format!(
        "<ListIdentifiers>{headers}{}</ListIdentifiers>",
        token_element(token)
    ))
}

pub fn records_page(ids: &[&str], token: Option<&str>) -> String {
    let records: String = ids
        .iter()
        .map(|id| {
            format!(
                "<record>{}<metadata><oai_dc:dc xmlns:oai_dc=\"http://www.openarchives.org/OAI/2.0/oai_dc/\">\
                 <dc:title xmlns:dc=\"http://purl.org/dc/elements/1.1/\">Title {id}</dc:title>\
                 </oai_dc:dc></metadata></record>",
                header_element(id)
            )
        })
        .collect();
    envelope(&format!(
        "<ListRecords>{records}{}</ListRecords>",
        token_element(token)
    ))
}

pub fn error_page(code: &str, message: &str) -> String {
    envelope(&format!(r#"<error code="{code}">{message}</error>"#))
}

/// A ListIdentifiers page that also carries a repository error.
pub fn identifiers_page_with_error(code: &str, ids: &[&str]) -> String {
    let headers: String = ids.iter().map(|id| header_element(id)).collect();
    envelope(&format!(
        r#"<error code="{code}"/><ListIdentifiers>{headers}{}</ListIdentifiers>"#,
        token_element(None)
    ))
}
