use std::collections::VecDeque;

use engine_logging::{engine_debug, engine_info, engine_warn};
use oai_core::{
    update, Effect, HarvestItem, HarvestRequest, HarvestResponse, HarvestSession, Header, Msg,
    Outcome, ProtocolError, Record,
};
use tokio_util::sync::CancellationToken;

use crate::decode::decode_response;
use crate::distribute::{BatchSink, DirectSink, FanOut, Outlet};
use crate::fetch::{build_fetcher, Fetcher};
use crate::types::{ConfigError, HarvestError, HarvestSummary, TransportError, TransportFailure};

/// Runs harvests against one repository through one transport.
pub struct Harvester {
    fetcher: Box<dyn Fetcher>,
    cancel: CancellationToken,
}

impl Harvester {
    /// Builds the transport named by the request's options.
    pub fn for_request(request: &HarvestRequest) -> Result<Self, ConfigError> {
        Ok(Self::with_fetcher(build_fetcher(&request.transport)?))
    }

    pub fn with_fetcher(fetcher: Box<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling the token aborts an in-flight fetch.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Follows resumption tokens until the repository signals completion,
    /// handing every response to `sink` before looking for the next token.
    pub async fn harvest(
        &self,
        request: HarvestRequest,
        sink: &mut dyn BatchSink,
    ) -> Result<HarvestSummary, HarvestError> {
        engine_info!("harvest start: {}", request.full_url());
        let (session, effects) = update(HarvestSession::new(request), Msg::Start);
        self.drive(session, effects.into(), sink).await
    }

    /// Executes effects until the state machine emits `Finish`.
    async fn drive(
        &self,
        mut session: HarvestSession,
        mut pending: VecDeque<Effect<HarvestError>>,
        sink: &mut dyn BatchSink,
    ) -> Result<HarvestSummary, HarvestError> {
        let mut summary = HarvestSummary::default();
        let mut body: Option<Vec<u8>> = None;
        let mut response: Option<HarvestResponse> = None;

        while let Some(effect) = pending.pop_front() {
            let msg = match effect {
                Effect::Fetch { url } => {
                    engine_debug!("cycle {} fetching {}", session.cycles(), url);
                    match self.fetch(&url).await {
                        Ok(bytes) => {
                            body = Some(bytes);
                            Msg::Fetched
                        }
                        Err(err) => Msg::FetchFailed(err.into()),
                    }
                }
                Effect::Decode => {
                    let bytes = body.take().unwrap_or_default();
                    match decode_response(&bytes) {
                        Ok(decoded) => {
                            let continuation = decoded.continuation();
                            response = Some(decoded);
                            Msg::Decoded { continuation }
                        }
                        Err(err) => Msg::DecodeFailed(err.into()),
                    }
                }
                Effect::Dispatch { continuation } => {
                    let batch = response.take().unwrap_or_default();
                    if let Some(error) = &batch.error {
                        summary.protocol_errors += 1;
                        engine_warn!(
                            "cycle {}: repository error {}: {}",
                            session.cycles(),
                            error.code,
                            error.message
                        );
                    }
                    if continuation.present {
                        engine_debug!("resumption token {}", continuation.token);
                    }
                    match sink.dispatch(&batch, &continuation).await {
                        Ok(delivered) => {
                            summary.items += delivered;
                            Msg::Dispatched
                        }
                        Err(err) => Msg::DispatchFailed(err.into()),
                    }
                }
                Effect::Finish(Outcome::Done { cycles }) => {
                    summary.cycles = cycles;
                    engine_info!(
                        "harvest done: {} cycles, {} items",
                        summary.cycles,
                        summary.items
                    );
                    return Ok(summary);
                }
                Effect::Finish(Outcome::Failed { cycle, error }) => {
                    engine_warn!("harvest failed in cycle {cycle}: {error}");
                    return Err(error);
                }
            };

            let (next, effects) = update(session, msg);
            session = next;
            pending.extend(effects);
        }

        engine_warn!("harvest stalled in phase {:?}", session.phase());
        Err(HarvestError::Stalled {
            cycle: session.cycles(),
        })
    }

    /// ListIdentifiers harvest with one callback per header.
    pub async fn harvest_identifiers<F>(
        &self,
        request: HarvestRequest,
        on_header: F,
    ) -> Result<HarvestSummary, HarvestError>
    where
        F: FnMut(&Header) + Send,
    {
        let mut sink = DirectSink::<Header, F>::new(on_header);
        self.harvest(request.with_verb(Header::VERB), &mut sink).await
    }

    /// ListRecords harvest with a record callback and a protocol-error callback.
    pub async fn harvest_records<F, G>(
        &self,
        request: HarvestRequest,
        on_record: F,
        on_error: G,
    ) -> Result<HarvestSummary, HarvestError>
    where
        F: FnMut(&Record) + Send,
        G: FnMut(&ProtocolError) + Send,
    {
        let mut sink = DirectSink::<Record, F>::new(on_record).with_error_sink(on_error);
        self.harvest(request.with_verb(Record::VERB), &mut sink).await
    }

    /// Round-robin the session's items over `outlets`, closing each one when
    /// the repository runs out of pages.
    pub async fn fan_out<T, O>(
        &self,
        request: HarvestRequest,
        outlets: Vec<O>,
    ) -> Result<HarvestSummary, HarvestError>
    where
        T: HarvestItem,
        O: Outlet<T>,
    {
        let mut sink = FanOut::<T, O>::new(outlets)?;
        self.harvest(request.with_verb(T::VERB), &mut sink).await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransportError::new(
                TransportFailure::Cancelled,
                "harvest cancelled",
            )),
            result = self.fetcher.fetch(url) => result,
        }
    }
}

/// One-shot helper: builds the transport from the request and harvests
/// identifiers into `on_header`.
pub async fn harvest_identifiers<F>(
    request: HarvestRequest,
    on_header: F,
) -> Result<HarvestSummary, HarvestError>
where
    F: FnMut(&Header) + Send,
{
    Harvester::for_request(&request)?
        .harvest_identifiers(request, on_header)
        .await
}

/// One-shot helper for ListRecords.
pub async fn harvest_records<F, G>(
    request: HarvestRequest,
    on_record: F,
    on_error: G,
) -> Result<HarvestSummary, HarvestError>
where
    F: FnMut(&Record) + Send,
    G: FnMut(&ProtocolError) + Send,
{
    Harvester::for_request(&request)?
        .harvest_records(request, on_record, on_error)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribute::DirectSink;

    struct NoFetch;

    #[async_trait::async_trait]
    impl Fetcher for NoFetch {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::new(TransportFailure::Network, "unused"))
        }
    }

    #[tokio::test]
    async fn running_out_of_effects_is_an_error() {
        let harvester = Harvester::with_fetcher(Box::new(NoFetch));
        let session = HarvestSession::new(HarvestRequest::new("https://example.org/oai"));
        let mut sink = DirectSink::<Header, _>::new(|_: &Header| {});

        let err = harvester
            .drive(session, VecDeque::new(), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Stalled { cycle: 0 }), "{err:?}");
    }
}
