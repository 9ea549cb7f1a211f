use std::sync::mpsc;
use std::thread;

use engine_logging::engine_error;
use oai_core::{Continuation, HarvestRequest, HarvestResponse};
use tokio_util::sync::CancellationToken;

use crate::distribute::BatchSink;
use crate::harvest::Harvester;
use crate::types::{
    ConfigError, DispatchError, HarvestError, HarvestSummary, TransportError, TransportFailure,
};

#[derive(Debug)]
pub enum HarvestEvent {
    /// One decoded page, in harvest order.
    Batch {
        response: HarvestResponse,
        continuation: Continuation,
    },
    /// Always the last event of a session.
    Finished(Result<HarvestSummary, HarvestError>),
}

struct ChannelSink {
    tx: mpsc::Sender<HarvestEvent>,
}

#[async_trait::async_trait]
impl BatchSink for ChannelSink {
    async fn dispatch(
        &mut self,
        response: &HarvestResponse,
        continuation: &Continuation,
    ) -> Result<usize, DispatchError> {
        self.tx
            .send(HarvestEvent::Batch {
                response: response.clone(),
                continuation: continuation.clone(),
            })
            .map_err(|_| DispatchError::Rejected("event receiver dropped".into()))?;
        Ok(response.item_count())
    }
}

/// A harvest running on its own thread, observed through events.
pub struct HarvestHandle {
    event_rx: mpsc::Receiver<HarvestEvent>,
    cancel: CancellationToken,
}

impl HarvestHandle {
    /// Starts a harvest with the transport named by the request.
    pub fn spawn(request: HarvestRequest) -> Result<Self, ConfigError> {
        let harvester = Harvester::for_request(&request)?;
        Ok(Self::spawn_with(harvester, request))
    }

    pub fn spawn_with(harvester: Harvester, request: HarvestRequest) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = harvester.cancellation();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("failed to start harvest runtime: {err}");
                    let failure = TransportError::new(TransportFailure::Network, err.to_string());
                    let _ = event_tx.send(HarvestEvent::Finished(Err(failure.into())));
                    return;
                }
            };
            let mut sink = ChannelSink {
                tx: event_tx.clone(),
            };
            let result = runtime.block_on(harvester.harvest(request, &mut sink));
            let _ = event_tx.send(HarvestEvent::Finished(result));
        });

        Self { event_rx, cancel }
    }

    /// Aborts the in-flight request; the session then finishes with a
    /// cancelled transport error.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn try_recv(&self) -> Option<HarvestEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks until the next event; `None` once the session is over and
    /// every event was consumed.
    pub fn recv(&self) -> Option<HarvestEvent> {
        self.event_rx.recv().ok()
    }
}

impl Iterator for HarvestHandle {
    type Item = HarvestEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}
