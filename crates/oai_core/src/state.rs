use crate::{Continuation, HarvestRequest};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Requesting,
    Decoding,
    Dispatching {
        continuation: Continuation,
    },
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

/// State of one harvest: the request for the current cycle and its phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSession {
    request: HarvestRequest,
    phase: Phase,
    cycles: u32,
}

impl HarvestSession {
    pub fn new(request: HarvestRequest) -> Self {
        Self {
            request,
            phase: Phase::Idle,
            cycles: 0,
        }
    }

    pub fn request(&self) -> &HarvestRequest {
        &self.request
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Number of requests issued so far.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub(crate) fn begin_cycle(&mut self, request: HarvestRequest) -> String {
        self.request = request;
        self.cycles += 1;
        self.phase = Phase::Requesting;
        self.request.full_url()
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}
