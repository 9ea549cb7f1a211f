use crate::{Effect, HarvestSession, Msg, Outcome, Phase};

/// Pure transition function of the pagination state machine.
///
/// Messages that do not belong to the current phase leave the session
/// untouched and produce no effects.
pub fn update<E>(mut session: HarvestSession, msg: Msg<E>) -> (HarvestSession, Vec<Effect<E>>) {
    let effects = match (session.phase().clone(), msg) {
        (Phase::Idle, Msg::Start) => {
            let request = session.request().clone();
            let url = session.begin_cycle(request);
            vec![Effect::Fetch { url }]
        }
        (Phase::Requesting, Msg::Fetched) => {
            session.set_phase(Phase::Decoding);
            vec![Effect::Decode]
        }
        (Phase::Decoding, Msg::Decoded { continuation }) => {
            session.set_phase(Phase::Dispatching {
                continuation: continuation.clone(),
            });
            vec![Effect::Dispatch { continuation }]
        }
        (Phase::Dispatching { continuation }, Msg::Dispatched) => {
            if continuation.present {
                let next = session.request().resume_with(continuation.token);
                let url = session.begin_cycle(next);
                vec![Effect::Fetch { url }]
            } else {
                session.set_phase(Phase::Done);
                vec![Effect::Finish(Outcome::Done {
                    cycles: session.cycles(),
                })]
            }
        }
        (Phase::Requesting, Msg::FetchFailed(error))
        | (Phase::Decoding, Msg::DecodeFailed(error))
        | (Phase::Dispatching { .. }, Msg::DispatchFailed(error)) => {
            session.set_phase(Phase::Failed);
            vec![Effect::Finish(Outcome::Failed {
                cycle: session.cycles(),
                error,
            })]
        }
        _ => Vec::new(),
    };

    (session, effects)
}
