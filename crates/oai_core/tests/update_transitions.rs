use std::sync::Once;

use oai_core::{
    update, Continuation, Effect, HarvestRequest, HarvestSession, Msg, Outcome, Phase, Verb,
};

type TestMsg = Msg<&'static str>;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn request() -> HarvestRequest {
    HarvestRequest::new("https://example.org/oai")
        .with_verb(Verb::ListIdentifiers)
        .with_metadata_prefix("oai_dc")
        .with_set("physics")
        .with_from("2020-01-01")
}

fn step(
    session: HarvestSession,
    msg: TestMsg,
) -> (HarvestSession, Vec<Effect<&'static str>>) {
    update(session, msg)
}

/// Drives one full cycle from `Requesting` and returns the effects of `Dispatched`.
fn complete_cycle(
    session: HarvestSession,
    continuation: Continuation,
) -> (HarvestSession, Vec<Effect<&'static str>>) {
    let (session, _) = step(session, Msg::Fetched);
    let (session, _) = step(session, Msg::Decoded { continuation });
    step(session, Msg::Dispatched)
}

#[test]
fn start_issues_first_fetch() {
    init_logging();
    let (session, effects) = step(HarvestSession::new(request()), Msg::Start);

    assert_eq!(session.phase(), &Phase::Requesting);
    assert_eq!(session.cycles(), 1);
    assert_eq!(
        effects,
        vec![Effect::Fetch {
            url: "https://example.org/oai?verb=ListIdentifiers&set=physics&metadataPrefix=oai_dc&from=2020-01-01"
                .to_string(),
        }]
    );
}

#[test]
fn dispatch_happens_before_the_continuation_is_followed() {
    init_logging();
    let (session, _) = step(HarvestSession::new(request()), Msg::Start);
    let (session, effects) = step(session, Msg::Fetched);
    assert_eq!(effects, vec![Effect::Decode]);

    let continuation = Continuation::from_token(Some("T1"));
    let (session, effects) = step(
        session,
        Msg::Decoded {
            continuation: continuation.clone(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::Dispatch {
            continuation: continuation.clone()
        }]
    );
    assert_eq!(session.phase(), &Phase::Dispatching { continuation });
    assert_eq!(session.cycles(), 1);
}

#[test]
fn continuation_clears_filters_and_starts_new_cycle() {
    init_logging();
    let (session, _) = step(HarvestSession::new(request()), Msg::Start);
    let (session, effects) = complete_cycle(session, Continuation::from_token(Some("T1")));

    assert_eq!(session.cycles(), 2);
    assert_eq!(session.phase(), &Phase::Requesting);
    assert_eq!(session.request().set, None);
    assert_eq!(session.request().metadata_prefix, None);
    assert_eq!(session.request().from, None);
    assert_eq!(session.request().resumption_token.as_deref(), Some("T1"));
    assert_eq!(
        effects,
        vec![Effect::Fetch {
            url: "https://example.org/oai?verb=ListIdentifiers&resumptionToken=T1".to_string(),
        }]
    );
}

#[test]
fn token_sequence_produces_one_cycle_per_response() {
    init_logging();
    let tokens = [Some("a"), Some("b"), Some("c"), None];
    let (mut session, _) = step(HarvestSession::new(request()), Msg::Start);
    let mut finish = None;

    for token in tokens {
        let (next, effects) = complete_cycle(session, Continuation::from_token(token));
        session = next;
        if let Some(Effect::Finish(outcome)) = effects.into_iter().next() {
            finish = Some(outcome);
        }
    }

    assert_eq!(session.phase(), &Phase::Done);
    assert_eq!(finish, Some(Outcome::Done { cycles: 4 }));
}

#[test]
fn empty_token_ends_the_harvest() {
    init_logging();
    let (session, _) = step(HarvestSession::new(request()), Msg::Start);
    let (session, effects) = complete_cycle(session, Continuation::from_token(Some("")));

    assert_eq!(session.phase(), &Phase::Done);
    assert_eq!(effects, vec![Effect::Finish(Outcome::Done { cycles: 1 })]);
}

#[test]
fn transport_failure_is_terminal() {
    init_logging();
    let (session, _) = step(HarvestSession::new(request()), Msg::Start);
    let (session, effects) = step(session, Msg::FetchFailed("connection refused"));

    assert_eq!(session.phase(), &Phase::Failed);
    assert_eq!(
        effects,
        vec![Effect::Finish(Outcome::Failed {
            cycle: 1,
            error: "connection refused",
        })]
    );

    // Terminal sessions ignore further input.
    let (after, effects) = step(session.clone(), Msg::Start);
    assert_eq!(after, session);
    assert!(effects.is_empty());
}

#[test]
fn decode_failure_on_second_cycle_reports_cycle() {
    init_logging();
    let (session, _) = step(HarvestSession::new(request()), Msg::Start);
    let (session, _) = complete_cycle(session, Continuation::from_token(Some("T1")));
    let (session, _) = step(session, Msg::Fetched);
    let (session, effects) = step(session, Msg::DecodeFailed("bad xml"));

    assert!(session.phase().is_terminal());
    assert_eq!(
        effects,
        vec![Effect::Finish(Outcome::Failed {
            cycle: 2,
            error: "bad xml",
        })]
    );
}

#[test]
fn dispatch_failure_is_terminal() {
    init_logging();
    let (session, _) = step(HarvestSession::new(request()), Msg::Start);
    let (session, _) = step(session, Msg::Fetched);
    let (session, _) = step(
        session,
        Msg::Decoded {
            continuation: Continuation::from_token(Some("T1")),
        },
    );
    let (session, effects) = step(session, Msg::DispatchFailed("outlet closed"));

    assert_eq!(session.phase(), &Phase::Failed);
    assert_eq!(effects.len(), 1);
}

#[test]
fn messages_out_of_phase_are_ignored() {
    init_logging();
    let idle = HarvestSession::new(request());
    let (next, effects) = step(idle.clone(), Msg::Fetched);
    assert_eq!(next, idle);
    assert!(effects.is_empty());

    let (requesting, _) = step(idle, Msg::Start);
    let (next, effects) = step(requesting.clone(), Msg::Dispatched);
    assert_eq!(next, requesting);
    assert!(effects.is_empty());

    let (next, effects) = step(requesting.clone(), Msg::DecodeFailed("late"));
    assert_eq!(next, requesting);
    assert!(effects.is_empty());
}
