mod support;

use std::time::Duration;

use oai_core::{HarvestRequest, Verb};
use oai_engine::{HarvestError, HarvestEvent, HarvestHandle, Harvester, TransportFailure};
use support::{identifiers_page, init_logging, HangingFetcher, ScriptedFetcher, BASE_URL};

#[test]
fn events_arrive_in_order_and_end_with_finished() {
    init_logging();
    let pages = vec![
        identifiers_page(&["a", "b"], Some("T1")),
        identifiers_page(&["c"], None),
    ];
    let (fetcher, _urls) = ScriptedFetcher::pages(pages);
    let request = HarvestRequest::new(BASE_URL).with_verb(Verb::ListIdentifiers);
    let handle = HarvestHandle::spawn_with(Harvester::with_fetcher(Box::new(fetcher)), request);

    let events: Vec<HarvestEvent> = handle.collect();
    assert_eq!(events.len(), 3);

    match &events[0] {
        HarvestEvent::Batch {
            response,
            continuation,
        } => {
            assert_eq!(response.item_count(), 2);
            assert_eq!(continuation.token, "T1");
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[1] {
        HarvestEvent::Batch { continuation, .. } => assert!(!continuation.present),
        other => panic!("unexpected event {other:?}"),
    }
    match &events[2] {
        HarvestEvent::Finished(Ok(summary)) => {
            assert_eq!(summary.cycles, 2);
            assert_eq!(summary.items, 3);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn cancel_aborts_an_in_flight_fetch() {
    init_logging();
    let request = HarvestRequest::new(BASE_URL).with_verb(Verb::ListIdentifiers);
    let handle = HarvestHandle::spawn_with(Harvester::with_fetcher(Box::new(HangingFetcher)), request);

    std::thread::sleep(Duration::from_millis(50));
    assert!(handle.try_recv().is_none());
    handle.cancel();

    match handle.recv() {
        Some(HarvestEvent::Finished(Err(HarvestError::Transport(err)))) => {
            assert_eq!(err.kind, TransportFailure::Cancelled);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(handle.recv().is_none());
}

#[test]
fn unknown_fingerprint_prevents_spawning() {
    let mut request = HarvestRequest::new(BASE_URL);
    request.transport.spoof_tls = true;
    request.transport.fingerprint = "netscape".to_string();
    assert!(HarvestHandle::spawn(request).is_err());
}
