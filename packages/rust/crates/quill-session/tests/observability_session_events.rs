#![allow(missing_docs)]

use std::collections::HashSet;

#[path = "../src/observability/session_events.rs"]
mod session_events;

use session_events::SessionEvent;

#[test]
fn session_event_ids_are_non_empty_and_unique() {
    let mut seen = HashSet::new();
    for event in SessionEvent::ALL {
        let id = event.as_str();
        assert!(!id.is_empty());
        assert!(
            seen.insert(id),
            "duplicate observability event id detected: {id}"
        );
    }
}

#[test]
fn session_event_ids_follow_namespace_convention() {
    for event in SessionEvent::ALL {
        let id = event.as_str();
        assert!(
            id.starts_with("session.")
                || id.starts_with("cache.")
                || id.starts_with("retrieval.")
                || id.starts_with("store."),
            "unexpected event namespace: {id}"
        );
    }
}

#[test]
fn checkpoint_events_are_registered() {
    let ids: HashSet<&str> = SessionEvent::ALL
        .iter()
        .copied()
        .map(SessionEvent::as_str)
        .collect();

    for expected in [
        "cache.checkpoint.created",
        "cache.checkpoint.skipped",
        "cache.markers.loaded",
        "cache.markers.saved",
        "cache.markers.decode_failed",
        "session.turn.committed",
        "session.turn.aborted",
    ] {
        assert!(
            ids.contains(expected),
            "missing expected checkpoint observability event: {expected}"
        );
    }
}
