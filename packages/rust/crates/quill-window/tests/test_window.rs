//! Integration tests for ConversationWindow.

use quill_types::Message;
use quill_window::{ConversationWindow, TurnPair};

fn pair(tag: &str) -> (Message, Message) {
    (
        Message::user(format!("{tag}.user")),
        Message::assistant(format!("{tag}.assistant")),
    )
}

#[test]
fn test_empty_window_has_empty_history() {
    let window = ConversationWindow::new(3);
    assert!(window.history().is_empty());
    assert!(window.is_empty());
}

#[test]
fn test_append_and_history() {
    let mut window = ConversationWindow::new(10);
    let (u, a) = pair("A");
    window.append(u.clone(), a.clone());
    assert_eq!(window.history(), vec![u, a]);
}

#[test]
fn test_capacity_two_keeps_latest_two_pairs() {
    let mut window = ConversationWindow::new(2);
    for tag in ["A", "B", "C"] {
        let (u, a) = pair(tag);
        window.append(u, a);
    }
    let texts: Vec<String> = window.history().iter().map(Message::text).collect();
    assert_eq!(
        texts,
        vec!["B.user", "B.assistant", "C.user", "C.assistant"]
    );
}

#[test]
fn test_window_bound_holds_for_any_length() {
    for capacity in 1..5 {
        for n in 0..12 {
            let mut window = ConversationWindow::new(capacity);
            for i in 0..n {
                let (u, a) = pair(&i.to_string());
                window.append(u, a);
            }
            let history = window.history();
            assert_eq!(history.len(), 2 * n.min(capacity));
            let first_kept = n.saturating_sub(capacity);
            for (offset, chunk) in history.chunks(2).enumerate() {
                let i = first_kept + offset;
                assert_eq!(chunk[0].text(), format!("{i}.user"));
                assert_eq!(chunk[1].text(), format!("{i}.assistant"));
            }
        }
    }
}

#[test]
fn test_stats_track_evictions() {
    let mut window = ConversationWindow::new(2);
    for i in 0..5 {
        let (u, a) = pair(&i.to_string());
        window.append(u, a);
    }
    let stats = window.stats();
    assert_eq!(stats.pairs, 2);
    assert_eq!(stats.turns, 4);
    assert_eq!(stats.total_appended, 5);
    assert_eq!(stats.total_evicted, 3);
}

#[test]
fn test_from_pairs_keeps_newest() {
    let pairs: Vec<TurnPair> = (0..4)
        .map(|i| TurnPair::from_text(&format!("u{i}"), &format!("a{i}")))
        .collect();
    let window = ConversationWindow::from_pairs(2, pairs);
    assert_eq!(window.pairs()[0], TurnPair::from_text("u2", "a2"));
    assert_eq!(window.len(), 2);
}

#[test]
fn test_lines_are_trimmed_and_non_empty() {
    let mut window = ConversationWindow::new(2);
    window.append(
        Message::user("  first line  \n\n second line"),
        Message::assistant("answer"),
    );
    let lines = window.lines();
    assert!(lines.contains("first line"));
    assert!(lines.contains("second line"));
    assert!(lines.contains("answer"));
    assert_eq!(lines.len(), 3);
}

#[test]
#[should_panic(expected = "pair must start with a user turn")]
fn test_append_rejects_swapped_roles() {
    let mut window = ConversationWindow::new(2);
    window.append(Message::assistant("a"), Message::user("u"));
}
