#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quill_cache::{CheckpointPlanner, ProviderBackend};
use quill_session::test_support::{ScriptedAdapter, ScriptedReply};
use quill_session::{
    MemorySlotBackend, SessionCacheStore, SessionConfig, SessionError, SessionManager,
    SlotBackend, UserInput,
};
use quill_tokenizer::ApproxCounter;
use quill_types::Message;
use quill_window::TranscriptEntry;
use serde_json::json;

/// Text estimated at exactly `tokens` tokens.
fn tokens(tokens: usize) -> String {
    "x".repeat(tokens * 4)
}

/// Memory slots whose writes take a while to land.
struct SlowSlotBackend {
    inner: MemorySlotBackend,
    delay: Duration,
}

#[async_trait]
impl SlotBackend for SlowSlotBackend {
    fn backend_name(&self) -> &'static str {
        "slow-memory"
    }

    async fn get(&self, session_id: &str, slot: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(session_id, slot).await
    }

    async fn set(&self, session_id: &str, slot: &str, value: String) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(session_id, slot, value).await
    }

    async fn clear(&self, session_id: &str) -> anyhow::Result<()> {
        self.inner.clear(session_id).await
    }
}

fn manager(adapter: &Arc<ScriptedAdapter>, config: SessionConfig) -> SessionManager {
    let store = SessionCacheStore::new(Arc::new(MemorySlotBackend::new()));
    SessionManager::new(
        config,
        CheckpointPlanner::new(Arc::new(ApproxCounter)),
        store,
        adapter.clone(),
    )
}

#[tokio::test]
async fn turn_streams_commits_and_persists() {
    let adapter = Arc::new(ScriptedAdapter::new([ScriptedReply::Fragments(vec![
        "Hi".to_string(),
        " there".to_string(),
    ])]));
    let manager = manager(&adapter, SessionConfig::default());
    manager.start_session("s").await.expect("start");

    let outcome = manager
        .run_turn("s", UserInput::new("hello").with_document_context("doc"))
        .await
        .expect("turn");

    assert_eq!(outcome.response, "Hi there");
    assert_eq!(outcome.markers, Vec::<usize>::new());
    assert_eq!(outcome.new_checkpoint, None);
    assert_eq!(outcome.window.pairs, 1);

    let prompts = adapter.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].system.has_cache_point());
    assert_eq!(
        prompts[0].user_message(),
        Some(&Message::user("<context>doc</context>\n\nhello"))
    );

    // The window stores the raw user text, not the assembled one.
    let history = manager.checkpointed_history("s").await.expect("history");
    assert_eq!(
        history,
        vec![Message::user("hello"), Message::assistant("Hi there")]
    );
}

#[tokio::test]
async fn budget_triggers_checkpoint_used_by_next_turn() {
    let adapter = Arc::new(ScriptedAdapter::new([
        ScriptedReply::text(tokens(2000)),
        ScriptedReply::text("short"),
    ]));
    let manager = manager(&adapter, SessionConfig::default());
    manager.start_session("s").await.expect("start");

    let first = manager
        .run_turn("s", UserInput::new("q1"))
        .await
        .expect("turn 1");
    assert_eq!(first.new_checkpoint, Some(1));
    assert_eq!(first.markers, vec![1]);
    assert_eq!(manager.store().load("s").await, vec![1]);

    manager
        .run_turn("s", UserInput::new("q2"))
        .await
        .expect("turn 2");
    let prompts = adapter.prompts();
    let second = &prompts[1];
    assert!(!second.messages[0].has_cache_point());
    assert!(second.messages[1].has_cache_point());
    assert_eq!(second.checkpoint_count(), 2);
}

#[tokio::test]
async fn markers_are_read_from_the_store_each_turn() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let manager = manager(&adapter, SessionConfig::default());
    manager.start_session("s").await.expect("start");
    manager
        .run_turn("s", UserInput::new("q1"))
        .await
        .expect("turn 1");

    manager.store().save("s", &[0]).await.expect("save");
    manager
        .run_turn("s", UserInput::new("q2"))
        .await
        .expect("turn 2");

    let prompts = adapter.prompts();
    assert!(prompts[1].messages[0].has_cache_point());
    assert!(!prompts[1].messages[1].has_cache_point());
}

#[tokio::test]
async fn request_error_commits_nothing() {
    let adapter = Arc::new(ScriptedAdapter::new([ScriptedReply::RequestError(
        "throttled".to_string(),
    )]));
    let manager = manager(&adapter, SessionConfig::default());
    manager.start_session("s").await.expect("start");

    let error = manager
        .run_turn("s", UserInput::new("q1"))
        .await
        .expect_err("adapter failure");
    assert!(matches!(error, SessionError::Adapter(_)));
    assert!(manager.checkpointed_history("s").await.expect("history").is_empty());
}

#[tokio::test]
async fn mid_stream_error_commits_nothing() {
    let adapter = Arc::new(ScriptedAdapter::new([ScriptedReply::BreakAfter {
        fragments: vec![tokens(3000)],
        error: "connection reset".to_string(),
    }]));
    let manager = manager(&adapter, SessionConfig::default());
    manager.start_session("s").await.expect("start");

    let error = manager
        .run_turn("s", UserInput::new("q1"))
        .await
        .expect_err("stream failure");
    assert!(error.to_string().contains("connection reset"));
    assert!(manager.checkpointed_history("s").await.expect("history").is_empty());
    assert_eq!(manager.store().load("s").await, Vec::<usize>::new());
}

#[tokio::test]
async fn cancelled_turn_commits_nothing_and_releases_the_session() {
    let adapter = Arc::new(ScriptedAdapter::new([
        ScriptedReply::Hang(vec![tokens(3000)]),
        ScriptedReply::text("done"),
    ]));
    let manager = manager(&adapter, SessionConfig::default());
    manager.start_session("s").await.expect("start");

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        manager.run_turn("s", UserInput::new("q1")),
    )
    .await;
    assert!(cancelled.is_err());
    assert!(manager.checkpointed_history("s").await.expect("history").is_empty());

    let outcome = manager
        .run_turn("s", UserInput::new("q2"))
        .await
        .expect("next turn");
    assert_eq!(outcome.response, "done");
    assert_eq!(outcome.window.pairs, 1);
}

#[tokio::test]
async fn sessions_are_isolated() {
    let adapter = Arc::new(ScriptedAdapter::new([
        ScriptedReply::text(tokens(2500)),
        ScriptedReply::text("b-answer"),
    ]));
    let manager = manager(&adapter, SessionConfig::default());
    manager.start_session("a").await.expect("start a");
    manager.start_session("b").await.expect("start b");

    manager
        .run_turn("a", UserInput::new("a-question"))
        .await
        .expect("turn a");
    manager
        .run_turn("b", UserInput::new("b-question"))
        .await
        .expect("turn b");

    assert_eq!(manager.store().load("a").await, vec![1]);
    assert_eq!(manager.store().load("b").await, Vec::<usize>::new());
    let b_history = manager.checkpointed_history("b").await.expect("history b");
    assert_eq!(
        b_history,
        vec![Message::user("b-question"), Message::assistant("b-answer")]
    );
    assert_eq!(manager.session_ids().await, vec!["a", "b"]);
}

#[tokio::test]
async fn concurrent_sessions_progress_independently() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let manager = Arc::new(manager(&adapter, SessionConfig::default()));
    for id in ["a", "b", "c"] {
        manager.start_session(id).await.expect("start");
    }

    let mut handles = Vec::new();
    for id in ["a", "b", "c"] {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            for turn in 0..3 {
                manager
                    .run_turn(id, UserInput::new(format!("{id}-{turn}")))
                    .await
                    .expect("turn");
            }
        }));
    }
    for handle in handles {
        handle.await.expect("join");
    }

    for id in ["a", "b", "c"] {
        let history = manager.checkpointed_history(id).await.expect("history");
        assert_eq!(history.len(), 6);
        assert_eq!(history[0], Message::user(format!("{id}-0")));
        assert_eq!(history[4], Message::user(format!("{id}-2")));
    }
}

#[tokio::test]
async fn resume_discards_previous_markers() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let manager = manager(&adapter, SessionConfig::default());
    manager.store().save("s", &[0, 2, 4]).await.expect("seed");

    let markers = manager
        .resume_session(
            "s",
            vec![
                TranscriptEntry::user("q1"),
                TranscriptEntry::assistant(&tokens(1200)),
                TranscriptEntry::user("q2"),
                TranscriptEntry::assistant(&tokens(900)),
            ],
        )
        .await
        .expect("resume");
    assert_eq!(markers, vec![3]);
    assert_eq!(manager.store().load("s").await, vec![3]);

    let short = manager
        .resume_session("t", vec![TranscriptEntry::user("q"), TranscriptEntry::assistant("a")])
        .await
        .expect("resume short");
    assert!(short.is_empty());
}

#[tokio::test]
async fn resume_from_json_transcript() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let manager = manager(&adapter, SessionConfig::default());
    let transcript: Vec<TranscriptEntry> = serde_json::from_value(json!([
        {"type": "assistant_message", "output": "Welcome!", "metadata": {"exclude_from_history": true}},
        {"type": "user_message", "output": "draft the intro"},
        {"type": "run", "output": "tool call"},
        {"type": "assistant_message", "output": "Here it is"},
        {"type": "user_message", "output": "/save en", "metadata": {"exclude_from_history": true}}
    ]))
    .expect("transcript json");

    manager.resume_session("s", transcript).await.expect("resume");
    let history = manager.checkpointed_history("s").await.expect("history");
    assert_eq!(
        history,
        vec![
            Message::user("draft the intro"),
            Message::assistant("Here it is")
        ]
    );
}

#[tokio::test]
async fn unknown_session_is_an_error() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let manager = manager(&adapter, SessionConfig::default());
    let error = manager
        .run_turn("ghost", UserInput::new("hi"))
        .await
        .expect_err("unknown");
    assert!(matches!(error, SessionError::UnknownSession(id) if id == "ghost"));
    assert!(adapter.prompts().is_empty());
}

#[tokio::test]
async fn stored_window_reattaches_after_restart() {
    let backend = Arc::new(MemorySlotBackend::new());
    let adapter = Arc::new(ScriptedAdapter::new([
        ScriptedReply::text("a1"),
        ScriptedReply::text("a2"),
    ]));
    let planner = || CheckpointPlanner::new(Arc::new(ApproxCounter));

    let first = SessionManager::new(
        SessionConfig::default(),
        planner(),
        SessionCacheStore::new(backend.clone()),
        adapter.clone(),
    );
    first.start_session("s").await.expect("start");
    first.run_turn("s", UserInput::new("q1")).await.expect("turn");
    drop(first);

    let second = SessionManager::new(
        SessionConfig::default(),
        planner(),
        SessionCacheStore::new(backend),
        adapter.clone(),
    );
    let outcome = second
        .run_turn("s", UserInput::new("q2"))
        .await
        .expect("turn after restart");
    assert_eq!(outcome.window.pairs, 2);
    assert_eq!(
        adapter.prompts()[1].messages[..2],
        [Message::user("q1"), Message::assistant("a1")]
    );
}

#[tokio::test]
async fn end_session_clears_state() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let manager = manager(&adapter, SessionConfig::default());
    manager.start_session("s").await.expect("start");
    manager.run_turn("s", UserInput::new("q")).await.expect("turn");

    assert!(manager.end_session("s").await.expect("end"));
    assert!(!manager.end_session("s").await.expect("end again"));
    assert!(matches!(
        manager.run_turn("s", UserInput::new("q")).await,
        Err(SessionError::UnknownSession(_))
    ));
}

#[tokio::test]
async fn rendered_history_uses_provider_shapes() {
    let adapter = Arc::new(ScriptedAdapter::new([ScriptedReply::text(tokens(2000))]));
    let mut config = SessionConfig::default();
    config.system_prompt = "sys".to_string();
    let manager = manager(&adapter, config);
    manager.start_session("s").await.expect("start");
    manager.run_turn("s", UserInput::new("q")).await.expect("turn");

    let bedrock = manager
        .rendered_history("s", ProviderBackend::Bedrock)
        .await
        .expect("bedrock");
    assert_eq!(
        bedrock.system,
        vec![json!({"text": "sys"}), json!({"cachePoint": {"type": "default"}})]
    );
    assert_eq!(
        bedrock.messages[1]["content"][1],
        json!({"cachePoint": {"type": "default"}})
    );

    let anthropic = manager
        .rendered_history("s", ProviderBackend::Anthropic)
        .await
        .expect("anthropic");
    assert_eq!(
        anthropic.messages[1]["content"][0]["cache_control"],
        json!({"type": "ephemeral"})
    );
}

#[tokio::test]
async fn dropped_turn_keeps_the_session_until_its_state_is_saved() {
    let adapter = Arc::new(ScriptedAdapter::new([
        ScriptedReply::text(tokens(3000)),
        ScriptedReply::text("short"),
    ]));
    let backend = Arc::new(SlowSlotBackend {
        inner: MemorySlotBackend::new(),
        delay: Duration::from_millis(200),
    });
    let manager = SessionManager::new(
        SessionConfig::default(),
        CheckpointPlanner::new(Arc::new(ApproxCounter)),
        SessionCacheStore::new(backend),
        adapter.clone(),
    );
    manager.start_session("s").await.expect("start");

    // Committed in memory, then dropped while the slow writes are pending.
    let dropped = tokio::time::timeout(
        Duration::from_millis(50),
        manager.run_turn("s", UserInput::new("q1")),
    )
    .await;
    assert!(dropped.is_err());

    let outcome = manager
        .run_turn("s", UserInput::new("q2"))
        .await
        .expect("next turn");
    let prompts = adapter.prompts();
    assert!(prompts[1].messages[1].has_cache_point());
    assert_eq!(outcome.markers, vec![1, 3]);
    assert_eq!(manager.store().load("s").await, vec![1, 3]);
}

#[tokio::test]
async fn resumed_session_recalls_turns_beyond_the_window() {
    let adapter = Arc::new(ScriptedAdapter::default());
    let mut config = SessionConfig::default();
    config.window_capacity = 1;
    config.retrieval.enabled = true;
    config.retrieval.embedding_url = None;
    config.retrieval.top_k = 2;
    let manager = manager(&adapter, config);

    manager
        .resume_session(
            "s",
            vec![
                TranscriptEntry::user("alpha topic question"),
                TranscriptEntry::assistant("alpha answer"),
                TranscriptEntry::user("beta"),
                TranscriptEntry::assistant("beta answer"),
            ],
        )
        .await
        .expect("resume");
    manager
        .run_turn("s", UserInput::new("alpha topic question"))
        .await
        .expect("turn");

    let prompts = adapter.prompts();
    let user_text = prompts[0].user_message().map(Message::text).unwrap_or_default();
    assert!(user_text.starts_with("<relevant_history>"));
    assert!(user_text.contains("alpha answer"));
}
