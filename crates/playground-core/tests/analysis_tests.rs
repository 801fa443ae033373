use playground_core::{
    AnalyzerSlot, DebouncedAnalysisScheduler, EditorSession, ModelId, ANALYZE_DEBOUNCE_TIME,
};
use playground_test_utils::{
    setup_orchestrator, FakeApi, RecordingFileSink, RecordingMarkerSink, RecordingNotifier,
    ScriptedAnalyzer,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    session: EditorSession,
    analyzer: Arc<ScriptedAnalyzer>,
    sink: Arc<RecordingMarkerSink>,
}

fn harness(analyzer: ScriptedAnalyzer) -> Harness {
    let analyzer = Arc::new(analyzer);
    let sink = Arc::new(RecordingMarkerSink::new());
    let orchestrator = Arc::new(setup_orchestrator(
        Arc::new(FakeApi::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(RecordingFileSink::new()),
    ));
    let scheduler = DebouncedAnalysisScheduler::new(
        AnalyzerSlot::Available(analyzer.clone()),
        Arc::new(orchestrator.store().clone()),
        sink.clone(),
        ModelId::from("inmemory://model/main"),
    );
    Harness {
        session: EditorSession::new(orchestrator, scheduler),
        analyzer,
        sink,
    }
}

fn past_window() -> Duration {
    ANALYZE_DEBOUNCE_TIME + Duration::from_millis(100)
}

#[tokio::test(start_paused = true)]
async fn test_burst_coalesces_into_one_pass() {
    let h = harness(ScriptedAnalyzer::new());

    for text in ["p", "pu", "pub", "pub fn", "pub fn main"] {
        h.session.on_change(text);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(h.analyzer.seen().is_empty());

    tokio::time::sleep(past_window()).await;
    assert_eq!(h.analyzer.seen(), vec!["pub fn main".to_string()]);

    let updates = h.sink.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, ModelId::from("inmemory://model/main"));
    assert_eq!(updates[0].1, vec![ScriptedAnalyzer::marker_for("pub fn main")]);
}

#[tokio::test(start_paused = true)]
async fn test_spaced_changes_analyze_each() {
    let h = harness(ScriptedAnalyzer::new());

    h.session.on_change("a");
    tokio::time::sleep(past_window()).await;
    h.session.on_change("ab");
    tokio::time::sleep(past_window()).await;
    h.session.on_change("abc");
    tokio::time::sleep(past_window()).await;

    assert_eq!(h.analyzer.seen(), vec!["a", "ab", "abc"]);
    assert_eq!(h.sink.updates().len(), 3);
    assert_eq!(h.sink.last(), Some(vec![ScriptedAnalyzer::marker_for("abc")]));
}

#[tokio::test(start_paused = true)]
async fn test_identical_text_replaces_markers() {
    let h = harness(ScriptedAnalyzer::new());

    h.session.on_change("let x = 1");
    tokio::time::sleep(past_window()).await;
    h.session.on_change("let x = 1");
    tokio::time::sleep(past_window()).await;

    let updates = h.sink.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].1, updates[1].1);
    assert_eq!(updates[1].1.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_pass_does_not_overwrite_newer_markers() {
    let h = harness(ScriptedAnalyzer::new().with_latencies([
        Duration::from_millis(1000),
        Duration::ZERO,
    ]));

    h.session.on_change("old");
    // first pass starts at 500ms and resolves at 1500ms
    tokio::time::sleep(Duration::from_millis(600)).await;
    h.session.on_change("new");
    tokio::time::sleep(Duration::from_millis(1400)).await;

    assert_eq!(h.analyzer.seen(), vec!["old", "new"]);
    let updates = h.sink.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1, vec![ScriptedAnalyzer::marker_for("new")]);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_in_flight_pass() {
    let h = harness(ScriptedAnalyzer::new().with_latencies([Duration::from_millis(1000)]));

    h.session.on_change("let x = 1");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.analyzer.seen().len(), 1);

    h.session.teardown();
    h.session.teardown();
    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert!(h.sink.updates().is_empty());
    assert_eq!(h.analyzer.disposals(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_edits_without_analyzer_still_update_code() {
    let sink = Arc::new(RecordingMarkerSink::new());
    let orchestrator = Arc::new(setup_orchestrator(
        Arc::new(FakeApi::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(RecordingFileSink::new()),
    ));
    let session = EditorSession::open(
        orchestrator,
        AnalyzerSlot::Unavailable,
        sink.clone(),
        ANALYZE_DEBOUNCE_TIME,
    );

    session.on_change("pub fn main() { todo }");
    tokio::time::sleep(past_window()).await;

    assert_eq!(session.store().code(), "pub fn main() { todo }");
    assert!(!session.scheduler().is_enabled());
    assert!(sink.updates().is_empty());
}
