//! Debounced analysis scheduler
//!
//! Coalesces bursts of source changes into one analysis pass:
//!
//! ```text
//!            change                         timer fires
//!   Idle ───────────────▶ Pending(timer) ──────────────▶ Idle + analysis pass
//!                          │      ▲
//!                          └──────┘ change: abort timer, arm a new one
//! ```
//!
//! The pass reads the source text when the timer fires, not when it was
//! armed. Markers of a pass are dropped if a later pass already applied its
//! own.

use crate::analyzer::{AnalyzerSlot, Diagnostic, LocalAnalyzer};
use crate::state::Store;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

/// Delay between the last change and the analysis pass
pub const ANALYZE_DEBOUNCE_TIME: Duration = Duration::from_millis(500);

/// Stable identifier of an open document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(String);

impl ModelId {
    /// Fresh identifier
    #[must_use]
    pub fn new() -> Self {
        Self(format!("inmemory://model/{}", uuid::Uuid::new_v4()))
    }

    /// Identifier as text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Diagnostics surface of the editor
pub trait MarkerSink: Send + Sync {
    /// Replace all markers of `model`
    fn set_markers(&self, model: &ModelId, markers: Vec<Diagnostic>);
}

/// Source of the current text
pub trait SourceText: Send + Sync {
    /// Text as of now
    fn current_text(&self) -> String;
}

impl SourceText for Store {
    fn current_text(&self) -> String {
        self.code()
    }
}

enum Timer {
    Idle,
    Pending { generation: u64, handle: JoinHandle<()> },
}

struct Slots {
    timer: Timer,
    in_flight: Option<AbortHandle>,
}

struct Shared {
    analyzer: Arc<dyn LocalAnalyzer>,
    source: Arc<dyn SourceText>,
    sink: Arc<dyn MarkerSink>,
    model: ModelId,
    delay: Duration,
    slots: Mutex<Slots>,
    next_generation: AtomicU64,
    // generation of the last pass whose markers reached the sink
    applied: Mutex<u64>,
    closed: AtomicBool,
}

impl Shared {
    async fn fire(&self, generation: u64) {
        {
            let mut slots = self.slots.lock();
            let current = matches!(
                &slots.timer,
                Timer::Pending { generation: g, .. } if *g == generation
            );
            if !current {
                return;
            }
            if let Timer::Pending { handle, .. } = std::mem::replace(&mut slots.timer, Timer::Idle)
            {
                slots.in_flight = Some(handle.abort_handle());
            }
        }

        let code = self.source.current_text();
        tracing::debug!(generation, model = %self.model, "analysis pass started");
        match self.analyzer.analyze_code(&code).await {
            Ok(result) => self.apply(generation, result.markers),
            Err(e) => tracing::warn!("failed to perform code analysis: {}", e),
        }
    }

    fn apply(&self, generation: u64, markers: Vec<Diagnostic>) {
        let mut applied = self.applied.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if *applied > generation {
            tracing::debug!(generation, latest = *applied, "dropping stale markers");
            return;
        }
        *applied = generation;
        tracing::debug!(generation, count = markers.len(), "markers applied");
        self.sink.set_markers(&self.model, markers);
    }
}

/// Debounces change notifications into analysis passes
///
/// Must be used from within a Tokio runtime.
pub struct DebouncedAnalysisScheduler {
    shared: Option<Arc<Shared>>,
}

impl DebouncedAnalysisScheduler {
    /// Scheduler with the default delay
    #[must_use]
    pub fn new(
        slot: AnalyzerSlot,
        source: Arc<dyn SourceText>,
        sink: Arc<dyn MarkerSink>,
        model: ModelId,
    ) -> Self {
        Self::with_delay(slot, source, sink, model, ANALYZE_DEBOUNCE_TIME)
    }

    /// Scheduler with a custom delay
    #[must_use]
    pub fn with_delay(
        slot: AnalyzerSlot,
        source: Arc<dyn SourceText>,
        sink: Arc<dyn MarkerSink>,
        model: ModelId,
        delay: Duration,
    ) -> Self {
        let shared = match slot {
            AnalyzerSlot::Available(analyzer) => Some(Arc::new(Shared {
                analyzer,
                source,
                sink,
                model,
                delay,
                slots: Mutex::new(Slots {
                    timer: Timer::Idle,
                    in_flight: None,
                }),
                next_generation: AtomicU64::new(0),
                applied: Mutex::new(0),
                closed: AtomicBool::new(false),
            })),
            AnalyzerSlot::Unavailable => None,
        };
        Self { shared }
    }

    /// Handle a source change
    pub fn notify_change(&self) {
        let Some(shared) = &self.shared else {
            return;
        };
        if shared.closed.load(Ordering::Acquire) {
            return;
        }

        let generation = shared.next_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut slots = shared.slots.lock();
        if let Timer::Pending { generation: stale, handle } =
            std::mem::replace(&mut slots.timer, Timer::Idle)
        {
            handle.abort();
            tracing::trace!(stale, "pending analysis superseded");
        }

        let task_shared = Arc::clone(shared);
        let delay = shared.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task_shared.fire(generation).await;
        });
        slots.timer = Timer::Pending { generation, handle };
    }

    /// True while a timer is armed
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.shared
            .as_ref()
            .is_some_and(|s| matches!(s.slots.lock().timer, Timer::Pending { .. }))
    }

    /// True if an analyzer is attached
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.shared.is_some()
    }

    /// Cancel pending work and dispose the analyzer
    ///
    /// Calling it more than once is a no-op.
    pub fn shutdown(&self) {
        let Some(shared) = &self.shared else {
            return;
        };
        if shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut slots = shared.slots.lock();
            if let Timer::Pending { handle, .. } = std::mem::replace(&mut slots.timer, Timer::Idle)
            {
                handle.abort();
            }
            if let Some(in_flight) = slots.in_flight.take() {
                in_flight.abort();
            }
        }
        shared.analyzer.dispose();
        tracing::debug!(model = %shared.model, "analysis scheduler shut down");
    }
}

impl Drop for DebouncedAnalysisScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for DebouncedAnalysisScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebouncedAnalysisScheduler")
            .field("enabled", &self.is_enabled())
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalysisResult, LintAnalyzer};
    use crate::error::AnalyzerError;
    use crate::state::Action;
    use async_trait::async_trait;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(ModelId, Vec<Diagnostic>)>>,
    }

    impl MarkerSink for Recorder {
        fn set_markers(&self, model: &ModelId, markers: Vec<Diagnostic>) {
            self.calls.lock().push((model.clone(), markers));
        }
    }

    struct Failing;

    #[async_trait]
    impl LocalAnalyzer for Failing {
        async fn analyze_code(&self, _code: &str) -> Result<AnalysisResult, AnalyzerError> {
            Err(AnalyzerError::Analysis("engine crashed".to_string()))
        }

        fn dispose(&self) {}
    }

    fn scheduler(
        analyzer: Arc<dyn LocalAnalyzer>,
        store: &Store,
        sink: &Arc<Recorder>,
    ) -> DebouncedAnalysisScheduler {
        DebouncedAnalysisScheduler::new(
            AnalyzerSlot::Available(analyzer),
            Arc::new(store.clone()),
            sink.clone(),
            ModelId::from("model-1"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay_with_latest_text() {
        let store = Store::default();
        let sink = Arc::new(Recorder::default());
        let scheduler = scheduler(Arc::new(LintAnalyzer::new().unwrap()), &store, &sink);

        store.dispatch(Action::FileChange("pub fn main() {".to_string()));
        scheduler.notify_change();
        assert!(scheduler.is_pending());
        store.dispatch(Action::FileChange("pub fn main() { 1 }".to_string()));

        tokio::time::sleep(ANALYZE_DEBOUNCE_TIME + Duration::from_millis(10)).await;

        let calls = sink.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ModelId::from("model-1"));
        assert!(calls[0].1.is_empty());
        drop(calls);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_failure_applies_nothing() {
        let store = Store::default();
        let sink = Arc::new(Recorder::default());
        let scheduler = scheduler(Arc::new(Failing), &store, &sink);

        scheduler.notify_change();
        tokio::time::sleep(ANALYZE_DEBOUNCE_TIME * 2).await;

        assert!(sink.calls.lock().is_empty());
        scheduler.notify_change();
        assert!(scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_analyzer_ignores_changes() {
        let store = Store::default();
        let sink = Arc::new(Recorder::default());
        let scheduler = DebouncedAnalysisScheduler::new(
            AnalyzerSlot::Unavailable,
            Arc::new(store),
            sink.clone(),
            ModelId::new(),
        );

        scheduler.notify_change();
        assert!(!scheduler.is_enabled());
        assert!(!scheduler.is_pending());
        tokio::time::sleep(ANALYZE_DEBOUNCE_TIME * 2).await;
        assert!(sink.calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_and_disposes() {
        let store = Store::default();
        let sink = Arc::new(Recorder::default());
        let analyzer = Arc::new(LintAnalyzer::new().unwrap());
        let scheduler = scheduler(analyzer.clone(), &store, &sink);

        scheduler.notify_change();
        scheduler.shutdown();
        scheduler.shutdown();
        scheduler.notify_change();

        tokio::time::sleep(ANALYZE_DEBOUNCE_TIME * 2).await;
        assert!(sink.calls.lock().is_empty());
        assert!(analyzer.is_disposed());
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn model_ids_are_unique() {
        assert_ne!(ModelId::new(), ModelId::new());
        assert!(ModelId::new().as_str().starts_with("inmemory://model/"));
    }
}
