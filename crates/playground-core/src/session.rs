//! Editor session
//!
//! Binds one open document to the orchestrator and the analysis scheduler.
//! Every keystroke lands in the store first; the scheduler then reads the
//! latest text from there once the debounce window closes.

use crate::analyzer::AnalyzerSlot;
use crate::dispatch::{ActionDispatchOrchestrator, DispatchOutcome};
use crate::scheduler::{DebouncedAnalysisScheduler, MarkerSink, ModelId};
use crate::state::{Action, Store};
use std::sync::Arc;
use std::time::Duration;

/// The editor component of the playground
#[derive(Debug)]
pub struct EditorSession {
    orchestrator: Arc<ActionDispatchOrchestrator>,
    scheduler: DebouncedAnalysisScheduler,
}

impl EditorSession {
    /// Create session from an orchestrator and a scheduler
    #[must_use]
    pub fn new(
        orchestrator: Arc<ActionDispatchOrchestrator>,
        scheduler: DebouncedAnalysisScheduler,
    ) -> Self {
        Self {
            orchestrator,
            scheduler,
        }
    }

    /// Session analyzing a fresh model with the given analyzer
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn open(
        orchestrator: Arc<ActionDispatchOrchestrator>,
        slot: AnalyzerSlot,
        sink: Arc<dyn MarkerSink>,
        delay: Duration,
    ) -> Self {
        let scheduler = DebouncedAnalysisScheduler::with_delay(
            slot,
            Arc::new(orchestrator.store().clone()),
            sink,
            ModelId::new(),
            delay,
        );
        Self::new(orchestrator, scheduler)
    }

    /// Shared state
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Store {
        self.orchestrator.store()
    }

    /// Orchestrator behind the key-bound actions
    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<ActionDispatchOrchestrator> {
        &self.orchestrator
    }

    /// Analysis scheduler
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &DebouncedAnalysisScheduler {
        &self.scheduler
    }

    /// Record an edit and schedule analysis
    pub fn on_change(&self, text: impl Into<String>) {
        self.store().dispatch(Action::FileChange(text.into()));
        self.scheduler.notify_change();
    }

    /// Run action (Ctrl+Enter)
    pub async fn run(&self) -> DispatchOutcome {
        self.orchestrator.run_code().await
    }

    /// Format action (Ctrl+Shift+F)
    pub async fn format(&self) -> DispatchOutcome {
        self.orchestrator.format_code().await
    }

    /// Stop analysis and release the analyzer
    pub fn teardown(&self) {
        self.scheduler.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{Diagnostic, LintAnalyzer, Severity};
    use crate::api::MockPlaygroundApi;
    use crate::settings::InMemorySettingsStore;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Markers(Mutex<Vec<Vec<Diagnostic>>>);

    impl MarkerSink for Markers {
        fn set_markers(&self, _model: &ModelId, markers: Vec<Diagnostic>) {
            self.0.lock().push(markers);
        }
    }

    fn session(markers: &Arc<Markers>) -> EditorSession {
        let orchestrator = ActionDispatchOrchestrator::new(
            Store::default(),
            Arc::new(MockPlaygroundApi::new()),
            Arc::new(InMemorySettingsStore::default()),
        );
        EditorSession::open(
            Arc::new(orchestrator),
            AnalyzerSlot::Available(Arc::new(LintAnalyzer::new().unwrap())),
            markers.clone(),
            Duration::from_millis(500),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn change_updates_code_before_analysis() {
        let markers = Arc::new(Markers::default());
        let session = session(&markers);

        session.on_change("pub fn main() {");
        assert_eq!(session.store().code(), "pub fn main() {");
        assert!(session.scheduler().is_pending());

        tokio::time::sleep(Duration::from_millis(600)).await;
        let applied = markers.0.lock();
        assert_eq!(applied.len(), 1);
        assert!(applied[0].iter().any(|m| m.severity == Severity::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_analysis() {
        let markers = Arc::new(Markers::default());
        let session = session(&markers);

        session.on_change("todo");
        session.teardown();
        session.on_change("todo todo");

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(markers.0.lock().is_empty());
        assert_eq!(session.store().code(), "todo todo");
    }
}
