//! Testing utilities for the playground workspace
//!
//! Shared fakes for the seams of `playground-core`: remote service, analyzer,
//! marker surface, notifier and file sink.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use playground_core::{
    ActionDispatchOrchestrator, AnalysisResult, AnalyzerError, ApiError, CompletionList,
    Diagnostic, FileError, FileSink, InMemorySettingsStore, LocalAnalyzer, MarkerSink, ModelId,
    Notifier, PlaygroundApi, RunResult, Severity, ShareResponse, Snippet, State, Store,
    SuggestionQuery, TextRange,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// One recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Version,
    Suggestions(SuggestionQuery),
    Evaluate { code: String, format: bool },
    Format(String),
    GetSnippet(String),
    Share(String),
}

/// Scripted `PlaygroundApi`
///
/// Every operation answers with its configured result and records the call.
/// With a hold installed, calls wait for `release` before answering.
pub struct FakeApi {
    version: Mutex<Result<String, ApiError>>,
    suggestions: Mutex<Result<CompletionList, ApiError>>,
    run: Mutex<Result<RunResult, ApiError>>,
    format: Mutex<Result<RunResult, ApiError>>,
    snippet: Mutex<Result<Snippet, ApiError>>,
    share: Mutex<Result<ShareResponse, ApiError>>,
    calls: Mutex<Vec<ApiCall>>,
    hold: Option<Arc<Notify>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            version: Mutex::new(Ok("v0.0.0-test".to_string())),
            suggestions: Mutex::new(Ok(CompletionList::default())),
            run: Mutex::new(Ok(RunResult::default())),
            format: Mutex::new(Ok(RunResult::default())),
            snippet: Mutex::new(Ok(Snippet {
                file_name: "snippet.gleam".to_string(),
                code: "pub fn main() { Nil }".to_string(),
            })),
            share: Mutex::new(Ok(ShareResponse {
                snippet_id: "snippet-1".to_string(),
            })),
            calls: Mutex::new(Vec::new()),
            hold: None,
        }
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(self, result: Result<RunResult, ApiError>) -> Self {
        *self.run.lock() = result;
        self
    }

    pub fn with_format(self, result: Result<RunResult, ApiError>) -> Self {
        *self.format.lock() = result;
        self
    }

    pub fn with_snippet(self, result: Result<Snippet, ApiError>) -> Self {
        *self.snippet.lock() = result;
        self
    }

    pub fn with_share(self, result: Result<ShareResponse, ApiError>) -> Self {
        *self.share.lock() = result;
        self
    }

    /// Make every call wait until `release`
    pub fn held(mut self) -> Self {
        self.hold = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one held call answer
    pub fn release(&self) {
        if let Some(hold) = &self.hold {
            hold.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn record(&self, call: ApiCall) {
        self.calls.lock().push(call);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
    }
}

#[async_trait]
impl PlaygroundApi for FakeApi {
    async fn get_version(&self) -> Result<String, ApiError> {
        self.record(ApiCall::Version).await;
        self.version.lock().clone()
    }

    async fn get_suggestions(&self, query: SuggestionQuery) -> Result<CompletionList, ApiError> {
        self.record(ApiCall::Suggestions(query)).await;
        self.suggestions.lock().clone()
    }

    async fn evaluate_code(&self, code: String, format: bool) -> Result<RunResult, ApiError> {
        self.record(ApiCall::Evaluate { code, format }).await;
        self.run.lock().clone()
    }

    async fn format_code(&self, code: String) -> Result<RunResult, ApiError> {
        self.record(ApiCall::Format(code)).await;
        self.format.lock().clone()
    }

    async fn get_snippet(&self, id: String) -> Result<Snippet, ApiError> {
        self.record(ApiCall::GetSnippet(id)).await;
        self.snippet.lock().clone()
    }

    async fn share_snippet(&self, code: String) -> Result<ShareResponse, ApiError> {
        self.record(ApiCall::Share(code)).await;
        self.share.lock().clone()
    }
}

/// Analyzer that echoes the analyzed text back as a single marker
///
/// Records every text it sees. Per-call latencies can be queued to make
/// passes resolve out of order.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    seen: Mutex<Vec<String>>,
    latencies: Mutex<VecDeque<Duration>>,
    disposals: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue latencies for the next passes, in call order
    pub fn with_latencies(self, latencies: impl IntoIterator<Item = Duration>) -> Self {
        self.latencies.lock().extend(latencies);
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    /// Marker produced for `code`
    pub fn marker_for(code: &str) -> Diagnostic {
        Diagnostic::new(TextRange::on_line(1, 1, 2), Severity::Info, code)
    }
}

#[async_trait]
impl LocalAnalyzer for ScriptedAnalyzer {
    async fn analyze_code(&self, code: &str) -> Result<AnalysisResult, AnalyzerError> {
        self.seen.lock().push(code.to_string());
        let latency = self.latencies.lock().pop_front();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(AnalysisResult {
            markers: vec![Self::marker_for(code)],
        })
    }

    fn dispose(&self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Marker surface that records every update
#[derive(Default)]
pub struct RecordingMarkerSink {
    updates: Mutex<Vec<(ModelId, Vec<Diagnostic>)>>,
}

impl RecordingMarkerSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(ModelId, Vec<Diagnostic>)> {
        self.updates.lock().clone()
    }

    pub fn last(&self) -> Option<Vec<Diagnostic>> {
        self.updates.lock().last().map(|(_, markers)| markers.clone())
    }
}

impl MarkerSink for RecordingMarkerSink {
    fn set_markers(&self, model: &ModelId, markers: Vec<Diagnostic>) {
        self.updates.lock().push((model.clone(), markers));
    }
}

/// Notifier that records alerts
#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().push(message.to_string());
    }
}

/// File sink that keeps files in memory, or refuses every write
#[derive(Default)]
pub struct RecordingFileSink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
    read_only: bool,
}

impl RecordingFileSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().clone()
    }
}

impl FileSink for RecordingFileSink {
    fn save(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, FileError> {
        if self.read_only {
            return Err(FileError::write(
                file_name,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only sink"),
            ));
        }
        self.files
            .lock()
            .push((file_name.to_string(), contents.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}

/// Orchestrator over `api` with in-memory settings and recording sinks
pub fn setup_orchestrator(
    api: Arc<FakeApi>,
    notifier: Arc<RecordingNotifier>,
    files: Arc<RecordingFileSink>,
) -> ActionDispatchOrchestrator {
    ActionDispatchOrchestrator::new(
        Store::new(State::default()),
        api,
        Arc::new(InMemorySettingsStore::default()),
    )
    .with_notifier(notifier)
    .with_file_sink(files)
}
