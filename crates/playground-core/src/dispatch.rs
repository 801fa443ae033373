//! Action dispatch orchestrator
//!
//! Each dispatcher sequences one user-triggered operation:
//! 1. Announce loading (remote operations only)
//! 2. Perform the local or remote work
//! 3. Apply a success transition, or the error transition on failure
//!
//! Remote operations share a single-in-flight gate: a dispatcher that finds
//! another one running returns `DispatchOutcome::Busy` without touching state.
//! Local file failures are reported through the `Notifier`, never through
//! application state.

use crate::api::PlaygroundApi;
use crate::error::{DispatchError, FileError};
use crate::settings::{SettingsPatch, SettingsStore};
use crate::state::{Action, Store};
use crate::types::{BuildSettings, EditorPreferencesPatch, RuntimeKind, SourceDocument};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// How a dispatcher ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Success transition applied
    Completed,
    /// Failure reported (error transition or alert)
    Failed,
    /// Another remote operation was in flight; nothing happened
    Busy,
}

/// Blocking user notification for out-of-band failures
pub trait Notifier: Send + Sync {
    /// Show `message` to the user
    fn alert(&self, message: &str);
}

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn alert(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

/// Destination of exported documents
pub trait FileSink: Send + Sync {
    /// Store `contents` under `file_name`
    ///
    /// # Errors
    /// Returns `FileError` if the file cannot be written.
    fn save(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, FileError>;
}

/// Writes exported documents into a directory
#[derive(Debug, Clone)]
pub struct DirectoryFileSink {
    dir: PathBuf,
}

impl DirectoryFileSink {
    /// Sink writing into `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSink for DirectoryFileSink {
    fn save(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, FileError> {
        let name = Path::new(file_name);
        if file_name.is_empty() || name.file_name() != Some(name.as_os_str()) {
            return Err(FileError::InvalidName(file_name.to_string()));
        }
        let path = self.dir.join(name);
        std::fs::write(&path, contents).map_err(|e| FileError::write(&path, e))?;
        Ok(path)
    }
}

/// Characters `encodeURIComponent` leaves alone
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// File name given to code imported by name
fn imported_file_name(name: &str) -> String {
    format!("{}.gleam", utf8_percent_encode(name, URI_COMPONENT))
}

/// Coordinates dispatchers against the store, remote service and settings
pub struct ActionDispatchOrchestrator {
    store: Store,
    api: Arc<dyn PlaygroundApi>,
    settings: Arc<dyn SettingsStore>,
    notifier: Arc<dyn Notifier>,
    files: Arc<dyn FileSink>,
    gate: Mutex<()>,
}

impl ActionDispatchOrchestrator {
    /// Create orchestrator; exports go to the working directory
    #[must_use]
    pub fn new(
        store: Store,
        api: Arc<dyn PlaygroundApi>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            store,
            api,
            settings,
            notifier: Arc::new(TracingNotifier),
            files: Arc::new(DirectoryFileSink::new(".")),
            gate: Mutex::new(()),
        }
    }

    /// With notifier
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// With export destination
    #[must_use]
    pub fn with_file_sink(mut self, files: Arc<dyn FileSink>) -> Self {
        self.files = files;
        self
    }

    /// State handle
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Remote service
    #[inline]
    #[must_use]
    pub fn api(&self) -> &Arc<dyn PlaygroundApi> {
        &self.api
    }

    /// True while a remote operation holds the gate
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Run a remote operation under the gate with loading/error transitions
    async fn gated<F>(&self, dispatcher: &'static str, operation: F) -> DispatchOutcome
    where
        F: Future<Output = Result<Action, DispatchError>>,
    {
        let Ok(_guard) = self.gate.try_lock() else {
            tracing::debug!(dispatcher, "another operation is in flight");
            return DispatchOutcome::Busy;
        };

        tracing::info!(dispatcher, "started");
        self.store.dispatch(Action::Loading);
        match operation.await {
            Ok(action) => {
                tracing::info!(dispatcher, outcome = action.name(), "finished");
                self.store.dispatch(action);
                DispatchOutcome::Completed
            }
            Err(e) => {
                tracing::warn!(dispatcher, "failed: {}", e);
                self.store.dispatch(Action::Error(e.to_string()));
                DispatchOutcome::Failed
            }
        }
    }

    /// Replace the document with a local text file
    pub async fn import_file(&self, path: impl AsRef<Path>) -> DispatchOutcome {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match tokio::fs::read_to_string(path).await {
            Ok(code) => {
                tracing::info!(file = %path.display(), "file imported");
                self.store.dispatch(Action::ImportFile { file_name, code });
                DispatchOutcome::Completed
            }
            Err(e) => {
                let err = FileError::read(path, e);
                self.notifier
                    .alert(&format!("Failed to import a file: {err}"));
                DispatchOutcome::Failed
            }
        }
    }

    /// Replace the document with code handed over by name
    pub fn import_code(&self, name: &str, contents: impl Into<String>) {
        self.store.dispatch(Action::ImportFile {
            file_name: imported_file_name(name),
            code: contents.into(),
        });
    }

    /// Load a shared snippet, or the demo document when `id` is empty
    pub async fn load_snippet(&self, id: Option<&str>) -> DispatchOutcome {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            let demo = SourceDocument::demo();
            self.store.dispatch(Action::ImportFile {
                file_name: demo.file_name,
                code: demo.code,
            });
            return DispatchOutcome::Completed;
        };
        self.gated("load-snippet", self.fetch_snippet(id)).await
    }

    /// Build and run the current code with the configured runtime
    pub async fn run_code(&self) -> DispatchOutcome {
        self.gated("run-code", self.evaluate()).await
    }

    /// Format the current code
    ///
    /// A response without formatted text leaves code and result unchanged.
    pub async fn format_code(&self) -> DispatchOutcome {
        self.gated("format-code", self.format()).await
    }

    /// Share the current code and navigate to the new snippet
    pub async fn share_snippet(&self) -> DispatchOutcome {
        self.gated("share-snippet", self.share()).await
    }

    async fn fetch_snippet(&self, id: &str) -> Result<Action, DispatchError> {
        tracing::debug!(snippet = id, "loading snippet");
        let snippet = self.api.get_snippet(id.to_string()).await?;
        Ok(Action::ImportFile {
            file_name: snippet.file_name,
            code: snippet.code,
        })
    }

    async fn evaluate(&self) -> Result<Action, DispatchError> {
        let state = self.store.state();
        let build = state.settings.build;
        match build.runtime {
            RuntimeKind::GleamPlayground => {
                let result = self
                    .api
                    .evaluate_code(state.document.code, build.auto_format)
                    .await?;
                Ok(Action::BuildResult(result))
            }
            RuntimeKind::Unknown(kind) => Err(DispatchError::UnknownRuntime(kind)),
        }
    }

    async fn format(&self) -> Result<Action, DispatchError> {
        let result = self.api.format_code(self.store.code()).await?;
        match result.formatted.as_deref() {
            Some(formatted) if !formatted.is_empty() => Ok(Action::BuildResult(result)),
            _ => Ok(Action::Settle),
        }
    }

    async fn share(&self) -> Result<Action, DispatchError> {
        let response = self.api.share_snippet(self.store.code()).await?;
        Ok(Action::Navigate(format!("/snippet/{}", response.snippet_id)))
    }

    /// Export the current document
    pub fn save_file(&self) -> DispatchOutcome {
        let document = self.store.state().document;
        match self.files.save(&document.file_name, document.code.as_bytes()) {
            Ok(path) => {
                tracing::info!(file = %path.display(), "file saved");
                DispatchOutcome::Completed
            }
            Err(e) => {
                self.notifier.alert(&format!("Failed to save a file: {e}"));
                DispatchOutcome::Failed
            }
        }
    }

    /// Merge editor preference changes
    pub fn change_editor_preferences(&self, patch: EditorPreferencesPatch) {
        self.persist(SettingsPatch::editor(patch.clone()));
        self.store.dispatch(Action::EditorParamsChange(patch));
    }

    /// Change runtime and auto-format
    pub fn change_build_settings(&self, runtime: RuntimeKind, auto_format: bool) {
        let build = BuildSettings {
            runtime,
            auto_format,
        };
        self.persist(SettingsPatch::build(build.clone()));
        self.store.dispatch(Action::BuildParamsChange(build));
    }

    /// Flip dark mode
    pub fn toggle_theme(&self) {
        let dark_mode = self.store.state().settings.dark_mode;
        self.persist(SettingsPatch::dark_mode(!dark_mode));
        self.store.dispatch(Action::ToggleTheme);
    }

    fn persist(&self, patch: SettingsPatch) {
        if let Err(e) = self.settings.set(patch) {
            tracing::warn!("failed to persist settings: {}", e);
        }
    }
}

impl std::fmt::Debug for ActionDispatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatchOrchestrator")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}
