//! Playground Core - editor analysis and build orchestration
//!
//! The client-side core of the Gleam playground:
//! - Holds the single application state and its named transitions
//! - Debounces source changes into local static-analysis passes
//! - Sequences run/format/share/load operations against the remote service
//! - Persists build settings, editor preferences and theme
//!
//! # Example
//!
//! ```rust,ignore
//! use playground_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(api: Arc<dyn PlaygroundApi>) {
//! let settings = Arc::new(InMemorySettingsStore::default());
//! let store = Store::new(State::from_settings(&settings.get()));
//! let orchestrator = ActionDispatchOrchestrator::new(store, api, settings);
//!
//! orchestrator.load_snippet(None).await;
//! orchestrator.run_code().await;
//! println!("{:?}", orchestrator.store().state().result);
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analyzer;
pub mod api;
pub mod dispatch;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use analyzer::{
    AnalysisResult, AnalyzerFactory, AnalyzerSlot, Diagnostic, LintAnalyzer, LintAnalyzerFactory,
    LocalAnalyzer, Severity, TextRange,
};
pub use api::PlaygroundApi;
pub use dispatch::{
    ActionDispatchOrchestrator, DirectoryFileSink, DispatchOutcome, FileSink, Notifier,
    TracingNotifier,
};
pub use error::{AnalyzerError, ApiError, ConfigError, DispatchError, FileError};
pub use scheduler::{
    DebouncedAnalysisScheduler, MarkerSink, ModelId, SourceText, ANALYZE_DEBOUNCE_TIME,
};
pub use session::EditorSession;
pub use settings::{FileSettingsStore, InMemorySettingsStore, SettingsPatch, SettingsStore};
pub use state::{reduce, snippet_id_from_path, Action, AppStatus, SettingsState, State, Store};
pub use types::{
    BuildSettings, CompletionItem, CompletionList, CursorBlinking, CursorStyle,
    EditorPreferences, EditorPreferencesPatch, EvalEvent, EvalEventKind, RunResult, RuntimeKind,
    Settings, ShareResponse, Snippet, SourceDocument, SuggestionQuery, VersionResponse,
    DEMO_CODE, DEMO_FILE_NAME,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Playground Core
    pub use crate::{
        Action, ActionDispatchOrchestrator, AnalyzerSlot, DebouncedAnalysisScheduler,
        DispatchOutcome, EditorSession, InMemorySettingsStore, MarkerSink, PlaygroundApi,
        RuntimeKind, SettingsStore, State, Store,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
