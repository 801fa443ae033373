//! Application state
//!
//! The single source of truth for the playground. State only changes through
//! named transitions (`Action`) applied by the pure `reduce` function; the
//! `Store` applies them one at a time and notifies subscribers.

use crate::types::{
    BuildSettings, EditorPreferences, EditorPreferencesPatch, RunResult, Settings, SourceDocument,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Loading/error status of the current dispatch cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Build settings plus theme flag as seen by the UI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsState {
    pub build: BuildSettings,
    pub dark_mode: bool,
}

/// Full application state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub document: SourceDocument,
    pub settings: SettingsState,
    pub editor: EditorPreferences,
    pub result: RunResult,
    pub status: AppStatus,
    /// Location requested by the last navigation
    pub location: String,
}

impl State {
    /// Initial state built from persisted settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            settings: SettingsState {
                build: settings.build.clone(),
                dark_mode: settings.dark_mode,
            },
            editor: settings.editor.clone(),
            location: "/".to_string(),
            ..Self::default()
        }
    }
}

/// Named state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A remote operation started
    Loading,
    /// A remote operation finished without a state change
    Settle,
    /// Run/format result arrived
    BuildResult(RunResult),
    /// Operation failed with a user-visible message
    Error(String),
    /// Document replaced by an imported or loaded file
    ImportFile { file_name: String, code: String },
    /// User edited the code
    FileChange(String),
    /// Runtime or auto-format changed
    BuildParamsChange(BuildSettings),
    /// Editor preferences changed
    EditorParamsChange(EditorPreferencesPatch),
    /// Dark mode flipped
    ToggleTheme,
    /// Navigation to a new location
    Navigate(String),
}

impl Action {
    /// Short name used in logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Settle => "settle",
            Self::BuildResult(_) => "build-result",
            Self::Error(_) => "error",
            Self::ImportFile { .. } => "import-file",
            Self::FileChange(_) => "file-change",
            Self::BuildParamsChange(_) => "build-params-change",
            Self::EditorParamsChange(_) => "editor-params-change",
            Self::ToggleTheme => "toggle-theme",
            Self::Navigate(_) => "navigate",
        }
    }
}

/// Apply one transition
#[must_use]
pub fn reduce(mut state: State, action: Action) -> State {
    match action {
        Action::Loading => {
            state.status = AppStatus {
                loading: true,
                error: None,
            };
        }
        Action::Settle => {
            state.status.loading = false;
        }
        Action::BuildResult(result) => {
            if let Some(formatted) = &result.formatted {
                state.document.code.clone_from(formatted);
            }
            state.result = result;
            state.status = AppStatus::default();
        }
        Action::Error(message) => {
            state.status = AppStatus {
                loading: false,
                error: Some(message),
            };
        }
        Action::ImportFile { file_name, code } => {
            state.document = SourceDocument { file_name, code };
            state.status = AppStatus::default();
        }
        Action::FileChange(code) => {
            state.document.code = code;
        }
        Action::BuildParamsChange(build) => {
            state.settings.build = build;
        }
        Action::EditorParamsChange(patch) => {
            state.editor = state.editor.merged(&patch);
        }
        Action::ToggleTheme => {
            state.settings.dark_mode = !state.settings.dark_mode;
        }
        Action::Navigate(location) => {
            state.location = location;
            state.status.loading = false;
        }
    }
    state
}

/// Shared handle to the application state
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct Store {
    sender: Arc<watch::Sender<State>>,
}

impl Store {
    /// Create store with initial state
    #[must_use]
    pub fn new(initial: State) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Apply a transition
    pub fn dispatch(&self, action: Action) {
        tracing::trace!(action = action.name(), "dispatch");
        self.sender.send_modify(|state| {
            let previous = std::mem::take(state);
            *state = reduce(previous, action);
        });
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> State {
        self.sender.borrow().clone()
    }

    /// Current source text
    #[must_use]
    pub fn code(&self) -> String {
        self.sender.borrow().document.code.clone()
    }

    /// Receiver notified after every transition
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.sender.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(State::default())
    }
}

/// Snippet id in a `/snippet/<id>` (or `/<id>`) location
#[must_use]
pub fn snippet_id_from_path(path: &str) -> Option<&str> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let first = segments.next()?;
    let id = if first == "snippet" {
        segments.next()?
    } else {
        first
    };
    if segments.next().is_some() {
        return None;
    }
    Some(id)
}
