//! Core data model
//!
//! Defines the values that flow between the editor, the orchestrator and the
//! remote service:
//! - Source documents and snippets
//! - Build settings and editor preferences (persisted)
//! - Run results and evaluation events
//! - Request/response payloads of the remote service

use serde::{Deserialize, Serialize};
use std::fmt;

/// File name used for the demo document
pub const DEMO_FILE_NAME: &str = "gleam_project.gleam";

/// Demo program shown when no snippet is requested
pub const DEMO_CODE: &str = "import gleam/io\n\n\
pub external type CharList\n\n\
// Main escript entrypoint (function is required)\n\
pub fn main(_args: List(CharList)) {\n\
\x20 io.println(\"Hello, world!\")\n\
}";

/// The document being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// File name shown in the UI and used on export
    pub file_name: String,
    /// Full source text
    pub code: String,
}

impl SourceDocument {
    /// Create new document
    #[inline]
    #[must_use]
    pub fn new(file_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            code: code.into(),
        }
    }

    /// The demo document
    #[inline]
    #[must_use]
    pub fn demo() -> Self {
        Self::new(DEMO_FILE_NAME, DEMO_CODE)
    }
}

impl Default for SourceDocument {
    fn default() -> Self {
        Self::new(DEMO_FILE_NAME, String::new())
    }
}

/// Backend execution target
///
/// Values read from storage that do not name a known runtime are kept as
/// `Unknown` so that running with them can be rejected explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuntimeKind {
    /// Remote Gleam playground service
    #[default]
    GleamPlayground,
    /// Unrecognized runtime identifier
    Unknown(String),
}

impl RuntimeKind {
    /// Wire/storage identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::GleamPlayground => "GLEAM_PLAYGROUND",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for RuntimeKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "GLEAM_PLAYGROUND" => Self::GleamPlayground,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<RuntimeKind> for String {
    fn from(kind: RuntimeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build/run settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Selected runtime
    pub runtime: RuntimeKind,
    /// Format code as part of every run
    pub auto_format: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            runtime: RuntimeKind::GleamPlayground,
            auto_format: true,
        }
    }
}

/// Cursor blinking animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorBlinking {
    #[default]
    Blink,
    Smooth,
    Phase,
    Expand,
    Solid,
}

/// Cursor shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorStyle {
    #[default]
    Line,
    Block,
    Underline,
    LineThin,
    BlockOutline,
    UnderlineThin,
}

/// Editor options the playground recognizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    pub select_on_line_numbers: bool,
    pub mouse_wheel_zoom: bool,
    pub smooth_scrolling: bool,
    pub cursor_blinking: CursorBlinking,
    pub cursor_style: CursorStyle,
    pub font_ligatures: bool,
    pub font_family: Option<String>,
    pub minimap: bool,
    pub context_menu: bool,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            select_on_line_numbers: true,
            mouse_wheel_zoom: true,
            smooth_scrolling: true,
            cursor_blinking: CursorBlinking::Blink,
            cursor_style: CursorStyle::Line,
            font_ligatures: true,
            font_family: None,
            minimap: true,
            context_menu: true,
        }
    }
}

impl EditorPreferences {
    /// Merge changed fields, leaving the rest untouched
    #[must_use]
    pub fn merged(mut self, patch: &EditorPreferencesPatch) -> Self {
        if let Some(v) = patch.select_on_line_numbers {
            self.select_on_line_numbers = v;
        }
        if let Some(v) = patch.mouse_wheel_zoom {
            self.mouse_wheel_zoom = v;
        }
        if let Some(v) = patch.smooth_scrolling {
            self.smooth_scrolling = v;
        }
        if let Some(v) = patch.cursor_blinking {
            self.cursor_blinking = v;
        }
        if let Some(v) = patch.cursor_style {
            self.cursor_style = v;
        }
        if let Some(v) = patch.font_ligatures {
            self.font_ligatures = v;
        }
        if let Some(v) = &patch.font_family {
            self.font_family = v.clone();
        }
        if let Some(v) = patch.minimap {
            self.minimap = v;
        }
        if let Some(v) = patch.context_menu {
            self.context_menu = v;
        }
        self
    }
}

/// Partial update of `EditorPreferences`
///
/// `font_family: Some(None)` resets the font to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferencesPatch {
    pub select_on_line_numbers: Option<bool>,
    pub mouse_wheel_zoom: Option<bool>,
    pub smooth_scrolling: Option<bool>,
    pub cursor_blinking: Option<CursorBlinking>,
    pub cursor_style: Option<CursorStyle>,
    pub font_ligatures: Option<bool>,
    pub font_family: Option<Option<String>>,
    pub minimap: Option<bool>,
    pub context_menu: Option<bool>,
}

impl EditorPreferencesPatch {
    /// True if no field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything persisted in the local configuration store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dark_mode: bool,
    pub build: BuildSettings,
    pub editor: EditorPreferences,
}

/// Output stream of an evaluation event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalEventKind {
    Stdout,
    Stderr,
}

/// One line of replayed program output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalEvent {
    #[serde(rename = "Message", alias = "message")]
    pub message: String,
    #[serde(rename = "Kind", alias = "kind")]
    pub kind: EvalEventKind,
    /// Delay before the event is shown
    #[serde(rename = "Delay", alias = "delay", alias = "delayMs", default)]
    pub delay_ms: u64,
}

impl EvalEvent {
    /// Stdout event without delay
    #[must_use]
    pub fn stdout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: EvalEventKind::Stdout,
            delay_ms: 0,
        }
    }

    /// Stderr event without delay
    #[must_use]
    pub fn stderr(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: EvalEventKind::Stderr,
            delay_ms: 0,
        }
    }
}

/// Result of a run or format request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Formatted source, when formatting ran and succeeded
    #[serde(default)]
    pub formatted: Option<String>,
    /// Ordered output timeline
    #[serde(default)]
    pub events: Vec<EvalEvent>,
}

/// Stored snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub code: String,
}

/// Response of a share request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareResponse {
    #[serde(rename = "snippetID")]
    pub snippet_id: String,
}

/// Response of a version request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Code completion query; only present fields are sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionQuery {
    #[serde(rename = "packageName", skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl SuggestionQuery {
    /// Query pairs in request order
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(package) = &self.package_name {
            pairs.push(("packageName", package.as_str()));
        }
        if let Some(value) = &self.value {
            pairs.push(("value", value.as_str()));
        }
        pairs
    }
}

/// One completion proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    #[serde(default)]
    pub kind: u32,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub documentation: Option<serde_json::Value>,
    #[serde(default)]
    pub insert_text: String,
}

/// Completion list returned by the suggestion endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionList {
    #[serde(default)]
    pub suggestions: Vec<CompletionItem>,
    #[serde(default)]
    pub incomplete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_kind_keeps_unknown_values() {
        let settings: BuildSettings =
            toml::from_str("runtime = \"WASM\"\nauto_format = false").unwrap();
        assert_eq!(settings.runtime, RuntimeKind::Unknown("WASM".to_string()));
        assert!(!settings.auto_format);

        let known: BuildSettings = toml::from_str("runtime = \"GLEAM_PLAYGROUND\"").unwrap();
        assert_eq!(known.runtime, RuntimeKind::GleamPlayground);
        assert!(known.auto_format);
    }

    #[test]
    fn eval_events_accept_server_casing() {
        let json = r#"{"formatted":null,"events":[{"Message":"hi","Kind":"stderr","Delay":5}]}"#;
        let result: RunResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.formatted, None);
        assert_eq!(result.events[0].message, "hi");
        assert_eq!(result.events[0].kind, EvalEventKind::Stderr);
        assert_eq!(result.events[0].delay_ms, 5);

        let lower = r#"{"events":[{"message":"1","kind":"stdout","delay":0}]}"#;
        let result: RunResult = serde_json::from_str(lower).unwrap();
        assert_eq!(result.events, vec![EvalEvent::stdout("1")]);
    }

    #[test]
    fn preferences_merge_only_touches_set_fields() {
        let patch = EditorPreferencesPatch {
            minimap: Some(false),
            cursor_style: Some(CursorStyle::BlockOutline),
            ..Default::default()
        };
        let merged = EditorPreferences::default().merged(&patch);
        assert!(!merged.minimap);
        assert_eq!(merged.cursor_style, CursorStyle::BlockOutline);
        assert!(merged.context_menu);
        assert!(!patch.is_empty());
        assert!(EditorPreferencesPatch::default().is_empty());
    }

    #[test]
    fn font_family_can_be_reset() {
        let set = EditorPreferencesPatch {
            font_family: Some(Some("Fira Code".to_string())),
            ..Default::default()
        };
        let reset = EditorPreferencesPatch {
            font_family: Some(None),
            ..Default::default()
        };
        let prefs = EditorPreferences::default().merged(&set);
        assert_eq!(prefs.font_family.as_deref(), Some("Fira Code"));
        assert_eq!(prefs.merged(&reset).font_family, None);
    }

    #[test]
    fn suggestion_query_pairs_skip_missing_fields() {
        let query = SuggestionQuery {
            package_name: None,
            value: Some("io.pr".to_string()),
        };
        assert_eq!(query.pairs(), vec![("value", "io.pr")]);
    }

    #[test]
    fn demo_document() {
        let doc = SourceDocument::demo();
        assert_eq!(doc.file_name, "gleam_project.gleam");
        assert!(doc.code.starts_with("import gleam/io\n"));
        assert!(doc.code.contains("  io.println(\"Hello, world!\")"));
    }
}
