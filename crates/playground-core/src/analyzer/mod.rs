//! Local static analysis
//!
//! An analyzer takes the full source text and returns the complete marker
//! set for it. Whether an analyzer exists at all is decided once at startup
//! through `AnalyzerSlot::probe`.

mod lint;

pub use lint::{LintAnalyzer, LintAnalyzerFactory};

use crate::error::AnalyzerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Marker severity, numbered the way the editor surface numbers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    Hint = 1,
    Info = 2,
    Warning = 4,
    Error = 8,
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity as u8
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, String> {
        match code {
            1 => Ok(Self::Hint),
            2 => Ok(Self::Info),
            4 => Ok(Self::Warning),
            8 => Ok(Self::Error),
            other => Err(format!("invalid marker severity {other}")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hint => "hint",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// 1-based text range; end column is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    #[serde(rename = "startLineNumber")]
    pub start_line: usize,
    pub start_column: usize,
    #[serde(rename = "endLineNumber")]
    pub end_line: usize,
    pub end_column: usize,
}

impl TextRange {
    /// Range within one line
    #[inline]
    #[must_use]
    pub fn on_line(line: usize, start_column: usize, end_column: usize) -> Self {
        Self {
            start_line: line,
            start_column,
            end_line: line,
            end_column,
        }
    }
}

/// One static-analysis finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    pub range: TextRange,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Create new diagnostic
    #[inline]
    #[must_use]
    pub fn new(range: TextRange, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.range.start_line, self.range.start_column, self.severity, self.message
        )
    }
}

/// Complete marker set for one source text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub markers: Vec<Diagnostic>,
}

/// Static analysis engine
#[async_trait]
pub trait LocalAnalyzer: Send + Sync {
    /// Analyze the full source text
    async fn analyze_code(&self, code: &str) -> Result<AnalysisResult, AnalyzerError>;

    /// Release engine resources; calling it again is a no-op
    fn dispose(&self);
}

/// Capability probe and constructor for an analyzer
pub trait AnalyzerFactory {
    /// True if this host can run the engine
    fn supported(&self) -> bool;

    /// Start the engine
    ///
    /// # Errors
    /// Returns `AnalyzerError::Instantiate` if the engine cannot start.
    fn instantiate(&self) -> Result<Arc<dyn LocalAnalyzer>, AnalyzerError>;
}

/// Analyzer availability, decided once
#[derive(Clone, Default)]
pub enum AnalyzerSlot {
    #[default]
    Unavailable,
    Available(Arc<dyn LocalAnalyzer>),
}

impl AnalyzerSlot {
    /// Probe `factory` and instantiate the engine when supported
    pub fn probe(factory: &dyn AnalyzerFactory) -> Self {
        if !factory.supported() {
            tracing::info!("local analyzer is not supported on this host");
            return Self::Unavailable;
        }
        match factory.instantiate() {
            Ok(analyzer) => Self::Available(analyzer),
            Err(e) => {
                tracing::warn!("failed to start local analyzer: {}", e);
                Self::Unavailable
            }
        }
    }

    /// True if an analyzer is present
    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The analyzer, if present
    #[inline]
    #[must_use]
    pub fn analyzer(&self) -> Option<&Arc<dyn LocalAnalyzer>> {
        match self {
            Self::Available(analyzer) => Some(analyzer),
            Self::Unavailable => None,
        }
    }
}

impl fmt::Debug for AnalyzerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("Unavailable"),
            Self::Available(_) => f.write_str("Available(..)"),
        }
    }
}
