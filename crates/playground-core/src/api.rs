//! Remote service seam
//!
//! The orchestrator talks to the build/run/format/share backend only through
//! `PlaygroundApi`. Implementations normalize every failure into `ApiError`
//! and never retry.

use crate::error::ApiError;
use crate::types::{CompletionList, RunResult, ShareResponse, Snippet, SuggestionQuery};
use async_trait::async_trait;

/// Remote playground service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaygroundApi: Send + Sync {
    /// Backend version
    async fn get_version(&self) -> Result<String, ApiError>;

    /// Code completion proposals
    async fn get_suggestions(&self, query: SuggestionQuery) -> Result<CompletionList, ApiError>;

    /// Build and run `code`, optionally formatting it too
    async fn evaluate_code(&self, code: String, format: bool) -> Result<RunResult, ApiError>;

    /// Format `code`
    async fn format_code(&self, code: String) -> Result<RunResult, ApiError>;

    /// Fetch a shared snippet
    async fn get_snippet(&self, id: String) -> Result<Snippet, ApiError>;

    /// Share `code`, returning the new snippet id
    async fn share_snippet(&self, code: String) -> Result<ShareResponse, ApiError>;
}
