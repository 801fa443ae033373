//! Client construction errors
//!
//! Failures of individual requests are reported as `playground_core::ApiError`.

/// Errors raised while building a `RemoteServiceClient`
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Server URL does not parse
    #[error("invalid server url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Server URL cannot carry a path
    #[error("server url {0} cannot be used as a base")]
    NotABase(String),

    /// API key contains characters not allowed in a header
    #[error("api key is not a valid header value")]
    InvalidApiKey,

    /// HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}
