//! Playground Client - remote service access
//!
//! `RemoteServiceClient` implements `playground_core::PlaygroundApi` over
//! HTTP:
//! - Snippet fetch/share and version probe under the share prefix
//! - Run and format under the run prefix
//! - Code completion on `/suggest`

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
pub mod config;
pub mod error;

pub use client::{RemoteServiceClient, API_KEY_HEADER};
pub use config::ClientConfig;
pub use error::ClientError;
