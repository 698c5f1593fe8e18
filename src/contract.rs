//! # contract: interface for checking remote targets
//!
//! This module defines the [`Prober`] trait and the plain data it exchanges. A prober
//! checks one [`Target`] and reports a [`ProbeOutcome`]; the fan-out across many targets
//! lives in [`crate::probe`], which drives probers through the bounded mapper.
//!
//! ## Interface & Extensibility
//! - Implement [`Prober`] to check a new kind of endpoint (HTTP, database, queue, ...).
//! - An unhealthy answer is an outcome, not an error. Return [`ProbeError`] only when the
//!   target could not be checked at all; the first such error fails the whole run.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so tests get a `MockProber` (exported with the
//!   `test-export-mocks` feature, on by default).

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A named endpoint to check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
}

/// Result of checking one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub name: String,
    pub url: String,
    /// Status code reported by the endpoint.
    pub status: u16,
    pub healthy: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub enum ProbeError {
    Http(reqwest::Error),
    InvalidUrl(String),
    Other(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Http(e) => write!(f, "request failed: {e}"),
            ProbeError::InvalidUrl(url) => write!(f, "invalid url: {url}"),
            ProbeError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        ProbeError::Http(e)
    }
}

/// Checks a single target.
///
/// Implemented by real clients and by test mocks. Must be `Send + Sync` because one
/// prober is shared by every unit of a bounded fan-out.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Prober: Send + Sync {
    /// Check `target` once. No retries.
    async fn probe(&self, target: &Target) -> Result<ProbeOutcome, ProbeError>;
}
