//! Error types for conform-domain.
//!
//! Every variant carries a [`Disposition`] describing how a front end should
//! surface it:
//! - non-fatal messages leave the view on its current data
//! - inline errors keep the edit dialog open with the draft intact
//! - retry prompts ask the user to re-fetch before trying again
//! - fatal errors indicate broken wiring and are logged

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A schema or dataset lookup missed.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A rule index outside `[0, len)`.
    #[error("rule index {index} out of range for {len} rules")]
    OutOfRange { index: usize, len: usize },

    /// A second edit dialog was requested while one is active.
    #[error("an edit session is already open")]
    SessionBusy,

    /// Commit or cancel was requested with no open dialog.
    #[error("no edit session is open")]
    SessionClosed,

    /// The dataset changed since the write was prepared.
    #[error("version conflict on {name}: based on v{expected}, latest is v{actual}")]
    Conflict {
        name: String,
        expected: u32,
        actual: u32,
    },

    /// The rule payload is malformed.
    #[error("validation failed: {}", .problems.join("; "))]
    Validation { problems: Vec<String> },

    /// Transport or storage failure inside an adapter.
    #[error("backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// How a front end should present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    NonFatalMessage,
    Inline,
    RetryPrompt,
    Fatal,
}

impl CatalogError {
    pub fn not_found(what: impl Into<String>) -> Self {
        CatalogError::NotFound { what: what.into() }
    }

    pub fn validation(problems: Vec<String>) -> Self {
        CatalogError::Validation { problems }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            CatalogError::NotFound { .. } | CatalogError::Backend(_) => {
                Disposition::NonFatalMessage
            }
            CatalogError::SessionBusy | CatalogError::Validation { .. } => Disposition::Inline,
            CatalogError::Conflict { .. } => Disposition::RetryPrompt,
            CatalogError::OutOfRange { .. } | CatalogError::SessionClosed => Disposition::Fatal,
        }
    }

    /// Returns true if the user can act on this error without a code fix.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            CatalogError::NotFound { .. }
                | CatalogError::Conflict { .. }
                | CatalogError::Validation { .. }
                | CatalogError::SessionBusy
        )
    }

    /// Returns the recommended exit code for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_user_actionable() { 2 } else { 1 }
    }
}

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;
