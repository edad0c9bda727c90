//! Error handling for opsclone
//!
//! This module provides the error types and user-friendly error reporting for
//! the backup/clone pipeline. The error system is designed around two core
//! principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! The error system consists of two main types:
//! - [`OpsCloneError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! A capture either completes fully or aborts: there is no log-and-continue
//! path for any condition that would produce an incomplete or inconsistent
//! template. Empty sibling collections (assets without endpoints, secret
//! syncs without provider classes) are normal control flow and never surface
//! here.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for opsclone operations.
///
/// Each variant represents a specific failure mode with enough context to
/// produce an actionable message. All variants are fatal for the backup in
/// progress: the partially assembled container map is discarded and nothing
/// is written to disk.
#[derive(Error, Debug)]
pub enum OpsCloneError {
    /// An ARM resource id string failed structural parsing.
    ///
    /// A template that silently omits or mis-names a resource is worse than
    /// failing loudly, so a single bad record aborts the whole backup.
    #[error("Malformed resource id '{id}': {reason}")]
    MalformedResourceId {
        /// The id string that failed to parse
        id: String,
        /// What was wrong with it
        reason: String,
    },

    /// A phase that assumes at least one resource exists found zero.
    ///
    /// For example, an instance without a broker is not a supported capture
    /// target.
    #[error("Expected at least one {kind} under {scope}, found none")]
    MissingExpectedResource {
        /// The resource kind that was expected (e.g. "broker")
        kind: String,
        /// The scope that was searched (instance name, cluster id, ...)
        scope: String,
    },

    /// An ARM management-plane request returned a non-success status.
    #[error("ARM request failed during {operation} (status {status})")]
    ArmRequestFailed {
        /// The logical operation that issued the request
        operation: String,
        /// HTTP status code returned by ARM
        status: u16,
        /// Response body, useful for the error detail ARM embeds in it
        body: String,
    },

    /// No bearer token was supplied via `--access-token` or the environment.
    #[error("No ARM access token provided")]
    MissingAccessToken,

    /// No subscription id was supplied via `--subscription` or the environment.
    #[error("No subscription id provided")]
    MissingSubscription,

    /// I/O errors from [`std::io::Error`]
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP transport errors from the ARM collaborator client
    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Generic error with a message
    #[error("{message}")]
    Other {
        /// The error message
        message: String,
    },
}

/// Wrapper that pairs an error with user-facing details and a suggestion.
///
/// Suggestions are actionable steps displayed in green; details provide
/// context displayed in yellow.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: OpsCloneError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from an [`OpsCloneError`].
    #[must_use]
    pub const fn new(error: OpsCloneError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`] with contextual
/// suggestions for the failure modes users actually hit.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    match error.downcast::<OpsCloneError>() {
        Ok(ops_error) => create_error_context(ops_error),
        Err(error) => {
            if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
                if io_error.kind() == std::io::ErrorKind::PermissionDenied {
                    return ErrorContext::new(OpsCloneError::Other {
                        message: error.to_string(),
                    })
                    .with_suggestion(
                        "Check write permissions on the output directory, or pass --output-dir",
                    )
                    .with_details("The backup template could not be written to disk");
                }
            }

            // Generic error - include the full error chain for better diagnostics
            let mut message = error.to_string();
            let chain: Vec<String> =
                error.chain().skip(1).map(std::string::ToString::to_string).collect();

            if !chain.is_empty() {
                message.push_str("\n\nCaused by:");
                for (i, cause) in chain.iter().enumerate() {
                    message.push_str(&format!("\n  {}: {}", i + 1, cause));
                }
            }

            ErrorContext::new(OpsCloneError::Other { message })
        }
    }
}

fn create_error_context(error: OpsCloneError) -> ErrorContext {
    match &error {
        OpsCloneError::MissingAccessToken => ErrorContext::new(error)
            .with_suggestion(
                "Pass --access-token or set AZURE_ACCESS_TOKEN, e.g. \
                 AZURE_ACCESS_TOKEN=$(az account get-access-token --query accessToken -o tsv)",
            )
            .with_details("opsclone talks to ARM directly and needs a bearer token for it"),
        OpsCloneError::MissingSubscription => {
            ErrorContext::new(error).with_suggestion("Pass --subscription or set AZURE_SUBSCRIPTION_ID")
        }
        OpsCloneError::ArmRequestFailed { status, .. } => {
            let suggestion = match status {
                401 | 403 => "The access token is expired or lacks permissions; acquire a fresh one",
                404 => "Check the resource group and instance name; the resource may not exist in this subscription",
                _ => "Re-run with --verbose to see the failing request",
            };
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        OpsCloneError::MissingExpectedResource { .. } => ErrorContext::new(error)
            .with_details("The instance is not in a state opsclone supports capturing"),
        OpsCloneError::MalformedResourceId { .. } => ErrorContext::new(error).with_details(
            "A captured record carried an id the parser could not decompose; the backup \
             was aborted rather than producing an invalid template",
        ),
        _ => ErrorContext::new(error),
    }
}
