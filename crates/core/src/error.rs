//! Error types for Declutter operations.
//!
//! [`DeclutterError`] covers acquisition failures (network, file, browser
//! rendering), payload validation, and extraction outcomes. Fetch-stage
//! variants carry a human-readable cause via `Display` and, where a common
//! remedy exists, an actionable hint via [`DeclutterError::suggestion`].
//!
//! # Example
//!
//! ```rust
//! use declutter_core::{DeclutterError, Result};
//!
//! fn check(html: &str) -> Result<()> {
//!     if html.len() < 10 {
//!         return Err(DeclutterError::ContentTooSmall { length: html.len(), minimum: 10 });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check("<p>").is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fetching and extraction.
#[derive(Error, Debug)]
pub enum DeclutterError {
    /// Host name could not be resolved.
    #[error("Unable to reach {url}: the host name could not be resolved")]
    UnreachableHost { url: String },

    /// The remote end refused or dropped the connection.
    ///
    /// Also used for connect failures that are not name-resolution errors.
    #[error("Connection to {url} was refused")]
    ConnectionRefused { url: String },

    /// Fetch or browser navigation exceeded its deadline.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Redirect limit exceeded.
    #[error("Too many redirects while fetching {url}")]
    RedirectLoop { url: String },

    /// The server answered with a status no configuration accepts and no usable body.
    #[error("Server returned an unacceptable response (status {status})")]
    InvalidResponse { status: u16 },

    /// Payload is below the minimum size threshold.
    #[error("Content too small ({length} bytes, minimum {minimum})")]
    ContentTooSmall { length: usize, minimum: usize },

    /// Payload lacks recognizable markup root markers.
    #[error("Content does not look like HTML")]
    NotMarkup,

    /// Selection fell back to the body and the body holds no words and no images.
    #[error("No readable content could be found in the document")]
    NoReadableContent,

    /// Malformed URL or unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Other HTTP client failures from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Payload exceeds the configured ceiling.
    #[error("Content too large ({length} bytes, limit {limit})")]
    ContentTooLarge { length: usize, limit: usize },

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read/write errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// The structured extractor rejected the document.
    #[error("Structured extraction failed: {0}")]
    StructuredExtraction(String),

    /// Browser automation failed for reasons other than timeout or redirects.
    #[error("Browser rendering failed: {0}")]
    Render(String),

    /// Output serialization failed.
    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operation needs a cargo feature this build was compiled without.
    #[error("{operation} requires the `{feature}` feature")]
    FeatureDisabled { operation: &'static str, feature: &'static str },
}

impl DeclutterError {
    /// An actionable hint for the fetch-stage failures that have one.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::RedirectLoop { .. } => {
                Some("The site redirects too many times. Try the final URL directly or save the page and upload the file.")
            }
            Self::Timeout { .. } => {
                Some("The site is slow or blocking automated requests. Try again later or upload the saved HTML file.")
            }
            Self::UnreachableHost { .. } => Some("Check the spelling of the URL and your network connection."),
            Self::ConnectionRefused { .. } => {
                Some("The server refused the connection. The site may be down or blocking automated requests.")
            }
            _ => None,
        }
    }

    /// True for errors raised while acquiring content rather than processing it.
    pub fn is_fetch_error(&self) -> bool {
        match self {
            Self::UnreachableHost { .. }
            | Self::ConnectionRefused { .. }
            | Self::Timeout { .. }
            | Self::RedirectLoop { .. }
            | Self::InvalidResponse { .. }
            | Self::Render(_) => true,
            #[cfg(feature = "fetch")]
            Self::HttpError(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for DeclutterError.
pub type Result<T> = std::result::Result<T, DeclutterError>;
