//! Error types for the chapter acquisition pipeline
//!
//! Errors are grouped by pipeline stage (manifest resolution, segment
//! fetching, assembly/transcoding, cleanup) so callers can tell a
//! chapter-fatal failure from a transient one.
//!
//! Propagation policy:
//! - Segment-level transient errors are retried inside the fetcher and only
//!   surface as [`PipelineError::SegmentFetchFailed`] once the retry budget
//!   is exhausted.
//! - Chapter-level errors (`ManifestUnavailable`, `ManifestMalformed`,
//!   `SegmentFetchFailed`, `TranscodeFailed`) abort only the owning chapter;
//!   the scheduler captures them into the run summary.
//! - `CleanupFailed` is logged and never changes a chapter's terminal
//!   outcome.

use thiserror::Error;

/// Result type alias using our PipelineError type
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    // ===== Manifest resolution =====
    /// Could not reach the manifest source (transport failure or
    /// non-success response). Chapter-fatal; never retried at this layer.
    #[error("manifest unavailable for {locator}: {reason}")]
    ManifestUnavailable { locator: String, reason: String },

    /// The manifest document was fetched but the expected segment-list
    /// pattern was absent (the site's markup or script format changed).
    #[error("manifest malformed: {0}")]
    ManifestMalformed(String),

    // ===== Segment fetching =====
    /// Retry budget exhausted on a single segment. A missing segment
    /// corrupts playback order, so this is chapter-fatal.
    #[error("segment {index} of chapter {chapter} failed after {attempts} attempts: {reason}")]
    SegmentFetchFailed {
        chapter: usize,
        index: u32,
        attempts: u32,
        reason: String,
    },

    /// Network connectivity error
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        /// Whether this error might succeed on retry
        is_transient: bool,
    },

    /// Server returned a non-success status code
    #[error("server responded with status {status} for {url}")]
    UnexpectedStatusCode { status: u16, url: String },

    // ===== Assembly / transcoding =====
    /// External transcoder exited with a non-zero status
    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    /// Transcoder binary not found in PATH
    #[error("transcoder not found. Install ffmpeg and ensure it's in your PATH.")]
    TranscoderNotFound,

    /// Assembly precondition violated (e.g. a segment not yet Downloaded)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Staging artifact removal failed. Non-fatal; logged only.
    #[error("cleanup failed: {0}")]
    CleanupFailed(String),

    // ===== Files / paths =====
    /// Invalid file path or URL-derived path component
    #[error("invalid path: {0}")]
    InvalidPath(String),

    // ===== External library errors =====
    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Create a transient or permanent NetworkError
    pub fn network<S: Into<String>>(message: S, is_transient: bool) -> Self {
        PipelineError::NetworkError {
            message: message.into(),
            is_transient,
        }
    }

    /// Create a ManifestUnavailable error for a locator
    pub fn manifest_unavailable<S: Into<String>, R: Into<String>>(locator: S, reason: R) -> Self {
        PipelineError::ManifestUnavailable {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Check whether the error might succeed on retry.
    ///
    /// Timeouts, connection resets and 5xx statuses are worth another
    /// attempt; malformed manifests and 4xx client errors are not. The
    /// segment fetcher's retry loop spends its budget only on errors
    /// classified transient here.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::NetworkError { is_transient, .. } => *is_transient,
            PipelineError::UnexpectedStatusCode { status, .. } => (500..=599).contains(status),
            PipelineError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(PipelineError::network("connection reset", true).is_transient());
        assert!(!PipelineError::network("dns failure", false).is_transient());
        assert!(PipelineError::UnexpectedStatusCode {
            status: 503,
            url: "https://example.com/seg.ts".into()
        }
        .is_transient());
        assert!(!PipelineError::UnexpectedStatusCode {
            status: 404,
            url: "https://example.com/seg.ts".into()
        }
        .is_transient());
        assert!(!PipelineError::ManifestMalformed("no segments".into()).is_transient());
    }
}
