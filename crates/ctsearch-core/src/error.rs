// ── ctsearch: Error Types ──────────────────────────────────────────────────
// Single canonical error enum for the crate, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (transport, wire format, config…).
//   • The `#[from]` attribute wires external error conversions automatically.
//   • Per-tile and per-certificate failures never reach this enum's callers
//     directly — they are logged and absorbed at the point of failure.

use thiserror::Error;

/// Errors produced by the search engine and the tiled log client.
#[derive(Debug, Error)]
pub enum CtSearchError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server responded with a non-200 status.
    #[error("{url}: unexpected status {status}")]
    Status { url: String, status: u16 },

    /// Response body could not be decompressed or otherwise decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Checkpoint text failed validation.
    #[error("invalid checkpoint: {0}")]
    Checkpoint(String),

    /// A tile's body did not contain 256 well-formed leaf records.
    #[error("invalid tile entry: {0}")]
    Entry(String),

    /// An ASN.1 DER certificate failed to parse. Always logged and skipped
    /// by the search engine — surfaced here only for client code that wants
    /// to inspect the failure directly (e.g. in tests).
    #[error("certificate parse error: {0}")]
    CertParse(String),

    /// A time-to-tile-index search collapsed its interval without the
    /// target time falling inside any tile (the time is outside the log's
    /// observed range).
    #[error("time is outside the log's range")]
    TimeOutOfRange,

    /// Search or RetryPolicy configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A data source returned an unrecoverable error. This is also the
    /// shape of the cancellation cause propagated under the `Cancel`
    /// error-behavior policy.
    #[error("source error: {0}")]
    Source(String),

    /// The search was cancelled (externally, or by a source failure under
    /// the `Cancel` error-behavior policy with no more specific cause).
    #[error("search cancelled")]
    Cancelled,
}

pub type CtSearchResult<T> = Result<T, CtSearchError>;
