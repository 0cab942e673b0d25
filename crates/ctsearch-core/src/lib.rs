//! ctsearch-core: a concurrent search engine over Certificate Transparency
//! log entries drawn from heterogeneous streaming sources, plus a client for
//! static-ct-api style tiled logs.
//!
//! The public surface is small by design: construct a [`Search`] with one or
//! more [`Sourcer`] implementations and at least one filter, then `execute`
//! it against a cancellation token. [`tiled`] supplies a ready-made
//! [`Sourcer`] backed by an HTTP tiled log.

mod cacher;
mod cancel;
mod cert;
mod error;
mod retry;
mod search;
mod source;
pub mod tiled;

pub use cacher::Cacher;
pub use cert::ParsedCertificate;
pub use error::{CtSearchError, CtSearchResult};
pub use retry::RetryPolicy;
pub use search::{CertFilter, DerFilter, ErrorBehavior, MatchCallback, ProgressCallback, Search};
pub use source::{AnySource, Sourcer};

pub use tokio_util::sync::CancellationToken;
