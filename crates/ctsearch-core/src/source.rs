// ── Data Source interface ───────────────────────────────────
// Any backend implements the same contract and is held type-erased behind
// `Box<dyn Sourcer>`, so adding a new data source never touches the search
// engine.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::CtSearchError;

/// Produces DER-encoded certificate bytes on `out` until exhausted,
/// cancelled, or failed.
///
/// A source never closes `out` — ownership of closing the channel belongs
/// to the search engine. If `cancel` fires before the
/// source is exhausted, the source must return promptly with
/// [`CtSearchError::Cancelled`].
#[async_trait]
pub trait Sourcer: Send + Sync {
    async fn source(
        &self,
        cancel: CancellationToken,
        out: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), CtSearchError>;
}

/// Type-erased data source, mirroring `AnyProvider`'s `Box<dyn AiProvider>`
/// wrapper: `Search` holds a list of these without knowing the concrete
/// backend of each.
pub type AnySource = Box<dyn Sourcer>;
