// ── Search Engine ───────────────────────────────────────────
// A concurrent fan-in pipeline: one producer task per data source, all
// writing into a single bounded channel; one consumer task (the caller of
// `execute`) draining it, applying the two filter stages, de-duplicating,
// and invoking the match callback.
//
// Task shape is grounded in `engine::mcp::transport::StdioTransport::spawn`'s
// writer/reader/stderr-drain task split, generalized here from a fixed set
// of tasks to N source tasks + 1 closer task.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::cacher::Cacher;
use crate::cancel::CancelWithCause;
use crate::cert::ParsedCertificate;
use crate::error::CtSearchError;
use crate::source::AnySource;

/// How a per-source unrecoverable error affects the rest of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBehavior {
    /// Tear down the whole search; the failing source's error becomes
    /// `Search::execute`'s return value.
    Cancel,
    /// Log and discard the failure; the other sources continue.
    Continue,
}

pub type DerFilter = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;
pub type CertFilter = Arc<dyn Fn(&ParsedCertificate) -> bool + Send + Sync>;
pub type MatchCallback = Arc<dyn Fn(&ParsedCertificate) + Send + Sync>;
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// The immutable configuration of a search: read-only during
/// execution, discarded after.
pub struct Search {
    pub sources: Vec<AnySource>,
    /// Pre-parse predicate over raw DER bytes. `None` accepts everything.
    pub der_filter: Option<DerFilter>,
    /// Post-parse predicate over a [`ParsedCertificate`]. `None` accepts
    /// everything.
    pub filter: Option<CertFilter>,
    /// Invoked at-most-once per distinct fingerprint accepted by both
    /// filters (modulo Bloom cacher false positives).
    pub match_callback: MatchCallback,
    /// `None` installs a no-op cacher (every certificate reported as new).
    pub cacher: Option<Cacher>,
    pub error_behavior: ErrorBehavior,
    /// Invoked from the same single consumer task as the other callbacks
    /// every `progress_interval` certificates examined. `0` disables it.
    pub progress_callback: Option<ProgressCallback>,
    pub progress_interval: u64,
}

impl Search {
    /// Validate the configuration: at least one of
    /// {pre-filter, post-filter} is non-null, and at least one data source.
    /// (`match_callback` is non-optional in this API, so it cannot be null.)
    fn validate(&self) -> Result<(), CtSearchError> {
        if self.der_filter.is_none() && self.filter.is_none() {
            return Err(CtSearchError::Config(
                "Search: at least one of der_filter or filter must be set".into(),
            ));
        }
        if self.sources.is_empty() {
            return Err(CtSearchError::Config(
                "Search: at least one data source is required".into(),
            ));
        }
        Ok(())
    }

    /// Run the search to completion. Returns `Ok(())` on clean exhaustion of
    /// every source, or the cancellation cause (an external cancellation or
    /// a source failure under `ErrorBehavior::Cancel`).
    pub async fn execute(self, cancel: tokio_util::sync::CancellationToken) -> Result<(), CtSearchError> {
        self.validate()?;
        if cancel.is_cancelled() {
            return Err(CtSearchError::Cancelled);
        }

        let cacher = self.cacher.unwrap_or_default();
        let der_filter = self.der_filter;
        let filter = self.filter;

        // Bytes channel: many writers (sources), one reader (this task).
        // Buffer sized to the source count so the initial burst from every
        // source isn't starved by head-of-line blocking.
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(self.sources.len().max(1));

        let cancel_with_cause = CancelWithCause::new();
        // If the caller's token fires, propagate into our cause cell as a
        // plain cancellation (no more specific cause available). Aborted
        // below once `execute` has its result, so a clean run never leaves
        // this task parked on `external.cancelled()` forever.
        let external_forwarder = {
            let cancel_with_cause = cancel_with_cause.clone();
            let external = cancel.clone();
            tokio::spawn(async move {
                external.cancelled().await;
                cancel_with_cause.cancel(CtSearchError::Cancelled);
            })
        };

        let error_behavior = self.error_behavior;
        let mut source_handles = Vec::with_capacity(self.sources.len());
        for source in self.sources.into_iter() {
            let tx = tx.clone();
            let child_token = cancel_with_cause.child_token();
            let cancel_with_cause = cancel_with_cause.clone();
            source_handles.push(tokio::spawn(async move {
                match source.source(child_token, tx).await {
                    Ok(()) => {}
                    Err(e) => match error_behavior {
                        ErrorBehavior::Cancel => {
                            error!("[ctsearch] source failed, cancelling search: {}", e);
                            cancel_with_cause.cancel(CtSearchError::Source(e.to_string()));
                        }
                        ErrorBehavior::Continue => {
                            warn!("[ctsearch] source failed, continuing: {}", e);
                        }
                    },
                }
            }));
        }
        // Drop our own sender so the channel closes once every source task's
        // clone is dropped, not before.
        drop(tx);

        // Closer task: the only writer-side close, after every source task
        // has returned.
        let closer = tokio::spawn(async move {
            for handle in source_handles {
                let _ = handle.await;
            }
            // `rx` is dropped implicitly once this task exits and `tx`'s
            // last clone is gone; the consumer observes channel-closed via
            // `recv() == None`.
        });

        let mut examined: u64 = 0;
        let result = loop {
            tokio::select! {
                _ = cancel_with_cause.cancelled() => {
                    break Err(cancel_with_cause.cause());
                }
                maybe_bytes = rx.recv() => {
                    match maybe_bytes {
                        None => break Ok(()),
                        Some(der) => {
                            examined += 1;
                            if self.progress_interval != 0 && examined % self.progress_interval == 0 {
                                if let Some(progress) = &self.progress_callback {
                                    progress(examined);
                                }
                            }

                            if let Some(pred) = &der_filter {
                                if !pred(&der) {
                                    continue;
                                }
                            }
                            let cert = match ParsedCertificate::parse(der) {
                                Ok(cert) => cert,
                                Err(e) => {
                                    debug!("[ctsearch] certificate parse error, skipping: {}", e);
                                    continue;
                                }
                            };
                            if let Some(pred) = &filter {
                                if !pred(&cert) {
                                    continue;
                                }
                            }
                            if cacher.observe(cert.raw()) {
                                continue;
                            }
                            (self.match_callback)(&cert);
                        }
                    }
                }
            }
        };

        // Whether we exited via cancellation or a drained channel, wait for
        // the closer (and thus every source task) to finish before
        // returning, so no source outlives `execute`.
        let _ = closer.await;
        external_forwarder.abort();
        info!(
            "[ctsearch] search finished: {:?}",
            result.as_ref().map(|_| ()).map_err(|e: &CtSearchError| e.to_string())
        );
        result
    }
}
