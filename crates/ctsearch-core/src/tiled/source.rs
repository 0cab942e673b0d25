// ── Tiled Log Data Source ───────────────────────────────────
// A `Sourcer` backed by a `TiledLogClient`: resolves a time range to a tile
// index range, then fans out a worker pool over that range.
//
// Task shape follows `StdioTransport::spawn`'s writer/reader task split,
// generalized from a fixed pair of tasks to an enumerator task plus a
// configurable number of worker tasks draining a shared work queue.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::CtSearchError;
use crate::source::Sourcer;
use crate::tiled::client::TiledLogClient;

/// Configuration for a [`TiledLogDataSource`].
pub struct TiledLogDataSource {
    client: Arc<TiledLogClient>,
    include_certs: bool,
    include_precerts: bool,
    start_millis: u64,
    end_millis: u64,
    max_connections: usize,
}

impl TiledLogDataSource {
    pub fn new(
        client: TiledLogClient,
        start_millis: u64,
        end_millis: u64,
    ) -> Result<Self, CtSearchError> {
        if start_millis >= end_millis {
            return Err(CtSearchError::Config(
                "start_time must be strictly before end_time".into(),
            ));
        }
        Ok(Self {
            client: Arc::new(client),
            include_certs: true,
            include_precerts: true,
            start_millis,
            end_millis,
            max_connections: 4,
        })
    }

    pub fn with_include_certs(mut self, include: bool) -> Self {
        self.include_certs = include;
        self
    }

    pub fn with_include_precerts(mut self, include: bool) -> Self {
        self.include_precerts = include;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    fn validate(&self) -> Result<(), CtSearchError> {
        if !self.include_certs && !self.include_precerts {
            return Err(CtSearchError::Config(
                "TiledLogDataSource: at least one of include_certs or include_precerts must be set".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Sourcer for TiledLogDataSource {
    async fn source(
        &self,
        cancel: CancellationToken,
        out: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), CtSearchError> {
        self.validate()?;

        let (start_tile, end_tile) = self
            .client
            .bounding_tiles_from_times(self.start_millis, self.end_millis)
            .await?;

        let concurrency = self.max_connections.max(1);
        let (work_tx, work_rx) = mpsc::channel::<u64>(concurrency);
        let work_rx = Arc::new(tokio::sync::Mutex::new(work_rx));

        // Enumerator task: feeds tile indices into the work queue, then
        // closes it. Never touches `out`.
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                for index in start_tile..=end_tile {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        send = work_tx.send(index) => {
                            if send.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }

        let mut workers = Vec::with_capacity(concurrency);
        for worker_id in 0..concurrency {
            let client = Arc::clone(&self.client);
            let work_rx = Arc::clone(&work_rx);
            let out = out.clone();
            let cancel = cancel.clone();
            let include_certs = self.include_certs;
            let include_precerts = self.include_precerts;
            workers.push(tokio::spawn(async move {
                loop {
                    let next = {
                        let mut rx = work_rx.lock().await;
                        tokio::select! {
                            _ = cancel.cancelled() => None,
                            index = rx.recv() => index,
                        }
                    };
                    let Some(index) = next else { break };

                    let entries = match client.fetch_tile_entries_with_retry(index, &cancel).await
                    {
                        Ok(entries) => entries,
                        Err(CtSearchError::Cancelled) => break,
                        Err(e) => {
                            warn!(
                                "[ctsearch] worker {worker_id}: giving up on tile {index}: {e}"
                            );
                            continue;
                        }
                    };

                    for entry in entries {
                        if entry.is_precert && !include_precerts {
                            continue;
                        }
                        if !entry.is_precert && !include_certs {
                            continue;
                        }
                        if out.send(entry.payload().to_vec()).await.is_err() {
                            debug!("[ctsearch] worker {worker_id}: output channel closed");
                            return;
                        }
                    }
                }
            }));
        }

        futures::future::join_all(workers).await;

        if cancel.is_cancelled() {
            return Err(CtSearchError::Cancelled);
        }
        Ok(())
    }
}
