// ── Tiled Log Client ────────────────────────────────────────
// HTTP access to a static-ct-api style tiled log: checkpoint and tile-data
// fetches, gzip-transparent, retried per a configurable `RetryPolicy`, plus
// the time-to-tile-index binary search used to bound a time-range search.
//
// `reqwest::Client` construction uses explicit connect/overall timeouts,
// built once and reused.

use std::io::Read as _;
use std::time::Duration;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::error::CtSearchError;
use crate::retry::RetryPolicy;
use crate::tiled::checkpoint::{parse_checkpoint, Checkpoint};
use crate::tiled::tile::{decode_tile_entries, tile_path_from_index, LogEntry, TILE_WIDTH};

/// Client for a single tiled log, identified by its base endpoint URL.
pub struct TiledLogClient {
    endpoint: String,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl TiledLogClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, CtSearchError> {
        Self::with_retry_policy(endpoint, RetryPolicy::default())
    }

    pub fn with_retry_policy(
        endpoint: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self, CtSearchError> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(CtSearchError::Config("endpoint must not be empty".into()));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
            retry,
        })
    }

    fn tile_data_url(&self, index: u64) -> String {
        format!("{}/tile/data/{}", self.endpoint, tile_path_from_index(index))
    }

    fn checkpoint_url(&self) -> String {
        format!("{}/checkpoint", self.endpoint)
    }

    async fn get_body(&self, url: &str) -> Result<Vec<u8>, CtSearchError> {
        let resp = self
            .http
            .get(url)
            .header("Accept-Encoding", "gzip, identity")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CtSearchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let is_gzip = resp
            .headers()
            .get("content-encoding")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("gzip"))
            .unwrap_or(false);
        let bytes = resp.bytes().await?;
        if is_gzip {
            let mut decoder = flate2::read::GzDecoder::new(&bytes[..]);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| CtSearchError::Decode(format!("gzip decode failed: {e}")))?;
            Ok(out)
        } else {
            Ok(bytes.to_vec())
        }
    }

    /// Fetch and decode one tile's 256 leaf entries. No retry.
    pub async fn fetch_tile_entries(&self, index: u64) -> Result<Vec<LogEntry>, CtSearchError> {
        let url = self.tile_data_url(index);
        debug!("[ctsearch] fetching tile {index} from {url}");
        let body = self.get_body(&url).await?;
        decode_tile_entries(&body)
    }

    /// [`fetch_tile_entries`] wrapped in this client's [`RetryPolicy`].
    pub async fn fetch_tile_entries_with_retry(
        &self,
        index: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<LogEntry>, CtSearchError> {
        self.retry
            .retry(cancel, || self.fetch_tile_entries(index))
            .await
    }

    /// Fetch and parse the log's current checkpoint.
    pub async fn checkpoint(&self) -> Result<Checkpoint, CtSearchError> {
        let url = self.checkpoint_url();
        let body = self.get_body(&url).await?;
        parse_checkpoint(&body)
    }

    /// The index of the last tile that is completely full, per the log's
    /// current checkpoint.
    pub async fn last_full_tile_index(&self) -> Result<u64, CtSearchError> {
        Ok(self.checkpoint().await?.last_full_tile_index())
    }

    /// Binary search for the tile index whose entries straddle `target_millis`,
    /// bounded to `[low, high]` inclusive. Assumes per-tile timestamps are
    /// non-decreasing across the log.
    ///
    /// Returns the smallest tile index `i` in `[low, high]` such that tile
    /// `i`'s last entry timestamp is `>= target_millis`, or `high` if no such
    /// tile exists (the time is at or after the end of the searched range).
    /// `TimeOutOfRange` if the interval is empty or the target falls before
    /// the first entry of `low`.
    pub async fn tile_index_from_time(
        &self,
        target_millis: u64,
        low: u64,
        high: u64,
    ) -> Result<u64, CtSearchError> {
        if low > high {
            return Err(CtSearchError::TimeOutOfRange);
        }
        let first_tile = self.fetch_tile_entries(low).await?;
        let first_timestamp = first_tile
            .first()
            .map(|e| e.timestamp_millis)
            .ok_or(CtSearchError::TimeOutOfRange)?;
        if target_millis < first_timestamp {
            return Err(CtSearchError::TimeOutOfRange);
        }

        let mut lo = low;
        let mut hi = high;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let tile = self.fetch_tile_entries(mid).await?;
            let last_timestamp = tile
                .last()
                .map(|e| e.timestamp_millis)
                .ok_or_else(|| CtSearchError::Entry(format!("tile {mid} decoded empty")))?;
            if last_timestamp >= target_millis {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    /// Resolve `[start_time, end_time)` (millis) to an inclusive tile index
    /// range suitable for a [`crate::tiled::source::TiledLogDataSource`].
    pub async fn bounding_tiles_from_times(
        &self,
        start_millis: u64,
        end_millis: u64,
    ) -> Result<(u64, u64), CtSearchError> {
        if start_millis >= end_millis {
            return Err(CtSearchError::Config(
                "start_time must be strictly before end_time".into(),
            ));
        }
        let last = self.last_full_tile_index().await?;
        if last == 0 {
            warn!("[ctsearch] log has no full tiles yet");
        }
        let start_tile = self.tile_index_from_time(start_millis, 0, last).await?;
        let end_tile = self
            .tile_index_from_time(end_millis, start_tile, last)
            .await?;
        Ok((start_tile, end_tile))
    }
}
