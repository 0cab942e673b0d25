// ── Tile indexing and leaf encoding ───────────────────────────

use crate::error::CtSearchError;

/// Number of log entries in a full tile.
pub const TILE_WIDTH: usize = 256;

/// Derive the origin path for a tile index: the three least-significant
/// decimal digits as a zero-padded segment, then recursively prepending
/// `xDDD/` segments for each next-higher group of three decimal digits
/// until the remainder is zero.
///
/// Examples: `0` -> `000`, `1000` -> `x001/000`, `1_000_000` ->
/// `x001/x000/000`.
pub fn tile_path_from_index(index: u64) -> String {
    let mut n = index;
    let mut segments = vec![format!("{:03}", n % 1000)];
    n /= 1000;
    while n > 0 {
        segments.push(format!("x{:03}", n % 1000));
        n /= 1000;
    }
    segments.reverse();
    segments.join("/")
}

/// Parse a tile path back into its index. Inverse of
/// [`tile_path_from_index`].
pub fn tile_index_from_path(path: &str) -> Result<u64, CtSearchError> {
    let mut index: u64 = 0;
    for segment in path.split('/') {
        let digits = segment.strip_prefix('x').unwrap_or(segment);
        if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CtSearchError::Entry(format!(
                "malformed tile path segment: {segment:?}"
            )));
        }
        let value: u64 = digits.parse().map_err(|_| {
            CtSearchError::Entry(format!("malformed tile path segment: {segment:?}"))
        })?;
        index = index
            .checked_mul(1000)
            .and_then(|i| i.checked_add(value))
            .ok_or_else(|| CtSearchError::Entry("tile path overflows u64".into()))?;
    }
    Ok(index)
}

/// A single record from a tiled log: a timestamp, a
/// precertificate flag, and exactly one meaningful byte string, selected by
/// the flag.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp_millis: u64,
    pub is_precert: bool,
    cert_bytes: Option<Vec<u8>>,
    precert_bytes: Option<Vec<u8>>,
}

impl LogEntry {
    pub fn new_cert(timestamp_millis: u64, cert: Vec<u8>) -> Self {
        Self {
            timestamp_millis,
            is_precert: false,
            cert_bytes: Some(cert),
            precert_bytes: None,
        }
    }

    pub fn new_precert(timestamp_millis: u64, precert: Vec<u8>) -> Self {
        Self {
            timestamp_millis,
            is_precert: true,
            cert_bytes: None,
            precert_bytes: Some(precert),
        }
    }

    /// The byte string this entry actually carries, per its `is_precert`
    /// flag.
    pub fn payload(&self) -> &[u8] {
        if self.is_precert {
            self.precert_bytes.as_deref().unwrap_or_default()
        } else {
            self.cert_bytes.as_deref().unwrap_or_default()
        }
    }
}

/// Decode exactly [`TILE_WIDTH`] leaf records from a tile body.
///
/// Wire format per record: `timestamp_millis: u64 BE`, `is_precert: u8`,
/// `len: u24 BE`, then `len` bytes of payload (the certificate or
/// precertificate DER, per the flag).
pub fn decode_tile_entries(body: &[u8]) -> Result<Vec<LogEntry>, CtSearchError> {
    let mut entries = Vec::with_capacity(TILE_WIDTH);
    let mut cursor = body;
    for i in 0..TILE_WIDTH {
        if cursor.len() < 8 + 1 + 3 {
            return Err(CtSearchError::Entry(format!(
                "tile truncated before entry {i} header"
            )));
        }
        let timestamp_millis = u64::from_be_bytes(cursor[0..8].try_into().unwrap());
        let is_precert = match cursor[8] {
            0 => false,
            1 => true,
            other => {
                return Err(CtSearchError::Entry(format!(
                    "entry {i}: invalid precert flag {other}"
                )))
            }
        };
        let len = u32::from_be_bytes([0, cursor[9], cursor[10], cursor[11]]) as usize;
        cursor = &cursor[12..];
        if cursor.len() < len {
            return Err(CtSearchError::Entry(format!(
                "tile truncated inside entry {i} payload"
            )));
        }
        let payload = cursor[..len].to_vec();
        cursor = &cursor[len..];
        entries.push(if is_precert {
            LogEntry::new_precert(timestamp_millis, payload)
        } else {
            LogEntry::new_cert(timestamp_millis, payload)
        });
    }
    if entries.len() != TILE_WIDTH {
        return Err(CtSearchError::Entry(format!(
            "tile contained {} entries, expected {TILE_WIDTH}",
            entries.len()
        )));
    }
    Ok(entries)
}

/// Encode entries in the wire format [`decode_tile_entries`] reads. Public
/// so integration tests (and embedders writing their own fixtures) can
/// synthesize tile bodies without depending on a private encoding.
pub fn encode_tile_entries(entries: &[LogEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        out.extend_from_slice(&entry.timestamp_millis.to_be_bytes());
        out.push(if entry.is_precert { 1 } else { 0 });
        let payload = entry.payload();
        let len = payload.len() as u32;
        out.extend_from_slice(&len.to_be_bytes()[1..]);
        out.extend_from_slice(payload);
    }
    out
}
