// ── Checkpoint parsing ────────────────────────────────────

use base64::Engine;

use crate::error::CtSearchError;

const MAX_CHECKPOINT_BYTES: usize = 1024 * 1024;

/// A published statement of the current tree size and root hash of a tiled
/// log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub tree_size: u64,
    pub root_hash: [u8; 32],
}

impl Checkpoint {
    /// The index of the last full tile: entries that haven't yet filled a
    /// complete tile are excluded (integer division).
    pub fn last_full_tile_index(&self) -> u64 {
        self.tree_size / crate::tiled::tile::TILE_WIDTH as u64
    }
}

/// Parse a checkpoint body:
/// * at most 1 MiB,
/// * at least three newlines,
/// * line 2 is a canonical non-negative decimal tree size,
/// * line 3 is the base64 encoding of a 32-byte root hash.
pub fn parse_checkpoint(text: &[u8]) -> Result<Checkpoint, CtSearchError> {
    if text.len() > MAX_CHECKPOINT_BYTES {
        return Err(CtSearchError::Checkpoint(format!(
            "checkpoint is {} bytes, exceeds the 1 MiB limit",
            text.len()
        )));
    }
    let text = std::str::from_utf8(text)
        .map_err(|e| CtSearchError::Checkpoint(format!("checkpoint is not valid UTF-8: {e}")))?;

    if text.matches('\n').count() < 3 {
        return Err(CtSearchError::Checkpoint(
            "checkpoint must contain at least three newlines".into(),
        ));
    }

    let mut lines = text.splitn(4, '\n');
    let _origin_line = lines.next();
    let size_line = lines
        .next()
        .ok_or_else(|| CtSearchError::Checkpoint("missing tree size line".into()))?;
    let hash_line = lines
        .next()
        .ok_or_else(|| CtSearchError::Checkpoint("missing root hash line".into()))?;

    let tree_size = parse_canonical_decimal(size_line)?;

    let hash_bytes = base64::engine::general_purpose::STANDARD
        .decode(hash_line.trim_end_matches('\r'))
        .map_err(|e| CtSearchError::Checkpoint(format!("root hash is not valid base64: {e}")))?;
    let root_hash: [u8; 32] = hash_bytes.try_into().map_err(|bytes: Vec<u8>| {
        CtSearchError::Checkpoint(format!(
            "root hash decodes to {} bytes, expected 32",
            bytes.len()
        ))
    })?;

    Ok(Checkpoint {
        tree_size,
        root_hash,
    })
}

/// Reject anything but a canonical non-negative decimal: digits only, no
/// sign, no leading zeros (except the literal value `0`).
fn parse_canonical_decimal(s: &str) -> Result<u64, CtSearchError> {
    let s = s.trim_end_matches('\r');
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CtSearchError::Checkpoint(format!(
            "tree size line is not a canonical decimal: {s:?}"
        )));
    }
    if s.len() > 1 && s.starts_with('0') {
        return Err(CtSearchError::Checkpoint(format!(
            "tree size has a leading zero: {s:?}"
        )));
    }
    s.parse().map_err(|_| {
        CtSearchError::Checkpoint(format!("tree size does not fit in a u64: {s:?}"))
    })
}
