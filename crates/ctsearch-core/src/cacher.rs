// ── Match Cacher ────────────────────────────────────────────────────────────
// A fused test-and-insert membership test over observed certificates.
// Only ever touched by the Search engine's single consumer task, so the
// internal locks here exist purely so `Cacher` is `Sync` and shareable
// behind an `Arc` — not because concurrent access is expected.

use std::collections::HashSet;
use std::sync::Mutex;

use bloomfilter::Bloom;
use sha2::{Digest, Sha256};

/// Membership cache used to de-duplicate matches before the callback fires.
///
/// **Bloom variant trade-off**: a [`Cacher::Bloom`] cache may report a
/// certificate as already seen when it was not. Because `Cacher::observe`
/// short-circuits delivery on a "seen" answer, a false positive here
/// silently suppresses a true match. It never produces the opposite error
/// (reporting a certificate as new when it was actually seen before).
pub enum Cacher {
    /// De-duplication disabled: every certificate is reported as new.
    Nop,
    /// Exact de-duplication keyed on the SHA-256 fingerprint of the raw
    /// DER bytes. Memory grows linearly with the number of distinct matches.
    Sha256Map(Mutex<HashSet<[u8; 32]>>),
    /// Probabilistic de-duplication via a Bloom filter sized at
    /// construction time for an expected element count and target
    /// false-positive rate.
    Bloom(Mutex<Bloom<[u8; 32]>>),
}

impl Cacher {
    pub fn nop() -> Self {
        Cacher::Nop
    }

    pub fn sha256_map() -> Self {
        Cacher::Sha256Map(Mutex::new(HashSet::new()))
    }

    /// Build a Bloom cacher sized for `expected_items` elements at a target
    /// `false_positive_rate` in (0, 1).
    pub fn bloom(expected_items: usize, false_positive_rate: f64) -> Self {
        let bloom = Bloom::new_for_fp_rate(expected_items.max(1), false_positive_rate);
        Cacher::Bloom(Mutex::new(bloom))
    }

    /// Record `der` as observed and report whether it was already recorded.
    /// Insertion and lookup are fused into one operation so the caller never
    /// hashes the bytes twice.
    pub fn observe(&self, der: &[u8]) -> bool {
        match self {
            Cacher::Nop => false,
            Cacher::Sha256Map(set) => {
                let fp = fingerprint(der);
                let mut set = set.lock().unwrap();
                !set.insert(fp)
            }
            Cacher::Bloom(bloom) => {
                let fp = fingerprint(der);
                let mut bloom = bloom.lock().unwrap();
                bloom.check_and_set(&fp)
            }
        }
    }
}

impl Default for Cacher {
    fn default() -> Self {
        Cacher::Nop
    }
}

/// SHA-256 fingerprint of the raw DER bytes of a certificate.
pub fn fingerprint(der: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(der);
    hasher.finalize().into()
}
