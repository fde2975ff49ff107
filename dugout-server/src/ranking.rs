//! Rank correction
//!
//! Upstream ranks are untrusted and may collide. Records are re-ranked by
//! hit count, highest first, with ranks `1..=N`.
//!
//! Ties are broken by a random key drawn from the injected RNG, so the order
//! among equal scores is deliberately unspecified: any permutation of a tie
//! group is a valid outcome. Rank is a display artifact, never an identity,
//! and nothing downstream may depend on which tied record wins. Pass a seeded
//! RNG (see `import_rng`) to make an import reproducible.

use dugout_common::RawRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upstream record with its corrected rank
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub rank: u32,
    pub raw: RawRecord,
}

/// Assign ranks `1..=N` by descending score, breaking ties randomly
pub fn correct_ranks<R: Rng + ?Sized>(raw: Vec<RawRecord>, rng: &mut R) -> Vec<RankedRecord> {
    let mut keyed: Vec<(u32, u64, RawRecord)> = raw
        .into_iter()
        .map(|record| (record.score(), rng.gen::<u64>(), record))
        .collect();

    keyed.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    keyed
        .into_iter()
        .enumerate()
        .map(|(index, (_, _, raw))| RankedRecord {
            rank: index as u32 + 1,
            raw,
        })
        .collect()
}

/// RNG for one import: seeded when configured, otherwise from OS entropy
pub fn import_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
