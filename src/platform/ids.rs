//! Unique identifiers for boards and notes
//!
//! Ids are UUID v4 strings, the same shape `crypto.randomUUID()` produces,
//! so blobs written by either side stay interchangeable.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use uuid::Builder;

/// Produces ids that are unique for the lifetime of the stored data.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random UUID v4 ids drawn from a PCG stream
#[derive(Debug, Clone)]
pub struct RandomIds {
    rng: Pcg32,
}

impl RandomIds {
    /// Seed from the thread RNG (OS entropy)
    pub fn from_entropy() -> Self {
        Self {
            rng: Pcg32::from_rng(&mut rand::rng()),
        }
    }

    /// Deterministic stream, for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}

/// Readable `prefix-1`, `prefix-2`, ... ids
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
