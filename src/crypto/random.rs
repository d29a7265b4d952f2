//! Random byte sources
//!
//! Salts, IVs and database keys are drawn through [`SecureRandom`] so the
//! source can be swapped for a deterministic one in tests.

use rand::rngs::OsRng;
use rand::RngCore;

/// A cryptographically secure byte source
pub trait SecureRandom: Send + Sync {
    /// Fill `dest` with random bytes
    fn fill(&self, dest: &mut [u8]);
}

/// Operating-system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}
