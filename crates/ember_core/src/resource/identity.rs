//! Resource identity: a 64-bit FNV-1a hash of typed construction parameters.

use std::fmt;
use std::hash::{Hash, Hasher};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a hasher.
///
/// Unlike `DefaultHasher`, the output is stable across runs and Rust
/// versions, so identities can be logged and compared between sessions.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1aHasher(u64);

impl Fnv1aHasher {
    /// Creates a hasher at the FNV offset basis.
    #[must_use]
    pub const fn new() -> Self {
        Self(FNV_OFFSET_BASIS)
    }
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for Fnv1aHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u64::from(byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

/// Cache key of a resource.
///
/// Equal parameters of the same kind always produce equal identities.
/// Distinct parameters colliding is treated as a bug and not detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentity(u64);

impl ResourceIdentity {
    /// Computes the identity of `params` for resources of kind `kind`.
    #[must_use]
    pub fn of<P: Hash + ?Sized>(kind: &str, params: &P) -> Self {
        let mut hasher = Fnv1aHasher::new();
        kind.hash(&mut hasher);
        params.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Wraps a raw hash value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The raw hash value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
