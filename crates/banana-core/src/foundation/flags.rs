//! Coarse permission flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// A 64-bit set of host permission flags.
///
/// Merging roles only ever widens a flag set, so the type exposes
/// [`include`](Self::include) and [`union`](Self::union) rather than raw
/// arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionFlags(u64);

impl PermissionFlags {
    /// No flags.
    pub const EMPTY: Self = Self(0);
    /// Every flag.
    pub const ALL: Self = Self(u64::MAX);

    /// Creates a flag set from raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `self ∪ other`.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Adds every flag of `other` in place.
    pub fn include(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Removes every flag of `other` in place.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Returns `true` if every flag of `required` is set.
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Returns `true` if any flag of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PermissionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for PermissionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.include(rhs);
    }
}

impl From<u64> for PermissionFlags {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Binary for PermissionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}
