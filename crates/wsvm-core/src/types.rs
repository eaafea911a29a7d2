//! Identifiers shared across the runtime.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one guest run, passed to the entry point as its only argument.
///
/// Values stay below [`RunId::LIMIT`] so they always fit a positive `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub u32);

impl RunId {
    pub const LIMIT: u32 = 1_000_000;

    pub fn new() -> Self {
        let random = Uuid::new_v4().as_u128();
        Self((random % Self::LIMIT as u128) as u32)
    }

    /// Deterministic id for tests.
    pub fn from_seed(seed: u64) -> Self {
        Self((seed % Self::LIMIT as u64) as u32)
    }

    pub fn as_i32(&self) -> i32 {
        self.0 as i32
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rid-{}", self.0)
    }
}
