//! Pending reset/teleport requests.
//!
//! Requests may be raised from any thread and only ever escalate
//! (`None < Teleport < FullReset`) until the simulating thread consumes them.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TeleportType {
    #[default]
    None = 0,
    /// Carry bodies rigidly into the new frame of reference.
    Teleport = 1,
    /// Rebuild the chain and snap every body to its bone.
    FullReset = 2,
}

impl TeleportType {
    /// Max-wins merge; commutative and idempotent.
    pub fn merge(self, other: TeleportType) -> TeleportType {
        self.max(other)
    }

    fn from_raw(raw: u8) -> TeleportType {
        match raw {
            0 => TeleportType::None,
            1 => TeleportType::Teleport,
            _ => TeleportType::FullReset,
        }
    }
}

/// Lock-free pending request shared between the simulating thread and requesters.
#[derive(Debug, Default)]
pub struct TeleportRequest {
    pending: AtomicU8,
}

impl TeleportRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn escalate(&self, kind: TeleportType) {
        self.pending.fetch_max(kind as u8, Ordering::AcqRel);
    }

    pub fn peek(&self) -> TeleportType {
        TeleportType::from_raw(self.pending.load(Ordering::Acquire))
    }

    /// Returns the pending request and clears it.
    pub fn take(&self) -> TeleportType {
        TeleportType::from_raw(self.pending.swap(TeleportType::None as u8, Ordering::AcqRel))
    }
}
