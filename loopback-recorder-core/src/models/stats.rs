use std::sync::atomic::{AtomicU64, Ordering};

/// Shared per-session counters, updated by both loops.
#[derive(Debug, Default)]
pub struct SessionStats {
    blocks_captured: AtomicU64,
    blocks_dropped: AtomicU64,
    blocks_written: AtomicU64,
}

impl SessionStats {
    pub fn record_captured(&self) {
        self.blocks_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.blocks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.blocks_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            blocks_captured: self.blocks_captured.load(Ordering::Relaxed),
            blocks_dropped: self.blocks_dropped.load(Ordering::Relaxed),
            blocks_written: self.blocks_written.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub blocks_captured: u64,
    pub blocks_dropped: u64,
    pub blocks_written: u64,
}
