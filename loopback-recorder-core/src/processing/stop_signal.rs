use std::sync::atomic::{AtomicBool, Ordering};

/// One-way stop flag for a recording session.
///
/// Transitions open to closed exactly once and never reopens. Observed by
/// both loops at iteration granularity; there is no mid-block cancellation.
#[derive(Debug, Default)]
pub struct StopSignal {
    closed: AtomicBool,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the signal. Returns whether this call performed the transition,
    /// which makes redundant stops detectable no-ops.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_exactly_once() {
        let signal = StopSignal::new();
        assert!(!signal.is_closed());
        assert!(signal.close());
        assert!(signal.is_closed());
        assert!(!signal.close()); // second close is a no-op
        assert!(signal.is_closed());
    }
}
