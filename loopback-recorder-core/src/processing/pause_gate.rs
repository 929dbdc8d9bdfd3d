use parking_lot::{Condvar, Mutex};

/// Binary gate suspending block production without suspending the writer.
///
/// Default open (recording active). The capture loop waits on the gate
/// before requesting each block; already-queued blocks keep draining while
/// the gate is closed, so a paused session can never starve the writer.
/// Waiting is a cooperative condvar suspend, not a spin.
pub struct PauseGate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self {
            open: Mutex::new(true),
            changed: Condvar::new(),
        }
    }

    /// Close the gate. Returns whether this call changed the state, so
    /// callers log transitions only.
    pub fn close(&self) -> bool {
        let mut open = self.open.lock();
        let changed = *open;
        *open = false;
        changed
    }

    /// Open the gate, waking any waiter. Returns whether this call changed
    /// the state.
    pub fn open(&self) -> bool {
        let mut open = self.open.lock();
        let changed = !*open;
        *open = true;
        drop(open);
        if changed {
            self.changed.notify_all();
        }
        changed
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Suspend the caller until the gate is open. Returns immediately when
    /// it already is.
    pub fn wait_open(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.changed.wait(&mut open);
        }
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_open() {
        let gate = PauseGate::new();
        assert!(gate.is_open());
        // No waiting when already open.
        gate.wait_open();
    }

    #[test]
    fn close_and_open_report_transitions() {
        let gate = PauseGate::new();
        assert!(gate.close());
        assert!(!gate.close()); // already closed
        assert!(gate.open());
        assert!(!gate.open()); // already open
    }

    #[test]
    fn wait_open_blocks_until_opened() {
        let gate = Arc::new(PauseGate::new());
        gate.close();

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_open())
        };
        thread::sleep(Duration::from_millis(30));
        assert!(!waiter.is_finished());

        gate.open();
        waiter.join().unwrap();
    }
}
