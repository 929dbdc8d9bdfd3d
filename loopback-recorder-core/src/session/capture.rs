use std::sync::Arc;
use std::time::Duration;

use crate::models::error::RecorderError;
use crate::models::stats::SessionStats;
use crate::processing::handoff_queue::HandoffQueue;
use crate::processing::pause_gate::PauseGate;
use crate::processing::stop_signal::StopSignal;
use crate::traits::delegate::RecorderDelegate;
use crate::traits::frame_source::FrameSource;

/// How long a push waits for a queue slot before the block is dropped.
/// Capture cadence must never be enslaved to writer speed.
pub(crate) const PUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Producer side of the pipeline: pulls blocks from the frame source,
/// respects the pause gate, and hands blocks to the writer through the
/// bounded queue.
///
/// Runs on the thread that called `start`. Cycles between running and
/// awaiting resume until the stop signal closes; a device failure closes the
/// stop signal itself so the session tears down.
pub(crate) struct CaptureLoop<S: FrameSource> {
    pub source: S,
    pub block_size: usize,
    pub queue: Arc<HandoffQueue>,
    pub gate: Arc<PauseGate>,
    pub stop: Arc<StopSignal>,
    pub stats: Arc<SessionStats>,
    pub delegate: Option<Arc<dyn RecorderDelegate>>,
    pub push_timeout: Duration,
}

impl<S: FrameSource> CaptureLoop<S> {
    pub fn run(mut self) -> Result<(), RecorderError> {
        while !self.stop.is_closed() {
            if !self.gate.is_open() {
                log::debug!("capture paused, awaiting resume");
                self.gate.wait_open();
                // The gate is also opened during shutdown; re-check before
                // requesting another block.
                continue;
            }

            let block = match self.source.read_block(self.block_size) {
                Ok(block) => block,
                Err(err) => {
                    log::error!("capture stream failed: {}", err);
                    if let Some(delegate) = &self.delegate {
                        delegate.on_error(&err);
                        delegate.on_status(&format!("Recorder error: {}", err));
                    }
                    self.stop.close();
                    return Err(err);
                }
            };
            self.stats.record_captured();

            if self.queue.push(block, self.push_timeout).is_err() {
                // Drop the block and move on; retrying would stall capture.
                self.stats.record_dropped();
                log::warn!("audio queue overflow, dropping block");
                if let Some(delegate) = &self.delegate {
                    delegate.on_status("Audio queue overflow, dropping block");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::block::{AudioBlock, BlockMessage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Emits numbered blocks at a fixed cadence, optionally failing after a
    /// set number of reads.
    struct PacedSource {
        channels: u16,
        sample_rate: u32,
        period: Duration,
        reads: Arc<AtomicUsize>,
        fail_after: Option<usize>,
    }

    impl FrameSource for PacedSource {
        fn read_block(&mut self, frames: usize) -> Result<AudioBlock, RecorderError> {
            let read_no = self.reads.load(Ordering::SeqCst);
            if self.fail_after.is_some_and(|n| read_no >= n) {
                return Err(RecorderError::DeviceFailed("stream invalidated".into()));
            }
            thread::sleep(self.period);
            self.reads.fetch_add(1, Ordering::SeqCst);
            let value = (read_no + 1) as f32 * 1e-4;
            Ok(AudioBlock::new(
                vec![value; frames * self.channels as usize],
                self.channels,
                self.sample_rate,
            ))
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn channels(&self) -> u16 {
            self.channels
        }
    }

    struct Harness {
        queue: Arc<HandoffQueue>,
        gate: Arc<PauseGate>,
        stop: Arc<StopSignal>,
        stats: Arc<SessionStats>,
        reads: Arc<AtomicUsize>,
    }

    fn spawn_loop(
        capacity: usize,
        fail_after: Option<usize>,
        push_timeout: Duration,
    ) -> (Harness, thread::JoinHandle<Result<(), RecorderError>>) {
        let harness = Harness {
            queue: Arc::new(HandoffQueue::new(capacity)),
            gate: Arc::new(PauseGate::new()),
            stop: Arc::new(StopSignal::new()),
            stats: Arc::new(SessionStats::default()),
            reads: Arc::new(AtomicUsize::new(0)),
        };
        let capture = CaptureLoop {
            source: PacedSource {
                channels: 2,
                sample_rate: 48000,
                period: Duration::from_millis(1),
                reads: Arc::clone(&harness.reads),
                fail_after,
            },
            block_size: 8,
            queue: Arc::clone(&harness.queue),
            gate: Arc::clone(&harness.gate),
            stop: Arc::clone(&harness.stop),
            stats: Arc::clone(&harness.stats),
            delegate: None,
            push_timeout,
        };
        let handle = thread::spawn(move || capture.run());
        (harness, handle)
    }

    #[test]
    fn produces_blocks_in_order_until_stopped() {
        let (harness, handle) = spawn_loop(50, None, PUSH_TIMEOUT);

        let mut last = 0.0;
        for _ in 0..5 {
            match harness.queue.pop() {
                BlockMessage::Data(block) => {
                    assert!(block.samples()[0] > last);
                    last = block.samples()[0];
                }
                BlockMessage::EndOfStream => panic!("unexpected end of stream"),
            }
        }

        harness.stop.close();
        harness.gate.open();
        assert_eq!(handle.join().unwrap(), Ok(()));
    }

    #[test]
    fn pause_gate_suspends_production() {
        let (harness, handle) = spawn_loop(50, None, PUSH_TIMEOUT);
        thread::sleep(Duration::from_millis(20));

        harness.gate.close();
        thread::sleep(Duration::from_millis(20)); // let an in-flight read finish
        let paused_reads = harness.reads.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        // At most one read can straddle the gate close.
        assert!(harness.reads.load(Ordering::SeqCst) <= paused_reads + 1);

        harness.gate.open();
        thread::sleep(Duration::from_millis(30));
        assert!(harness.reads.load(Ordering::SeqCst) > paused_reads);

        harness.stop.close();
        harness.gate.open();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn overflow_drops_blocks_without_stalling() {
        // No consumer: the queue fills and later pushes time out.
        let (harness, handle) = spawn_loop(2, None, Duration::from_millis(5));
        thread::sleep(Duration::from_millis(80));

        harness.stop.close();
        harness.gate.open();
        handle.join().unwrap().unwrap();

        let snap = harness.stats.snapshot();
        assert!(snap.blocks_dropped >= 1);
        assert_eq!(harness.queue.len(), 2);

        // The queued survivors are the first two blocks, in capture order.
        match harness.queue.pop() {
            BlockMessage::Data(block) => {
                approx::assert_relative_eq!(block.samples()[0], 1e-4, epsilon = 1e-7)
            }
            BlockMessage::EndOfStream => panic!("unexpected end of stream"),
        }
        match harness.queue.pop() {
            BlockMessage::Data(block) => {
                approx::assert_relative_eq!(block.samples()[0], 2e-4, epsilon = 1e-7)
            }
            BlockMessage::EndOfStream => panic!("unexpected end of stream"),
        }
    }

    #[test]
    fn device_failure_closes_stop_signal() {
        let (harness, handle) = spawn_loop(50, Some(2), PUSH_TIMEOUT);

        let result = handle.join().unwrap();
        assert_eq!(
            result,
            Err(RecorderError::DeviceFailed("stream invalidated".into()))
        );
        assert!(harness.stop.is_closed());
        // Both captured blocks made it into the queue before the failure.
        assert_eq!(harness.queue.len(), 2);
    }
}
