use std::sync::Arc;

use crate::models::block::{AudioBlock, BlockMessage};
use crate::models::error::RecorderError;
use crate::models::stats::SessionStats;
use crate::processing::handoff_queue::HandoffQueue;
use crate::traits::delegate::RecorderDelegate;
use crate::traits::sink::{AudioSink, SinkReport};

/// Consumer side of the pipeline: drains the handoff queue into the sink.
///
/// Runs on its own thread for the lifetime of a session. Suspends only on
/// `pop`; the pause gate never touches it, so queued blocks keep draining
/// while capture is paused. After the end-of-stream sentinel it drains any
/// blocks still queued behind it (a producer can complete a timed-out push
/// after the sentinel lands), then the sink is closed exactly once on every
/// exit path, error included.
pub(crate) struct WriterLoop {
    pub queue: Arc<HandoffQueue>,
    pub stats: Arc<SessionStats>,
    pub delegate: Option<Arc<dyn RecorderDelegate>>,
}

impl WriterLoop {
    pub fn run<S: AudioSink>(self, mut sink: S) -> Result<SinkReport, RecorderError> {
        let outcome = self.pump(&mut sink);
        let closed = sink.close();
        match outcome {
            Ok(()) => closed,
            Err(err) => {
                if let Err(close_err) = closed {
                    log::error!("sink close failed after writer error: {}", close_err);
                }
                Err(err)
            }
        }
    }

    fn pump<S: AudioSink>(&self, sink: &mut S) -> Result<(), RecorderError> {
        loop {
            match self.queue.pop() {
                BlockMessage::Data(block) => self.append(sink, &block)?,
                BlockMessage::EndOfStream => break,
            }
        }

        while let Some(message) = self.queue.try_pop() {
            if let BlockMessage::Data(block) = message {
                self.append(sink, &block)?;
            }
        }
        Ok(())
    }

    fn append<S: AudioSink>(&self, sink: &mut S, block: &AudioBlock) -> Result<(), RecorderError> {
        match sink.append(block) {
            Ok(()) => {
                self.stats.record_written();
                Ok(())
            }
            Err(err) => {
                log::error!("writer failed to append block: {}", err);
                if let Some(delegate) = &self.delegate {
                    delegate.on_error(&err);
                    delegate.on_status(&format!("Writer error: {}", err));
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::block::AudioBlock;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct SinkLog {
        appended: Vec<f32>,
        closes: u32,
    }

    /// In-memory sink recording the first sample of each appended block.
    struct MemorySink {
        log: Arc<Mutex<SinkLog>>,
        fail_on_append: Option<usize>,
        appends: usize,
    }

    impl MemorySink {
        fn new(log: Arc<Mutex<SinkLog>>) -> Self {
            Self {
                log,
                fail_on_append: None,
                appends: 0,
            }
        }
    }

    impl AudioSink for MemorySink {
        fn append(&mut self, block: &AudioBlock) -> Result<(), RecorderError> {
            if self.fail_on_append == Some(self.appends) {
                return Err(RecorderError::Sink("disk full".into()));
            }
            self.appends += 1;
            self.log.lock().appended.push(block.samples()[0]);
            Ok(())
        }

        fn close(&mut self) -> Result<SinkReport, RecorderError> {
            let mut log = self.log.lock();
            log.closes += 1;
            Ok(SinkReport {
                bytes_written: log.appended.len() as u64,
                checksum: None,
            })
        }
    }

    fn block(tag: f32) -> AudioBlock {
        AudioBlock::new(vec![tag; 4], 2, 48000)
    }

    fn writer_with_queue(queue: Arc<HandoffQueue>) -> (WriterLoop, Arc<SessionStats>) {
        let stats = Arc::new(SessionStats::default());
        let writer = WriterLoop {
            queue,
            stats: Arc::clone(&stats),
            delegate: None,
        };
        (writer, stats)
    }

    #[test]
    fn writes_all_blocks_then_closes_on_sentinel() {
        let queue = Arc::new(HandoffQueue::new(10));
        for i in 1..=3 {
            queue.push(block(i as f32), Duration::from_millis(10)).unwrap();
        }
        queue.push_sentinel();

        let log = Arc::new(Mutex::new(SinkLog::default()));
        let (writer, stats) = writer_with_queue(queue);
        let report = writer.run(MemorySink::new(Arc::clone(&log))).unwrap();

        let log = log.lock();
        assert_eq!(log.appended, vec![1.0, 2.0, 3.0]);
        assert_eq!(log.closes, 1);
        assert_eq!(report.bytes_written, 3);
        assert_eq!(stats.snapshot().blocks_written, 3);
    }

    #[test]
    fn drains_blocks_queued_behind_the_sentinel() {
        let queue = Arc::new(HandoffQueue::new(10));
        queue.push(block(1.0), Duration::from_millis(10)).unwrap();
        queue.push_sentinel();
        // A producer finishing a slow push lands behind the sentinel.
        queue.push(block(2.0), Duration::from_millis(10)).unwrap();

        let log = Arc::new(Mutex::new(SinkLog::default()));
        let (writer, _) = writer_with_queue(queue);
        writer.run(MemorySink::new(Arc::clone(&log))).unwrap();

        let log = log.lock();
        assert_eq!(log.appended, vec![1.0, 2.0]);
        assert_eq!(log.closes, 1);
    }

    #[test]
    fn append_failure_exits_but_still_closes() {
        let queue = Arc::new(HandoffQueue::new(10));
        queue.push(block(1.0), Duration::from_millis(10)).unwrap();
        queue.push(block(2.0), Duration::from_millis(10)).unwrap();
        queue.push_sentinel();

        let log = Arc::new(Mutex::new(SinkLog::default()));
        let mut sink = MemorySink::new(Arc::clone(&log));
        sink.fail_on_append = Some(1); // second append fails

        let (writer, stats) = writer_with_queue(queue);
        let result = writer.run(sink);
        assert_eq!(result, Err(RecorderError::Sink("disk full".into())));

        let log = log.lock();
        assert_eq!(log.appended, vec![1.0]);
        assert_eq!(log.closes, 1);
        assert_eq!(stats.snapshot().blocks_written, 1);
    }

    #[test]
    fn sentinel_alone_closes_empty_sink() {
        let queue = Arc::new(HandoffQueue::new(10));
        queue.push_sentinel();

        let log = Arc::new(Mutex::new(SinkLog::default()));
        let (writer, _) = writer_with_queue(queue);
        let report = writer.run(MemorySink::new(Arc::clone(&log))).unwrap();

        assert_eq!(report.bytes_written, 0);
        assert_eq!(log.lock().closes, 1);
    }
}
