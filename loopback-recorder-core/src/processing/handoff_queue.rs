use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::block::{AudioBlock, BlockMessage};

/// Default capacity of the capture-to-writer handoff queue, in blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// A bounded push could not complete within its timeout; the caller drops
/// the block instead of stalling capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushTimedOut;

struct Inner {
    messages: VecDeque<BlockMessage>,
    /// Data blocks currently queued; the capacity bound applies to these
    /// only, so the end-of-stream sentinel always fits.
    queued_blocks: usize,
}

/// Bounded FIFO handoff between the capture loop and the writer loop.
///
/// Single producer, single consumer. Capture pushes with a timeout and drops
/// on overflow; the writer pops with an unbounded wait because it has no
/// other work while idle. Insertion order is consumption order.
pub struct HandoffQueue {
    inner: Mutex<Inner>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

impl HandoffQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                messages: VecDeque::with_capacity(capacity + 1),
                queued_blocks: 0,
            }),
            capacity,
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueue a block, waiting up to `timeout` for a free slot.
    pub fn push(&self, block: AudioBlock, timeout: Duration) -> Result<(), PushTimedOut> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.queued_blocks >= self.capacity {
            if self.not_full.wait_until(&mut inner, deadline).timed_out()
                && inner.queued_blocks >= self.capacity
            {
                return Err(PushTimedOut);
            }
        }
        inner.queued_blocks += 1;
        inner.messages.push_back(BlockMessage::Data(block));
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Enqueue the end-of-stream sentinel. Always succeeds immediately, even
    /// when the queue is full, so the writer is guaranteed to observe
    /// shutdown.
    pub fn push_sentinel(&self) {
        self.inner.lock().messages.push_back(BlockMessage::EndOfStream);
        self.not_empty.notify_one();
    }

    /// Dequeue the next message, waiting as long as it takes.
    pub fn pop(&self) -> BlockMessage {
        let mut inner = self.inner.lock();
        loop {
            if let Some(message) = inner.messages.pop_front() {
                if matches!(message, BlockMessage::Data(_)) {
                    inner.queued_blocks -= 1;
                    drop(inner);
                    self.not_full.notify_one();
                }
                return message;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Dequeue the next message if one is queued.
    pub fn try_pop(&self) -> Option<BlockMessage> {
        let mut inner = self.inner.lock();
        let message = inner.messages.pop_front()?;
        if matches!(message, BlockMessage::Data(_)) {
            inner.queued_blocks -= 1;
            drop(inner);
            self.not_full.notify_one();
        }
        Some(message)
    }

    /// Data blocks currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().queued_blocks
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn block(tag: f32) -> AudioBlock {
        AudioBlock::new(vec![tag; 4], 2, 48000)
    }

    fn short() -> Duration {
        Duration::from_millis(20)
    }

    #[test]
    fn fifo_order_preserved() {
        let queue = HandoffQueue::new(10);
        for i in 0..5 {
            queue.push(block(i as f32), short()).unwrap();
        }
        for i in 0..5 {
            match queue.pop() {
                BlockMessage::Data(b) => assert_eq!(b.samples()[0], i as f32),
                BlockMessage::EndOfStream => panic!("unexpected end of stream"),
            }
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn push_times_out_when_full() {
        let queue = HandoffQueue::new(2);
        queue.push(block(1.0), short()).unwrap();
        queue.push(block(2.0), short()).unwrap();
        assert_eq!(queue.push(block(3.0), short()), Err(PushTimedOut));

        // The writer still receives the first two blocks, in order.
        match queue.pop() {
            BlockMessage::Data(b) => assert_eq!(b.samples()[0], 1.0),
            _ => panic!("expected data"),
        }
        match queue.pop() {
            BlockMessage::Data(b) => assert_eq!(b.samples()[0], 2.0),
            _ => panic!("expected data"),
        }
    }

    #[test]
    fn sentinel_bypasses_full_queue() {
        let queue = HandoffQueue::new(1);
        queue.push(block(1.0), short()).unwrap();
        queue.push_sentinel();

        assert!(matches!(queue.pop(), BlockMessage::Data(_)));
        assert!(matches!(queue.pop(), BlockMessage::EndOfStream));
    }

    #[test]
    fn try_pop_drains_without_blocking() {
        let queue = HandoffQueue::new(4);
        queue.push(block(1.0), short()).unwrap();
        queue.push(block(2.0), short()).unwrap();

        assert!(queue.try_pop().is_some());
        assert!(queue.try_pop().is_some());
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn pop_wakes_on_push() {
        let queue = Arc::new(HandoffQueue::new(2));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(30));
        queue.push(block(7.0), short()).unwrap();

        match consumer.join().unwrap() {
            BlockMessage::Data(b) => assert_eq!(b.samples()[0], 7.0),
            BlockMessage::EndOfStream => panic!("unexpected end of stream"),
        }
    }

    #[test]
    fn blocked_push_completes_once_drained() {
        let queue = Arc::new(HandoffQueue::new(1));
        queue.push(block(1.0), short()).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(block(2.0), Duration::from_secs(2)))
        };
        thread::sleep(Duration::from_millis(30));
        assert!(matches!(queue.pop(), BlockMessage::Data(_)));

        assert_eq!(producer.join().unwrap(), Ok(()));
        match queue.pop() {
            BlockMessage::Data(b) => assert_eq!(b.samples()[0], 2.0),
            _ => panic!("expected data"),
        }
    }
}
