/// Fixed-capacity circular buffer of interleaved `f32` samples.
///
/// Used by capture backends to bridge a device poll loop to block-sized
/// reads. Not synchronized; wrap in `Arc<parking_lot::Mutex<SampleRing>>`
/// for cross-thread use.
///
/// Overflow drops the oldest samples: when a device outpaces the reader,
/// losing stale audio is preferable to letting the ring grow without bound.
#[derive(Debug)]
pub struct SampleRing {
    buffer: Vec<f32>,
    read_index: usize,
    write_index: usize,
    len: usize,
}

impl SampleRing {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            read_index: 0,
            write_index: 0,
            len: 0,
        }
    }

    /// Append samples, overwriting the oldest ones on overflow.
    ///
    /// Returns the number of samples dropped to make room so callers can
    /// log device-side overruns.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        let capacity = self.buffer.len();
        if capacity == 0 {
            return samples.len();
        }
        if samples.is_empty() {
            return 0;
        }

        // A slice longer than the ring keeps only its tail.
        let mut dropped = samples.len().saturating_sub(capacity);
        let samples = &samples[dropped..];

        let overflow = (self.len + samples.len()).saturating_sub(capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % capacity;
            self.len -= overflow;
            dropped += overflow;
        }

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % capacity;
        }
        self.len += samples.len();
        dropped
    }

    /// Move up to `out.len()` samples into `out`, front first.
    ///
    /// Returns how many were moved; fewer than requested when the ring runs
    /// dry.
    pub fn pop_into(&mut self, out: &mut [f32]) -> usize {
        let capacity = self.buffer.len();
        let count = out.len().min(self.len);
        for slot in out.iter_mut().take(count) {
            *slot = self.buffer[self.read_index];
            self.read_index = (self.read_index + 1) % capacity;
        }
        self.len -= count;
        count
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_in_order() {
        let mut ring = SampleRing::with_capacity(8);
        assert_eq!(ring.push_slice(&[1.0, 2.0, 3.0]), 0);
        assert_eq!(ring.len(), 3);

        let mut out = [0.0; 3];
        assert_eq!(ring.pop_into(&mut out), 3);
        assert_eq!(out, [1.0, 2.0, 3.0]);
        assert!(ring.is_empty());
    }

    #[test]
    fn partial_pop_when_dry() {
        let mut ring = SampleRing::with_capacity(8);
        ring.push_slice(&[1.0, 2.0]);

        let mut out = [0.0; 5];
        assert_eq!(ring.pop_into(&mut out), 2);
        assert_eq!(&out[..2], &[1.0, 2.0]);
    }

    #[test]
    fn overflow_drops_oldest_and_reports() {
        let mut ring = SampleRing::with_capacity(4);
        assert_eq!(ring.push_slice(&[1.0, 2.0, 3.0, 4.0]), 0);
        assert_eq!(ring.push_slice(&[5.0, 6.0]), 2); // 1.0 and 2.0 dropped

        let mut out = [0.0; 4];
        assert_eq!(ring.pop_into(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn oversized_push_keeps_tail() {
        let mut ring = SampleRing::with_capacity(3);
        assert_eq!(ring.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2);

        let mut out = [0.0; 3];
        ring.pop_into(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0]);
    }

    #[test]
    fn wraparound_preserves_order() {
        let mut ring = SampleRing::with_capacity(4);
        ring.push_slice(&[1.0, 2.0, 3.0]);
        let mut out = [0.0; 2];
        ring.pop_into(&mut out); // read index advances to 2

        assert_eq!(ring.push_slice(&[4.0, 5.0, 6.0]), 0); // wraps

        let mut out = [0.0; 4];
        assert_eq!(ring.pop_into(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }
}
