//! Sliding window buffer: fixed-capacity rolling store of recent samples

use crate::error::NeurocastResult;
use crate::invalid_input;
use crate::sample::Sample;

/// Fixed-length, per-channel rolling window.
///
/// Stored row-major as `[time][channel]` in a single allocation. The window is
/// zero-filled at creation and always holds exactly `capacity` rows; appending
/// `n` samples drops the `n` oldest rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingWindowBuffer {
    data: Vec<f64>,
    capacity: usize,
    channel_count: usize,
    total_appended: u64,
}

impl SlidingWindowBuffer {
    /// Create a zero-filled window
    pub fn new(capacity: usize, channel_count: usize) -> NeurocastResult<Self> {
        if capacity == 0 {
            return Err(invalid_input!("window capacity must be greater than 0"));
        }
        if channel_count == 0 {
            return Err(invalid_input!("window needs at least one channel"));
        }

        Ok(SlidingWindowBuffer {
            data: vec![0.0; capacity * channel_count],
            capacity,
            channel_count,
            total_appended: 0,
        })
    }

    /// Shift the window left by `samples.len()` rows and write the new
    /// samples into the trailing rows.
    ///
    /// Values beyond the channel count are ignored and missing values are
    /// written as zero. More samples than the capacity is a contract
    /// violation and is rejected without touching the window.
    pub fn append(&mut self, samples: &[Sample]) -> NeurocastResult<()> {
        let n = samples.len();
        if n == 0 {
            return Ok(());
        }
        if n > self.capacity {
            return Err(invalid_input!(
                "cannot append {} samples to a window of capacity {}",
                n,
                self.capacity
            ));
        }

        let width = self.channel_count;
        self.data.copy_within(n * width.., 0);

        let tail_start = (self.capacity - n) * width;
        for (row, sample) in self.data[tail_start..].chunks_exact_mut(width).zip(samples) {
            let copied = sample.values.len().min(width);
            row[..copied].copy_from_slice(&sample.values[..copied]);
            row[copied..].fill(0.0);
        }

        self.total_appended += n as u64;
        Ok(())
    }

    /// Number of rows; always equal to the capacity
    pub fn len(&self) -> usize {
        self.capacity
    }

    /// Always false: the window is never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Configured capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of channel columns
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Samples appended since creation
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    /// Whether the window has seen at least `capacity` real samples
    pub fn is_primed(&self) -> bool {
        self.total_appended >= self.capacity as u64
    }

    /// Row `index` (0 = oldest)
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.capacity {
            return None;
        }
        let start = index * self.channel_count;
        Some(&self.data[start..start + self.channel_count])
    }

    /// Rows from oldest to newest
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.channel_count)
    }

    /// Copy of one channel's history, oldest first
    pub fn channel(&self, channel: usize) -> Option<Vec<f64>> {
        if channel >= self.channel_count {
            return None;
        }
        Some(self.rows().map(|row| row[channel]).collect())
    }

    /// Transposed copy of the window: `[channel][time]`
    pub fn to_channel_major(&self) -> Vec<Vec<f64>> {
        let mut channels = vec![Vec::with_capacity(self.capacity); self.channel_count];
        for row in self.rows() {
            for (column, &value) in channels.iter_mut().zip(row) {
                column.push(value);
            }
        }
        channels
    }
}
