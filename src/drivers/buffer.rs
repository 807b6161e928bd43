use std::collections::VecDeque;
use crate::drivers::filter::{FilterChain, FilterKind};
use crate::drivers::{ScanError, SignalBatch};
/// Flattened view of the newest samples in the buffer.
#[derive(Clone, Debug)]
pub struct TimeSeriesFrame {
    pub sample_rate_hz: f32,
    pub samples: Vec<Vec<f32>>, // channels x samples
}
/// Raw EEG ring buffer. Starts zero-filled at full length and keeps that
/// length forever: every new sample pushes out the oldest one.
pub struct SignalBuffer {
    per_channel: Vec<VecDeque<f32>>, // channel -> samples
    filters: Vec<FilterChain>,       // channel -> filter state
    sample_rate_hz: f32,
    capacity: usize,
}
impl SignalBuffer {
    pub fn with_history_seconds(
        channel_count: usize,
        sample_rate_hz: f32,
        history_seconds: f32,
    ) -> Result<Self, ScanError> {
        if sample_rate_hz <= 0.0 {
            return Err(ScanError::InvalidSampleRate);
        }
        let capacity = (sample_rate_hz * history_seconds) as usize;
        if capacity == 0 {
            return Err(ScanError::InvalidWindow(format!(
                "{history_seconds} s at {sample_rate_hz} Hz holds no samples"
            )));
        }
        let per_channel = (0..channel_count)
            .map(|_| VecDeque::from(vec![0.0; capacity]))
            .collect();
        Ok(Self {
            per_channel,
            filters: vec![FilterChain::default(); channel_count],
            sample_rate_hz,
            capacity,
        })
    }
    /// Filter every incoming sample before it is stored. Each channel gets its
    /// own chain so filter state never leaks between electrodes.
    pub fn with_filters(mut self, kinds: &[FilterKind]) -> Self {
        self.filters = self
            .per_channel
            .iter()
            .map(|_| FilterChain::from_kinds(self.sample_rate_hz, kinds))
            .collect();
        self
    }
    pub fn push_batch(&mut self, batch: &SignalBatch) -> Result<(), ScanError> {
        batch.validate()?;
        if batch.num_channels() != self.per_channel.len() {
            return Err(ScanError::ChannelMismatch {
                expected: self.per_channel.len(),
                actual: batch.num_channels(),
            });
        }
        for ((channel_queue, filter), new_samples) in self
            .per_channel
            .iter_mut()
            .zip(self.filters.iter_mut())
            .zip(&batch.samples)
        {
            for &sample in new_samples {
                let value = if filter.is_empty() {
                    sample
                } else {
                    filter.process_sample(sample)
                };
                channel_queue.pop_front();
                channel_queue.push_back(value);
            }
        }
        Ok(())
    }
    /// Newest `count` samples per channel (clamped to the buffer length).
    pub fn last(&self, count: usize) -> TimeSeriesFrame {
        let take = count.min(self.capacity);
        let samples: Vec<Vec<f32>> = self
            .per_channel
            .iter()
            .map(|channel| channel.iter().skip(channel.len() - take).copied().collect())
            .collect();
        TimeSeriesFrame {
            sample_rate_hz: self.sample_rate_hz,
            samples,
        }
    }
}
#[cfg(test)]
impl SignalBuffer {
    pub fn num_channels(&self) -> usize {
        self.per_channel.len()
    }
    pub fn len(&self) -> usize {
        self.per_channel.first().map(|c| c.len()).unwrap_or(0)
    }
}
