#[cfg(test)]
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::thread;
use std::time::Duration;
use rand::{rngs::StdRng, Rng, SeedableRng};
use crate::drivers::ScanError;
/// One chunk of multi-channel EEG samples as delivered by a stream.
#[derive(Clone, Debug, Default)]
pub struct SignalBatch {
    pub sample_rate_hz: f32,
    pub timestamps: Vec<f64>,
    pub samples: Vec<Vec<f32>>, // channels x samples
}
impl SignalBatch {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.sample_rate_hz <= 0.0 {
            return Err(ScanError::InvalidSampleRate);
        }
        let expected = self.samples_per_channel();
        for channel in &self.samples {
            if channel.len() != expected {
                return Err(ScanError::ChannelMismatch {
                    expected,
                    actual: channel.len(),
                });
            }
        }
        Ok(())
    }
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }
    pub fn samples_per_channel(&self) -> usize {
        self.samples.first().map(|c| c.len()).unwrap_or(0)
    }
    pub fn is_empty(&self) -> bool {
        self.samples_per_channel() == 0
    }
    /// Stream time of the first and last sample, if the source stamped them.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }
    /// Keeps only the listed channels, in the given order.
    pub fn select_channels(&self, indices: &[usize]) -> Result<SignalBatch, ScanError> {
        let samples = indices
            .iter()
            .map(|&index| {
                self.samples
                    .get(index)
                    .cloned()
                    .ok_or(ScanError::ChannelOutOfRange {
                        index,
                        available: self.samples.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SignalBatch {
            sample_rate_hz: self.sample_rate_hz,
            timestamps: self.timestamps.clone(),
            samples,
        })
    }
}
/// Something that can hand out chunks of EEG on demand.
///
/// `Ok(None)` means the source is exhausted; an empty batch means nothing
/// arrived before the timeout.
pub trait SignalSource {
    fn sample_rate_hz(&self) -> f32;
    fn channel_count(&self) -> usize;
    fn pull_chunk(
        &mut self,
        max_samples: usize,
        timeout: Duration,
    ) -> Result<Option<SignalBatch>, ScanError>;
}
/// In-memory source for deterministic playback in tests.
#[cfg(test)]
pub struct ManualSource {
    sample_rate_hz: f32,
    channel_count: usize,
    queue: VecDeque<SignalBatch>,
}
#[cfg(test)]
impl ManualSource {
    pub fn new(
        sample_rate_hz: f32,
        channel_count: usize,
        batches: impl IntoIterator<Item = SignalBatch>,
    ) -> Self {
        Self {
            sample_rate_hz,
            channel_count,
            queue: batches.into_iter().collect(),
        }
    }
}
#[cfg(test)]
impl SignalSource for ManualSource {
    fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }
    fn channel_count(&self) -> usize {
        self.channel_count
    }
    fn pull_chunk(
        &mut self,
        _max_samples: usize,
        _timeout: Duration,
    ) -> Result<Option<SignalBatch>, ScanError> {
        Ok(self.queue.pop_front())
    }
}
/// One sinusoidal component of the synthetic signal.
#[derive(Clone, Copy, Debug)]
pub struct Rhythm {
    pub freq_hz: f32,
    pub amp_uv: f32,
}
/// Synthetic headset: a mix of rhythms plus uniform noise on every channel.
pub struct SimulatedSource {
    sample_rate_hz: f32,
    channel_count: usize,
    rhythms: Vec<Rhythm>,
    noise_uv: f32,
    realtime: bool,
    sample_index: u64,
    rng: StdRng,
}
impl SimulatedSource {
    /// Muse-like defaults: 256 Hz, 5 channels, alpha dominant, some mains hum.
    pub fn muse_like(seed: u64) -> Self {
        Self::new(
            256.0,
            5,
            vec![
                Rhythm { freq_hz: 2.0, amp_uv: 12.0 },
                Rhythm { freq_hz: 6.0, amp_uv: 8.0 },
                Rhythm { freq_hz: 10.0, amp_uv: 25.0 },
                Rhythm { freq_hz: 20.0, amp_uv: 5.0 },
                Rhythm { freq_hz: 40.0, amp_uv: 2.0 },
                Rhythm { freq_hz: 60.0, amp_uv: 15.0 },
            ],
            3.0,
            seed,
        )
    }
    pub fn new(
        sample_rate_hz: f32,
        channel_count: usize,
        rhythms: Vec<Rhythm>,
        noise_uv: f32,
        seed: u64,
    ) -> Self {
        Self {
            sample_rate_hz,
            channel_count,
            rhythms,
            noise_uv,
            realtime: false,
            sample_index: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }
    /// Sleep for the duration of each generated chunk, like a live stream would.
    pub fn paced(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
    fn sample_at(&mut self, t: f32, channel: usize) -> f32 {
        let phase = channel as f32 * 0.3;
        let clean: f32 = self
            .rhythms
            .iter()
            .map(|r| (2.0 * PI * r.freq_hz * t + phase).sin() * r.amp_uv)
            .sum();
        let noise = if self.noise_uv > 0.0 {
            self.rng.gen_range(-self.noise_uv..self.noise_uv)
        } else {
            0.0
        };
        clean + noise
    }
}
impl SignalSource for SimulatedSource {
    fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }
    fn channel_count(&self) -> usize {
        self.channel_count
    }
    fn pull_chunk(
        &mut self,
        max_samples: usize,
        _timeout: Duration,
    ) -> Result<Option<SignalBatch>, ScanError> {
        if self.sample_rate_hz <= 0.0 {
            return Err(ScanError::InvalidSampleRate);
        }
        let mut samples = vec![Vec::with_capacity(max_samples); self.channel_count];
        let mut timestamps = Vec::with_capacity(max_samples);
        for _ in 0..max_samples {
            let t = self.sample_index as f32 / self.sample_rate_hz;
            for (channel, column) in samples.iter_mut().enumerate() {
                let value = self.sample_at(t, channel);
                column.push(value);
            }
            timestamps.push(t as f64);
            self.sample_index += 1;
        }
        if self.realtime {
            thread::sleep(Duration::from_secs_f32(
                max_samples as f32 / self.sample_rate_hz,
            ));
        }
        Ok(Some(SignalBatch {
            sample_rate_hz: self.sample_rate_hz,
            timestamps,
            samples,
        }))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn select_channels_rejects_missing_index() {
        let batch = SignalBatch {
            sample_rate_hz: 256.0,
            timestamps: vec![],
            samples: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        };
        let picked = batch.select_channels(&[1]).unwrap();
        assert_eq!(picked.samples, vec![vec![3.0, 4.0]]);
        assert!(matches!(
            batch.select_channels(&[4]),
            Err(ScanError::ChannelOutOfRange { index: 4, available: 2 })
        ));
    }
    #[test]
    fn time_span_follows_selected_channels() {
        let batch = SignalBatch {
            sample_rate_hz: 256.0,
            timestamps: vec![10.0, 10.5, 11.25],
            samples: vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        };
        assert_eq!(batch.time_span(), Some((10.0, 11.25)));
        assert_eq!(batch.select_channels(&[1]).unwrap().time_span(), Some((10.0, 11.25)));
        assert_eq!(SignalBatch::default().time_span(), None);
    }
    #[test]
    fn ragged_batch_fails_validation() {
        let batch = SignalBatch {
            sample_rate_hz: 256.0,
            timestamps: vec![],
            samples: vec![vec![1.0, 2.0], vec![3.0]],
        };
        assert!(batch.validate().is_err());
    }
    #[test]
    fn simulated_source_is_deterministic_per_seed() {
        let mut a = SimulatedSource::muse_like(7);
        let mut b = SimulatedSource::muse_like(7);
        let ca = a.pull_chunk(51, Duration::from_secs(1)).unwrap().unwrap();
        let cb = b.pull_chunk(51, Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(ca.num_channels(), 5);
        assert_eq!(ca.samples_per_channel(), 51);
        assert_eq!(ca.samples, cb.samples);
        let next = a.pull_chunk(10, Duration::from_secs(1)).unwrap().unwrap();
        assert!((next.timestamps[0] - 51.0 / 256.0).abs() < 1e-6);
    }
}
