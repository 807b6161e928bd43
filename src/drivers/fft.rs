use std::f64::consts::PI;
use rustfft::{num_complex::Complex64, FftPlanner};
use crate::drivers::{ScanError, TimeSeriesFrame};
use crate::types::{Band, BandPowers};
/// One-sided amplitude spectrum of a single epoch channel.
#[derive(Clone, Debug)]
pub struct EpochSpectrum {
    pub frequencies_hz: Vec<f64>,
    pub psd: Vec<f64>,
}
impl EpochSpectrum {
    /// Mean PSD over the bins inside `band`; NaN when the band has no bins.
    pub fn band_mean(&self, band: Band) -> f64 {
        let (low, high) = band.range_hz();
        let (sum, count) = self
            .frequencies_hz
            .iter()
            .zip(&self.psd)
            .filter(|(f, _)| **f >= low && **f < high)
            .fold((0.0, 0usize), |(sum, count), (_, p)| (sum + p, count + 1));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }
}
/// Estimates log10 band powers from an epoch using a hamming-windowed FFT.
pub struct BandPowerEstimator {
    planner: FftPlanner<f64>,
}
impl Default for BandPowerEstimator {
    fn default() -> Self {
        Self::new()
    }
}
impl BandPowerEstimator {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }
    pub fn spectrum(&mut self, channel: &[f32], sample_rate_hz: f32) -> EpochSpectrum {
        let len = channel.len();
        let nfft = len.next_power_of_two();
        let half = nfft / 2;
        let mean = channel.iter().map(|&v| v as f64).sum::<f64>() / len as f64;
        let window = hamming(len);
        let mut buffer: Vec<Complex64> = channel
            .iter()
            .zip(&window)
            .map(|(&v, w)| Complex64::new((v as f64 - mean) * w, 0.0))
            .collect();
        buffer.resize(nfft, Complex64::new(0.0, 0.0));
        let fft = self.planner.plan_fft_forward(nfft);
        fft.process(&mut buffer);
        let nyquist = sample_rate_hz as f64 / 2.0;
        let frequencies_hz = linspace(0.0, nyquist, half);
        let psd = buffer
            .iter()
            .take(half)
            .map(|c| 2.0 * c.norm() / len as f64)
            .collect();
        EpochSpectrum {
            frequencies_hz,
            psd,
        }
    }
    /// Band powers for the frame, averaged across its channels.
    pub fn compute(&mut self, frame: &TimeSeriesFrame) -> Result<BandPowers, ScanError> {
        if frame.sample_rate_hz <= 0.0 {
            return Err(ScanError::InvalidSampleRate);
        }
        let channels: Vec<&Vec<f32>> = frame.samples.iter().filter(|c| !c.is_empty()).collect();
        if channels.is_empty() {
            return Err(ScanError::InvalidWindow("epoch holds no samples".into()));
        }
        let mut powers = BandPowers::default();
        for channel in &channels {
            let spectrum = self.spectrum(channel, frame.sample_rate_hz);
            for band in Band::ALL {
                powers[band] += spectrum.band_mean(band).log10();
            }
        }
        for band in Band::ALL {
            powers[band] /= channels.len() as f64;
        }
        Ok(powers)
    }
}
fn hamming(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (len - 1) as f64).cos())
        .collect()
}
fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            let mut points: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
            points[count - 1] = stop;
            points
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn sine_frame(freq_hz: f32, fs: f32, len: usize) -> TimeSeriesFrame {
        let samples = (0..len)
            .map(|i| 50.0 * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / fs).sin() + 800.0)
            .collect();
        TimeSeriesFrame {
            sample_rate_hz: fs,
            samples: vec![samples],
        }
    }
    fn dominant(powers: &BandPowers) -> Band {
        Band::ALL
            .into_iter()
            .max_by(|a, b| powers[*a].total_cmp(&powers[*b]))
            .unwrap()
    }
    #[test]
    fn sinusoid_lands_in_its_band() {
        let mut estimator = BandPowerEstimator::new();
        for (freq, band) in [
            (2.0, Band::Delta),
            (6.0, Band::Theta),
            (10.0, Band::Alpha),
            (20.0, Band::Beta),
            (45.0, Band::Gamma),
        ] {
            let powers = estimator.compute(&sine_frame(freq, 256.0, 256)).unwrap();
            assert_eq!(dominant(&powers), band, "{freq} Hz");
        }
    }
    #[test]
    fn spectrum_is_zero_padded_to_power_of_two() {
        let mut estimator = BandPowerEstimator::new();
        let spectrum = estimator.spectrum(&vec![1.0; 200], 256.0);
        assert_eq!(spectrum.psd.len(), 128);
        assert_eq!(spectrum.frequencies_hz.first(), Some(&0.0));
        assert_eq!(spectrum.frequencies_hz.last(), Some(&128.0));
    }
    #[test]
    fn empty_epoch_is_an_error() {
        let mut estimator = BandPowerEstimator::new();
        let frame = TimeSeriesFrame {
            sample_rate_hz: 256.0,
            samples: vec![vec![]],
        };
        assert!(matches!(
            estimator.compute(&frame),
            Err(ScanError::InvalidWindow(_))
        ));
    }
    #[test]
    fn hamming_matches_reference_endpoints() {
        let w = hamming(5);
        assert!((w[0] - 0.08).abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);
        assert!((w[4] - 0.08).abs() < 1e-12);
    }
}
