use std::f64::consts::PI;
use rustfft::num_complex::Complex64;
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterKind {
    /// Butterworth band-stop between the edges; `order` is the order of the
    /// low-pass prototype, the band-stop has `order` biquad sections.
    Bandstop { low_hz: f32, high_hz: f32, order: usize },
}
impl FilterKind {
    /// Mains rejection over `mains_hz` +/- 5 Hz, 4th-order Butterworth.
    pub fn mains(mains_hz: f32) -> Self {
        FilterKind::Bandstop {
            low_hz: mains_hz - 5.0,
            high_hz: mains_hz + 5.0,
            order: 4,
        }
    }
}
#[derive(Clone, Copy, Debug)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}
impl BiquadFilter {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }
    /// Steady state for a constant input `x`; sections have unit DC gain.
    fn prime(&mut self, x: f64) {
        let c = self.coeffs;
        self.state.z2 = (c.b2 - c.a2) * x;
        self.state.z1 = x - c.b0 * x;
    }
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}
/// Cascade of biquad sections. State persists across calls so consecutive
/// chunks are filtered as one continuous signal. The first sample primes
/// every section to its steady state, so a DC offset causes no start-up ringing.
#[derive(Clone, Default, Debug)]
pub struct FilterChain {
    sections: Vec<BiquadFilter>,
    primed: bool,
}
impl FilterChain {
    pub fn from_kinds(sample_rate_hz: f32, kinds: &[FilterKind]) -> Self {
        let mut sections = Vec::new();
        for kind in kinds {
            sections.extend(design_sections(sample_rate_hz as f64, *kind));
        }
        Self { sections, primed: false }
    }
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        let mut value = sample as f64;
        if !self.primed {
            for section in &mut self.sections {
                section.prime(value);
            }
            self.primed = true;
        }
        for section in &mut self.sections {
            value = section.process(value);
        }
        value as f32
    }
}
fn design_sections(sample_rate_hz: f64, kind: FilterKind) -> Vec<BiquadFilter> {
    let nyquist = sample_rate_hz * 0.5;
    match kind {
        FilterKind::Bandstop { low_hz, high_hz, order } => {
            let low = nyquist_clamp(low_hz.min(high_hz) as f64, nyquist);
            let high = nyquist_clamp(low_hz.max(high_hz) as f64, nyquist);
            butterworth_bandstop(low, high, order.max(1), sample_rate_hz)
                .into_iter()
                .map(BiquadFilter::new)
                .collect()
        }
    }
}
fn nyquist_clamp(freq_hz: f64, nyquist: f64) -> f64 {
    freq_hz.clamp(0.01, nyquist - 0.01)
}
/// Analog Butterworth prototype -> band-stop -> bilinear transform with
/// pre-warped edges. Each prototype pole yields one conjugate pole pair, i.e.
/// one section; every section carries the zero pair on the unit circle at the
/// centre frequency.
fn butterworth_bandstop(low_hz: f64, high_hz: f64, order: usize, sample_rate_hz: f64) -> Vec<BiquadCoeffs> {
    let c = 2.0 * sample_rate_hz;
    let warp = |f: f64| c * (PI * f / sample_rate_hz).tan();
    let (w_low, w_high) = (warp(low_hz), warp(high_hz));
    let w0_sq = w_low * w_high;
    let bandwidth = w_high - w_low;
    let cos_center = (c * c - w0_sq) / (c * c + w0_sq);
    let c = Complex64::new(c, 0.0);
    (0..order)
        .map(|k| {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let prototype = Complex64::from_polar(1.0, theta);
            // s^2 - (bw / p) s + w0^2 = 0
            let half = Complex64::new(bandwidth, 0.0) / prototype * 0.5;
            let disc = (half * half - w0_sq).sqrt();
            let (r1, r2) = (half + disc, half - disc);
            let s = if r1.im >= r2.im { r1 } else { r2 };
            let z = (c + s) / (c - s);
            let a1 = -2.0 * z.re;
            let a2 = z.norm_sqr();
            let gain = (1.0 + a1 + a2) / (2.0 - 2.0 * cos_center);
            BiquadCoeffs {
                b0: gain,
                b1: -2.0 * cos_center * gain,
                b2: gain,
                a1,
                a2,
            }
        })
        .collect()
}
#[cfg(test)]
mod tests {
    use super::*;
    fn tone(freq_hz: f64, fs: f64, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / fs).sin() as f32)
            .collect()
    }
    fn filter_all(chain: &mut FilterChain, samples: &mut [f32]) {
        for sample in samples {
            *sample = chain.process_sample(*sample);
        }
    }
    fn mains_tail_rms(freq_hz: f64) -> f32 {
        let fs = 256.0;
        let mut chain = FilterChain::from_kinds(fs as f32, &[FilterKind::mains(60.0)]);
        let mut signal = tone(freq_hz, fs, 2048);
        filter_all(&mut chain, &mut signal);
        let tail = &signal[signal.len() / 2..];
        (tail.iter().map(|v| v * v).sum::<f32>() / tail.len() as f32).sqrt()
    }
    #[test]
    fn mains_filter_suppresses_60hz_and_passes_alpha() {
        assert!(mains_tail_rms(60.0) < 0.01);
        assert!(mains_tail_rms(10.0) > 0.69);
        assert!(mains_tail_rms(100.0) > 0.69);
    }
    #[test]
    fn mains_band_edges_are_half_power() {
        // sine RMS is 0.707; -3 dB at both edges leaves 0.5
        for edge in [55.0, 65.0] {
            let rms = mains_tail_rms(edge);
            assert!((rms - 0.5).abs() < 0.03, "{edge} Hz -> {rms}");
        }
        assert!(mains_tail_rms(57.0) < 0.1);
        assert!(mains_tail_rms(63.0) < 0.1);
        assert!(mains_tail_rms(50.0) > 0.65);
        assert!(mains_tail_rms(70.0) > 0.65);
    }
    #[test]
    fn first_sample_primes_steady_state() {
        let mut chain = FilterChain::from_kinds(256.0, &[FilterKind::mains(60.0)]);
        let mut offset = vec![850.0f32; 64];
        filter_all(&mut chain, &mut offset);
        for v in offset {
            assert!((v - 850.0).abs() < 1e-2, "{v}");
        }
    }
    #[test]
    fn state_carries_across_chunks() {
        let fs = 256.0;
        let signal = tone(60.0, fs, 512);
        let mut whole = signal.clone();
        filter_all(
            &mut FilterChain::from_kinds(fs as f32, &[FilterKind::mains(60.0)]),
            &mut whole,
        );
        let mut chunked = signal;
        let mut chain = FilterChain::from_kinds(fs as f32, &[FilterKind::mains(60.0)]);
        for chunk in chunked.chunks_mut(51) {
            filter_all(&mut chain, chunk);
        }
        for (a, b) in whole.iter().zip(&chunked) {
            assert!((a - b).abs() < 1e-5);
        }
    }
    #[test]
    fn empty_chain_is_identity() {
        let mut chain = FilterChain::from_kinds(256.0, &[]);
        assert!(chain.is_empty());
        assert_eq!(chain.process_sample(3.5), 3.5);
    }
}
