// src/types.rs
use std::fmt;
use std::ops::{Index, IndexMut};

// 频带, 顺序固定: delta, theta, alpha, beta, gamma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    Delta = 0,
    Theta = 1,
    Alpha = 2,
    Beta = 3,
    Gamma = 4,
}

impl Band {
    pub const COUNT: usize = 5;
    pub const ALL: [Band; Band::COUNT] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    pub fn label(self) -> &'static str {
        match self {
            Band::Delta => "Delta",
            Band::Theta => "Theta",
            Band::Alpha => "Alpha",
            Band::Beta => "Beta",
            Band::Gamma => "Gamma",
        }
    }

    /// Half-open frequency range `[low, high)` in Hz.
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Delta => (0.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 12.0),
            Band::Beta => (12.0, 30.0),
            Band::Gamma => (30.0, f64::INFINITY),
        }
    }
}

// 每个频带一个值 (log10 功率)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandPowers(pub [f64; Band::COUNT]);

impl BandPowers {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Index<Band> for BandPowers {
    type Output = f64;
    fn index(&self, band: Band) -> &f64 {
        &self.0[band as usize]
    }
}

impl IndexMut<Band> for BandPowers {
    fn index_mut(&mut self, band: Band) -> &mut f64 {
        &mut self.0[band as usize]
    }
}

impl fmt::Display for BandPowers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, band) in Band::ALL.iter().enumerate() {
            if i > 0 { write!(f, "  ")?; }
            write!(f, "{}: {:.4}", band.label(), self[*band])?;
        }
        Ok(())
    }
}

// 神经反馈指标 (基于平滑后的频带功率)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NeurofeedbackMetrics {
    pub alpha_relaxation: f64,   // alpha / delta
    pub beta_concentration: f64, // beta / theta
    pub gamma_perception: f64,   // gamma
    pub theta_relaxation: f64,   // theta / alpha
}

impl fmt::Display for NeurofeedbackMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Alpha Relaxation: {:.4}", self.alpha_relaxation)?;
        writeln!(f, "Beta Concentration: {:.4}", self.beta_concentration)?;
        writeln!(f, "Gamma Perception: {:.4}", self.gamma_perception)?;
        write!(f, "Theta Relaxation: {:.4}", self.theta_relaxation)
    }
}

// 每个 epoch 的计算结果
#[derive(Clone, Copy, Debug)]
pub struct EpochReport {
    pub index: u64,
    pub powers: BandPowers,
    pub smoothed: BandPowers,
    pub metrics: NeurofeedbackMetrics,
}

// 后台发给 GUI 的消息
#[derive(Clone, Debug)]
pub enum ScanMessage {
    Log(String),
    Connected { sample_rate_hz: f32, channels: usize },
    Epoch(EpochReport),
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_indexing_follows_fixed_order() {
        let powers = BandPowers([0.0, 1.0, 2.0, 3.0, 4.0]);
        for (i, band) in Band::ALL.iter().enumerate() {
            assert_eq!(*band as usize, i);
            assert_eq!(powers[*band], i as f64);
        }
    }

    #[test]
    fn display_lists_every_band() {
        let text = BandPowers([1.0; 5]).to_string();
        for band in Band::ALL {
            assert!(text.contains(band.label()));
        }
    }
}
