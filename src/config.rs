// src/config.rs
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::drivers::ScanError;

/// Signal-processing parameters. Lengths are in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Raw buffer holds the last `buffer_length` seconds.
    pub buffer_length: f64,
    /// Epoch used for each FFT.
    pub epoch_length: f64,
    /// Overlap between two consecutive epochs.
    pub overlap_length: f64,
    /// Electrodes to keep. Muse: 0 = TP9, 1 = AF7, 2 = AF8, 3 = TP10.
    pub index_channel: Vec<usize>,
    pub notch_enabled: bool,
    pub notch_hz: f32,
    pub resolve_timeout_secs: f64,
    pub pull_timeout_secs: f64,
    pub max_chunk_len: i32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            buffer_length: 5.0,
            epoch_length: 1.0,
            overlap_length: 0.8,
            index_channel: vec![0],
            notch_enabled: true,
            notch_hz: 60.0,
            resolve_timeout_secs: 2.0,
            pull_timeout_secs: 1.0,
            max_chunk_len: 12,
        }
    }
}

impl Parameters {
    /// How far the start of each epoch moves forward.
    pub fn shift_length(&self) -> f64 {
        self.epoch_length - self.overlap_length
    }

    /// Number of epochs that fit in the buffer.
    pub fn n_epochs(&self) -> usize {
        ((self.buffer_length - self.epoch_length) / self.shift_length() + 1.0).floor() as usize
    }

    pub fn epoch_samples(&self, sample_rate_hz: f32) -> usize {
        (self.epoch_length * sample_rate_hz as f64) as usize
    }

    pub fn shift_samples(&self, sample_rate_hz: f32) -> usize {
        (self.shift_length() * sample_rate_hz as f64) as usize
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.resolve_timeout_secs.max(0.0))
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.pull_timeout_secs.max(0.0))
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        let bad = |msg: String| Err(ScanError::InvalidWindow(msg));
        if self.epoch_length <= 0.0 || self.buffer_length <= 0.0 {
            return bad("buffer and epoch lengths must be positive".into());
        }
        if self.overlap_length < 0.0 || self.overlap_length >= self.epoch_length {
            return bad(format!(
                "overlap {} must be in [0, epoch length {})",
                self.overlap_length, self.epoch_length
            ));
        }
        if self.epoch_length > self.buffer_length {
            return bad(format!(
                "epoch {} s does not fit in a {} s buffer",
                self.epoch_length, self.buffer_length
            ));
        }
        if self.index_channel.is_empty() {
            return bad("at least one channel must be selected".into());
        }
        if self.n_epochs() == 0 {
            return bad("buffer holds no complete epoch".into());
        }
        Ok(())
    }
}

/// Arguments for `muselsl stream`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuseStreamConfig {
    pub program: String,
    pub address: String,
    pub backend: String,
    pub interface: Option<String>,
    pub name: Option<String>,
    pub ppg: bool,
    pub acc: bool,
    pub gyro: bool,
    pub disable_eeg: bool,
    /// Re-run through `sudo` when not already root (BLE access needs it on most Linux setups).
    pub elevate: bool,
}

impl Default for MuseStreamConfig {
    fn default() -> Self {
        Self {
            program: "muselsl".to_string(),
            address: "00:55:DA:B3:BE:F7".to_string(),
            backend: "auto".to_string(),
            interface: None,
            name: None,
            ppg: false,
            acc: false,
            gyro: false,
            disable_eeg: false,
            elevate: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub parameters: Parameters,
    pub muse: MuseStreamConfig,
}

impl AppConfig {
    /// Loads a JSON config; fields that are missing keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_give_21_epochs() {
        let p = Parameters::default();
        assert!((p.shift_length() - 0.2).abs() < 1e-9);
        assert_eq!(p.n_epochs(), 21);
        assert_eq!(p.epoch_samples(256.0), 256);
        assert_eq!(p.shift_samples(256.0), 51);
        p.validate().unwrap();
    }

    #[test]
    fn overlap_not_below_epoch_is_rejected() {
        let p = Parameters { overlap_length: 1.0, ..Parameters::default() };
        assert!(p.validate().is_err());
        let p = Parameters { index_channel: vec![], ..Parameters::default() };
        assert!(p.validate().is_err());
        let p = Parameters { epoch_length: 6.0, overlap_length: 0.5, ..Parameters::default() };
        assert!(p.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "parameters": {{ "index_channel": [1, 2] }}, "muse": {{ "ppg": true }} }}"#).unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.parameters.index_channel, vec![1, 2]);
        assert_eq!(config.parameters.buffer_length, 5.0);
        assert!(config.muse.ppg);
        assert_eq!(config.muse.address, "00:55:DA:B3:BE:F7");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(AppConfig::load(Path::new("/nonexistent/bandscan.json")).is_err());
        assert_eq!(AppConfig::load_or_default(None).unwrap(), AppConfig::default());
    }
}
