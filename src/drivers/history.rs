use ndarray::{s, Array2, ArrayView1, Axis};
use crate::drivers::ScanError;
use crate::types::{Band, BandPowers};
/// Band powers of the most recent epochs, one row per epoch.
///
/// Zero-filled on construction; each push drops the oldest row so the
/// number of rows never changes.
#[derive(Clone, Debug)]
pub struct BandHistory {
    rows: Array2<f64>, // epochs x bands
}
impl BandHistory {
    pub fn new(epochs: usize) -> Result<Self, ScanError> {
        if epochs == 0 {
            return Err(ScanError::InvalidWindow(
                "band history needs at least one epoch".into(),
            ));
        }
        Ok(Self {
            rows: Array2::zeros((epochs, Band::COUNT)),
        })
    }
    pub fn epochs(&self) -> usize {
        self.rows.nrows()
    }
    pub fn push(&mut self, powers: &BandPowers) {
        let n = self.rows.nrows();
        if n > 1 {
            let newer = self.rows.slice(s![1.., ..]).to_owned();
            self.rows.slice_mut(s![..n - 1, ..]).assign(&newer);
        }
        self.rows
            .row_mut(n - 1)
            .assign(&ArrayView1::from(powers.as_slice()));
    }
    /// Mean over the epochs, one value per band.
    pub fn smoothed(&self) -> BandPowers {
        let mut out = BandPowers::default();
        if let Some(mean) = self.rows.mean_axis(Axis(0)) {
            for (slot, value) in out.0.iter_mut().zip(mean.iter()) {
                *slot = *value;
            }
        }
        out
    }
    /// Per-band series ordered oldest to newest.
    pub fn series(&self, band: Band) -> Vec<f64> {
        self.rows.column(band as usize).to_vec()
    }
}
