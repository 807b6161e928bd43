// src/drivers/mod.rs
pub mod buffer;
pub mod error;
pub mod fft;
pub mod filter;
pub mod history;
pub mod lsl;
pub mod pipeline;
pub mod plot;
pub mod source;
pub use buffer::{SignalBuffer, TimeSeriesFrame};
pub use error::ScanError;
pub use history::BandHistory;
pub use pipeline::{BandScanner, RunOutcome};
pub use plot::{render_band_history_png, PlotStyle};
pub use source::{SignalBatch, SignalSource, SimulatedSource};
