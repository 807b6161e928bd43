use std::sync::atomic::{AtomicBool, Ordering};
use log::{debug, info, warn};
use crate::config::Parameters;
use crate::drivers::error::ScanError;
use crate::drivers::fft::BandPowerEstimator;
use crate::drivers::filter::FilterKind;
use crate::drivers::history::BandHistory;
use crate::drivers::lsl::{self, LslInlet};
use crate::drivers::source::SignalSource;
use crate::drivers::SignalBuffer;
use crate::metrics;
use crate::types::{BandPowers, EpochReport};
/// Why `run` returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Interrupted,
    SourceExhausted,
}
/// Buffers a stream, epochs it and turns every epoch into band powers.
pub struct BandScanner<S: SignalSource> {
    source: S,
    params: Parameters,
    sample_rate_hz: f32,
    buffer: SignalBuffer,
    history: BandHistory,
    estimator: BandPowerEstimator,
    epoch_index: u64,
}
impl BandScanner<LslInlet> {
    /// Looks for an LSL stream of type `EEG` and connects to the first one.
    pub fn connect(params: Parameters) -> Result<Self, ScanError> {
        info!("Looking for an EEG stream...");
        let streams = lsl::resolve_eeg(params.resolve_timeout())?;
        let inlet = match streams.into_iter().next() {
            Some(stream) => Some(stream.open_inlet(params.max_chunk_len)?),
            None => None,
        };
        Self::from_discovered(params, inlet)
    }
}
impl<S: SignalSource> BandScanner<S> {
    /// Builds a scanner from the outcome of stream discovery.
    pub fn from_discovered(
        params: Parameters,
        discovered: impl IntoIterator<Item = S>,
    ) -> Result<Self, ScanError> {
        let source = discovered
            .into_iter()
            .next()
            .ok_or(ScanError::StreamNotFound)?;
        Self::from_source(source, params)
    }
    pub fn from_source(source: S, params: Parameters) -> Result<Self, ScanError> {
        params.validate()?;
        let sample_rate_hz = source.sample_rate_hz();
        if sample_rate_hz <= 0.0 {
            return Err(ScanError::InvalidSampleRate);
        }
        let available = source.channel_count();
        if let Some(&index) = params.index_channel.iter().find(|&&i| i >= available) {
            return Err(ScanError::ChannelOutOfRange { index, available });
        }
        if params.shift_samples(sample_rate_hz) == 0 || params.epoch_samples(sample_rate_hz) == 0 {
            return Err(ScanError::InvalidWindow(format!(
                "epoch/shift shorter than one sample at {sample_rate_hz} Hz"
            )));
        }
        let mut buffer = SignalBuffer::with_history_seconds(
            params.index_channel.len(),
            sample_rate_hz,
            params.buffer_length as f32,
        )?;
        if params.notch_enabled {
            buffer = buffer.with_filters(&[FilterKind::mains(params.notch_hz)]);
        }
        let history = BandHistory::new(params.n_epochs())?;
        info!(
            "Start acquiring data: {} Hz, channels {:?}, {} epochs of {} s",
            sample_rate_hz,
            params.index_channel,
            history.epochs(),
            params.epoch_length
        );
        Ok(Self {
            source,
            params,
            sample_rate_hz,
            buffer,
            history,
            estimator: BandPowerEstimator::new(),
            epoch_index: 0,
        })
    }
    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }
    pub fn params(&self) -> &Parameters {
        &self.params
    }
    pub fn history(&self) -> &BandHistory {
        &self.history
    }
    /// Mean band powers over every epoch in the history.
    pub fn smooth_band_powers(&self) -> BandPowers {
        self.history.smoothed()
    }
    /// Pulls one chunk and computes one epoch. `None` once the source is exhausted.
    pub fn step(&mut self) -> Result<Option<EpochReport>, ScanError> {
        let max_samples = self.params.shift_samples(self.sample_rate_hz);
        let Some(chunk) = self
            .source
            .pull_chunk(max_samples, self.params.pull_timeout())?
        else {
            return Ok(None);
        };
        match chunk.time_span() {
            _ if chunk.is_empty() => debug!("no samples before timeout"),
            Some((first, last)) => debug!(
                "chunk of {} samples, stream time {first:.3}..{last:.3} s",
                chunk.samples_per_channel()
            ),
            None => debug!("chunk of {} unstamped samples", chunk.samples_per_channel()),
        }
        let selected = chunk.select_channels(&self.params.index_channel)?;
        self.buffer.push_batch(&selected)?;
        let epoch = self
            .buffer
            .last(self.params.epoch_samples(self.sample_rate_hz));
        let powers = self.estimator.compute(&epoch)?;
        self.history.push(&powers);
        let smoothed = self.smooth_band_powers();
        let report = EpochReport {
            index: self.epoch_index,
            powers,
            smoothed,
            metrics: metrics::neurofeedback(&smoothed),
        };
        self.epoch_index += 1;
        Ok(Some(report))
    }
    /// Prints the band powers of one epoch, plus the neurofeedback metrics when verbose.
    pub fn output(&self, report: &EpochReport, verbose: bool) {
        println!("{}", report.powers);
        if verbose {
            println!("{}", report.metrics);
        }
    }
    /// Acquisition loop. Stops when `stop` is raised (Ctrl-C or window close)
    /// or when the source runs dry.
    pub fn run<F>(&mut self, stop: &AtomicBool, verbose: bool, mut on_epoch: F) -> Result<RunOutcome, ScanError>
    where
        F: FnMut(&EpochReport),
    {
        while !stop.load(Ordering::SeqCst) {
            let Some(report) = self.step()? else {
                warn!("stream ended");
                return Ok(RunOutcome::SourceExhausted);
            };
            self.output(&report, verbose);
            on_epoch(&report);
        }
        Ok(RunOutcome::Interrupted)
    }
}
#[cfg(test)]
impl<S: SignalSource> BandScanner<S> {
    pub fn buffer(&self) -> &SignalBuffer {
        &self.buffer
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::{ManualSource, Rhythm, SignalBatch, SimulatedSource};
    use crate::types::Band;
    fn quiet_params() -> Parameters {
        Parameters {
            notch_enabled: false,
            ..Parameters::default()
        }
    }
    fn alpha_source() -> SimulatedSource {
        SimulatedSource::new(
            256.0,
            4,
            vec![Rhythm { freq_hz: 10.0, amp_uv: 30.0 }],
            0.5,
            1,
        )
    }
    #[test]
    fn construction_fails_without_stream() {
        let result = BandScanner::from_discovered(quiet_params(), Vec::<ManualSource>::new());
        assert!(matches!(result, Err(ScanError::StreamNotFound)));
        let err = result.err().unwrap();
        assert_eq!(err.to_string(), "Can't find EEG stream.");
    }
    #[test]
    fn buffers_are_sized_from_parameters() {
        let scanner = BandScanner::from_source(alpha_source(), quiet_params()).unwrap();
        assert_eq!(scanner.buffer().len(), 256 * 5);
        assert_eq!(scanner.buffer().num_channels(), 1);
        assert_eq!(scanner.history().epochs(), 21);
    }
    #[test]
    fn step_keeps_lengths_and_finds_alpha() {
        let mut scanner = BandScanner::from_source(alpha_source(), quiet_params()).unwrap();
        let mut last = None;
        for _ in 0..30 {
            last = scanner.step().unwrap();
            assert_eq!(scanner.buffer().len(), 256 * 5);
            assert_eq!(scanner.history().epochs(), 21);
        }
        let report = last.unwrap();
        assert_eq!(report.index, 29);
        let dominant = Band::ALL
            .into_iter()
            .max_by(|a, b| report.powers[*a].total_cmp(&report.powers[*b]))
            .unwrap();
        assert_eq!(dominant, Band::Alpha);
        assert_eq!(scanner.smooth_band_powers().as_slice().len(), 5);
        assert!(report.metrics.alpha_relaxation.is_finite());
    }
    #[test]
    fn out_of_range_channel_is_rejected() {
        let params = Parameters {
            index_channel: vec![4],
            ..quiet_params()
        };
        let result = BandScanner::from_source(alpha_source(), params);
        assert!(matches!(
            result,
            Err(ScanError::ChannelOutOfRange { index: 4, available: 4 })
        ));
    }
    #[test]
    fn run_stops_when_source_is_exhausted() {
        let batches = (0..3).map(|_| SignalBatch {
            sample_rate_hz: 256.0,
            timestamps: vec![],
            samples: vec![(0..51).map(|i| (i as f32 * 0.7).sin()).collect()],
        });
        let source = ManualSource::new(256.0, 1, batches);
        let mut scanner = BandScanner::from_source(source, Parameters::default()).unwrap();
        let stop = AtomicBool::new(false);
        let mut seen = Vec::new();
        let outcome = scanner
            .run(&stop, true, |report| seen.push(report.index))
            .unwrap();
        assert_eq!(outcome, RunOutcome::SourceExhausted);
        assert_eq!(seen, vec![0, 1, 2]);
    }
    #[test]
    fn run_honours_stop_flag() {
        let mut scanner = BandScanner::from_source(alpha_source(), quiet_params()).unwrap();
        let stop = AtomicBool::new(false);
        let mut calls = 0;
        let outcome = scanner
            .run(&stop, false, |_| {
                calls += 1;
                if calls == 5 {
                    stop.store(true, Ordering::SeqCst);
                }
            })
            .unwrap();
        assert_eq!(outcome, RunOutcome::Interrupted);
        assert_eq!(calls, 5);
    }
}
