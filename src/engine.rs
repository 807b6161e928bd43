// src/engine.rs
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::error;

use crate::config::Parameters;
use crate::drivers::lsl::LslInlet;
use crate::drivers::{BandHistory, BandScanner, RunOutcome, ScanError, SignalSource, SimulatedSource};
use crate::types::{EpochReport, ScanMessage};

// 数据来源
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Lsl,
    Simulated { seed: u64 },
}

/// What a finished scan leaves behind.
pub struct ScanSummary {
    pub outcome: RunOutcome,
    pub history: BandHistory,
}

fn drive<S, F>(
    mut scanner: BandScanner<S>,
    verbose: bool,
    stop: &AtomicBool,
    on_connect: impl FnOnce(f32, usize),
    on_epoch: F,
) -> Result<ScanSummary, ScanError>
where
    S: SignalSource,
    F: FnMut(&EpochReport),
{
    on_connect(scanner.sample_rate_hz(), scanner.params().index_channel.len());
    let outcome = scanner.run(stop, verbose, on_epoch)?;
    Ok(ScanSummary {
        outcome,
        history: scanner.history().clone(),
    })
}

/// Connects to the chosen source and runs the acquisition loop on the calling thread.
pub fn run_scan<F>(
    kind: SourceKind,
    params: Parameters,
    verbose: bool,
    stop: &AtomicBool,
    on_connect: impl FnOnce(f32, usize),
    on_epoch: F,
) -> Result<ScanSummary, ScanError>
where
    F: FnMut(&EpochReport),
{
    match kind {
        SourceKind::Lsl => {
            let scanner = BandScanner::<LslInlet>::connect(params)?;
            drive(scanner, verbose, stop, on_connect, on_epoch)
        }
        SourceKind::Simulated { seed } => {
            let source = SimulatedSource::muse_like(seed).paced(true);
            let scanner = BandScanner::from_source(source, params)?;
            drive(scanner, verbose, stop, on_connect, on_epoch)
        }
    }
}

/// Background acquisition for the GUI. The inlet is created on the worker
/// thread itself, results travel back over `tx`.
pub fn spawn_thread(
    tx: Sender<ScanMessage>,
    kind: SourceKind,
    params: Parameters,
    verbose: bool,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Result<ScanSummary, ScanError>> {
    thread::spawn(move || {
        tx.send(ScanMessage::Log("Looking for an EEG stream...".to_owned())).ok();
        let connect_tx = tx.clone();
        let epoch_tx = tx.clone();
        let result = run_scan(
            kind,
            params,
            verbose,
            &stop,
            move |sample_rate_hz, channels| {
                connect_tx.send(ScanMessage::Connected { sample_rate_hz, channels }).ok();
            },
            move |report| {
                epoch_tx.send(ScanMessage::Epoch(*report)).ok();
            },
        );
        if let Err(e) = &result {
            error!("{e}");
            tx.send(ScanMessage::Log(format!("❌ {e}"))).ok();
        }
        tx.send(ScanMessage::Closed).ok();
        result
    })
}
