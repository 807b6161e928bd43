// src/main.rs
mod config;
mod drivers;
mod engine;
mod gui;
mod metrics;
mod muse;
mod types;

use std::fs;
use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use eframe::egui;
use log::info;

use crate::config::AppConfig;
use crate::drivers::{render_band_history_png, BandHistory, PlotStyle, RunOutcome};
use crate::engine::SourceKind;

#[derive(Parser, Debug)]
#[command(name = "bandscan", about = "EEG band powers from a Muse headset over LSL")]
struct Cli {
    /// JSON config file; missing fields fall back to defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Stream the headset to LSL through muselsl
    Stream {
        /// Bluetooth address of the headset
        #[arg(long)]
        address: Option<String>,
        /// Do not re-run through sudo
        #[arg(long)]
        no_elevate: bool,
    },
    /// Compute and plot band powers from an LSL EEG stream
    Scan {
        /// Also print neurofeedback metrics
        #[arg(short, long)]
        verbose: bool,
        /// Use a synthetic headset instead of LSL
        #[arg(long)]
        simulate: bool,
        /// Console output only, no plot window
        #[arg(long)]
        headless: bool,
        /// Stream resolve timeout in seconds
        #[arg(long)]
        timeout: Option<f64>,
        /// Write the band history plot to this PNG on exit
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    match cli.command {
        Cmd::Stream { address, no_elevate } => {
            if let Some(address) = address {
                config.muse.address = address;
            }
            if no_elevate {
                config.muse.elevate = false;
            }
            muse::launch(&config.muse)
        }
        Cmd::Scan { verbose, simulate, headless, timeout, snapshot } => {
            if let Some(timeout) = timeout {
                config.parameters.resolve_timeout_secs = timeout;
            }
            let kind = if simulate { SourceKind::Simulated { seed: 42 } } else { SourceKind::Lsl };
            let history = if headless {
                scan_headless(kind, config, verbose)?
            } else {
                scan_with_plot(kind, config, verbose)?
            };
            if let Some(path) = snapshot {
                let png = render_band_history_png(&history, PlotStyle::default())?;
                fs::write(&path, png).with_context(|| format!("failed to write {}", path.display()))?;
                info!("band history written to {}", path.display());
            }
            Ok(())
        }
    }
}

fn scan_headless(kind: SourceKind, config: AppConfig, verbose: bool) -> Result<BandHistory> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;
    println!("Press Ctrl-C in the console to break the while loop.");
    let summary = engine::run_scan(kind, config.parameters, verbose, &stop, |_, _| {}, |_| {})?;
    if summary.outcome == RunOutcome::Interrupted {
        println!("Closing!");
    }
    Ok(summary.history)
}

fn scan_with_plot(kind: SourceKind, config: AppConfig, verbose: bool) -> Result<BandHistory> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;
    let (tx, rx) = channel();
    let worker = engine::spawn_thread(tx, kind, config.parameters, verbose, stop.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 640.0])
            .with_title("Brain Waves"),
        ..Default::default()
    };
    let app_stop = stop.clone();
    let ui_result = eframe::run_native(
        "bandscan",
        options,
        Box::new(move |_cc| Box::new(gui::BandScanApp::new(rx, app_stop, verbose))),
    );
    // window closed: same as Ctrl-C
    stop.store(true, Ordering::SeqCst);
    let result = worker.join().map_err(|_| anyhow!("acquisition thread panicked"))?;
    ui_result.map_err(|e| anyhow!("plot window failed: {e}"))?;
    let summary = result?;
    println!("Closing!");
    Ok(summary.history)
}
