// src/gui.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::types::*;

// 每条曲线最多保留的点数
const MAX_POINTS: usize = 2000;
// 采集线程自行结束(出错/数据源耗尽)后窗口保留的时间, 方便看到日志
const LINGER_AFTER_CLOSE: Duration = Duration::from_secs(3);

const BAND_COLORS: [Color32; Band::COUNT] = [
    Color32::from_rgb(80, 120, 255),  // Delta
    Color32::from_rgb(255, 90, 90),   // Theta
    Color32::from_rgb(90, 220, 120),  // Alpha
    Color32::from_rgb(0, 220, 220),   // Beta
    Color32::from_rgb(230, 90, 230),  // Gamma
];

pub struct BandScanApp {
    rx: Receiver<ScanMessage>,
    stop: Arc<AtomicBool>,
    verbose: bool,

    // 数据流
    series: Vec<Vec<[f64; 2]>>, // band -> (epoch, power)
    latest: Option<EpochReport>,
    connected: Option<(f32, usize)>,
    closed_at: Option<Instant>,

    log_messages: Vec<String>,
}

impl BandScanApp {
    pub fn new(rx: Receiver<ScanMessage>, stop: Arc<AtomicBool>, verbose: bool) -> Self {
        Self {
            rx,
            stop,
            verbose,
            series: vec![Vec::new(); Band::COUNT],
            latest: None,
            connected: None,
            closed_at: None,
            log_messages: vec!["Press Stop or close the window to quit.".to_owned()],
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 { self.log_messages.remove(0); }
    }

    fn ingest(&mut self, msg: ScanMessage) {
        match msg {
            ScanMessage::Log(s) => self.log(&s),
            ScanMessage::Connected { sample_rate_hz, channels } => {
                self.connected = Some((sample_rate_hz, channels));
                self.log(&format!("Start acquiring data ({sample_rate_hz} Hz)"));
            }
            ScanMessage::Epoch(report) => {
                let x = report.index as f64;
                for band in Band::ALL {
                    let points = &mut self.series[band as usize];
                    points.push([x, report.powers[band]]);
                    if points.len() > MAX_POINTS { points.remove(0); }
                }
                self.latest = Some(report);
            }
            ScanMessage::Closed => {
                self.closed_at = Some(Instant::now());
                self.log("Closing!");
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// The window goes away once the worker has finished: right away when a
    /// stop was requested (Ctrl-C, STOP button), after a short linger otherwise
    /// so an error stays readable.
    fn should_close(&self, now: Instant) -> bool {
        match self.closed_at {
            None => false,
            Some(at) => self.stop.load(Ordering::SeqCst) || now.duration_since(at) >= LINGER_AFTER_CLOSE,
        }
    }
}

impl eframe::App for BandScanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(msg) = self.rx.try_recv() {
            self.ingest(msg);
        }
        if self.should_close(Instant::now()) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        } else if self.is_closed() {
            ctx.request_repaint_after(Duration::from_millis(200));
        } else {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        egui::SidePanel::left("status").min_width(240.0).show(ctx, |ui| {
            ui.heading("bandscan");
            ui.separator();
            match self.connected {
                Some((rate, channels)) => ui.label(format!("{rate} Hz, {channels} channel(s)")),
                None => ui.label("Looking for an EEG stream..."),
            };

            if let Some(report) = &self.latest {
                ui.add_space(10.0);
                ui.label(format!("Epoch {}", report.index));
                egui::Grid::new("powers").striped(true).show(ui, |ui| {
                    ui.label("");
                    ui.label("now");
                    ui.label("smoothed");
                    ui.end_row();
                    for band in Band::ALL {
                        ui.colored_label(BAND_COLORS[band as usize], band.label());
                        ui.monospace(format!("{:.3}", report.powers[band]));
                        ui.monospace(format!("{:.3}", report.smoothed[band]));
                        ui.end_row();
                    }
                });
                if self.verbose {
                    ui.add_space(10.0);
                    ui.label("NEUROFEEDBACK");
                    let m = report.metrics;
                    ui.monospace(format!("Alpha Relaxation   {:.3}", m.alpha_relaxation));
                    ui.monospace(format!("Beta Concentration {:.3}", m.beta_concentration));
                    ui.monospace(format!("Gamma Perception   {:.3}", m.gamma_perception));
                    ui.monospace(format!("Theta Relaxation   {:.3}", m.theta_relaxation));
                }
            }

            ui.add_space(20.0);
            if ui.add_enabled(!self.is_closed(), egui::Button::new("⏹ STOP")).clicked() {
                self.stop.store(true, Ordering::SeqCst);
            }
            if ui.button("🔄 RESET VIEW").clicked() {
                for points in &mut self.series { points.clear(); }
            }

            ui.add_space(10.0);
            egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
                for m in &self.log_messages { ui.monospace(m); }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Brain Waves");
            Plot::new("band_plot")
                .legend(Legend::default())
                .x_axis_label("epoch")
                .y_axis_label("log10 power")
                .show(ui, |plot_ui| {
                    for band in Band::ALL {
                        let points = &self.series[band as usize];
                        if !points.is_empty() {
                            plot_ui.line(
                                Line::new(PlotPoints::new(points.clone()))
                                    .name(band.label())
                                    .color(BAND_COLORS[band as usize]),
                            );
                        }
                    }
                });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn report(index: u64) -> EpochReport {
        EpochReport {
            index,
            powers: BandPowers([index as f64; 5]),
            smoothed: BandPowers::default(),
            metrics: NeurofeedbackMetrics::default(),
        }
    }

    #[test]
    fn epochs_become_one_point_per_band() {
        let (_tx, rx) = channel();
        let mut app = BandScanApp::new(rx, Arc::new(AtomicBool::new(false)), false);
        app.ingest(ScanMessage::Epoch(report(0)));
        app.ingest(ScanMessage::Epoch(report(1)));
        for band in Band::ALL {
            assert_eq!(app.series[band as usize], vec![[0.0, 0.0], [1.0, 1.0]]);
        }
        assert_eq!(app.latest.map(|r| r.index), Some(1));
    }

    #[test]
    fn closed_message_marks_app_closed() {
        let (_tx, rx) = channel();
        let mut app = BandScanApp::new(rx, Arc::new(AtomicBool::new(false)), false);
        app.ingest(ScanMessage::Closed);
        assert!(app.is_closed());
        assert!(app.log_messages.last().unwrap().contains("Closing!"));
    }

    #[test]
    fn interrupt_closes_window_once_worker_is_done() {
        let (_tx, rx) = channel();
        let stop = Arc::new(AtomicBool::new(false));
        let mut app = BandScanApp::new(rx, stop.clone(), false);
        assert!(!app.should_close(Instant::now()));
        // Ctrl-C handler raises the flag, the worker answers with Closed
        stop.store(true, Ordering::SeqCst);
        assert!(!app.should_close(Instant::now()));
        app.ingest(ScanMessage::Closed);
        assert!(app.should_close(Instant::now()));
    }

    #[test]
    fn failed_worker_closes_window_after_linger() {
        let (_tx, rx) = channel();
        let mut app = BandScanApp::new(rx, Arc::new(AtomicBool::new(false)), false);
        app.ingest(ScanMessage::Log("❌ Can't find EEG stream.".to_owned()));
        app.ingest(ScanMessage::Closed);
        let closed_at = app.closed_at.unwrap();
        assert!(!app.should_close(closed_at));
        assert!(app.should_close(closed_at + LINGER_AFTER_CLOSE));
    }

    #[test]
    fn series_length_is_capped() {
        let (_tx, rx) = channel();
        let mut app = BandScanApp::new(rx, Arc::new(AtomicBool::new(false)), false);
        for i in 0..(MAX_POINTS as u64 + 10) {
            app.ingest(ScanMessage::Epoch(report(i)));
        }
        assert_eq!(app.series[0].len(), MAX_POINTS);
        assert_eq!(app.series[0][0][0], 10.0);
    }
}
