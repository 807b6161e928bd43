//! Lab Streaming Layer inlet on top of the system `liblsl`.
//!
//! The library is opened at runtime (libloading) so the binary still starts,
//! and the simulated source still works, on machines without liblsl.
use std::env;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_int, c_ulong, c_void};
use std::ptr;
use std::time::Duration;
use libloading::Library;
use log::{debug, info};
use once_cell::sync::OnceCell;
use crate::drivers::{ScanError, SignalBatch, SignalSource};
type StreamInfoPtr = *mut c_void;
type InletPtr = *mut c_void;
/// Seconds of data liblsl buffers on the inlet side.
const INLET_MAX_BUFLEN: c_int = 360;
/// Upper bound on streams returned by one resolve call.
const RESOLVE_MAX_STREAMS: usize = 16;
const LSL_TIMEOUT_ERROR: c_int = -1;
const LSL_LOST_ERROR: c_int = -2;
const LIB_ENV: &str = "BANDSCAN_LIBLSL";
#[cfg(target_os = "windows")]
const LIB_CANDIDATES: &[&str] = &["lsl.dll", "liblsl64.dll"];
#[cfg(target_os = "macos")]
const LIB_CANDIDATES: &[&str] = &["liblsl.dylib", "liblsl.2.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const LIB_CANDIDATES: &[&str] = &["liblsl.so", "liblsl.so.2", "liblsl.so.1.16"];
struct LslApi {
    #[allow(dead_code)]
    lib: Library,
    resolve_byprop:
        unsafe extern "C" fn(*mut StreamInfoPtr, u32, *const c_char, *const c_char, i32, c_double) -> i32,
    destroy_streaminfo: unsafe extern "C" fn(StreamInfoPtr),
    create_inlet: unsafe extern "C" fn(StreamInfoPtr, i32, i32, i32) -> InletPtr,
    destroy_inlet: unsafe extern "C" fn(InletPtr),
    open_stream: unsafe extern "C" fn(InletPtr, c_double, *mut i32),
    time_correction: unsafe extern "C" fn(InletPtr, c_double, *mut i32) -> c_double,
    pull_chunk_f: unsafe extern "C" fn(
        InletPtr,
        *mut f32,
        *mut c_double,
        c_ulong,
        c_ulong,
        c_double,
        *mut i32,
    ) -> c_ulong,
    get_nominal_srate: unsafe extern "C" fn(StreamInfoPtr) -> c_double,
    get_channel_count: unsafe extern "C" fn(StreamInfoPtr) -> i32,
    get_name: unsafe extern "C" fn(StreamInfoPtr) -> *const c_char,
}
impl LslApi {
    fn open_library() -> Result<Library, ScanError> {
        let mut candidates: Vec<String> = Vec::new();
        if let Ok(path) = env::var(LIB_ENV) {
            candidates.push(path);
        }
        candidates.extend(LIB_CANDIDATES.iter().map(|s| s.to_string()));
        for name in &candidates {
            // Safety: liblsl has no load-time initialisers with preconditions.
            if let Ok(lib) = unsafe { Library::new(name) } {
                debug!("loaded {name}");
                return Ok(lib);
            }
        }
        Err(ScanError::Lsl(format!(
            "liblsl not found (tried {}; set {LIB_ENV} to its path)",
            candidates.join(", ")
        )))
    }
    fn load() -> Result<Self, ScanError> {
        let lib = Self::open_library()?;
        let missing = |e: libloading::Error| ScanError::Lsl(e.to_string());
        // Safety: signatures follow lsl_c.h of liblsl 1.14+.
        unsafe {
            Ok(Self {
                resolve_byprop: *lib.get(b"lsl_resolve_byprop\0").map_err(missing)?,
                destroy_streaminfo: *lib.get(b"lsl_destroy_streaminfo\0").map_err(missing)?,
                create_inlet: *lib.get(b"lsl_create_inlet\0").map_err(missing)?,
                destroy_inlet: *lib.get(b"lsl_destroy_inlet\0").map_err(missing)?,
                open_stream: *lib.get(b"lsl_open_stream\0").map_err(missing)?,
                time_correction: *lib.get(b"lsl_time_correction\0").map_err(missing)?,
                pull_chunk_f: *lib.get(b"lsl_pull_chunk_f\0").map_err(missing)?,
                get_nominal_srate: *lib.get(b"lsl_get_nominal_srate\0").map_err(missing)?,
                get_channel_count: *lib.get(b"lsl_get_channel_count\0").map_err(missing)?,
                get_name: *lib.get(b"lsl_get_name\0").map_err(missing)?,
                lib,
            })
        }
    }
    fn instance() -> Result<&'static LslApi, ScanError> {
        static API: OnceCell<LslApi> = OnceCell::new();
        API.get_or_try_init(Self::load)
    }
    fn check(code: i32, ctx: &str) -> Result<(), ScanError> {
        match code {
            0 => Ok(()),
            LSL_LOST_ERROR => Err(ScanError::Lsl(format!("{ctx}: stream lost"))),
            other => Err(ScanError::Lsl(format!("{ctx} failed (lsl code {other})"))),
        }
    }
}
/// A stream found on the network but not yet connected.
pub struct ResolvedStream {
    api: &'static LslApi,
    info: StreamInfoPtr,
}
impl ResolvedStream {
    pub fn name(&self) -> String {
        let raw = unsafe { (self.api.get_name)(self.info) };
        if raw.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
    }
    pub fn nominal_srate(&self) -> f64 {
        unsafe { (self.api.get_nominal_srate)(self.info) }
    }
    pub fn channel_count(&self) -> usize {
        unsafe { (self.api.get_channel_count)(self.info) }.max(0) as usize
    }
    /// Connects an inlet and applies clock offset estimation once.
    pub fn open_inlet(self, max_chunk_len: i32) -> Result<LslInlet, ScanError> {
        let api = self.api;
        let name = self.name();
        let sample_rate_hz = self.nominal_srate() as f32;
        let channel_count = self.channel_count();
        let inlet = unsafe { (api.create_inlet)(self.info, INLET_MAX_BUFLEN, max_chunk_len, 1) };
        if inlet.is_null() {
            return Err(ScanError::Lsl(format!("could not create inlet for {name}")));
        }
        let mut inlet = LslInlet {
            api,
            inlet,
            sample_rate_hz,
            channel_count,
            time_correction: 0.0,
            data: Vec::new(),
            stamps: Vec::new(),
        };
        let mut ec: i32 = 0;
        unsafe { (api.open_stream)(inlet.inlet, 5.0, &mut ec) };
        LslApi::check(ec, "lsl_open_stream")?;
        inlet.time_correction = inlet.query_time_correction()?;
        info!(
            "connected to '{name}': {channel_count} channels @ {sample_rate_hz} Hz, time correction {:.6} s",
            inlet.time_correction
        );
        Ok(inlet)
    }
}
impl Drop for ResolvedStream {
    fn drop(&mut self) {
        unsafe { (self.api.destroy_streaminfo)(self.info) };
    }
}
/// Finds streams whose `prop` equals `value` within `timeout`.
pub fn resolve_byprop(prop: &str, value: &str, timeout: Duration) -> Result<Vec<ResolvedStream>, ScanError> {
    let api = LslApi::instance()?;
    let prop_c = CString::new(prop).map_err(|e| ScanError::Lsl(e.to_string()))?;
    let value_c = CString::new(value).map_err(|e| ScanError::Lsl(e.to_string()))?;
    let mut infos: Vec<StreamInfoPtr> = vec![ptr::null_mut(); RESOLVE_MAX_STREAMS];
    let found = unsafe {
        (api.resolve_byprop)(
            infos.as_mut_ptr(),
            RESOLVE_MAX_STREAMS as u32,
            prop_c.as_ptr(),
            value_c.as_ptr(),
            1,
            timeout.as_secs_f64(),
        )
    };
    if found < 0 {
        return Err(ScanError::Lsl(format!("lsl_resolve_byprop failed (lsl code {found})")));
    }
    Ok(infos
        .into_iter()
        .take(found as usize)
        .filter(|info| !info.is_null())
        .map(|info| ResolvedStream { api, info })
        .collect())
}
/// Resolves streams of type `EEG`.
pub fn resolve_eeg(timeout: Duration) -> Result<Vec<ResolvedStream>, ScanError> {
    resolve_byprop("type", "EEG", timeout)
}
/// Connected LSL inlet delivering float samples.
pub struct LslInlet {
    api: &'static LslApi,
    inlet: InletPtr,
    sample_rate_hz: f32,
    channel_count: usize,
    time_correction: f64,
    data: Vec<f32>,
    stamps: Vec<f64>,
}
impl LslInlet {
    fn query_time_correction(&self) -> Result<f64, ScanError> {
        let mut ec: i32 = 0;
        let offset = unsafe { (self.api.time_correction)(self.inlet, 5.0, &mut ec) };
        LslApi::check(ec, "lsl_time_correction")?;
        Ok(offset)
    }
}
impl SignalSource for LslInlet {
    fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }
    fn channel_count(&self) -> usize {
        self.channel_count
    }
    fn pull_chunk(
        &mut self,
        max_samples: usize,
        timeout: Duration,
    ) -> Result<Option<SignalBatch>, ScanError> {
        let channels = self.channel_count.max(1);
        let max_samples = max_samples.max(1);
        self.data.resize(max_samples * channels, 0.0);
        self.stamps.resize(max_samples, 0.0);
        let mut ec: i32 = 0;
        let written = unsafe {
            (self.api.pull_chunk_f)(
                self.inlet,
                self.data.as_mut_ptr(),
                self.stamps.as_mut_ptr(),
                self.data.len() as c_ulong,
                self.stamps.len() as c_ulong,
                timeout.as_secs_f64(),
                &mut ec,
            )
        } as usize;
        if ec != LSL_TIMEOUT_ERROR {
            LslApi::check(ec, "lsl_pull_chunk_f")?;
        }
        let count = written / channels;
        // liblsl fills row-major (sample x channel); regroup per channel.
        let mut samples = vec![Vec::with_capacity(count); channels];
        for row in self.data[..count * channels].chunks_exact(channels) {
            for (column, &value) in samples.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let timestamps = self.stamps[..count]
            .iter()
            .map(|t| t + self.time_correction)
            .collect();
        Ok(Some(SignalBatch {
            sample_rate_hz: self.sample_rate_hz,
            timestamps,
            samples,
        }))
    }
}
impl Drop for LslInlet {
    fn drop(&mut self) {
        unsafe { (self.api.destroy_inlet)(self.inlet) };
    }
}
