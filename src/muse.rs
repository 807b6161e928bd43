// src/muse.rs
// 启动 muselsl, 把 Muse 头环的 BLE 数据发布到 LSL
use std::ffi::OsString;
use std::process::Command;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use nix::unistd::geteuid;

use crate::config::MuseStreamConfig;

/// Arguments passed to `muselsl`, e.g. `stream --address .. --backend auto --ppg`.
pub fn stream_args(config: &MuseStreamConfig) -> Vec<String> {
    let mut args = vec![
        "stream".to_string(),
        "--address".to_string(),
        config.address.clone(),
        "--backend".to_string(),
        config.backend.clone(),
    ];
    if let Some(interface) = &config.interface {
        args.push("--interface".to_string());
        args.push(interface.clone());
    }
    if let Some(name) = &config.name {
        args.push("--name".to_string());
        args.push(name.clone());
    }
    for (enabled, flag) in [
        (config.ppg, "--ppg"),
        (config.acc, "--acc"),
        (config.gyro, "--gyro"),
        (config.disable_eeg, "--disable-eeg"),
    ] {
        if enabled {
            args.push(flag.to_string());
        }
    }
    args
}

fn needs_sudo(elevate: bool, is_root: bool) -> bool {
    elevate && !is_root
}

/// Builds the process, prefixed with `sudo` when elevation is requested and
/// we are not already root.
pub fn build_command(config: &MuseStreamConfig, is_root: bool) -> Command {
    let args = stream_args(config);
    if needs_sudo(config.elevate, is_root) {
        let mut cmd = Command::new("sudo");
        cmd.arg(&config.program).args(&args);
        cmd
    } else {
        let mut cmd = Command::new(&config.program);
        cmd.args(&args);
        cmd
    }
}

/// Runs `muselsl stream` in the foreground until it exits.
pub fn launch(config: &MuseStreamConfig) -> Result<()> {
    let is_root = geteuid().is_root();
    if config.elevate && !is_root {
        warn!("not running as root, elevating with sudo");
    }
    let mut cmd = build_command(config, is_root);
    let rendered: Vec<OsString> = std::iter::once(cmd.get_program().to_os_string())
        .chain(cmd.get_args().map(|a| a.to_os_string()))
        .collect();
    info!("starting {:?}", rendered);
    let status = cmd
        .status()
        .with_context(|| format!("failed to start {} (is muselsl installed?)", config.program))?;
    if !status.success() {
        bail!("{} exited with {status}", config.program);
    }
    info!("muselsl stream finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_args_match_hardcoded_device() {
        let args = stream_args(&MuseStreamConfig::default());
        assert_eq!(args, vec!["stream", "--address", "00:55:DA:B3:BE:F7", "--backend", "auto"]);
    }

    #[test]
    fn optional_flags_are_appended() {
        let config = MuseStreamConfig {
            interface: Some("hci1".into()),
            name: Some("Muse-BEF7".into()),
            ppg: true,
            gyro: true,
            disable_eeg: true,
            ..MuseStreamConfig::default()
        };
        let args = stream_args(&config);
        assert_eq!(
            &args[5..],
            &["--interface", "hci1", "--name", "Muse-BEF7", "--ppg", "--gyro", "--disable-eeg"]
        );
        assert!(!args.contains(&"--acc".to_string()));
    }

    #[test]
    fn sudo_only_when_elevating_as_user() {
        let config = MuseStreamConfig::default();
        assert_eq!(build_command(&config, false).get_program(), "sudo");
        assert_eq!(build_command(&config, true).get_program(), "muselsl");
        let config = MuseStreamConfig { elevate: false, ..MuseStreamConfig::default() };
        assert_eq!(build_command(&config, false).get_program(), "muselsl");
    }

    #[test]
    fn missing_program_is_reported() {
        let config = MuseStreamConfig {
            program: "/nonexistent/muselsl".into(),
            elevate: false,
            ..MuseStreamConfig::default()
        };
        assert!(launch(&config).is_err());
    }
}
