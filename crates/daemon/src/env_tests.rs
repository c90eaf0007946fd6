// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

const VARS: &[&str] = &[
    "PJ_STATE_DIR",
    "XDG_STATE_HOME",
    "PJ_CONFIG",
    "PJ_IPC_TIMEOUT_MS",
    "PJ_DRAIN_TIMEOUT_MS",
    "PJ_LOG",
];

/// Restores the touched variables when dropped.
struct EnvGuard(Vec<(&'static str, Option<String>)>);

impl EnvGuard {
    fn clean() -> Self {
        let saved = VARS.iter().map(|v| (*v, std::env::var(v).ok())).collect();
        for var in VARS {
            std::env::remove_var(var);
        }
        EnvGuard(saved)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (var, value) in &self.0 {
            match value {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }
    }
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    let _guard = EnvGuard::clean();
    std::env::set_var("PJ_STATE_DIR", "/srv/pj");
    std::env::set_var("XDG_STATE_HOME", "/xdg");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/srv/pj"));
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    let _guard = EnvGuard::clean();
    std::env::set_var("XDG_STATE_HOME", "/xdg");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/xdg/pj"));
}

#[test]
#[serial]
fn state_dir_defaults_under_home() {
    let _guard = EnvGuard::clean();
    let dir = state_dir().unwrap();
    assert!(dir.ends_with(".local/state/pj"), "unexpected state dir {}", dir.display());
}

#[test]
#[serial]
fn config_path_defaults_into_state_dir() {
    let _guard = EnvGuard::clean();
    assert_eq!(config_path(Path::new("/s")), PathBuf::from("/s/pipeline.toml"));

    std::env::set_var("PJ_CONFIG", "/etc/pj/pipeline.toml");
    assert_eq!(config_path(Path::new("/s")), PathBuf::from("/etc/pj/pipeline.toml"));
}

#[test]
#[serial]
fn timeouts_parse_milliseconds() {
    let _guard = EnvGuard::clean();
    assert_eq!(ipc_timeout(), Duration::from_secs(5));
    assert_eq!(drain_timeout(), Duration::from_secs(5));

    std::env::set_var("PJ_IPC_TIMEOUT_MS", "250");
    std::env::set_var("PJ_DRAIN_TIMEOUT_MS", "soon");
    assert_eq!(ipc_timeout(), Duration::from_millis(250));
    assert_eq!(drain_timeout(), Duration::from_secs(5));
}

#[test]
#[serial]
fn log_filter_reads_pj_log() {
    let _guard = EnvGuard::clean();
    assert_eq!(log_filter(), "info");
    std::env::set_var("PJ_LOG", "pj_engine=debug");
    assert_eq!(log_filter(), "pj_engine=debug");
}
