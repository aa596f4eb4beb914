//! Per-user locations for stored policy and logs.

use std::path::PathBuf;

/// `%APPDATA%\DriverScope` on Windows, `~/.driverscope` elsewhere
pub fn app_dir() -> PathBuf {
    if cfg!(windows) {
        let appdata = std::env::var_os("APPDATA")
            .unwrap_or_else(|| std::env::var_os("USERPROFILE").unwrap_or_default());
        PathBuf::from(appdata).join("DriverScope")
    } else {
        let home = std::env::var_os("HOME").unwrap_or_default();
        PathBuf::from(home).join(".driverscope")
    }
}

pub fn policy_path() -> PathBuf {
    app_dir().join("policy.json")
}

pub fn log_dir() -> PathBuf {
    app_dir().join("logs")
}
