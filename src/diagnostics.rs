//! Diagnostics helpers.
//!
//! - **About info**: version, build timestamp, git SHA, platform
//! - **Data and log locations**: used by `lib.rs` for the settings database
//!   and the rolling log files
//! - **Log rotation**: keeps the newest `MAX_LOG_FILES` files

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Maximum number of log files to retain.
pub const MAX_LOG_FILES: usize = 10;

/// Overrides the data directory (settings database and logs).
pub const ENV_DATA_DIR: &str = "CAFE_POS_DATA_DIR";

const APP_DIR_NAME: &str = "com.cafe.pos";
const LOG_FILE_PREFIX: &str = "pos";

/// Returns version, build timestamp, git SHA, and platform info.
pub fn get_about_info() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "buildTimestamp": env!("BUILD_TIMESTAMP"),
        "gitSha": env!("BUILD_GIT_SHA"),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "rustVersion": env!("CARGO_PKG_RUST_VERSION"),
    })
}

/// Root directory for local state.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join(APP_DIR_NAME)
}

pub fn get_log_dir() -> PathBuf {
    get_data_dir().join("logs")
}

/// Prune old log files in the default log directory.
pub fn prune_old_logs() {
    prune_logs_in(&get_log_dir(), MAX_LOG_FILES);
}

/// Keep the `keep` most recently modified `pos.*` files in `log_dir`.
/// Returns how many files were removed.
pub fn prune_logs_in(log_dir: &Path, keep: usize) -> usize {
    if !log_dir.exists() {
        return 0;
    }

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    if let Ok(entries) = fs::read_dir(log_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(&format!("{LOG_FILE_PREFIX}.")));
            if is_log {
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(std::time::UNIX_EPOCH);
                log_files.push((path, modified));
            }
        }
    }

    // Newest first; ties broken by name so daily files stay in date order.
    log_files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(keep) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to prune log file {}: {e}", path.display()),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cafe-pos-logs-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn about_info_has_required_fields() {
        let info = get_about_info();
        assert!(info.get("version").is_some());
        assert!(info.get("buildTimestamp").is_some());
        assert!(info.get("gitSha").is_some());
        assert!(info.get("platform").is_some());
    }

    #[test]
    fn build_timestamp_is_utc_iso8601() {
        let info = get_about_info();
        let stamp = info["buildTimestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "{stamp}");
        assert!(!info["gitSha"].as_str().unwrap().is_empty());
    }

    #[test]
    fn log_dir_sits_under_data_dir() {
        assert_eq!(get_log_dir(), get_data_dir().join("logs"));
    }

    #[test]
    fn prune_keeps_newest_pos_files_only() {
        let dir = scratch_dir();
        for day in 1..=5 {
            fs::write(dir.join(format!("pos.2025-06-0{day}")), b"x").unwrap();
        }
        fs::write(dir.join("notes.txt"), b"keep me").unwrap();

        let removed = prune_logs_in(&dir, 3);

        assert_eq!(removed, 2);
        let mut remaining: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 4);
        assert!(remaining.contains(&"notes.txt".to_string()));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn prune_missing_dir_is_noop() {
        let dir = std::env::temp_dir().join(format!("cafe-pos-missing-{}", uuid::Uuid::new_v4()));
        assert_eq!(prune_logs_in(&dir, MAX_LOG_FILES), 0);
    }
}
