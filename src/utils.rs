//! Utility functions

use std::path::PathBuf;

/// Format seconds as `m:ss` (negative and non-finite input count as zero)
pub fn format_time(seconds: f32) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Project directories shared by settings and playlist storage
pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "eqscope", "EqScope")
}

/// Directory for persisted user data (playlist)
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
