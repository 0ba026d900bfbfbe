use std::path::{Path, PathBuf};

/// Default data directory (~/.sql-chat)
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".sql-chat")
}

/// Session snapshot file inside a data directory
pub fn session_snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session.json")
}
