use std::future::Future;
use std::path::{Path, PathBuf};

use chat_core::paths::session_snapshot_path;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{SessionSnapshot, StoreError};

/// Session snapshot stored as one JSON file in the data directory.
///
/// Writes are serialized through `write_lock`; the last snapshot taken is the
/// last one written.
pub struct FileSessionStorage {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStorage {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        session_snapshot_path(&self.base_dir)
    }

    /// Load and rehydrate the snapshot. A missing file is an empty session.
    pub async fn load(&self) -> Result<Option<SessionSnapshot>, StoreError> {
        let path = self.path();

        if !fs::try_exists(&path).await? {
            tracing::debug!(
                path = %path.display(),
                "FileSessionStorage: No snapshot file"
            );
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let snapshot: SessionSnapshot = serde_json::from_str(&content)?;

        tracing::info!(
            path = %path.display(),
            connection_count = snapshot.connections.len(),
            conversation_count = snapshot.conversations.len(),
            message_count = snapshot.messages.len(),
            "FileSessionStorage: Snapshot loaded"
        );

        Ok(Some(snapshot.rehydrate()))
    }

    pub async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write(snapshot).await
    }

    /// Take a snapshot with `take` and write it, both under the write lock.
    /// Concurrent callers cannot land an older snapshot after a newer one.
    pub async fn save_with<F, Fut>(&self, take: F) -> Result<(), StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SessionSnapshot>,
    {
        let _guard = self.write_lock.lock().await;
        let snapshot = take().await;
        self.write(&snapshot).await
    }

    /// Write the snapshot next to its final path and rename it into place, so
    /// a crash mid-write leaves the previous snapshot intact.
    async fn write(&self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let path = self.path();

        if !fs::try_exists(&self.base_dir).await? {
            tracing::debug!(
                path = %self.base_dir.display(),
                "FileSessionStorage: Creating base directory"
            );
            fs::create_dir_all(&self.base_dir).await?;
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, &content).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!(
            path = %path.display(),
            json_size = content.len(),
            "FileSessionStorage: Snapshot saved"
        );

        Ok(())
    }
}
