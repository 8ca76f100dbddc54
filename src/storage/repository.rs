use crate::core::ledger::{LedgerEntry, SessionDocument, Status};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Durable, ordered storage of session documents keyed by session id.
///
/// `append` and `update_status` are atomic load-modify-save units: no other
/// same-process writer's change to the same session is lost between the
/// internal load and save. Cross-process writers still rely on the status
/// convention; a compare-and-swap on a version counter would be the upgrade
/// path if that assumption ever breaks.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// The persisted document, or a fresh default (`need_brain`, empty
    /// history) when none exists or the blob is corrupt. Never fails the
    /// caller over unreadable data.
    async fn load(&self, session_id: &str) -> SessionDocument;

    /// Overwrite the persisted representation in full.
    async fn save(&self, doc: &SessionDocument) -> Result<()>;

    /// Push one entry onto the history, optionally setting the status.
    async fn append(
        &self,
        session_id: &str,
        entry: LedgerEntry,
        status: Option<Status>,
    ) -> Result<()>;

    /// Set only the status.
    async fn update_status(&self, session_id: &str, status: Status) -> Result<()>;

    /// Known session ids, sorted.
    async fn list_sessions(&self) -> Result<Vec<String>>;
}

/// One JSON file per session under a sessions directory.
pub struct FileSessionRepository {
    sessions_dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileSessionRepository {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{session_id}.json"))
    }

    async fn read_document(&self, session_id: &str) -> SessionDocument {
        let path = self.session_path(session_id);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(_) => return self.read_legacy_jsonl(session_id).await,
        };

        match serde_json::from_str::<Value>(&raw)
            .ok()
            .and_then(|value| SessionDocument::normalize(session_id, value))
        {
            Some(doc) => doc,
            None => {
                tracing::warn!(
                    session_id,
                    path = %path.display(),
                    "corrupt session document, falling back to fresh default"
                );
                SessionDocument::new(session_id)
            }
        }
    }

    /// Pre-metadata sessions were stored as `<id>.jsonl`, one entry per
    /// line. Unparseable lines are skipped.
    async fn read_legacy_jsonl(&self, session_id: &str) -> SessionDocument {
        let legacy_path = self.sessions_dir.join(format!("{session_id}.jsonl"));
        let Ok(raw) = tokio::fs::read_to_string(&legacy_path).await else {
            return SessionDocument::new(session_id);
        };

        let mut doc = SessionDocument::new(session_id);
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str::<LedgerEntry>(line) {
                doc.history.push(entry);
            }
        }
        doc
    }

    async fn write_document(&self, doc: &SessionDocument) -> std::result::Result<(), StorageError> {
        let session_id = doc.metadata.session_id.as_str();
        if session_id.is_empty() {
            return Err(StorageError::Write {
                session_id: String::new(),
                message: "session document without an id".to_string(),
            });
        }

        let write_err = |message: String| StorageError::Write {
            session_id: session_id.to_string(),
            message,
        };

        tokio::fs::create_dir_all(&self.sessions_dir).await?;

        let path = self.session_path(session_id);
        let tmp_path = self.sessions_dir.join(format!("{session_id}.json.tmp"));
        let serialized = serde_json::to_string_pretty(doc)
            .map_err(|e| write_err(format!("serialize: {e}")))?;

        // Temp file + rename keeps readers from ever seeing a partial write.
        tokio::fs::write(&tmp_path, serialized.as_bytes())
            .await
            .map_err(|e| write_err(format!("write {}: {e}", tmp_path.display())))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| write_err(format!("rename into {}: {e}", path.display())))?;

        Ok(())
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn load(&self, session_id: &str) -> SessionDocument {
        self.read_document(session_id).await
    }

    async fn save(&self, doc: &SessionDocument) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        Ok(self.write_document(doc).await?)
    }

    async fn append(
        &self,
        session_id: &str,
        entry: LedgerEntry,
        status: Option<Status>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document(session_id).await;
        doc.history.push(entry);
        if let Some(status) = status {
            doc.metadata.status = status;
        }
        Ok(self.write_document(&doc).await?)
    }

    async fn update_status(&self, session_id: &str, status: Status) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document(session_id).await;
        doc.metadata.status = status;
        Ok(self.write_document(&doc).await?)
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let mut sessions = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.sessions_dir).await {
            Ok(entries) => entries,
            // No directory yet means no sessions.
            Err(_) => return Ok(sessions),
        };

        while let Some(entry) = entries.next_entry().await.map_err(StorageError::Io)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                sessions.push(stem.to_string());
            }
        }

        sessions.sort();
        Ok(sessions)
    }
}
