//! Produced artifacts: written under the public uploads directory, recorded
//! with an absolute expiry time and removed by a periodic sweep.
//!
//! The expiry record lives in SQLite, so a restart never forgets a pending
//! deletion. Downloads consult the record too: an expired artifact is gone as
//! far as clients are concerned even if the sweeper has not reached it yet.

use crate::models::artifact::Artifact;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    collections::HashSet,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::{fs, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact `{0}` not found")]
    NotFound(String),
    #[error("invalid artifact name")]
    InvalidName,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

#[derive(Clone)]
pub struct ArtifactStore {
    db: Arc<SqlitePool>,
    dir: PathBuf,
    ttl: Duration,
}

/// Outcome of one sweep.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
}

impl ArtifactStore {
    pub fn new(db: Arc<SqlitePool>, dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            db,
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    /// Write `bytes` as a new artifact for `operation` and record its expiry.
    pub async fn persist(
        &self,
        prefix: &str,
        extension: &str,
        operation: &str,
        bytes: &[u8],
    ) -> ArtifactResult<Artifact> {
        self.persist_at(prefix, extension, operation, bytes, now_ms())
            .await
    }

    pub async fn persist_at(
        &self,
        prefix: &str,
        extension: &str,
        operation: &str,
        bytes: &[u8],
        now_ms: i64,
    ) -> ArtifactResult<Artifact> {
        fs::create_dir_all(&self.dir).await?;

        let suffix = Uuid::new_v4().simple().to_string();
        let filename = format!("{}-{}-{}.{}", prefix, now_ms, &suffix[..8], extension);
        let path = self.dir.join(&filename);
        fs::write(&path, bytes).await?;

        let artifact = Artifact {
            filename,
            operation: operation.to_string(),
            size_bytes: bytes.len() as i64,
            created_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(self.ttl_ms()),
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO artifacts (filename, operation, size_bytes, created_at_ms, expires_at_ms)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artifact.filename)
        .bind(&artifact.operation)
        .bind(artifact.size_bytes)
        .bind(artifact.created_at_ms)
        .bind(artifact.expires_at_ms)
        .execute(&*self.db)
        .await;

        if let Err(err) = inserted {
            // Without a record nothing would ever delete the file.
            let _ = fs::remove_file(&path).await;
            return Err(err.into());
        }

        debug!(
            "stored artifact {} ({} bytes, expires at {})",
            artifact.filename, artifact.size_bytes, artifact.expires_at_ms
        );
        Ok(artifact)
    }

    /// Resolve a download request. Unknown, expired and malformed names all
    /// come back as errors; the caller maps them to 404.
    pub async fn open(&self, filename: &str) -> ArtifactResult<(Artifact, PathBuf)> {
        self.open_at(filename, now_ms()).await
    }

    pub async fn open_at(
        &self,
        filename: &str,
        now_ms: i64,
    ) -> ArtifactResult<(Artifact, PathBuf)> {
        ensure_name_safe(filename)?;

        let artifact = sqlx::query_as::<_, Artifact>(
            r#"
            SELECT filename, operation, size_bytes, created_at_ms, expires_at_ms
            FROM artifacts
            WHERE filename = ?
            "#,
        )
        .bind(filename)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| ArtifactError::NotFound(filename.to_string()))?;

        if artifact.is_expired_at(now_ms) {
            return Err(ArtifactError::NotFound(filename.to_string()));
        }

        let path = self.dir.join(&artifact.filename);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok((artifact, path)),
            Ok(_) => Err(ArtifactError::NotFound(filename.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(filename.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Delete every artifact due at `now_ms`: the file first, then its row.
    /// A file that cannot be removed keeps its row so the next sweep retries.
    pub async fn sweep_at(&self, now_ms: i64) -> ArtifactResult<SweepReport> {
        let due: Vec<String> =
            sqlx::query_scalar("SELECT filename FROM artifacts WHERE expires_at_ms <= ?")
                .bind(now_ms)
                .fetch_all(&*self.db)
                .await?;

        let mut report = SweepReport::default();
        for filename in due {
            let path = self.dir.join(&filename);
            match fs::remove_file(&path).await {
                Ok(_) => debug!("deleted expired artifact {}", filename),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("expired artifact {} was already gone", filename)
                }
                Err(err) => {
                    warn!("failed to delete artifact {}: {}", filename, err);
                    report.failed += 1;
                    continue;
                }
            }
            sqlx::query("DELETE FROM artifacts WHERE filename = ?")
                .bind(&filename)
                .execute(&*self.db)
                .await?;
            report.removed += 1;
        }
        Ok(report)
    }

    pub async fn sweep(&self) -> ArtifactResult<SweepReport> {
        self.sweep_at(now_ms()).await
    }

    /// Give files in the uploads directory that have no record (left behind
    /// by an older process) a fresh expiry so the sweeper picks them up.
    pub async fn adopt_orphans_at(&self, now_ms: i64) -> ArtifactResult<usize> {
        fs::create_dir_all(&self.dir).await?;

        let known: HashSet<String> = sqlx::query_scalar("SELECT filename FROM artifacts")
            .fetch_all(&*self.db)
            .await?
            .into_iter()
            .collect();

        let mut adopted = 0;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if known.contains(&filename) || ensure_name_safe(&filename).is_err() {
                continue;
            }

            sqlx::query(
                r#"
                INSERT OR IGNORE INTO artifacts
                    (filename, operation, size_bytes, created_at_ms, expires_at_ms)
                VALUES (?, 'unknown', ?, ?, ?)
                "#,
            )
            .bind(&filename)
            .bind(meta.len() as i64)
            .bind(now_ms)
            .bind(now_ms.saturating_add(self.ttl_ms()))
            .execute(&*self.db)
            .await?;
            debug!("adopted orphan artifact {}", filename);
            adopted += 1;
        }
        Ok(adopted)
    }

    /// Boot-time recovery: adopt orphans, then clear whatever is already due.
    pub async fn recover(&self) -> ArtifactResult<()> {
        let now = now_ms();
        let adopted = self.adopt_orphans_at(now).await?;
        if adopted > 0 {
            info!("Adopted {} untracked artifact(s)", adopted);
        }
        let report = self.sweep_at(now).await?;
        if report.removed > 0 {
            info!("Removed {} expired artifact(s) at boot", report.removed);
        }
        Ok(())
    }

    /// Run the sweep every `interval` until the task is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match store.sweep().await {
                    Ok(report) if report.removed > 0 || report.failed > 0 => info!(
                        "Artifact sweep removed {} file(s), {} failed",
                        report.removed, report.failed
                    ),
                    Ok(_) => {}
                    Err(err) => warn!("artifact sweep failed: {}", err),
                }
            }
        })
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Artifact names are single path components made of a small character set.
fn ensure_name_safe(name: &str) -> ArtifactResult<()> {
    if name.is_empty() || name.len() > MAX_FILENAME_LEN {
        return Err(ArtifactError::InvalidName);
    }
    if name.starts_with('.') || name.contains("..") {
        return Err(ArtifactError::InvalidName);
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(ArtifactError::InvalidName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    const MINUTE_MS: i64 = 60_000;

    async fn store(dir: &Path) -> ArtifactStore {
        let pool = db::connect("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        ArtifactStore::new(Arc::new(pool), dir, Duration::from_secs(600))
    }

    #[tokio::test]
    async fn retrievable_before_expiry_and_gone_after() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        let t = 1_700_000_000_000;

        let artifact = store
            .persist_at("merged", "pdf", "merge", b"%PDF", t)
            .await
            .unwrap();
        assert_eq!(artifact.expires_at_ms, t + 10 * MINUTE_MS);
        assert!(artifact.filename.starts_with(&format!("merged-{}-", t)));
        assert!(artifact.filename.ends_with(".pdf"));
        assert_eq!(artifact.download_url(), format!("/uploads/{}", artifact.filename));

        let (found, path) = store
            .open_at(&artifact.filename, t + 9 * MINUTE_MS)
            .await
            .unwrap();
        assert_eq!(found, artifact);
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF");

        let late = store.open_at(&artifact.filename, t + 11 * MINUTE_MS).await;
        assert!(matches!(late, Err(ArtifactError::NotFound(_))));
    }

    #[tokio::test]
    async fn sweep_deletes_only_due_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        let t = 1_700_000_000_000;

        let old = store.persist_at("split", "pdf", "split", b"a", t).await.unwrap();
        let fresh = store
            .persist_at("split", "pdf", "split", b"b", t + 5 * MINUTE_MS)
            .await
            .unwrap();

        let report = store.sweep_at(t + 11 * MINUTE_MS).await.unwrap();
        assert_eq!(report, SweepReport { removed: 1, failed: 0 });
        assert!(!dir.path().join(&old.filename).exists());
        assert!(dir.path().join(&fresh.filename).exists());

        let again = store.sweep_at(t + 11 * MINUTE_MS).await.unwrap();
        assert_eq!(again.removed, 0);
    }

    #[tokio::test]
    async fn identical_calls_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        let a = store.persist_at("merged", "pdf", "merge", b"x", 1).await.unwrap();
        let b = store.persist_at("merged", "pdf", "merge", b"x", 1).await.unwrap();
        assert_ne!(a.filename, b.filename);
    }

    #[tokio::test]
    async fn orphans_are_adopted_and_later_swept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("merged-1-deadbeef.pdf"), b"left over").unwrap();
        let store = store(dir.path()).await;
        let t = 1_700_000_000_000;

        assert_eq!(store.adopt_orphans_at(t).await.unwrap(), 1);
        assert_eq!(store.adopt_orphans_at(t).await.unwrap(), 0);
        assert!(store.open_at("merged-1-deadbeef.pdf", t).await.is_ok());

        let report = store.sweep_at(t + 10 * MINUTE_MS).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(!dir.path().join("merged-1-deadbeef.pdf").exists());
    }

    #[tokio::test]
    async fn rejects_unsafe_and_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        for name in ["../secret", "a/b.pdf", ".hidden", "a\\b", ""] {
            assert!(matches!(
                store.open_at(name, 0).await,
                Err(ArtifactError::InvalidName)
            ));
        }
        assert!(matches!(
            store.open_at("missing.pdf", 0).await,
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn record_without_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path()).await;
        let artifact = store.persist_at("split", "pdf", "split", b"a", 0).await.unwrap();
        std::fs::remove_file(dir.path().join(&artifact.filename)).unwrap();
        assert!(matches!(
            store.open_at(&artifact.filename, 1).await,
            Err(ArtifactError::NotFound(_))
        ));
    }
}
