//! Append-only audit trail of Act invocations, one JSON-lines file per UTC day.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use codexia_core::{Artifact, ArtifactSummary, canonical_sha256};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::StoreError;

pub const ACT_KIND: &str = "act";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// RFC 3339, UTC.
    pub ts: String,
    pub kind: String,
    /// Canonical sha256 of the full artifact.
    pub sha256: String,
    pub payload: ArtifactSummary,
}

/// Appends are serialised through one lock and written with a single
/// `write_all` on an `O_APPEND` handle, so lines never interleave.
pub struct AuditLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.jsonl", day.format("%Y-%m-%d")))
    }

    pub async fn record_act(&self, artifact: &Artifact) -> Result<AuditRecord, StoreError> {
        self.record_act_at(artifact, Utc::now()).await
    }

    pub async fn record_act_at(
        &self,
        artifact: &Artifact,
        now: DateTime<Utc>,
    ) -> Result<AuditRecord, StoreError> {
        let record = AuditRecord {
            ts: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            kind: ACT_KIND.into(),
            sha256: canonical_sha256(artifact)?,
            payload: artifact.summary(),
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let path = self.path_for(now.date_naive());
        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        info!(path = %path.display(), sha256 = %record.sha256, "audit record appended");
        Ok(record)
    }

    /// Every record of one day, in append order. A missing file is an empty day.
    pub async fn read_day(&self, day: NaiveDate) -> Result<Vec<AuditRecord>, StoreError> {
        let path = self.path_for(day);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use codexia_core::artifact::{AppealLetter, AppliedActions, ArtifactMeta, ArtifactPayload};
    use codexia_core::{ArtifactType, PlanKind};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn artifact(n: usize) -> Artifact {
        Artifact {
            artifact_type: ArtifactType::AppealLetter,
            payload: ArtifactPayload::AppealLetter(AppealLetter {
                markdown: format!("# letter {n}"),
                cites: vec!["A §1".into()],
            }),
            meta: ArtifactMeta {
                input_sha256: "in".into(),
                output_sha256: format!("out{n}"),
                actions: AppliedActions::Appeal(Vec::new()),
                plan_type: PlanKind::Appeal,
            },
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn identical_acts_give_identical_hashes() {
        let tmp = TempDir::new().unwrap();
        let log = AuditLog::new(tmp.path().join("audit"));
        let a = log.record_act_at(&artifact(1), noon()).await.unwrap();
        let b = log.record_act_at(&artifact(1), noon()).await.unwrap();
        assert_eq!(a.sha256, b.sha256);

        let path = log.path_for(noon().date_naive());
        assert!(path.ends_with("2026-03-14.jsonl"));
        let records = log.read_day(noon().date_naive()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sha256, records[1].sha256);
        assert_eq!(records[0].kind, "act");
        assert_eq!(records[0].ts, "2026-03-14T12:00:00Z");
        assert_eq!(records[0].payload.artifact_type, ArtifactType::AppealLetter);
    }

    #[tokio::test]
    async fn days_partition_files() {
        let tmp = TempDir::new().unwrap();
        let log = AuditLog::new(tmp.path());
        let next_day = noon() + chrono::Duration::days(1);
        log.record_act_at(&artifact(1), noon()).await.unwrap();
        log.record_act_at(&artifact(2), next_day).await.unwrap();
        assert_eq!(log.read_day(noon().date_naive()).await.unwrap().len(), 1);
        assert_eq!(log.read_day(next_day.date_naive()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_stay_line_atomic() {
        let tmp = TempDir::new().unwrap();
        let log = Arc::new(AuditLog::new(tmp.path()));
        let mut handles = Vec::new();
        for n in 0..32 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.record_act_at(&artifact(n), noon()).await.unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let records = log.read_day(noon().date_naive()).await.unwrap();
        assert_eq!(records.len(), 32);
    }

    #[tokio::test]
    async fn unwritable_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let log = AuditLog::new(blocker.join("audit"));
        assert!(log.record_act(&artifact(1)).await.is_err());
    }
}
