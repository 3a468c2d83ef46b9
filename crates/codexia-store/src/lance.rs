//! LanceDB-backed passage index.
//!
//! Same contract as [`crate::FlatIndex`], stored as a Lance table with a
//! `FixedSizeList<Float32>` embedding column so larger corpora can use
//! Lance's vector search.

use std::path::Path;

use arrow::array::{Array, Float32Array, RecordBatchIterator};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use codexia_core::passages::{batch_to_passages, passages_to_batch};
use codexia_core::{IndexError, Passage, PassageIndex, ScoredPassage};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::info;

use crate::StoreError;

pub const POLICY_PASSAGES_TABLE: &str = "policy_passages";
const DISTANCE_COLUMN: &str = "_distance";

pub struct LanceIndex {
    table: lancedb::Table,
}

async fn connect(path: &Path) -> Result<lancedb::Connection, StoreError> {
    let uri = path
        .to_str()
        .ok_or_else(|| StoreError::Other("non-UTF8 database path".into()))?;
    Ok(lancedb::connect(uri).execute().await?)
}

impl LanceIndex {
    /// Open an existing passage table.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let db = connect(path).await?;
        let names = db.table_names().execute().await?;
        if !names.iter().any(|n| n == POLICY_PASSAGES_TABLE) {
            return Err(StoreError::IndexNotFound(path.to_path_buf()));
        }
        let table = db.open_table(POLICY_PASSAGES_TABLE).execute().await?;
        Ok(Self { table })
    }

    /// Create (or replace) the passage table from passages and their vectors.
    pub async fn write(
        path: &Path,
        passages: &[Passage],
        vectors: &[Vec<f32>],
        dim: usize,
    ) -> Result<Self, StoreError> {
        let batch = passages_to_batch(passages, vectors, dim)?;
        let rows = batch.num_rows();
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let db = connect(path).await?;
        let existing = db.table_names().execute().await?;
        if existing.iter().any(|n| n == POLICY_PASSAGES_TABLE) {
            db.drop_table(POLICY_PASSAGES_TABLE, &[]).await?;
        }
        let table = db
            .create_table(POLICY_PASSAGES_TABLE, Box::new(reader))
            .execute()
            .await?;

        info!(table = POLICY_PASSAGES_TABLE, rows, "created LanceDB passage table");
        Ok(Self { table })
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.table.count_rows(None).await?)
    }

    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPassage>, StoreError> {
        let batches: Vec<RecordBatch> = self
            .table
            .vector_search(vector)?
            .limit(k)
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut out = Vec::new();
        for batch in &batches {
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| StoreError::Other("search result lacks _distance".into()))?;
            for (i, passage) in batch_to_passages(batch)?.into_iter().enumerate() {
                out.push(ScoredPassage {
                    distance: if distances.is_null(i) { f32::INFINITY } else { distances.value(i) },
                    passage,
                });
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl PassageIndex for LanceIndex {
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError> {
        Ok(self.nearest(vector, k).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn passage(clause: &str) -> Passage {
        Passage {
            text: format!("{clause} text"),
            source: "p.md".into(),
            clause_id: clause.into(),
            effective_from: "2024-01-01".into(),
            effective_to: None,
        }
    }

    #[tokio::test]
    async fn missing_table_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = LanceIndex::open(&tmp.path().join("db")).await;
        assert!(matches!(result, Err(StoreError::IndexNotFound(_))));
    }

    #[tokio::test]
    async fn write_then_search() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("db");
        let passages = vec![passage("A §1"), passage("B §1")];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        LanceIndex::write(&db, &passages, &vectors, 2).await.unwrap();

        let index = LanceIndex::open(&db).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
        let hits = index.search(&[0.9, 0.1], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].passage.clause_id, "A §1");
    }

    #[tokio::test]
    async fn rewrite_replaces_table() {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("db");
        let passages = vec![passage("A §1")];
        LanceIndex::write(&db, &passages, &[vec![1.0, 0.0]], 2).await.unwrap();
        let index = LanceIndex::write(&db, &passages, &[vec![1.0, 0.0]], 2).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
    }
}
