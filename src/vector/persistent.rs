// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Durable vector index backed by a compressed on-disk snapshot.
//!
//! Records are held in memory for search and mirrored to
//! `<dir>/<collection>.bin.zst` (bincode, zstd). The snapshot is rewritten
//! via a temp file and an atomic rename, so a crash mid-write leaves the
//! previous snapshot intact and a reader never observes a torn file.
//! `open` reloads the snapshot, which is what lets a restarted node serve
//! queries without re-embedding its corpus.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::index::{scan_records, IndexError, VectorIndex};
use super::types::{Passage, ScoredPassage};

/// zstd level 3: fast enough to rewrite on every append, still ~4x smaller
/// than raw f32 text chunks.
const SNAPSHOT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    collection: String,
    created_at: DateTime<Utc>,
    records: Vec<(Passage, Vec<f32>)>,
}

pub struct PersistentIndex {
    collection: String,
    snapshot_path: PathBuf,
    dir: PathBuf,
    records: RwLock<Vec<(Passage, Vec<f32>)>>,
    /// Serializes writers so the snapshot on disk always corresponds to
    /// the most recent in-memory swap. Readers never touch this lock;
    /// they contend only on the short `records` swap.
    writer: Mutex<()>,
}

impl PersistentIndex {
    /// Open (or create) the collection at `dir`.
    pub fn open(dir: impl AsRef<Path>, collection: &str) -> Result<Self, IndexError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let snapshot_path = dir.join(format!("{collection}.bin.zst"));

        let records = if snapshot_path.exists() {
            let snapshot = read_snapshot(&snapshot_path)?;
            info!(
                collection,
                records = snapshot.records.len(),
                "loaded persistent index snapshot"
            );
            snapshot.records
        } else {
            info!(collection, "no snapshot found, starting empty");
            Vec::new()
        };

        Ok(Self {
            collection: collection.to_string(),
            snapshot_path,
            dir,
            records: RwLock::new(records),
            writer: Mutex::new(()),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Replace the entire record set, used by the full-corpus rebuild path.
    ///
    /// The new set is persisted before the in-memory swap; on any failure
    /// the index keeps serving its last-known-good records.
    pub async fn replace_all(
        &self,
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), IndexError> {
        if passages.len() != vectors.len() {
            return Err(IndexError::ShapeMismatch {
                passages: passages.len(),
                vectors: vectors.len(),
            });
        }

        let new_records: Vec<(Passage, Vec<f32>)> =
            passages.into_iter().zip(vectors).collect();

        let _writer = self.writer.lock().await;
        self.persist(&new_records).await?;
        let count = new_records.len();
        *self.records.write().await = new_records;
        info!(
            collection = %self.collection,
            records = count,
            "persistent index rebuilt"
        );
        Ok(())
    }

    /// Encode and write the snapshot on a blocking thread. Serialization,
    /// compression, and file I/O all happen off the async threads; the
    /// caller holds `writer`, not the `records` lock, so searches keep
    /// running while the snapshot is written.
    async fn persist(&self, records: &[(Passage, Vec<f32>)]) -> Result<(), IndexError> {
        let snapshot = Snapshot {
            collection: self.collection.clone(),
            created_at: Utc::now(),
            records: records.to_vec(),
        };
        let dir = self.dir.clone();
        let snapshot_path = self.snapshot_path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), IndexError> {
            let encoded = bincode::serialize(&snapshot)
                .map_err(|e| IndexError::SnapshotCorrupt(e.to_string()))?;
            let compressed =
                zstd::encode_all(encoded.as_slice(), SNAPSHOT_COMPRESSION_LEVEL)?;

            // Temp file in the same directory so the rename stays on one
            // filesystem and is atomic.
            let tmp = tempfile::NamedTempFile::new_in(&dir)?;
            std::fs::write(tmp.path(), &compressed)?;
            tmp.persist(&snapshot_path)
                .map_err(|e| IndexError::SnapshotIo(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| {
            IndexError::SnapshotIo(std::io::Error::new(std::io::ErrorKind::Other, e))
        })?
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot, IndexError> {
    let compressed = std::fs::read(path)?;
    let encoded = zstd::decode_all(compressed.as_slice())?;
    bincode::deserialize(&encoded).map_err(|e| IndexError::SnapshotCorrupt(e.to_string()))
}

#[async_trait]
impl VectorIndex for PersistentIndex {
    /// Append a batch. All-or-nothing: the snapshot is written with the
    /// batch included before the in-memory swap, so a concurrent search
    /// sees either none or all of the batch, and a crash mid-write leaves
    /// the previous snapshot intact.
    async fn upsert(
        &self,
        passages: Vec<Passage>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), IndexError> {
        if passages.len() != vectors.len() {
            return Err(IndexError::ShapeMismatch {
                passages: passages.len(),
                vectors: vectors.len(),
            });
        }

        // The writer lock pins the record set between the read-clone and
        // the swap, so concurrent upserts cannot drop each other's batch.
        let _writer = self.writer.lock().await;
        let mut combined = self.records.read().await.clone();
        combined.extend(passages.into_iter().zip(vectors));
        self.persist(&combined).await?;
        *self.records.write().await = combined;
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError> {
        let records = self.records.read().await;
        Ok(scan_records(&records, query, k))
    }

    async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}
