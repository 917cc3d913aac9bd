//! Vector stores.
//!
//! Two interchangeable backends with identical ranking semantics: `FlatStore`
//! keeps everything in memory and snapshots to a JSON file, `SqliteStore`
//! rides on the same sqlite stack the rest of the system uses. Both rank by
//! cosine similarity, brute force; corpus sizes here are small enough that an
//! approximate index would be overhead without benefit.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use deskbot_core::PipelineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub chunk_index: i64,
    pub hash: String,
}

#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add(
        &mut self,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), PipelineError>;

    /// Top-`k` chunks by cosine similarity, descending.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, PipelineError>;

    /// Flush the index to durable storage.
    async fn persist(&self) -> Result<(), PipelineError>;

    /// Try to adopt a previously persisted index. Returns `true` when an
    /// index with at least one chunk was found.
    async fn attach(&mut self) -> Result<bool, PipelineError>;

    /// Drop every stored chunk, in memory and in durable storage. A rebuild
    /// starts from here so stale chunks from earlier runs cannot survive.
    async fn clear(&mut self) -> Result<(), PipelineError>;

    fn is_empty(&self) -> bool;

    fn chunk_count(&self) -> usize;
}

pub fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn rank<'a>(
    entries: impl Iterator<Item = (&'a DocumentChunk, &'a [f32])>,
    query: &[f32],
    k: usize,
) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = entries
        .map(|(chunk, vector)| ScoredChunk { chunk: chunk.clone(), score: cosine_sim(query, vector) })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

/// In-memory store with a JSON snapshot on disk.
pub struct FlatStore {
    persist_path: PathBuf,
    entries: Vec<StoredEntry>,
}

impl FlatStore {
    pub fn new(persist_path: PathBuf) -> Self {
        Self { persist_path, entries: Vec::new() }
    }
}

#[async_trait]
impl VectorStore for FlatStore {
    async fn add(
        &mut self,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), PipelineError> {
        if chunks.len() != vectors.len() {
            return Err(PipelineError::Store(format!(
                "chunk/vector count mismatch: {} vs {}",
                chunks.len(),
                vectors.len()
            )));
        }
        self.entries.extend(
            chunks.into_iter().zip(vectors).map(|(chunk, vector)| StoredEntry { chunk, vector }),
        );
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, PipelineError> {
        Ok(rank(
            self.entries.iter().map(|entry| (&entry.chunk, entry.vector.as_slice())),
            vector,
            k,
        ))
    }

    async fn persist(&self) -> Result<(), PipelineError> {
        if let Some(parent) = self.persist_path.parent() {
            fs::create_dir_all(parent).map_err(|error| PipelineError::Store(error.to_string()))?;
        }
        let payload = serde_json::to_vec(&self.entries)
            .map_err(|error| PipelineError::Store(error.to_string()))?;
        fs::write(&self.persist_path, payload)
            .map_err(|error| PipelineError::Store(error.to_string()))?;
        info!(
            event_name = "index_persisted",
            path = %self.persist_path.display(),
            chunks = self.entries.len(),
        );
        Ok(())
    }

    async fn attach(&mut self) -> Result<bool, PipelineError> {
        if !self.persist_path.is_file() {
            return Ok(false);
        }
        let payload = fs::read(&self.persist_path)
            .map_err(|error| PipelineError::Store(error.to_string()))?;
        let entries: Vec<StoredEntry> = serde_json::from_slice(&payload)
            .map_err(|error| PipelineError::Store(format!("index snapshot corrupt: {error}")))?;
        if entries.is_empty() {
            return Ok(false);
        }
        debug!(event_name = "index_attached", chunks = entries.len());
        self.entries = entries;
        Ok(true)
    }

    async fn clear(&mut self) -> Result<(), PipelineError> {
        self.entries.clear();
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn chunk_count(&self) -> usize {
        self.entries.len()
    }
}

/// Sqlite-backed store. Vectors are serialized as JSON text; ranking happens
/// in memory after a full scan, mirroring `FlatStore` semantics.
pub struct SqliteStore {
    pool: SqlitePool,
    cached: Vec<StoredEntry>,
}

impl SqliteStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                hash TEXT NOT NULL,
                embedding TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|error| PipelineError::Store(error.to_string()))?;

        Ok(Self { pool, cached: Vec::new() })
    }

    async fn load_all(&self) -> Result<Vec<StoredEntry>, PipelineError> {
        let rows = sqlx::query(
            "SELECT id, source, chunk_index, text, hash, embedding
             FROM rag_chunks ORDER BY source, chunk_index",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| PipelineError::Store(error.to_string()))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let embedding: String = row.get("embedding");
            let vector: Vec<f32> = serde_json::from_str(&embedding)
                .map_err(|error| PipelineError::Store(format!("stored vector corrupt: {error}")))?;
            entries.push(StoredEntry {
                chunk: DocumentChunk {
                    id: row.get("id"),
                    source: row.get("source"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    hash: row.get("hash"),
                },
                vector,
            });
        }
        Ok(entries)
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn add(
        &mut self,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), PipelineError> {
        if chunks.len() != vectors.len() {
            return Err(PipelineError::Store(format!(
                "chunk/vector count mismatch: {} vs {}",
                chunks.len(),
                vectors.len()
            )));
        }

        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            let embedding = serde_json::to_string(&vector)
                .map_err(|error| PipelineError::Store(error.to_string()))?;
            sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks
                 (id, source, chunk_index, text, hash, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.id)
            .bind(&chunk.source)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(&embedding)
            .execute(&self.pool)
            .await
            .map_err(|error| PipelineError::Store(error.to_string()))?;
            self.cached.push(StoredEntry { chunk, vector });
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, PipelineError> {
        Ok(rank(
            self.cached.iter().map(|entry| (&entry.chunk, entry.vector.as_slice())),
            vector,
            k,
        ))
    }

    async fn persist(&self) -> Result<(), PipelineError> {
        // Rows are written through on add; sqlite is already durable.
        Ok(())
    }

    async fn attach(&mut self) -> Result<bool, PipelineError> {
        let entries = self.load_all().await?;
        if entries.is_empty() {
            return Ok(false);
        }
        debug!(event_name = "index_attached", chunks = entries.len());
        self.cached = entries;
        Ok(true)
    }

    async fn clear(&mut self) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM rag_chunks")
            .execute(&self.pool)
            .await
            .map_err(|error| PipelineError::Store(error.to_string()))?;
        self.cached.clear();
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.cached.is_empty()
    }

    fn chunk_count(&self) -> usize {
        self.cached.len()
    }
}
