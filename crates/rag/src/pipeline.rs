//! Retrieval pipeline: attach-else-build initialization, top-k retrieval,
//! and context rendering for grounding prompts.

use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use deskbot_core::config::{DocumentsConfig, VectorStoreConfig};
use deskbot_core::PipelineError;

use crate::embedding::Embedder;
use crate::loader::load_documents;
use crate::splitter::split_text;
use crate::store::{DocumentChunk, ScoredChunk, VectorStore};

/// What `initialize_or_load` ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexAction {
    /// Adopted a previously persisted index.
    Attached { chunks: usize },
    /// Loaded the corpus and built a fresh index.
    Built { documents: usize, chunks: usize },
}

pub struct RagSystem {
    embedder: Box<dyn Embedder>,
    store: RwLock<Box<dyn VectorStore>>,
    corpus_dir: PathBuf,
    allowed_extensions: Vec<String>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RagSystem {
    pub fn new(
        embedder: Box<dyn Embedder>,
        store: Box<dyn VectorStore>,
        documents: &DocumentsConfig,
        vector_store: &VectorStoreConfig,
    ) -> Self {
        Self {
            embedder,
            store: RwLock::new(store),
            corpus_dir: documents.corpus_dir.clone(),
            allowed_extensions: documents.allowed_extensions.clone(),
            chunk_size: vector_store.chunk_size,
            chunk_overlap: vector_store.chunk_overlap,
        }
    }

    /// Attach to a persisted index when one exists; otherwise load the
    /// corpus, split, embed, index, and persist.
    pub async fn initialize_or_load(&self) -> Result<IndexAction, PipelineError> {
        {
            let mut store = self.store.write().await;
            if store.attach().await? {
                let chunks = store.chunk_count();
                info!(event_name = "index_ready", action = "attached", chunks);
                return Ok(IndexAction::Attached { chunks });
            }
        }
        self.rebuild().await
    }

    /// Unconditionally rebuild the index from the corpus directory.
    pub async fn rebuild(&self) -> Result<IndexAction, PipelineError> {
        let documents = load_documents(&self.corpus_dir, &self.allowed_extensions)?;
        if documents.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }

        let mut chunks = Vec::new();
        for document in &documents {
            for (index, text) in
                split_text(&document.text, self.chunk_size, self.chunk_overlap).into_iter().enumerate()
            {
                let hash = format!("{:x}", Sha256::digest(text.as_bytes()));
                chunks.push(DocumentChunk {
                    id: Uuid::new_v4().to_string(),
                    text,
                    source: document.source.clone(),
                    chunk_index: index as i64,
                    hash,
                });
            }
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let mut store = self.store.write().await;
        store.clear().await?;
        store.add(chunks, vectors).await?;
        store.persist().await?;

        let chunk_count = store.chunk_count();
        info!(
            event_name = "index_ready",
            action = "built",
            documents = documents.len(),
            chunks = chunk_count,
        );
        Ok(IndexAction::Built { documents: documents.len(), chunks: chunk_count })
    }

    pub async fn is_ready(&self) -> bool {
        !self.store.read().await.is_empty()
    }

    /// Top-`k` chunks for a query. Fails before any index exists.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, PipelineError> {
        let store = self.store.read().await;
        if store.is_empty() {
            return Err(PipelineError::IndexNotReady);
        }
        let vector = self.embedder.embed_query(query).await?;
        store.search(&vector, k).await
    }

    /// Render retrieved chunks as a grounding context block:
    /// `[Source i: <source>]` followed by the chunk text, blocks separated by
    /// blank lines, sources numbered from 1 in rank order.
    pub async fn context_for_query(&self, query: &str, k: usize) -> Result<String, PipelineError> {
        let results = self.retrieve(query, k).await?;
        let blocks: Vec<String> = results
            .iter()
            .enumerate()
            .map(|(index, scored)| {
                format!("[Source {}: {}]\n{}", index + 1, scored.chunk.source, scored.chunk.text)
            })
            .collect();
        Ok(blocks.join("\n\n"))
    }
}
