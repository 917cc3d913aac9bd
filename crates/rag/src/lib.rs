//! Document retrieval for grounded answers.
//!
//! Plain-text and PDF manuals are loaded from a corpus directory, split into
//! overlapping chunks, embedded, and indexed in a vector store. The
//! [`RagSystem`] ties the pieces together: it attaches to a previously
//! persisted index when one exists and rebuilds from the corpus otherwise.

pub mod embedding;
pub mod loader;
pub mod pipeline;
pub mod splitter;
pub mod store;

pub use embedding::{build_embedder, Embedder, HashEmbedder, HttpEmbedder};
pub use loader::{load_documents, LoadedDocument};
pub use pipeline::{IndexAction, RagSystem};
pub use splitter::split_text;
pub use store::{DocumentChunk, FlatStore, ScoredChunk, SqliteStore, VectorStore};
