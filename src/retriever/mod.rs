//! Document retrieval over a persisted vector index.

pub mod embedding;
pub mod index;
pub mod search;

pub use embedding::{Embedder, OpenAiEmbedder};
pub use index::{EmbeddedIndex, IndexInfo, Passage, SqliteIndex, VectorIndex};
pub use search::{DEFAULT_TOP_K, DOCUMENT_TOOL_NAME, DocumentRetriever, IndexDiagnostics, IndexFactory};
