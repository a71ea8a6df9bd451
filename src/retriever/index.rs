//! Persisted vector index.
//!
//! Passages live in one `SQLite` table with their embeddings stored as
//! little-endian `f32` blobs. Search is a full scan ranked by cosine
//! similarity, which is adequate for the few thousand chunks a document
//! collection produces.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use tracing::debug;

use super::embedding::Embedder;
use crate::error::IndexError;
use crate::runtime::BlockingRuntime;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS passages (
    id INTEGER PRIMARY KEY,
    collection TEXT NOT NULL,
    content TEXT NOT NULL,
    source TEXT,
    embedding BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_passages_collection ON passages(collection);
";

/// A retrieved passage.
#[derive(Debug, Clone, Serialize)]
pub struct Passage {
    /// Row id, increasing in insertion order.
    pub id: i64,
    /// Passage text.
    pub content: String,
    /// Originating document, if recorded.
    pub source: Option<String>,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Index diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    /// Passages in the collection.
    pub chunk_count: usize,
    /// Collection identifier.
    pub collection: String,
    /// Index file path.
    pub index_path: PathBuf,
}

/// Similarity search over stored passages.
pub trait VectorIndex: Send + Sync {
    /// Returns the `k` passages nearest to `query`, best first.
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, IndexError>;

    /// Returns index diagnostics.
    fn info(&self) -> Result<IndexInfo, IndexError>;
}

/// `SQLite`-backed passage store.
#[derive(Debug)]
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    path: PathBuf,
    collection: String,
}

impl SqliteIndex {
    /// Opens an existing index read-only.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Open`] if the file is missing, unreadable or has
    /// no `passages` table.
    pub fn open(path: &Path, collection: &str) -> Result<Self, IndexError> {
        let open_error = |message: String| IndexError::Open {
            path: path.display().to_string(),
            message,
        };

        if !path.is_file() {
            return Err(open_error("file not found".to_string()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| open_error(e.to_string()))?;

        let table: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'passages'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| open_error(e.to_string()))?;
        if table.is_none() {
            return Err(open_error("no passages table".to_string()));
        }

        debug!(path = %path.display(), collection, "opened document index");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
            collection: collection.to_string(),
        })
    }

    /// Creates (or reopens for writing) an index file.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Open`] if the file cannot be created.
    pub fn create(path: &Path, collection: &str) -> Result<Self, IndexError> {
        let conn = Connection::open(path).map_err(|e| IndexError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
            collection: collection.to_string(),
        })
    }

    /// Appends a passage to this collection and returns its id.
    pub fn add_passage(
        &self,
        content: &str,
        source: Option<&str>,
        embedding: &[f32],
    ) -> Result<i64, IndexError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO passages (collection, content, source, embedding) VALUES (?1, ?2, ?3, ?4)",
            params![
                self.collection,
                content,
                source,
                embedding_to_blob(embedding)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Number of passages in this collection.
    pub fn count(&self) -> Result<usize, IndexError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passages WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Ranks passages by cosine similarity to an already-embedded query.
    ///
    /// Equal scores keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] when a stored vector has a
    /// different length than `query`.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Passage>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, source, embedding FROM passages WHERE collection = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![self.collection], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, content, source, blob) = row?;
            let embedding = blob_to_embedding(&blob);
            if embedding.len() != query.len() {
                return Err(IndexError::DimensionMismatch {
                    stored: embedding.len(),
                    query: query.len(),
                });
            }
            scored.push(Passage {
                id,
                content,
                source,
                score: cosine_similarity(&embedding, query),
            });
        }

        // Stable sort, so ties stay in id order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    /// Index file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Collection identifier.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, IndexError> {
        self.conn
            .lock()
            .map_err(|_| IndexError::Query("index connection lock poisoned".to_string()))
    }
}

/// A [`SqliteIndex`] paired with the embedder that produced its vectors.
pub struct EmbeddedIndex {
    store: SqliteIndex,
    embedder: Arc<dyn Embedder>,
    runtime: Arc<BlockingRuntime>,
}

impl EmbeddedIndex {
    /// Pairs a store with an embedder. Embedding calls run on `runtime`.
    pub fn new(store: SqliteIndex, embedder: Arc<dyn Embedder>, runtime: Arc<BlockingRuntime>) -> Self {
        Self {
            store,
            embedder,
            runtime,
        }
    }
}

impl std::fmt::Debug for EmbeddedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedIndex")
            .field("store", &self.store)
            .field("embedder", &self.embedder.model())
            .finish_non_exhaustive()
    }
}

impl VectorIndex for EmbeddedIndex {
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, IndexError> {
        let vector = self.runtime.block_on(self.embedder.embed(query))?;
        let passages = self.store.nearest(&vector, k)?;
        debug!(k, found = passages.len(), "similarity search complete");
        Ok(passages)
    }

    fn info(&self) -> Result<IndexInfo, IndexError> {
        Ok(IndexInfo {
            chunk_count: self.store.count()?,
            collection: self.store.collection().to_string(),
            index_path: self.store.path().to_path_buf(),
        })
    }
}

/// Cosine similarity in `[-1, 1]`; zero for empty or zero-norm vectors.
#[allow(clippy::cast_possible_truncation)]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    (dot / denom) as f32
}

fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Embeds text as a 3-d keyword histogram so tests can predict ranking.
    pub(crate) struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn model(&self) -> &str {
            "keyword"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
            Ok(keyword_vector(text))
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn keyword_vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        ["risk", "budget", "launch"]
            .iter()
            .map(|k| text.matches(k).count() as f32 + 0.01)
            .collect()
    }

    /// Builds a small index file with three passages.
    pub(crate) fn sample_index(dir: &Path) -> PathBuf {
        let path = dir.join("vectordb.sqlite3");
        let store = SqliteIndex::create(&path, "documents")
            .unwrap_or_else(|e| panic!("create failed: {e}"));
        for (content, source) in [
            ("Risk strategies: mitigate risk early, track risk weekly.", "risk.pdf"),
            ("The budget for FY25 is flat.", "budget.pdf"),
            ("Launch windows open in March.", "launch.pdf"),
        ] {
            store
                .add_passage(content, Some(source), &keyword_vector(content))
                .unwrap_or_else(|e| panic!("insert failed: {e}"));
        }
        path
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!(cosine_similarity(&[], &[]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_blob_roundtrip_is_little_endian() {
        let blob = embedding_to_blob(&[1.0, -2.5]);
        assert_eq!(&blob[..4], &1.0f32.to_le_bytes());
        assert_eq!(blob_to_embedding(&blob), vec![1.0, -2.5]);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let err = SqliteIndex::open(&dir.path().join("absent.sqlite3"), "documents")
            .err()
            .unwrap_or_else(|| panic!("expected open to fail"));
        assert!(matches!(err, IndexError::Open { .. }));
        assert!(err.to_string().contains("absent.sqlite3"));
    }

    #[test]
    fn test_open_rejects_foreign_database() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let path = dir.path().join("other.sqlite3");
        Connection::open(&path)
            .and_then(|c| c.execute_batch("CREATE TABLE notes (body TEXT);"))
            .unwrap_or_else(|e| panic!("setup failed: {e}"));

        let err = SqliteIndex::open(&path, "documents").err();
        assert!(matches!(err, Some(IndexError::Open { .. })));
    }

    #[test]
    fn test_nearest_ranks_by_similarity() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let path = sample_index(dir.path());
        let store = SqliteIndex::open(&path, "documents")
            .unwrap_or_else(|e| panic!("open failed: {e}"));

        assert_eq!(store.count().unwrap_or_else(|e| panic!("count failed: {e}")), 3);
        let hits = store
            .nearest(&keyword_vector("risk"), 2)
            .unwrap_or_else(|e| panic!("nearest failed: {e}"));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source.as_deref(), Some("risk.pdf"));
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let store = SqliteIndex::create(&dir.path().join("t.sqlite3"), "documents")
            .unwrap_or_else(|e| panic!("create failed: {e}"));
        for text in ["first", "second", "third"] {
            store
                .add_passage(text, None, &[1.0, 1.0])
                .unwrap_or_else(|e| panic!("insert failed: {e}"));
        }
        let hits = store
            .nearest(&[1.0, 1.0], 4)
            .unwrap_or_else(|e| panic!("nearest failed: {e}"));
        let order: Vec<_> = hits.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_collections_are_isolated() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let path = sample_index(dir.path());
        let other = SqliteIndex::open(&path, "elsewhere")
            .unwrap_or_else(|e| panic!("open failed: {e}"));
        assert_eq!(other.count().unwrap_or_else(|e| panic!("count failed: {e}")), 0);
        assert!(
            other
                .nearest(&keyword_vector("risk"), 4)
                .unwrap_or_else(|e| panic!("nearest failed: {e}"))
                .is_empty()
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let path = sample_index(dir.path());
        let store = SqliteIndex::open(&path, "documents")
            .unwrap_or_else(|e| panic!("open failed: {e}"));
        let err = store
            .nearest(&[1.0, 0.0], 4)
            .err()
            .unwrap_or_else(|| panic!("expected a mismatch"));
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                stored: 3,
                query: 2
            }
        ));
        assert_eq!(err.to_string(), "dimension mismatch: index has 3, query has 2");
    }

    #[test]
    fn test_read_only_open_refuses_writes() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let path = sample_index(dir.path());
        let store = SqliteIndex::open(&path, "documents")
            .unwrap_or_else(|e| panic!("open failed: {e}"));
        assert!(store.add_passage("new", None, &[0.0, 0.0, 1.0]).is_err());
    }

    #[test]
    fn test_embedded_index_search_and_info() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let path = sample_index(dir.path());
        let store = SqliteIndex::open(&path, "documents")
            .unwrap_or_else(|e| panic!("open failed: {e}"));
        let runtime =
            Arc::new(BlockingRuntime::new().unwrap_or_else(|e| panic!("runtime failed: {e}")));
        let index = EmbeddedIndex::new(store, Arc::new(KeywordEmbedder), runtime);

        let hits = index
            .similarity_search("What is the launch plan?", 1)
            .unwrap_or_else(|e| panic!("search failed: {e}"));
        assert_eq!(hits[0].source.as_deref(), Some("launch.pdf"));

        let info = index.info().unwrap_or_else(|e| panic!("info failed: {e}"));
        assert_eq!(info.chunk_count, 3);
        assert_eq!(info.collection, "documents");
        assert_eq!(info.index_path, path);
    }
}
