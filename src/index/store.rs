//! SQLite persistence for the document index.
//!
//! The file holds at most one index. Saving replaces the previous content
//! inside a single transaction.

use super::{DocumentIndex, IndexEntry, IndexSource};
use crate::chunking::Chunk;
use crate::error::{MultitoolError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS index_source (
        id TEXT PRIMARY KEY,
        path TEXT NOT NULL,
        name TEXT NOT NULL,
        page_count INTEGER NOT NULL,
        embedding_model TEXT NOT NULL,
        chunk_size INTEGER NOT NULL,
        chunk_overlap INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        chunk_order INTEGER PRIMARY KEY,
        page INTEGER NOT NULL,
        start_offset INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL
    );
"#;

/// On-disk store for a single [`DocumentIndex`].
pub struct IndexStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl IndexStore {
    /// Create a store for `path`. The file is not touched until the first save
    /// or load.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_connection<T>(&self, create: bool, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<Option<T>> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| MultitoolError::Agent(format!("Failed to acquire index lock: {}", e)))?;

        if guard.is_none() {
            if !create && !self.path.exists() {
                return Ok(None);
            }
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(&self.path)?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn.execute_batch(SCHEMA)?;
            info!("Opened index store at {:?}", self.path);
            *guard = Some(conn);
        }

        match guard.as_mut() {
            Some(conn) => f(conn).map(Some),
            None => Ok(None),
        }
    }

    /// Persist `index`, replacing whatever was stored before.
    #[instrument(skip_all, fields(document = %index.source.name, chunks = index.len()))]
    pub fn save(&self, index: &DocumentIndex) -> Result<()> {
        self.with_connection(true, |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM chunks", [])?;
            tx.execute("DELETE FROM index_source", [])?;

            let source = &index.source;
            tx.execute(
                r#"
                INSERT INTO index_source
                (id, path, name, page_count, embedding_model, chunk_size, chunk_overlap, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    index.id.to_string(),
                    source.path.to_string_lossy(),
                    source.name,
                    source.page_count as i64,
                    source.embedding_model,
                    source.chunk_size as i64,
                    source.chunk_overlap as i64,
                    source.indexed_at.to_rfc3339(),
                ],
            )?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO chunks (chunk_order, page, start_offset, content, embedding) VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for entry in &index.entries {
                    stmt.execute(params![
                        entry.chunk.order as i64,
                        entry.chunk.page,
                        entry.chunk.start as i64,
                        entry.chunk.content,
                        embedding_to_bytes(&entry.embedding),
                    ])?;
                }
            }

            tx.commit()?;
            Ok(())
        })?;

        info!("Saved index to {:?}", self.path);
        Ok(())
    }

    /// Load the stored index, or `None` if nothing has been saved.
    #[instrument(skip(self))]
    pub fn load(&self) -> Result<Option<DocumentIndex>> {
        let loaded = self.with_connection(false, |conn| {
            let row = conn
                .query_row(
                    r#"
                    SELECT id, path, name, page_count, embedding_model, chunk_size, chunk_overlap, indexed_at
                    FROM index_source LIMIT 1
                    "#,
                    [],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                            row.get::<_, i64>(6)?,
                            row.get::<_, String>(7)?,
                        ))
                    },
                )
                .optional()?;

            let Some((id, path, name, page_count, model, chunk_size, chunk_overlap, indexed_at)) = row else {
                return Ok(None);
            };

            let id = Uuid::parse_str(&id)
                .map_err(|e| MultitoolError::Document(format!("corrupt index id: {}", e)))?;
            let indexed_at = DateTime::parse_from_rfc3339(&indexed_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| MultitoolError::Document(format!("corrupt index timestamp: {}", e)))?;

            let mut stmt = conn.prepare(
                "SELECT chunk_order, page, start_offset, content, embedding FROM chunks ORDER BY chunk_order",
            )?;
            let entries = stmt
                .query_map([], |row| {
                    let bytes: Vec<u8> = row.get(4)?;
                    Ok(IndexEntry {
                        chunk: Chunk {
                            order: row.get::<_, i64>(0)? as usize,
                            page: row.get(1)?,
                            start: row.get::<_, i64>(2)? as usize,
                            content: row.get(3)?,
                        },
                        embedding: bytes_to_embedding(&bytes),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            debug!("Loaded {} chunks", entries.len());

            Ok(Some(DocumentIndex {
                id,
                source: IndexSource {
                    path: PathBuf::from(path),
                    name,
                    page_count: page_count as usize,
                    embedding_model: model,
                    chunk_size: chunk_size as usize,
                    chunk_overlap: chunk_overlap as usize,
                    indexed_at,
                },
                entries,
            }))
        })?;

        Ok(loaded.flatten())
    }
}

/// Serialize embedding to bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::tests::{entry, source};
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");
        let store = IndexStore::new(&path);

        assert!(store.load().unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index.db"));

        let index = DocumentIndex::new(
            source(),
            vec![
                entry(0, "first chunk", vec![0.25, -1.5, 3.0]),
                entry(1, "second chunk", vec![1.0, 0.0, f32::MIN_POSITIVE]),
            ],
        );
        store.save(&index).unwrap();

        let reopened = IndexStore::new(dir.path().join("index.db"));
        let loaded = reopened.load().unwrap().unwrap();
        assert_eq!(loaded.id, index.id);
        assert_eq!(loaded.entries, index.entries);
        assert_eq!(loaded.source.name, "guide.pdf");
        assert_eq!(loaded.source.chunk_overlap, 200);
        assert_eq!(
            loaded.source.indexed_at.timestamp(),
            index.source.indexed_at.timestamp()
        );
    }

    #[test]
    fn test_save_replaces_previous_index() {
        let dir = tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index.db"));

        let first = DocumentIndex::new(
            source(),
            vec![
                entry(0, "old a", vec![1.0]),
                entry(1, "old b", vec![1.0]),
                entry(2, "old c", vec![1.0]),
            ],
        );
        store.save(&first).unwrap();

        let second = DocumentIndex::new(source(), vec![entry(0, "new", vec![2.0])]);
        store.save(&second).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.id, second.id);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries[0].chunk.content, "new");
    }

    #[test]
    fn test_embedding_bytes() {
        let embedding = vec![0.5f32, -2.0, 1e-3];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&embedding)), embedding);
    }
}
