use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

/// Maximum characters per stored chunk.
pub const BLOCK_SIZE: usize = 1_000_000;

/// One persisted slice of a serialized artifact.
///
/// All chunks of a structure share `chunk_count`; concatenating their text
/// in ascending `chunk_index` order reproduces the artifact byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub structure_id: String,
    pub chunk_index: usize,
    pub chunk_count: usize,
    pub digest: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("unreadable chunk record at {path}: {source}")]
    Record {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("chunk integrity failure for {structure_id}: {detail}")]
    Integrity {
        structure_id: String,
        detail: String,
    },
}

/// Split artifact text into block-sized slices, in order.
///
/// Every slice except possibly the last holds exactly [`BLOCK_SIZE`]
/// characters; empty text yields no blocks.
pub fn split_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in text.char_indices() {
        if count == BLOCK_SIZE {
            blocks.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        blocks.push(&text[start..]);
    }
    blocks
}

/// Append-only chunk store, one JSON record file per chunk under a
/// per-structure directory. Artifacts are immutable once written; rewriting
/// an id lands on the same file names with identical content, so duplicate
/// concurrent writes cannot corrupt a read.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Persist an artifact as block-sized chunk records, index-ascending.
    /// Returns the number of chunks written.
    pub async fn write_chunks(
        &self,
        structure_id: &str,
        text: &str,
    ) -> Result<usize, StoreError> {
        let blocks = split_blocks(text);
        let chunk_count = blocks.len();
        let dir = self.root.join(structure_id);
        fs::create_dir_all(&dir).await?;

        for (chunk_index, block) in blocks.iter().enumerate() {
            let record = ChunkRecord {
                structure_id: structure_id.to_string(),
                chunk_index,
                chunk_count,
                digest: chunk_digest(block),
                text: (*block).to_string(),
            };
            let path = dir.join(format!("{chunk_index:05}.json"));
            let json = serde_json::to_string_pretty(&record).map_err(|source| {
                StoreError::Record {
                    path: path.display().to_string(),
                    source,
                }
            })?;
            fs::write(&path, json).await?;
            tracing::debug!(structure_id, chunk_index, chunk_count, "stored chunk");
        }
        Ok(chunk_count)
    }

    /// Reassemble the artifact for a structure id.
    ///
    /// No records is a miss, not an error. Records are sorted by index and
    /// concatenated; completeness is not checked (a read racing a write may
    /// see a partial set), but disagreeing counts, oversize or misplaced
    /// chunks, and digest mismatches are integrity failures.
    pub async fn read_chunks(&self, structure_id: &str) -> Result<Option<String>, StoreError> {
        let dir = self.root.join(structure_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path).await?;
            let record: ChunkRecord =
                serde_json::from_str(&json).map_err(|source| StoreError::Record {
                    path: path.display().to_string(),
                    source,
                })?;
            records.push(record);
        }

        if records.is_empty() {
            return Ok(None);
        }
        records.sort_by_key(|r| r.chunk_index);

        let chunk_count = records[0].chunk_count;
        let mut text = String::new();
        for record in &records {
            self.check_record(structure_id, record, chunk_count)?;
            text.push_str(&record.text);
        }
        Ok(Some(text))
    }

    fn check_record(
        &self,
        structure_id: &str,
        record: &ChunkRecord,
        chunk_count: usize,
    ) -> Result<(), StoreError> {
        let integrity = |detail: String| StoreError::Integrity {
            structure_id: structure_id.to_string(),
            detail,
        };
        if record.chunk_count != chunk_count {
            return Err(integrity(format!(
                "chunk {} declares count {} where another declares {}",
                record.chunk_index, record.chunk_count, chunk_count
            )));
        }
        if record.chunk_index >= record.chunk_count {
            return Err(integrity(format!(
                "chunk index {} out of range for count {}",
                record.chunk_index, record.chunk_count
            )));
        }
        let len = record.text.chars().count();
        if len > BLOCK_SIZE {
            return Err(integrity(format!(
                "chunk {} holds {} characters, limit {}",
                record.chunk_index, len, BLOCK_SIZE
            )));
        }
        if record.chunk_index + 1 < record.chunk_count && len != BLOCK_SIZE {
            return Err(integrity(format!(
                "non-final chunk {} holds {} characters, expected {}",
                record.chunk_index, len, BLOCK_SIZE
            )));
        }
        if chunk_digest(&record.text) != record.digest {
            return Err(integrity(format!(
                "chunk {} content does not match its digest",
                record.chunk_index
            )));
        }
        Ok(())
    }
}

fn chunk_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store() -> ArtifactStore {
        let root = std::env::temp_dir().join(format!("artifact-store-{}", uuid::Uuid::new_v4()));
        ArtifactStore::new(root)
    }

    fn sample_text(chars: usize) -> String {
        "abcdefghij\n".chars().cycle().take(chars).collect()
    }

    #[test]
    fn split_is_exact_at_block_multiples() {
        let text = sample_text(BLOCK_SIZE * 2);
        let blocks = split_blocks(&text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.chars().count() == BLOCK_SIZE));
    }

    #[test]
    fn split_of_one_and_a_half_blocks() {
        let text = sample_text(1_500_000);
        let blocks = split_blocks(&text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].chars().count(), 1_000_000);
        assert_eq!(blocks[1].chars().count(), 500_000);
        assert_eq!(blocks.concat(), text);
    }

    #[test]
    fn split_of_empty_text_yields_nothing() {
        assert!(split_blocks("").is_empty());
    }

    #[tokio::test]
    async fn round_trips_small_artifact() {
        let store = scratch_store();
        let text = sample_text(4_096);
        let written = store.write_chunks("1ABC", &text).await.unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.read_chunks("1ABC").await.unwrap(), Some(text));
    }

    #[tokio::test]
    async fn round_trips_multi_chunk_artifact() {
        let store = scratch_store();
        let text = sample_text(1_500_000);
        let written = store.write_chunks("2DEF", &text).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.read_chunks("2DEF").await.unwrap(), Some(text));
    }

    #[tokio::test]
    async fn missing_id_is_a_miss_not_an_error() {
        let store = scratch_store();
        assert!(store.read_chunks("4GHI").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_write_reads_back_as_single_write() {
        let store = scratch_store();
        let text = sample_text(1_200_000);
        store.write_chunks("5JKL", &text).await.unwrap();
        store.write_chunks("5JKL", &text).await.unwrap();
        assert_eq!(store.read_chunks("5JKL").await.unwrap(), Some(text));
    }

    #[tokio::test]
    async fn tampered_chunk_surfaces_integrity_failure() {
        let store = scratch_store();
        store.write_chunks("6MNO", &sample_text(100)).await.unwrap();

        let path = store.root().join("6MNO").join("00000.json");
        let json = std::fs::read_to_string(&path).unwrap();
        let mut record: ChunkRecord = serde_json::from_str(&json).unwrap();
        record.text.push('x');
        std::fs::write(&path, serde_json::to_string_pretty(&record).unwrap()).unwrap();

        let err = store.read_chunks("6MNO").await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity { .. }));
    }

    #[tokio::test]
    async fn disagreeing_chunk_counts_surface_integrity_failure() {
        let store = scratch_store();
        let text = sample_text(1_200_000);
        store.write_chunks("7PQR", &text).await.unwrap();

        let path = store.root().join("7PQR").join("00001.json");
        let json = std::fs::read_to_string(&path).unwrap();
        let mut record: ChunkRecord = serde_json::from_str(&json).unwrap();
        record.chunk_count = 3;
        std::fs::write(&path, serde_json::to_string_pretty(&record).unwrap()).unwrap();

        let err = store.read_chunks("7PQR").await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity { .. }));
    }

    #[tokio::test]
    async fn unreadable_record_is_reported_with_its_path() {
        let store = scratch_store();
        store.write_chunks("8STU", &sample_text(50)).await.unwrap();

        let path = store.root().join("8STU").join("00000.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = store.read_chunks("8STU").await.unwrap_err();
        assert!(matches!(err, StoreError::Record { .. }));
    }
}
