use crate::cache::ArtifactCache;
use crate::fetch::{FetchError, StructureSource};
use crate::metrics::{Metrics, TimedOperation};
use std::sync::Arc;
use store::{ArtifactStore, StoreError};
use thiserror::Error;

const DATABASE_REMARK: &str = "// REMARK From database\n";

/// Outcome of a loader request: the artifact text, or a comment-formatted
/// diagnostic the viewer renders in place of one. Diagnostics are never
/// persisted; the next request starts over.
#[derive(Debug)]
pub enum LoaderReply {
    Artifact(String),
    Diagnostic(String),
}

impl LoaderReply {
    pub fn into_text(self) -> String {
        match self {
            LoaderReply::Artifact(text) | LoaderReply::Diagnostic(text) => text,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("structure input rejected: {0}")]
    Malformed(#[from] polymer::ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fetch-compute-cache orchestration for one structure id.
///
/// Requests run independently; two concurrent misses for the same id both
/// fetch and both write. That is wasteful but safe: artifacts are immutable
/// and chunk file names deterministic, so the writes collide on identical
/// content.
pub struct LoaderPipeline<S> {
    source: S,
    store: ArtifactStore,
    cache: ArtifactCache,
    metrics: Arc<Metrics>,
}

impl<S: StructureSource> LoaderPipeline<S> {
    pub fn new(source: S, store: ArtifactStore, cache: ArtifactCache, metrics: Arc<Metrics>) -> Self {
        Self {
            source,
            store,
            cache,
            metrics,
        }
    }

    pub async fn get_loader(&self, structure_id: &str) -> Result<LoaderReply, PipelineError> {
        self.metrics.record_request();

        if let Some(text) = self.cache.get(structure_id) {
            self.metrics.record_memory_hit();
            tracing::debug!(structure_id, "memory cache hit");
            return Ok(LoaderReply::Artifact(format!("{DATABASE_REMARK}{text}")));
        }

        let read_timer = TimedOperation::start();
        if let Some(text) = self.store.read_chunks(structure_id).await? {
            self.metrics.record_store_hit(read_timer.elapsed());
            tracing::debug!(structure_id, "chunk store hit");
            self.cache.set(structure_id, text.clone());
            return Ok(LoaderReply::Artifact(format!("{DATABASE_REMARK}{text}")));
        }

        tracing::info!(structure_id, "store miss, fetching from source");
        let fetch_timer = TimedOperation::start();
        let raw = match self.source.fetch_structure(structure_id).await {
            Ok(raw) => raw,
            Err(error) => {
                self.metrics.record_fetch_failure();
                tracing::warn!(structure_id, error = %error, "fetch failed");
                return Ok(LoaderReply::Diagnostic(diagnostic(&error)));
            }
        };
        self.metrics.record_fetch(fetch_timer.elapsed());

        let compute_timer = TimedOperation::start();
        let lines = polymer::atom_record_lines(&raw);
        let structure = polymer::Polymer::from_records(&lines)?;
        let graph = bonds::infer_bonds(&structure);
        let body = loader::render_loader(&lines, &graph);
        let text = format!(
            "// REMARK from {}\n{}",
            self.source.source_url(structure_id),
            body
        );
        self.metrics
            .record_computed(compute_timer.elapsed(), graph.pairs.len());

        let write_timer = TimedOperation::start();
        let chunks = self.store.write_chunks(structure_id, &text).await?;
        self.metrics.record_store_write(write_timer.elapsed());
        tracing::info!(
            structure_id,
            atoms = structure.atom_count(),
            bonds = graph.pairs.len(),
            chunks,
            "artifact computed and stored"
        );

        self.cache.set(structure_id, text.clone());
        Ok(LoaderReply::Artifact(text))
    }
}

fn diagnostic(error: &FetchError) -> String {
    match error {
        FetchError::Timeout { deadline_secs } => {
            format!("// Structure source did not answer within {deadline_secs}s\n")
        }
        FetchError::Http { status } => {
            format!("// Downloading error from the structure source (status {status})\n")
        }
        FetchError::TooLarge { len, limit } => {
            format!("// Sorry, structure files above {limit} bytes cannot be processed (this one is {len})\n")
        }
        FetchError::Transport(_) => "// Could not reach the structure source\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "HEADER    SMALL PEPTIDE\n\
        ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N\n\
        ATOM      2  CA  GLY A   1       1.450   0.000   0.000  1.00  0.00           C\n\
        END\n";

    enum StubResponse {
        Text(&'static str),
        HttpError,
        Timeout,
    }

    struct StubSource {
        response: StubResponse,
    }

    impl StructureSource for StubSource {
        async fn fetch_structure(&self, _structure_id: &str) -> Result<String, FetchError> {
            match &self.response {
                StubResponse::Text(text) => Ok((*text).to_string()),
                StubResponse::HttpError => Err(FetchError::Http {
                    status: reqwest::StatusCode::NOT_FOUND,
                }),
                StubResponse::Timeout => Err(FetchError::Timeout { deadline_secs: 5 }),
            }
        }

        fn source_url(&self, structure_id: &str) -> String {
            format!("stub://{structure_id}")
        }
    }

    fn scratch_root() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pipeline-test-{}", uuid::Uuid::new_v4()))
    }

    fn pipeline(response: StubResponse, root: &std::path::Path) -> LoaderPipeline<StubSource> {
        LoaderPipeline::new(
            StubSource { response },
            ArtifactStore::new(root),
            ArtifactCache::new(true, 16),
            Metrics::new(),
        )
    }

    #[tokio::test]
    async fn miss_fetches_computes_and_stores() {
        let root = scratch_root();
        let pipeline = pipeline(StubResponse::Text(FIXTURE), &root);

        let reply = pipeline.get_loader("1ABC").await.unwrap();
        let text = match reply {
            LoaderReply::Artifact(text) => text,
            LoaderReply::Diagnostic(text) => panic!("expected artifact, got {text}"),
        };
        assert!(text.starts_with("// REMARK from stub://1ABC\n"));
        assert!(text.contains("var lines = [\n\"ATOM      1"));
        assert!(text.contains("var bond_pairs = [\n[0, 1]\n];"));
        assert!(text.contains("var max_length = "));

        let stored = ArtifactStore::new(&root)
            .read_chunks("1ABC")
            .await
            .unwrap()
            .expect("artifact should be persisted");
        assert_eq!(stored, text);
    }

    #[tokio::test]
    async fn stored_artifact_is_served_without_refetching() {
        let root = scratch_root();
        pipeline(StubResponse::Text(FIXTURE), &root)
            .get_loader("2DEF")
            .await
            .unwrap();

        // source now fails; the artifact must come from the store
        let cached = pipeline(StubResponse::HttpError, &root);
        let reply = cached.get_loader("2DEF").await.unwrap();
        let text = reply.into_text();
        assert!(text.starts_with(DATABASE_REMARK));
        assert!(text.contains("var bond_pairs"));
    }

    #[tokio::test]
    async fn repeated_request_hits_the_memory_cache() {
        let root = scratch_root();
        let pipeline = pipeline(StubResponse::Text(FIXTURE), &root);
        pipeline.get_loader("3GHI").await.unwrap();
        pipeline.get_loader("3GHI").await.unwrap();
        assert_eq!(pipeline.metrics.snapshot().memory_hits, 1);
        assert_eq!(pipeline.metrics.snapshot().artifacts_computed, 1);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_store_empty_and_later_retry_succeeds() {
        let root = scratch_root();
        let failing = pipeline(StubResponse::HttpError, &root);
        let reply = failing.get_loader("4JKL").await.unwrap();
        match reply {
            LoaderReply::Diagnostic(text) => {
                assert!(text.starts_with("// Downloading error"));
            }
            LoaderReply::Artifact(text) => panic!("expected diagnostic, got {text}"),
        }
        assert!(failing.store.read_chunks("4JKL").await.unwrap().is_none());
        assert_eq!(failing.metrics.snapshot().fetch_failures, 1);

        let retry = pipeline(StubResponse::Text(FIXTURE), &root);
        let reply = retry.get_loader("4JKL").await.unwrap();
        assert!(matches!(reply, LoaderReply::Artifact(_)));
        assert!(retry.store.read_chunks("4JKL").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn timeout_produces_its_own_diagnostic() {
        let root = scratch_root();
        let pipeline = pipeline(StubResponse::Timeout, &root);
        let text = pipeline.get_loader("5MNO").await.unwrap().into_text();
        assert!(text.starts_with("// Structure source did not answer"));
    }

    #[tokio::test]
    async fn unparseable_content_is_a_hard_failure() {
        let root = scratch_root();
        let pipeline = pipeline(StubResponse::Text("<html>not a structure</html>"), &root);
        let err = pipeline.get_loader("6PQR").await.unwrap_err();
        assert!(matches!(err, PipelineError::Malformed(_)));
        assert!(pipeline.store.read_chunks("6PQR").await.unwrap().is_none());
    }
}
