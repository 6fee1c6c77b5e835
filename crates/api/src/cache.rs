use dashmap::DashMap;
use std::sync::Arc;

/// In-memory copy of assembled artifacts, keyed by structure id.
///
/// A shortcut past the chunk store: artifacts are immutable, so a stale
/// entry cannot exist, and losing the whole map costs one store read.
#[derive(Clone)]
pub struct ArtifactCache {
    artifacts: Arc<DashMap<String, String>>,
    max_entries: usize,
    enabled: bool,
}

impl ArtifactCache {
    pub fn new(enabled: bool, max_entries: usize) -> Self {
        Self {
            artifacts: Arc::new(DashMap::new()),
            max_entries,
            enabled,
        }
    }

    pub fn get(&self, structure_id: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.artifacts.get(structure_id).map(|r| r.value().clone())
    }

    pub fn set(&self, structure_id: &str, text: String) {
        if !self.enabled {
            return;
        }
        if self.artifacts.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .artifacts
                .iter()
                .take(self.max_entries / 4)
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.artifacts.remove(&key);
            }
        }
        self.artifacts.insert(structure_id.to_string(), text);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.enabled,
            artifacts_cached: self.artifacts.len(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub artifacts_cached: usize,
}
