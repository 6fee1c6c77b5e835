use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    pub deadline_secs: u64,
    /// Fetched content above this length is rejected before any derivation.
    pub max_content_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub artifact_root: String,
    pub view_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
            },
            source: SourceConfig {
                base_url: "https://files.rcsb.org/download".to_string(),
                deadline_secs: 5,
                max_content_len: store::BLOCK_SIZE,
            },
            storage: StorageConfig {
                artifact_root: "data/artifacts".to_string(),
                view_root: "data/views".to_string(),
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 256,
            },
        }
    }
}
