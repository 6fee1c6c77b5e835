use regex::Regex;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch timed out after {deadline_secs}s")]
    Timeout { deadline_secs: u64 },
    #[error("source returned status {status}")]
    Http { status: reqwest::StatusCode },
    #[error("content of {len} exceeds the {limit} limit")]
    TooLarge { len: usize, limit: usize },
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Supplier of raw structure text for an accession.
///
/// The production implementation talks to RCSB; tests substitute stubs.
pub trait StructureSource {
    fn fetch_structure(
        &self,
        structure_id: &str,
    ) -> impl std::future::Future<Output = Result<String, FetchError>> + Send;

    /// Human-readable origin of the structure text, used for provenance
    /// remarks in the served artifact.
    fn source_url(&self, structure_id: &str) -> String;
}

pub struct RcsbClient {
    base_url: String,
    deadline: Duration,
    max_content_len: usize,
    client: reqwest::Client,
}

impl RcsbClient {
    pub fn new(base_url: String, deadline_secs: u64, max_content_len: usize) -> Self {
        Self {
            base_url,
            deadline: Duration::from_secs(deadline_secs),
            max_content_len,
            client: reqwest::Client::new(),
        }
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                deadline_secs: self.deadline.as_secs(),
            }
        } else {
            FetchError::Transport(error)
        }
    }
}

impl StructureSource for RcsbClient {
    async fn fetch_structure(&self, structure_id: &str) -> Result<String, FetchError> {
        let url = self.source_url(structure_id);
        let response = self
            .client
            .get(&url)
            .timeout(self.deadline)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status(),
            });
        }
        if let Some(len) = response.content_length() {
            if len as usize > self.max_content_len {
                return Err(FetchError::TooLarge {
                    len: len as usize,
                    limit: self.max_content_len,
                });
            }
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        if text.len() > self.max_content_len {
            return Err(FetchError::TooLarge {
                len: text.len(),
                limit: self.max_content_len,
            });
        }
        Ok(text)
    }

    fn source_url(&self, structure_id: &str) -> String {
        format!("{}/{}.pdb", self.base_url, structure_id)
    }
}

/// Canonicalize a raw accession: trimmed, shape-checked (one digit then
/// three alphanumerics), uppercased. Anything else is rejected before it
/// can reach the source or name a store directory.
pub fn normalize_structure_id(raw: &str) -> Option<String> {
    let candidate = raw.trim();
    let re = Regex::new(r"^[0-9][A-Za-z0-9]{3}$").unwrap();
    if re.is_match(candidate) {
        Some(candidate.to_uppercase())
    } else {
        None
    }
}
