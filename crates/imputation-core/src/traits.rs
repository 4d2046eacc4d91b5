use crate::ImputationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One structured hit from a search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// What a search backend may hand back: either a single opaque text blob or
/// a ranked list of structured hits. The engine handles both shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SearchResponse {
    Text(String),
    Structured(Vec<SearchHit>),
}

/// Generic text-search capability injected into the imputation engine.
///
/// Timeouts and retries are the provider's concern; the engine treats every
/// failure as a per-query skip, never a session abort.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResponse, ImputationError>;

    /// Whether the backing capability is configured at all. Decided once at
    /// startup; the engine only ever sees present-or-absent.
    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in used when no search capability is configured. Imputation then
/// fails gracefully field by field instead of erroring out.
pub struct NullSearchProvider;

#[async_trait]
impl SearchProvider for NullSearchProvider {
    async fn search(&self, _query: &str) -> Result<SearchResponse, ImputationError> {
        Err(ImputationError::SearchUnavailable(
            "search tool not available".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}
