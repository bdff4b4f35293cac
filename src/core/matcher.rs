use std::sync::Arc;

use tracing::instrument;

use crate::core::candidates::{retrieve_candidates, RetrievalOptions};
use crate::core::swipe::process_swipe;
use crate::error::MatchError;
use crate::models::{CandidatePage, MatchSummary, SwipeAction, SwipeResult};
use crate::services::MatchStore;

/// Entry point for the request layer
///
/// Holds no authoritative state of its own: every decision about which pairs
/// are matched is delegated to the store. Cheap to clone.
///
/// # Operations
/// 1. `candidates` - next page of eligible profiles for a user
/// 2. `swipe` - record a like/pass, forming a match on reciprocity
/// 3. `matches` - a user's matches, most recent first
#[derive(Clone)]
pub struct Matcher {
    store: Arc<dyn MatchStore>,
    options: RetrievalOptions,
}

impl Matcher {
    pub fn new(store: Arc<dyn MatchStore>, options: RetrievalOptions) -> Self {
        Self { store, options }
    }

    pub fn with_default_options(store: Arc<dyn MatchStore>) -> Self {
        Self::new(store, RetrievalOptions::default())
    }

    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    /// Next page of candidates; an empty page means none are left right now
    pub async fn candidates(
        &self,
        user_id: &str,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> Result<CandidatePage, MatchError> {
        retrieve_candidates(self.store.as_ref(), &self.options, user_id, cursor, limit).await
    }

    pub async fn swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        action: SwipeAction,
    ) -> Result<SwipeResult, MatchError> {
        process_swipe(self.store.as_ref(), actor_id, target_id, action).await
    }

    #[instrument(skip(self))]
    pub async fn matches(&self, user_id: &str) -> Result<Vec<MatchSummary>, MatchError> {
        let matches = self.store.matches_for(user_id).await?;

        matches
            .into_iter()
            .map(|m| {
                let other = m.other(user_id).ok_or_else(|| {
                    MatchError::Integrity(format!(
                        "match {} returned for {} does not involve them",
                        m.id, user_id
                    ))
                })?;
                Ok(MatchSummary {
                    match_id: m.id,
                    other_user_id: other.to_string(),
                    created_at: m.created_at,
                })
            })
            .collect()
    }

    pub async fn is_healthy(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Store health check failed: {}", e);
                false
            }
        }
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
