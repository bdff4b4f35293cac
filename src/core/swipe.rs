use tracing::{debug, error, instrument};

use crate::core::formation::form_match;
use crate::error::MatchError;
use crate::models::{InsertOutcome, SwipeAction, SwipeResult, UserPair};
use crate::services::{MatchStore, StoreError};

/// Record a like or pass and form a match when the like is reciprocated
///
/// Repeating a swipe is safe: the edge is not inserted twice and the
/// `matched` outcome is recomputed from current state rather than cached.
#[instrument(skip(store))]
pub async fn process_swipe<S>(
    store: &S,
    actor_id: &str,
    target_id: &str,
    action: SwipeAction,
) -> Result<SwipeResult, MatchError>
where
    S: MatchStore + ?Sized,
{
    if actor_id == target_id {
        return Err(MatchError::InvalidTarget);
    }

    // Unknown profiles surface through the store's referential check
    let outcome = match store.insert_swipe(actor_id, target_id, action).await {
        Ok(outcome) => outcome,
        Err(StoreError::MissingReference(user_id)) => {
            return Err(MatchError::ProfileNotFound(user_id));
        }
        Err(e) => return Err(e.into()),
    };

    if outcome == InsertOutcome::AlreadyExists {
        debug!("Duplicate {} from {} to {}", action, actor_id, target_id);
    }

    if action == SwipeAction::Pass {
        return Ok(SwipeResult::unmatched());
    }

    if store.like_exists(target_id, actor_id).await? {
        let formed = form_match(store, actor_id, target_id).await?;
        return Ok(SwipeResult::matched(formed.id));
    }

    // With no reverse like seen, a match can only come from a concurrent like
    let pair = UserPair::new(actor_id, target_id)?;
    let Some(existing) = store.find_match(&pair).await? else {
        return Ok(SwipeResult::unmatched());
    };

    // The other side may have liked and matched between the two reads
    if store.like_exists(target_id, actor_id).await? {
        debug!("Match {} for {} formed concurrently", existing.id, pair);
        return Ok(SwipeResult::matched(existing.id));
    }

    error!(
        match_id = %existing.id,
        "Match for {} exists without a like from {}",
        pair,
        target_id
    );
    Err(MatchError::Integrity(format!(
        "match {} exists without a like from {} to {}",
        existing.id, target_id, actor_id
    )))
}
