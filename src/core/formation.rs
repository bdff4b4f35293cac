use chrono::Utc;
use tracing::{debug, error, info, instrument};

use crate::error::MatchError;
use crate::models::{InsertOutcome, Match, UserPair};
use crate::services::SwipeStore;

/// Turn a reciprocal pair of likes into exactly one match
///
/// Idempotent and commutative in its arguments. Concurrent callers for the
/// same pair race on the store's uniqueness constraint; the loser re-reads
/// and returns the winner's match, so every caller sees the same id.
#[instrument(skip(store))]
pub async fn form_match<S>(store: &S, user_a: &str, user_b: &str) -> Result<Match, MatchError>
where
    S: SwipeStore + ?Sized,
{
    let pair = UserPair::new(user_a, user_b)?;
    let candidate = Match::new(&pair, Utc::now());

    match store.try_insert_match(&candidate).await? {
        InsertOutcome::Inserted => {
            info!(
                match_id = %candidate.id,
                low_id = %candidate.low_id,
                high_id = %candidate.high_id,
                "Match created"
            );
            Ok(candidate)
        }
        InsertOutcome::AlreadyExists => {
            let existing = store.find_match(&pair).await?.ok_or_else(|| {
                error!("Match insert for {} conflicted but no match is readable", pair);
                MatchError::Integrity(format!(
                    "match for {} reported as existing but could not be read",
                    pair
                ))
            })?;
            debug!("Match for {} already exists as {}", pair, existing.id);
            Ok(existing)
        }
    }
}
