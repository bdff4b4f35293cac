use std::collections::HashSet;

use tracing::debug;

use crate::models::{SwipeHistory, UserId};
use crate::services::{StoreError, SwipeStore};

/// Identities that must never be offered to `user_id` as candidates:
/// the user, everyone they liked or passed, and everyone they matched with.
///
/// The history comes from a single consistent read, so a partially committed
/// swipe can delay an exclusion but never fabricate one.
pub async fn resolve_exclusions<S>(
    store: &S,
    user_id: &str,
) -> Result<HashSet<UserId>, StoreError>
where
    S: SwipeStore + ?Sized,
{
    let history = store.swipe_history(user_id).await?;
    let excluded = exclusion_set(user_id, history);

    debug!("Excluding {} identities for user {}", excluded.len(), user_id);

    Ok(excluded)
}

/// Union of self with everything in the user's swipe history
pub fn exclusion_set(user_id: &str, history: SwipeHistory) -> HashSet<UserId> {
    let SwipeHistory {
        liked,
        passed,
        matched,
    } = history;

    let mut excluded = liked;
    excluded.extend(passed);
    excluded.extend(matched);
    excluded.insert(user_id.to_string());
    excluded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_set_is_union_with_self() {
        let history = SwipeHistory {
            liked: ["b".to_string()].into_iter().collect(),
            passed: ["c".to_string()].into_iter().collect(),
            matched: ["b".to_string(), "d".to_string()].into_iter().collect(),
        };

        let excluded = exclusion_set("a", history);
        let mut sorted: Vec<_> = excluded.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_empty_history_excludes_only_self() {
        let excluded = exclusion_set("a", SwipeHistory::default());
        assert_eq!(excluded.len(), 1);
        assert!(excluded.contains("a"));
    }
}
