use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::core::spatial::GridIndex;
use crate::error::MatchError;
use crate::models::{
    GeoPoint, InsertOutcome, Match, MatchEvent, NearbyProfile, Preferences, Profile, SwipeAction,
    SwipeHistory, UserId, UserPair,
};
use crate::services::store::{GeoIndex, MatchStore, ProfileSource, StoreError, SwipeStore};

/// Directed edges keyed by actor, then target
type EdgeMap = HashMap<UserId, HashMap<UserId, DateTime<Utc>>>;

#[derive(Debug, Default)]
struct MemoryState {
    profiles: HashMap<UserId, Profile>,
    preferences: HashMap<UserId, Preferences>,
    index: GridIndex,
    likes: EdgeMap,
    passes: EdgeMap,
    matches: HashMap<UserPair, Match>,
    events: Vec<MatchEvent>,
}

impl MemoryState {
    fn edges(&self, action: SwipeAction) -> &EdgeMap {
        match action {
            SwipeAction::Like => &self.likes,
            SwipeAction::Pass => &self.passes,
        }
    }

    fn edges_mut(&mut self, action: SwipeAction) -> &mut EdgeMap {
        match action {
            SwipeAction::Like => &mut self.likes,
            SwipeAction::Pass => &mut self.passes,
        }
    }
}

/// In-process backend for single-instance deployments and tests
///
/// The whole state sits behind one lock, which makes every trait call a
/// single atomic step: that lock is this backend's uniqueness constraint.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new(grid_cell_degrees: f64) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                index: GridIndex::new(grid_cell_degrees),
                ..MemoryState::default()
            }),
        }
    }

    /// Create or replace a profile and move it in the spatial index
    pub async fn upsert_profile(&self, profile: Profile) -> Result<(), MatchError> {
        profile.validate()?;

        let mut state = self.state.write().await;
        match profile.location {
            Some(point) => state.index.insert(&profile.user_id, point),
            None => {
                state.index.remove(&profile.user_id);
            }
        }
        state.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    pub async fn set_preferences(&self, preferences: Preferences) -> Result<(), MatchError> {
        preferences.validate()?;

        let mut state = self.state.write().await;
        if !state.profiles.contains_key(&preferences.user_id) {
            return Err(MatchError::ProfileNotFound(preferences.user_id));
        }
        state
            .preferences
            .insert(preferences.user_id.clone(), preferences);
        Ok(())
    }

    /// Delete a profile together with its preferences, swipes and matches
    pub async fn remove_profile(&self, user_id: &str) -> bool {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.profiles.remove(user_id).is_none() {
            return false;
        }

        state.preferences.remove(user_id);
        state.index.remove(user_id);
        for edges in [&mut state.likes, &mut state.passes] {
            edges.remove(user_id);
            for targets in edges.values_mut() {
                targets.remove(user_id);
            }
        }
        state.matches.retain(|pair, _| !pair.contains(user_id));
        // Events go with their match, as the outbox rows do in Postgres
        state
            .events
            .retain(|event| event.low_id != user_id && event.high_id != user_id);
        true
    }

    /// Match-created events in creation order
    pub async fn match_events(&self) -> Vec<MatchEvent> {
        self.state.read().await.events.clone()
    }

    /// Number of stored like or pass edges
    pub async fn swipe_count(&self, action: SwipeAction) -> usize {
        let state = self.state.read().await;
        state.edges(action).values().map(HashMap::len).sum()
    }

    pub async fn match_count(&self) -> usize {
        self.state.read().await.matches.len()
    }
}

#[async_trait]
impl ProfileSource for MemoryStore {
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.read().await.profiles.get(user_id).cloned())
    }

    async fn preferences(&self, user_id: &str) -> Result<Option<Preferences>, StoreError> {
        Ok(self.state.read().await.preferences.get(user_id).cloned())
    }
}

#[async_trait]
impl GeoIndex for MemoryStore {
    async fn within_radius(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NearbyProfile>, StoreError> {
        let state = self.state.read().await;

        let nearby = state
            .index
            .query(&center, radius_m)
            .into_iter()
            .filter_map(|(user_id, distance_m)| {
                let profile = state.profiles.get(&user_id)?;
                Some(NearbyProfile {
                    activity_level: state.preferences.get(&user_id).map(|p| p.activity_level),
                    name: profile.name.clone(),
                    age: profile.age,
                    bio: profile.bio.clone(),
                    user_id,
                    distance_m,
                })
            })
            .collect();

        Ok(nearby)
    }
}

#[async_trait]
impl SwipeStore for MemoryStore {
    async fn insert_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        action: SwipeAction,
    ) -> Result<InsertOutcome, StoreError> {
        let mut state = self.state.write().await;
        for user_id in [actor_id, target_id] {
            if !state.profiles.contains_key(user_id) {
                return Err(StoreError::MissingReference(user_id.to_string()));
            }
        }

        let targets = state
            .edges_mut(action)
            .entry(actor_id.to_string())
            .or_default();

        match targets.entry(target_id.to_string()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn like_exists(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .likes
            .get(actor_id)
            .is_some_and(|targets| targets.contains_key(target_id)))
    }

    async fn swipe_history(&self, user_id: &str) -> Result<SwipeHistory, StoreError> {
        let state = self.state.read().await;

        let targets = |edges: &EdgeMap| -> HashSet<UserId> {
            edges
                .get(user_id)
                .map(|targets| targets.keys().cloned().collect())
                .unwrap_or_default()
        };

        Ok(SwipeHistory {
            liked: targets(&state.likes),
            passed: targets(&state.passes),
            matched: state
                .matches
                .values()
                .filter_map(|m| m.other(user_id).map(str::to_string))
                .collect(),
        })
    }

    async fn try_insert_match(&self, new_match: &Match) -> Result<InsertOutcome, StoreError> {
        let pair = new_match.pair().map_err(|_| {
            StoreError::Corrupt(format!("match {} pairs a user with themselves", new_match.id))
        })?;
        if pair.low() != new_match.low_id {
            return Err(StoreError::Corrupt(format!(
                "match {} is not in canonical order",
                new_match.id
            )));
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        match state.matches.entry(pair) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(new_match.clone());
                state.events.push(MatchEvent::from(new_match));
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn find_match(&self, pair: &UserPair) -> Result<Option<Match>, StoreError> {
        Ok(self.state.read().await.matches.get(pair).cloned())
    }

    async fn matches_for(&self, user_id: &str) -> Result<Vec<Match>, StoreError> {
        let state = self.state.read().await;
        let mut matches: Vec<Match> = state
            .matches
            .iter()
            .filter(|(pair, _)| pair.contains(user_id))
            .map(|(_, m)| m.clone())
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matches)
    }
}

#[async_trait]
impl MatchStore for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, DistanceUnit};

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::default();
        for (id, lon) in [("a", 0.0), ("b", 0.05), ("c", 1.0)] {
            store
                .upsert_profile(Profile::new(id, id.to_uppercase(), 25).with_location(0.0, lon))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_insert_swipe_is_insert_if_absent() {
        let store = seeded().await;
        assert_eq!(
            store.insert_swipe("a", "b", SwipeAction::Like).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_swipe("a", "b", SwipeAction::Like).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        // A pass on the same pair is a separate fact
        assert_eq!(
            store.insert_swipe("a", "b", SwipeAction::Pass).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(store.swipe_count(SwipeAction::Like).await, 1);
        assert_eq!(store.swipe_count(SwipeAction::Pass).await, 1);
    }

    #[tokio::test]
    async fn test_insert_swipe_requires_profiles() {
        let store = seeded().await;
        let result = store.insert_swipe("a", "ghost", SwipeAction::Like).await;
        assert!(matches!(result, Err(StoreError::MissingReference(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_match_insert_records_event_once() {
        let store = seeded().await;
        let pair = UserPair::new("b", "a").unwrap();
        let first = Match::new(&pair, Utc::now());
        let second = Match::new(&pair, Utc::now());

        assert_eq!(store.try_insert_match(&first).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.try_insert_match(&second).await.unwrap(), InsertOutcome::AlreadyExists);
        assert_eq!(store.find_match(&pair).await.unwrap().unwrap().id, first.id);

        let events = store.match_events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].match_id, first.id);
    }

    #[tokio::test]
    async fn test_within_radius_joins_activity_level() {
        let store = seeded().await;
        store
            .set_preferences(
                Preferences::new("b", 18, 30, 5.0, DistanceUnit::Kilometers, ActivityLevel::High)
                    .unwrap(),
            )
            .await
            .unwrap();

        let nearby = store
            .within_radius(GeoPoint::new(0.0, 0.0), 10_000.0)
            .await
            .unwrap();
        let b = nearby.iter().find(|p| p.user_id == "b").unwrap();
        assert_eq!(b.activity_level, Some(ActivityLevel::High));
        assert!(nearby.iter().all(|p| p.user_id != "c"));
    }

    #[tokio::test]
    async fn test_profile_without_location_is_not_indexed() {
        let store = seeded().await;
        store.upsert_profile(Profile::new("b", "B", 25)).await.unwrap();
        let nearby = store
            .within_radius(GeoPoint::new(0.0, 0.0), 10_000.0)
            .await
            .unwrap();
        assert!(nearby.iter().all(|p| p.user_id != "b"));
    }

    #[tokio::test]
    async fn test_remove_profile_cascades() {
        let store = seeded().await;
        store.insert_swipe("a", "b", SwipeAction::Like).await.unwrap();
        store.insert_swipe("b", "a", SwipeAction::Like).await.unwrap();
        store.insert_swipe("c", "b", SwipeAction::Pass).await.unwrap();
        let pair = UserPair::new("a", "b").unwrap();
        store.try_insert_match(&Match::new(&pair, Utc::now())).await.unwrap();
        assert_eq!(store.match_events().await.len(), 1);

        assert!(store.remove_profile("b").await);
        assert!(!store.remove_profile("b").await);

        assert_eq!(store.swipe_count(SwipeAction::Like).await, 0);
        assert_eq!(store.swipe_count(SwipeAction::Pass).await, 0);
        assert_eq!(store.match_count().await, 0);
        assert!(store.match_events().await.is_empty());
        assert!(store.swipe_history("a").await.unwrap().liked.is_empty());
    }

    #[tokio::test]
    async fn test_set_preferences_requires_profile() {
        let store = MemoryStore::default();
        let prefs = Preferences::new("nobody", 18, 30, 5.0, DistanceUnit::Miles, ActivityLevel::Low)
            .unwrap();
        assert!(matches!(
            store.set_preferences(prefs).await,
            Err(MatchError::ProfileNotFound(_))
        ));
    }
}
