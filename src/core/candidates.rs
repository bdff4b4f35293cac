use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::cursor::{compare_positions, Cursor};
use crate::core::exclusion::resolve_exclusions;
use crate::core::filters::{matches_preferences, ActivityFilter};
use crate::error::MatchError;
use crate::models::{
    ActivityLevel, Candidate, CandidatePage, DistanceUnit, NearbyProfile, Preferences, UserId,
    MAX_AGE,
};
use crate::services::MatchStore;

/// Preferences applied to a requester that has none on record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreferenceDefaults {
    #[serde(default)]
    pub min_age: u8,
    #[serde(default = "default_max_age")]
    pub max_age: u8,
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default = "default_distance_unit")]
    pub distance_unit: DistanceUnit,
    #[serde(default = "default_activity_level")]
    pub activity_level: ActivityLevel,
}

fn default_max_age() -> u8 { MAX_AGE }
fn default_max_distance() -> f64 { 25.0 }
fn default_distance_unit() -> DistanceUnit { DistanceUnit::Miles }
fn default_activity_level() -> ActivityLevel { ActivityLevel::Medium }

impl Default for PreferenceDefaults {
    fn default() -> Self {
        Self {
            min_age: 0,
            max_age: default_max_age(),
            max_distance: default_max_distance(),
            distance_unit: default_distance_unit(),
            activity_level: default_activity_level(),
        }
    }
}

impl PreferenceDefaults {
    pub fn for_user(&self, user_id: &str) -> Result<Preferences, MatchError> {
        Preferences::new(
            user_id,
            self.min_age,
            self.max_age,
            self.max_distance,
            self.distance_unit,
            self.activity_level,
        )
    }
}

/// Knobs for candidate retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    /// Fail with `PreferencesMissing` instead of falling back to defaults
    pub strict_preferences: bool,
    pub default_preferences: PreferenceDefaults,
    pub activity_filter: ActivityFilter,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            strict_preferences: false,
            default_preferences: PreferenceDefaults::default(),
            activity_filter: ActivityFilter::Any,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl RetrievalOptions {
    /// Requested page size clamped to `[1, max_page_size]`
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        let max = self.max_page_size.max(1);
        requested.unwrap_or(self.default_page_size).clamp(1, max)
    }
}

/// Load the requester, search their radius and return the next page
///
/// # Pipeline
/// 1. Requester profile and preferences (defaults unless strict)
/// 2. Radius search around the requester's location
/// 3. Age and activity filters from the requester's preferences
/// 4. Exclusion-set subtraction
/// 5. Order by (distance, identity) and resume strictly after the cursor
#[instrument(skip(store, options, cursor))]
pub async fn retrieve_candidates<S>(
    store: &S,
    options: &RetrievalOptions,
    user_id: &str,
    cursor: Option<&str>,
    page_size: Option<usize>,
) -> Result<CandidatePage, MatchError>
where
    S: MatchStore + ?Sized,
{
    let after = cursor.map(Cursor::decode).transpose()?;
    let page_size = options.page_size(page_size);

    let profile = store
        .profile(user_id)
        .await?
        .ok_or_else(|| MatchError::ProfileNotFound(user_id.to_string()))?;

    let preferences = match store.preferences(user_id).await? {
        Some(preferences) => preferences,
        None if options.strict_preferences => {
            return Err(MatchError::PreferencesMissing(user_id.to_string()));
        }
        None => {
            debug!("No preferences for {}, using defaults", user_id);
            options.default_preferences.for_user(user_id)?
        }
    };

    let origin = profile
        .location
        .ok_or_else(|| MatchError::LocationRequired(user_id.to_string()))?;

    let radius_m = preferences.radius_meters();
    let nearby = store.within_radius(origin, radius_m).await?;
    debug!("{} profiles within {:.0}m of {}", nearby.len(), radius_m, user_id);

    let excluded = resolve_exclusions(store, user_id).await?;

    Ok(rank_candidates(
        nearby,
        &preferences,
        &excluded,
        options,
        after.as_ref(),
        page_size,
    ))
}

/// Filter, order and paginate radius hits
///
/// Pure and deterministic: the same inputs always yield the same page.
pub fn rank_candidates(
    nearby: Vec<NearbyProfile>,
    preferences: &Preferences,
    excluded: &HashSet<UserId>,
    options: &RetrievalOptions,
    after: Option<&Cursor>,
    page_size: usize,
) -> CandidatePage {
    let fallback = options.default_preferences.activity_level;

    let mut eligible: Vec<NearbyProfile> = nearby
        .into_iter()
        .filter(|candidate| !excluded.contains(&candidate.user_id))
        .filter(|candidate| {
            matches_preferences(candidate, preferences, options.activity_filter, fallback)
        })
        .filter(|candidate| {
            after.map_or(true, |cursor| {
                cursor.precedes(candidate.distance_m, &candidate.user_id)
            })
        })
        .collect();

    eligible.sort_by(|a, b| compare_positions(a.distance_m, &a.user_id, b.distance_m, &b.user_id));
    eligible.truncate(page_size);

    let next_cursor = eligible
        .last()
        .map(|last| Cursor::new(last.distance_m, last.user_id.clone()).encode());

    let unit = preferences.distance_unit;
    let candidates = eligible
        .into_iter()
        .map(|profile| Candidate {
            distance: unit.from_meters(profile.distance_m),
            id: profile.user_id,
            name: profile.name,
            age: profile.age,
            bio: profile.bio,
            activity_level: profile.activity_level,
            distance_m: profile.distance_m,
        })
        .collect();

    CandidatePage {
        candidates,
        next_cursor,
    }
}
