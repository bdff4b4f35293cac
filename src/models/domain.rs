use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MatchError;

/// Opaque, stable user identity supplied by the authentication layer
pub type UserId = String;

/// Upper bound accepted for profile ages and age preferences
pub const MAX_AGE: u8 = 120;

const METERS_PER_MILE: f64 = 1609.344;
const METERS_PER_KILOMETER: f64 = 1000.0;

/// WGS84 point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Unit a user expresses their maximum distance in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "distance_unit", rename_all = "lowercase")]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    /// Convert a distance in this unit to meters
    #[inline]
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            DistanceUnit::Miles => value * METERS_PER_MILE,
            DistanceUnit::Kilometers => value * METERS_PER_KILOMETER,
        }
    }

    /// Convert meters to this unit
    #[inline]
    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Miles => meters / METERS_PER_MILE,
            DistanceUnit::Kilometers => meters / METERS_PER_KILOMETER,
        }
    }
}

/// Ordered activity level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "activity_level", rename_all = "lowercase")]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

impl ActivityLevel {
    /// Position in the low < medium < high ordering
    pub fn rank(self) -> u8 {
        match self {
            ActivityLevel::Low => 0,
            ActivityLevel::Medium => 1,
            ActivityLevel::High => 2,
        }
    }
}

/// Profile fields the matching engine reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub name: String,
    pub age: u8,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: impl Into<UserId>, name: impl Into<String>, age: u8) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            age,
            bio: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(GeoPoint::new(latitude, longitude));
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    /// Reject records the store must never hold
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.user_id.is_empty() {
            return Err(MatchError::Validation("user id must not be empty".to_string()));
        }
        if self.age > MAX_AGE {
            return Err(MatchError::Validation(format!(
                "age {} exceeds maximum of {}",
                self.age, MAX_AGE
            )));
        }
        if let Some(location) = &self.location {
            if !location.is_valid() {
                return Err(MatchError::Validation(format!(
                    "location ({}, {}) is out of range",
                    location.latitude, location.longitude
                )));
            }
        }
        Ok(())
    }
}

/// Matching preferences, one per profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "minAge")]
    pub min_age: u8,
    #[serde(rename = "maxAge")]
    pub max_age: u8,
    #[serde(rename = "maxDistance")]
    pub max_distance: f64,
    #[serde(rename = "distanceUnit")]
    pub distance_unit: DistanceUnit,
    #[serde(rename = "activityLevel")]
    pub activity_level: ActivityLevel,
}

impl Preferences {
    /// Build preferences, enforcing `min_age <= max_age` and a positive distance
    pub fn new(
        user_id: impl Into<UserId>,
        min_age: u8,
        max_age: u8,
        max_distance: f64,
        distance_unit: DistanceUnit,
        activity_level: ActivityLevel,
    ) -> Result<Self, MatchError> {
        let preferences = Self {
            user_id: user_id.into(),
            min_age,
            max_age,
            max_distance,
            distance_unit,
            activity_level,
        };
        preferences.validate()?;
        Ok(preferences)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.min_age > self.max_age {
            return Err(MatchError::Validation(format!(
                "min_age {} is greater than max_age {}",
                self.min_age, self.max_age
            )));
        }
        if self.max_age > MAX_AGE {
            return Err(MatchError::Validation(format!(
                "max_age {} exceeds maximum of {}",
                self.max_age, MAX_AGE
            )));
        }
        if !self.max_distance.is_finite() || self.max_distance <= 0.0 {
            return Err(MatchError::Validation(format!(
                "max_distance must be a positive number, got {}",
                self.max_distance
            )));
        }
        Ok(())
    }

    /// Search radius in meters
    #[inline]
    pub fn radius_meters(&self) -> f64 {
        self.distance_unit.to_meters(self.max_distance)
    }

    #[inline]
    pub fn accepts_age(&self, age: u8) -> bool {
        age >= self.min_age && age <= self.max_age
    }
}

/// Binary swipe decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Pass,
}

impl fmt::Display for SwipeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwipeAction::Like => write!(f, "like"),
            SwipeAction::Pass => write!(f, "pass"),
        }
    }
}

impl FromStr for SwipeAction {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(SwipeAction::Like),
            "pass" => Ok(SwipeAction::Pass),
            other => Err(MatchError::Validation(format!(
                "action must be one of: like, pass (got {})",
                other
            ))),
        }
    }
}

/// Unordered pair of distinct users stored as (low, high) by byte-wise order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserPair {
    low: UserId,
    high: UserId,
}

impl UserPair {
    pub fn new(a: &str, b: &str) -> Result<Self, MatchError> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Ok(Self {
                low: a.to_string(),
                high: b.to_string(),
            }),
            std::cmp::Ordering::Greater => Ok(Self {
                low: b.to_string(),
                high: a.to_string(),
            }),
            std::cmp::Ordering::Equal => Err(MatchError::InvalidTarget),
        }
    }

    pub fn low(&self) -> &str {
        &self.low
    }

    pub fn high(&self) -> &str {
        &self.high
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.low == user_id || self.high == user_id
    }
}

impl fmt::Display for UserPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}

/// Mutual match between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub low_id: UserId,
    pub high_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn new(pair: &UserPair, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            low_id: pair.low().to_string(),
            high_id: pair.high().to_string(),
            created_at,
        }
    }

    pub fn pair(&self) -> Result<UserPair, MatchError> {
        UserPair::new(&self.low_id, &self.high_id)
    }

    /// The participant that is not `user_id`
    pub fn other(&self, user_id: &str) -> Option<&str> {
        if self.low_id == user_id {
            Some(&self.high_id)
        } else if self.high_id == user_id {
            Some(&self.low_id)
        } else {
            None
        }
    }
}

/// Fact emitted once per created match for the messaging collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub match_id: Uuid,
    pub low_id: UserId,
    pub high_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<&Match> for MatchEvent {
    fn from(value: &Match) -> Self {
        Self {
            match_id: value.id,
            low_id: value.low_id.clone(),
            high_id: value.high_id.clone(),
            created_at: value.created_at,
        }
    }
}

/// Profile returned by a radius query, with its exact distance from the origin
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyProfile {
    pub user_id: UserId,
    pub name: String,
    pub age: u8,
    pub bio: Option<String>,
    pub activity_level: Option<ActivityLevel>,
    pub distance_m: f64,
}

/// Everything a user has already acted on, read at a single consistency point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwipeHistory {
    pub liked: HashSet<UserId>,
    pub passed: HashSet<UserId>,
    pub matched: HashSet<UserId>,
}

/// Outcome of an insert-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Candidate offered to a requesting user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: UserId,
    pub name: String,
    pub age: u8,
    pub bio: Option<String>,
    #[serde(rename = "activityLevel")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(rename = "distanceM")]
    pub distance_m: f64,
    /// Distance in the requester's preferred unit
    pub distance: f64,
}

/// One page of candidates
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePage {
    pub candidates: Vec<Candidate>,
    pub next_cursor: Option<String>,
}

/// Outcome of a swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeResult {
    pub matched: bool,
    #[serde(rename = "matchId", skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
}

impl SwipeResult {
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            match_id: None,
        }
    }

    pub fn matched(match_id: Uuid) -> Self {
        Self {
            matched: true,
            match_id: Some(match_id),
        }
    }
}

/// A match as seen from one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
    #[serde(rename = "otherUserId")]
    pub other_user_id: UserId,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
