//! Storage capability interface.
//!
//! The engine depends only on these traits. One implementation is chosen at
//! process start; uniqueness of likes, passes and matches is enforced by the
//! implementation's atomic insert-if-absent, never by the engine.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    GeoPoint, InsertOutcome, Match, NearbyProfile, Preferences, Profile, SwipeAction,
    SwipeHistory, UserPair,
};

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Referenced profile does not exist: {0}")]
    MissingReference(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Timeouts and lost connections; the whole operation may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::SqlxError(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

/// Profile and preference records owned by the profile-data collaborator
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn preferences(&self, user_id: &str) -> Result<Option<Preferences>, StoreError>;
}

/// Radius search over profile locations
#[async_trait]
pub trait GeoIndex: Send + Sync {
    /// All located profiles within `radius_m` meters of `center`, unordered
    async fn within_radius(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NearbyProfile>, StoreError>;
}

/// Like, pass and match persistence
#[async_trait]
pub trait SwipeStore: Send + Sync {
    /// Record a directed like or pass; existing edges are left untouched
    async fn insert_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        action: SwipeAction,
    ) -> Result<InsertOutcome, StoreError>;

    /// Read from the write path, never from a replica
    async fn like_exists(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError>;

    /// Liked, passed and matched identities for `user_id` from one consistent read
    async fn swipe_history(&self, user_id: &str) -> Result<SwipeHistory, StoreError>;

    /// Insert the match unless one already exists for its pair. A fresh insert
    /// records the match-created event in the same atomic unit.
    async fn try_insert_match(&self, new_match: &Match) -> Result<InsertOutcome, StoreError>;

    async fn find_match(&self, pair: &UserPair) -> Result<Option<Match>, StoreError>;

    /// Matches involving `user_id`, most recent first
    async fn matches_for(&self, user_id: &str) -> Result<Vec<Match>, StoreError>;
}

/// Everything the engine needs from a backend
#[async_trait]
pub trait MatchStore: ProfileSource + GeoIndex + SwipeStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
