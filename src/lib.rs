//! PupMatch Algo - candidate retrieval and match formation for the PupMatch dating app
//!
//! Given a user, the engine returns a paged list of nearby profiles that fit
//! their preferences and that they have not already acted on. It records
//! like/pass swipes and forms exactly one match per pair of users who like
//! each other, however their requests interleave.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::{calculate_bounding_box, haversine_distance},
    Matcher, RetrievalOptions,
};
pub use error::MatchError;
pub use models::{
    Candidate, CandidatePage, Match, MatchSummary, Preferences, Profile, SwipeAction, SwipeResult,
};
pub use services::{MatchStore, MemoryStore, PostgresStore, StoreError};
