// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ActivityLevel, Candidate, CandidatePage, DistanceUnit, GeoPoint, InsertOutcome, Match,
    MatchEvent, MatchSummary, NearbyProfile, Preferences, Profile, SwipeAction,
    SwipeHistory, SwipeResult, UserId, UserPair, MAX_AGE,
};
pub use requests::{CandidatesQuery, MatchesQuery, SwipeRequest};
pub use responses::{CandidatesResponse, ErrorResponse, HealthResponse, MatchesResponse};
