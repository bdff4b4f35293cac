// Core algorithm exports
pub mod candidates;
pub mod cursor;
pub mod distance;
pub mod exclusion;
pub mod filters;
pub mod formation;
pub mod matcher;
pub mod spatial;
pub mod swipe;

pub use candidates::{rank_candidates, retrieve_candidates, PreferenceDefaults, RetrievalOptions};
pub use cursor::Cursor;
pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box, BoundingBox};
pub use exclusion::resolve_exclusions;
pub use filters::ActivityFilter;
pub use formation::form_match;
pub use matcher::Matcher;
pub use spatial::GridIndex;
pub use swipe::process_swipe;
