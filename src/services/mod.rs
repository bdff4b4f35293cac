// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager, CachingStore};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{GeoIndex, MatchStore, ProfileSource, StoreError, SwipeStore};
