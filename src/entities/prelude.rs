pub use super::cache_entries::Entity as CacheEntries;
pub use super::mission_progress::Entity as MissionProgress;
pub use super::users::Entity as Users;
