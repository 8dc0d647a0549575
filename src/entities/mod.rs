pub mod prelude;

pub mod cache_entries;
pub mod mission_progress;
pub mod users;
