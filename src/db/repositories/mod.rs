pub mod cache;
pub mod mission;
pub mod user;
