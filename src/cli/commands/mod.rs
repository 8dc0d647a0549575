mod admin;
mod rank;

pub use admin::cmd_create_admin;
pub use rank::cmd_rank;
