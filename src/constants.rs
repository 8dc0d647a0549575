pub mod cache {

    /// Every analytics read model lives under this prefix so one prefix
    /// delete invalidates all of them.
    pub const ANALYTICS_PREFIX: &str = "analytics:";

    pub const USER_STATS_KEY: &str = "analytics:users:stats";

    pub const MISSION_STATS_KEY: &str = "analytics:missions:stats";

    #[must_use]
    pub fn leaderboard_key(limit: u64) -> String {
        format!("analytics:leaderboard:{limit}")
    }

    #[must_use]
    pub fn performance_key(user_id: i32) -> String {
        format!("analytics:performance:{user_id}")
    }
}

pub mod limits {

    pub const DEFAULT_PAGE_LIMIT: u64 = 100;

    pub const MAX_PAGE_LIMIT: u64 = 1000;

    pub const DEFAULT_LEADERBOARD_LIMIT: u64 = 10;

    pub const MAX_LEADERBOARD_LIMIT: u64 = 100;

    pub const MIN_PASSWORD_LENGTH: usize = 8;

    pub const MIN_USERNAME_LENGTH: usize = 3;

    pub const MAX_USERNAME_LENGTH: usize = 50;
}
