pub mod tokens;
pub use tokens::{IssuedToken, TokenAuthority, TokenError};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, require_active, require_admin};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{RegisterUser, UpdateUser, UserError, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod guild_service;
pub mod guild_service_impl;
pub use guild_service::{CompletionOutcome, GuildError, GuildService, ProgressUpdate};
pub use guild_service_impl::SeaOrmGuildService;

pub mod analytics_service;
pub mod analytics_service_impl;
pub use analytics_service::{
    AnalyticsError, AnalyticsService, Leaderboard, MissionStatsReport, UserPerformance, UserStats,
};
pub use analytics_service_impl::SeaOrmAnalyticsService;
