//! API layer
//!
//! HTTP handlers for:
//! - Auth (register, login, switch)
//! - Profiles, characters and relations
//! - Feed, posts, comments, trends
//! - Moderator dashboard
//! - Metrics (Prometheus)

mod admin;
mod auth;
mod converters;
mod dto;
pub mod metrics;
mod posts;
mod profiles;

pub use converters::*;
pub use dto::*;

pub use admin::{admin_router, reporting_router};
pub use auth::auth_router;
pub use metrics::metrics_router;
pub use posts::posts_router;
pub use profiles::profiles_router;
