//! Request guards for the authenticated API.

pub mod auth;
pub mod feature_gate;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthUser};
pub use feature_gate::{require_feature, Feature};
pub use rate_limit::rate_limit_middleware;
