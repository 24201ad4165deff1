//! # Campusdesk Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`email`]: SMTP configuration for credential notifications
//! - [`enrollment`]: enrollment engine tuning (retry budget, default capacity, sweep interval)
//! - [`jwt`]: JWT verification configuration
//! - [`server`]: listener ports and observability toggle
//!
//! # Example
//!
//! ```ignore
//! use campusdesk_config::{CorsConfig, EmailConfig, EnrollmentConfig, JwtConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let enrollment_config = EnrollmentConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod enrollment;
pub mod jwt;
pub mod server;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use enrollment::EnrollmentConfig;
pub use jwt::JwtConfig;
pub use server::ServerConfig;

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.to_lowercase();
            v == "true" || v == "1"
        })
        .unwrap_or(default)
}
