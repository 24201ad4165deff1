//! # Campusdesk Auth
//!
//! JWT claims and verification. Every request carries a token whose claims
//! name the caller, their [`Role`](campusdesk_core::Role) and their
//! organization.
//!
//! ```ignore
//! use campusdesk_auth::verify_token;
//!
//! let claims = verify_token(&token, &jwt_config)?;
//! println!("{} acting as {}", claims.sub, claims.role);
//! ```

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
