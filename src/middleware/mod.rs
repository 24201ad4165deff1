//! Middleware and extractors for authentication and authorization.
//!
//! - [`auth`]: the [`AuthUser`](auth::AuthUser) extractor, which verifies the bearer token
//! - [`role`]: extractors that admit only roles holding a given capability
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::role::RequireEnrollStudents;
//!
//! async fn enroll(caller: RequireEnrollStudents) -> Result<impl IntoResponse, AppError> {
//!     let scope = caller.scope()?;
//!     // ...
//! }
//! ```

pub mod auth;
pub mod role;
