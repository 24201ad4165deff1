//! # Campusdesk Core
//!
//! Core types shared by every Campusdesk crate:
//!
//! - [`errors`]: the HTTP-facing [`AppError`] with JSON response conversion
//! - [`roles`]: the closed [`Role`] enumeration and its capability table
//! - [`password`]: password hashing and initial-credential generation
//!
//! # Example
//!
//! ```ignore
//! use campusdesk_core::{AppError, Capability, Role};
//!
//! if !Role::Teacher.allows(Capability::EnrollStudents) {
//!     return Err(AppError::forbidden("Teachers cannot enroll students"));
//! }
//! ```

pub mod errors;
pub mod password;
pub mod roles;

pub use errors::AppError;
pub use password::{generate_password, hash_password, hash_password_with_cost, verify_password};
pub use roles::{Capability, ParseRoleError, Role};
