//! # Campusdesk CLI
//!
//! Database seeding utilities for Campusdesk testing and development.
//!
//! Students are enrolled through the enrollment engine rather than inserted
//! directly, so seeded data satisfies the same capacity and counter rules as
//! live traffic.
//!
//! ## Usage
//!
//! ```ignore
//! use campusdesk_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3); // 3 organizations with defaults
//! seed_all(&pool, config).await?;
//! ```

pub mod seeder;
