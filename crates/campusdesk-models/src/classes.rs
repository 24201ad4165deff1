//! Class models.

use crate::ids::{ClassId, OrganizationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A grade-level grouping, unique per `(organization_id, grade, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Class {
    pub id: ClassId,
    pub organization_id: OrganizationId,
    pub grade: String,
    pub name: String,
    /// Cached sum of the class's section counters.
    pub total_students: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
