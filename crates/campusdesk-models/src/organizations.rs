//! Organization (tenant) models.

use crate::ids::OrganizationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Root tenant. The `total_*` fields are cached counters owned by the
/// stats reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub default_section_capacity: Option<i32>,
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_classes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values republished onto an organization by the reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrganizationCounters {
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_classes: i64,
}

impl Organization {
    pub fn counters(&self) -> OrganizationCounters {
        OrganizationCounters {
            total_students: self.total_students,
            total_teachers: self.total_teachers,
            total_classes: self.total_classes,
        }
    }
}
