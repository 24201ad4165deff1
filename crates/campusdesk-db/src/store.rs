//! Postgres-backed enrollment store.
//!
//! Membership lives in `section_members`. The writes that must observe a
//! consistent membership size (append, capacity change, section deletion)
//! lock the section row with `SELECT ... FOR UPDATE` and count members in a
//! second statement, so under READ COMMITTED the count sees every append
//! committed by the previous lock holder.

use async_trait::async_trait;
use campusdesk_core::Role;
use campusdesk_enrollment::{
    AppendOutcome, CapacityUpdate, EnrollmentStore, SectionRemoval, StoreError,
};
use campusdesk_models::classes::Class;
use campusdesk_models::ids::{ClassId, OrganizationId, SectionId, UserId};
use campusdesk_models::organizations::{Organization, OrganizationCounters};
use campusdesk_models::sections::{NewSection, Section};
use campusdesk_models::users::{NewStudent, User};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

macro_rules! select_sections {
    ($tail:literal) => {
        concat!(
            "SELECT s.id, s.class_id, s.organization_id, s.name, s.max_students, s.teacher_id, ",
            "(SELECT COUNT(*) FROM section_members m WHERE m.section_id = s.id)::int4 AS member_count, ",
            "s.current_student_count, s.available_seats, s.deleted_at, s.created_at, s.updated_at ",
            "FROM sections s ",
            $tail
        )
    };
}

macro_rules! select_users {
    ($tail:literal) => {
        concat!(
            "SELECT id, organization_id, first_name, last_name, email, role, section_id, ",
            "password_hash, deleted_at, created_at, updated_at FROM users ",
            $tail
        )
    };
}

const SELECT_ORGANIZATIONS: &str = "SELECT id, name, default_section_capacity, total_students, \
     total_teachers, total_classes, created_at, updated_at FROM organizations";

const SELECT_CLASSES: &str =
    "SELECT id, organization_id, grade, name, total_students, created_at, updated_at FROM classes";

/// Translates driver errors into the store's error vocabulary.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}

#[derive(Clone)]
pub struct PgEnrollmentStore {
    pool: PgPool,
}

impl PgEnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool.begin().await.map_err(map_sqlx_error)
    }

    /// Locks the active section row for the rest of the transaction and
    /// returns its stored limit.
    async fn lock_section(
        tx: &mut Transaction<'static, Postgres>,
        id: SectionId,
    ) -> Result<Option<i32>, StoreError> {
        sqlx::query_scalar::<_, i32>(
            "SELECT max_students FROM sections WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_members(
        tx: &mut Transaction<'static, Postgres>,
        id: SectionId,
    ) -> Result<i32, StoreError> {
        sqlx::query_scalar::<_, i32>(
            "SELECT COUNT(*)::int4 FROM section_members WHERE section_id = $1",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    async fn get_organization(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>, StoreError> {
        sqlx::query_as::<_, Organization>(&format!("{SELECT_ORGANIZATIONS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, StoreError> {
        sqlx::query_as::<_, Organization>(&format!("{SELECT_ORGANIZATIONS} ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn get_class(&self, id: ClassId) -> Result<Option<Class>, StoreError> {
        sqlx::query_as::<_, Class>(&format!("{SELECT_CLASSES} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_classes(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Class>, StoreError> {
        sqlx::query_as::<_, Class>(&format!(
            "{SELECT_CLASSES} WHERE organization_id = $1 ORDER BY grade, name"
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn get_class_with_sections(
        &self,
        id: ClassId,
    ) -> Result<Option<(Class, Vec<Section>)>, StoreError> {
        let Some(class) = self.get_class(id).await? else {
            return Ok(None);
        };

        let sections = sqlx::query_as::<_, Section>(select_sections!(
            "WHERE s.class_id = $1 AND s.deleted_at IS NULL ORDER BY s.name"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Some((class, sections)))
    }

    async fn get_section(&self, id: SectionId) -> Result<Option<Section>, StoreError> {
        sqlx::query_as::<_, Section>(select_sections!(
            "WHERE s.id = $1 AND s.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn section_members(&self, id: SectionId) -> Result<Vec<UserId>, StoreError> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT student_id FROM section_members WHERE section_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(select_users!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_teachers(&self, organization_id: OrganizationId) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE organization_id = $1 AND role = $2 AND deleted_at IS NULL",
        )
        .bind(organization_id)
        .bind(Role::Teacher.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_students(&self, organization_id: OrganizationId) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, User>(select_users!(
            "WHERE organization_id = $1 AND role = $2 AND deleted_at IS NULL ORDER BY created_at"
        ))
        .bind(organization_id)
        .bind(Role::Student.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    #[instrument(skip(self))]
    async fn conditional_append_member(
        &self,
        section_id: SectionId,
        student_id: UserId,
        max_size: i32,
    ) -> Result<AppendOutcome, StoreError> {
        // Early returns drop the transaction, which rolls it back and
        // releases the row lock.
        let mut tx = self.begin().await?;

        let Some(max_students) = Self::lock_section(&mut tx, section_id).await? else {
            return Ok(AppendOutcome::SectionUnavailable);
        };

        let already_member = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM section_members WHERE section_id = $1 AND student_id = $2)",
        )
        .bind(section_id)
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if already_member {
            return Ok(AppendOutcome::AlreadyMember);
        }

        let size = Self::count_members(&mut tx, section_id).await?;
        if size >= max_students.min(max_size) {
            return Ok(AppendOutcome::Full { size, max_students });
        }

        sqlx::query(
            "INSERT INTO section_members (section_id, student_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(section_id)
        .bind(student_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(AppendOutcome::Appended)
    }

    async fn remove_member(
        &self,
        section_id: SectionId,
        student_id: UserId,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM section_members WHERE section_id = $1 AND student_id = $2")
                .bind(section_id)
                .bind(student_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, student), fields(email = %student.email))]
    async fn create_student(&self, student: NewStudent) -> Result<User, StoreError> {
        let email = student.email.clone();
        sqlx::query_as::<_, User>(
            "INSERT INTO users (organization_id, section_id, first_name, last_name, email, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, organization_id, first_name, last_name, email, role, section_id, \
             password_hash, deleted_at, created_at, updated_at",
        )
        .bind(student.organization_id)
        .bind(student.section_id)
        .bind(student.first_name)
        .bind(student.last_name)
        .bind(student.email)
        .bind(Role::Student.as_str())
        .bind(student.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict(format!("a user with email {email} already exists"))
            }
            other => other,
        })
    }

    async fn delete_student(&self, id: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1 AND role = $2")
            .bind(id)
            .bind(Role::Student.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn soft_delete_student(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), section_id = NULL, updated_at = NOW() \
             WHERE id = $1 AND role = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Role::Student.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_student_section(
        &self,
        student_id: UserId,
        section_id: SectionId,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET section_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(student_id)
                .bind(section_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Database(format!(
                "student {student_id} does not exist"
            )));
        }
        Ok(())
    }

    async fn set_section_counters(
        &self,
        id: SectionId,
        current_student_count: i32,
        available_seats: i32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sections SET current_student_count = $2, available_seats = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(current_student_count)
        .bind(available_seats)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn set_class_counter(&self, id: ClassId, total_students: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE classes SET total_students = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(total_students)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn set_org_counters(
        &self,
        id: OrganizationId,
        counters: OrganizationCounters,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE organizations SET total_students = $2, total_teachers = $3, total_classes = $4, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(counters.total_students)
        .bind(counters.total_teachers)
        .bind(counters.total_classes)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_section(&self, section: NewSection) -> Result<Section, StoreError> {
        let name = section.name.clone();
        let id = sqlx::query_scalar::<_, SectionId>(
            "INSERT INTO sections (class_id, organization_id, name, max_students, current_student_count, available_seats) \
             VALUES ($1, $2, $3, $4, 0, $4) RETURNING id",
        )
        .bind(section.class_id)
        .bind(section.organization_id)
        .bind(section.name)
        .bind(section.max_students)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict(format!("section {name} already exists in this class"))
            }
            other => other,
        })?;

        self.get_section(id)
            .await?
            .ok_or_else(|| StoreError::Database(format!("section {id} vanished after insert")))
    }

    #[instrument(skip(self))]
    async fn set_section_capacity(
        &self,
        id: SectionId,
        max_students: i32,
    ) -> Result<CapacityUpdate, StoreError> {
        let mut tx = self.begin().await?;

        if Self::lock_section(&mut tx, id).await?.is_none() {
            return Ok(CapacityUpdate::SectionUnavailable);
        }

        let members = Self::count_members(&mut tx, id).await?;
        if members > max_students {
            return Ok(CapacityUpdate::BelowOccupancy { members });
        }

        sqlx::query("UPDATE sections SET max_students = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(max_students)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let section = sqlx::query_as::<_, Section>(select_sections!("WHERE s.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(CapacityUpdate::Applied(section))
    }

    async fn set_section_teacher(
        &self,
        id: SectionId,
        teacher_id: Option<UserId>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE sections SET teacher_id = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(teacher_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn soft_delete_section_if_empty(
        &self,
        id: SectionId,
    ) -> Result<SectionRemoval, StoreError> {
        let mut tx = self.begin().await?;

        if Self::lock_section(&mut tx, id).await?.is_none() {
            return Ok(SectionRemoval::SectionUnavailable);
        }

        let members = Self::count_members(&mut tx, id).await?;
        if members > 0 {
            return Ok(SectionRemoval::NotEmpty { members });
        }

        sqlx::query("UPDATE sections SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(SectionRemoval::Deleted)
    }
}
