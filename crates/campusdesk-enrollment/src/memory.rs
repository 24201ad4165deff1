//! In-memory [`EnrollmentStore`] used by tests and local tooling.
//!
//! Every operation takes the single state lock for its whole duration, so the
//! conditional append is atomic exactly like the row-locked Postgres version.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use campusdesk_core::Role;
use campusdesk_models::classes::Class;
use campusdesk_models::ids::{ClassId, OrganizationId, SectionId, UserId};
use campusdesk_models::organizations::{Organization, OrganizationCounters};
use campusdesk_models::sections::{NewSection, Section};
use campusdesk_models::users::{NewStudent, User};
use chrono::Utc;

use crate::error::StoreError;
use crate::store::{AppendOutcome, CapacityUpdate, EnrollmentStore, SectionRemoval};

struct SectionRecord {
    section: Section,
    members: BTreeSet<UserId>,
}

impl SectionRecord {
    fn is_active(&self) -> bool {
        self.section.deleted_at.is_none()
    }

    fn size(&self) -> i32 {
        self.members.len() as i32
    }

    fn snapshot(&self) -> Section {
        let mut section = self.section.clone();
        section.member_count = self.size();
        section
    }
}

#[derive(Default)]
struct State {
    organizations: HashMap<OrganizationId, Organization>,
    classes: HashMap<ClassId, Class>,
    sections: HashMap<SectionId, SectionRecord>,
    users: HashMap<UserId, User>,
}

impl State {
    fn active_section(&self, id: SectionId) -> Option<&SectionRecord> {
        self.sections.get(&id).filter(|r| r.is_active())
    }

    fn active_section_mut(&mut self, id: SectionId) -> Option<&mut SectionRecord> {
        self.sections.get_mut(&id).filter(|r| r.is_active())
    }

    fn email_taken(&self, email: &str) -> bool {
        self.users
            .values()
            .any(|u| u.is_active() && u.email.eq_ignore_ascii_case(email))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_organization(&self, name: &str, default_section_capacity: Option<i32>) -> Organization {
        let now = Utc::now();
        let org = Organization {
            id: OrganizationId::new(),
            name: name.to_string(),
            default_section_capacity,
            total_students: 0,
            total_teachers: 0,
            total_classes: 0,
            created_at: now,
            updated_at: now,
        };
        self.lock().organizations.insert(org.id, org.clone());
        org
    }

    pub fn insert_class(&self, organization_id: OrganizationId, grade: &str, name: &str) -> Class {
        let now = Utc::now();
        let class = Class {
            id: ClassId::new(),
            organization_id,
            grade: grade.to_string(),
            name: name.to_string(),
            total_students: 0,
            created_at: now,
            updated_at: now,
        };
        self.lock().classes.insert(class.id, class.clone());
        class
    }

    /// Inserts an empty section without the uniqueness check.
    pub fn insert_section(&self, class: &Class, name: &str, max_students: i32) -> Section {
        let now = Utc::now();
        let section = Section {
            id: SectionId::new(),
            class_id: class.id,
            organization_id: class.organization_id,
            name: name.to_string(),
            max_students,
            teacher_id: None,
            member_count: 0,
            current_student_count: 0,
            available_seats: max_students,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().sections.insert(
            section.id,
            SectionRecord {
                section: section.clone(),
                members: BTreeSet::new(),
            },
        );
        section
    }

    pub fn insert_user(
        &self,
        organization_id: Option<OrganizationId>,
        role: Role,
        first_name: &str,
        last_name: &str,
    ) -> User {
        let now = Utc::now();
        let id = UserId::new();
        let user = User {
            id,
            organization_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!("{}.{}@example.com", first_name.to_lowercase(), id),
            role,
            section_id: None,
            password_hash: String::new(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.lock().users.insert(user.id, user.clone());
        user
    }

    /// Every user row, withdrawn ones included.
    pub fn users(&self) -> Vec<User> {
        self.lock().users.values().cloned().collect()
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryStore {
    async fn get_organization(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>, StoreError> {
        Ok(self.lock().organizations.get(&id).cloned())
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, StoreError> {
        let mut orgs: Vec<_> = self.lock().organizations.values().cloned().collect();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(orgs)
    }

    async fn get_class(&self, id: ClassId) -> Result<Option<Class>, StoreError> {
        Ok(self.lock().classes.get(&id).cloned())
    }

    async fn list_classes(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<Class>, StoreError> {
        let mut classes: Vec<_> = self
            .lock()
            .classes
            .values()
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .collect();
        classes.sort_by(|a, b| (&a.grade, &a.name).cmp(&(&b.grade, &b.name)));
        Ok(classes)
    }

    async fn get_class_with_sections(
        &self,
        id: ClassId,
    ) -> Result<Option<(Class, Vec<Section>)>, StoreError> {
        let state = self.lock();
        let Some(class) = state.classes.get(&id).cloned() else {
            return Ok(None);
        };
        let mut sections: Vec<_> = state
            .sections
            .values()
            .filter(|r| r.is_active() && r.section.class_id == id)
            .map(SectionRecord::snapshot)
            .collect();
        sections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some((class, sections)))
    }

    async fn get_section(&self, id: SectionId) -> Result<Option<Section>, StoreError> {
        Ok(self.lock().active_section(id).map(SectionRecord::snapshot))
    }

    async fn section_members(&self, id: SectionId) -> Result<Vec<UserId>, StoreError> {
        Ok(self
            .lock()
            .sections
            .get(&id)
            .map(|r| r.members.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn count_teachers(&self, organization_id: OrganizationId) -> Result<i64, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|u| {
                u.is_active() && u.role == Role::Teacher && u.organization_id == Some(organization_id)
            })
            .count() as i64)
    }

    async fn list_students(&self, organization_id: OrganizationId) -> Result<Vec<User>, StoreError> {
        let mut students: Vec<User> = self
            .lock()
            .users
            .values()
            .filter(|u| u.is_active_student() && u.organization_id == Some(organization_id))
            .cloned()
            .collect();
        students.sort_by_key(|u| u.created_at);
        Ok(students)
    }

    async fn conditional_append_member(
        &self,
        section_id: SectionId,
        student_id: UserId,
        max_size: i32,
    ) -> Result<AppendOutcome, StoreError> {
        let mut state = self.lock();
        let Some(record) = state.active_section_mut(section_id) else {
            return Ok(AppendOutcome::SectionUnavailable);
        };
        if record.members.contains(&student_id) {
            return Ok(AppendOutcome::AlreadyMember);
        }
        let limit = record.section.max_students.min(max_size);
        let size = record.size();
        if size >= limit {
            return Ok(AppendOutcome::Full {
                size,
                max_students: record.section.max_students,
            });
        }
        record.members.insert(student_id);
        Ok(AppendOutcome::Appended)
    }

    async fn remove_member(
        &self,
        section_id: SectionId,
        student_id: UserId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .sections
            .get_mut(&section_id)
            .is_some_and(|r| r.members.remove(&student_id)))
    }

    async fn create_student(&self, student: NewStudent) -> Result<User, StoreError> {
        let mut state = self.lock();
        if state.email_taken(&student.email) {
            return Err(StoreError::Conflict(format!(
                "a user with email {} already exists",
                student.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            organization_id: Some(student.organization_id),
            first_name: student.first_name,
            last_name: student.last_name,
            email: student.email,
            role: Role::Student,
            section_id: Some(student.section_id),
            password_hash: student.password_hash,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_student(&self, id: UserId) -> Result<(), StoreError> {
        self.lock().users.remove(&id);
        Ok(())
    }

    async fn soft_delete_student(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.users.get_mut(&id) {
            Some(user) if user.is_active_student() => {
                let now = Utc::now();
                user.deleted_at = Some(now);
                user.section_id = None;
                user.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_student_section(
        &self,
        student_id: UserId,
        section_id: SectionId,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&student_id)
            .ok_or_else(|| StoreError::Database(format!("student {student_id} does not exist")))?;
        user.section_id = Some(section_id);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_section_counters(
        &self,
        id: SectionId,
        current_student_count: i32,
        available_seats: i32,
    ) -> Result<(), StoreError> {
        if let Some(record) = self.lock().sections.get_mut(&id) {
            record.section.current_student_count = current_student_count;
            record.section.available_seats = available_seats;
            record.section.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_class_counter(&self, id: ClassId, total_students: i64) -> Result<(), StoreError> {
        if let Some(class) = self.lock().classes.get_mut(&id) {
            class.total_students = total_students;
            class.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_org_counters(
        &self,
        id: OrganizationId,
        counters: OrganizationCounters,
    ) -> Result<(), StoreError> {
        if let Some(org) = self.lock().organizations.get_mut(&id) {
            org.total_students = counters.total_students;
            org.total_teachers = counters.total_teachers;
            org.total_classes = counters.total_classes;
            org.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn create_section(&self, new: NewSection) -> Result<Section, StoreError> {
        let mut state = self.lock();
        let duplicate = state
            .sections
            .values()
            .any(|r| r.is_active() && r.section.class_id == new.class_id && r.section.name == new.name);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "section {} already exists in this class",
                new.name
            )));
        }
        let now = Utc::now();
        let section = Section {
            id: SectionId::new(),
            class_id: new.class_id,
            organization_id: new.organization_id,
            name: new.name,
            max_students: new.max_students,
            teacher_id: None,
            member_count: 0,
            current_student_count: 0,
            available_seats: new.max_students,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        state.sections.insert(
            section.id,
            SectionRecord {
                section: section.clone(),
                members: BTreeSet::new(),
            },
        );
        Ok(section)
    }

    async fn set_section_capacity(
        &self,
        id: SectionId,
        max_students: i32,
    ) -> Result<CapacityUpdate, StoreError> {
        let mut state = self.lock();
        let Some(record) = state.active_section_mut(id) else {
            return Ok(CapacityUpdate::SectionUnavailable);
        };
        let members = record.size();
        if members > max_students {
            return Ok(CapacityUpdate::BelowOccupancy { members });
        }
        record.section.max_students = max_students;
        record.section.updated_at = Utc::now();
        Ok(CapacityUpdate::Applied(record.snapshot()))
    }

    async fn set_section_teacher(
        &self,
        id: SectionId,
        teacher_id: Option<UserId>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.active_section_mut(id) {
            Some(record) => {
                record.section.teacher_id = teacher_id;
                record.section.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn soft_delete_section_if_empty(
        &self,
        id: SectionId,
    ) -> Result<SectionRemoval, StoreError> {
        let mut state = self.lock();
        let Some(record) = state.active_section_mut(id) else {
            return Ok(SectionRemoval::SectionUnavailable);
        };
        if !record.members.is_empty() {
            return Ok(SectionRemoval::NotEmpty {
                members: record.size(),
            });
        }
        let now = Utc::now();
        record.section.deleted_at = Some(now);
        record.section.updated_at = now;
        Ok(SectionRemoval::Deleted)
    }
}
