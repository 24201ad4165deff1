#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use campusdesk_config::EnrollmentConfig;
use campusdesk_enrollment::{
    AppendOutcome, CapacityUpdate, CredentialsIssued, EnrollmentEngine, EnrollmentRequest,
    EnrollmentStore, InMemoryStore, Notifier, OrganizationScope, SectionRemoval, StoreError,
};
use campusdesk_models::classes::Class;
use campusdesk_models::enrollment::{PlacementPolicy, StudentDraft};
use campusdesk_models::ids::{ClassId, OrganizationId, SectionId, UserId};
use campusdesk_models::organizations::{Organization, OrganizationCounters};
use campusdesk_models::sections::{NewSection, Section};
use campusdesk_models::users::{NewStudent, User};

pub fn test_config() -> EnrollmentConfig {
    EnrollmentConfig {
        sweep_interval: None,
        orphan_grace: Duration::ZERO,
        ..EnrollmentConfig::default()
    }
    .with_password_hash_cost(4)
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<CredentialsIssued>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Delivery runs on a detached task.
    pub async fn wait_for(&self, expected: usize) -> usize {
        for _ in 0..100 {
            if self.count() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn credentials_issued(&self, event: &CredentialsIssued) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("smtp relay refused connection");
        }
        Ok(())
    }
}

/// In-memory store with injectable failures.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub fail_append: AtomicBool,
    pub fail_remove: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_set_section: AtomicBool,
    pub fail_get_section: AtomicBool,
    /// Number of upcoming appends reported as full regardless of membership.
    pub forced_full_appends: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EnrollmentStore for FlakyStore {
    async fn get_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        self.inner.get_organization(id).await
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, StoreError> {
        self.inner.list_organizations().await
    }

    async fn get_class(&self, id: ClassId) -> Result<Option<Class>, StoreError> {
        self.inner.get_class(id).await
    }

    async fn list_classes(&self, organization_id: OrganizationId) -> Result<Vec<Class>, StoreError> {
        self.inner.list_classes(organization_id).await
    }

    async fn get_class_with_sections(
        &self,
        id: ClassId,
    ) -> Result<Option<(Class, Vec<Section>)>, StoreError> {
        self.inner.get_class_with_sections(id).await
    }

    async fn get_section(&self, id: SectionId) -> Result<Option<Section>, StoreError> {
        if self.fail_get_section.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.get_section(id).await
    }

    async fn section_members(&self, id: SectionId) -> Result<Vec<UserId>, StoreError> {
        self.inner.section_members(id).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.inner.get_user(id).await
    }

    async fn count_teachers(&self, organization_id: OrganizationId) -> Result<i64, StoreError> {
        self.inner.count_teachers(organization_id).await
    }

    async fn list_students(&self, organization_id: OrganizationId) -> Result<Vec<User>, StoreError> {
        self.inner.list_students(organization_id).await
    }

    async fn conditional_append_member(
        &self,
        section_id: SectionId,
        student_id: UserId,
        max_size: i32,
    ) -> Result<AppendOutcome, StoreError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        let forced = self
            .forced_full_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Ok(AppendOutcome::Full {
                size: max_size,
                max_students: max_size,
            });
        }
        self.inner
            .conditional_append_member(section_id, student_id, max_size)
            .await
    }

    async fn remove_member(&self, section_id: SectionId, student_id: UserId) -> Result<bool, StoreError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.remove_member(section_id, student_id).await
    }

    async fn create_student(&self, student: NewStudent) -> Result<User, StoreError> {
        self.inner.create_student(student).await
    }

    async fn delete_student(&self, id: UserId) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.delete_student(id).await
    }

    async fn soft_delete_student(&self, id: UserId) -> Result<bool, StoreError> {
        self.inner.soft_delete_student(id).await
    }

    async fn set_student_section(&self, student_id: UserId, section_id: SectionId) -> Result<(), StoreError> {
        if self.fail_set_section.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.set_student_section(student_id, section_id).await
    }

    async fn set_section_counters(
        &self,
        id: SectionId,
        current_student_count: i32,
        available_seats: i32,
    ) -> Result<(), StoreError> {
        self.inner
            .set_section_counters(id, current_student_count, available_seats)
            .await
    }

    async fn set_class_counter(&self, id: ClassId, total_students: i64) -> Result<(), StoreError> {
        self.inner.set_class_counter(id, total_students).await
    }

    async fn set_org_counters(&self, id: OrganizationId, counters: OrganizationCounters) -> Result<(), StoreError> {
        self.inner.set_org_counters(id, counters).await
    }

    async fn create_section(&self, section: NewSection) -> Result<Section, StoreError> {
        self.inner.create_section(section).await
    }

    async fn set_section_capacity(&self, id: SectionId, max_students: i32) -> Result<CapacityUpdate, StoreError> {
        self.inner.set_section_capacity(id, max_students).await
    }

    async fn set_section_teacher(&self, id: SectionId, teacher_id: Option<UserId>) -> Result<bool, StoreError> {
        self.inner.set_section_teacher(id, teacher_id).await
    }

    async fn soft_delete_section_if_empty(&self, id: SectionId) -> Result<SectionRemoval, StoreError> {
        self.inner.soft_delete_section_if_empty(id).await
    }
}

/// One organization with one class, plus an engine over the given store.
pub struct Fixture {
    pub memory: InMemoryStore,
    pub store: Arc<dyn EnrollmentStore>,
    pub engine: EnrollmentEngine,
    pub notifier: Arc<RecordingNotifier>,
    pub org: Organization,
    pub class: Class,
}

impl Fixture {
    pub fn new() -> Self {
        let memory = InMemoryStore::new();
        let store: Arc<dyn EnrollmentStore> = Arc::new(memory.clone());
        Self::with_store(memory, store)
    }

    pub fn flaky() -> (Self, Arc<FlakyStore>) {
        let memory = InMemoryStore::new();
        let flaky = Arc::new(FlakyStore::new(memory.clone()));
        let store: Arc<dyn EnrollmentStore> = flaky.clone();
        (Self::with_store(memory, store), flaky)
    }

    fn with_store(memory: InMemoryStore, store: Arc<dyn EnrollmentStore>) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = EnrollmentEngine::new(store.clone(), notifier.clone(), test_config());
        let org = memory.insert_organization("Greenfield Academy", None);
        let class = memory.insert_class(org.id, "JSS1", "Gold");
        Self {
            memory,
            store,
            engine,
            notifier,
            org,
            class,
        }
    }

    pub fn scope(&self) -> OrganizationScope {
        OrganizationScope::Only(self.org.id)
    }

    pub fn section(&self, name: &str, max_students: i32) -> Section {
        self.memory.insert_section(&self.class, name, max_students)
    }

    pub fn request(&self, email: &str, policy: PlacementPolicy) -> EnrollmentRequest {
        EnrollmentRequest {
            class_id: self.class.id,
            draft: draft(email),
            policy,
            preferred_section: None,
        }
    }

    pub async fn enroll(&self, email: &str) -> User {
        self.engine
            .enrollments
            .enroll(self.scope(), self.request(email, PlacementPolicy::FirstFit))
            .await
            .unwrap()
            .student
    }

    /// Fills the section with freshly enrolled students, bypassing placement.
    pub async fn fill(&self, section: &Section, count: usize) -> Vec<User> {
        let mut students = Vec::with_capacity(count);
        for i in 0..count {
            let request = EnrollmentRequest {
                preferred_section: Some(section.name.clone()),
                ..self.request(&format!("{}{}@example.com", section.name.to_lowercase(), i), PlacementPolicy::FirstFit)
            };
            let enrollment = self.engine.enrollments.enroll(self.scope(), request).await.unwrap();
            assert_eq!(enrollment.section.id, section.id);
            students.push(enrollment.student);
        }
        students
    }

    pub async fn members(&self, section: &Section) -> Vec<UserId> {
        self.store.section_members(section.id).await.unwrap()
    }

    pub async fn fresh_section(&self, section: &Section) -> Section {
        self.store.get_section(section.id).await.unwrap().unwrap()
    }

    pub async fn fresh_class(&self) -> Class {
        self.store.get_class(self.class.id).await.unwrap().unwrap()
    }

    pub async fn fresh_org(&self) -> Organization {
        self.store.get_organization(self.org.id).await.unwrap().unwrap()
    }

    pub fn active_students(&self) -> Vec<User> {
        self.memory
            .users()
            .into_iter()
            .filter(|u| u.is_active_student())
            .collect()
    }
}

pub fn draft(email: &str) -> StudentDraft {
    StudentDraft {
        first_name: "Chidi".to_string(),
        last_name: "Okafor".to_string(),
        email: email.to_string(),
        password: None,
    }
}

/// Checks that every active student and every membership entry agree.
pub async fn assert_membership_consistent(fixture: &Fixture) {
    for student in fixture.active_students() {
        let section_id = student.section_id.expect("active student without section");
        let members = fixture.store.section_members(section_id).await.unwrap();
        assert!(members.contains(&student.id), "student missing from its section");
    }
    let (_, sections) = fixture
        .store
        .get_class_with_sections(fixture.class.id)
        .await
        .unwrap()
        .unwrap();
    for section in sections {
        assert!(section.member_count <= section.max_students);
        for member in fixture.store.section_members(section.id).await.unwrap() {
            let user = fixture.store.get_user(member).await.unwrap().unwrap();
            assert!(user.is_active_student());
            assert_eq!(user.section_id, Some(section.id));
        }
    }
}
