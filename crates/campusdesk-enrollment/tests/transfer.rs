mod common;

use std::sync::atomic::Ordering;

use campusdesk_core::Role;
use campusdesk_enrollment::{EnrollmentError, EnrollmentStore, OrganizationScope};
use campusdesk_models::ids::SectionId;
use common::{Fixture, assert_membership_consistent};

#[tokio::test]
async fn test_transfer_moves_student_and_counters() {
    let fx = Fixture::new();
    let a = fx.section("A", 30);
    let b = fx.section("B", 30);
    let student = fx.fill(&a, 1).await.remove(0);

    let transfer = fx
        .engine
        .transfers
        .transfer(fx.scope(), student.id, b.id)
        .await
        .unwrap();

    assert_eq!(transfer.from_section_id, a.id);
    assert_eq!(transfer.section.id, b.id);
    assert_eq!(transfer.student.section_id, Some(b.id));
    assert!(fx.members(&a).await.is_empty());
    assert_eq!(fx.members(&b).await, vec![student.id]);
    assert_eq!(fx.fresh_section(&a).await.current_student_count, 0);
    assert_eq!(fx.fresh_section(&b).await.current_student_count, 1);
    assert_eq!(fx.fresh_class().await.total_students, 1);
    assert_membership_consistent(&fx).await;
}

#[tokio::test]
async fn test_transfer_into_full_section_changes_nothing() {
    let fx = Fixture::new();
    let a = fx.section("A", 2);
    let b = fx.section("B", 2);
    let student = fx.fill(&a, 1).await.remove(0);
    fx.fill(&b, 2).await;

    let err = fx
        .engine
        .transfers
        .transfer(fx.scope(), student.id, b.id)
        .await
        .unwrap_err();

    match err {
        EnrollmentError::NoCapacity { occupancy, .. } => {
            assert_eq!(occupancy.len(), 1);
            assert_eq!(occupancy[0].section_id, b.id);
            assert_eq!(occupancy[0].current_student_count, 2);
        }
        other => panic!("expected NoCapacity, got {other:?}"),
    }
    let stored = fx.store.get_user(student.id).await.unwrap().unwrap();
    assert_eq!(stored.section_id, Some(a.id));
    assert!(fx.members(&a).await.contains(&student.id));
    assert_eq!(fx.members(&b).await.len(), 2);
}

#[tokio::test]
async fn test_transfer_to_current_section_is_rejected() {
    let fx = Fixture::new();
    let a = fx.section("A", 30);
    let student = fx.fill(&a, 1).await.remove(0);

    let err = fx
        .engine
        .transfers
        .transfer(fx.scope(), student.id, a.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::AlreadyInSection { occupancy } if occupancy.section_id == a.id));
}

#[tokio::test]
async fn test_transfer_across_organizations_is_rejected() {
    let fx = Fixture::new();
    let a = fx.section("A", 30);
    let student = fx.fill(&a, 1).await.remove(0);

    let other_org = fx.memory.insert_organization("Hillside", None);
    let other_class = fx.memory.insert_class(other_org.id, "JSS1", "Gold");
    let foreign = fx.memory.insert_section(&other_class, "A", 30);

    let err = fx
        .engine
        .transfers
        .transfer(OrganizationScope::Any, student.id, foreign.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::CrossOrganizationViolation(_)));
    assert!(fx.store.section_members(foreign.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_of_unknown_student_or_section() {
    let fx = Fixture::new();
    let a = fx.section("A", 30);
    let student = fx.fill(&a, 1).await.remove(0);

    let err = fx
        .engine
        .transfers
        .transfer(fx.scope(), student.id, SectionId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::NotFound { entity: "section", .. }));

    let teacher = fx.memory.insert_user(Some(fx.org.id), Role::Teacher, "Ngozi", "Eze");
    let err = fx
        .engine
        .transfers
        .transfer(fx.scope(), teacher.id, a.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::NotFound { entity: "student", .. }));
}

#[tokio::test]
async fn test_failed_target_write_leaves_student_in_place() {
    let (fx, flaky) = Fixture::flaky();
    let a = fx.section("A", 30);
    let b = fx.section("B", 30);
    let student = fx.fill(&a, 1).await.remove(0);
    // Neither the append nor any reference write gets through.
    flaky.fail_append.store(true, Ordering::SeqCst);
    flaky.fail_set_section.store(true, Ordering::SeqCst);

    let err = fx
        .engine
        .transfers
        .transfer(fx.scope(), student.id, b.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::Store(_)));

    let stored = fx.store.get_user(student.id).await.unwrap().unwrap();
    assert_eq!(stored.section_id, Some(a.id));
    assert_eq!(fx.members(&a).await, vec![student.id]);
    assert!(fx.members(&b).await.is_empty());
}

#[tokio::test]
async fn test_lost_race_on_target_reports_no_capacity() {
    let (fx, flaky) = Fixture::flaky();
    let a = fx.section("A", 30);
    let b = fx.section("B", 30);
    let student = fx.fill(&a, 1).await.remove(0);
    flaky.forced_full_appends.store(1, Ordering::SeqCst);

    let err = fx
        .engine
        .transfers
        .transfer(fx.scope(), student.id, b.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::NoCapacity { .. }));
    assert_membership_consistent(&fx).await;
}

#[tokio::test]
async fn test_failed_source_removal_is_healed_by_sweep() {
    let (fx, flaky) = Fixture::flaky();
    let a = fx.section("A", 30);
    let b = fx.section("B", 30);
    let student = fx.fill(&a, 1).await.remove(0);
    flaky.fail_remove.store(true, Ordering::SeqCst);

    fx.engine
        .transfers
        .transfer(fx.scope(), student.id, b.id)
        .await
        .unwrap();

    // never in zero sections; transiently in both
    assert!(fx.members(&a).await.contains(&student.id));
    assert!(fx.members(&b).await.contains(&student.id));

    flaky.fail_remove.store(false, Ordering::SeqCst);
    let report = fx.engine.reconciler.reconcile_organization(fx.org.id).await.unwrap();

    assert_eq!(report.members_pruned, 1);
    assert!(fx.members(&a).await.is_empty());
    assert_eq!(fx.members(&b).await, vec![student.id]);
    assert_eq!(fx.fresh_section(&a).await.current_student_count, 0);
    assert_eq!(fx.fresh_org().await.total_students, 1);
    assert_membership_consistent(&fx).await;
}

#[tokio::test]
async fn test_failed_reference_move_withdraws_target_entry() {
    let (fx, flaky) = Fixture::flaky();
    let a = fx.section("A", 30);
    let b = fx.section("B", 30);
    let student = fx.fill(&a, 1).await.remove(0);
    flaky.fail_set_section.store(true, Ordering::SeqCst);

    let err = fx
        .engine
        .transfers
        .transfer(fx.scope(), student.id, b.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EnrollmentError::Store(_)));

    let stored = fx.store.get_user(student.id).await.unwrap().unwrap();
    assert_eq!(stored.section_id, Some(a.id));
    assert_eq!(fx.members(&a).await, vec![student.id]);
    assert!(fx.members(&b).await.is_empty());
    assert_membership_consistent(&fx).await;
}

#[tokio::test]
async fn test_failed_reference_move_and_cleanup_is_healed_by_sweep() {
    let (fx, flaky) = Fixture::flaky();
    let a = fx.section("A", 30);
    let b = fx.section("B", 30);
    let student = fx.fill(&a, 1).await.remove(0);
    flaky.fail_set_section.store(true, Ordering::SeqCst);
    flaky.fail_remove.store(true, Ordering::SeqCst);

    fx.engine
        .transfers
        .transfer(fx.scope(), student.id, b.id)
        .await
        .unwrap_err();

    // The reference still names A, and A still lists the student.
    let stored = fx.store.get_user(student.id).await.unwrap().unwrap();
    assert_eq!(stored.section_id, Some(a.id));
    assert!(fx.members(&a).await.contains(&student.id));
    assert!(fx.members(&b).await.contains(&student.id));

    flaky.fail_set_section.store(false, Ordering::SeqCst);
    flaky.fail_remove.store(false, Ordering::SeqCst);
    let report = fx.engine.reconciler.reconcile_organization(fx.org.id).await.unwrap();

    assert_eq!(report.members_pruned, 1);
    assert_eq!(report.students_repaired, 0);
    assert_eq!(fx.members(&a).await, vec![student.id]);
    assert!(fx.members(&b).await.is_empty());
    assert_eq!(fx.fresh_section(&b).await.current_student_count, 0);
    assert_membership_consistent(&fx).await;
}
