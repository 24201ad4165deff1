//! Capacity invariant: a section never holds more than `max_students` members.

use campusdesk_models::sections::Section;

/// Whether `requested` more members fit in the section's current membership.
pub fn can_accommodate(section: &Section, requested: i32) -> bool {
    i64::from(section.member_count) + i64::from(requested) <= i64::from(section.max_students)
}

/// Seats left according to the membership set.
pub fn available_seats(section: &Section) -> i32 {
    section.live_available_seats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusdesk_models::ids::{ClassId, OrganizationId, SectionId};
    use chrono::Utc;

    fn section(max: i32, members: i32) -> Section {
        let now = Utc::now();
        Section {
            id: SectionId::new(),
            class_id: ClassId::new(),
            organization_id: OrganizationId::new(),
            name: "A".into(),
            max_students: max,
            teacher_id: None,
            member_count: members,
            current_student_count: 0,
            available_seats: 0,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_exact_fit_is_allowed() {
        assert!(can_accommodate(&section(2, 1), 1));
        assert!(can_accommodate(&section(30, 0), 30));
    }

    #[test]
    fn test_full_section_rejects() {
        assert!(!can_accommodate(&section(2, 2), 1));
        assert!(!can_accommodate(&section(30, 29), 2));
    }

    #[test]
    fn test_ignores_stale_cached_counter() {
        let mut s = section(2, 2);
        s.current_student_count = 0;
        s.available_seats = 2;
        assert!(!can_accommodate(&s, 1));
        assert_eq!(available_seats(&s), 0);
    }

    #[test]
    fn test_large_request_does_not_overflow() {
        assert!(!can_accommodate(&section(50, 10), i32::MAX));
    }
}
