//! Section selection.

use campusdesk_models::enrollment::PlacementPolicy;
use campusdesk_models::sections::Section;

use crate::capacity::{available_seats, can_accommodate};

/// Picks the section that should receive `required` new students.
///
/// Only active sections with room are considered, in name order. A surviving
/// `preferred` section wins outright; otherwise first-fit takes the first
/// survivor and load-balanced the one with the most free seats (earliest name
/// on ties). `None` means no section has room; sections are never created here.
pub fn select_section<'a>(
    sections: &'a [Section],
    required: i32,
    policy: PlacementPolicy,
    preferred: Option<&str>,
) -> Option<&'a Section> {
    let mut candidates: Vec<&Section> = sections
        .iter()
        .filter(|s| s.is_active() && can_accommodate(s, required))
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));

    if let Some(name) = preferred
        && let Some(section) = candidates.iter().copied().find(|s| s.name == name)
    {
        return Some(section);
    }

    match policy {
        PlacementPolicy::FirstFit => candidates.first().copied(),
        PlacementPolicy::LoadBalanced => candidates.into_iter().max_by(|a, b| {
            available_seats(a)
                .cmp(&available_seats(b))
                .then_with(|| b.name.cmp(&a.name))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusdesk_models::ids::{ClassId, OrganizationId, SectionId};
    use chrono::Utc;

    fn section(name: &str, max: i32, members: i32) -> Section {
        let now = Utc::now();
        Section {
            id: SectionId::new(),
            class_id: ClassId::new(),
            organization_id: OrganizationId::new(),
            name: name.into(),
            max_students: max,
            teacher_id: None,
            member_count: members,
            current_student_count: members,
            available_seats: max - members,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn pick(sections: &[Section], policy: PlacementPolicy) -> Option<String> {
        select_section(sections, 1, policy, None).map(|s| s.name.clone())
    }

    #[test]
    fn test_first_fit_skips_full_section() {
        let sections = vec![section("A", 2, 2), section("B", 2, 0)];
        assert_eq!(pick(&sections, PlacementPolicy::FirstFit).as_deref(), Some("B"));
    }

    #[test]
    fn test_first_fit_uses_name_order() {
        let sections = vec![section("C", 30, 0), section("A", 30, 29), section("B", 30, 0)];
        assert_eq!(pick(&sections, PlacementPolicy::FirstFit).as_deref(), Some("A"));
    }

    #[test]
    fn test_load_balanced_prefers_most_seats() {
        let sections = vec![section("A", 2, 1), section("B", 2, 0)];
        assert_eq!(pick(&sections, PlacementPolicy::LoadBalanced).as_deref(), Some("B"));
    }

    #[test]
    fn test_load_balanced_ties_break_by_name() {
        let sections = vec![section("C", 10, 5), section("B", 10, 5), section("A", 10, 8)];
        assert_eq!(pick(&sections, PlacementPolicy::LoadBalanced).as_deref(), Some("B"));
    }

    #[test]
    fn test_all_full_yields_none() {
        let sections = vec![section("A", 2, 2), section("B", 2, 2)];
        assert!(pick(&sections, PlacementPolicy::FirstFit).is_none());
        assert!(pick(&sections, PlacementPolicy::LoadBalanced).is_none());
        assert!(pick(&[], PlacementPolicy::FirstFit).is_none());
    }

    #[test]
    fn test_preferred_section_wins_when_it_has_room() {
        let sections = vec![section("A", 30, 0), section("B", 30, 20)];
        let chosen = select_section(&sections, 1, PlacementPolicy::LoadBalanced, Some("B"));
        assert_eq!(chosen.map(|s| s.name.as_str()), Some("B"));
    }

    #[test]
    fn test_full_preferred_section_falls_back_to_policy() {
        let sections = vec![section("A", 30, 0), section("B", 2, 2)];
        let chosen = select_section(&sections, 1, PlacementPolicy::FirstFit, Some("B"));
        assert_eq!(chosen.map(|s| s.name.as_str()), Some("A"));
    }

    #[test]
    fn test_deleted_sections_are_ignored() {
        let mut deleted = section("A", 30, 0);
        deleted.deleted_at = Some(Utc::now());
        let sections = vec![deleted, section("B", 30, 0)];
        assert_eq!(pick(&sections, PlacementPolicy::FirstFit).as_deref(), Some("B"));
    }

    #[test]
    fn test_multi_seat_requests() {
        let sections = vec![section("A", 30, 28), section("B", 30, 27)];
        let chosen = select_section(&sections, 3, PlacementPolicy::FirstFit, None);
        assert_eq!(chosen.map(|s| s.name.as_str()), Some("B"));
    }
}
