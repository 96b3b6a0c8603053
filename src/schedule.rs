use thiserror::Error;

use crate::models::ScheduleSlot;

/// Insertion was rejected because the new slot overlaps existing ones.
/// The colliding slots are carried for user feedback.
#[derive(Debug, Error)]
#[error("slot overlaps {} existing slot(s)", .conflicts.len())]
pub struct ConflictError {
    pub conflicts: Vec<ScheduleSlot>,
}

/// Intervals are half-open [start, end): slots that touch at an endpoint
/// do not conflict.
fn overlaps(a: &ScheduleSlot, b: &ScheduleSlot) -> bool {
    a.day == b.day && a.starts_at < b.ends_at && b.starts_at < a.ends_at
}

/// Every pairwise overlap across the week, not just adjacent ones. Slots
/// are sorted by day and start time, then each slot is compared against
/// the later starts still inside its interval.
pub fn find_conflicts(slots: &[ScheduleSlot]) -> Vec<(ScheduleSlot, ScheduleSlot)> {
    let mut ordered: Vec<&ScheduleSlot> = slots.iter().collect();
    ordered.sort_by_key(|slot| (slot.day.num_days_from_monday(), slot.starts_at, slot.ends_at));

    let mut conflicts = Vec::new();
    for (position, first) in ordered.iter().enumerate() {
        for second in ordered[position + 1..].iter() {
            if second.day != first.day || second.starts_at >= first.ends_at {
                break;
            }
            conflicts.push(((*first).clone(), (*second).clone()));
        }
    }
    conflicts
}

pub fn has_conflict(slots: &[ScheduleSlot]) -> bool {
    !find_conflicts(slots).is_empty()
}

/// Appends the slot to the week, rejecting the insertion when it would
/// overlap anything already scheduled on that day.
pub fn add_slot(
    existing: &[ScheduleSlot],
    new_slot: ScheduleSlot,
) -> Result<Vec<ScheduleSlot>, ConflictError> {
    let conflicts: Vec<ScheduleSlot> = existing
        .iter()
        .filter(|slot| overlaps(slot, &new_slot))
        .cloned()
        .collect();

    if !conflicts.is_empty() {
        return Err(ConflictError { conflicts });
    }

    let mut updated = existing.to_vec();
    updated.push(new_slot);
    updated.sort_by_key(|slot| (slot.day.num_days_from_monday(), slot.starts_at));
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use uuid::Uuid;

    fn slot(course: &str, day: Weekday, start: (u32, u32), end: (u32, u32)) -> ScheduleSlot {
        ScheduleSlot {
            id: Uuid::new_v4(),
            course_code: course.to_string(),
            day,
            starts_at: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            ends_at: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            location: None,
        }
    }

    #[test]
    fn overlapping_slots_conflict() {
        let slots = vec![
            slot("CS301", Weekday::Mon, (9, 0), (10, 30)),
            slot("MA201", Weekday::Mon, (10, 0), (11, 0)),
        ];
        let conflicts = find_conflicts(&slots);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].0.course_code, "CS301");
        assert_eq!(conflicts[0].1.course_code, "MA201");
    }

    #[test]
    fn touching_endpoints_do_not_conflict() {
        let slots = vec![
            slot("CS301", Weekday::Mon, (9, 0), (10, 30)),
            slot("MA201", Weekday::Mon, (10, 30), (11, 0)),
        ];
        assert!(find_conflicts(&slots).is_empty());
        assert!(!has_conflict(&slots));
    }

    #[test]
    fn same_times_on_different_days_do_not_conflict() {
        let slots = vec![
            slot("CS301", Weekday::Mon, (9, 0), (10, 0)),
            slot("MA201", Weekday::Tue, (9, 0), (10, 0)),
        ];
        assert!(find_conflicts(&slots).is_empty());
    }

    #[test]
    fn long_slot_conflicts_with_every_slot_it_covers() {
        let slots = vec![
            slot("PH105", Weekday::Wed, (9, 0), (13, 0)),
            slot("CS301", Weekday::Wed, (9, 30), (10, 30)),
            slot("MA201", Weekday::Wed, (11, 0), (12, 0)),
        ];
        let conflicts = find_conflicts(&slots);
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts
            .iter()
            .all(|(first, _)| first.course_code == "PH105"));
    }

    #[test]
    fn add_slot_accepts_a_free_window() {
        let existing = vec![slot("CS301", Weekday::Mon, (9, 0), (10, 30))];
        let updated = add_slot(&existing, slot("MA201", Weekday::Mon, (10, 30), (12, 0))).unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0].course_code, "CS301");
    }

    #[test]
    fn add_slot_reports_the_colliding_slots() {
        let existing = vec![
            slot("CS301", Weekday::Mon, (9, 0), (10, 30)),
            slot("MA201", Weekday::Mon, (11, 0), (12, 0)),
        ];
        let err = add_slot(&existing, slot("PH105", Weekday::Mon, (10, 0), (11, 30))).unwrap_err();
        assert_eq!(err.conflicts.len(), 2);
        assert_eq!(err.conflicts[0].course_code, "CS301");
        assert_eq!(err.conflicts[1].course_code, "MA201");
    }
}
