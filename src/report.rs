use std::fmt::Write;

use crate::grades::{self, GpaScale, GradeError, LetterScale};
use crate::models::{AttendanceRecord, GradeEntry, ScheduleSlot};
use crate::{attendance, schedule};

pub fn build_report(
    threshold: f64,
    records: &[AttendanceRecord],
    entries: &[GradeEntry],
    slots: &[ScheduleSlot],
) -> anyhow::Result<String> {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Planner Report");
    let _ = writeln!(output, "Attendance threshold: {threshold}%");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance");

    let summaries = attendance::summarize(records, threshold)?;
    if summaries.is_empty() {
        let _ = writeln!(output, "No attendance recorded.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {} {}: {}/{} ({:.1}%, {}) - needs {} more, can miss {}, trend {:?} ({:+.2}/week)",
                summary.course_code,
                summary.course_name,
                summary.attended,
                summary.total,
                summary.percentage,
                summary.standing.label(),
                summary.classes_needed,
                summary.max_missable,
                summary.trend.direction,
                summary.trend.slope
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grades");

    let letters = LetterScale::default();
    match grades::summarize(entries, GpaScale::FourPoint, &letters) {
        Ok(overview) => {
            for course in overview.courses.iter() {
                let _ = writeln!(
                    output,
                    "- {} {}: {:.1}% ({}) across {} entries, {} credits",
                    course.course_code,
                    course.course_name,
                    course.percentage,
                    course.letter,
                    course.entry_count,
                    course.credits
                );
            }
            let _ = writeln!(output, "GPA (4.0 scale): {:.2}", overview.gpa);
            let ten = grades::summarize(entries, GpaScale::TenPoint, &letters)?;
            let _ = writeln!(output, "GPA (10.0 scale): {:.2}", ten.gpa);
        }
        Err(GradeError::NoEntries) => {
            let _ = writeln!(output, "No grades recorded.");
        }
        Err(err) => return Err(err.into()),
    }

    let mut misses: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|record| !record.status.counts_as_attended())
        .collect();
    misses.sort_by(|a, b| b.date.cmp(&a.date));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Absences");

    if misses.is_empty() {
        let _ = writeln!(output, "No absences recorded.");
    } else {
        for record in misses.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {}: {}",
                record.course_code,
                record.date,
                record.note.as_deref().unwrap_or("no note")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Schedule Conflicts");

    let conflicts = schedule::find_conflicts(slots);
    if conflicts.is_empty() {
        let _ = writeln!(output, "No conflicts in the weekly schedule.");
    } else {
        for (first, second) in conflicts.iter() {
            let _ = writeln!(
                output,
                "- {} {} {}-{} overlaps {} {}-{}",
                first.day,
                first.course_code,
                first.starts_at.format("%H:%M"),
                first.ends_at.format("%H:%M"),
                second.course_code,
                second.starts_at.format("%H:%M"),
                second.ends_at.format("%H:%M")
            );
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::{NaiveDate, NaiveTime, Weekday};
    use uuid::Uuid;

    fn sample_records() -> Vec<AttendanceRecord> {
        let course_id = Uuid::new_v4();
        [
            (3, AttendanceStatus::Present),
            (4, AttendanceStatus::Absent),
            (5, AttendanceStatus::Late),
        ]
        .into_iter()
        .map(|(day, status)| AttendanceRecord {
            course_id,
            course_code: "CS301".to_string(),
            course_name: "Data Structures".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 8, day).unwrap(),
            status,
            note: None,
        })
        .collect()
    }

    fn sample_entries() -> Vec<GradeEntry> {
        vec![GradeEntry {
            course_id: Uuid::new_v4(),
            course_code: "CS301".to_string(),
            course_name: "Data Structures".to_string(),
            credits: 4.0,
            title: "Midterm".to_string(),
            score: 78.0,
            max_score: 100.0,
            weight: 0.3,
            graded_on: NaiveDate::from_ymd_opt(2026, 8, 18).unwrap(),
        }]
    }

    fn sample_slots() -> Vec<ScheduleSlot> {
        vec![
            ScheduleSlot {
                id: Uuid::new_v4(),
                course_code: "CS301".to_string(),
                day: Weekday::Mon,
                starts_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                ends_at: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                location: None,
            },
            ScheduleSlot {
                id: Uuid::new_v4(),
                course_code: "MA201".to_string(),
                day: Weekday::Mon,
                starts_at: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                ends_at: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                location: None,
            },
        ]
    }

    #[test]
    fn report_includes_every_section() {
        let report =
            build_report(75.0, &sample_records(), &sample_entries(), &sample_slots()).unwrap();
        assert!(report.contains("# Student Planner Report"));
        assert!(report.contains("## Attendance"));
        assert!(report.contains("CS301 Data Structures: 2/3"));
        assert!(report.contains("## Recent Absences"));
        assert!(report.contains("CS301 on 2026-08-04"));
        assert!(report.contains("## Grades"));
        assert!(report.contains("GPA (4.0 scale): 2.00"));
        assert!(report.contains("GPA (10.0 scale): 7.80"));
        assert!(report.contains("## Schedule Conflicts"));
        assert!(report.contains("CS301 09:00-10:30 overlaps MA201 10:00-11:00"));
    }

    #[test]
    fn report_handles_empty_logs() {
        let report = build_report(75.0, &[], &[], &[]).unwrap();
        assert!(report.contains("No attendance recorded."));
        assert!(report.contains("No absences recorded."));
        assert!(report.contains("No grades recorded."));
        assert!(report.contains("No conflicts in the weekly schedule."));
    }
}
