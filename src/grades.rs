use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::models::{CourseGradeSummary, GradeEntry, GradeOverview};

#[derive(Debug, Error, PartialEq)]
pub enum GradeError {
    #[error("max score must be positive, got {0}")]
    InvalidScore(f64),
    #[error("no grade entries to aggregate")]
    NoEntries,
}

/// Over-credit scores are allowed, so the result can exceed 100.
pub fn assignment_percentage(score: f64, max_score: f64) -> Result<f64, GradeError> {
    if max_score <= 0.0 {
        return Err(GradeError::InvalidScore(max_score));
    }
    Ok(score / max_score * 100.0)
}

/// Letter breakpoints are data, not logic, so an institution can swap in
/// its own table. Steps are kept sorted highest-first and the first step
/// at or below the percentage wins.
#[derive(Debug, Clone)]
pub struct LetterScale {
    steps: Vec<(f64, String)>,
}

impl LetterScale {
    pub fn new(mut steps: Vec<(f64, String)>) -> Self {
        steps.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Self { steps }
    }

    pub fn letter_for(&self, percentage: f64) -> &str {
        self.steps
            .iter()
            .find(|(min_percentage, _)| percentage >= *min_percentage)
            .map(|(_, letter)| letter.as_str())
            .unwrap_or("F")
    }
}

impl Default for LetterScale {
    fn default() -> Self {
        let steps = [
            (90.0, "A"),
            (85.0, "A-"),
            (80.0, "B+"),
            (75.0, "B"),
            (70.0, "B-"),
            (60.0, "C"),
            (0.0, "F"),
        ];
        Self::new(
            steps
                .into_iter()
                .map(|(min, letter)| (min, letter.to_string()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GpaScale {
    FourPoint,
    TenPoint,
}

impl GpaScale {
    pub fn grade_points(&self, percentage: f64) -> f64 {
        match self {
            GpaScale::FourPoint => {
                if percentage >= 90.0 {
                    4.0
                } else if percentage >= 80.0 {
                    3.0
                } else if percentage >= 70.0 {
                    2.0
                } else if percentage >= 60.0 {
                    1.0
                } else {
                    0.0
                }
            }
            GpaScale::TenPoint => (percentage / 10.0).clamp(0.0, 10.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GpaScale::FourPoint => "4.0",
            GpaScale::TenPoint => "10.0",
        }
    }
}

/// Weight-normalized average of assignment percentages. Weights need not
/// sum to 1.
pub fn weighted_course_grade(entries: &[GradeEntry]) -> Result<f64, GradeError> {
    if entries.is_empty() {
        return Err(GradeError::NoEntries);
    }

    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for entry in entries {
        let percentage = assignment_percentage(entry.score, entry.max_score)?;
        weighted += percentage * entry.weight;
        weight_sum += entry.weight;
    }

    if weight_sum <= 0.0 {
        return Err(GradeError::NoEntries);
    }
    Ok(weighted / weight_sum)
}

/// Credit-weighted grade-point average over per-course percentages.
pub fn gpa(courses: &[(f64, f64)], scale: GpaScale) -> Result<f64, GradeError> {
    if courses.is_empty() {
        return Err(GradeError::NoEntries);
    }

    let mut points = 0.0;
    let mut credit_sum = 0.0;
    for (percentage, credits) in courses {
        points += scale.grade_points(*percentage) * credits;
        credit_sum += credits;
    }

    if credit_sum <= 0.0 {
        return Err(GradeError::NoEntries);
    }
    Ok(points / credit_sum)
}

/// Per-course weighted grades plus the overall GPA, derived from the full
/// grade log.
pub fn summarize(
    entries: &[GradeEntry],
    scale: GpaScale,
    letters: &LetterScale,
) -> Result<GradeOverview, GradeError> {
    let mut by_course: BTreeMap<String, Vec<GradeEntry>> = BTreeMap::new();
    for entry in entries {
        by_course
            .entry(entry.course_code.clone())
            .or_default()
            .push(entry.clone());
    }

    let mut courses = Vec::new();
    let mut weighted_credits = Vec::new();
    for (course_code, course_entries) in by_course {
        let percentage = weighted_course_grade(&course_entries)?;
        let credits = course_entries[0].credits;
        weighted_credits.push((percentage, credits));
        courses.push(CourseGradeSummary {
            course_name: course_entries[0].course_name.clone(),
            course_code,
            credits,
            entry_count: course_entries.len(),
            percentage,
            letter: letters.letter_for(percentage).to_string(),
            grade_points: scale.grade_points(percentage),
        });
    }

    let gpa = gpa(&weighted_credits, scale)?;
    Ok(GradeOverview { courses, gpa })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn entry(course: &str, score: f64, max_score: f64, weight: f64) -> GradeEntry {
        GradeEntry {
            course_id: Uuid::new_v4(),
            course_code: course.to_string(),
            course_name: format!("{course} name"),
            credits: 3.0,
            title: "Quiz".to_string(),
            score,
            max_score,
            weight,
            graded_on: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
        }
    }

    #[test]
    fn assignment_percentage_allows_over_credit() {
        assert!((assignment_percentage(42.0, 50.0).unwrap() - 84.0).abs() < 1e-9);
        assert!((assignment_percentage(55.0, 50.0).unwrap() - 110.0).abs() < 1e-9);
    }

    #[test]
    fn assignment_percentage_rejects_non_positive_max() {
        assert_eq!(
            assignment_percentage(10.0, 0.0),
            Err(GradeError::InvalidScore(0.0))
        );
        assert_eq!(
            assignment_percentage(10.0, -5.0),
            Err(GradeError::InvalidScore(-5.0))
        );
    }

    #[test]
    fn weighted_grade_matches_worked_example() {
        let entries = vec![entry("CS301", 95.0, 100.0, 0.2), entry("CS301", 42.0, 50.0, 0.15)];
        let grade = weighted_course_grade(&entries).unwrap();
        let expected = (95.0 * 0.2 + 84.0 * 0.15) / 0.35;
        assert!((grade - expected).abs() < 1e-9);
        assert!((grade - 90.43).abs() < 0.01);
    }

    #[test]
    fn weighted_grade_rejects_empty_input() {
        assert_eq!(weighted_course_grade(&[]), Err(GradeError::NoEntries));
    }

    #[test]
    fn default_letters_are_monotonic() {
        let letters = LetterScale::default();
        let order = ["F", "C", "B-", "B", "B+", "A-", "A"];
        let rank = |letter: &str| order.iter().position(|l| *l == letter).unwrap();

        let mut previous = rank(letters.letter_for(0.0));
        for step in 1..=200 {
            let current = rank(letters.letter_for(step as f64 / 2.0));
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn default_letter_breakpoints() {
        let letters = LetterScale::default();
        assert_eq!(letters.letter_for(92.0), "A");
        assert_eq!(letters.letter_for(90.0), "A");
        assert_eq!(letters.letter_for(87.0), "A-");
        assert_eq!(letters.letter_for(75.0), "B");
        assert_eq!(letters.letter_for(59.9), "F");
    }

    #[test]
    fn custom_scale_overrides_the_table() {
        let letters = LetterScale::new(vec![
            (50.0, "pass".to_string()),
            (0.0, "fail".to_string()),
        ]);
        assert_eq!(letters.letter_for(50.0), "pass");
        assert_eq!(letters.letter_for(49.9), "fail");
    }

    #[test]
    fn four_point_scale_follows_institution_table() {
        let scale = GpaScale::FourPoint;
        assert_eq!(scale.grade_points(95.0), 4.0);
        assert_eq!(scale.grade_points(85.0), 3.0);
        assert_eq!(scale.grade_points(72.0), 2.0);
        assert_eq!(scale.grade_points(61.0), 1.0);
        assert_eq!(scale.grade_points(40.0), 0.0);
    }

    #[test]
    fn ten_point_scale_is_percentage_over_ten() {
        let scale = GpaScale::TenPoint;
        assert!((scale.grade_points(87.5) - 8.75).abs() < 1e-9);
        assert_eq!(scale.grade_points(115.0), 10.0);
    }

    #[test]
    fn gpa_weights_by_credits() {
        let courses = vec![(92.0, 4.0), (71.0, 2.0)];
        let value = gpa(&courses, GpaScale::FourPoint).unwrap();
        let expected = (4.0 * 4.0 + 2.0 * 2.0) / 6.0;
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn gpa_rejects_empty_or_creditless_input() {
        assert_eq!(gpa(&[], GpaScale::FourPoint), Err(GradeError::NoEntries));
        assert_eq!(
            gpa(&[(80.0, 0.0)], GpaScale::TenPoint),
            Err(GradeError::NoEntries)
        );
    }

    #[test]
    fn summarize_groups_by_course() {
        let entries = vec![
            entry("CS301", 95.0, 100.0, 0.2),
            entry("CS301", 42.0, 50.0, 0.15),
            entry("MA201", 30.0, 40.0, 1.0),
        ];
        let overview = summarize(&entries, GpaScale::FourPoint, &LetterScale::default()).unwrap();
        assert_eq!(overview.courses.len(), 2);
        assert_eq!(overview.courses[0].course_code, "CS301");
        assert_eq!(overview.courses[0].letter, "A");
        assert_eq!(overview.courses[1].course_code, "MA201");
        assert_eq!(overview.courses[1].letter, "B");
        // both courses carry 3 credits, so the GPA is a plain average
        assert!((overview.gpa - (4.0 + 2.0) / 2.0).abs() < 1e-9);
    }
}
