use std::collections::BTreeMap;

use chrono::Datelike;
use thiserror::Error;

use crate::models::{
    AttendanceRecord, AttendanceTrend, CourseAttendanceSummary, Standing, TrendDirection,
};

/// Slopes this close to zero are reported as flat so week-to-week noise
/// does not flip the direction.
const TREND_DEADBAND: f64 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum AttendanceError {
    #[error("attendance threshold {0} must be at least 0 and below 100")]
    InvalidThreshold(f64),
}

pub fn attendance_percentage(records: &[AttendanceRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let attended = records
        .iter()
        .filter(|record| record.status.counts_as_attended())
        .count();
    attended as f64 * 100.0 / records.len() as f64
}

/// Minimum number of consecutive attended classes needed to lift the
/// percentage to the threshold: the smallest n with
/// (attended + n) / (total + n) >= threshold / 100.
pub fn classes_needed(attended: u32, total: u32, threshold: f64) -> Result<u32, AttendanceError> {
    if !(0.0..100.0).contains(&threshold) {
        return Err(AttendanceError::InvalidThreshold(threshold));
    }
    let shortfall = threshold * total as f64 - 100.0 * attended as f64;
    let needed = (shortfall / (100.0 - threshold)).ceil();
    Ok(needed.max(0.0) as u32)
}

/// Largest number of additional absences that keeps the percentage at or
/// above the threshold: attended * 100 >= threshold * (total + m).
/// A threshold of zero makes the bound meaningless, so it is rejected here
/// even though `classes_needed` accepts it.
pub fn max_missable(attended: u32, total: u32, threshold: f64) -> Result<u32, AttendanceError> {
    if threshold <= 0.0 || threshold >= 100.0 {
        return Err(AttendanceError::InvalidThreshold(threshold));
    }
    let room = attended as f64 * 100.0 / threshold - total as f64;
    Ok(room.floor().max(0.0) as u32)
}

pub fn standing(percentage: f64, threshold: f64) -> Standing {
    if percentage >= threshold + 5.0 {
        Standing::Good
    } else if percentage >= threshold {
        Standing::Warning
    } else {
        Standing::AtRisk
    }
}

/// Buckets a record log into ordered per-ISO-week percentages, the input
/// for `trend`.
pub fn weekly_percentages(records: &[AttendanceRecord]) -> Vec<f64> {
    let mut weeks: BTreeMap<(i32, u32), (u32, u32)> = BTreeMap::new();

    for record in records {
        let iso = record.date.iso_week();
        let entry = weeks.entry((iso.year(), iso.week())).or_insert((0, 0));
        if record.status.counts_as_attended() {
            entry.0 += 1;
        }
        entry.1 += 1;
    }

    weeks
        .into_values()
        .map(|(attended, total)| attended as f64 * 100.0 / total as f64)
        .collect()
}

/// Least-squares slope over the ordered weekly percentages. Fewer than two
/// points is always flat.
pub fn trend(weekly: &[f64]) -> AttendanceTrend {
    if weekly.len() < 2 {
        return AttendanceTrend {
            direction: TrendDirection::Flat,
            slope: 0.0,
        };
    }

    let count = weekly.len() as f64;
    let mean_x = (count - 1.0) / 2.0;
    let mean_y = weekly.iter().sum::<f64>() / count;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (week, value) in weekly.iter().enumerate() {
        let dx = week as f64 - mean_x;
        numerator += dx * (value - mean_y);
        denominator += dx * dx;
    }

    let slope = numerator / denominator;
    let direction = if slope.abs() < TREND_DEADBAND {
        TrendDirection::Flat
    } else if slope > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    AttendanceTrend { direction, slope }
}

/// Per-course summaries derived from a full record log. The log is the
/// source of truth; nothing here is persisted.
pub fn summarize(
    records: &[AttendanceRecord],
    threshold: f64,
) -> Result<Vec<CourseAttendanceSummary>, AttendanceError> {
    let mut by_course: BTreeMap<String, Vec<AttendanceRecord>> = BTreeMap::new();
    for record in records {
        by_course
            .entry(record.course_code.clone())
            .or_default()
            .push(record.clone());
    }

    let mut summaries = Vec::new();
    for (course_code, course_records) in by_course {
        let attended = course_records
            .iter()
            .filter(|record| record.status.counts_as_attended())
            .count() as u32;
        let total = course_records.len() as u32;
        let percentage = attendance_percentage(&course_records);

        summaries.push(CourseAttendanceSummary {
            course_name: course_records[0].course_name.clone(),
            course_code,
            attended,
            total,
            percentage,
            threshold,
            standing: standing(percentage, threshold),
            classes_needed: classes_needed(attended, total, threshold)?,
            max_missable: max_missable(attended, total, threshold)?,
            trend: trend(&weekly_percentages(&course_records)),
        });
    }

    Ok(summaries)
}
