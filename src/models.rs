use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
        }
    }

    /// Late arrivals still count toward the attendance percentage.
    pub fn counts_as_attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

impl FromStr for AttendanceStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            other => Err(anyhow::anyhow!("unknown attendance status: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub course_id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GradeEntry {
    pub course_id: Uuid,
    pub course_code: String,
    pub course_name: String,
    pub credits: f64,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
    pub weight: f64,
    pub graded_on: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ScheduleSlot {
    pub id: Uuid,
    pub course_code: String,
    pub day: Weekday,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Good,
    Warning,
    AtRisk,
}

impl Standing {
    pub fn label(&self) -> &'static str {
        match self {
            Standing::Good => "good",
            Standing::Warning => "warning",
            Standing::AtRisk => "at risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AttendanceTrend {
    pub direction: TrendDirection,
    pub slope: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseAttendanceSummary {
    pub course_code: String,
    pub course_name: String,
    pub attended: u32,
    pub total: u32,
    pub percentage: f64,
    pub threshold: f64,
    pub standing: Standing,
    pub classes_needed: u32,
    pub max_missable: u32,
    pub trend: AttendanceTrend,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseGradeSummary {
    pub course_code: String,
    pub course_name: String,
    pub credits: f64,
    pub entry_count: usize,
    pub percentage: f64,
    pub letter: String,
    pub grade_points: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeOverview {
    pub courses: Vec<CourseGradeSummary>,
    pub gpa: f64,
}

/// Schedule days are stored as days-from-Monday (0 = Monday .. 6 = Sunday).
pub fn weekday_from_index(index: i16) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}
