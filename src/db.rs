use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Weekday};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    weekday_from_index, AttendanceRecord, AttendanceStatus, GradeEntry, ScheduleSlot,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn upsert_course(
    pool: &PgPool,
    code: &str,
    name: &str,
    credits: f64,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO student_planner.courses (id, code, name, credits)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (code) DO UPDATE
        SET name = EXCLUDED.name, credits = EXCLUDED.credits
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(code)
    .bind(name)
    .bind(credits)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

pub async fn course_id(pool: &PgPool, code: &str) -> anyhow::Result<Uuid> {
    let row = sqlx::query("SELECT id FROM student_planner.courses WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("unknown course code: {code}"))?;
    Ok(row.get("id"))
}

/// Attendance is an append-only log: re-marking a date inserts a new row
/// that supersedes the old one at read time.
pub async fn mark_attendance(
    pool: &PgPool,
    code: &str,
    date: NaiveDate,
    status: AttendanceStatus,
    note: Option<&str>,
) -> anyhow::Result<()> {
    let course = course_id(pool, code).await?;
    sqlx::query(
        r#"
        INSERT INTO student_planner.attendance (id, course_id, date, status, note)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(course)
    .bind(date)
    .bind(status.as_str())
    .bind(note)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn add_grade(
    pool: &PgPool,
    code: &str,
    title: &str,
    score: f64,
    max_score: f64,
    weight: f64,
    graded_on: NaiveDate,
) -> anyhow::Result<()> {
    let course = course_id(pool, code).await?;
    sqlx::query(
        r#"
        INSERT INTO student_planner.grades
        (id, course_id, title, score, max_score, weight, graded_on)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(course)
    .bind(title)
    .bind(score)
    .bind(max_score)
    .bind(weight)
    .bind(graded_on)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_slot(
    pool: &PgPool,
    code: &str,
    day: Weekday,
    starts_at: NaiveTime,
    ends_at: NaiveTime,
    location: Option<&str>,
) -> anyhow::Result<()> {
    let course = course_id(pool, code).await?;
    sqlx::query(
        r#"
        INSERT INTO student_planner.schedule_slots
        (id, course_id, day, starts_at, ends_at, location)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(course)
    .bind(day.num_days_from_monday() as i16)
    .bind(starts_at)
    .bind(ends_at)
    .bind(location)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn fetch_attendance(
    pool: &PgPool,
    course: Option<&str>,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let mut query = String::from(
        "SELECT DISTINCT ON (a.course_id, a.date) \
         a.course_id, c.code, c.name, a.date, a.status, a.note \
         FROM student_planner.attendance a \
         JOIN student_planner.courses c ON c.id = a.course_id",
    );

    if course.is_some() {
        query.push_str(" WHERE c.code = $1");
    }
    query.push_str(" ORDER BY a.course_id, a.date, a.marked_at DESC");

    let mut rows = sqlx::query(&query);
    if let Some(code) = course {
        rows = rows.bind(code);
    }

    let mut records = Vec::new();
    for row in rows.fetch_all(pool).await? {
        let status: String = row.get("status");
        records.push(AttendanceRecord {
            course_id: row.get("course_id"),
            course_code: row.get("code"),
            course_name: row.get("name"),
            date: row.get("date"),
            status: status.parse()?,
            note: row.get("note"),
        });
    }

    Ok(records)
}

pub async fn fetch_grades(pool: &PgPool, course: Option<&str>) -> anyhow::Result<Vec<GradeEntry>> {
    let mut query = String::from(
        "SELECT g.course_id, c.code, c.name, c.credits, \
         g.title, g.score, g.max_score, g.weight, g.graded_on \
         FROM student_planner.grades g \
         JOIN student_planner.courses c ON c.id = g.course_id",
    );

    if course.is_some() {
        query.push_str(" WHERE c.code = $1");
    }
    query.push_str(" ORDER BY g.graded_on, g.created_at");

    let mut rows = sqlx::query(&query);
    if let Some(code) = course {
        rows = rows.bind(code);
    }

    let mut entries = Vec::new();
    for row in rows.fetch_all(pool).await? {
        entries.push(GradeEntry {
            course_id: row.get("course_id"),
            course_code: row.get("code"),
            course_name: row.get("name"),
            credits: row.get("credits"),
            title: row.get("title"),
            score: row.get("score"),
            max_score: row.get("max_score"),
            weight: row.get("weight"),
            graded_on: row.get("graded_on"),
        });
    }

    Ok(entries)
}

pub async fn fetch_slots(pool: &PgPool, day: Option<Weekday>) -> anyhow::Result<Vec<ScheduleSlot>> {
    let mut query = String::from(
        "SELECT s.id, c.code, s.day, s.starts_at, s.ends_at, s.location \
         FROM student_planner.schedule_slots s \
         JOIN student_planner.courses c ON c.id = s.course_id",
    );

    if day.is_some() {
        query.push_str(" WHERE s.day = $1");
    }
    query.push_str(" ORDER BY s.day, s.starts_at");

    let mut rows = sqlx::query(&query);
    if let Some(value) = day {
        rows = rows.bind(value.num_days_from_monday() as i16);
    }

    let mut slots = Vec::new();
    for row in rows.fetch_all(pool).await? {
        let day_index: i16 = row.get("day");
        slots.push(ScheduleSlot {
            id: row.get("id"),
            course_code: row.get("code"),
            day: weekday_from_index(day_index)
                .with_context(|| format!("invalid day index in schedule_slots: {day_index}"))?,
            starts_at: row.get("starts_at"),
            ends_at: row.get("ends_at"),
            location: row.get("location"),
        });
    }

    Ok(slots)
}

pub async fn import_attendance_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        course_code: String,
        course_name: String,
        credits: Option<f64>,
        date: NaiveDate,
        status: AttendanceStatus,
        note: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let course = upsert_course(
            pool,
            &row.course_code,
            &row.course_name,
            row.credits.unwrap_or(3.0),
        )
        .await?;

        sqlx::query(
            r#"
            INSERT INTO student_planner.attendance (id, course_id, date, status, note)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course)
        .bind(row.date)
        .bind(row.status.as_str())
        .bind(&row.note)
        .execute(pool)
        .await?;

        inserted += 1;
    }

    Ok(inserted)
}

pub async fn import_grades_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        course_code: String,
        course_name: String,
        credits: Option<f64>,
        title: String,
        score: f64,
        max_score: f64,
        weight: Option<f64>,
        graded_on: NaiveDate,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        anyhow::ensure!(
            row.max_score > 0.0,
            "max_score must be positive for {} / {}",
            row.course_code,
            row.title
        );

        let course = upsert_course(
            pool,
            &row.course_code,
            &row.course_name,
            row.credits.unwrap_or(3.0),
        )
        .await?;

        sqlx::query(
            r#"
            INSERT INTO student_planner.grades
            (id, course_id, title, score, max_score, weight, graded_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course)
        .bind(&row.title)
        .bind(row.score)
        .bind(row.max_score)
        .bind(row.weight.unwrap_or(1.0))
        .bind(row.graded_on)
        .execute(pool)
        .await?;

        inserted += 1;
    }

    Ok(inserted)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let courses = vec![
        (
            Uuid::parse_str("7f3b7a54-1c2d-4e8a-9b6f-2d4a8c1e5f90")?,
            "CS301",
            "Data Structures",
            4.0,
        ),
        (
            Uuid::parse_str("2a9e4c71-8f3b-4d25-a1c6-7b5e9d0f3a48")?,
            "MA201",
            "Linear Algebra",
            3.0,
        ),
        (
            Uuid::parse_str("c4d18e92-5a6b-47f3-b8d0-1e9a3c7f62b5")?,
            "PH105",
            "Physics Lab",
            2.0,
        ),
    ];

    for (id, code, name, credits) in courses {
        sqlx::query(
            r#"
            INSERT INTO student_planner.courses (id, code, name, credits)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (code) DO UPDATE
            SET name = EXCLUDED.name, credits = EXCLUDED.credits
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(name)
        .bind(credits)
        .execute(pool)
        .await?;
    }

    // Fixed ids keep the seed idempotent: re-running skips existing rows.
    let attendance = vec![
        ("seed-att-001", "CS301", (2026, 8, 3), "present", None),
        ("seed-att-002", "CS301", (2026, 8, 5), "present", None),
        ("seed-att-003", "CS301", (2026, 8, 10), "late", Some("bus delay")),
        ("seed-att-004", "CS301", (2026, 8, 12), "absent", Some("sick")),
        ("seed-att-005", "CS301", (2026, 8, 17), "present", None),
        ("seed-att-006", "CS301", (2026, 8, 19), "present", None),
        ("seed-att-007", "MA201", (2026, 8, 3), "present", None),
        ("seed-att-008", "MA201", (2026, 8, 10), "absent", None),
        ("seed-att-009", "MA201", (2026, 8, 17), "present", None),
        ("seed-att-010", "PH105", (2026, 8, 7), "present", None),
        ("seed-att-011", "PH105", (2026, 8, 14), "present", None),
        ("seed-att-012", "PH105", (2026, 8, 21), "late", None),
    ];

    for (key, code, (year, month, day), status, note) in attendance {
        let date = NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?;
        let course = course_id(pool, code).await?;
        sqlx::query(
            r#"
            INSERT INTO student_planner.attendance (id, course_id, date, status, note)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(seed_uuid(key))
        .bind(course)
        .bind(date)
        .bind(status)
        .bind(note)
        .execute(pool)
        .await?;
    }

    let grades = vec![
        ("seed-grade-001", "CS301", "Quiz 1", 18.0, 20.0, 0.1, (2026, 8, 7)),
        ("seed-grade-002", "CS301", "Midterm", 78.0, 100.0, 0.3, (2026, 8, 18)),
        ("seed-grade-003", "MA201", "Problem Set 1", 42.0, 50.0, 0.2, (2026, 8, 12)),
        ("seed-grade-004", "PH105", "Lab Report 1", 95.0, 100.0, 0.25, (2026, 8, 15)),
    ];

    for (key, code, title, score, max_score, weight, (year, month, day)) in grades {
        let graded_on = NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?;
        let course = course_id(pool, code).await?;
        sqlx::query(
            r#"
            INSERT INTO student_planner.grades
            (id, course_id, title, score, max_score, weight, graded_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(seed_uuid(key))
        .bind(course)
        .bind(title)
        .bind(score)
        .bind(max_score)
        .bind(weight)
        .bind(graded_on)
        .execute(pool)
        .await?;
    }

    let slots = vec![
        ("seed-slot-001", "CS301", Weekday::Mon, (9, 0), (10, 30), Some("ENG 204")),
        ("seed-slot-002", "CS301", Weekday::Wed, (9, 0), (10, 30), Some("ENG 204")),
        ("seed-slot-003", "MA201", Weekday::Mon, (11, 0), (12, 30), Some("SCI 101")),
        ("seed-slot-004", "MA201", Weekday::Thu, (11, 0), (12, 30), Some("SCI 101")),
        ("seed-slot-005", "PH105", Weekday::Fri, (14, 0), (17, 0), Some("LAB 3")),
    ];

    for (key, code, day, (start_h, start_m), (end_h, end_m), location) in slots {
        let starts_at = NaiveTime::from_hms_opt(start_h, start_m, 0).context("invalid time")?;
        let ends_at = NaiveTime::from_hms_opt(end_h, end_m, 0).context("invalid time")?;
        let course = course_id(pool, code).await?;
        sqlx::query(
            r#"
            INSERT INTO student_planner.schedule_slots
            (id, course_id, day, starts_at, ends_at, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(seed_uuid(key))
        .bind(course)
        .bind(day.num_days_from_monday() as i16)
        .bind(starts_at)
        .bind(ends_at)
        .bind(location)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn seed_uuid(key: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}
