use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Utc, Weekday};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod attendance;
mod db;
mod grades;
mod models;
mod report;
mod schedule;

use grades::{GpaScale, GradeError, LetterScale};
use models::AttendanceStatus;

#[derive(Parser)]
#[command(name = "student-planner")]
#[command(about = "Attendance, grade, and schedule tracker for students", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Register a course (or update its name and credits)
    AddCourse {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 3.0)]
        credits: f64,
    },
    /// Mark attendance for a course on a date (appends to the log)
    Mark {
        #[arg(long)]
        course: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum)]
        status: AttendanceStatus,
        #[arg(long)]
        note: Option<String>,
    },
    /// Record a graded assignment
    AddGrade {
        #[arg(long)]
        course: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        score: f64,
        #[arg(long)]
        max_score: f64,
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Add a weekly schedule slot, rejecting overlaps
    AddSlot {
        #[arg(long)]
        course: String,
        #[arg(long)]
        day: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        location: Option<String>,
    },
    /// Per-course attendance summary with threshold predictions
    Attendance {
        #[arg(long)]
        course: Option<String>,
        #[arg(long, default_value_t = 75.0)]
        threshold: f64,
        #[arg(long)]
        json: bool,
    },
    /// Per-course weighted grades and GPA
    Grades {
        #[arg(long)]
        course: Option<String>,
        #[arg(long, value_enum, default_value = "four-point")]
        scale: GpaScale,
        #[arg(long)]
        json: bool,
    },
    /// Weekly schedule with conflicts flagged
    Schedule {
        #[arg(long)]
        day: Option<String>,
    },
    /// Import attendance records from a CSV file
    ImportAttendance {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import grade entries from a CSV file
    ImportGrades {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value_t = 75.0)]
        threshold: f64,
        #[arg(long, default_value = "planner-report.md")]
        out: PathBuf,
    },
}

fn parse_weekday(value: &str) -> anyhow::Result<Weekday> {
    value
        .parse::<Weekday>()
        .map_err(|_| anyhow::anyhow!("unknown weekday: {value}"))
}

fn parse_time(value: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("time must be HH:MM, got {value}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::AddCourse {
            code,
            name,
            credits,
        } => {
            db::upsert_course(&pool, &code, &name, credits).await?;
            println!("Course {code} saved.");
        }
        Commands::Mark {
            course,
            date,
            status,
            note,
        } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            db::mark_attendance(&pool, &course, date, status, note.as_deref()).await?;
            println!("Marked {} for {course} on {date}.", status.as_str());
        }
        Commands::AddGrade {
            course,
            title,
            score,
            max_score,
            weight,
            date,
        } => {
            grades::assignment_percentage(score, max_score)?;
            let graded_on = date.unwrap_or_else(|| Utc::now().date_naive());
            db::add_grade(&pool, &course, &title, score, max_score, weight, graded_on).await?;
            println!("Grade {title} added for {course}.");
        }
        Commands::AddSlot {
            course,
            day,
            start,
            end,
            location,
        } => {
            let day = parse_weekday(&day)?;
            let starts_at = parse_time(&start)?;
            let ends_at = parse_time(&end)?;
            anyhow::ensure!(starts_at < ends_at, "slot must end after it starts");

            let new_slot = models::ScheduleSlot {
                id: uuid::Uuid::new_v4(),
                course_code: course.clone(),
                day,
                starts_at,
                ends_at,
                location: location.clone(),
            };

            let existing = db::fetch_slots(&pool, None).await?;
            match schedule::add_slot(&existing, new_slot) {
                Ok(_) => {
                    db::insert_slot(&pool, &course, day, starts_at, ends_at, location.as_deref())
                        .await?;
                    println!("Slot added: {course} on {day} {start}-{end}.");
                }
                Err(err) => {
                    println!("Slot rejected, it overlaps:");
                    for slot in err.conflicts.iter() {
                        println!(
                            "- {} on {} {}-{}",
                            slot.course_code,
                            slot.day,
                            slot.starts_at.format("%H:%M"),
                            slot.ends_at.format("%H:%M")
                        );
                    }
                    std::process::exit(1);
                }
            }
        }
        Commands::Attendance {
            course,
            threshold,
            json,
        } => {
            let records = db::fetch_attendance(&pool, course.as_deref()).await?;
            let summaries = attendance::summarize(&records, threshold)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("No attendance recorded.");
            } else {
                for summary in summaries.iter() {
                    println!(
                        "{} {}: {}/{} ({:.1}%, {})",
                        summary.course_code,
                        summary.course_name,
                        summary.attended,
                        summary.total,
                        summary.percentage,
                        summary.standing.label()
                    );
                    println!(
                        "  needs {} more for {:.0}%, can miss {}, trend {:?} ({:+.2}/week)",
                        summary.classes_needed,
                        threshold,
                        summary.max_missable,
                        summary.trend.direction,
                        summary.trend.slope
                    );
                }
            }
        }
        Commands::Grades {
            course,
            scale,
            json,
        } => {
            let entries = db::fetch_grades(&pool, course.as_deref()).await?;
            match grades::summarize(&entries, scale, &LetterScale::default()) {
                Ok(overview) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&overview)?);
                    } else {
                        for course in overview.courses.iter() {
                            println!(
                                "{} {}: {:.1}% ({}) across {} entries, {} credits",
                                course.course_code,
                                course.course_name,
                                course.percentage,
                                course.letter,
                                course.entry_count,
                                course.credits
                            );
                        }
                        if course.is_some() {
                            for entry in entries.iter() {
                                println!(
                                    "  {} on {}: {:.1}% (weight {})",
                                    entry.title,
                                    entry.graded_on,
                                    grades::assignment_percentage(entry.score, entry.max_score)?,
                                    entry.weight
                                );
                            }
                        }
                        println!("GPA ({} scale): {:.2}", scale.label(), overview.gpa);
                    }
                }
                Err(GradeError::NoEntries) => println!("No grades recorded."),
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Schedule { day } => {
            let day = day.as_deref().map(parse_weekday).transpose()?;
            let slots = db::fetch_slots(&pool, day).await?;

            if slots.is_empty() {
                println!("No schedule slots recorded.");
                return Ok(());
            }

            for slot in slots.iter() {
                println!(
                    "{} {}-{} {} {}",
                    slot.day,
                    slot.starts_at.format("%H:%M"),
                    slot.ends_at.format("%H:%M"),
                    slot.course_code,
                    slot.location.as_deref().unwrap_or("-")
                );
            }

            let conflicts = schedule::find_conflicts(&slots);
            if !conflicts.is_empty() {
                println!("Conflicts:");
                for (first, second) in conflicts.iter() {
                    println!(
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
        }
        Commands::ImportAttendance { csv } => {
            let inserted = db::import_attendance_csv(&pool, &csv).await?;
            println!("Inserted {inserted} attendance records from {}.", csv.display());
        }
        Commands::ImportGrades { csv } => {
            let inserted = db::import_grades_csv(&pool, &csv).await?;
            println!("Inserted {inserted} grade entries from {}.", csv.display());
        }
        Commands::Report { threshold, out } => {
            let records = db::fetch_attendance(&pool, None).await?;
            let entries = db::fetch_grades(&pool, None).await?;
            let slots = db::fetch_slots(&pool, None).await?;
            let report = report::build_report(threshold, &records, &entries, &slots)?;
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
