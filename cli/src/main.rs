mod stats;

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;

use attendo_core::service::aggregate::{project_future, subject_totals};
use attendo_core::{
    canonical_day, day_name, parse_baseline_args, parse_marks, AttendanceStore,
    FileStateRepository, Status, StoreError, SubjectMark, Theme, Timetable,
};

#[derive(Parser)]
#[command(name = "attendo")]
#[command(about = "Track class attendance against a goal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show or edit the weekly timetable
    Timetable {
        #[command(subcommand)]
        command: TimetableCommands,
    },
    /// List registered subjects or remove one everywhere
    Subject {
        #[command(subcommand)]
        command: SubjectCommands,
    },
    /// Start a new month; the current log is archived first
    Month { name: String },
    /// Record pre-tracking history (usage: baseline Physics:12,3,1 ...);
    /// with no arguments marks the baseline step as done
    Baseline { entries: Vec<String> },
    /// Mark a date's scheduled classes (usage: mark Physics:a Math:c);
    /// unmentioned subjects count as missed
    Mark {
        /// Date to mark, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Per-subject statuses as NAME:STATUS (status may be abbreviated)
        marks: Vec<String>,
    },
    /// Delete the record for a date
    Unmark { date: String },
    /// Set or remove a single subject's mark on a date
    Fix {
        date: String,
        /// NAME:STATUS to set, or just NAME together with --remove
        entry: String,
        /// Remove the subject's mark instead of setting it
        #[arg(long)]
        remove: bool,
    },
    /// Show the record for one date
    Show { date: String },
    /// Per-subject percentages with goal advice
    Stats,
    /// Totals for each archived month
    History,
    /// Project the percentage after upcoming classes
    Project {
        subject: String,
        /// Number of upcoming classes
        #[arg(default_value_t = 1)]
        classes: u32,
        /// Assume they are missed instead of attended
        #[arg(long)]
        miss: bool,
    },
    /// Set the attendance goal percent (1-100)
    Goal { percent: u8 },
    /// Set the UI theme (light, dark, zen)
    Theme { theme: String },
    /// Set the accent color (#rrggbb)
    Accent { color: String },
    /// Write a JSON backup
    Export { path: Option<PathBuf> },
    /// Replace everything with the contents of a backup file
    Import {
        path: PathBuf,
        #[arg(long)]
        yes: bool,
    },
    /// Write a CSV attendance report
    Report { path: Option<PathBuf> },
    /// Delete all data
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(clap::Subcommand)]
enum TimetableCommands {
    /// Print the weekly timetable
    Show,
    /// Replace one day's subjects (usage: timetable set mon Physics Math Physics)
    Set { day: String, subjects: Vec<String> },
}

#[derive(clap::Subcommand)]
enum SubjectCommands {
    /// List registered subjects
    List,
    /// Remove a subject from the timetable and every record. Irreversible.
    Remove {
        name: String,
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let repo = FileStateRepository::new(None)?;
    let (mut store, recovered) = AttendanceStore::open(repo);
    if recovered {
        println!("Warning: some saved data could not be read and was reset to defaults.");
    }

    match cli.command {
        Commands::Timetable { command } => match command {
            TimetableCommands::Show => stats::show_timetable(store.state()),
            TimetableCommands::Set { day, subjects } => {
                let Some(day) = canonical_day(&day) else {
                    println!("Error: \"{day}\" is not a weekday name.");
                    return Ok(());
                };
                let mut timetable: Timetable = store.state().timetable.clone();
                timetable.insert(
                    day.to_string(),
                    subjects
                        .iter()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                );
                if apply(store.set_timetable(timetable)) {
                    println!("Timetable saved.");
                    stats::show_timetable(store.state());
                }
            }
        },
        Commands::Subject { command } => match command {
            SubjectCommands::List => stats::show_subjects(store.state()),
            SubjectCommands::Remove { name, yes } => {
                if !yes {
                    println!(
                        "\"{name}\" would be removed from the timetable and every past \
                         record, and this cannot be undone. Re-run with --yes to confirm."
                    );
                    return Ok(());
                }
                if apply(store.delete_subject(&name)) {
                    println!("Subject \"{name}\" deleted everywhere.");
                }
            }
        },
        Commands::Month { name } => {
            if apply(store.start_month(&name)) {
                println!("Started month \"{}\".", name.trim());
            }
        }
        Commands::Baseline { entries } => {
            let counts = parse_baseline_args(&entries)?;
            if apply(store.apply_baseline(&counts)) {
                if counts.is_empty() {
                    println!("Recorded an empty baseline.");
                } else {
                    println!("Baseline saved for {} subject(s).", counts.len());
                }
            }
        }
        Commands::Mark { date, marks } => {
            let date = date.unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
            let day = weekday_of(&date)?;
            let scheduled = store
                .state()
                .timetable
                .get(day)
                .cloned()
                .unwrap_or_default();
            if scheduled.is_empty() {
                println!("No classes scheduled for {day}.");
                return Ok(());
            }

            let overrides = parse_marks(&marks)?;
            for (name, _) in &overrides {
                if !scheduled.contains(name) {
                    println!("Warning: \"{name}\" is not scheduled on {day}, ignoring it.");
                }
            }
            let status_of = |name: &str| {
                overrides
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, s)| *s)
                    .unwrap_or(Status::Missed)
            };
            let subjects: Vec<SubjectMark> = scheduled
                .iter()
                .map(|name| SubjectMark {
                    name: name.clone(),
                    status: status_of(name),
                })
                .collect();

            if apply(store.record_attendance(&date, day, subjects)) {
                println!("Attendance saved for {date} ({day}).");
            }
        }
        Commands::Unmark { date } => {
            if apply(store.delete_attendance(&date)) {
                println!("Attendance for {date} deleted.");
            }
        }
        Commands::Fix { date, entry, remove } => {
            let day = weekday_of(&date)?;
            if remove {
                if apply(store.remove_mark(&date, entry.trim())) {
                    println!("Removed \"{}\" from {date}.", entry.trim());
                }
            } else {
                let marks = parse_marks(&[entry])?;
                let (name, status) = &marks[0];
                if apply(store.amend_record(&date, day, name, *status)) {
                    println!("Set \"{name}\" to {} on {date}.", status.as_str());
                }
            }
        }
        Commands::Show { date } => match store.state().record_for_date(&date) {
            Some(record) => {
                println!("{} ({}), month: {}", record.date, record.day, record.month);
                for mark in &record.subjects {
                    println!("  {}: {}", mark.name, mark.status.as_str());
                }
            }
            None => println!("No attendance recorded for {date}."),
        },
        Commands::Stats => stats::show_stats(store.state(), store.settings()),
        Commands::History => stats::show_history(store.state()),
        Commands::Project {
            subject,
            classes,
            miss,
        } => {
            if !store.state().subjects.contains_key(&subject) {
                println!("Error: subject \"{subject}\" is not registered.");
                return Ok(());
            }
            let classes = classes.max(1);
            let totals = subject_totals(store.state());
            let current = totals.get(&subject).copied().unwrap_or_default();
            let projection = project_future(current, classes, !miss);
            let verb = if miss { "miss" } else { "attend" };
            let plural = if classes == 1 { "class" } else { "classes" };
            println!(
                "If you {verb} the next {classes} {plural} of {subject}, you land on \
                 {:.2}% ({}/{}).",
                projection.percent, projection.attended, projection.total
            );
        }
        Commands::Goal { percent } => {
            if apply(store.set_goal(percent)) {
                println!("Attendance goal set to {percent}%.");
            }
        }
        Commands::Theme { theme } => match theme.parse::<Theme>() {
            Ok(theme) => {
                if apply(store.set_theme(theme)) {
                    println!("Theme set to {theme}.");
                }
            }
            Err(err) => println!("Error: {err}"),
        },
        Commands::Accent { color } => {
            if apply(store.set_accent(&color)) {
                println!("Accent color set to {color}.");
            }
        }
        Commands::Export { path } => {
            let path = path.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "attendance_backup_{}.json",
                    Local::now().format("%Y-%m-%d")
                ))
            });
            fs::write(&path, store.export_json())?;
            println!("Data exported to {}.", path.display());
        }
        Commands::Import { path, yes } => {
            if !yes {
                println!(
                    "Importing replaces all current settings and records and cannot be \
                     undone. Re-run with --yes to confirm."
                );
                return Ok(());
            }
            let json = fs::read_to_string(&path)?;
            match store.import_json(&json) {
                Ok(false) => println!("Data imported successfully."),
                Ok(true) => println!(
                    "Data imported; some unreadable parts of the backup were discarded."
                ),
                Err(err) => report(err),
            }
        }
        Commands::Report { path } => {
            let path = path.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "attendance_report_{}.csv",
                    Local::now().format("%Y-%m-%d")
                ))
            });
            let totals = subject_totals(store.state());
            fs::write(&path, attendo_core::csv_report(&totals))?;
            println!("Report written to {}.", path.display());
        }
        Commands::Reset { yes } => {
            if !yes {
                println!("This deletes every record and setting. Re-run with --yes to confirm.");
                return Ok(());
            }
            if apply(store.reset()) {
                println!("All data deleted.");
            }
        }
    }

    Ok(())
}

/// Prints a store error in the right tone and tells the caller whether
/// the operation went through. Persistence failures did change the
/// in-memory state, but that state dies with the process, so they read
/// as warnings about lost work.
fn apply(result: Result<(), StoreError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            report(err);
            false
        }
    }
}

fn report(err: StoreError) {
    match err {
        StoreError::Persistence(_) => println!("Warning: {err}"),
        other => println!("Error: {other}"),
    }
}

fn weekday_of(date: &str) -> Result<&'static str> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date '{date}', expected YYYY-MM-DD"))?;
    Ok(day_name(parsed.weekday()))
}
