use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::model::record::{AttendanceRecord, MonthSnapshot, Status, SubjectMark, BASELINE_MONTH};

/// Weekday names in timetable order (Monday first).
pub const DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Colors handed out to newly registered subjects, cycling.
pub const PALETTE: [&str; 8] = [
    "#007aff", "#34c759", "#ff9500", "#ff3b30", "#af52de", "#5856d6", "#ff2d55", "#ffcc00",
];

pub fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn is_valid_day(name: &str) -> bool {
    DAYS.contains(&name)
}

/// Maps user input like "mon" or "MONDAY" to the canonical day name.
pub fn canonical_day(input: &str) -> Option<&'static str> {
    match input.trim().to_lowercase().as_str() {
        "mon" | "monday" => Some("Monday"),
        "tue" | "tuesday" => Some("Tuesday"),
        "wed" | "wednesday" => Some("Wednesday"),
        "thu" | "thursday" => Some("Thursday"),
        "fri" | "friday" => Some("Friday"),
        "sat" | "saturday" => Some("Saturday"),
        "sun" | "sunday" => Some("Sunday"),
        _ => None,
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubjectMeta {
    pub color: String,
    #[serde(default)]
    pub icon: String,
}

pub type Timetable = BTreeMap<String, Vec<String>>;
pub type SubjectRegistry = BTreeMap<String, SubjectMeta>;

/// Canonical in-memory state. All mutation goes through these methods or
/// the store that owns the state; there is no ambient shared data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub timetable: Timetable,
    pub subjects: SubjectRegistry,
    pub attendance: Vec<AttendanceRecord>,
    pub history: Vec<MonthSnapshot>,
    pub current_month: Option<String>,
}

impl State {
    /// Guarantees every one of the seven weekdays has a timetable entry.
    pub fn ensure_weekdays(&mut self) -> bool {
        let mut changed = false;
        for day in DAYS {
            if !self.timetable.contains_key(day) {
                self.timetable.insert(day.to_string(), Vec::new());
                changed = true;
            }
        }
        changed
    }

    /// Registers a subject with the next free palette color. No-op for
    /// blank or already-known names.
    pub fn add_subject(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.subjects.contains_key(name) {
            return false;
        }
        let color = self.next_color();
        self.subjects.insert(
            name.to_string(),
            SubjectMeta {
                color,
                icon: String::new(),
            },
        );
        true
    }

    fn next_color(&self) -> String {
        let mut index = self.subjects.len() % PALETTE.len();
        let mut attempts = 0;
        // Skip colors already handed out twice while the palette still has
        // spare entries.
        while attempts < PALETTE.len() {
            let in_use = self
                .subjects
                .values()
                .filter(|meta| meta.color == PALETTE[index])
                .count();
            if in_use <= 1 {
                break;
            }
            index = (index + 1) % PALETTE.len();
            attempts += 1;
        }
        PALETTE[index].to_string()
    }

    /// Removes a subject everywhere: registry, every timetable day, every
    /// record in the active log and history. Records left without any
    /// subject are pruned. Returns false if the name was not registered.
    pub fn delete_subject(&mut self, name: &str) -> bool {
        if self.subjects.remove(name).is_none() {
            return false;
        }
        for subjects in self.timetable.values_mut() {
            subjects.retain(|n| n != name);
        }
        strip_subject(&mut self.attendance, name);
        for month in &mut self.history {
            strip_subject(&mut month.attendance, name);
        }
        true
    }

    /// Replaces the whole timetable and registers every name it mentions.
    pub fn set_timetable(&mut self, timetable: Timetable) {
        self.timetable = timetable;
        self.ensure_weekdays();
        let names: Vec<String> = self.timetable.values().flatten().cloned().collect();
        for name in names {
            self.add_subject(&name);
        }
    }

    /// Upserts the active-log record for `date`, tagging new records with
    /// the given month name.
    pub fn upsert_record(
        &mut self,
        date: &str,
        day: &str,
        month: &str,
        subjects: Vec<SubjectMark>,
    ) {
        if let Some(existing) = self.attendance.iter_mut().find(|r| r.date == date) {
            existing.subjects = subjects;
            existing.day = day.to_string();
        } else {
            self.attendance.push(AttendanceRecord {
                day: day.to_string(),
                date: date.to_string(),
                month: month.to_string(),
                subjects,
            });
        }
    }

    pub fn delete_record(&mut self, date: &str) -> bool {
        let before = self.attendance.len();
        self.attendance.retain(|r| r.date != date);
        self.attendance.len() != before
    }

    /// Archives the in-progress log (when non-empty) under the active
    /// month's name, then makes `name` the active month with a fresh log.
    pub fn start_month(&mut self, name: &str) {
        if let Some(active) = &self.current_month {
            if !self.attendance.is_empty() {
                self.history.push(MonthSnapshot {
                    month_name: active.clone(),
                    attendance: self.attendance.clone(),
                });
            }
        }
        self.current_month = Some(name.to_string());
        self.attendance.clear();
    }

    /// Replaces the "Previous Data" snapshot with one built from exact
    /// per-subject counts. All-zero counts still leave an empty snapshot
    /// behind as a "baseline step completed" sentinel.
    pub fn apply_baseline(&mut self, counts: &BTreeMap<String, BaselineCounts>) {
        self.history.retain(|m| !m.is_baseline());

        let mut subjects = Vec::new();
        for (name, c) in counts {
            self.add_subject(name);
            for _ in 0..c.attended {
                subjects.push(SubjectMark {
                    name: name.clone(),
                    status: Status::Attended,
                });
            }
            for _ in 0..c.missed {
                subjects.push(SubjectMark {
                    name: name.clone(),
                    status: Status::Missed,
                });
            }
            for _ in 0..c.cancelled {
                subjects.push(SubjectMark {
                    name: name.clone(),
                    status: Status::Cancelled,
                });
            }
        }

        let attendance = if subjects.is_empty() {
            Vec::new()
        } else {
            vec![AttendanceRecord {
                day: "N/A".to_string(),
                date: "N/A".to_string(),
                month: BASELINE_MONTH.to_string(),
                subjects,
            }]
        };
        self.history.push(MonthSnapshot {
            month_name: BASELINE_MONTH.to_string(),
            attendance,
        });
    }

    pub fn has_baseline(&self) -> bool {
        self.history.iter().any(|m| m.is_baseline())
    }

    /// Looks a date up in the active log first, then in history.
    pub fn record_for_date(&self, date: &str) -> Option<&AttendanceRecord> {
        self.attendance
            .iter()
            .find(|r| r.date == date)
            .or_else(|| {
                self.history
                    .iter()
                    .flat_map(|m| m.attendance.iter())
                    .find(|r| r.date == date)
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaselineCounts {
    pub attended: u32,
    pub missed: u32,
    pub cancelled: u32,
}

fn strip_subject(records: &mut Vec<AttendanceRecord>, name: &str) {
    for record in records.iter_mut() {
        record.subjects.retain(|s| s.name != name);
    }
    records.retain(|r| !r.subjects.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_names_canonicalize() {
        assert_eq!(canonical_day("mon"), Some("Monday"));
        assert_eq!(canonical_day("  SUNDAY "), Some("Sunday"));
        assert_eq!(canonical_day("someday"), None);
    }

    #[test]
    fn add_subject_ignores_blank_and_duplicate_names() {
        let mut state = State::default();
        assert!(!state.add_subject("   "));
        assert!(state.add_subject("Physics"));
        assert!(!state.add_subject("Physics"));
        assert_eq!(state.subjects.len(), 1);
    }

    #[test]
    fn subject_colors_cycle_through_palette() {
        let mut state = State::default();
        for i in 0..PALETTE.len() {
            state.add_subject(&format!("Subject {i}"));
        }
        state.add_subject("Wraparound");
        let colors: Vec<&str> = state.subjects.values().map(|m| m.color.as_str()).collect();
        for color in PALETTE {
            assert!(colors.contains(&color));
        }
        assert_eq!(state.subjects["Wraparound"].color, PALETTE[0]);
    }

    #[test]
    fn set_timetable_registers_every_name() {
        let mut state = State::default();
        let mut timetable = Timetable::new();
        timetable.insert(
            "Monday".to_string(),
            vec!["Physics".to_string(), "Math".to_string(), "Physics".to_string()],
        );
        state.set_timetable(timetable);
        assert!(state.subjects.contains_key("Physics"));
        assert!(state.subjects.contains_key("Math"));
        // Every weekday exists even when the input only named one.
        assert_eq!(state.timetable.len(), 7);
        assert_eq!(state.timetable["Monday"].len(), 3);
    }

    #[test]
    fn start_month_archives_nonempty_log() {
        let mut state = State::default();
        state.start_month("Feb");
        state.upsert_record("2026-02-02", "Monday", "Feb", Vec::new());
        state.upsert_record("2026-02-03", "Tuesday", "Feb", Vec::new());
        state.start_month("March");

        assert_eq!(state.current_month.as_deref(), Some("March"));
        assert!(state.attendance.is_empty());
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].month_name, "Feb");
        assert_eq!(state.history[0].attendance.len(), 2);
    }

    #[test]
    fn start_month_with_empty_log_archives_nothing() {
        let mut state = State::default();
        state.start_month("Feb");
        state.start_month("March");
        assert!(state.history.is_empty());
    }

    #[test]
    fn baseline_is_replace_on_save() {
        let mut state = State::default();
        let mut counts = BTreeMap::new();
        counts.insert(
            "Physics".to_string(),
            BaselineCounts {
                attended: 2,
                missed: 1,
                cancelled: 1,
            },
        );
        state.apply_baseline(&counts);
        state.apply_baseline(&counts);

        let baselines: Vec<_> = state.history.iter().filter(|m| m.is_baseline()).collect();
        assert_eq!(baselines.len(), 1);
        assert_eq!(baselines[0].attendance[0].subjects.len(), 4);
    }

    #[test]
    fn all_zero_baseline_leaves_sentinel_snapshot() {
        let mut state = State::default();
        state.apply_baseline(&BTreeMap::new());
        assert!(state.has_baseline());
        assert!(state.history[0].attendance.is_empty());
    }
}
