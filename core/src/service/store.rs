use std::collections::BTreeMap;

use log::warn;

use crate::error::{StoreError, StoreResult};
use crate::migrate::{load_state, RawState};
use crate::model::record::{Status, SubjectMark};
use crate::model::settings::{is_hex_color, Settings, Theme};
use crate::model::state::{is_valid_day, BaselineCounts, State, Timetable};
use crate::repository::StateRepository;
use crate::service::backup;

/// Owns the canonical state and the repository behind it. Every public
/// operation completes its own persistence call before returning; a
/// failed save is reported while the in-memory change stays visible, so
/// the session keeps working.
pub struct AttendanceStore<R: StateRepository> {
    repo: R,
    state: State,
    settings: Settings,
}

impl<R: StateRepository> AttendanceStore<R> {
    /// Loads and migrates persisted data. Never fails: unreadable or
    /// corrupted input falls back to empty defaults, and the returned
    /// flag tells the caller a recovery happened.
    pub fn open(repo: R) -> (Self, bool) {
        let mut recovered = false;
        let raw = repo.load_raw().unwrap_or_else(|err| {
            warn!("could not read saved data, starting fresh: {err}");
            recovered = true;
            RawState::default()
        });
        let settings = repo.load_settings().unwrap_or_else(|err| {
            warn!("could not read settings, using defaults: {err}");
            Settings::default()
        });

        let outcome = load_state(raw);
        recovered |= outcome.recovered;
        let mut store = Self {
            repo,
            state: outcome.state,
            settings,
        };
        if outcome.changed {
            if let Err(err) = store.persist() {
                warn!("could not persist migrated data: {err}");
            }
        }
        (store, recovered)
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn add_subject(&mut self, name: &str) -> StoreResult<()> {
        if self.state.add_subject(name) {
            self.persist()?;
        }
        Ok(())
    }

    /// Cascading removal; the caller confirms intent beforehand, this
    /// does not ask twice.
    pub fn delete_subject(&mut self, name: &str) -> StoreResult<()> {
        if !self.state.delete_subject(name) {
            return Err(StoreError::Precondition(format!(
                "subject \"{name}\" is not registered"
            )));
        }
        self.persist()
    }

    pub fn set_timetable(&mut self, timetable: Timetable) -> StoreResult<()> {
        for day in timetable.keys() {
            if !is_valid_day(day) {
                return Err(StoreError::Validation {
                    field: "day",
                    reason: format!("\"{day}\" is not a weekday name"),
                });
            }
        }
        self.state.set_timetable(timetable);
        self.persist()
    }

    /// Date-keyed upsert into the active log. Marks for subjects that are
    /// no longer registered are dropped on the way in.
    pub fn record_attendance(
        &mut self,
        date: &str,
        day: &str,
        marks: Vec<SubjectMark>,
    ) -> StoreResult<()> {
        let Some(month) = self.state.current_month.clone() else {
            return Err(StoreError::Precondition(
                "no active month; start one first".to_string(),
            ));
        };
        if date.trim().is_empty() {
            return Err(StoreError::Validation {
                field: "date",
                reason: "must not be blank".to_string(),
            });
        }
        if !is_valid_day(day) {
            return Err(StoreError::Validation {
                field: "day",
                reason: format!("\"{day}\" is not a weekday name"),
            });
        }

        let marks: Vec<SubjectMark> = marks
            .into_iter()
            .filter(|m| self.state.subjects.contains_key(&m.name))
            .collect();
        if marks.is_empty() {
            return Err(StoreError::Precondition(format!(
                "no registered subjects to record for {date}"
            )));
        }

        self.state.upsert_record(date, day, &month, marks);
        self.persist()
    }

    pub fn delete_attendance(&mut self, date: &str) -> StoreResult<()> {
        if !self.state.delete_record(date) {
            return Err(StoreError::Precondition(format!(
                "no attendance recorded for {date}"
            )));
        }
        self.persist()
    }

    /// Upserts one subject's mark on a date, creating the record if the
    /// date has none yet.
    pub fn amend_record(
        &mut self,
        date: &str,
        day: &str,
        name: &str,
        status: Status,
    ) -> StoreResult<()> {
        let Some(month) = self.state.current_month.clone() else {
            return Err(StoreError::Precondition(
                "no active month; start one first".to_string(),
            ));
        };
        if !self.state.subjects.contains_key(name) {
            return Err(StoreError::Precondition(format!(
                "subject \"{name}\" is not registered"
            )));
        }
        if !is_valid_day(day) {
            return Err(StoreError::Validation {
                field: "day",
                reason: format!("\"{day}\" is not a weekday name"),
            });
        }

        let mark = SubjectMark {
            name: name.to_string(),
            status,
        };
        if let Some(record) = self.state.attendance.iter_mut().find(|r| r.date == date) {
            record.day = day.to_string();
            if let Some(existing) = record.subjects.iter_mut().find(|s| s.name == name) {
                *existing = mark;
            } else {
                record.subjects.push(mark);
            }
        } else {
            self.state.upsert_record(date, day, &month, vec![mark]);
        }
        self.persist()
    }

    /// Removes one subject's mark from a date, pruning the record when it
    /// is left empty.
    pub fn remove_mark(&mut self, date: &str, name: &str) -> StoreResult<()> {
        let Some(index) = self.state.attendance.iter().position(|r| r.date == date) else {
            return Err(StoreError::Precondition(format!(
                "no attendance recorded for {date}"
            )));
        };
        let record = &mut self.state.attendance[index];
        let before = record.subjects.len();
        record.subjects.retain(|s| s.name != name);
        if record.subjects.len() == before {
            return Err(StoreError::Precondition(format!(
                "\"{name}\" was not recorded on {date}"
            )));
        }
        if record.subjects.is_empty() {
            self.state.attendance.remove(index);
        }
        self.persist()
    }

    pub fn start_month(&mut self, name: &str) -> StoreResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation {
                field: "month name",
                reason: "must not be blank".to_string(),
            });
        }
        self.state.start_month(name);
        self.persist()
    }

    pub fn apply_baseline(&mut self, counts: &BTreeMap<String, BaselineCounts>) -> StoreResult<()> {
        self.state.apply_baseline(counts);
        self.persist()
    }

    pub fn set_goal(&mut self, goal: u8) -> StoreResult<()> {
        if !(1..=100).contains(&goal) {
            return Err(StoreError::Validation {
                field: "attendance goal",
                reason: "must be between 1 and 100".to_string(),
            });
        }
        self.settings.goal = goal;
        self.persist_settings()
    }

    pub fn set_theme(&mut self, theme: Theme) -> StoreResult<()> {
        self.settings.theme = theme;
        self.persist_settings()
    }

    pub fn set_accent(&mut self, accent: &str) -> StoreResult<()> {
        if !is_hex_color(accent) {
            return Err(StoreError::Validation {
                field: "accent color",
                reason: format!("\"{accent}\" is not a #rrggbb color"),
            });
        }
        self.settings.accent = accent.to_string();
        self.persist_settings()
    }

    pub fn export_json(&self) -> String {
        backup::export_document(&self.state, &self.settings)
    }

    /// Validates the document first; only a recognized backup clears the
    /// existing data. Returns whether parts of the incoming document had
    /// to be discarded during migration.
    pub fn import_json(&mut self, json: &str) -> StoreResult<bool> {
        let (raw, settings) = backup::parse_backup(json)?;
        self.repo.clear().map_err(StoreError::Persistence)?;

        let outcome = load_state(raw);
        self.state = outcome.state;
        self.settings = settings;
        self.persist()?;
        self.persist_settings()?;
        Ok(outcome.recovered)
    }

    /// Deletes everything, persisted and in-memory.
    pub fn reset(&mut self) -> StoreResult<()> {
        self.repo.clear().map_err(StoreError::Persistence)?;
        self.state = State::default();
        self.state.ensure_weekdays();
        self.settings = Settings::default();
        Ok(())
    }

    fn persist(&self) -> StoreResult<()> {
        self.repo
            .save_state(&self.state)
            .map_err(StoreError::Persistence)
    }

    fn persist_settings(&self) -> StoreResult<()> {
        self.repo
            .save_settings(&self.settings)
            .map_err(StoreError::Persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use anyhow::anyhow;
    use anyhow::Result;

    use crate::model::record::Status;

    struct MockRepo {
        saves: Cell<u32>,
        fail_saves: bool,
    }

    impl MockRepo {
        fn new() -> Self {
            MockRepo {
                saves: Cell::new(0),
                fail_saves: false,
            }
        }

        fn failing() -> Self {
            MockRepo {
                saves: Cell::new(0),
                fail_saves: true,
            }
        }
    }

    impl StateRepository for MockRepo {
        fn load_raw(&self) -> Result<RawState> {
            Ok(RawState::default())
        }
        fn load_settings(&self) -> Result<Settings> {
            Ok(Settings::default())
        }
        fn save_state(&self, _state: &State) -> Result<()> {
            if self.fail_saves {
                return Err(anyhow!("storage is full"));
            }
            self.saves.set(self.saves.get() + 1);
            Ok(())
        }
        fn save_settings(&self, _settings: &Settings) -> Result<()> {
            if self.fail_saves {
                return Err(anyhow!("storage is full"));
            }
            Ok(())
        }
        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    fn store() -> AttendanceStore<MockRepo> {
        let (store, recovered) = AttendanceStore::open(MockRepo::new());
        assert!(!recovered);
        store
    }

    fn marked_store() -> AttendanceStore<MockRepo> {
        let mut store = store();
        store.add_subject("Physics").unwrap();
        store.add_subject("Math").unwrap();
        store.start_month("March").unwrap();
        store
            .record_attendance(
                "2026-03-02",
                "Monday",
                vec![
                    SubjectMark {
                        name: "Physics".to_string(),
                        status: Status::Attended,
                    },
                    SubjectMark {
                        name: "Math".to_string(),
                        status: Status::Missed,
                    },
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn recording_requires_an_active_month() {
        let mut store = store();
        store.add_subject("Physics").unwrap();
        let err = store
            .record_attendance(
                "2026-03-02",
                "Monday",
                vec![SubjectMark {
                    name: "Physics".to_string(),
                    status: Status::Attended,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Precondition(_)));
        assert!(store.state().attendance.is_empty());
    }

    #[test]
    fn recording_upserts_by_date() {
        let mut store = marked_store();
        store
            .record_attendance(
                "2026-03-02",
                "Tuesday",
                vec![SubjectMark {
                    name: "Physics".to_string(),
                    status: Status::Cancelled,
                }],
            )
            .unwrap();

        assert_eq!(store.state().attendance.len(), 1);
        let record = &store.state().attendance[0];
        assert_eq!(record.day, "Tuesday");
        assert_eq!(record.subjects.len(), 1);
        assert_eq!(record.subjects[0].status, Status::Cancelled);
        assert_eq!(record.month, "March");
    }

    #[test]
    fn unregistered_marks_are_dropped_on_recording() {
        let mut store = marked_store();
        let err = store
            .record_attendance(
                "2026-03-03",
                "Tuesday",
                vec![SubjectMark {
                    name: "Never Registered".to_string(),
                    status: Status::Attended,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Precondition(_)));
    }

    #[test]
    fn deleting_a_subject_cascades_everywhere() {
        let mut store = marked_store();
        // A date where Physics is the only subject.
        store
            .record_attendance(
                "2026-03-09",
                "Monday",
                vec![SubjectMark {
                    name: "Physics".to_string(),
                    status: Status::Missed,
                }],
            )
            .unwrap();
        store.start_month("April").unwrap();

        store.delete_subject("Physics").unwrap();

        assert!(!store.state().subjects.contains_key("Physics"));
        let everywhere = store
            .state()
            .history
            .iter()
            .flat_map(|m| m.attendance.iter())
            .chain(store.state().attendance.iter());
        for record in everywhere {
            assert!(record.subjects.iter().all(|s| s.name != "Physics"));
            assert!(!record.subjects.is_empty());
        }
        // The Physics-only record on the 9th is gone entirely.
        let march = &store.state().history[0];
        assert_eq!(march.attendance.len(), 1);
        assert_eq!(march.attendance[0].date, "2026-03-02");
    }

    #[test]
    fn deleting_unknown_subject_is_a_precondition_error() {
        let mut store = store();
        assert!(matches!(
            store.delete_subject("Nope"),
            Err(StoreError::Precondition(_))
        ));
    }

    #[test]
    fn delete_attendance_removes_the_record() {
        let mut store = marked_store();
        store.delete_attendance("2026-03-02").unwrap();
        assert!(store.state().attendance.is_empty());
        assert!(matches!(
            store.delete_attendance("2026-03-02"),
            Err(StoreError::Precondition(_))
        ));
    }

    #[test]
    fn amend_creates_and_remove_prunes() {
        let mut store = marked_store();
        store
            .amend_record("2026-03-10", "Tuesday", "Math", Status::Attended)
            .unwrap();
        assert_eq!(store.state().attendance.len(), 2);

        store.remove_mark("2026-03-10", "Math").unwrap();
        // Last mark removed, record pruned.
        assert_eq!(store.state().attendance.len(), 1);

        assert!(matches!(
            store.remove_mark("2026-03-10", "Math"),
            Err(StoreError::Precondition(_))
        ));
    }

    #[test]
    fn amend_overwrites_an_existing_mark() {
        let mut store = marked_store();
        store
            .amend_record("2026-03-02", "Monday", "Math", Status::Attended)
            .unwrap();
        let record = &store.state().attendance[0];
        assert_eq!(record.subjects.len(), 2);
        let math = record.subjects.iter().find(|s| s.name == "Math").unwrap();
        assert_eq!(math.status, Status::Attended);
    }

    #[test]
    fn blank_month_name_is_rejected() {
        let mut store = store();
        assert!(matches!(
            store.start_month("   "),
            Err(StoreError::Validation { .. })
        ));
    }

    #[test]
    fn goal_must_be_a_percent() {
        let mut store = store();
        assert!(store.set_goal(0).is_err());
        store.set_goal(100).unwrap();
        assert_eq!(store.settings().goal, 100);
    }

    #[test]
    fn timetable_rejects_unknown_day_names() {
        let mut store = store();
        let mut timetable = Timetable::new();
        timetable.insert("Funday".to_string(), vec!["Physics".to_string()]);
        assert!(matches!(
            store.set_timetable(timetable),
            Err(StoreError::Validation { .. })
        ));
    }

    #[test]
    fn failed_save_keeps_the_in_memory_change() {
        let (mut store, _) = AttendanceStore::open(MockRepo::failing());
        store.state.add_subject("Physics");
        store.state.current_month = Some("March".to_string());

        let err = store
            .record_attendance(
                "2026-03-02",
                "Monday",
                vec![SubjectMark {
                    name: "Physics".to_string(),
                    status: Status::Attended,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
        // The edit is still visible for the rest of the session.
        assert_eq!(store.state().attendance.len(), 1);
    }

    #[test]
    fn export_import_round_trips_through_the_store() {
        let store = marked_store();
        let json = store.export_json();

        let (mut fresh, _) = AttendanceStore::open(MockRepo::new());
        let recovered = fresh.import_json(&json).unwrap();
        assert!(!recovered);
        assert_eq!(fresh.state(), store.state());
        assert_eq!(fresh.settings(), store.settings());
    }

    #[test]
    fn garbage_import_leaves_state_untouched() {
        let mut store = marked_store();
        let before = store.state().clone();
        assert!(store.import_json("{\"whatever\": 1}").is_err());
        assert_eq!(store.state(), &before);
    }
}
