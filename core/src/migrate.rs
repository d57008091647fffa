//! One-way migration from legacy persisted shapes to the current model.
//!
//! Older versions of the data went through several incompatible layouts:
//! a week-keyed timetable (`{"1": {"Monday": [...]}}`), bare subject-name
//! strings inside records, a boolean `attended` flag instead of `status`,
//! and per-record `week`/`note` fields. Each of those is undone by one
//! pure `old shape -> new shape` step below; the chain runs on every load
//! and import and reports whether anything changed so the caller can
//! decide to persist.
//!
//! Steps operate on raw JSON values and return `None` when they do not
//! apply, so a malformed sub-tree is simply left as it was instead of
//! being half-rewritten; the typed parse afterwards falls back to empty
//! defaults for anything still unreadable.

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::model::state::{State, DAYS};

/// Persisted blobs exactly as the repository found them, before any
/// shape is assumed. Missing keys are `Null`.
#[derive(Debug, Clone, Default)]
pub struct RawState {
    pub timetable: Value,
    pub subjects: Value,
    pub attendance: Value,
    pub history: Value,
    pub current_month: Option<String>,
}

pub struct LoadOutcome {
    pub state: State,
    /// True when migration or normalization rewrote anything; the caller
    /// should persist the result.
    pub changed: bool,
    /// True when corrupted input was discarded in favor of defaults. The
    /// caller should surface a warning to the user.
    pub recovered: bool,
}

type Step = fn(&Value) -> Option<Value>;

const TIMETABLE_STEPS: &[(&str, Step)] =
    &[("collapse week-keyed timetable", collapse_week_timetable)];

const ENTRY_STEPS: &[(&str, Step)] = &[
    ("strip legacy week/note fields", strip_legacy_fields),
    ("wrap bare subject names", wrap_bare_subjects),
    ("convert attended flag to status", attended_flag_to_status),
    ("drop unnamed subject entries", drop_unnamed_subjects),
];

/// Runs the migration chain over the raw blobs in place. Returns whether
/// any step applied.
pub fn migrate_raw(raw: &mut RawState) -> bool {
    let mut changed = false;
    for (name, step) in TIMETABLE_STEPS {
        if let Some(next) = step(&raw.timetable) {
            info!("migrating timetable: {name}");
            raw.timetable = next;
            changed = true;
        }
    }
    changed |= migrate_log(&mut raw.attendance);
    if let Some(months) = raw.history.as_array_mut() {
        for month in months {
            if let Some(entries) = month.get_mut("attendance") {
                changed |= migrate_log(entries);
            }
        }
    }
    changed
}

/// Parses raw blobs into typed state, migrating legacy shapes first and
/// falling back to empty defaults for anything unreadable. Never fails.
pub fn load_state(mut raw: RawState) -> LoadOutcome {
    let mut changed = migrate_raw(&mut raw);
    let mut recovered = false;

    let mut state = State {
        timetable: parse_or_default(raw.timetable, "timetable", &mut recovered),
        subjects: parse_or_default(raw.subjects, "subject registry", &mut recovered),
        attendance: parse_or_default(raw.attendance, "attendance log", &mut recovered),
        history: parse_or_default(raw.history, "monthly history", &mut recovered),
        current_month: raw.current_month.filter(|m| !m.trim().is_empty()),
    };

    changed |= recovered;
    changed |= normalize(&mut state);
    LoadOutcome {
        state,
        changed,
        recovered,
    }
}

/// Post-parse invariants: all seven weekdays present in the timetable,
/// every subject name seen anywhere registered in the master list.
pub fn normalize(state: &mut State) -> bool {
    let mut changed = state.ensure_weekdays();

    let mut names: Vec<String> = state.timetable.values().flatten().cloned().collect();
    names.extend(
        state
            .attendance
            .iter()
            .flat_map(|r| r.subjects.iter().map(|s| s.name.clone())),
    );
    names.extend(
        state
            .history
            .iter()
            .flat_map(|m| m.attendance.iter())
            .flat_map(|r| r.subjects.iter().map(|s| s.name.clone())),
    );
    for name in names {
        changed |= state.add_subject(&name);
    }
    changed
}

fn migrate_log(entries: &mut Value) -> bool {
    let Some(entries) = entries.as_array_mut() else {
        return false;
    };
    let mut changed = false;
    for entry in entries {
        for (name, step) in ENTRY_STEPS {
            if let Some(next) = step(entry) {
                info!("migrating record: {name}");
                *entry = next;
                changed = true;
            }
        }
    }
    changed
}

fn parse_or_default<T>(value: Value, what: &str, recovered: &mut bool) -> T
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return T::default();
    }
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("discarding corrupted {what}: {err}");
            *recovered = true;
            T::default()
        }
    }
}

/// `{"1": {day: [..]}, "2": ...}` becomes `{day: [..]}`, taking week "1"
/// as the source of truth (the weeks were near-identical in practice).
fn collapse_week_timetable(timetable: &Value) -> Option<Value> {
    let weeks = timetable.as_object()?;
    let week_one = weeks.get("1")?.as_object()?;

    let mut flat = Map::new();
    for day in DAYS {
        let names: Vec<Value> = week_one
            .get(day)
            .and_then(Value::as_array)
            .map(|subjects| {
                subjects
                    .iter()
                    .filter_map(subject_name)
                    .map(Value::from)
                    .collect()
            })
            .unwrap_or_default();
        flat.insert(day.to_string(), Value::Array(names));
    }
    Some(Value::Object(flat))
}

fn strip_legacy_fields(entry: &Value) -> Option<Value> {
    let fields = entry.as_object()?;
    if !fields.contains_key("week") && !fields.contains_key("note") {
        return None;
    }
    let mut stripped = fields.clone();
    stripped.remove("week");
    stripped.remove("note");
    Some(Value::Object(stripped))
}

/// Oldest record shape: `subjects` held plain name strings, implying the
/// class was attended.
fn wrap_bare_subjects(entry: &Value) -> Option<Value> {
    let subjects = entry.get("subjects")?.as_array()?;
    if !subjects.iter().any(Value::is_string) {
        return None;
    }
    let wrapped: Vec<Value> = subjects
        .iter()
        .filter_map(|subject| match subject {
            Value::String(name) if !name.trim().is_empty() => Some(serde_json::json!({
                "name": name.trim(),
                "attended": true,
            })),
            Value::String(_) => None,
            other => Some(other.clone()),
        })
        .collect();
    let mut next = entry.as_object()?.clone();
    next.insert("subjects".to_string(), Value::Array(wrapped));
    Some(Value::Object(next))
}

/// `{name, attended: bool}` becomes `{name, status}`. A legacy `false`
/// could have meant either missed or cancelled; that distinction is gone
/// from the source data, so everything maps to "missed".
fn attended_flag_to_status(entry: &Value) -> Option<Value> {
    let subjects = entry.get("subjects")?.as_array()?;
    if !subjects
        .iter()
        .any(|s| s.as_object().is_some_and(|o| o.contains_key("attended")))
    {
        return None;
    }
    let converted: Vec<Value> = subjects
        .iter()
        .filter_map(|subject| {
            let fields = subject.as_object()?;
            match fields.get("attended") {
                Some(Value::Bool(attended)) => {
                    let name = subject_name(subject)?;
                    let status = if *attended { "attended" } else { "missed" };
                    Some(serde_json::json!({ "name": name, "status": status }))
                }
                Some(_) => None,
                None => Some(subject.clone()),
            }
        })
        .collect();
    let mut next = entry.as_object()?.clone();
    next.insert("subjects".to_string(), Value::Array(converted));
    Some(Value::Object(next))
}

fn drop_unnamed_subjects(entry: &Value) -> Option<Value> {
    let subjects = entry.get("subjects")?.as_array()?;
    let kept: Vec<Value> = subjects
        .iter()
        .filter(|s| subject_name(s).is_some())
        .cloned()
        .collect();
    if kept.len() == subjects.len() {
        return None;
    }
    let mut next = entry.as_object()?.clone();
    next.insert("subjects".to_string(), Value::Array(kept));
    Some(Value::Object(next))
}

fn subject_name(subject: &Value) -> Option<String> {
    let name = match subject {
        Value::String(name) => name,
        Value::Object(fields) => fields.get("name")?.as_str()?,
        _ => return None,
    };
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::model::record::Status;

    fn raw(timetable: Value, attendance: Value, history: Value) -> RawState {
        RawState {
            timetable,
            subjects: Value::Null,
            attendance,
            history,
            current_month: None,
        }
    }

    #[test]
    fn attended_flag_becomes_status_and_legacy_fields_go() {
        let attendance = json!([{
            "week": 2,
            "day": "Monday",
            "date": "2025-03-03",
            "month": "March",
            "note": "double period",
            "subjects": [{"name": "Chem", "attended": true}],
        }]);
        let outcome = load_state(raw(Value::Null, attendance, Value::Null));

        assert!(outcome.changed);
        assert!(!outcome.recovered);
        let record = &outcome.state.attendance[0];
        assert_eq!(record.subjects.len(), 1);
        assert_eq!(record.subjects[0].name, "Chem");
        assert_eq!(record.subjects[0].status, Status::Attended);
        assert_eq!(record.date, "2025-03-03");
    }

    #[test]
    fn attended_false_maps_to_missed() {
        let attendance = json!([{
            "day": "Monday", "date": "2025-03-03", "month": "March",
            "subjects": [{"name": "Chem", "attended": false}],
        }]);
        let outcome = load_state(raw(Value::Null, attendance, Value::Null));
        assert_eq!(outcome.state.attendance[0].subjects[0].status, Status::Missed);
    }

    #[test]
    fn week_keyed_timetable_collapses_to_week_one() {
        let timetable = json!({
            "1": {"Monday": ["Physics", {"name": "Math"}], "Tuesday": []},
            "2": {"Monday": ["Ignored"]},
        });
        let outcome = load_state(raw(timetable, Value::Null, Value::Null));

        assert_eq!(
            outcome.state.timetable["Monday"],
            vec!["Physics".to_string(), "Math".to_string()]
        );
        // Newly seen names were registered on the way through.
        assert!(outcome.state.subjects.contains_key("Physics"));
        assert!(outcome.state.subjects.contains_key("Math"));
        assert_eq!(outcome.state.timetable.len(), 7);
    }

    #[test]
    fn bare_subject_strings_end_up_as_attended_status() {
        let attendance = json!([{
            "day": "Friday", "date": "2024-11-01", "month": "Nov",
            "subjects": ["Bio", "  ", "Chem"],
        }]);
        let outcome = load_state(raw(Value::Null, attendance, Value::Null));

        let marks = &outcome.state.attendance[0].subjects;
        assert_eq!(marks.len(), 2);
        assert!(marks.iter().all(|m| m.status == Status::Attended));
    }

    #[test]
    fn history_snapshots_are_migrated_too() {
        let history = json!([{
            "monthName": "Jan",
            "attendance": [{
                "week": 1, "day": "Monday", "date": "2025-01-06", "month": "Jan",
                "subjects": [{"name": "Math", "attended": false}],
            }],
        }]);
        let outcome = load_state(raw(Value::Null, Value::Null, history));

        let snapshot = &outcome.state.history[0];
        assert_eq!(snapshot.month_name, "Jan");
        assert_eq!(snapshot.attendance[0].subjects[0].status, Status::Missed);
    }

    #[test]
    fn migration_is_idempotent() {
        let attendance = json!([{
            "week": 3, "day": "Monday", "date": "2025-03-03", "month": "March",
            "subjects": ["Chem", {"name": "Math", "attended": false}],
        }]);
        let timetable = json!({"1": {"Monday": ["Chem"]}});
        let first = load_state(raw(timetable, attendance, Value::Null));
        assert!(first.changed);

        let second = load_state(RawState {
            timetable: serde_json::to_value(&first.state.timetable).unwrap(),
            subjects: serde_json::to_value(&first.state.subjects).unwrap(),
            attendance: serde_json::to_value(&first.state.attendance).unwrap(),
            history: serde_json::to_value(&first.state.history).unwrap(),
            current_month: first.state.current_month.clone(),
        });
        assert!(!second.changed);
        assert_eq!(second.state, first.state);
    }

    #[test]
    fn corrupted_blobs_fall_back_to_defaults() {
        let outcome = load_state(raw(json!(42), json!("not an array"), json!({"nope": 1})));
        assert!(outcome.recovered);
        assert!(outcome.changed);
        assert!(outcome.state.attendance.is_empty());
        assert!(outcome.state.history.is_empty());
        assert_eq!(outcome.state.timetable.len(), 7);
    }

    #[test]
    fn blank_month_name_is_treated_as_no_active_month() {
        let mut raw_state = raw(Value::Null, Value::Null, Value::Null);
        raw_state.current_month = Some("   ".to_string());
        assert_eq!(load_state(raw_state).state.current_month, None);
    }
}
