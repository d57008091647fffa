//! Full-state export and import. The export is a single pretty-printed
//! JSON document; import additionally accepts the legacy v1 backup where
//! the collection fields were themselves JSON-encoded strings.

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::migrate::RawState;
use crate::model::record::{AttendanceRecord, MonthSnapshot};
use crate::model::settings::{settings_from_strings, Settings};
use crate::model::state::{State, SubjectRegistry, Timetable};

#[derive(Serialize)]
struct ExportDocument<'a> {
    timetable: &'a Timetable,
    #[serde(rename = "subjectsMaster")]
    subjects_master: &'a SubjectRegistry,
    attendance: &'a [AttendanceRecord],
    #[serde(rename = "monthlyHistory")]
    monthly_history: &'a [MonthSnapshot],
    #[serde(rename = "currentMonthName")]
    current_month_name: Option<&'a str>,
    attendance_goal: String,
    theme: &'a str,
    accent_color: &'a str,
}

pub fn export_document(state: &State, settings: &Settings) -> String {
    let doc = ExportDocument {
        timetable: &state.timetable,
        subjects_master: &state.subjects,
        attendance: &state.attendance,
        monthly_history: &state.history,
        current_month_name: state.current_month.as_deref(),
        attendance_goal: settings.goal.to_string(),
        theme: settings.theme.as_str(),
        accent_color: &settings.accent,
    };
    // A struct of plain maps and vectors cannot fail to serialize.
    serde_json::to_string_pretty(&doc).expect("export document serializes")
}

/// Recognizes a backup document and returns the raw state (still to be
/// migrated) plus the settings it carried. Anything unrecognized is a
/// hard rejection; nothing is cleared or written here.
pub fn parse_backup(json: &str) -> Result<(RawState, Settings), StoreError> {
    let doc: Value = serde_json::from_str(json)
        .map_err(|err| StoreError::Corrupt(format!("backup is not valid JSON: {err}")))?;
    let Some(fields) = doc.as_object() else {
        return Err(StoreError::Corrupt(
            "unrecognized backup file format".to_string(),
        ));
    };

    let raw = if fields.get("timetable").is_some_and(Value::is_object)
        && fields.contains_key("subjectsMaster")
    {
        RawState {
            timetable: fields.get("timetable").cloned().unwrap_or(Value::Null),
            subjects: fields.get("subjectsMaster").cloned().unwrap_or(Value::Null),
            attendance: fields.get("attendance").cloned().unwrap_or(Value::Null),
            history: fields.get("monthlyHistory").cloned().unwrap_or(Value::Null),
            current_month: text_field(fields.get("currentMonthName")),
        }
    } else if fields.get("timetable").is_some_and(Value::is_string)
        && fields.contains_key("attendance_data")
    {
        // v1 nested the collections as JSON strings and had no subject
        // registry; migration rebuilds it from the names it finds.
        RawState {
            timetable: nested_json(fields, "timetable")?,
            subjects: Value::Null,
            attendance: nested_json(fields, "attendance_data")?,
            history: nested_json(fields, "monthly_history")?,
            current_month: text_field(fields.get("current_month")),
        }
    } else {
        return Err(StoreError::Corrupt(
            "unrecognized backup file format".to_string(),
        ));
    };

    let settings = settings_from_strings(
        text_field(fields.get("attendance_goal")).as_deref(),
        text_field(fields.get("theme")).as_deref(),
        text_field(fields.get("accent_color")).as_deref(),
    );
    Ok((raw, settings))
}

fn nested_json(fields: &serde_json::Map<String, Value>, key: &str) -> Result<Value, StoreError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::String(encoded)) => serde_json::from_str(encoded).map_err(|err| {
            StoreError::Corrupt(format!("invalid nested JSON in \"{key}\": {err}"))
        }),
        Some(_) => Err(StoreError::Corrupt(format!(
            "field \"{key}\" should be a JSON-encoded string"
        ))),
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
