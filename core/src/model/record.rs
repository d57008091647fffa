use serde::{Deserialize, Serialize};

/// Outcome of a single scheduled class on a given date.
///
/// `Cancelled` classes count toward neither attended nor total in the
/// aggregation math.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Attended,
    Missed,
    Cancelled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Attended => "attended",
            Status::Missed => "missed",
            Status::Cancelled => "cancelled",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubjectMark {
    pub name: String,
    pub status: Status,
}

/// One date's log. `date` is the identity key; the active log never holds
/// two records for the same date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub subjects: Vec<SubjectMark>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MonthSnapshot {
    #[serde(rename = "monthName")]
    pub month_name: String,
    pub attendance: Vec<AttendanceRecord>,
}

/// Reserved snapshot name for attendance accrued before tracking began.
/// Hidden from month-by-month views, included in cumulative totals.
pub const BASELINE_MONTH: &str = "Previous Data";

impl MonthSnapshot {
    pub fn is_baseline(&self) -> bool {
        self.month_name == BASELINE_MONTH
    }
}
