pub mod error;
pub mod input;
pub mod migrate;
pub mod model;
pub mod repository;
pub mod service;

pub use error::{StoreError, StoreResult};
pub use input::{expand_status, parse_baseline_args, parse_marks};
pub use migrate::{load_state, RawState};
pub use model::record::{AttendanceRecord, MonthSnapshot, Status, SubjectMark, BASELINE_MONTH};
pub use model::settings::{Settings, Theme};
pub use model::state::{canonical_day, day_name, BaselineCounts, State, Timetable, DAYS};
pub use repository::{FileStateRepository, StateRepository};
pub use service::aggregate::{
    bunkable, classes_needed, overall_percentage, project_future, subject_totals, Totals,
};
pub use service::report::csv_report;
pub use service::store::AttendanceStore;
