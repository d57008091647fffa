//! Pure aggregation and projection math over store state. No clocks, no
//! side effects; identical input always produces identical output.

use std::collections::BTreeMap;

use crate::model::record::{AttendanceRecord, Status};
use crate::model::state::State;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub attended: u32,
    pub total: u32,
}

impl Totals {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.attended) / f64::from(self.total) * 100.0
        }
    }
}

/// Per-subject attended/total across every historical snapshot plus the
/// active log. Cancelled marks count toward neither figure; marks whose
/// subject is no longer registered are skipped (stale references can
/// outlive a deletion in old exports).
pub fn subject_totals(state: &State) -> BTreeMap<String, Totals> {
    let mut totals = BTreeMap::new();
    for month in &state.history {
        fold_records(state, &month.attendance, &mut totals);
    }
    fold_records(state, &state.attendance, &mut totals);
    totals
}

/// Totals for one slice of records, e.g. a single month snapshot.
pub fn totals_for_records(
    state: &State,
    records: &[AttendanceRecord],
) -> BTreeMap<String, Totals> {
    let mut totals = BTreeMap::new();
    fold_records(state, records, &mut totals);
    totals
}

fn fold_records(
    state: &State,
    records: &[AttendanceRecord],
    totals: &mut BTreeMap<String, Totals>,
) {
    for record in records {
        for mark in &record.subjects {
            if !state.subjects.contains_key(&mark.name) || mark.status == Status::Cancelled {
                continue;
            }
            let entry = totals.entry(mark.name.clone()).or_default();
            entry.total += 1;
            if mark.status == Status::Attended {
                entry.attended += 1;
            }
        }
    }
}

pub fn grand_totals(totals: &BTreeMap<String, Totals>) -> Totals {
    let mut grand = Totals::default();
    for t in totals.values() {
        grand.attended += t.attended;
        grand.total += t.total;
    }
    grand
}

pub fn overall_percentage(totals: &BTreeMap<String, Totals>) -> f64 {
    grand_totals(totals).percentage()
}

/// How many upcoming classes can be missed while staying at or above the
/// goal. Meaningful when the current percentage already meets the goal;
/// `None` means unbounded (goal fraction of zero).
pub fn bunkable(attended: u32, total: u32, goal_fraction: f64) -> Option<u32> {
    if goal_fraction <= 0.0 {
        return None;
    }
    let room = (f64::from(attended) - goal_fraction * f64::from(total)) / goal_fraction;
    Some(room.floor().max(0.0) as u32)
}

/// Minimum number of additional attended classes (total growing by the
/// same count) needed to reach the goal from below. A goal fraction of 1
/// means every class ever held must be attended, so the shortfall is
/// exactly `total - attended`.
pub fn classes_needed(attended: u32, total: u32, goal_fraction: f64) -> u32 {
    if goal_fraction >= 1.0 {
        return total.saturating_sub(attended);
    }
    let needed = (goal_fraction * f64::from(total) - f64::from(attended))
        / (1.0 - goal_fraction);
    needed.ceil().max(0.0) as u32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub attended: u32,
    pub total: u32,
    pub percent: f64,
}

/// What the numbers become if the next `future_classes` classes are all
/// attended or all missed. Callers clamp `future_classes` to at least 1.
pub fn project_future(current: Totals, future_classes: u32, will_attend: bool) -> Projection {
    let attended = current.attended + if will_attend { future_classes } else { 0 };
    let total = current.total + future_classes;
    let projected = Totals { attended, total };
    Projection {
        attended,
        total,
        percent: projected.percentage(),
    }
}
