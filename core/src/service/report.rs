use std::collections::BTreeMap;
use std::fmt::Write;

use crate::service::aggregate::{grand_totals, Totals};

/// CSV attendance report: one row per subject sorted by name, a blank
/// separator line, then a grand-total row. Percentages carry two
/// decimals and a `%` sign inside quotes.
pub fn csv_report(totals: &BTreeMap<String, Totals>) -> String {
    let mut out = String::from("Subject,Attended,Total Held,Percentage\n");
    for (name, t) in totals {
        let _ = writeln!(
            out,
            "\"{}\",{},{},\"{:.2}%\"",
            name,
            t.attended,
            t.total,
            t.percentage()
        );
    }
    let grand = grand_totals(totals);
    let _ = writeln!(
        out,
        "\nTotal,{},{},\"{:.2}%\"",
        grand.attended,
        grand.total,
        grand.percentage()
    );
    out
}
