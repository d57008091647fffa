use attendo_core::service::aggregate::{
    bunkable, classes_needed, grand_totals, subject_totals, totals_for_records,
};
use attendo_core::{Settings, State, DAYS};
use tabled::settings::object::Rows;
use tabled::settings::{Color, Modify, Style};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Attended")]
    attended: u32,
    #[tabled(rename = "Total Held")]
    total: u32,
    #[tabled(rename = "Percentage")]
    percentage: String,
    #[tabled(rename = "Goal Advice")]
    advice: String,
}

pub fn show_stats(state: &State, settings: &Settings) {
    let totals = subject_totals(state);
    if totals.is_empty() {
        println!("No attendance recorded yet.");
        return;
    }

    let goal = settings.goal_fraction();
    let rows: Vec<StatsRow> = totals
        .iter()
        .map(|(name, t)| StatsRow {
            subject: name.clone(),
            attended: t.attended,
            total: t.total,
            percentage: format!("{:.2}%", t.percentage()),
            advice: advice(t.attended, t.total, t.percentage(), goal, settings.goal),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::modern())
        .with(Modify::new(Rows::first()).with(Color::FG_CYAN));
    println!("{table}");

    let grand = grand_totals(&totals);
    println!(
        "\nOverall: {:.2}% ({}/{}), goal {}%",
        grand.percentage(),
        grand.attended,
        grand.total,
        settings.goal
    );
    match &state.current_month {
        Some(month) => println!("Current month: {month}"),
        None => println!("No month started."),
    }
}

fn advice(attended: u32, total: u32, percent: f64, goal: f64, goal_percent: u8) -> String {
    if total == 0 {
        return "no classes recorded yet".to_string();
    }
    if percent >= f64::from(goal_percent) {
        match bunkable(attended, total, goal) {
            Some(1) => "can miss 1 class".to_string(),
            Some(n) => format!("can miss {n} classes"),
            None => "goal is 0, nothing to chase".to_string(),
        }
    } else {
        let needed = classes_needed(attended, total, goal);
        let plural = if needed == 1 { "class" } else { "classes" };
        format!("need {needed} {plural} for {goal_percent}%")
    }
}

pub fn show_history(state: &State) {
    let visible: Vec<_> = state.history.iter().filter(|m| !m.is_baseline()).collect();
    if visible.is_empty() {
        println!("No previous months stored.");
        return;
    }
    for month in visible {
        println!("\n{}", month.month_name);
        let totals = totals_for_records(state, &month.attendance);
        if totals.is_empty() {
            println!("  (no countable classes)");
            continue;
        }
        for (name, t) in &totals {
            println!(
                "  {name}: {}/{} ({:.2}%)",
                t.attended,
                t.total,
                t.percentage()
            );
        }
    }
}

pub fn show_timetable(state: &State) {
    for day in DAYS {
        let subjects = state
            .timetable
            .get(day)
            .map(|s| s.join(", "))
            .unwrap_or_default();
        if subjects.is_empty() {
            println!("{day:<10} -");
        } else {
            println!("{day:<10} {subjects}");
        }
    }
}

pub fn show_subjects(state: &State) {
    if state.subjects.is_empty() {
        println!("No subjects registered. Set a timetable to add some.");
        return;
    }
    for (name, meta) in &state.subjects {
        if meta.icon.is_empty() {
            println!("{name} ({})", meta.color);
        } else {
            println!("{} {name} ({})", meta.icon, meta.color);
        }
    }
}
