//! Parsing for the `NAME:VALUE` trailing arguments the CLI accepts.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use crate::model::record::Status;
use crate::model::state::BaselineCounts;

const STATUS_CANDIDATES: [(&str, Status); 3] = [
    ("attended", Status::Attended),
    ("missed", Status::Missed),
    ("cancelled", Status::Cancelled),
];

/// Expands a status token, accepting any unambiguous prefix ("a", "att",
/// "cancelled", ...).
pub fn expand_status(token: &str) -> Result<Status> {
    let token = token.trim().to_lowercase();
    if let Some((_, status)) = STATUS_CANDIDATES.iter().find(|(name, _)| *name == token) {
        return Ok(*status);
    }
    let matches: Vec<&(&str, Status)> = STATUS_CANDIDATES
        .iter()
        .filter(|(name, _)| !token.is_empty() && name.starts_with(&token))
        .collect();
    match matches.len() {
        1 => Ok(matches[0].1),
        0 => Err(anyhow!("unknown status: '{token}' (expected attended, missed or cancelled)")),
        _ => {
            let names: Vec<&str> = matches.iter().map(|(name, _)| *name).collect();
            Err(anyhow!("ambiguous status: '{token}' matches {names:?}"))
        }
    }
}

/// Parses `Name:status` arguments. The subject name may contain colons;
/// only the last one separates the status.
pub fn parse_marks(args: &[String]) -> Result<Vec<(String, Status)>> {
    let mut marks = Vec::new();
    for arg in args {
        let (name, status) = arg
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("expected NAME:STATUS, got '{arg}'"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("missing subject name in '{arg}'"));
        }
        marks.push((name.to_string(), expand_status(status)?));
    }
    Ok(marks)
}

/// Parses `Name:attended,missed,cancelled` baseline arguments.
pub fn parse_baseline_args(args: &[String]) -> Result<BTreeMap<String, BaselineCounts>> {
    let mut counts = BTreeMap::new();
    for arg in args {
        let (name, numbers) = arg
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("expected NAME:ATTENDED,MISSED,CANCELLED, got '{arg}'"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("missing subject name in '{arg}'"));
        }
        let parts: Vec<&str> = numbers.split(',').collect();
        if parts.len() != 3 {
            return Err(anyhow!(
                "'{name}' needs exactly three counts (attended,missed,cancelled)"
            ));
        }
        let parse = |label: &str, text: &str| -> Result<u32> {
            text.trim()
                .parse()
                .map_err(|_| anyhow!("invalid {label} count for '{name}': '{text}'"))
        };
        counts.insert(
            name.to_string(),
            BaselineCounts {
                attended: parse("attended", parts[0])?,
                missed: parse("missed", parts[1])?,
                cancelled: parse("cancelled", parts[2])?,
            },
        );
    }
    Ok(counts)
}
