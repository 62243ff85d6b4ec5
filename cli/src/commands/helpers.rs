use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use fitlog_core::models::{WeightEntry, WeightUnit};
use fitlog_core::units::{kg_to_display, kg_to_lb};
use fitlog_core::validation::parse_iso_date;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            _ => parse_iso_date(&s).context("Use YYYY-MM-DD, today or yesterday"),
        },
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

/// "80.0 kg (176.4 lb)", led by the unit the entry was typed in.
pub(crate) fn format_weight(entry: &WeightEntry) -> String {
    match entry.units.unwrap_or_default() {
        WeightUnit::Kg => format!(
            "{:.1} kg ({:.1} lb)",
            no_neg_zero(entry.weight_kg),
            kg_to_lb(entry.weight_kg)
        ),
        WeightUnit::Lb => format!(
            "{:.1} lb ({:.1} kg)",
            kg_to_display(entry.weight_kg, WeightUnit::Lb),
            no_neg_zero(entry.weight_kg)
        ),
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
