use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::models::WeightUnit;
use fitlog_core::service::{FitLog, WeightInput};
use fitlog_core::units::kg_to_lb;

use super::helpers::{format_weight, json_error, no_neg_zero, parse_date, print_json, truncate};

pub(crate) struct WeightLogArgs {
    pub value: f64,
    pub unit: WeightUnit,
    pub date: Option<String>,
    pub time: Option<String>,
    pub notes: Option<String>,
    pub id: Option<String>,
}

pub(crate) async fn cmd_weight_log(app: &FitLog, args: WeightLogArgs, json: bool) -> Result<()> {
    let date = parse_date(args.date)?;
    let entry = app
        .log_weight(WeightInput {
            id: args.id,
            value: args.value,
            unit: args.unit,
            date: Some(date),
            time: args.time,
            notes: args.notes,
        })
        .await?;

    if json {
        return print_json(&entry);
    }
    println!(
        "Logged {} for {}",
        format_weight(&entry),
        entry.date.format("%Y-%m-%d")
    );
    if let Some(bmi) = entry.bmi {
        println!("  BMI: {bmi:.1}");
    }
    if let Some(ref n) = entry.notes {
        println!("  Notes: {n}");
    }
    println!("  ID: {}", entry.id);
    Ok(())
}

pub(crate) async fn cmd_weight_show(app: &FitLog, id: &str, json: bool) -> Result<()> {
    match app.storage().get_weight_entry(id).await? {
        Some(e) => {
            if json {
                return print_json(&e);
            }
            println!("{}: {}", e.date.format("%Y-%m-%d"), format_weight(&e));
            if let Some(ref t) = e.time {
                println!("  Time: {t}");
            }
            if let Some(bmi) = e.bmi {
                println!("  BMI: {bmi:.1}");
            }
            if let Some(ref n) = e.notes {
                println!("  Notes: {n}");
            }
        }
        None => {
            let message = format!("No weight entry with id {id}");
            if json {
                println!("{}", json_error(&message));
            } else {
                eprintln!("{message}");
            }
        }
    }
    Ok(())
}

pub(crate) async fn cmd_weight_history(app: &FitLog, days: Option<u32>, json: bool) -> Result<()> {
    let entries = app.history(days).await?;

    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        eprintln!("No weight entries found. Use `fitlog weight log` to record your weight.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct WeightRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        kg: String,
        #[tabled(rename = "Weight (lb)")]
        lb: String,
        #[tabled(rename = "BMI")]
        bmi: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let rows: Vec<WeightRow> = entries
        .iter()
        .map(|e| WeightRow {
            id: truncate(&e.id, 11),
            date: e.date.format("%Y-%m-%d").to_string(),
            kg: format!("{:.1}", no_neg_zero(e.weight_kg)),
            lb: format!("{:.1}", kg_to_lb(e.weight_kg)),
            bmi: e.bmi.map_or("-".into(), |b| format!("{b:.1}")),
            notes: e.notes.as_deref().map(|n| truncate(n, 30)).unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) async fn cmd_weight_delete(app: &FitLog, id: &str, json: bool) -> Result<()> {
    let deleted = app.storage().delete_weight_entry(id).await?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id, "found": deleted }));
    } else if deleted {
        println!("Deleted weight entry {id}");
    } else {
        eprintln!("No weight entry with id {id}");
    }
    Ok(())
}

pub(crate) async fn cmd_weight_clear(app: &FitLog, json: bool) -> Result<()> {
    app.storage().clear_weight_entries().await?;
    if json {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        println!("Removed all weight entries");
    }
    Ok(())
}

pub(crate) async fn cmd_weight_recalc(app: &FitLog, json: bool) -> Result<()> {
    let updated = app.recalculate_bmi().await?;
    if json {
        println!("{}", serde_json::json!({ "updated": updated }));
    } else if updated == 0 {
        eprintln!("Nothing recalculated. Set your height with `fitlog profile set --height`.");
    } else {
        println!("Recalculated BMI for {updated} entries");
    }
    Ok(())
}
