use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::chart::ChartSeries;
use fitlog_core::service::FitLog;

use super::helpers::print_json;

const BAR_WIDTH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChartKind {
    Weight,
    Bmi,
}

/// Horizontal bar scaled between the series minimum and maximum.
#[allow(clippy::cast_sign_loss)]
fn bar(value: f64, min: f64, max: f64) -> String {
    let span = max - min;
    let fraction = if span > 0.0 { (value - min) / span } else { 1.0 };
    let len = 1 + (fraction * (BAR_WIDTH - 1.0)).round() as usize;
    "█".repeat(len)
}

fn render(series: &ChartSeries) -> String {
    #[derive(Tabled)]
    struct PointRow {
        #[tabled(rename = "Date")]
        label: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "")]
        bar: String,
    }

    let min = series.values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let rows: Vec<PointRow> = series
        .labels
        .iter()
        .zip(&series.values)
        .map(|(label, &value)| PointRow {
            label: label.clone(),
            value: format!("{value:.1}"),
            bar: bar(value, min, max),
        })
        .collect();

    Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string()
}

pub(crate) async fn cmd_chart(app: &FitLog, kind: ChartKind, days: u32, json: bool) -> Result<()> {
    let series = match kind {
        ChartKind::Weight => app.charts().weight_chart(days).await?,
        ChartKind::Bmi => app.charts().bmi_chart(days).await?,
    };

    if json {
        return print_json(&series);
    }
    if series.is_empty() {
        match kind {
            ChartKind::Bmi if !app.profile().is_profile_complete().await? => {
                eprintln!("Set your height to see a BMI chart.");
            }
            _ => eprintln!("No entries in the last {days} days."),
        }
        return Ok(());
    }

    println!("{} over the last {days} days", series.label);
    println!("{}", render(&series));
    Ok(())
}
