use anyhow::Result;

use fitlog_core::service::FitLog;

use super::helpers::print_json;

pub(crate) async fn cmd_bmi(app: &FitLog, json: bool) -> Result<()> {
    let summary = app.bmi_summary().await?;
    if json {
        return print_json(&summary);
    }
    let Some(s) = summary else {
        if app.profile().is_profile_complete().await? {
            eprintln!("No weight entries yet. Use `fitlog weight log` first.");
        } else {
            eprintln!("Height not set. Use `fitlog profile set --height <cm>` first.");
        }
        return Ok(());
    };

    println!("BMI {:.1} ({})", s.bmi, s.label);
    println!("  From entry on {}", s.entry_date.format("%Y-%m-%d"));
    println!(
        "  Healthy range for your height: {:.1} - {:.1} kg",
        s.ideal_range.min, s.ideal_range.max
    );
    Ok(())
}
