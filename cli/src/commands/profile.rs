use anyhow::Result;

use fitlog_core::models::{HeightUnit, ProfileDraft, WeightUnit};
use fitlog_core::profile::ProfileState;
use fitlog_core::service::FitLog;
use fitlog_core::units::{cm_to_feet_inches, cm_to_in, height_to_cm};
use fitlog_core::validation::ensure_positive_height;

use super::helpers::print_json;

pub(crate) struct ProfileSetArgs {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub avatar: Option<String>,
    pub height: Option<f64>,
    pub height_unit: HeightUnit,
    pub weight_unit: Option<WeightUnit>,
}

fn format_height(height_cm: f64, unit: HeightUnit) -> String {
    match unit {
        HeightUnit::Cm => format!("{height_cm:.1} cm"),
        HeightUnit::In => format!("{:.1} in", cm_to_in(height_cm)),
        HeightUnit::Ft => {
            let (feet, inches) = cm_to_feet_inches(height_cm);
            format!("{feet}' {inches}\"")
        }
    }
}

pub(crate) async fn cmd_profile_show(app: &FitLog, json: bool) -> Result<()> {
    let profile = app.profile().get_profile().await?;
    if json {
        return print_json(&profile);
    }
    let Some(p) = profile else {
        eprintln!("No profile yet. Use `fitlog profile set --height <cm>` to create one.");
        return Ok(());
    };

    println!("Profile {}", p.id);
    if let Some(ref name) = p.name {
        println!("  Name:   {name}");
    }
    if let Some(age) = p.age {
        println!("  Age:    {age}");
    }
    if p.is_complete() {
        println!(
            "  Height: {}",
            format_height(p.height_cm, p.preferred_units.height)
        );
    } else {
        println!("  Height: not set");
    }
    println!(
        "  Units:  {} / {}",
        p.preferred_units.height, p.preferred_units.weight
    );
    println!("  Since:  {}", p.created_at.format("%Y-%m-%d"));
    Ok(())
}

pub(crate) async fn cmd_profile_status(app: &FitLog, json: bool) -> Result<()> {
    let complete = app.profile().is_profile_complete().await?;
    let state = match app.profile().state() {
        ProfileState::Uninitialized => "uninitialized",
        ProfileState::Loaded(_) => "loaded",
        ProfileState::Empty => "empty",
    };
    if json {
        println!("{}", serde_json::json!({ "state": state, "complete": complete }));
    } else if complete {
        println!("Profile complete");
    } else {
        println!("Profile incomplete ({state}): height is required for BMI");
    }
    Ok(())
}

pub(crate) async fn cmd_profile_set(app: &FitLog, args: ProfileSetArgs, json: bool) -> Result<()> {
    let height_cm = args
        .height
        .map(|h| ensure_positive_height(height_to_cm(h, args.height_unit)))
        .transpose()?;

    let profile = app
        .profile()
        .save_profile(ProfileDraft {
            name: args.name,
            age: args.age,
            avatar: args.avatar,
            height_cm,
            preferred_height_unit: height_cm.map(|_| args.height_unit),
            preferred_weight_unit: args.weight_unit,
            ..ProfileDraft::default()
        })
        .await?;

    if height_cm.is_some() {
        app.recalculate_bmi().await?;
    }

    if json {
        return print_json(&profile);
    }
    println!("Saved profile {}", profile.id);
    if profile.is_complete() {
        println!(
            "  Height: {}",
            format_height(profile.height_cm, profile.preferred_units.height)
        );
    }
    Ok(())
}

pub(crate) async fn cmd_profile_clear(app: &FitLog, json: bool) -> Result<()> {
    app.profile().clear_profile().await?;
    if json {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        println!("Profile removed");
    }
    Ok(())
}
