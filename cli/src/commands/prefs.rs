use anyhow::Result;

use fitlog_core::preferences::{Preferences, SUPPORTED_LANGUAGES, ThemeMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThemeAction {
    Show,
    Set(ThemeMode),
    Cycle,
    Toggle,
}

pub(crate) fn parse_theme_action(value: Option<&str>) -> Result<ThemeAction> {
    Ok(match value {
        None => ThemeAction::Show,
        Some("cycle") => ThemeAction::Cycle,
        Some("toggle") => ThemeAction::Toggle,
        Some(mode) => ThemeAction::Set(mode.parse()?),
    })
}

pub(crate) fn cmd_prefs_theme(
    prefs: &Preferences,
    action: ThemeAction,
    system_dark: bool,
    json: bool,
) -> Result<()> {
    let mode = match action {
        ThemeAction::Show => prefs.theme(),
        ThemeAction::Set(mode) => {
            prefs.set_theme(mode)?;
            mode
        }
        ThemeAction::Cycle => prefs.cycle_theme()?,
        ThemeAction::Toggle => prefs.toggle_theme(system_dark)?,
    };
    let resolved = mode.resolve(system_dark);

    if json {
        println!("{}", serde_json::json!({ "mode": mode, "resolved": resolved }));
    } else {
        println!("Theme: {mode} ({resolved:?})");
    }
    Ok(())
}

pub(crate) fn cmd_prefs_language(prefs: &Preferences, code: Option<&str>, json: bool) -> Result<()> {
    let language = match code {
        Some(code) => prefs.set_language(code)?,
        None => prefs.language(),
    };
    if json {
        println!(
            "{}",
            serde_json::json!({ "language": language, "supported": SUPPORTED_LANGUAGES })
        );
    } else {
        println!("Language: {language}");
        if code.is_none() {
            println!("  Supported: {}", SUPPORTED_LANGUAGES.join(", "));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_theme_action() {
        assert_eq!(parse_theme_action(None).unwrap(), ThemeAction::Show);
        assert_eq!(parse_theme_action(Some("cycle")).unwrap(), ThemeAction::Cycle);
        assert_eq!(
            parse_theme_action(Some("dark")).unwrap(),
            ThemeAction::Set(ThemeMode::Dark)
        );
        assert!(parse_theme_action(Some("neon")).is_err());
    }
}
