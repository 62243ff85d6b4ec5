mod bmi;
mod chart;
mod helpers;
mod insights;
mod prefs;
mod profile;
mod remote;
mod weight;

pub(crate) use bmi::cmd_bmi;
pub(crate) use chart::{ChartKind, cmd_chart};
pub(crate) use insights::cmd_insights;
pub(crate) use prefs::{cmd_prefs_language, cmd_prefs_theme, parse_theme_action};
pub(crate) use profile::{
    ProfileSetArgs, cmd_profile_clear, cmd_profile_set, cmd_profile_show, cmd_profile_status,
};
pub(crate) use remote::{cmd_remote_list, cmd_remote_load};
pub(crate) use weight::{
    WeightLogArgs, cmd_weight_clear, cmd_weight_delete, cmd_weight_history, cmd_weight_log,
    cmd_weight_recalc, cmd_weight_show,
};
