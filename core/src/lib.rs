pub mod bmi;
pub mod chart;
pub mod db;
pub mod insights;
pub mod legacy;
pub mod models;
pub mod plugin;
pub mod preferences;
pub mod profile;
pub mod service;
pub mod storage;
pub mod units;
pub mod validation;
