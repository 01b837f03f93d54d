//! Streaming cleanup of OpenStreetMap XML extracts into flat CSV tables.

pub mod data;
pub mod diagnostics;
pub mod errors;
pub mod etl;
pub mod normalize;
pub mod schema;

use serde::Deserialize;

use crate::normalize::address::{DEFAULT_COUNTY_FALLBACK, DEFAULT_STATE_CODE};

#[derive(Deserialize)]
pub struct UserConfig {
    pub data_path: String,
    pub dest_path: String,
    #[serde(default)]
    pub validate: bool,
    #[serde(default)]
    pub schema_path: Option<String>,
    #[serde(default = "default_state_code")]
    pub state_code: String,
    #[serde(default = "default_county_fallback")]
    pub county_fallback: String,
    #[serde(default)]
    pub show_progress: bool,
    #[serde(default = "default_report_top_keys")]
    pub report_top_keys: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_state_code() -> String {
    DEFAULT_STATE_CODE.to_string()
}

fn default_county_fallback() -> String {
    DEFAULT_COUNTY_FALLBACK.to_string()
}

fn default_report_top_keys() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

