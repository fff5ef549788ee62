use std::path::PathBuf;

use crate::data::loader::{InvalidRowPolicy, LoadOptions};

pub const DATA_PATH_VAR: &str = "MALL_DASH_DATA";
pub const PREVIEW_ROWS_VAR: &str = "MALL_DASH_PREVIEW_ROWS";
pub const INVALID_ROWS_VAR: &str = "MALL_DASH_INVALID_ROWS";

const DEFAULT_DATA_PATH: &str = "data.json";
const DEFAULT_PREVIEW_ROWS: usize = 100;

/// Startup settings, read from the environment.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub preview_rows: usize,
    pub load_options: LoadOptions,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            load_options: LoadOptions::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Values that don't parse fall back to the default with a warning.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(DATA_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(PREVIEW_ROWS_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(rows) => config.preview_rows = rows,
                Err(e) => log::warn!("Ignoring {PREVIEW_ROWS_VAR}={raw:?}: {e}"),
            }
        }

        if let Some(raw) = lookup(INVALID_ROWS_VAR) {
            match raw.parse::<InvalidRowPolicy>() {
                Ok(policy) => config.load_options.invalid_rows = policy,
                Err(e) => log::warn!("Ignoring {INVALID_ROWS_VAR}={raw:?}: {e}"),
            }
        }

        config
    }
}
