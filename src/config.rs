// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct Config {
    /// Overrides the platform data directory database.
    pub db_path: Option<PathBuf>,
    pub log_filter: String,
    /// Staff username acting when `--as` is not given.
    pub actor: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_api: String,
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: None,
            log_filter: "info".to_string(),
            actor: None,
            telegram_token: None,
            telegram_api: DEFAULT_TELEGRAM_API.to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// Reads `BULKPAY_*` variables, after loading a `.env` file if one exists.
    pub fn load() -> Config {
        let _ = dotenvy::dotenv();
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Config {
            db_path: non_empty("BULKPAY_DB").map(PathBuf::from),
            log_filter: non_empty("BULKPAY_LOG").unwrap_or(defaults.log_filter),
            actor: non_empty("BULKPAY_ACTOR"),
            telegram_token: non_empty("BULKPAY_TELEGRAM_TOKEN"),
            telegram_api: non_empty("BULKPAY_TELEGRAM_API")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.telegram_api),
            busy_timeout_ms: non_empty("BULKPAY_BUSY_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.busy_timeout_ms),
        }
    }
}
