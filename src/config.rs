use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HASH_COST: u32 = 10;
const HASH_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory holding `users.json` and `uploads.json`.
    pub data_dir: PathBuf,
    /// Directory uploaded binaries are written to and served from.
    pub upload_dir: PathBuf,
    pub hash_cost: u32,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("."),
            upload_dir: PathBuf::from("uploads"),
            hash_cost: DEFAULT_HASH_COST,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            port: try_load("WIFTO_PORT", defaults.port),
            data_dir: try_load("WIFTO_DATA_DIR", defaults.data_dir),
            upload_dir: try_load("WIFTO_UPLOAD_DIR", defaults.upload_dir),
            hash_cost: checked_hash_cost(
                try_load("WIFTO_HASH_COST", defaults.hash_cost),
                defaults.hash_cost,
            ),
            max_upload_bytes: try_load("WIFTO_MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
        }
    }

    /// Layout rooted in one directory, used by tests and local runs.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            upload_dir: root.join("uploads"),
            data_dir: root,
            ..Self::default()
        }
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// bcrypt refuses costs outside 4..=31.
fn checked_hash_cost(cost: u32, default: u32) -> u32 {
    if HASH_COST_RANGE.contains(&cost) {
        cost
    } else {
        warn!(
            "WIFTO_HASH_COST {cost} outside {}..={}, using default: {default}",
            HASH_COST_RANGE.start(),
            HASH_COST_RANGE.end()
        );
        default
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default:?}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default:?}");
            default
        }
    }
}
