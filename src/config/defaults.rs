//! Default configuration values
//!
//! Named constants for all tunable parameters

use crate::constants::api::{AMAP_URL, BAIDU_URL, TENCENT_URL};

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 3000;

/// Provider base URLs
pub const DEFAULT_AMAP_URL: &str = AMAP_URL;
pub const DEFAULT_BAIDU_URL: &str = BAIDU_URL;
pub const DEFAULT_TENCENT_URL: &str = TENCENT_URL;

/// Per-provider request timeouts in milliseconds
pub const DEFAULT_PRIMARY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_BAIDU_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_TENCENT_TIMEOUT_MS: u64 = 5_000;

/// How recent a user interaction must be for an embedded position request
pub const DEFAULT_INTERACTION_WINDOW_MS: u64 = 5_000;

/// Extra single-shot attempts after a timeout
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Pause between single-shot retries
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Accuracy radius that ends refinement early
pub const DEFAULT_ACCURACY_THRESHOLD_M: f64 = 50.0;

/// Timeout for one single-shot platform request
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Oldest cached fix a single-shot request accepts
pub const DEFAULT_MAX_AGE_SECS: u64 = 60;

/// Overall refinement deadline
pub const DEFAULT_DEADLINE_SECS: u64 = 30;

/// Default log filter when RUST_LOG is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variables that override the provider keys
pub const AMAP_KEY_ENV: &str = "AMAP_KEY";
pub const BAIDU_KEY_ENV: &str = "BAIDU_KEY";
pub const TENCENT_KEY_ENV: &str = "TENCENT_KEY";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Record file name inside the data directory
pub const RECORDS_FILE_NAME: &str = "records.jsonl";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "geocollect";
