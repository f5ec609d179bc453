use std::env;
use std::path::{Path, PathBuf};

// Default configuration constants
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
pub const DEFAULT_REPORT_STATUS: &str = "접수됨";

pub fn load_env_file(env_file: Option<&str>) {
    if let Some(path) = env_file {
        dotenvy::from_path(Path::new(path)).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

/// Directory holding one `<kind>.json` file per record kind.
pub fn get_data_dir() -> PathBuf {
    let raw = env::var("DOROSEE_DATA_DIR").unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        PathBuf::from(DEFAULT_DATA_DIR)
    } else {
        PathBuf::from(trimmed)
    }
}

pub fn get_pbkdf2_iterations() -> u32 {
    parse_iterations(&env::var("PBKDF2_ITERATIONS").unwrap_or_default())
}

/// Falls back to the default on empty, unparsable or zero input.
pub fn parse_iterations(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => DEFAULT_PBKDF2_ITERATIONS,
    }
}

/// Install the global `tracing` subscriber, filtered by `RUST_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
