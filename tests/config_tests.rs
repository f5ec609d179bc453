use dorosee::config;
use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

// Tests below mutate process-wide environment variables.
static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[test]
fn test_parse_iterations_valid() {
    assert_eq!(config::parse_iterations("250000"), 250_000);
}

#[test]
fn test_parse_iterations_with_whitespace() {
    assert_eq!(config::parse_iterations("  1200 "), 1_200);
}

#[test]
fn test_parse_iterations_empty_uses_default() {
    assert_eq!(config::parse_iterations(""), config::DEFAULT_PBKDF2_ITERATIONS);
}

#[test]
fn test_parse_iterations_zero_uses_default() {
    assert_eq!(config::parse_iterations("0"), config::DEFAULT_PBKDF2_ITERATIONS);
}

#[test]
fn test_parse_iterations_garbage_uses_default() {
    assert_eq!(config::parse_iterations("lots"), config::DEFAULT_PBKDF2_ITERATIONS);
}

#[test]
fn test_get_pbkdf2_iterations_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::set_var("PBKDF2_ITERATIONS", "5000");

    assert_eq!(config::get_pbkdf2_iterations(), 5_000);

    // Clean up
    env::remove_var("PBKDF2_ITERATIONS");
}

#[test]
fn test_get_data_dir_uses_default() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::remove_var("DOROSEE_DATA_DIR");

    assert_eq!(config::get_data_dir(), PathBuf::from(config::DEFAULT_DATA_DIR));
}

#[test]
fn test_get_data_dir_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::set_var("DOROSEE_DATA_DIR", " /var/lib/dorosee ");

    assert_eq!(config::get_data_dir(), PathBuf::from("/var/lib/dorosee"));

    // Clean up
    env::remove_var("DOROSEE_DATA_DIR");
}

#[test]
fn test_load_env_file_reads_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(&path, "DOROSEE_TEST_ONLY_KEY=from-file\n").unwrap();

    config::load_env_file(path.to_str());

    assert_eq!(env::var("DOROSEE_TEST_ONLY_KEY").unwrap(), "from-file");

    // Clean up
    env::remove_var("DOROSEE_TEST_ONLY_KEY");
}

#[test]
fn test_init_tracing_is_idempotent() {
    config::init_tracing();
    config::init_tracing();
}
