use super::*;

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: u64 = env_parse("__FLOATNOTE_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__FLOATNOTE_TEST_VALID__", "250") };
    let val: u64 = env_parse("__FLOATNOTE_TEST_VALID__", 0);
    assert_eq!(val, 250);
    unsafe { std::env::remove_var("__FLOATNOTE_TEST_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__FLOATNOTE_TEST_INVALID__", "soon") };
    let val: u64 = env_parse("__FLOATNOTE_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__FLOATNOTE_TEST_INVALID__") };
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn from_env_reads_overrides() {
    unsafe {
        std::env::set_var("FLOATNOTE_DATA_FILE", "/tmp/fn/data.json");
        std::env::set_var("FLOATNOTE_EXPORT_DIR", "/tmp/fn/exports");
        std::env::set_var("FLOATNOTE_AUTOSAVE_DEBOUNCE_MS", "250");
    }
    let config = Config::from_env();
    unsafe {
        std::env::remove_var("FLOATNOTE_DATA_FILE");
        std::env::remove_var("FLOATNOTE_EXPORT_DIR");
        std::env::remove_var("FLOATNOTE_AUTOSAVE_DEBOUNCE_MS");
    }
    assert_eq!(config.data_file, PathBuf::from("/tmp/fn/data.json"));
    assert_eq!(config.export_dir, PathBuf::from("/tmp/fn/exports"));
    assert_eq!(config.autosave_debounce, Duration::from_millis(250));
}

#[test]
fn default_paths_end_in_expected_names() {
    assert!(default_data_file().ends_with("floatnote/floatnote-data.json"));
    assert!(default_export_dir().ends_with(".floatnote"));
}
