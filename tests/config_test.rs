// tests/config_test.rs
use releng::config::{load_config, Config, CONFIG_FILE_NAME};
use releng::RelengError;
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[promotion]
remote = "upstream"
skip_master = true

[packaging]
append_dist = true
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path())).unwrap();
    assert_eq!(config.promotion.remote, "upstream");
    assert!(config.promotion.skip_master);
    assert!(config.packaging.append_dist);
}

#[test]
fn test_empty_file_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    let config = load_config(Some(temp_file.path())).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_invalid_toml_is_config_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[promotion\nremote = ").unwrap();
    temp_file.flush().unwrap();

    let err = load_config(Some(temp_file.path())).unwrap_err();
    assert!(matches!(err, RelengError::Config(_)));
}

#[test]
fn test_wrong_value_type_is_config_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[promotion]\nskip_master = \"yes\"\n")
        .unwrap();
    temp_file.flush().unwrap();

    assert!(matches!(
        load_config(Some(temp_file.path())),
        Err(RelengError::Config(_))
    ));
}

#[test]
#[serial]
fn test_config_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[promotion]\nremote = \"pulp\"\n",
    )
    .unwrap();

    let previous = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let loaded = load_config(None);
    env::set_current_dir(previous).unwrap();

    let config = loaded.unwrap();
    assert_eq!(config.promotion.remote, "pulp");
    assert!(!config.promotion.skip_master);
}
