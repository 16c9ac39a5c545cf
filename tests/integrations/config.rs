use alertbus::cli::Cli;
use alertbus::config::Config;
use clap::Parser;
use serial_test::serial;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A helper function to run a test with a temporary config file.
fn with_config_file<F>(toml_content: &str, test_fn: F)
where
    F: FnOnce(PathBuf),
{
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();
    let path = file.path().to_path_buf();
    test_fn(path);
}

fn parse(config: &Path, extra: &[&str]) -> Cli {
    let mut args = vec!["alertbus", "--config", config.to_str().unwrap()];
    args.extend_from_slice(extra);
    args.extend_from_slice(&["alerts", "notifiers"]);
    Cli::try_parse_from(args).unwrap()
}

#[test]
#[serial]
fn test_defaults_without_file() {
    let cli = parse(Path::new("/nonexistent/alertbus.toml"), &[]);
    let config = Config::load(&cli).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.org_id, 1);
    assert_eq!(config.log_level, "info");
    assert!(!config.secrets.secret_key.is_empty());
    assert_eq!(config.fixture.path, None);
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let toml_content = r#"
        log_level = "debug"
        org_id = 3
        unified_alerting = true
        [secrets]
        secret_key = "from-file"
        [fixture]
        path = "/var/lib/alertbus/fixture.yml"
    "#;

    with_config_file(toml_content, |path| {
        let config = Config::load(&parse(&path, &[])).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.org_id, 3);
        assert!(config.unified_alerting);
        assert_eq!(config.secrets.secret_key, "from-file");
        assert_eq!(
            config.fixture.path,
            Some(PathBuf::from("/var/lib/alertbus/fixture.yml"))
        );
    });
}

#[test]
#[serial]
fn test_env_overrides_file() {
    with_config_file("org_id = 3\n[secrets]\nsecret_key = \"from-file\"\n", |path| {
        std::env::set_var("ALERTBUS_ORG_ID", "5");
        std::env::set_var("ALERTBUS_SECRETS__SECRET_KEY", "from-env");
        let result = Config::load(&parse(&path, &[]));
        std::env::remove_var("ALERTBUS_ORG_ID");
        std::env::remove_var("ALERTBUS_SECRETS__SECRET_KEY");

        let config = result.unwrap();
        assert_eq!(config.org_id, 5);
        assert_eq!(config.secrets.secret_key, "from-env");
    });
}

#[test]
#[serial]
fn test_cli_overrides_env_and_file() {
    with_config_file("org_id = 3\nlog_level = \"warn\"\n", |path| {
        std::env::set_var("ALERTBUS_ORG_ID", "5");
        let cli = parse(
            &path,
            &["--org-id", "8", "--log-level", "trace", "--fixture", "seed.yml"],
        );
        let result = Config::load(&cli);
        std::env::remove_var("ALERTBUS_ORG_ID");

        let config = result.unwrap();
        assert_eq!(config.org_id, 8);
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.fixture.path, Some(PathBuf::from("seed.yml")));
    });
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    with_config_file("org_id = 0\n", |path| {
        let err = Config::load(&parse(&path, &[])).unwrap_err();
        assert!(err.to_string().contains("org_id must be positive"));
    });

    with_config_file("org_id = \"one\"\n", |path| {
        let err = Config::load(&parse(&path, &[])).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    });
}

#[test]
#[serial]
fn test_fixture_flag_overrides_file_path() {
    let toml_content = "[fixture]\npath = \"/var/lib/alertbus/fixture.yml\"\n";

    with_config_file(toml_content, |path| {
        let config = Config::load(&parse(&path, &["--fixture", "/tmp/override.yml"])).unwrap();
        assert_eq!(config.fixture.path, Some(PathBuf::from("/tmp/override.yml")));
    });
}
