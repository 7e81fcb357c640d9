//! Configuration layering and validation tests.

use clap::Parser;
use hostwatch::cli::Cli;
use hostwatch::config::Config;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
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

// `Config::load` always reads `HOSTWATCH_`-prefixed environment
// variables, so every test that loads a config runs `#[serial]` to keep
// the env test from bleeding into the others.

#[test]
#[serial]
fn test_load_full_valid_config() {
    let toml_content = r#"
        log_level = "debug"
        [telegram]
        token = "123456:ABCDEF"
        authorized_user = 111222333
        api_url = "https://tg.example.com"
        poll_timeout_seconds = 30
        [probes]
        uptime_path = "/custom/uptime"
        thermal_path = "/custom/temp"
        meminfo_path = "/custom/meminfo"
        disk_mount = "/data"
        [reboot]
        command = ["systemctl", "reboot"]
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["hostwatch", "--config", path.to_str().unwrap()]).unwrap();
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.log_level, "debug".to_string());
        assert_eq!(config.telegram.token, "123456:ABCDEF".to_string());
        assert_eq!(config.telegram.authorized_user, Some(111222333));
        assert_eq!(config.telegram.api_url, "https://tg.example.com".to_string());
        assert_eq!(config.telegram.poll_timeout_seconds, 30);
        assert_eq!(config.probes.uptime_path, PathBuf::from("/custom/uptime"));
        assert_eq!(config.probes.thermal_path, PathBuf::from("/custom/temp"));
        assert_eq!(config.probes.meminfo_path, PathBuf::from("/custom/meminfo"));
        assert_eq!(config.probes.disk_mount, PathBuf::from("/data"));
        assert_eq!(
            config.reboot.command,
            vec!["systemctl".to_string(), "reboot".to_string()]
        );
    });
}

#[test]
#[serial]
fn test_load_partial_config_uses_defaults() {
    let toml_content = r#"
        [telegram]
        token = "123456:ABCDEF"
        authorized_user = 111222333
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["hostwatch", "--config", path.to_str().unwrap()]).unwrap();
        let config = Config::load(&cli).unwrap();

        // Values from file
        assert_eq!(config.telegram.token, "123456:ABCDEF".to_string());
        assert_eq!(config.telegram.authorized_user, Some(111222333));

        // Values from Default
        assert_eq!(config.log_level, "info".to_string());
        assert_eq!(
            config.telegram.api_url,
            "https://api.telegram.org".to_string()
        );
        assert_eq!(config.telegram.poll_timeout_seconds, 60);
        assert_eq!(config.probes.uptime_path, PathBuf::from("/proc/uptime"));
        assert_eq!(
            config.probes.thermal_path,
            PathBuf::from("/sys/class/thermal/thermal_zone0/temp")
        );
        assert_eq!(config.probes.meminfo_path, PathBuf::from("/proc/meminfo"));
        assert_eq!(config.probes.disk_mount, PathBuf::from("/"));
        assert_eq!(
            config.reboot.command,
            vec!["sudo".to_string(), "reboot".to_string()]
        );
    });
}

#[test]
#[serial]
fn test_cli_flags_override_the_file() {
    let toml_content = r#"
        log_level = "info"
        [telegram]
        token = "123456:ABCDEF"
        authorized_user = 111222333
        poll_timeout_seconds = 30
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from([
            "hostwatch",
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            "debug",
            "--timeout",
            "5",
        ])
        .unwrap();
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.log_level, "debug".to_string());
        assert_eq!(config.telegram.poll_timeout_seconds, 5);
    });
}

#[test]
#[serial]
fn test_env_overrides_file_but_loses_to_cli() {
    let toml_content = r#"
        log_level = "info"
        [telegram]
        token = "123456:ABCDEF"
        authorized_user = 111222333
        poll_timeout_seconds = 30
    "#;

    std::env::set_var("HOSTWATCH_LOG_LEVEL", "warn");
    std::env::set_var("HOSTWATCH_TELEGRAM__POLL_TIMEOUT_SECONDS", "10");

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["hostwatch", "--config", path.to_str().unwrap()]).unwrap();
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.log_level, "warn".to_string());
        assert_eq!(config.telegram.poll_timeout_seconds, 10);

        let cli = Cli::try_parse_from([
            "hostwatch",
            "--config",
            path.to_str().unwrap(),
            "--timeout",
            "5",
        ])
        .unwrap();
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.telegram.poll_timeout_seconds, 5);
    });

    std::env::remove_var("HOSTWATCH_LOG_LEVEL");
    std::env::remove_var("HOSTWATCH_TELEGRAM__POLL_TIMEOUT_SECONDS");
}

#[test]
#[serial]
fn test_missing_token_is_rejected() {
    let toml_content = r#"
        [telegram]
        authorized_user = 111222333
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["hostwatch", "--config", path.to_str().unwrap()]).unwrap();
        let error = Config::load(&cli).unwrap_err();
        assert!(error.to_string().contains("telegram.token"));
    });
}

#[test]
#[serial]
fn test_missing_authorized_user_is_rejected() {
    let toml_content = r#"
        [telegram]
        token = "123456:ABCDEF"
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["hostwatch", "--config", path.to_str().unwrap()]).unwrap();
        let error = Config::load(&cli).unwrap_err();
        assert!(error.to_string().contains("telegram.authorized_user"));
    });
}

#[test]
#[serial]
fn test_zero_poll_timeout_is_rejected() {
    let toml_content = r#"
        [telegram]
        token = "123456:ABCDEF"
        authorized_user = 111222333
        poll_timeout_seconds = 0
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["hostwatch", "--config", path.to_str().unwrap()]).unwrap();
        let error = Config::load(&cli).unwrap_err();
        assert!(error.to_string().contains("poll_timeout_seconds"));
    });
}

#[test]
#[serial]
fn test_empty_reboot_command_is_rejected() {
    let toml_content = r#"
        [telegram]
        token = "123456:ABCDEF"
        authorized_user = 111222333
        [reboot]
        command = []
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["hostwatch", "--config", path.to_str().unwrap()]).unwrap();
        let error = Config::load(&cli).unwrap_err();
        assert!(error.to_string().contains("reboot.command"));
    });
}

#[test]
#[serial]
fn test_invalid_value_type() {
    let toml_content = r#"
        [telegram]
        token = "123456:ABCDEF"
        authorized_user = "not-a-number"
    "#;

    with_config_file(toml_content, |path| {
        let cli = Cli::try_parse_from(["hostwatch", "--config", path.to_str().unwrap()]).unwrap();
        let error = Config::load(&cli).unwrap_err();
        assert!(error.to_string().contains("invalid type"));
    });
}

#[test]
#[serial]
fn test_non_existent_config_file() {
    let non_existent_path = PathBuf::from("/path/to/non/existent/hostwatch.toml");
    let cli =
        Cli::try_parse_from(["hostwatch", "--config", non_existent_path.to_str().unwrap()])
            .unwrap();
    let error = Config::load(&cli).unwrap_err();
    assert!(error.to_string().contains("Config file not found"));
}
