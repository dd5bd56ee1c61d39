//! Integration tests for config

#[cfg(test)]
mod tests {
    use archfix_config::*;
    use archfix_types::{ColorChoice, OutputFormat};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: [&str; 5] = [
        "ARCHFIX_OUTPUT",
        "ARCHFIX_COLOR",
        "ARCHFIX_RESOURCES_DIR",
        "ARCHFIX_LOG_DIR",
        "ARCHFIX_LOG_MAX_ENTRIES",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "json"
color = "never"

[paths]
resources_dir = "/srv/variants"

[bundle]
binaries = ["ffmpeg", "ffprobe"]
backup_dir_name = "originals"

[log]
max_entries = 50
journal = false
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(config.general.color, ColorChoice::Never);
        assert_eq!(config.resources_dir(), PathBuf::from("/srv/variants"));
        assert_eq!(config.bundle.binaries, vec!["ffmpeg", "ffprobe"]);
        assert_eq!(config.bundle.backup_dir_name, "originals");
        // Unspecified fields keep their defaults
        assert_eq!(config.bundle.executable_dirs[0], PathBuf::from("Contents/MacOS"));
        assert_eq!(config.log.max_entries, 50);
        assert!(config.journal_path().is_none());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bundle.binaries[0], "ffmpeg");
        assert_eq!(config.bundle.backup_dir_name, "ffmpeg_backup_original");
        assert_eq!(config.log.max_entries, 200);
        assert!(config.log.journal);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_empty_binary_set_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[bundle]\nbinaries = []").unwrap();

        let result = Config::load_from_file(temp_file.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[general\ncolor = ").unwrap();

        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("ARCHFIX_OUTPUT", "json");
        std::env::set_var("ARCHFIX_COLOR", "always");
        std::env::set_var("ARCHFIX_LOG_DIR", "/tmp/archfix-logs");
        std::env::set_var("ARCHFIX_LOG_MAX_ENTRIES", "10");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert_eq!(config.general.color, ColorChoice::Always);
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/archfix-logs"));
        assert_eq!(
            config.journal_path(),
            Some(PathBuf::from("/tmp/archfix-logs/operations.jsonl"))
        );
        assert_eq!(config.log.max_entries, 10);

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("ARCHFIX_LOG_MAX_ENTRIES", "0");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(result.is_err());

        clear_env();
    }

    #[test]
    fn test_default_bundle_path_picks_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.bundle.search_paths = vec![dir.path().join("missing"), dir.path().to_path_buf()];
        assert_eq!(config.default_bundle_path(), Some(dir.path().to_path_buf()));

        config.bundle.search_paths = vec![dir.path().join("missing")];
        assert_eq!(config.default_bundle_path(), None);
    }
}
