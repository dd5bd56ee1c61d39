//! Integration tests for error types

#[cfg(test)]
mod tests {
    use archfix_errors::*;

    #[test]
    fn test_error_conversion() {
        let bundle_err = BundleError::NoBackupAvailable {
            path: "/Applications/EmbyServer.app".into(),
        };
        let err: Error = bundle_err.into();
        assert!(matches!(err, Error::Bundle(BundleError::NoBackupAvailable { .. })));
        assert_eq!(err.user_code(), Some("bundle.no_backup"));
    }

    #[test]
    fn test_error_display_names_path() {
        let err = BundleError::ReplaceFailed {
            path: "/tmp/Emby.app/Contents/MacOS/ffmpeg".into(),
            message: "verification reported x86_64".into(),
        };
        assert_eq!(
            err.to_string(),
            "replace failed for /tmp/Emby.app/Contents/MacOS/ffmpeg: verification reported x86_64"
        );
        assert_eq!(err.path(), "/tmp/Emby.app/Contents/MacOS/ffmpeg");
    }

    #[test]
    fn test_error_clone() {
        let err = OpsError::AlreadyRunning {
            operation: "fix".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PlatformError::from_io("read", std::path::Path::new("/nope/ffmpeg"), &io_err);
        assert!(matches!(err, PlatformError::FileNotFound { ref path } if path == "/nope/ffmpeg"));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PlatformError::from_io("copy", std::path::Path::new("/x"), &io_err);
        assert!(matches!(err, PlatformError::PermissionDenied { .. }));
    }

    #[test]
    fn test_cancelled_is_retryable() {
        let err = Error::Cancelled;
        assert!(err.is_cancelled());
        assert!(err.is_retryable());
        assert_eq!(err.user_code(), Some("error.cancelled"));
    }
}
