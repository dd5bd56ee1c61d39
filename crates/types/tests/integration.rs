//! Integration tests for types

#[cfg(test)]
mod tests {
    use archfix_types::*;

    #[test]
    fn test_arch_serialization() {
        let arch = Architecture::Arm64;
        let json = serde_json::to_string(&arch).unwrap();
        assert_eq!(json, r#""arm64""#);

        let deserialized: Architecture = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, arch);
    }

    #[test]
    fn test_opposite_architecture() {
        assert_eq!(Architecture::X86_64.opposite(), Some(Architecture::Arm64));
        assert_eq!(Architecture::Arm64.opposite(), Some(Architecture::X86_64));
        assert_eq!(Architecture::Unknown.opposite(), None);
    }

    #[test]
    fn test_operation_state_serialization() {
        let json = serde_json::to_value(OperationState::Running(OperationKind::Fix)).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["operation"], "fix");

        let json = serde_json::to_value(OperationState::Idle).unwrap();
        assert_eq!(json["state"], "idle");
        assert!(!OperationState::Stopped.is_running());
        assert!(!OperationState::Failed.is_running());
    }

    #[test]
    fn test_log_status_terminal() {
        assert!(!LogStatus::Active.is_terminal());
        assert!(LogStatus::Complete.is_terminal());
        assert!(LogStatus::Error.is_terminal());
    }

    #[test]
    fn test_operation_labels() {
        assert_eq!(OperationKind::Restore.label(), "Restore original binaries");
        assert_eq!(OperationKind::ForceTest.to_string(), "force_test");
    }

    #[test]
    fn test_output_format_default() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt, OutputFormat::Tty);
        assert_eq!(ColorChoice::default(), ColorChoice::Auto);
    }
}
