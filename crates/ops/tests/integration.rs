//! Integration tests for the compatibility engine

#[cfg(test)]
mod tests {
    use archfix_config::Config;
    use archfix_errors::{BundleError, Error, OpsError, PlatformError};
    use archfix_events::{AppEvent, EngineEvent};
    use archfix_ops::*;
    use archfix_platform::{
        ArchitectureProbe, FilesystemOperations, NativeFilesystem, NativeProbe, Platform,
        PlatformContext,
    };
    use archfix_types::{Architecture, LogStatus, OperationKind, OperationState};
    use async_trait::async_trait;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    const CPU_TYPE_X86_64: u32 = 0x0100_0007;
    const CPU_TYPE_ARM64: u32 = 0x0100_000c;

    fn thin_macho(arch: Architecture) -> Vec<u8> {
        let cputype = match arch {
            Architecture::Arm64 => CPU_TYPE_ARM64,
            _ => CPU_TYPE_X86_64,
        };
        let mut data = Vec::new();
        for word in [0xfeed_facf_u32, cputype, 0, 2, 0, 0, 0, 0] {
            data.extend_from_slice(&word.to_le_bytes());
        }
        data
    }

    fn write_exe(path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Native filesystem that pauses on the nth `atomic_replace` until
    /// resumed, or fails the nth `copy_file` / `atomic_replace`
    /// (0 disables each)
    struct ScriptedFilesystem {
        inner: NativeFilesystem,
        copies: AtomicUsize,
        calls: AtomicUsize,
        pause_on: usize,
        fail_copy_on: usize,
        fail_replace_on: usize,
        reached: Arc<Notify>,
        resume: Arc<Notify>,
    }

    impl ScriptedFilesystem {
        fn new() -> Self {
            Self {
                inner: NativeFilesystem::new(),
                copies: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                pause_on: 0,
                fail_copy_on: 0,
                fail_replace_on: 0,
                reached: Arc::new(Notify::new()),
                resume: Arc::new(Notify::new()),
            }
        }

        fn injected(path: &Path) -> PlatformError {
            PlatformError::FilesystemOperationFailed {
                operation: "copy".to_string(),
                path: path.display().to_string(),
                message: "disk full".to_string(),
            }
        }
    }

    #[async_trait]
    impl FilesystemOperations for ScriptedFilesystem {
        async fn copy_file(
            &self,
            ctx: &PlatformContext,
            src: &Path,
            dst: &Path,
        ) -> Result<(), PlatformError> {
            let call = self.copies.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_copy_on {
                return Err(Self::injected(dst));
            }
            self.inner.copy_file(ctx, src, dst).await
        }

        async fn atomic_replace(
            &self,
            ctx: &PlatformContext,
            src: &Path,
            dst: &Path,
            mode: u32,
        ) -> Result<(), PlatformError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_replace_on {
                return Err(Self::injected(dst));
            }
            if call == self.pause_on {
                self.reached.notify_one();
                self.resume.notified().await;
            }
            self.inner.atomic_replace(ctx, src, dst, mode).await
        }

        async fn rename(
            &self,
            ctx: &PlatformContext,
            src: &Path,
            dst: &Path,
        ) -> Result<(), PlatformError> {
            self.inner.rename(ctx, src, dst).await
        }

        async fn create_dir_all(
            &self,
            ctx: &PlatformContext,
            path: &Path,
        ) -> Result<(), PlatformError> {
            self.inner.create_dir_all(ctx, path).await
        }

        async fn remove_dir_all(
            &self,
            ctx: &PlatformContext,
            path: &Path,
        ) -> Result<(), PlatformError> {
            self.inner.remove_dir_all(ctx, path).await
        }

        async fn exists(&self, ctx: &PlatformContext, path: &Path) -> bool {
            self.inner.exists(ctx, path).await
        }

        async fn is_dir(&self, ctx: &PlatformContext, path: &Path) -> bool {
            self.inner.is_dir(ctx, path).await
        }

        async fn is_file(&self, ctx: &PlatformContext, path: &Path) -> bool {
            self.inner.is_file(ctx, path).await
        }
    }

    struct Fixture {
        dir: TempDir,
        bundle: PathBuf,
        macos_dir: PathBuf,
        config: Config,
    }

    /// x86_64 `EmbyServer.app` and a variant store for both architectures
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("EmbyServer.app");
        let macos_dir = bundle.join("Contents/MacOS");
        std::fs::create_dir_all(bundle.join("Contents/Resources")).unwrap();
        for name in ["ffmpeg", "ffprobe"] {
            write_exe(&macos_dir.join(name), &thin_macho(Architecture::X86_64));
        }

        let store = dir.path().join("ffmpeg_binaries");
        for arch in Architecture::KNOWN {
            for name in ["ffmpeg", "ffprobe"] {
                write_exe(&store.join(arch.as_str()).join(name), &thin_macho(arch));
            }
        }

        let mut config = Config::default();
        config.paths.resources_dir = Some(store);
        config.log.journal = false;
        Fixture {
            dir,
            bundle,
            macos_dir,
            config,
        }
    }

    fn engine_with_filesystem(
        f: &Fixture,
        host: Architecture,
        filesystem: ScriptedFilesystem,
    ) -> CompatibilityEngine {
        let platform = Platform::new(
            Arc::new(NativeProbe::with_host(host)),
            Arc::new(filesystem),
        );
        EngineBuilder::new()
            .with_config(f.config.clone())
            .with_platform(platform)
            .build()
            .unwrap()
    }

    fn engine_on(f: &Fixture, host: Architecture) -> CompatibilityEngine {
        EngineBuilder::new()
            .with_config(f.config.clone())
            .with_platform(Platform::with_probe(Arc::new(NativeProbe::with_host(host))))
            .build()
            .unwrap()
    }

    async fn transcoder_arch(path: &Path) -> archfix_types::ArchitectureSet {
        let probe = NativeProbe::new();
        probe
            .binary_architecture(&PlatformContext::default(), path)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_check_reports_mismatch() {
        let f = fixture();
        let engine = engine_on(&f, Architecture::Arm64);

        let report = engine.check(&f.bundle).await.unwrap();
        assert!(!report.is_compatible);
        assert_eq!(report.host_architecture, Architecture::Arm64);
        assert!(report.binary_architecture.contains(Architecture::X86_64));
        assert_eq!(engine.process_state().state, OperationState::Idle);

        let log = engine.get_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].entry.label, OperationKind::Check.label());
        assert_eq!(log[0].entry.status, LogStatus::Complete);
        assert!(log[0].children.len() >= 3);
    }

    #[tokio::test]
    async fn test_check_rejects_invalid_path() {
        let f = fixture();
        let engine = engine_on(&f, Architecture::Arm64);

        let err = engine.check(&f.bundle.join("missing")).await.unwrap_err();
        assert!(matches!(err, Error::Bundle(BundleError::InvalidPath { .. })));
        assert_eq!(engine.process_state().state, OperationState::Failed);
        assert_eq!(engine.get_log()[0].entry.status, LogStatus::Error);
    }

    #[tokio::test]
    async fn test_fix_then_already_compatible() {
        let f = fixture();
        let engine = engine_on(&f, Architecture::Arm64);

        let report = engine.fix(&f.bundle).await.unwrap();
        assert_eq!(report.backup_created, Some(true));
        assert!(report.verdict.is_compatible);
        assert_eq!(report.files, ["ffmpeg", "ffprobe"]);
        assert!(transcoder_arch(&f.macos_dir.join("ffprobe"))
            .await
            .contains(Architecture::Arm64));

        let backup = engine.check_backup(&f.bundle).await.unwrap();
        assert!(backup.has_backup);
        assert_eq!(backup.backup_dir, f.macos_dir.join("ffmpeg_backup_original"));
        assert!(transcoder_arch(&backup.backup_dir.join("ffmpeg"))
            .await
            .contains(Architecture::X86_64));

        let err = engine.fix(&f.bundle).await.unwrap_err();
        assert!(matches!(err, Error::Ops(OpsError::AlreadyCompatible { .. })));
        // Failure does not block the next operation
        assert_eq!(engine.process_state().state, OperationState::Failed);
        assert!(engine.check(&f.bundle).await.unwrap().is_compatible);
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let f = fixture();
        let engine = engine_on(&f, Architecture::Arm64);

        let err = engine.restore(&f.bundle).await.unwrap_err();
        assert!(matches!(err, Error::Bundle(BundleError::NoBackupAvailable { .. })));

        engine.fix(&f.bundle).await.unwrap();
        let report = engine.restore(&f.bundle).await.unwrap();
        assert_eq!(report.backup_created, None);
        assert!(!report.verdict.is_compatible);
        assert!(report.verdict.binary_architecture.contains(Architecture::X86_64));

        // The backup stays for later restores
        assert!(engine.check_backup(&f.bundle).await.unwrap().has_backup);
    }

    #[tokio::test]
    async fn test_force_defaults_to_opposite_of_host() {
        let f = fixture();
        let engine = engine_on(&f, Architecture::X86_64);

        let report = engine.force_test(&f.bundle, None).await.unwrap();
        assert!(!report.verdict.is_compatible);
        assert!(report.verdict.binary_architecture.contains(Architecture::Arm64));
        assert!(engine.check_backup(&f.bundle).await.unwrap().has_backup);

        let report = engine
            .force_test(&f.bundle, Some(Architecture::X86_64))
            .await
            .unwrap();
        assert!(report.verdict.is_compatible);
    }

    #[tokio::test]
    async fn test_unknown_host() {
        let f = fixture();
        let engine = engine_on(&f, Architecture::Unknown);

        let report = engine.check(&f.bundle).await.unwrap();
        assert!(!report.is_compatible);

        let err = engine.fix(&f.bundle).await.unwrap_err();
        assert!(matches!(err, Error::Ops(OpsError::UnknownHostArchitecture)));
        let err = engine.force_test(&f.bundle, None).await.unwrap_err();
        assert!(matches!(err, Error::Ops(OpsError::UnknownHostArchitecture)));

        // An explicit target still works
        engine
            .force_test(&f.bundle, Some(Architecture::Arm64))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_idle() {
        let f = fixture();
        let engine = engine_on(&f, Architecture::Arm64);
        assert!(!engine.stop().stopped);
        assert!(!engine.process_state().is_processing);
    }

    #[tokio::test]
    async fn test_stop_mid_fix_and_single_flight() {
        let f = fixture();
        let mut filesystem = ScriptedFilesystem::new();
        filesystem.pause_on = 1;
        let reached = Arc::clone(&filesystem.reached);
        let resume = Arc::clone(&filesystem.resume);
        let engine = engine_with_filesystem(&f, Architecture::Arm64, filesystem);

        let running = engine.clone();
        let bundle = f.bundle.clone();
        let fix = tokio::spawn(async move { running.fix(&bundle).await });

        // Paused while replacing the first file
        tokio::time::timeout(Duration::from_secs(5), reached.notified())
            .await
            .unwrap();
        let status = engine.process_state();
        assert!(status.is_processing);
        assert_eq!(status.state, OperationState::Running(OperationKind::Fix));

        let err = engine.check(&f.bundle).await.unwrap_err();
        assert!(matches!(err, Error::Ops(OpsError::AlreadyRunning { .. })));
        // Queries do not need the slot
        assert!(engine.check_backup(&f.bundle).await.unwrap().has_backup);

        assert!(engine.stop().stopped);
        resume.notify_one();

        let err = fix.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(engine.process_state().state, OperationState::Idle);

        // The in-flight file finished; the next one was never started
        assert!(transcoder_arch(&f.macos_dir.join("ffmpeg"))
            .await
            .contains(Architecture::Arm64));
        assert!(transcoder_arch(&f.macos_dir.join("ffprobe"))
            .await
            .contains(Architecture::X86_64));

        let log = engine.get_log();
        let fix_entry = log
            .iter()
            .find(|node| node.entry.label == OperationKind::Fix.label())
            .unwrap();
        assert_eq!(fix_entry.entry.status, LogStatus::Complete);
        assert!(fix_entry
            .children
            .iter()
            .any(|child| child.label == "stopped by user"));

        let rejected = log
            .iter()
            .find(|node| node.entry.label == OperationKind::Check.label())
            .unwrap();
        assert_eq!(rejected.entry.status, LogStatus::Error);

        // Restore brings back the originals after a stopped fix
        engine.restore(&f.bundle).await.unwrap();
        assert!(transcoder_arch(&f.macos_dir.join("ffmpeg"))
            .await
            .contains(Architecture::X86_64));
    }

    #[tokio::test]
    async fn test_failed_backup_fails_fix() {
        let f = fixture();
        let mut filesystem = ScriptedFilesystem::new();
        filesystem.fail_copy_on = 1;
        let engine = engine_with_filesystem(&f, Architecture::Arm64, filesystem);

        let err = engine.fix(&f.bundle).await.unwrap_err();
        assert!(matches!(err, Error::Bundle(BundleError::BackupFailed { .. })));
        assert_eq!(engine.process_state().state, OperationState::Failed);
        assert!(!engine.check_backup(&f.bundle).await.unwrap().has_backup);
        // Nothing was replaced
        assert!(transcoder_arch(&f.macos_dir.join("ffmpeg"))
            .await
            .contains(Architecture::X86_64));

        let log = engine.get_log();
        assert_eq!(log[0].entry.status, LogStatus::Error);
        assert!(log[0]
            .children
            .iter()
            .any(|child| child.status == LogStatus::Error));
    }

    #[tokio::test]
    async fn test_failed_restore_fails_operation() {
        let f = fixture();
        engine_on(&f, Architecture::Arm64).fix(&f.bundle).await.unwrap();

        let mut filesystem = ScriptedFilesystem::new();
        filesystem.fail_replace_on = 2;
        let engine = engine_with_filesystem(&f, Architecture::Arm64, filesystem);

        let err = engine.restore(&f.bundle).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Bundle(BundleError::RestoreFailed { restored: 1, .. })
        ));
        assert_eq!(engine.process_state().state, OperationState::Failed);
        assert_eq!(engine.get_log()[0].entry.status, LogStatus::Error);

        // The partial restore stays on disk
        assert!(transcoder_arch(&f.macos_dir.join("ffmpeg"))
            .await
            .contains(Architecture::X86_64));
        assert!(transcoder_arch(&f.macos_dir.join("ffprobe"))
            .await
            .contains(Architecture::Arm64));

        // Failed does not block the next operation
        engine_on(&f, Architecture::Arm64)
            .restore(&f.bundle)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_select_bundle() {
        let f = fixture();
        let engine = engine_on(&f, Architecture::Arm64);

        let selection = engine.select_bundle(&f.bundle).await.unwrap();
        assert_eq!(selection.location.executable_dir, f.macos_dir);
        assert_eq!(selection.binaries.names(), ["ffmpeg", "ffprobe"]);
        assert!(!selection.has_backup);
        assert_eq!(
            selection.variant_store,
            f.config.paths.resources_dir.clone().unwrap()
        );
        // Selecting is a query and leaves no log entry
        assert!(engine.get_log().is_empty());
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let f = fixture();
        let (tx, mut rx) = archfix_events::channel();
        let engine = EngineBuilder::new()
            .with_config(f.config.clone())
            .with_platform(Platform::with_probe(Arc::new(NativeProbe::with_host(
                Architecture::Arm64,
            ))))
            .with_event_sender(tx)
            .build()
            .unwrap();

        engine.check(&f.bundle).await.unwrap();
        let entry_id = engine.get_log()[0].entry.id.to_string();
        drop(engine);

        let mut verdicts = 0;
        let mut steps = 0;
        while let Ok(message) = rx.try_recv() {
            match message.event {
                AppEvent::Engine(EngineEvent::VerdictComputed { verdict, .. }) => {
                    assert!(!verdict.is_compatible);
                    assert_eq!(message.meta.correlation_id.as_deref(), Some(entry_id.as_str()));
                    verdicts += 1;
                }
                AppEvent::Engine(EngineEvent::StepStarted { .. }) => {
                    assert_eq!(message.meta.correlation_id.as_deref(), Some(entry_id.as_str()));
                    steps += 1;
                }
                _ => {}
            }
        }
        assert_eq!(verdicts, 1);
        assert_eq!(steps, 3);
    }

    #[tokio::test]
    async fn test_journal_configured_log() {
        let mut f = fixture();
        let log_dir = f.dir.path().join("logs");
        f.config.log.journal = true;
        f.config.paths.log_dir = Some(log_dir.clone());

        let engine = engine_on(&f, Architecture::Arm64);
        engine.check(&f.bundle).await.unwrap();
        assert!(log_dir.join("operations.jsonl").is_file());

        let reopened = engine_on(&f, Architecture::Arm64);
        assert_eq!(reopened.get_log().len(), 1);
        assert!(reopened.get_log_text().contains("Check compatibility"));
    }

    #[test]
    fn test_operation_result_json() {
        let result = OperationResult::Stop(StopResponse { stopped: false });
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "Stop");
        assert_eq!(json["data"]["stopped"], false);
        assert!(!result.is_success());

        let state = OperationResult::Process(ProcessStatus {
            is_processing: true,
            state: OperationState::Running(OperationKind::Fix),
        });
        let json: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(json["data"]["state"]["state"], "running");
        assert_eq!(json["data"]["state"]["operation"], "fix");
    }
}
