//! Engine construction

use archfix_config::Config;
use archfix_errors::Error;
use archfix_events::EventSender;
use archfix_oplog::OperationLog;
use archfix_platform::Platform;
use archfix_repository::BinaryRepository;

use crate::engine::CompatibilityEngine;

/// Builder for [`CompatibilityEngine`]
///
/// Every component is optional: the configuration defaults to
/// `Config::default()`, the platform to the native one, and the log to the
/// journal named by the configuration.
#[derive(Default)]
pub struct EngineBuilder {
    config: Option<Config>,
    platform: Option<Platform>,
    tx: Option<EventSender>,
    log: Option<OperationLog>,
}

impl EngineBuilder {
    /// Create new engine builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set platform (probe and filesystem implementations)
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Use an existing operation log instead of opening the journal
    #[must_use]
    pub fn with_log(mut self, log: OperationLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Build the engine
    ///
    /// # Errors
    ///
    /// Returns an error if the configured journal cannot be opened.
    pub fn build(self) -> Result<CompatibilityEngine, Error> {
        let config = self.config.unwrap_or_default();
        let platform = self.platform.unwrap_or_default();

        let log = match self.log {
            Some(log) => log,
            None => archfix_oplog::open_or_memory(
                config.journal_path().as_deref(),
                config.log.max_entries,
            )?,
        };

        let repository =
            BinaryRepository::new(platform, config.bundle.clone(), config.resources_dir());
        Ok(CompatibilityEngine::new(repository, log, self.tx))
    }
}
