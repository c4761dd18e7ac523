use crate::config::CodeConfig;
use crate::services::code_service::CodeService;
use std::time::Duration;
use time::OffsetDateTime;

/// Periodically evicts expired verification codes so the store's memory use
/// stays bounded by the issue rate within one TTL window. Eviction is
/// best-effort; redemption re-checks expiry on its own.
#[derive(Debug)]
pub struct CodeSweepWorker {
    codes: CodeService,
    config: CodeConfig,
}

impl CodeSweepWorker {
    #[must_use]
    pub const fn new(codes: CodeService, config: CodeConfig) -> Self {
        Self { codes, config }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.sweep_interval_secs));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => self.perform_sweep(),
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Code sweep loop shutting down...");
    }

    #[tracing::instrument(skip(self), fields(evicted = tracing::field::Empty))]
    fn perform_sweep(&self) {
        tracing::debug!("Running verification code sweep...");

        let evicted = self.codes.sweep_expired_at(OffsetDateTime::now_utc());
        if evicted > 0 {
            tracing::info!(count = %evicted, "Evicted expired verification codes");
            tracing::Span::current().record("evicted", evicted);
        }
    }
}
