use crate::config::CodeConfig;
use crate::domain::code::CodeEntry;
use crate::error::{AppError, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use opentelemetry::{KeyValue, global, metrics::Counter};
use rand::Rng;
use std::sync::Arc;
use time::OffsetDateTime;

/// Re-rolls before a live collision is overwritten. With a 10^6 keyspace and
/// a 600 s validity window this bound is never reached in practice.
const GENERATE_ATTEMPTS: u32 = 8;

#[derive(Clone, Debug)]
struct Metrics {
    issued_total: Counter<u64>,
    redemptions_total: Counter<u64>,
    swept_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("waypost-server");
        Self {
            issued_total: meter
                .u64_counter("waypost_codes_issued_total")
                .with_description("Total verification codes issued")
                .build(),
            redemptions_total: meter
                .u64_counter("waypost_code_redemptions_total")
                .with_description("Verification code redemption attempts by outcome")
                .build(),
            swept_total: meter
                .u64_counter("waypost_codes_swept_total")
                .with_description("Expired verification codes evicted by the sweeper")
                .build(),
        }
    }
}

/// In-memory store of single-use verification codes.
///
/// The map is the only shared mutable state in the message pipeline. Redeeming
/// a code must be at-most-once under arbitrary concurrency, so the
/// used/expired checks and the mark happen under the entry's shard write
/// guard; see [`Self::verify_at`].
#[derive(Clone, Debug)]
pub struct CodeService {
    codes: Arc<DashMap<String, CodeEntry>>,
    ttl: time::Duration,
    metrics: Metrics,
}

impl CodeService {
    #[must_use]
    pub fn new(config: &CodeConfig) -> Self {
        Self {
            codes: Arc::new(DashMap::new()),
            ttl: time::Duration::seconds(i64::try_from(config.ttl_secs).unwrap_or(600)),
            metrics: Metrics::new(),
        }
    }

    /// Issues a fresh 6-digit code for `open_id` and stores it with the
    /// configured TTL. Never fails.
    #[must_use]
    pub fn generate(&self, open_id: &str) -> String {
        self.generate_at(open_id, OffsetDateTime::now_utc())
    }

    /// Clock-injected variant of [`Self::generate`].
    ///
    /// Candidates colliding with a live entry are re-rolled; dead entries
    /// (used or expired) are overwritten on first touch. After
    /// `GENERATE_ATTEMPTS` live collisions the last candidate overwrites
    /// anyway so that generation never blocks or errors.
    #[must_use]
    pub fn generate_at(&self, open_id: &str, now: OffsetDateTime) -> String {
        let mut rng = rand::thread_rng();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let code = format!("{:06}", rng.gen_range(0..1_000_000));

            match self.codes.entry(code.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(CodeEntry::issued_to(open_id.to_string(), now, self.ttl));
                }
                Entry::Occupied(mut slot) => {
                    if slot.get().is_live_at(now) && attempt < GENERATE_ATTEMPTS {
                        continue;
                    }
                    if slot.get().is_live_at(now) {
                        tracing::warn!("Exhausted code generation attempts; overwriting a live code");
                    }
                    slot.insert(CodeEntry::issued_to(open_id.to_string(), now, self.ttl));
                }
            }

            self.metrics.issued_total.add(1, &[]);
            tracing::debug!(ttl_secs = self.ttl.whole_seconds(), "Issued verification code");
            return code;
        }
    }

    /// Redeems a code, returning the open id it was issued to.
    ///
    /// # Errors
    /// Returns `CodeNotFound`, `CodeAlreadyUsed`, or `CodeExpired`; the three
    /// are never conflated. An expired entry is evicted on the way out.
    pub fn verify(&self, code: &str) -> Result<String> {
        self.verify_at(code, OffsetDateTime::now_utc())
    }

    /// Clock-injected variant of [`Self::verify`].
    pub fn verify_at(&self, code: &str, now: OffsetDateTime) -> Result<String> {
        {
            // The shard write guard makes check-not-used, check-not-expired,
            // and mark-used one atomic step: concurrent verifies on the same
            // code serialize here, so at most one of them ever succeeds.
            let Some(mut entry) = self.codes.get_mut(code) else {
                self.record_redemption("not_found");
                return Err(AppError::CodeNotFound);
            };

            if entry.used {
                self.record_redemption("already_used");
                return Err(AppError::CodeAlreadyUsed);
            }

            if !entry.is_expired_at(now) {
                entry.used = true;
                self.record_redemption("success");
                return Ok(entry.open_id.clone());
            }
        }

        // Guard dropped above; removing while holding it would deadlock on
        // the shard lock.
        self.codes.remove(code);
        self.record_redemption("expired");
        Err(AppError::CodeExpired)
    }

    /// Evicts every expired entry, used or not. Best-effort: `verify`
    /// re-checks expiry independently, the sweep only bounds memory growth.
    pub fn sweep_expired_at(&self, now: OffsetDateTime) -> usize {
        let before = self.codes.len();
        self.codes.retain(|_, entry| !entry.is_expired_at(now));
        let evicted = before.saturating_sub(self.codes.len());

        if evicted > 0 {
            self.metrics.swept_total.add(evicted as u64, &[]);
        }
        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    fn record_redemption(&self, status: &'static str) {
        self.metrics.redemptions_total.add(1, &[KeyValue::new("status", status)]);
    }
}
