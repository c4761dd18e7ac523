use time::OffsetDateTime;

/// A single issued verification code, owned exclusively by the code store.
#[derive(Debug, Clone)]
pub struct CodeEntry {
    pub(crate) open_id: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) expires_at: OffsetDateTime,
    pub(crate) used: bool,
}

impl CodeEntry {
    #[must_use]
    pub(crate) fn issued_to(open_id: String, now: OffsetDateTime, ttl: time::Duration) -> Self {
        Self { open_id, created_at: now, expires_at: now + ttl, used: false }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at < now
    }

    /// True while the entry can still be redeemed. Used or expired entries
    /// are dead keys and may be overwritten by generation.
    #[must_use]
    pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
        !self.used && !self.is_expired_at(now)
    }
}
