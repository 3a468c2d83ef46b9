//! Request boundary: payload cap, per-client token buckets and PII redaction.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Instant;

use regex::{Captures, Regex};
use tracing::warn;

use crate::ServiceError;

/// Client key used when the transport cannot name the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";
const BURST_FACTOR: f64 = 3.0;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});
static DIGIT_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid digit run regex"));
const NPI_DIGITS: usize = 10;

/// Replace email addresses and 10-digit NPI-like runs.
pub fn redact(text: &str) -> Cow<'_, str> {
    match EMAIL_RE.replace_all(text, "[REDACTED_EMAIL]") {
        Cow::Borrowed(_) => redact_npi(text),
        Cow::Owned(s) => Cow::Owned(redact_npi(&s).into_owned()),
    }
}

/// A run counts when exactly ten ASCII digits sit between non-digits,
/// whatever letters or underscores surround it.
fn redact_npi(text: &str) -> Cow<'_, str> {
    if !DIGIT_RUN_RE.find_iter(text).any(|m| m.len() == NPI_DIGITS) {
        return Cow::Borrowed(text);
    }
    DIGIT_RUN_RE.replace_all(text, |caps: &Captures| {
        let run = &caps[0];
        if run.len() == NPI_DIGITS {
            "[REDACTED_NPI]".to_string()
        } else {
            run.to_string()
        }
    })
}

/// Rejects bodies larger than `limit` bytes before anything parses them.
#[derive(Debug, Clone, Copy)]
pub struct PayloadCap {
    limit: usize,
}

impl PayloadCap {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn check(&self, body: &[u8]) -> Result<(), ServiceError> {
        if body.len() > self.limit {
            warn!(size = body.len(), limit = self.limit, "payload rejected");
            return Err(ServiceError::PayloadTooLarge {
                size: body.len(),
                limit: self.limit,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Token bucket per client: capacity is three seconds' worth of tokens and
/// refill is continuous. A client seen for the first time starts full.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(rate_per_sec: f64) -> Self {
        let rate = rate_per_sec.max(0.0);
        Self {
            rate,
            capacity: (BURST_FACTOR * rate).ceil(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn check(&self, client: &str) -> Result<(), ServiceError> {
        self.check_at(client, Instant::now())
    }

    /// Take one token for `client` as of `now`.
    pub fn check_at(&self, client: &str, now: Instant) -> Result<(), ServiceError> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets.entry(client.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
        bucket.last = now;

        if bucket.tokens < 1.0 {
            warn!(client, "rate limited");
            return Err(ServiceError::RateLimited {
                client: client.to_string(),
            });
        }
        bucket.tokens -= 1.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn redacts_email_and_npi() {
        let line = "claim C1 npi=1234567890 contact test@example.com";
        let out = redact(line);
        assert_eq!(out, "claim C1 npi=[REDACTED_NPI] contact [REDACTED_EMAIL]");
    }

    #[test]
    fn leaves_other_numbers_alone() {
        assert!(matches!(redact("cpt 97012 units 1"), Cow::Borrowed(_)));
        assert_eq!(redact("id 12345678901"), "id 12345678901");
    }

    #[test]
    fn redacts_npi_glued_to_word_characters() {
        assert_eq!(redact("npi_1234567890"), "npi_[REDACTED_NPI]");
        assert_eq!(redact("NPI1234567890x"), "NPI[REDACTED_NPI]x");
        assert_eq!(
            redact("1234567890 1234567890,12345678901"),
            "[REDACTED_NPI] [REDACTED_NPI],12345678901"
        );
    }

    #[test]
    fn payload_at_limit_passes() {
        let cap = PayloadCap::new(4);
        assert!(cap.check(b"1234").is_ok());
        assert!(matches!(
            cap.check(b"12345"),
            Err(ServiceError::PayloadTooLarge { size: 5, limit: 4 })
        ));
    }

    #[test]
    fn burst_then_reject() {
        let limiter = RateLimiter::new(1.0);
        assert_eq!(limiter.capacity(), 3.0);
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("a", t0).is_ok());
        }
        assert!(matches!(
            limiter.check_at("a", t0),
            Err(ServiceError::RateLimited { .. })
        ));
        // Other clients have their own bucket.
        assert!(limiter.check_at("b", t0).is_ok());
    }

    #[test]
    fn refills_with_elapsed_time() {
        let limiter = RateLimiter::new(2.0);
        let t0 = Instant::now();
        for _ in 0..6 {
            limiter.check_at("a", t0).unwrap();
        }
        assert!(limiter.check_at("a", t0).is_err());
        assert!(limiter.check_at("a", t0 + Duration::from_millis(500)).is_ok());
        assert!(limiter.check_at("a", t0 + Duration::from_millis(500)).is_err());
    }

    #[test]
    fn fractional_rate_rounds_capacity_up() {
        assert_eq!(RateLimiter::new(0.5).capacity(), 2.0);
    }

    #[test]
    fn concurrent_checks_never_overspend() {
        let limiter = Arc::new(RateLimiter::new(10.0));
        let t0 = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..10).filter(|_| limiter.check_at("same", t0).is_ok()).count()
                })
            })
            .collect();
        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 30);
    }
}
