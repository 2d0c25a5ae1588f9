//! Per-vendor request pacing
//!
//! Each upstream vendor gets one token bucket shared by every caller of that
//! vendor, so parallel fetches cannot exceed the vendor's quota.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

/// Token bucket guarding one upstream vendor
pub struct VendorLimiter {
    name: &'static str,
    limiter: DefaultDirectRateLimiter,
}

impl VendorLimiter {
    /// Creates a limiter replenishing `requests_per_second` tokens per second
    /// with a capacity of `burst` tokens
    pub fn new(name: &'static str, requests_per_second: f64, burst: u32) -> Self {
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let period = Duration::from_secs_f64(1.0 / requests_per_second.max(f64::EPSILON))
            .max(Duration::from_nanos(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        tracing::debug!(
            "Rate limiter for {}: one request every {:?}, burst {}",
            name,
            period,
            burst
        );

        Self {
            name,
            limiter: RateLimiter::direct(quota),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits until a request may be sent
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Takes a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for VendorLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorLimiter")
            .field("name", &self.name)
            .finish()
    }
}
