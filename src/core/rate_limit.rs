//! 視覺模型呼叫之間的節奏控制
//!
//! 第一次呼叫不等待，之後每次呼叫至少間隔 `interval`，最後一次呼叫後不再等待

use crate::domain::ports::{RateLimit, RateLimiterKind};
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// 睡滿距上次呼叫剩餘的 `interval`
pub struct FixedInterval {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RateLimit for FixedInterval {
    async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                tracing::info!(
                    "⏳ Waiting {:?} before next model call",
                    ready_at - Instant::now()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

/// 每個 `interval` 一個許可、突發量為一的令牌桶
pub struct TokenBucket {
    limiter: Arc<DirectRateLimiter>,
}

impl TokenBucket {
    /// `interval` 為零時回傳 `None`（governor 無法表示）
    pub fn new(interval: Duration) -> Option<Self> {
        let quota = Quota::with_period(interval)?.allow_burst(NonZeroU32::MIN);
        Some(Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }
}

#[async_trait]
impl RateLimit for TokenBucket {
    async fn acquire(&self) {
        if self.limiter.check().is_err() {
            tracing::info!("⏳ Rate limit reached, waiting for next permit");
            self.limiter.until_ready().await;
        }
    }
}

pub struct Unlimited;

#[async_trait]
impl RateLimit for Unlimited {
    async fn acquire(&self) {}
}

pub fn build_rate_limiter(kind: RateLimiterKind, interval: Duration) -> Arc<dyn RateLimit> {
    if interval.is_zero() {
        tracing::debug!("Request interval is zero, model calls are not paced");
        return Arc::new(Unlimited);
    }

    match kind {
        RateLimiterKind::Fixed => Arc::new(FixedInterval::new(interval)),
        RateLimiterKind::TokenBucket => match TokenBucket::new(interval) {
            Some(bucket) => Arc::new(bucket),
            None => Arc::new(Unlimited),
        },
    }
}
