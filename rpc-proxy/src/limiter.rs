use crate::config::RateLimitConfig;
use crate::metrics::Metrics;
use crate::{Error, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

/// Token bucket that paces every request sent to the upstream rpc.
///
/// Hands out at most `capacity` tokens in any rolling 60 second window. The
/// bucket starts full and refills one token per `60s / capacity`, which on its
/// own would allow a full bucket plus a minute of refills inside one window, so
/// a token is also held back until the token taken `capacity` grants earlier
/// is a full window old.
///
/// The bucket lives behind a fair async mutex that is held while a caller waits
/// for the next token, so waiters are served in arrival order and the refill
/// and take of one caller can't interleave with another's.
pub struct RateLimiter {
    capacity: u64,
    bucket: Mutex<TokenBucket>,
    metrics: Arc<Metrics>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimitConfig, metrics: Arc<Metrics>) -> Result<Self> {
        let capacity = (cfg.max_requests_per_minute.get() as f64 * cfg.safety_margin).floor();

        // also rejects NaN
        if !(capacity >= 1.0) {
            return Err(Error::InvalidRateLimit {
                max_requests_per_minute: cfg.max_requests_per_minute.get(),
                safety_margin: cfg.safety_margin,
            });
        }

        let bucket = TokenBucket::new(capacity as u64, Instant::now());
        log::info!(
            "rate limiting upstream to {} requests per minute, one token every {:?}",
            bucket.capacity,
            bucket.refill_interval
        );

        Ok(Self {
            capacity: bucket.capacity,
            bucket: Mutex::new(bucket),
            metrics,
        })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Waits until a token is available and consumes it.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        let mut waited = false;

        loop {
            let wait = match bucket.tr#[derive(Debug)]
struct TokenBucket {
    capacity: u64,
    tokens: u64,
    last_refill: Instant,
    refill_interval: Duration,
    /// Instants of the tokens taken in the last window, oldest first.
    taken: VecDeque<Instant>,
}

impl TokenBucket {
    fn new(capacity: u64, now: Instant) -> Self {
        let interval_nanos = (WINDOW.as_nanos() / u128::from(capacity)).max(1);

        Self {
            capacity,
            tokens: capacity,
            last_refill: now,
            refill_interval: Duration::from_nanos(interval_nanos as u64),
            taken: VecDeque::new(),
        }
    }

    /// Adds a token per whole interval elapsed. The fraction of an interval that
    /// didn't mint a token yet is carried over to the next refill.
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_nanos();
        let interval = self.refill_interval.as_nanos();
        let minted = elapsed / interval;

        if minted == 0 {
            return;
        }

        let missing = self.capacity - self.tokens;
        self.tokens += u64::try_from(minted).unwrap_or(u64::MAX).min(missing);
        self.last_refill = now - Duration::from_nanos((elapsed % interval) as u64);
    }

    /// How long until the oldest token in the window leaves it, zero if the
    /// window has room.
    fn window_wait(&mut self, now: Instant) -> Duration {
        while let Some(&oldest) = self.taken.front() {
            if oldest + WINDOW > now {
                break;
            }
            self.taken.pop_front();
        }

        match self.taken.front() {
            Some(&oldest) if self.taken.len() as u64 >= self.capacity => {
                (oldest + WINDOW).saturating_duration_since(now)
            }
            _ => Duration::ZERO,
        }
    }

    /// Takes a token or returns how long to wait before trying again.
    fn try_take(&mut self, now: Instant) -> std::result::Result<(), Duration> {
        self.refill(now);
        let window_wait = self.window_wait(now);

        if self.tokens > 0 && window_wait.is_zero() {
            self.tokens -= 1;
            self.taken.push_back(now);
            return Ok(());
        }

        let bucket_wait = if self.tokens > 0 {
            Duration::ZERO
        } else {
            let since_refill = now.saturating_duration_since(self.last_refill);
            self.refill_interval.saturating_sub(since_refill)
        };

        Err(bucket_wait.max(window_wait))
    }
}

l the next one is minted.
    fn try_take(&mut self, now: Instant) -> std::result::Result<(), Duration> {
        self.refill(now);

        if self.tokens > 0 {
            self.tokens -= 1;
            return Ok(());
        }

        let since_refill = now.saturating_duration_since(self.last_refill);
        Err(self.refill_interval.saturating_sub(since_refill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU64;

    fn limiter(max_requests_per_minute: u64) -> RateLimiter {
        let cfg = RateLimitConfig {
            max_requests_per_minute: NonZeroU64::new(max_requests_per_minute).unwrap(),
            safety_margin: 0.9,
        };
        RateLimiter::new(cfg, Arc::new(Metrics::new())).unwrap()
    }

    #[test]
    fn test_capacity() {
        let now = Instant::now();
        let bucket = TokenBucket::new(1800, now);
        assert_eq!(bucket.tokens, 1800);
        assert_eq!(bucket.refill_interval, Duration::from_nanos(33_333_333));

        assert_eq!(limiter(2000).capacity(), 1800);
        assert_eq!(limiter(10).capacity(), 9);
        assert_eq!(limiter(2).capacity(), 1);
    }

    #[test]
    fn test_no_capacity_rejected() {
        for (rpm, margin) in [(1, 0.9), (2000, 0.0), (2000, -1.0), (2000, f64::NAN)] {
            let cfg = RateLimitConfig {
                max_requests_per_minute: NonZeroU64::new(rpm).unwrap(),
                safety_margin: margin,
            };
            assert!(matches!(
                RateLimiter::new(cfg, Arc::new(Metrics::new())),
                Err(Error::InvalidRateLimit { .. })
            ));
        }
    }

    #[test]
    fn test_refill_carries_remainder() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(6, start);
        let interval = bucket.refill_interval;
        assert_eq!(interval, Duration::from_secs(10));

        bucket.tokens = 0;
        assert_eq!(bucket.try_take(start), Err(interval));

        // one and a half intervals mint a single token
        let now = start + interval + interval / 2;
        bucket.refill(now);
        assert_eq!(bucket.tokens, 1);
        assert_eq!(bucket.last_refill, start + interval);

        // the carried half interval completes the next token
        bucket.refill(start + interval * 2);
        assert_eq!(bucket.tokens, 2);
    }

    #[test]
    fn test_refill_is_capped() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(6, start);
        bucket.try_take(start).unwrap();

        bucket.refill(start + Duration::from_secs(3600));
        assert_eq!(bucket.tokens, 6);
        assert!(bucket.last_refill <= start + Duration::from_secs(3600));
    }

    #[test]
    fn test_bucket_wait() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(6, start);
        let interval = bucket.refill_interval;

        bucket.try_take(start).unwrap();
        bucket.tokens = 0;

        // window has room, the next token is what's missing
        assert_eq!(bucket.try_take(start + interval / 2), Err(interval / 2));
        bucket.try_take(start + interval).unwrap();
    }

    #[test]
    fn test_window_wait() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(6, start);

        for _ in 0..6 {
            bucket.try_take(start).unwrap();
        }
        assert_eq!(bucket.try_take(start), Err(WINDOW));

        // three tokens were minted but the window is still full
        let now = start + Duration::from_secs(30);
        assert_eq!(bucket.try_take(now), Err(Duration::from_secs(30)));
        assert_eq!(bucket.tokens, 3);

        let now = start + WINDOW;
        for _ in 0..6 {
            bucket.try_take(now).unwrap();
        }
        assert_eq!(bucket.try_take(now), Err(WINDOW));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_window() {
        let limiter = limiter(10);
        let start = Instant::now();

        for _ in 0..9 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= WINDOW, "{elapsed:?}");
        assert!(elapsed <= WINDOW + Duration::from_millis(1), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rolling_window_holds_capacity() {
        let limiter = limiter(10);
        let capacity = 9;
        let start = Instant::now();

        let mut times = Vec::new();
        while start.elapsed() < WINDOW * 5 {
            limiter.acquire().await;
            times.push(Instant::now());

            // uneven gaps between callers
            if times.len() % 4 == 1 {
                tokio::time::sleep(Duration::from_millis(2500 * (times.len() % 7) as u64)).await;
            }
        }

        let first_window = times.iter().filter(|t| **t < start + WINDOW).count();
        assert_eq!(first_window, capacity);

        // any window holding `capacity + 1` tokens spans two of them `capacity` apart
        for pair in times.windows(capacity + 1) {
            let span = pair[capacity].duration_since(pair[0]);
            assert!(span >= WINDOW, "{} tokens within {:?}", capacity + 1, span);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquire_never_overshoots() {
        let limiter = Arc::new(limiter(10));
        let capacity = 9;
        let interval = Duration::from_nanos(60_000_000_000 / 9);
        let start = Instant::now();

        let tasks = (0..40)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect::<Vec<_>>();

        let mut times = Vec::new();
        for task in tasks {
            times.push(task.await.unwrap());
        }
        times.sort();

        for (i, time) in times.iter().enumerate() {
            let elapsed = time.duration_since(start);
            let allowed = capacity + (elapsed.as_nanos() / interval.as_nanos()) as usize;
            assert!(i + 1 <= allowed, "token {} handed out after {:?}", i + 1, elapsed);
        }
        for pair in times.windows(capacity + 1) {
            assert!(pair[capacity].duration_since(pair[0]) >= WINDOW);
        }

        // four full windows before the last 4 tokens
        assert!(times.last().unwrap().duration_since(start) >= WINDOW * 4);
    }
}
