use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
}

static EDGAR_RATE_LIMITER: OnceCell<RateLimiter> = OnceCell::new();

impl RateLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        RateLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.semaphore.acquire().await
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Shared limiter for SEC endpoints. The first caller fixes the permit count.
    pub fn edgar(max_concurrent: usize) -> &'static RateLimiter {
        EDGAR_RATE_LIMITER.get_or_init(|| RateLimiter::new(max_concurrent))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(10) // SEC allows 10 requests per second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_returned_on_drop() {
        let limiter = RateLimiter::new(2);
        {
            let _a = limiter.acquire().await.unwrap();
            let _b = limiter.acquire().await.unwrap();
            assert_eq!(limiter.available(), 0);
        }
        assert_eq!(limiter.available(), 2);
    }
}
