//! Fixed-budget polling with an injectable sleeper.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::PollConfig;

/// Suspends between poll attempts. Tests swap in a recording sleeper.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// What a single probe observed.
#[derive(Debug)]
pub enum Probe<T> {
    Ready(T),
    Pending,
}

/// Final outcome of a poll loop.
#[derive(Debug)]
pub enum Polled<T> {
    Ready { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Runs a probe up to `attempts` times with a fixed sleep in between.
#[derive(Clone)]
pub struct Poller {
    attempts: u32,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl Poller {
    pub fn new(config: PollConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: PollConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            attempts: config.attempts.max(1),
            interval: config.interval(),
            sleeper,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Probe until it reports ready, errors, or the budget runs out.
    ///
    /// The probe receives the 1-based attempt number. No sleep follows the
    /// final attempt.
    pub async fn poll<T, E, F, Fut>(&self, mut probe: F) -> Result<Polled<T>, E>
    where
        F: FnMut(u32) -> Fut + Send,
        Fut: Future<Output = Result<Probe<T>, E>> + Send,
        T: Send,
    {
        for attempt in 1..=self.attempts {
            if let Probe::Ready(value) = probe(attempt).await? {
                return Ok(Polled::Ready {
                    value,
                    attempts: attempt,
                });
            }
            if attempt < self.attempts {
                self.sleeper.sleep(self.interval).await;
            }
        }
        Ok(Polled::Exhausted {
            attempts: self.attempts,
        })
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("attempts", &self.attempts)
            .field("interval", &self.interval)
            .finish()
    }
}
