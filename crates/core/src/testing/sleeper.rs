//! Sleeper that records requested sleeps instead of waiting.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::debrid::Sleeper;

/// Records every requested sleep and returns immediately.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    sleeps: Arc<RwLock<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// All durations requested so far, in order.
    pub async fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.read().await.clone()
    }

    /// Total virtual time slept.
    pub async fn total(&self) -> Duration {
        self.sleeps.read().await.iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.write().await.push(duration);
        tokio::task::yield_now().await;
    }
}
