//! Wait schedulers.

use crate::core::{Delay, WaitScheduler};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use tracing::debug;

/// Honors delays with the tokio timer. No thread is held while waiting.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

#[async_trait]
impl WaitScheduler for TokioScheduler {
    async fn wait(&self, delay: &Delay) {
        let remaining = delay.remaining(Utc::now());
        debug!(remaining_ms = remaining.as_millis() as u64, "wait_scheduled");
        tokio::time::sleep(remaining).await;
    }
}

/// Records delays and returns immediately.
///
/// Useful for tests and dry runs where the shape of an execution matters
/// more than its timing.
#[derive(Debug, Default)]
pub struct ImmediateScheduler {
    recorded: Mutex<Vec<Delay>>,
}

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in order.
    pub fn recorded(&self) -> Vec<Delay> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl WaitScheduler for ImmediateScheduler {
    async fn wait(&self, delay: &Delay) {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(delay.clone());
    }
}
