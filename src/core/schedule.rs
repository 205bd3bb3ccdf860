//! Delays as scheduling directives.
//!
//! `Wait` states never sleep themselves. They return a [`Delay`] and the
//! execution loop hands it to a [`WaitScheduler`], which decides how the
//! delay is honored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// How long an execution should pause before its next step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Delay {
    /// Pause for a fixed duration.
    For(Duration),
    /// Pause until a point in time. Past instants mean no pause.
    Until(DateTime<Utc>),
}

impl Delay {
    /// Time left to wait, measured from `now`.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Self::For(duration) => *duration,
            Self::Until(instant) => instant
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(Duration::ZERO),
        }
    }
}

/// Honors delays on behalf of the execution loop.
///
/// Implementations must not block a thread; the loop races `wait` against
/// cancellation, so dropping the returned future must abandon the wait.
#[async_trait]
pub trait WaitScheduler: Send + Sync + Debug {
    async fn wait(&self, delay: &Delay);
}
