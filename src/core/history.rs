//! Execution trace recording.
//!
//! One [`TraceEntry`] is recorded per visited state, in visitation order,
//! whether or not the execution ultimately succeeds.

use super::error::ExecutionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Record of a single step.
///
/// `output` and `next_state` are set when the step succeeded; `error` is set
/// when it failed. A successful terminal step has no `next_state`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Name of the state as declared in the definition.
    pub state_name: String,
    /// The state's `Type`, e.g. `"Pass"`.
    pub state_type: String,
    /// Input the state received.
    pub input: Value,
    /// Output of a successful step.
    pub output: Option<Value>,
    /// Successor chosen by a successful, non-terminal step.
    pub next_state: Option<String>,
    /// Rendered error of a failed step.
    pub error: Option<String>,
    pub entered_at: DateTime<Utc>,
    /// Unset only while the step is still running.
    pub exited_at: Option<DateTime<Utc>>,
}

impl TraceEntry {
    /// Open an entry for a state that is about to run.
    pub fn open(state_name: impl Into<String>, state_type: impl Into<String>, input: Value) -> Self {
        Self {
            state_name: state_name.into(),
            state_type: state_type.into(),
            input,
            output: None,
            next_state: None,
            error: None,
            entered_at: Utc::now(),
            exited_at: None,
        }
    }

    /// Close the entry after the state produced `output`.
    pub fn complete(mut self, output: Value, next_state: Option<String>) -> Self {
        self.output = Some(output);
        self.next_state = next_state;
        self.exited_at = Some(Utc::now());
        self
    }

    /// Close the entry after the state failed.
    pub fn fail(mut self, error: &ExecutionError) -> Self {
        self.output = None;
        self.next_state = None;
        self.error = Some(error.to_string());
        self.exited_at = Some(Utc::now());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Ordered history of the steps taken during one execution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTrace {
    entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning the extended trace.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stepgraph::core::{ExecutionTrace, TraceEntry};
    /// use serde_json::json;
    ///
    /// let trace = ExecutionTrace::new()
    ///     .record(TraceEntry::open("First", "Pass", json!({})).complete(json!(1), Some("Second".into())))
    ///     .record(TraceEntry::open("Second", "Pass", json!(1)).complete(json!(1), None));
    ///
    /// assert_eq!(trace.path(), vec!["First", "Second"]);
    /// ```
    pub fn record(mut self, entry: TraceEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.last()
    }

    /// Names of the visited states, in order.
    pub fn path(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.state_name.as_str()).collect()
    }

    /// The entry that failed, if the execution failed at a state.
    pub fn failed_entry(&self) -> Option<&TraceEntry> {
        self.entries.iter().find(|e| e.is_error())
    }

    /// Time from entering the first state to leaving the last one.
    ///
    /// Returns `None` for an empty trace.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.entries.first()?, self.entries.last()?);
        let end = last.exited_at.unwrap_or(last.entered_at);
        end.signed_duration_since(first.entered_at).to_std().ok()
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a ExecutionTrace {
    type Item = &'a TraceEntry;
    type IntoIter = std::slice::Iter<'a, TraceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
