//! Named state machines shared by a process.
//!
//! Entries are created on first registration of a name and replaced
//! wholesale on re-registration; nothing is deleted implicitly. Replacing an
//! entry swaps the handle, so executions already running keep the machine
//! they started with.

use super::interpreter::Interpreter;
use super::machine::MachineHandle;
use crate::definition::{Definition, DefinitionError};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Errors from registry lookups and loads.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("state machine '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Process-wide table of named state machines.
#[derive(Debug, Default)]
pub struct MachineRegistry {
    machines: RwLock<HashMap<String, MachineHandle>>,
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `name`, returning the handle it replaced.
    pub async fn register(
        &self,
        name: impl Into<String>,
        handle: MachineHandle,
    ) -> Option<MachineHandle> {
        let name = name.into();
        let previous = self.machines.write().await.insert(name.clone(), handle);
        info!(machine = %name, replaced = previous.is_some(), "machine_registered");
        previous
    }

    /// Load `raw` and register it under its definition name.
    ///
    /// The definition is fully loaded before the table is touched, so a
    /// failed load leaves any existing entry in place.
    pub async fn load(
        &self,
        interpreter: &Interpreter,
        raw: &Value,
    ) -> Result<String, RegistryError> {
        let handle = interpreter.load_definition(raw)?;
        let name = handle.name().to_string();
        self.register(name.clone(), handle).await;
        Ok(name)
    }

    /// Load `raw` and register it under an explicit name.
    pub async fn load_as(
        &self,
        interpreter: &Interpreter,
        name: impl Into<String>,
        raw: &Value,
    ) -> Result<MachineHandle, RegistryError> {
        let handle = interpreter.load_definition(raw)?;
        self.register(name, handle.clone()).await;
        Ok(handle)
    }

    pub async fn get(&self, name: &str) -> Result<MachineHandle, RegistryError> {
        self.machines
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Registered names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.machines.read().await.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Definition registered under `name`, for diagnostics.
    pub async fn definition(&self, name: &str) -> Result<Definition, RegistryError> {
        Ok(self.get(name).await?.machine().definition().clone())
    }
}
