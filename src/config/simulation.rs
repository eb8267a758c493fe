//! Simulation and resource configuration structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Admission discipline of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueDiscipline {
    /// First come, first served.
    #[default]
    Fifo,
    /// Waiting requests ordered by priority.
    Priority,
    /// Priority ordering plus eviction of less important users.
    Preemptive,
}

/// Resource configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Number of slots.
    pub capacity: usize,
    /// Admission discipline.
    #[serde(default)]
    pub discipline: QueueDiscipline,
    /// Maximum number of waiting requests before rejection.
    #[serde(default)]
    pub max_queue_depth: Option<usize>,
}

/// Root simulation configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Clock value at start.
    #[serde(default)]
    pub initial_time: f64,
    /// Map of resource name to configuration.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceConfig {
    /// Validate resource configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        if self.max_queue_depth == Some(0) {
            return Err("max_queue_depth must be greater than 0".into());
        }
        Ok(())
    }
}

impl SimulationConfig {
    /// Validate the epoch and every resource.
    pub fn validate(&self) -> Result<(), String> {
        if !self.initial_time.is_finite() {
            return Err(format!("initial_time must be finite, got {}", self.initial_time));
        }
        for (name, resource) in &self.resources {
            resource
                .validate()
                .map_err(|e| format!("resource `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse simulation configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
