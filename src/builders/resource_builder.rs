//! Builders to construct named resources from configuration.

use std::collections::BTreeMap;

use crate::config::{QueueDiscipline, ResourceConfig, SimulationConfig};
use crate::core::{Environment, SimError, SimResult};
use crate::resources::{PreemptiveResource, PriorityResource, Request, Resource, ResourceId};

/// A resource of any discipline built from configuration.
#[derive(Debug, Clone)]
pub enum ResourceHandle {
    /// FIFO resource.
    Fifo(Resource),
    /// Priority resource.
    Priority(PriorityResource),
    /// Preemptive resource.
    Preemptive(PreemptiveResource),
}

impl ResourceHandle {
    /// Build one resource from its configuration.
    pub fn build(env: &Environment, cfg: &ResourceConfig) -> SimResult<Self> {
        cfg.validate().map_err(SimError::InvalidConfig)?;
        let handle = match (cfg.discipline, cfg.max_queue_depth) {
            (QueueDiscipline::Fifo, None) => Self::Fifo(Resource::new(env, cfg.capacity)?),
            (QueueDiscipline::Fifo, Some(d)) => {
                Self::Fifo(Resource::with_max_queue_depth(env, cfg.capacity, d)?)
            }
            (QueueDiscipline::Priority, None) => Self::Priority(PriorityResource::new(env, cfg.capacity)?),
            (QueueDiscipline::Priority, Some(d)) => {
                Self::Priority(PriorityResource::with_max_queue_depth(env, cfg.capacity, d)?)
            }
            (QueueDiscipline::Preemptive, None) => {
                Self::Preemptive(PreemptiveResource::new(env, cfg.capacity)?)
            }
            (QueueDiscipline::Preemptive, Some(d)) => {
                Self::Preemptive(PreemptiveResource::with_max_queue_depth(env, cfg.capacity, d)?)
            }
        };
        Ok(handle)
    }

    /// The configured discipline.
    #[must_use]
    pub const fn discipline(&self) -> QueueDiscipline {
        match self {
            Self::Fifo(_) => QueueDiscipline::Fifo,
            Self::Priority(_) => QueueDiscipline::Priority,
            Self::Preemptive(_) => QueueDiscipline::Preemptive,
        }
    }

    /// Request a slot. The priority is ignored by FIFO resources.
    pub fn request(&self, priority: i64, preempt: bool) -> SimResult<Request> {
        match self {
            Self::Fifo(r) => r.request(),
            Self::Priority(r) => r.request_with(priority, preempt),
            Self::Preemptive(r) => r.request_with(priority, preempt),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match self {
            Self::Fifo(r) => r.capacity(),
            Self::Priority(r) => r.capacity(),
            Self::Preemptive(r) => r.capacity(),
        }
    }

    /// Number of slots in use.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Fifo(r) => r.count(),
            Self::Priority(r) => r.count(),
            Self::Preemptive(r) => r.count(),
        }
    }

    /// The resource identifier.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        match self {
            Self::Fifo(r) => r.id(),
            Self::Priority(r) => r.id(),
            Self::Preemptive(r) => r.id(),
        }
    }
}

/// Build every resource named in `cfg` inside `env`.
pub fn build_resources(
    env: &Environment,
    cfg: &SimulationConfig,
) -> SimResult<BTreeMap<String, ResourceHandle>> {
    cfg.validate()
        .map_err(|e| SimError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut resources = BTreeMap::new();
    for (name, resource_cfg) in &cfg.resources {
        let handle = ResourceHandle::build(env, resource_cfg)?;
        tracing::info!("built resource {} ({:?}, capacity {})", name, handle.discipline(), handle.capacity());
        resources.insert(name.clone(), handle);
    }

    Ok(resources)
}
