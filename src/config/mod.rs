//! Configuration models for the simulation epoch and named resources.

pub mod simulation;

pub use simulation::{QueueDiscipline, ResourceConfig, SimulationConfig};
