//! Builders constructing simulation objects from configuration.

pub mod resource_builder;

pub use resource_builder::{build_resources, ResourceHandle};
