//! Asset management system
//!
//! Named resources loaded asynchronously before the simulation starts.

pub mod resource_manager;

pub use resource_manager::{LoadFuture, LoadState, Resource, ResourceError, Resources};
