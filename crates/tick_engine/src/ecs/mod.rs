//! Entity-Component-System implementation
//!
//! Entities own their components, scenes own their entities, and systems
//! read scenes through cached [`SystemQuery`]s. Everything runs on one
//! thread; shared handles are `Rc` based.

pub mod component;
pub mod components;
pub mod entity;
pub mod query;
pub mod scene;
pub mod scene_manager;
pub mod scheduler;
pub mod system;

pub use component::{AsAny, Capability, Component};
pub use entity::{Behavior, ComponentRegistry, Entity, EntityEvents, EntityId};
pub use query::{QueryEvents, QueryInvalidator, SystemQuery};
pub use scene::{Scene, SceneEvents, SceneHooks};
pub use scene_manager::{SceneManager, SceneManagerEvents};
pub use scheduler::{SystemPhase, SystemScheduler};
pub use system::{InitContext, System, SystemContext, SystemError};

#[cfg(test)]
mod tests;
