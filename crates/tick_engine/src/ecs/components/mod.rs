//! ECS Components module
//!
//! Components shipped with the engine

pub mod transform;
pub mod renderable;

pub use transform::{Pose, TransformComponent};
pub use renderable::RenderableComponent;
