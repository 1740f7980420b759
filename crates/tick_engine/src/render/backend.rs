//! Backend abstraction traits for the rendering system
//!
//! A backend mirrors the set of drawable entities and receives their
//! interpolated poses once per frame.

use super::RenderFrame;
use crate::ecs::components::{Pose, RenderableComponent};
use crate::ecs::EntityId;

/// Main rendering backend trait
pub trait RenderBackend {
    /// Entity became drawable; create whatever the backend needs for it
    fn attach(&mut self, entity: EntityId);

    /// Entity stopped being drawable; release its backend objects
    fn detach(&mut self, entity: EntityId);

    /// Place a drawable entity for the current frame
    fn draw(&mut self, entity: EntityId, pose: Pose, renderable: &RenderableComponent);

    /// Every entity of the frame was drawn
    fn present(&mut self, frame: &RenderFrame);
}
