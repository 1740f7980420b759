//! Headless backend that records draw calls and reports them through `log`

use super::{RenderBackend, RenderFrame};
use crate::ecs::components::{Pose, RenderableComponent};
use crate::ecs::EntityId;
use indexmap::{IndexMap, IndexSet};

/// Render backend without a window
///
/// Keeps the last pose drawn for every attached entity, which makes it
/// useful for tests and for running a game headless.
#[derive(Debug, Default)]
pub struct LogBackend {
    attached: IndexSet<EntityId>,
    poses: IndexMap<EntityId, (Pose, String)>,
    draws: usize,
    presented: u64,
}

impl LogBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities currently attached
    pub fn attached(&self) -> &IndexSet<EntityId> {
        &self.attached
    }

    /// Last pose drawn for an entity
    pub fn pose(&self, entity: EntityId) -> Option<Pose> {
        self.poses.get(&entity).map(|(pose, _)| *pose)
    }

    /// Texture last drawn for an entity
    pub fn texture(&self, entity: EntityId) -> Option<&str> {
        self.poses.get(&entity).map(|(_, texture)| texture.as_str())
    }

    /// Number of presented frames
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl RenderBackend for LogBackend {
    fn attach(&mut self, entity: EntityId) {
        log::debug!("Attached sprite for entity {}", entity);
        self.attached.insert(entity);
    }

    fn detach(&mut self, entity: EntityId) {
        log::debug!("Detached sprite for entity {}", entity);
        self.attached.shift_remove(&entity);
        self.poses.shift_remove(&entity);
    }

    fn draw(&mut self, entity: EntityId, pose: Pose, renderable: &RenderableComponent) {
        if !self.attached.contains(&entity) {
            log::warn!("Drawing entity {} that was never attached", entity);
        }
        self.poses.insert(entity, (pose, renderable.texture.clone()));
        self.draws += 1;
    }

    fn present(&mut self, frame: &RenderFrame) {
        self.presented += 1;
        log::trace!(
            "Frame {}: {} sprite(s), alpha {:.3}",
            frame.frame,
            self.draws,
            frame.alpha
        );
        for (entity, (pose, texture)) in &self.poses {
            log::trace!(
                "  {} '{}' at ({:.2}, {:.2}) rot {:.2}",
                entity,
                texture,
                pose.position.x,
                pose.position.y,
                pose.rotation
            );
        }
        self.draws = 0;
    }
}
