//! Transform component for the ECS system
//!
//! Planar pose of an entity. The pose at the start of each tick is kept so
//! presentation can interpolate between the last two simulated states.

use crate::ecs::Component;
use crate::foundation::math::{lerp, lerp_angle, Vec2};
use crate::foundation::time::TickEvent;

/// Interpolated pose handed to render backends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World space position
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
}

/// ECS Transform component
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    /// World space position
    pub position: Vec2,

    /// Rotation in radians, counter-clockwise
    pub rotation: f32,

    previous_position: Vec2,
    previous_rotation: f32,
}

impl Component for TransformComponent {
    fn on_pre_update(&mut self, _tick: &TickEvent) {
        self.previous_position = self.position;
        self.previous_rotation = self.rotation;
    }
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self::from_position(Vec2::zeros())
    }
}

impl TransformComponent {
    /// Create from position only
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            previous_position: position,
            previous_rotation: 0.0,
        }
    }

    /// Create from position and rotation
    pub fn from_position_rotation(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation,
            previous_position: position,
            previous_rotation: rotation,
        }
    }

    /// Builder pattern: Set position
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self.previous_position = position;
        self
    }

    /// Builder pattern: Set rotation
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self.previous_rotation = rotation;
        self
    }

    /// Move by an offset
    pub fn translate(&mut self, offset: Vec2) {
        self.position += offset;
    }

    /// Move to a position without interpolating from the old one
    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
        self.previous_position = position;
    }

    /// Position at the start of the current tick
    pub fn previous_position(&self) -> Vec2 {
        self.previous_position
    }

    /// Rotation at the start of the current tick
    pub fn previous_rotation(&self) -> f32 {
        self.previous_rotation
    }

    /// Pose between the previous and current tick; `alpha` in `0..=1`
    pub fn interpolated(&self, alpha: f32) -> Pose {
        let alpha = alpha.clamp(0.0, 1.0);
        Pose {
            position: lerp(&self.previous_position, &self.position, alpha),
            rotation: lerp_angle(self.previous_rotation, self.rotation, alpha),
        }
    }

    /// Current pose
    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            rotation: self.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tick() -> TickEvent {
        TickEvent { delta: 1.0 / 60.0, elapsed: 1.0 / 60.0, tick: 1 }
    }

    #[test]
    fn test_pre_update_snapshots_pose() {
        let mut transform = TransformComponent::from_position(Vec2::new(1.0, 2.0));
        transform.translate(Vec2::new(3.0, 0.0));
        transform.on_pre_update(&tick());

        assert_eq!(transform.previous_position(), Vec2::new(4.0, 2.0));
    }

    #[test]
    fn test_interpolation_between_ticks() {
        let mut transform = TransformComponent::default();
        transform.on_pre_update(&tick());
        transform.translate(Vec2::new(10.0, 0.0));
        transform.rotation = 1.0;

        let pose = transform.interpolated(0.25);
        assert_relative_eq!(pose.position, Vec2::new(2.5, 0.0));
        assert_relative_eq!(pose.rotation, 0.25);

        assert_eq!(transform.interpolated(1.0), transform.pose());
        assert_eq!(transform.interpolated(7.0), transform.pose());
    }

    #[test]
    fn test_teleport_skips_interpolation() {
        let mut transform = TransformComponent::default();
        transform.teleport(Vec2::new(50.0, 50.0));
        assert_eq!(transform.interpolated(0.0).position, Vec2::new(50.0, 50.0));
    }
}
