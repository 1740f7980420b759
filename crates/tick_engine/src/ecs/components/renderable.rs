//! Renderable component for entities that can be rendered
//!
//! Marks an entity as drawable and names the texture resource to draw it
//! with. Together with a transform it makes the entity visible to the render
//! system.

use crate::ecs::Component;

/// Component for entities that can be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableComponent {
    /// Name of the texture resource
    pub texture: String,

    /// Whether this object is visible
    pub visible: bool,

    /// Rendering layer for sorting (higher values render later)
    pub render_layer: u8,
}

impl Component for RenderableComponent {}

impl RenderableComponent {
    /// Create a new visible renderable component
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            visible: true,
            render_layer: 0,
        }
    }

    /// Builder pattern: Set render layer
    pub fn with_layer(mut self, render_layer: u8) -> Self {
        self.render_layer = render_layer;
        self
    }

    /// Set visibility
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Check if this component should be rendered
    pub fn should_render(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_renderable_is_skipped() {
        let mut renderable = RenderableComponent::new("bunny.png").with_layer(3);
        assert!(renderable.should_render());
        assert_eq!(renderable.render_layer, 3);

        renderable.set_visible(false);
        assert!(!renderable.should_render());
    }
}
