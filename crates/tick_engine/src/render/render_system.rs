//! Render system: interpolated poses of drawable entities to a backend

use super::{RenderBackend, RenderFrame};
use crate::ecs::components::{RenderableComponent, TransformComponent};
use crate::ecs::{Component, EntityId, InitContext, Scene, System, SystemContext, SystemError, SystemQuery};
use indexmap::IndexSet;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

/// Draws every entity with a transform and a renderable component
///
/// Backend membership follows the system query: entities entering the query
/// are attached, entities leaving it are detached.
pub struct RenderSystem<B: RenderBackend> {
    backend: Rc<RefCell<B>>,
}

impl<B: RenderBackend + 'static> RenderSystem<B> {
    /// Create a render system driving `backend`
    pub fn new(backend: B) -> Self {
        Self {
            backend: Rc::new(RefCell::new(backend)),
        }
    }

    /// Borrow the backend
    pub fn backend(&self) -> Ref<'_, B> {
        self.backend.borrow()
    }

    /// Borrow the backend mutably
    pub fn backend_mut(&self) -> RefMut<'_, B> {
        self.backend.borrow_mut()
    }
}

impl<B: RenderBackend + 'static> System for RenderSystem<B> {
    fn name(&self) -> &str {
        "RenderSystem"
    }

    fn query(&self) -> SystemQuery {
        SystemQuery::with([TransformComponent::capability(), RenderableComponent::capability()])
    }

    fn init(&mut self, ctx: InitContext<'_>) -> Result<(), SystemError> {
        let backend = Rc::clone(&self.backend);
        ctx.query
            .events_mut()
            .entity_added
            .on(move |id| backend.borrow_mut().attach(*id));

        let backend = Rc::clone(&self.backend);
        ctx.query
            .events_mut()
            .entity_removed
            .on(move |id| backend.borrow_mut().detach(*id));

        Ok(())
    }

    fn update(&mut self, _ctx: &mut SystemContext<'_>) {}

    fn render(&mut self, frame: &RenderFrame, entities: &IndexSet<EntityId>, scene: &Scene) {
        let mut visible: Vec<_> = entities
            .iter()
            .filter_map(|id| {
                let entity = scene.get(*id)?;
                let transform = entity.get::<TransformComponent>()?;
                let renderable = entity.get::<RenderableComponent>()?;
                renderable
                    .should_render()
                    .then(|| (*id, transform.interpolated(frame.alpha), renderable))
            })
            .collect();
        visible.sort_by_key(|(_, _, renderable)| renderable.render_layer);

        let mut backend = self.backend.borrow_mut();
        for (id, pose, renderable) in visible {
            backend.draw(id, pose, renderable);
        }
        backend.present(frame);
    }
}
