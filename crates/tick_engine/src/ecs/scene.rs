//! Scene: the live entity set of one simulation context

use super::entity::{Entity, EntityId};
use super::query::QueryInvalidator;
use super::scheduler::SystemPhase;
use crate::events::EventEmitter;
use crate::foundation::time::TickEvent;
use slotmap::{new_key_type, SlotMap};
use std::collections::HashMap;
use std::fmt;

new_key_type! {
    /// Storage slot of an entity inside its scene
    struct EntitySlot;
}

/// Hooks run by the scene manager around a scene's activation
pub trait SceneHooks {
    /// Called each time the scene becomes the active scene
    fn on_start(&mut self, scene: &mut Scene);
}

impl<F> SceneHooks for F
where
    F: FnMut(&mut Scene),
{
    fn on_start(&mut self, scene: &mut Scene) {
        self(scene);
    }
}

/// Events published by a scene
#[derive(Debug, Default)]
pub struct SceneEvents {
    /// Entity attached to the scene
    pub entity_added: EventEmitter<EntityId>,
    /// Entity detached from the scene
    pub entity_removed: EventEmitter<EntityId>,
}

/// Owner of a set of entities
///
/// Every membership change marks all queries sharing the scene's
/// [`QueryInvalidator`] stale. Iteration order is the slot order of the
/// underlying storage and does not change between mutations.
pub struct Scene {
    name: String,
    entities: SlotMap<EntitySlot, Entity>,
    index: HashMap<EntityId, EntitySlot>,
    invalidator: QueryInvalidator,
    hooks: Option<Box<dyn SceneHooks>>,
    events: SceneEvents,
}

impl Scene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: SlotMap::with_key(),
            index: HashMap::new(),
            invalidator: QueryInvalidator::new(),
            hooks: None,
            events: SceneEvents::default(),
        }
    }

    /// Builder pattern: set the activation hooks
    pub fn with_hooks<H: SceneHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach an entity and take ownership of it
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        let id = entity.id();
        entity.attach(&self.name);
        self.events.entity_added.emit(&id);

        let slot = self.entities.insert(entity);
        self.index.insert(id, slot);
        self.invalidator.invalidate_all();

        log::trace!("Scene '{}' added entity {}", self.name, id);
        id
    }

    /// Detach an entity and hand it back with its components intact
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.index.remove(&id)?;
        let mut entity = self.entities.remove(slot)?;
        entity.detach();
        self.events.entity_removed.emit(&id);
        self.invalidator.invalidate_all();

        log::trace!("Scene '{}' removed entity {}", self.name, id);
        Some(entity)
    }

    /// Detach an entity and destroy it
    ///
    /// Returns `false` if the entity is not in this scene.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        let Some(entity) = self.entities.remove(slot) else {
            return false;
        };
        entity.destroy();
        self.events.entity_removed.emit(&id);
        self.invalidator.invalidate_all();
        true
    }

    /// Get an entity
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).and_then(|slot| self.entities.get(*slot))
    }

    /// Get an entity mutably
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = *self.index.get(&id)?;
        self.entities.get_mut(slot)
    }

    /// Whether the entity is attached to this scene
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Iterate over entities
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterate mutably over entities
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Ids of every entity, in iteration order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.values().map(Entity::id)
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the scene has no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Scene events
    pub fn events(&self) -> &SceneEvents {
        &self.events
    }

    /// Mutable scene events, for subscribing
    pub fn events_mut(&mut self) -> &mut SceneEvents {
        &mut self.events
    }

    /// Run one update phase on every entity
    pub fn run_phase(&mut self, phase: SystemPhase, tick: &TickEvent) {
        for entity in self.entities.values_mut() {
            entity.run_phase(phase, tick);
        }
    }

    pub(crate) fn set_invalidator(&mut self, invalidator: QueryInvalidator) {
        self.invalidator = invalidator;
    }

    /// Run the activation hooks
    pub(crate) fn start(&mut self) {
        if let Some(mut hooks) = self.hooks.take() {
            hooks.on_start(self);
            // Hooks installed by on_start itself take precedence
            if self.hooks.is_none() {
                self.hooks = Some(hooks);
            }
        }
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}
