//! Entity implementation
//!
//! An [`Entity`] is an identity plus an ordered set of components. While it
//! is attached to a scene the scene owns it, so an entity can never belong to
//! two scenes at once.

use super::component::{Capability, Component};
use super::scheduler::SystemPhase;
use crate::events::EventEmitter;
use crate::foundation::time::TickEvent;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Entity identifier, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Slot {
    capability: Capability,
    component: Box<dyn Component>,
}

/// Components of one entity, keyed by capability root
///
/// Registration order is kept and is the order in which component update
/// hooks run. Registering a second component under an occupied root replaces
/// the first one in place.
pub struct ComponentRegistry {
    entity: EntityId,
    slots: Vec<Slot>,
}

impl ComponentRegistry {
    fn new(entity: EntityId) -> Self {
        Self {
            entity,
            slots: Vec::new(),
        }
    }

    /// Entity this registry belongs to
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Register a component under its declared capability root
    ///
    /// Returns the component previously registered under that root, already
    /// unbound (its `on_remove` hook has run).
    pub fn add<T: Component>(&mut self, component: T) -> Option<Box<dyn Component>> {
        self.add_boxed(T::capability(), Box::new(component))
    }

    /// Register an already boxed component under an explicit root
    pub fn add_boxed(
        &mut self,
        capability: Capability,
        mut component: Box<dyn Component>,
    ) -> Option<Box<dyn Component>> {
        let entity = self.entity;

        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.capability == capability) {
            log::debug!("Entity {} replaces component under {:?}", entity, capability);
            slot.component.on_remove(entity);
            component.on_add(entity);
            return Some(std::mem::replace(&mut slot.component, component));
        }

        component.on_add(entity);
        self.slots.push(Slot { capability, component });
        None
    }

    /// Get the component registered under `T`'s root, if it is a `T`
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.get_root(T::capability())?.downcast_ref::<T>()
    }

    /// Mutable variant of [`ComponentRegistry::get`]
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.get_root_mut(T::capability())?.downcast_mut::<T>()
    }

    /// Get whatever component is registered under a root
    pub fn get_root(&self, capability: Capability) -> Option<&dyn Component> {
        self.slots
            .iter()
            .find(|slot| slot.capability == capability)
            .map(|slot| slot.component.as_ref())
    }

    /// Mutable variant of [`ComponentRegistry::get_root`]
    pub fn get_root_mut(&mut self, capability: Capability) -> Option<&mut dyn Component> {
        self.slots
            .iter_mut()
            .find(|slot| slot.capability == capability)
            .map(|slot| slot.component.as_mut())
    }

    /// Whether anything is registered under a root
    pub fn has(&self, capability: Capability) -> bool {
        self.slots.iter().any(|slot| slot.capability == capability)
    }

    /// Remove the component registered under `T`'s root, if it is a `T`
    pub fn remove<T: Component>(&mut self) -> Option<T> {
        let index = self.slots.iter().position(|slot| {
            slot.capability == T::capability() && slot.component.is::<T>()
        })?;
        let component = self.unbind(index);
        component.into_any().downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Remove whatever component is registered under a root
    pub fn remove_root(&mut self, capability: Capability) -> Option<Box<dyn Component>> {
        let index = self.slots.iter().position(|slot| slot.capability == capability)?;
        Some(self.unbind(index))
    }

    fn unbind(&mut self, index: usize) -> Box<dyn Component> {
        let mut slot = self.slots.remove(index);
        slot.component.on_remove(self.entity);
        slot.component
    }

    /// Remove every component, in registration order
    pub fn clear(&mut self) {
        let entity = self.entity;
        for mut slot in self.slots.drain(..) {
            slot.component.on_remove(entity);
        }
    }

    /// Iterate over roots and components in registration order
    pub fn iter(&self) -> impl Iterator<Item = (Capability, &dyn Component)> {
        self.slots
            .iter()
            .map(|slot| (slot.capability, slot.component.as_ref()))
    }

    /// Registered roots in registration order
    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.slots.iter().map(|slot| slot.capability)
    }

    /// Number of registered components
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no component is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn dispatch(&mut self, phase: SystemPhase, tick: &TickEvent) {
        for slot in &mut self.slots {
            match phase {
                SystemPhase::PreUpdate => slot.component.on_pre_update(tick),
                SystemPhase::Update => slot.component.on_update(tick),
                SystemPhase::PostUpdate => slot.component.on_post_update(tick),
            }
        }
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.capabilities()).finish()
    }
}

/// Entity-level hooks
///
/// Unlike component hooks, these see the entity's whole component registry,
/// so they can implement logic spanning several components.
pub trait Behavior {
    /// Called when the entity is attached to a scene
    fn on_add(&mut self, _components: &mut ComponentRegistry, _scene: &str) {}

    /// Called when the entity is detached from a scene
    fn on_remove(&mut self, _components: &mut ComponentRegistry, _scene: &str) {}

    /// Pre-update phase hook
    fn on_pre_update(&mut self, _components: &mut ComponentRegistry, _tick: &TickEvent) {}

    /// Update phase hook
    fn on_update(&mut self, _components: &mut ComponentRegistry, _tick: &TickEvent) {}

    /// Post-update phase hook
    fn on_post_update(&mut self, _components: &mut ComponentRegistry, _tick: &TickEvent) {}
}

/// Events published by an entity
#[derive(Debug, Default)]
pub struct EntityEvents {
    /// Attached to the named scene
    pub added: EventEmitter<String>,
    /// Detached from the named scene
    pub removed: EventEmitter<String>,
    /// Pre-update phase ran
    pub pre_update: EventEmitter<TickEvent>,
    /// Update phase ran
    pub update: EventEmitter<TickEvent>,
    /// Post-update phase ran
    pub post_update: EventEmitter<TickEvent>,
}

impl EntityEvents {
    fn phase_mut(&mut self, phase: SystemPhase) -> &mut EventEmitter<TickEvent> {
        match phase {
            SystemPhase::PreUpdate => &mut self.pre_update,
            SystemPhase::Update => &mut self.update,
            SystemPhase::PostUpdate => &mut self.post_update,
        }
    }

    fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.pre_update.clear();
        self.update.clear();
        self.post_update.clear();
    }
}

/// Game object: identity, components, optional behavior and events
pub struct Entity {
    id: EntityId,
    scene: Option<String>,
    components: ComponentRegistry,
    behavior: Option<Box<dyn Behavior>>,
    events: EntityEvents,
}

impl Entity {
    /// Create a detached entity with no components
    pub fn new() -> Self {
        let id = EntityId::next();
        Self {
            id,
            scene: None,
            components: ComponentRegistry::new(id),
            behavior: None,
            events: EntityEvents::default(),
        }
    }

    /// Builder pattern: attach entity-level hooks
    pub fn with_behavior<B: Behavior + 'static>(mut self, behavior: B) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Builder pattern: add a component
    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.components.add(component);
        self
    }

    /// Get the entity ID
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Name of the scene this entity is attached to
    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    /// Add a component, see [`ComponentRegistry::add`]
    pub fn add<T: Component>(&mut self, component: T) -> Option<Box<dyn Component>> {
        self.components.add(component)
    }

    /// Get a component, see [`ComponentRegistry::get`]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components.get::<T>()
    }

    /// Get a component mutably, see [`ComponentRegistry::get_mut`]
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut::<T>()
    }

    /// Remove a component, see [`ComponentRegistry::remove`]
    pub fn remove<T: Component>(&mut self) -> Option<T> {
        self.components.remove::<T>()
    }

    /// Whether a component is registered under a root
    pub fn has(&self, capability: Capability) -> bool {
        self.components.has(capability)
    }

    /// Component registry
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Mutable component registry
    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    /// Entity events
    pub fn events(&self) -> &EntityEvents {
        &self.events
    }

    /// Mutable entity events, for subscribing
    pub fn events_mut(&mut self) -> &mut EntityEvents {
        &mut self.events
    }

    /// Run one update phase: behavior hook, then component hooks in
    /// registration order, then phase listeners
    pub fn run_phase(&mut self, phase: SystemPhase, tick: &TickEvent) {
        if let Some(behavior) = self.behavior.as_mut() {
            match phase {
                SystemPhase::PreUpdate => behavior.on_pre_update(&mut self.components, tick),
                SystemPhase::Update => behavior.on_update(&mut self.components, tick),
                SystemPhase::PostUpdate => behavior.on_post_update(&mut self.components, tick),
            }
        }
        self.components.dispatch(phase, tick);
        self.events.phase_mut(phase).emit(tick);
    }

    pub(crate) fn attach(&mut self, scene: &str) {
        self.scene = Some(scene.to_string());
        if let Some(behavior) = self.behavior.as_mut() {
            behavior.on_add(&mut self.components, scene);
        }
        self.events.added.emit(&scene.to_string());
    }

    pub(crate) fn detach(&mut self) {
        let Some(scene) = self.scene.take() else {
            return;
        };
        if let Some(behavior) = self.behavior.as_mut() {
            behavior.on_remove(&mut self.components, &scene);
        }
        self.events.removed.emit(&scene);
    }

    /// Tear the entity down for good
    ///
    /// Every component is unbound and every listener dropped first; an
    /// attached entity's behavior then gets `on_remove` with the emptied
    /// registry, and is dropped too. Entities attached to a scene are
    /// destroyed through [`Scene::destroy_entity`](super::Scene::destroy_entity).
    pub fn destroy(mut self) {
        let scene = self.scene.take();
        self.components.clear();
        self.events.clear();
        if let (Some(scene), Some(behavior)) = (scene, self.behavior.as_mut()) {
            behavior.on_remove(&mut self.components, &scene);
        }
        self.behavior = None;
        log::debug!("Entity {} destroyed", self.id);
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("scene", &self.scene)
            .field("components", &self.components)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    trait Weapon {}

    #[derive(Debug, PartialEq)]
    struct Sword {
        damage: u32,
    }
    impl Weapon for Sword {}
    impl Component for Sword {
        fn capability() -> Capability {
            Capability::of::<dyn Weapon>()
        }
    }

    #[derive(Debug, PartialEq)]
    struct Bow;
    impl Weapon for Bow {}
    impl Component for Bow {
        fn capability() -> Capability {
            Capability::of::<dyn Weapon>()
        }
    }

    /// Records every hook call into a shared log
    struct HookLog {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Component for HookLog {
        fn on_add(&mut self, _entity: EntityId) {
            self.log.borrow_mut().push(format!("{}:add", self.name));
        }
        fn on_remove(&mut self, _entity: EntityId) {
            self.log.borrow_mut().push(format!("{}:remove", self.name));
        }
        fn on_pre_update(&mut self, _tick: &TickEvent) {
            self.log.borrow_mut().push(format!("{}:pre", self.name));
        }
        fn on_update(&mut self, _tick: &TickEvent) {
            self.log.borrow_mut().push(format!("{}:update", self.name));
        }
        fn on_post_update(&mut self, _tick: &TickEvent) {
            self.log.borrow_mut().push(format!("{}:post", self.name));
        }
    }

    struct Counter(u32);
    impl Component for Counter {}

    struct CountUp;
    impl Behavior for CountUp {
        fn on_update(&mut self, components: &mut ComponentRegistry, _tick: &TickEvent) {
            if let Some(counter) = components.get_mut::<Counter>() {
                counter.0 += 1;
            }
        }
    }

    fn tick() -> TickEvent {
        TickEvent { delta: 1.0 / 60.0, elapsed: 1.0 / 60.0, tick: 1 }
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let a = Entity::new();
        let b = Entity::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.components().entity(), a.id());
    }

    #[test]
    fn test_add_then_get_then_remove() {
        let mut entity = Entity::new();
        assert!(entity.add(Sword { damage: 4 }).is_none());
        assert_eq!(entity.get::<Sword>(), Some(&Sword { damage: 4 }));

        let removed = entity.remove::<Sword>();
        assert_eq!(removed, Some(Sword { damage: 4 }));
        assert!(entity.get::<Sword>().is_none());
        assert!(entity.components().is_empty());
    }

    #[test]
    fn test_lookup_by_abstract_root() {
        let entity = Entity::new().with(Bow);
        let root = Capability::of::<dyn Weapon>();

        assert!(entity.has(root));
        assert!(entity.components().get_root(root).unwrap().is::<Bow>());
        // A narrower request on the shared root misses
        assert!(entity.get::<Sword>().is_none());
        assert!(entity.get::<Bow>().is_some());
    }

    #[test]
    fn test_same_root_is_last_write_wins() {
        let mut entity = Entity::new().with(Sword { damage: 1 });

        let displaced = entity.add(Bow).expect("sword should be displaced");

        assert!(displaced.is::<Sword>());
        assert!(entity.get::<Bow>().is_some());
        assert!(entity.get::<Sword>().is_none());
        assert_eq!(entity.components().len(), 1);
    }

    #[test]
    fn test_remove_does_not_take_other_type_under_same_root() {
        let mut entity = Entity::new().with(Bow);
        assert!(entity.remove::<Sword>().is_none());
        assert!(entity.get::<Bow>().is_some());
    }

    #[test]
    fn test_hooks_bound_on_add_and_unbound_on_remove() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut entity = Entity::new();
        entity.add(HookLog { name: "p", log: Rc::clone(&log) });

        entity.run_phase(SystemPhase::Update, &tick());
        entity.remove::<HookLog>();
        entity.run_phase(SystemPhase::Update, &tick());

        assert_eq!(*log.borrow(), vec!["p:add", "p:update", "p:remove"]);
    }

    #[test]
    fn test_phase_order_behavior_components_listeners() {
        let log = Rc::new(RefCell::new(Vec::new()));

        struct Logger(Rc<RefCell<Vec<String>>>);
        impl Behavior for Logger {
            fn on_pre_update(&mut self, _: &mut ComponentRegistry, _: &TickEvent) {
                self.0.borrow_mut().push("behavior:pre".to_string());
            }
        }

        let mut entity = Entity::new()
            .with_behavior(Logger(Rc::clone(&log)))
            .with(HookLog { name: "a", log: Rc::clone(&log) });
        let listener_log = Rc::clone(&log);
        entity
            .events_mut()
            .pre_update
            .on(move |_| listener_log.borrow_mut().push("listener:pre".to_string()));

        log.borrow_mut().clear();
        entity.run_phase(SystemPhase::PreUpdate, &tick());

        assert_eq!(*log.borrow(), vec!["behavior:pre", "a:pre", "listener:pre"]);
    }

    #[test]
    fn test_behavior_reaches_components() {
        let mut entity = Entity::new().with(Counter(0)).with_behavior(CountUp);
        entity.run_phase(SystemPhase::Update, &tick());
        entity.run_phase(SystemPhase::Update, &tick());
        entity.run_phase(SystemPhase::PostUpdate, &tick());
        assert_eq!(entity.get::<Counter>().unwrap().0, 2);
    }

    #[test]
    fn test_destroy_unbinds_every_component() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let entity = Entity::new()
            .with(HookLog { name: "a", log: Rc::clone(&log) })
            .with(Sword { damage: 2 });

        entity.destroy();

        assert_eq!(*log.borrow(), vec!["a:add", "a:remove"]);
    }
}
