//! Cached entity queries
//!
//! A [`SystemQuery`] selects the entities of a scene that carry every
//! capability of at least one of its groups. Results are cached until the
//! query is invalidated; the next read rescans the scene and publishes which
//! entities entered or left the result.

use super::component::Capability;
use super::entity::EntityId;
use super::scene::Scene;
use crate::events::EventEmitter;
use indexmap::IndexSet;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Events published when a query's result changes
#[derive(Debug, Default)]
pub struct QueryEvents {
    /// Entity entered the result
    pub entity_added: EventEmitter<EntityId>,
    /// Entity left the result
    pub entity_removed: EventEmitter<EntityId>,
}

/// Cached selection of entities by capability groups
///
/// The groups form a disjunction of conjunctions: an entity matches when it
/// carries every capability of some group.
#[derive(Debug)]
pub struct SystemQuery {
    groups: Vec<Vec<Capability>>,
    entities: IndexSet<EntityId>,
    dirty: Rc<Cell<bool>>,
    events: QueryEvents,
}

impl SystemQuery {
    /// Create a query without groups; it matches nothing
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            entities: IndexSet::new(),
            dirty: Rc::new(Cell::new(true)),
            events: QueryEvents::default(),
        }
    }

    /// Create a query with a single group
    pub fn with(group: impl IntoIterator<Item = Capability>) -> Self {
        Self::new().or(group)
    }

    /// Builder pattern: add an alternative group
    pub fn or(mut self, group: impl IntoIterator<Item = Capability>) -> Self {
        self.add_group(group);
        self
    }

    /// Add an alternative group and invalidate the cached result
    pub fn add_group(&mut self, group: impl IntoIterator<Item = Capability>) {
        self.groups.push(group.into_iter().collect());
        self.invalidate();
    }

    /// Capability groups of this query
    pub fn groups(&self) -> &[Vec<Capability>] {
        &self.groups
    }

    /// Matching entities of `scene`, rescanned if the cache is stale
    ///
    /// While the query stays clean the same cached set is returned.
    pub fn get(&mut self, scene: &Scene) -> &IndexSet<EntityId> {
        if !self.dirty.get() || self.groups.is_empty() {
            return &self.entities;
        }

        let previous = std::mem::take(&mut self.entities);
        for entity in scene.iter() {
            let components = entity.components();
            let matched = self
                .groups
                .iter()
                .any(|group| group.iter().all(|capability| components.has(*capability)));
            if matched {
                self.entities.insert(entity.id());
            }
        }

        for id in &self.entities {
            if !previous.contains(id) {
                self.events.entity_added.emit(id);
            }
        }
        for id in &previous {
            if !self.entities.contains(id) {
                self.events.entity_removed.emit(id);
            }
        }

        self.dirty.set(false);
        &self.entities
    }

    /// Cached result without rescanning
    pub fn entities(&self) -> &IndexSet<EntityId> {
        &self.entities
    }

    /// Whether the next [`SystemQuery::get`] rescans
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Mark the cached result stale
    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    /// Query events
    pub fn events(&self) -> &QueryEvents {
        &self.events
    }

    /// Mutable query events, for subscribing
    pub fn events_mut(&mut self) -> &mut QueryEvents {
        &mut self.events
    }

    pub(crate) fn dirty_flag(&self) -> &Rc<Cell<bool>> {
        &self.dirty
    }
}

impl Default for SystemQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle that marks every registered query stale
///
/// Scenes hold a clone and fire it whenever their entity set changes, so
/// queries never need a reference back to the scene they read.
#[derive(Debug, Clone, Default)]
pub struct QueryInvalidator {
    flags: Rc<RefCell<Vec<Weak<Cell<bool>>>>>,
}

impl QueryInvalidator {
    /// Create an invalidator with no registered queries
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a query's dirty flag
    pub fn register(&self, query: &SystemQuery) {
        self.flags.borrow_mut().push(Rc::downgrade(query.dirty_flag()));
    }

    /// Mark every live query stale, forgetting dropped ones
    pub fn invalidate_all(&self) {
        self.flags.borrow_mut().retain(|flag| match flag.upgrade() {
            Some(flag) => {
                flag.set(true);
                true
            }
            None => false,
        });
    }

    /// Number of live registered queries
    pub fn len(&self) -> usize {
        self.flags
            .borrow()
            .iter()
            .filter(|flag| flag.strong_count() > 0)
            .count()
    }

    /// Whether no live query is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
