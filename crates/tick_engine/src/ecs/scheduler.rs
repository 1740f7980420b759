//! System scheduling
//!
//! Systems run one after another in descending priority order. Ties keep
//! registration order. Every tick runs in three phases around the systems:
//! entity pre-update, entity update, systems, entity post-update.

use super::query::{QueryInvalidator, SystemQuery};
use super::scene::Scene;
use super::system::{InitContext, System, SystemContext};
use crate::assets::Resources;
use crate::engine::EngineError;
use crate::foundation::time::TickEvent;
use crate::input::Input;
use crate::render::RenderFrame;

/// Entity update phases with explicit ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SystemPhase {
    /// Snapshot state, react to input
    PreUpdate = 0,
    /// Game logic
    Update = 1,
    /// Follow-up after every system ran
    PostUpdate = 2,
}

struct SystemEntry {
    priority: i32,
    query: SystemQuery,
    system: Box<dyn System>,
}

/// Ordered list of systems and their queries
pub struct SystemScheduler {
    entries: Vec<SystemEntry>,
    invalidator: QueryInvalidator,
}

impl SystemScheduler {
    /// Create a scheduler whose queries are invalidated through `invalidator`
    pub fn new(invalidator: QueryInvalidator) -> Self {
        Self {
            entries: Vec::new(),
            invalidator,
        }
    }

    /// Add a system to the scheduler
    pub fn add<S: System>(&mut self, system: S) {
        self.add_boxed(Box::new(system));
    }

    /// Add a boxed system to the scheduler
    pub fn add_boxed(&mut self, system: Box<dyn System>) {
        let query = system.query();
        self.insert(system, query);
    }

    /// Initialize a system and add it; used once the engine is running
    pub(crate) fn add_initialized(
        &mut self,
        mut system: Box<dyn System>,
        resources: &Resources,
        input: &Input,
    ) -> Result<(), EngineError> {
        let mut query = system.query();
        init_system(system.as_mut(), &mut query, resources, input)?;
        self.insert(system, query);
        Ok(())
    }

    fn insert(&mut self, system: Box<dyn System>, query: SystemQuery) {
        self.invalidator.register(&query);
        let priority = system.priority();
        log::debug!("Registered system '{}' (priority {})", system.name(), priority);

        self.entries.push(SystemEntry { priority, query, system });
        self.entries.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Remove the first system of type `T`
    pub fn remove<T: System>(&mut self) -> Option<Box<dyn System>> {
        let index = self.entries.iter().position(|entry| entry.system.is::<T>())?;
        let entry = self.entries.remove(index);
        log::debug!("Removed system '{}'", entry.system.name());
        Some(entry.system)
    }

    /// Get the first system of type `T`
    pub fn get<T: System>(&self) -> Option<&T> {
        self.entries.iter().find_map(|entry| entry.system.downcast_ref::<T>())
    }

    /// Get the first system of type `T` mutably
    pub fn get_mut<T: System>(&mut self) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find_map(|entry| entry.system.downcast_mut::<T>())
    }

    /// Query of the first system of type `T`
    pub fn query<T: System>(&self) -> Option<&SystemQuery> {
        self.entries
            .iter()
            .find(|entry| entry.system.is::<T>())
            .map(|entry| &entry.query)
    }

    /// System names in execution order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.system.name())
    }

    /// Number of systems
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no system is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark every system query stale
    pub fn invalidate_queries(&self) {
        self.invalidator.invalidate_all();
    }

    /// Run every system's `init` in execution order, stopping at the first
    /// failure
    pub fn init_all(&mut self, resources: &Resources, input: &Input) -> Result<(), EngineError> {
        for entry in &mut self.entries {
            init_system(entry.system.as_mut(), &mut entry.query, resources, input)?;
        }
        Ok(())
    }

    /// Run one tick over `scene`
    pub fn update(&mut self, tick: &TickEvent, scene: &mut Scene, input: &Input, resources: &Resources) {
        scene.run_phase(SystemPhase::PreUpdate, tick);
        scene.run_phase(SystemPhase::Update, tick);

        for SystemEntry { query, system, .. } in &mut self.entries {
            let entities = query.get(scene);
            let mut ctx = SystemContext {
                tick,
                entities,
                scene: &mut *scene,
                input,
                resources,
            };
            system.update(&mut ctx);
        }

        scene.run_phase(SystemPhase::PostUpdate, tick);
        log::trace!("Tick {} done", tick.tick);
    }

    /// Let every system sample `scene` for presentation
    pub fn render(&mut self, frame: &RenderFrame, scene: &Scene) {
        for SystemEntry { query, system, .. } in &mut self.entries {
            let entities = query.get(scene);
            system.render(frame, entities, scene);
        }
    }
}

fn init_system(
    system: &mut dyn System,
    query: &mut SystemQuery,
    resources: &Resources,
    input: &Input,
) -> Result<(), EngineError> {
    system
        .init(InitContext { query, resources, input })
        .map_err(|source| EngineError::System {
            name: system.name().to_string(),
            source,
        })?;
    log::debug!("Initialized system '{}'", system.name());
    Ok(())
}

impl std::fmt::Debug for SystemScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
