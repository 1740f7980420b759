//! System trait and execution contexts
//!
//! A system declares a [`SystemQuery`] once; each tick it receives the
//! entities currently matching it together with mutable access to the scene.

use super::component::AsAny;
use super::entity::EntityId;
use super::query::SystemQuery;
use super::scene::Scene;
use crate::assets::{ResourceError, Resources};
use crate::foundation::time::TickEvent;
use crate::input::Input;
use crate::render::RenderFrame;
use indexmap::IndexSet;

/// Errors raised by [`System::init`]
#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    /// A required resource is unavailable
    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Any other initialization failure
    #[error("{0}")]
    Custom(String),
}

impl SystemError {
    /// Build a [`SystemError::Custom`]
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Context handed to [`System::init`]
pub struct InitContext<'a> {
    /// The system's own query; subscribe to its events here
    pub query: &'a mut SystemQuery,
    /// Loaded resources
    pub resources: &'a Resources,
    /// Input state
    pub input: &'a Input,
}

/// Context handed to [`System::update`] once per tick
pub struct SystemContext<'a> {
    /// Tick being simulated
    pub tick: &'a TickEvent,
    /// Entities matching the system's query at the start of its update
    pub entities: &'a IndexSet<EntityId>,
    /// Active scene
    pub scene: &'a mut Scene,
    /// Input state
    pub input: &'a Input,
    /// Loaded resources
    pub resources: &'a Resources,
}

/// Logic run over the entities matching a query
///
/// ```
/// use tick_engine::ecs::{System, SystemContext, SystemQuery, Component};
/// use tick_engine::ecs::components::TransformComponent;
///
/// struct Drift;
///
/// impl System for Drift {
///     fn query(&self) -> SystemQuery {
///         SystemQuery::with([TransformComponent::capability()])
///     }
///
///     fn update(&mut self, ctx: &mut SystemContext<'_>) {
///         for id in ctx.entities {
///             if let Some(transform) = ctx.scene.get_mut(*id).and_then(|e| e.get_mut::<TransformComponent>()) {
///                 transform.position.x += ctx.tick.delta as f32;
///             }
///         }
///     }
/// }
/// ```
pub trait System: AsAny + 'static {
    /// Name used in logs and errors
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Execution priority; higher runs first. Read once on registration.
    fn priority(&self) -> i32 {
        0
    }

    /// Query whose matches are handed to every update
    fn query(&self) -> SystemQuery {
        SystemQuery::new()
    }

    /// One-time setup, run after resources are loaded and the initial scene
    /// is active
    fn init(&mut self, _ctx: InitContext<'_>) -> Result<(), SystemError> {
        Ok(())
    }

    /// Per-tick logic
    fn update(&mut self, ctx: &mut SystemContext<'_>);

    /// Sample simulation state for presentation, once per frame
    fn render(&mut self, _frame: &RenderFrame, _entities: &IndexSet<EntityId>, _scene: &Scene) {}
}

impl dyn System {
    /// Downcast to a concrete system type
    pub fn downcast_ref<T: System>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast to a concrete system type
    pub fn downcast_mut<T: System>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Whether this is a `T`
    pub fn is<T: System>(&self) -> bool {
        self.as_any().is::<T>()
    }
}
