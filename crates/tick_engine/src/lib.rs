//! # Tick Engine
//!
//! Runtime core of a fixed-timestep entity-component-system game engine.
//!
//! ## Features
//!
//! - **Fixed timestep**: simulation advances in whole ticks independent of
//!   the frame rate; presentation interpolates between ticks
//! - **ECS Architecture**: components stored under capability roots, cached
//!   system queries with add/remove notifications
//! - **Scenes**: named entity sets with start hooks and lazy query refresh
//! - **Resources**: memoized asynchronous loading before the first tick
//! - **Input**: aliased logical inputs with per-tick state decay
//!
//! ## Quick Start
//!
//! ```rust
//! use tick_engine::prelude::*;
//!
//! struct Drift;
//!
//! impl System for Drift {
//!     fn query(&self) -> SystemQuery {
//!         SystemQuery::with([TransformComponent::capability()])
//!     }
//!
//!     fn update(&mut self, ctx: &mut SystemContext<'_>) {
//!         for id in ctx.entities {
//!             if let Some(transform) = ctx.scene.get_mut(*id).and_then(|e| e.get_mut::<TransformComponent>()) {
//!                 transform.translate(Vec2::new(100.0 * ctx.tick.delta as f32, 0.0));
//!             }
//!         }
//!     }
//! }
//!
//! fn main() -> Result<(), EngineError> {
//!     let level = Scene::new("level").with_hooks(|scene: &mut Scene| {
//!         scene.add_entity(Entity::new().with(TransformComponent::default()));
//!     });
//!
//!     let mut engine = Engine::builder()
//!         .scene(level)
//!         .system(Drift)
//!         .scheduler(ManualScheduler::frames(3))
//!         .build()?;
//!
//!     pollster::block_on(engine.init())?;
//!     engine.step(3.0 / 60.0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::must_use_candidate)]

pub mod assets;
pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod input;
pub mod render;

mod engine;

pub use engine::{Engine, EngineBuilder, EngineConfig, EngineError, EngineState};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{Resource, ResourceError, Resources},
        config::Config,
        ecs::{
            components::{Pose, RenderableComponent, TransformComponent},
            Behavior, Capability, Component, ComponentRegistry, Entity, EntityId, InitContext,
            Scene, System, SystemContext, SystemError, SystemQuery,
        },
        events::EventEmitter,
        foundation::{
            math::Vec2,
            time::{Clock, ManualScheduler, ManualTimeSource, TickEvent},
        },
        input::{Input, InputEvent, KeyState},
        render::{LogBackend, RenderBackend, RenderFrame, RenderSystem},
        Engine, EngineBuilder, EngineConfig, EngineError, EngineState,
    };
}
