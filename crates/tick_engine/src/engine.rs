//! Core engine implementation
//!
//! The [`Engine`] owns the clock, the systems, the scenes, the resources and
//! the input state, and drives them frame by frame:
//!
//! 1. the clock turns elapsed real time into zero or more fixed ticks;
//! 2. every tick runs entity pre-update, entity update, each system in
//!    priority order, entity post-update, then decays input;
//! 3. once per frame every system samples the scene for presentation with
//!    the clock's interpolation factor.

use crate::assets::{Resource, ResourceError, Resources};
use crate::config::{Config, ConfigError, Deserialize, Serialize};
use crate::ecs::{
    QueryInvalidator, Scene, SceneManager, System, SystemError, SystemScheduler,
};
use crate::foundation::time::{
    Clock, FrameScheduler, TickEvent, TimeSource, DEFAULT_FPS, DEFAULT_MAX_FRAME_DELTA,
    DEFAULT_TIMESCALE,
};
use crate::input::Input;
use crate::render::RenderFrame;
use std::collections::BTreeMap;
use thiserror::Error;

/// Lifecycle state of an [`Engine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Built, not initialized yet
    Constructed,
    /// Loading resources and starting up
    Initializing,
    /// Ticking
    Running,
    /// Ticks are skipped; the clock keeps running
    Paused,
}

/// Main engine struct
///
/// The engine coordinates all subsystems and manages the main loop.
pub struct Engine {
    config: EngineConfig,
    clock: Clock,
    systems: SystemScheduler,
    scenes: SceneManager,
    resources: Resources,
    input: Input,
    state: EngineState,
    initial_scene: String,
    frames: u64,
}

impl Engine {
    /// Start building an engine
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Load resources, activate the initial scene, initialize every system
    /// and start the clock
    ///
    /// If a resource fails to load the engine stays in
    /// [`EngineState::Initializing`]. A retry fails the same way until every
    /// errored resource has been registered again.
    pub async fn init(&mut self) -> Result<(), EngineError> {
        if !matches!(self.state, EngineState::Constructed | EngineState::Initializing) {
            return Err(EngineError::InvalidState(format!(
                "init called while {:?}",
                self.state
            )));
        }
        self.state = EngineState::Initializing;

        log::info!("Initializing engine...");
        self.resources.load().await?;
        if let Some(error) = self.resources.first_error() {
            return Err(error.into());
        }
        log::info!("Resources loaded");

        self.scenes.goto(&self.initial_scene)?;
        self.systems.init_all(&self.resources, &self.input)?;
        self.clock.start();

        self.state = EngineState::Running;
        log::info!("Engine running ({} system(s))", self.systems.len());
        Ok(())
    }

    /// Run one simulation tick, unless paused
    pub fn update(&mut self, tick: &TickEvent) {
        if self.state != EngineState::Running {
            return;
        }
        let Some(scene) = self.scenes.current_mut() else {
            return;
        };
        self.systems.update(tick, scene, &self.input, &self.resources);
        self.input.update();
    }

    /// Sample the clock, run the ticks it produced and render once
    ///
    /// Returns the number of ticks run.
    pub fn frame(&mut self) -> usize {
        if !self.is_active() {
            return 0;
        }
        let ticks = self.clock.tick();
        self.run_frame(&ticks)
    }

    /// Like [`Engine::frame`] with an explicit real-time frame duration
    pub fn step(&mut self, frame_time: f64) -> usize {
        if !self.is_active() {
            return 0;
        }
        let ticks = self.clock.advance(frame_time);
        self.run_frame(&ticks)
    }

    fn run_frame(&mut self, ticks: &[TickEvent]) -> usize {
        for tick in ticks {
            self.update(tick);
        }
        self.render();
        ticks.len()
    }

    fn render(&mut self) {
        self.frames += 1;
        let frame = RenderFrame {
            alpha: self.clock.interpolation_factor() as f32,
            elapsed: self.clock.elapsed(),
            frame: self.frames,
        };
        if let Some(scene) = self.scenes.current() {
            self.systems.render(&frame, scene);
        }
    }

    /// Run frames until the clock stops
    pub fn run(&mut self) -> Result<(), EngineError> {
        if !self.is_active() {
            return Err(EngineError::InvalidState(format!(
                "run called while {:?}",
                self.state
            )));
        }

        log::info!("Starting main loop...");
        while self.clock.is_started() {
            self.frame();
        }
        log::info!("Main loop finished after {} frame(s)", self.frames);
        Ok(())
    }

    /// Stop the clock; [`Engine::run`] returns after the current frame
    pub fn stop(&mut self) {
        self.clock.stop();
    }

    /// Skip ticks until [`Engine::resume`]
    pub fn pause(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
            log::info!("Engine paused");
        }
    }

    /// Resume ticking after [`Engine::pause`]
    pub fn resume(&mut self) {
        if self.state == EngineState::Paused {
            self.state = EngineState::Running;
            log::info!("Engine resumed");
        }
    }

    /// Whether ticks are being skipped
    pub fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    fn is_active(&self) -> bool {
        matches!(self.state, EngineState::Running | EngineState::Paused)
    }

    /// Switch the active scene
    ///
    /// Only allowed once [`Engine::init`] has activated the initial scene.
    pub fn goto(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.is_active() {
            return Err(EngineError::InvalidState(format!(
                "goto(\"{}\") called while {:?}",
                name, self.state
            )));
        }
        self.scenes.goto(name)
    }

    /// Change the ratio of simulated to real time
    pub fn set_timescale(&mut self, timescale: f64) {
        self.clock.set_timescale(timescale);
    }

    /// Add a system; once the engine is running it is initialized right away
    pub fn add_system<S: System>(&mut self, system: S) -> Result<(), EngineError> {
        if self.is_active() {
            self.systems
                .add_initialized(Box::new(system), &self.resources, &self.input)
        } else {
            self.systems.add(system);
            Ok(())
        }
    }

    /// Remove the first system of type `T`
    pub fn remove_system<T: System>(&mut self) -> Option<Box<dyn System>> {
        self.systems.remove::<T>()
    }

    /// Get the first system of type `T`
    pub fn system<T: System>(&self) -> Option<&T> {
        self.systems.get::<T>()
    }

    /// Get the first system of type `T` mutably
    pub fn system_mut<T: System>(&mut self) -> Option<&mut T> {
        self.systems.get_mut::<T>()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Simulation clock
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Simulation clock, mutably (e.g. to subscribe to ticks)
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Registered systems
    pub fn systems(&self) -> &SystemScheduler {
        &self.systems
    }

    /// Scene directory
    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    /// Scene directory, mutably
    pub fn scenes_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    /// Active scene
    pub fn current_scene(&self) -> Option<&Scene> {
        self.scenes.current()
    }

    /// Active scene, mutably
    pub fn current_scene_mut(&mut self) -> Option<&mut Scene> {
        self.scenes.current_mut()
    }

    /// Resource table
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Input state
    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Input state, mutably (for feeding backend events)
    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    /// Lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Number of rendered frames
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("scene", &self.scenes.current_name())
            .field("systems", &self.systems)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: EngineConfig,
    systems: Vec<Box<dyn System>>,
    scenes: Vec<Scene>,
    resources: Resources,
    input: Input,
    time_source: Option<Box<dyn TimeSource>>,
    scheduler: Option<Box<dyn FrameScheduler>>,
}

impl EngineBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            systems: Vec::new(),
            scenes: Vec::new(),
            resources: Resources::new(),
            input: Input::new(),
            time_source: None,
            scheduler: None,
        }
    }

    /// Replace the configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the simulation tick rate
    pub fn fps(mut self, fps: u32) -> Self {
        self.config.fps = fps;
        self
    }

    /// Set the per-frame clamp in seconds
    pub fn max_frame_delta(mut self, max_frame_delta: f64) -> Self {
        self.config.max_frame_delta = max_frame_delta;
        self
    }

    /// Set the ratio of simulated to real time
    pub fn timescale(mut self, timescale: f64) -> Self {
        self.config.timescale = timescale;
        self
    }

    /// Register a system
    pub fn system<S: System>(mut self, system: S) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Register a scene; the first one is the initial scene by default
    pub fn scene(mut self, scene: Scene) -> Self {
        self.scenes.push(scene);
        self
    }

    /// Pick the scene activated by [`Engine::init`]
    pub fn initial_scene(mut self, name: impl Into<String>) -> Self {
        self.config.initial_scene = Some(name.into());
        self
    }

    /// Replace the resource table
    pub fn resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// Register a single resource
    pub fn resource(self, name: impl Into<String>, resource: Resource) -> Self {
        self.resources.add(name, resource);
        self
    }

    /// Replace the input state
    pub fn input(mut self, input: Input) -> Self {
        self.input = input;
        self
    }

    /// Replace the clock's real-time source
    pub fn time_source<T: TimeSource + 'static>(mut self, time_source: T) -> Self {
        self.time_source = Some(Box::new(time_source));
        self
    }

    /// Replace the clock's frame scheduler
    pub fn scheduler<S: FrameScheduler + 'static>(mut self, scheduler: S) -> Self {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    /// Build the engine
    ///
    /// Fails with [`EngineError::UnknownScene`] when the initial scene is not
    /// registered or no scene is registered at all.
    pub fn build(self) -> Result<Engine, EngineError> {
        let available: Vec<String> = self.scenes.iter().map(|s| s.name().to_string()).collect();
        let initial_scene = match (&self.config.initial_scene, available.first()) {
            (Some(name), _) => name.clone(),
            (None, Some(first)) => first.clone(),
            (None, None) => String::new(),
        };
        if !available.contains(&initial_scene) {
            return Err(EngineError::UnknownScene {
                name: initial_scene,
                available,
            });
        }

        let invalidator = QueryInvalidator::new();
        let mut scenes = SceneManager::new(invalidator.clone());
        for scene in self.scenes {
            scenes.insert(scene);
        }
        let mut systems = SystemScheduler::new(invalidator);
        for system in self.systems {
            systems.add_boxed(system);
        }

        let mut clock = Clock::new(self.config.fps)
            .with_max_frame_delta(self.config.max_frame_delta)
            .with_timescale(self.config.timescale);
        if let Some(time_source) = self.time_source {
            clock = clock.with_time_source(time_source);
        }
        if let Some(scheduler) = self.scheduler {
            clock = clock.with_scheduler(scheduler);
        }

        let mut input = self.input;
        input.extend_aliases(&self.config.input_aliases);

        log::info!(
            "Engine built: {} system(s), {} scene(s), initial scene '{}'",
            systems.len(),
            scenes.len(),
            initial_scene
        );

        Ok(Engine {
            config: self.config,
            clock,
            systems,
            scenes,
            resources: self.resources,
            input,
            state: EngineState::Constructed,
            initial_scene,
            frames: 0,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation ticks per second
    pub fps: u32,

    /// Clamp for a single real-time frame, in seconds
    pub max_frame_delta: f64,

    /// Simulated seconds per real second; scales tick deltas, not tick rate
    pub timescale: f64,

    /// Scene activated on init; the first registered scene when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_scene: Option<String>,

    /// Logical input name to physical inputs
    pub input_aliases: BTreeMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            max_frame_delta: DEFAULT_MAX_FRAME_DELTA,
            timescale: DEFAULT_TIMESCALE,
            initial_scene: None,
            input_aliases: BTreeMap::new(),
        }
    }
}

impl Config for EngineConfig {}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scene name not registered
    #[error("Unknown scene \"{name}\" (available: {available:?})")]
    UnknownScene {
        /// Requested scene
        name: String,
        /// Registered scenes
        available: Vec<String>,
    },

    /// Resource loading failed during init
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// A system failed to initialize
    #[error("System \"{name}\" failed to initialize: {source}")]
    System {
        /// System name
        name: String,
        /// Underlying failure
        source: SystemError,
    },

    /// Operation not allowed in the current state
    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
