//! Bunny demo application
//!
//! Runs the engine headless against a virtual clock: a player bunny steered
//! by scripted keyboard input, bouncing bunnies, a scene switch and a pause.
//! Sprites are "drawn" by the logging render backend.
//!
//! Usage: `bunny_app [config.toml|config.ron]`. Set `RUST_LOG=trace` to see
//! every tick and every drawn sprite.

use std::error::Error;
use tick_engine::foundation::logging;
use tick_engine::input::{InputEvent, KeyState};
use tick_engine::prelude::*;

const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 600.0;
const PLAYER_SPEED: f32 = 240.0;
const TOTAL_FRAMES: u64 = 240;
const SWITCH_FRAME: u64 = 120;
const PAUSE_FRAMES: std::ops::Range<u64> = 180..200;

/// Irregular frame durations so rendering sees partial ticks
const FRAME_TIMES: [f64; 3] = [0.010, 0.021, 0.0167];

/// Size of the bunny texture, produced by the texture loader
#[derive(Debug, Clone, Copy)]
struct TextureInfo {
    width: f32,
    height: f32,
}

async fn load_texture(name: String) -> Result<TextureInfo, String> {
    log::info!("Decoding '{}'", name);
    Ok(TextureInfo {
        width: 26.0,
        height: 37.0,
    })
}

/// Linear velocity in units per second
#[derive(Debug, Clone, Copy)]
struct Velocity(Vec2);

impl Component for Velocity {}

/// Marks the bunny steered by the keyboard
struct Player;

impl Component for Player {}

fn bunny(position: Vec2, velocity: Vec2) -> Entity {
    Entity::new()
        .with(TransformComponent::from_position(position))
        .with(RenderableComponent::new("bunny.png"))
        .with(Velocity(velocity))
}

fn player(position: Vec2) -> Entity {
    Entity::new()
        .with(TransformComponent::from_position(position))
        .with(RenderableComponent::new("bunny.png").with_layer(1))
        .with(Velocity(Vec2::zeros()))
        .with(Player)
}

fn meadow() -> Scene {
    Scene::new("meadow").with_hooks(|scene: &mut Scene| {
        scene.add_entity(player(Vec2::new(WIDTH / 2.0, HEIGHT - 60.0)));
        scene.add_entity(bunny(Vec2::new(100.0, 100.0), Vec2::new(120.0, 80.0)));
    })
}

fn burrow() -> Scene {
    Scene::new("burrow").with_hooks(|scene: &mut Scene| {
        scene.add_entity(player(Vec2::new(40.0, HEIGHT / 2.0)));
        for i in 0..5u8 {
            let offset = f32::from(i);
            scene.add_entity(bunny(
                Vec2::new(100.0 + offset * 120.0, 50.0 + offset * 90.0),
                Vec2::new(60.0 - offset * 30.0, 90.0),
            ));
        }
    })
}

/// Steers the player and spawns a bunny on every jump
#[derive(Default)]
struct PlayerControl {
    spawned: u32,
}

impl System for PlayerControl {
    fn priority(&self) -> i32 {
        10
    }

    fn query(&self) -> SystemQuery {
        SystemQuery::with([Player::capability(), Velocity::capability()])
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let direction = match ctx
            .input
            .last(&[KeyState::Pressed, KeyState::Held], &["left", "right"])
        {
            Some(state) if state.name == "left" => -1.0,
            Some(_) => 1.0,
            None => 0.0,
        };
        let jumped = ctx.input.was_pressed(&["jump"]);

        let mut spawn_at = Vec::new();
        for id in ctx.entities {
            let Some(entity) = ctx.scene.get_mut(*id) else {
                continue;
            };
            if let Some(velocity) = entity.get_mut::<Velocity>() {
                velocity.0.x = direction * PLAYER_SPEED;
            }
            if jumped {
                if let Some(transform) = entity.get::<TransformComponent>() {
                    spawn_at.push(transform.position);
                }
            }
        }

        for position in spawn_at {
            self.spawned += 1;
            let spread = (self.spawned % 5) as f32 * 40.0 - 80.0;
            let id = ctx.scene.add_entity(bunny(position, Vec2::new(spread, -150.0)));
            log::info!("Jump! spawned bunny {}", id);
        }
    }
}

/// Integrates velocities and bounces bunnies off the screen edges
#[derive(Default)]
struct Movement {
    bounds: Vec2,
}

impl System for Movement {
    fn priority(&self) -> i32 {
        5
    }

    fn query(&self) -> SystemQuery {
        SystemQuery::with([TransformComponent::capability(), Velocity::capability()])
    }

    fn init(&mut self, ctx: InitContext<'_>) -> Result<(), SystemError> {
        let texture = ctx.resources.get::<TextureInfo>("bunny.png")?;
        self.bounds = Vec2::new(WIDTH - texture.width, HEIGHT - texture.height);
        Ok(())
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let dt = ctx.tick.delta as f32;
        for id in ctx.entities {
            let Some(entity) = ctx.scene.get_mut(*id) else {
                continue;
            };
            let Some(Velocity(mut velocity)) = entity.get::<Velocity>().copied() else {
                continue;
            };
            let Some(transform) = entity.get_mut::<TransformComponent>() else {
                continue;
            };

            transform.translate(velocity * dt);
            for axis in 0..2 {
                if transform.position[axis] < 0.0 || transform.position[axis] > self.bounds[axis] {
                    transform.position[axis] = transform.position[axis].clamp(0.0, self.bounds[axis]);
                    velocity[axis] = -velocity[axis];
                }
            }
            if let Some(stored) = entity.get_mut::<Velocity>() {
                stored.0 = velocity;
            }
        }
    }
}

/// Keyboard events to feed at given frames
fn script() -> Vec<(u64, InputEvent)> {
    vec![
        (10, InputEvent::pressed("ArrowRight", 0.16)),
        (40, InputEvent::pressed("a", 0.66)),
        (41, InputEvent::pressed("a", 0.68)),
        (60, InputEvent::released("a", 1.0)),
        (70, InputEvent::released("ArrowRight", 1.16)),
        (80, InputEvent::pressed("Space", 1.33)),
        (90, InputEvent::released("Space", 1.5)),
        (130, InputEvent::pressed("Space", 2.16)),
        (131, InputEvent::released("Space", 2.18)),
    ]
}

fn default_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    for (name, inputs) in [
        ("left", ["ArrowLeft", "a"]),
        ("right", ["ArrowRight", "d"]),
    ] {
        config
            .input_aliases
            .insert(name.to_string(), inputs.iter().map(ToString::to_string).collect());
    }
    config
        .input_aliases
        .insert("jump".to_string(), vec!["Space".to_string()]);
    config
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init_with_default("info");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {}", path);
            EngineConfig::load_from_file(&path)?
        }
        None => default_config(),
    };

    let time = ManualTimeSource::new();
    let mut engine = Engine::builder()
        .config(config)
        .resource("bunny.png", Resource::from_async(load_texture))
        .scene(meadow())
        .scene(burrow())
        .system(PlayerControl::default())
        .system(Movement::default())
        .system(RenderSystem::new(LogBackend::new()))
        .time_source(time.clone())
        .scheduler(ManualScheduler::frames(TOTAL_FRAMES - 1))
        .build()?;

    pollster::block_on(engine.init())?;

    let script = script();
    let mut frame = 0;
    while engine.clock().is_started() {
        for (_, event) in script.iter().filter(|(at, _)| *at == frame) {
            engine.input_mut().apply(event);
        }
        if frame == SWITCH_FRAME {
            engine.goto("burrow")?;
        }
        if frame == PAUSE_FRAMES.start {
            engine.pause();
        }
        if frame == PAUSE_FRAMES.end {
            engine.resume();
        }

        time.advance(FRAME_TIMES[(frame % 3) as usize]);
        engine.frame();
        frame += 1;
    }

    let population = engine.current_scene().map_or(0, Scene::len);
    let drawn = engine
        .system::<RenderSystem<LogBackend>>()
        .map_or(0, |render| render.backend().attached().len());
    let player_position = engine.current_scene().and_then(|scene| {
        scene
            .iter()
            .find(|entity| entity.has(Player::capability()))
            .and_then(|entity| entity.get::<TransformComponent>())
            .map(|transform| transform.position)
    });

    log::info!(
        "Done: {} frames, {} ticks, {:.2}s simulated",
        engine.frames(),
        engine.clock().tick_count(),
        engine.clock().elapsed()
    );
    log::info!(
        "{} bunnies in '{}', {} drawn",
        population,
        engine.scenes().current_name().unwrap_or("-"),
        drawn
    );
    if let Some(position) = player_position {
        log::info!("Player at ({:.1}, {:.1})", position.x, position.y);
    }
    Ok(())
}
