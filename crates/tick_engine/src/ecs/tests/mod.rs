//! Integration tests for the tick pipeline
//!
//! Full engine runs driven through `Engine::step` with explicit frame times,
//! covering phase order, priorities, pausing, scene switches and queries.

use crate::assets::{Resource, Resources};
use crate::ecs::components::TransformComponent;
use crate::ecs::{
    Behavior, Capability, Component, ComponentRegistry, Entity, EntityId, InitContext, Scene,
    System, SystemContext, SystemError, SystemQuery,
};
use crate::foundation::math::Vec2;
use crate::foundation::time::TickEvent;
use crate::input::{Input, InputEvent};
use crate::Engine;
use approx::assert_relative_eq;
use std::cell::RefCell;
use std::rc::Rc;

const STEP: f64 = 1.0 / 60.0;

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Moves every transform right at 100 units per second
struct Mover;

impl System for Mover {
    fn priority(&self) -> i32 {
        1
    }

    fn query(&self) -> SystemQuery {
        SystemQuery::with([TransformComponent::capability()])
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let dx = (100.0 * ctx.tick.delta) as f32;
        for id in ctx.entities {
            if let Some(transform) = ctx.scene.get_mut(*id).and_then(|e| e.get_mut::<TransformComponent>()) {
                transform.translate(Vec2::new(dx, 0.0));
            }
        }
    }
}

/// Records its name and the size of its query result every tick
struct Recorder {
    name: &'static str,
    priority: i32,
    log: Log,
}

impl System for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn query(&self) -> SystemQuery {
        SystemQuery::with([TransformComponent::capability()])
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, ctx.entities.len()));
    }
}

struct PhaseLogger(Log);

impl Behavior for PhaseLogger {
    fn on_pre_update(&mut self, _: &mut ComponentRegistry, _: &TickEvent) {
        self.0.borrow_mut().push("pre".to_string());
    }

    fn on_update(&mut self, _: &mut ComponentRegistry, _: &TickEvent) {
        self.0.borrow_mut().push("update".to_string());
    }

    fn on_post_update(&mut self, _: &mut ComponentRegistry, _: &TickEvent) {
        self.0.borrow_mut().push("post".to_string());
    }
}

fn level_with_bunny() -> Scene {
    Scene::new("level").with_hooks(|scene: &mut Scene| {
        scene.add_entity(Entity::new().with(TransformComponent::default()));
    })
}

fn bunny_x(engine: &Engine) -> f32 {
    let scene = engine.current_scene().unwrap();
    scene
        .iter()
        .find_map(|entity| entity.get::<TransformComponent>())
        .unwrap()
        .position
        .x
}

#[test]
fn test_three_ticks_move_bunny() {
    let mut engine = Engine::builder()
        .fps(60)
        .scene(level_with_bunny())
        .system(Mover)
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();

    assert_eq!(engine.step(3.0 * STEP), 3);
    assert_relative_eq!(bunny_x(&engine), 5.0, epsilon = 1e-4);
    assert_eq!(engine.clock().tick_count(), 3);
}

#[test]
fn test_three_ticks_move_bunny_from_its_own_update() {
    struct Hop;

    impl Behavior for Hop {
        fn on_update(&mut self, components: &mut ComponentRegistry, tick: &TickEvent) {
            if let Some(transform) = components.get_mut::<TransformComponent>() {
                transform.position.x += (100.0 * tick.delta) as f32;
            }
        }
    }

    let log = log();
    let level = Scene::new("level").with_hooks(|scene: &mut Scene| {
        scene.add_entity(
            Entity::new()
                .with(TransformComponent::from_position(Vec2::zeros()))
                .with_behavior(Hop),
        );
    });
    let mut engine = Engine::builder()
        .fps(60)
        .scene(level)
        .system(Recorder { name: "watch", priority: 1, log: Rc::clone(&log) })
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();

    assert_eq!(engine.step(3.0 * STEP), 3);
    assert_relative_eq!(bunny_x(&engine), 5.0, epsilon = 1e-4);
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn test_phase_order_within_tick() {
    let log = log();
    let entity_log = Rc::clone(&log);
    let level = Scene::new("level").with_hooks(move |scene: &mut Scene| {
        scene.add_entity(
            Entity::new()
                .with(TransformComponent::default())
                .with_behavior(PhaseLogger(Rc::clone(&entity_log))),
        );
    });

    let mut engine = Engine::builder()
        .scene(level)
        .system(Recorder { name: "system", priority: 0, log: Rc::clone(&log) })
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();
    engine.step(2.0 * STEP);

    assert_eq!(
        *log.borrow(),
        vec!["pre", "update", "system:1", "post", "pre", "update", "system:1", "post"]
    );
}

#[test]
fn test_systems_run_by_descending_priority() {
    let log = log();
    let mut engine = Engine::builder()
        .scene(level_with_bunny())
        .system(Recorder { name: "low", priority: -5, log: Rc::clone(&log) })
        .system(Recorder { name: "first_tie", priority: 3, log: Rc::clone(&log) })
        .system(Recorder { name: "high", priority: 10, log: Rc::clone(&log) })
        .system(Recorder { name: "second_tie", priority: 3, log: Rc::clone(&log) })
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();
    engine.step(STEP);

    assert_eq!(
        *log.borrow(),
        vec!["high:1", "first_tie:1", "second_tie:1", "low:1"]
    );
}

#[test]
fn test_pause_skips_ticks_without_replay() {
    let mut engine = Engine::builder()
        .scene(level_with_bunny())
        .system(Mover)
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();

    engine.pause();
    assert!(engine.is_paused());
    engine.step(3.0 * STEP);
    assert_relative_eq!(bunny_x(&engine), 0.0);
    assert_eq!(engine.clock().tick_count(), 3);

    engine.resume();
    engine.step(STEP);
    assert_relative_eq!(bunny_x(&engine), 100.0 / 60.0, epsilon = 1e-4);
}

#[test]
fn test_scene_switch_refreshes_queries() {
    let log = log();
    let arena = Scene::new("arena").with_hooks(|scene: &mut Scene| {
        for _ in 0..3 {
            scene.add_entity(Entity::new().with(TransformComponent::default()));
        }
    });
    let mut engine = Engine::builder()
        .scene(level_with_bunny())
        .scene(arena)
        .system(Recorder { name: "count", priority: 0, log: Rc::clone(&log) })
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();

    engine.step(STEP);
    engine.goto("arena").unwrap();
    engine.step(STEP);

    assert_eq!(*log.borrow(), vec!["count:1", "count:3"]);
    assert!(engine.goto("credits").is_err());
}

#[test]
fn test_spawned_entities_join_query_next_tick() {
    struct Spawner;

    impl System for Spawner {
        fn priority(&self) -> i32 {
            5
        }

        fn query(&self) -> SystemQuery {
            SystemQuery::with([TransformComponent::capability()])
        }

        fn update(&mut self, ctx: &mut SystemContext<'_>) {
            ctx.scene.add_entity(Entity::new().with(TransformComponent::default()));
        }
    }

    let log = log();
    let mut engine = Engine::builder()
        .scene(Scene::new("empty"))
        .system(Spawner)
        .system(Recorder { name: "seen", priority: 0, log: Rc::clone(&log) })
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();
    engine.step(2.0 * STEP);

    // The recorder resolves its query after the spawner ran
    assert_eq!(*log.borrow(), vec!["seen:1", "seen:2"]);
    assert_eq!(engine.current_scene().unwrap().len(), 2);
}

#[test]
fn test_query_groups_over_scene() {
    struct X;
    impl Component for X {}
    struct Y;
    impl Component for Y {}

    let mut scene = Scene::new("groups");
    let a = scene.add_entity(Entity::new().with(X).with(Y));
    let b = scene.add_entity(Entity::new().with(X));
    scene.add_entity(Entity::new().with(Y));

    let mut query = SystemQuery::with([X::capability(), Y::capability()]);
    assert_eq!(query.get(&scene).iter().copied().collect::<Vec<EntityId>>(), vec![a]);

    query.add_group([X::capability()]);
    let mut matched: Vec<EntityId> = query.get(&scene).iter().copied().collect();
    matched.sort();
    assert_eq!(matched, vec![a, b]);

    let added = log();
    let sink = Rc::clone(&added);
    query
        .events_mut()
        .entity_added
        .on(move |id| sink.borrow_mut().push(id.to_string()));
    let first: *const _ = query.get(&scene);
    let second: *const _ = query.get(&scene);
    assert!(std::ptr::eq(first, second));
    assert!(added.borrow().is_empty());
}

#[test]
fn test_abstract_root_matches_any_implementation() {
    trait Collider {}

    struct Circle;
    impl Collider for Circle {}
    impl Component for Circle {
        fn capability() -> Capability {
            Capability::of::<dyn Collider>()
        }
    }

    struct Square;
    impl Collider for Square {}
    impl Component for Square {
        fn capability() -> Capability {
            Capability::of::<dyn Collider>()
        }
    }

    let mut scene = Scene::new("shapes");
    scene.add_entity(Entity::new().with(Circle));
    scene.add_entity(Entity::new().with(Square));

    let mut query = SystemQuery::with([Capability::of::<dyn Collider>()]);
    assert_eq!(query.get(&scene).len(), 2);
}

#[test]
fn test_system_added_after_init_is_initialized() {
    struct NeedsInit {
        ready: bool,
    }

    impl System for NeedsInit {
        fn init(&mut self, _ctx: InitContext<'_>) -> Result<(), SystemError> {
            self.ready = true;
            Ok(())
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>) {}
    }

    let mut engine = Engine::builder().scene(Scene::new("menu")).build().unwrap();
    pollster::block_on(engine.init()).unwrap();

    engine.add_system(NeedsInit { ready: false }).unwrap();
    assert!(engine.system::<NeedsInit>().unwrap().ready);

    assert!(engine.remove_system::<NeedsInit>().is_some());
    assert!(engine.system::<NeedsInit>().is_none());
}

#[test]
fn test_systems_see_loaded_resources_in_init() {
    struct Textured {
        width: u32,
    }

    impl System for Textured {
        fn init(&mut self, ctx: InitContext<'_>) -> Result<(), SystemError> {
            self.width = *ctx.resources.get::<u32>("bunny.png")?;
            Ok(())
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>) {}
    }

    let resources = Resources::new().with(
        "bunny.png",
        Resource::from_async(|_| async { Ok::<u32, String>(26) }),
    );
    let mut engine = Engine::builder()
        .scene(Scene::new("menu"))
        .resources(resources)
        .system(Textured { width: 0 })
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();

    assert_eq!(engine.system::<Textured>().unwrap().width, 26);
}

#[test]
fn test_failed_resource_aborts_init() {
    let mut engine = Engine::builder()
        .scene(level_with_bunny())
        .resource("missing", Resource::from_async(|_| async { Err::<u32, _>("not found") }))
        .build()
        .unwrap();

    let result = pollster::block_on(engine.init());
    assert!(matches!(result, Err(crate::EngineError::Resource(_))));
    assert_eq!(engine.state(), crate::EngineState::Initializing);
    assert!(engine.current_scene().is_none());
}

#[test]
fn test_input_decays_once_per_tick() {
    struct Jump {
        log: Log,
    }

    impl System for Jump {
        fn update(&mut self, ctx: &mut SystemContext<'_>) {
            let jumped = ctx.input.was_pressed(&["jump"]);
            let held = ctx.input.is_held(&["jump"]);
            self.log.borrow_mut().push(format!("{jumped}/{held}"));
        }
    }

    let log = log();
    let mut engine = Engine::builder()
        .scene(Scene::new("menu"))
        .input(Input::new().with_alias("jump", ["Space"]))
        .system(Jump { log: Rc::clone(&log) })
        .build()
        .unwrap();
    pollster::block_on(engine.init()).unwrap();

    engine.input_mut().apply(&InputEvent::pressed("Space", 0.0));
    engine.step(2.0 * STEP);

    assert_eq!(*log.borrow(), vec!["true/true", "false/true"]);
}
