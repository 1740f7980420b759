//! # Scene Manager
//!
//! Directory of named scenes with one active scene. Switching scenes marks
//! every system query stale so membership from the previous scene never
//! leaks into the next tick.

use super::query::QueryInvalidator;
use super::scene::Scene;
use crate::engine::EngineError;
use crate::events::EventEmitter;
use indexmap::IndexMap;

/// Events published by the scene manager
#[derive(Debug, Default)]
pub struct SceneManagerEvents {
    /// Active scene changed; carries the new scene's name
    pub change: EventEmitter<String>,
}

/// Named scenes in declaration order plus the active one
#[derive(Debug)]
pub struct SceneManager {
    scenes: IndexMap<String, Scene>,
    current: Option<String>,
    invalidator: QueryInvalidator,
    events: SceneManagerEvents,
}

impl SceneManager {
    /// Create an empty manager sharing `invalidator` with the systems
    pub fn new(invalidator: QueryInvalidator) -> Self {
        Self {
            scenes: IndexMap::new(),
            current: None,
            invalidator,
            events: SceneManagerEvents::default(),
        }
    }

    /// Register a scene under its name, replacing any scene of that name
    pub fn insert(&mut self, mut scene: Scene) -> Option<Scene> {
        scene.set_invalidator(self.invalidator.clone());
        let name = scene.name().to_string();
        if self.current.as_deref() == Some(name.as_str()) {
            self.invalidator.invalidate_all();
        }
        self.scenes.insert(name, scene)
    }

    /// Activate a scene and run its start hooks
    pub fn goto(&mut self, name: &str) -> Result<(), EngineError> {
        let Some(scene) = self.scenes.get_mut(name) else {
            return Err(EngineError::UnknownScene {
                name: name.to_string(),
                available: self.scenes.keys().cloned().collect(),
            });
        };

        log::info!("Switching to scene '{}'", name);
        self.current = Some(name.to_string());
        self.invalidator.invalidate_all();
        self.events.change.emit(&name.to_string());
        scene.start();
        Ok(())
    }

    /// Name of the active scene
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Active scene
    pub fn current(&self) -> Option<&Scene> {
        self.current.as_ref().and_then(|name| self.scenes.get(name))
    }

    /// Active scene, mutably
    pub fn current_mut(&mut self) -> Option<&mut Scene> {
        let name = self.current.as_ref()?;
        self.scenes.get_mut(name)
    }

    /// Get a scene by name
    pub fn get(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    /// Get a scene by name, mutably
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(name)
    }

    /// Whether a scene of that name exists
    pub fn contains(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    /// Scene names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    /// Number of scenes
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether no scene is registered
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Scene manager events
    pub fn events(&self) -> &SceneManagerEvents {
        &self.events
    }

    /// Mutable scene manager events, for subscribing
    pub fn events_mut(&mut self) -> &mut SceneManagerEvents {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, Entity, SystemQuery};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Marker;
    impl Component for Marker {}

    fn manager() -> (SceneManager, QueryInvalidator) {
        let invalidator = QueryInvalidator::new();
        let mut scenes = SceneManager::new(invalidator.clone());
        scenes.insert(Scene::new("menu"));
        scenes.insert(Scene::new("level").with_hooks(|scene: &mut Scene| {
            scene.add_entity(Entity::new().with(Marker));
        }));
        (scenes, invalidator)
    }

    #[test]
    fn test_goto_unknown_scene() {
        let (mut scenes, _) = manager();
        match scenes.goto("credits") {
            Err(EngineError::UnknownScene { name, available }) => {
                assert_eq!(name, "credits");
                assert_eq!(available, vec!["menu".to_string(), "level".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(scenes.current().is_none());
    }

    #[test]
    fn test_goto_runs_start_and_emits_change() {
        let (mut scenes, _) = manager();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        scenes.events_mut().change.on(move |name| sink.borrow_mut().push(name.clone()));

        scenes.goto("level").unwrap();

        assert_eq!(scenes.current_name(), Some("level"));
        assert_eq!(scenes.current().unwrap().len(), 1);
        assert_eq!(*changes.borrow(), vec!["level".to_string()]);
    }

    #[test]
    fn test_scene_switch_invalidates_queries() {
        let (mut scenes, invalidator) = manager();
        let mut query = SystemQuery::with([Marker::capability()]);
        invalidator.register(&query);

        scenes.goto("level").unwrap();
        assert_eq!(query.get(scenes.current().unwrap()).len(), 1);

        scenes.goto("menu").unwrap();
        assert!(query.is_dirty());
        assert!(query.get(scenes.current().unwrap()).is_empty());
    }

    #[test]
    fn test_inserted_scenes_share_invalidator() {
        let (mut scenes, invalidator) = manager();
        let mut query = SystemQuery::with([Marker::capability()]);
        invalidator.register(&query);
        scenes.goto("menu").unwrap();
        query.get(scenes.current().unwrap());

        scenes.current_mut().unwrap().add_entity(Entity::new().with(Marker));
        assert!(query.is_dirty());
    }
}
