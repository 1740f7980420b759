//! Resource Manager - memoized asynchronous asset loading
//!
//! Resources are registered with an async loader and stay queued until
//! [`Resources::load`] runs. Loading is sequential in registration order and
//! memoized: while a load is in flight every caller shares the same future,
//! and a loaded or errored resource is never loaded again.
//!
//! The manager is a cheap cloneable handle; systems receive it by reference
//! and can look up loaded values by name.

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use indexmap::IndexMap;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};
use thiserror::Error;

/// Resource errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// Resource is unknown, queued or still loading
    #[error("Resource \"{0}\" was not loaded")]
    NotLoaded(String),

    /// Loader rejected
    #[error("Failed to load resource \"{name}\": {message}")]
    LoadFailed {
        /// Resource name
        name: String,
        /// Loader error message
        message: String,
    },

    /// Loaded value has a different type than requested
    #[error("Resource \"{name}\" is not a {expected}")]
    TypeMismatch {
        /// Resource name
        name: String,
        /// Requested type
        expected: &'static str,
    },
}

/// Future shared by every caller of [`Resources::load`] while a load runs
pub type LoadFuture = Shared<LocalBoxFuture<'static, Result<(), ResourceError>>>;

type LoadOutput = Result<Box<dyn Any>, String>;
type Loader = Box<dyn FnOnce(String) -> LocalBoxFuture<'static, LoadOutput>>;

/// A not yet loaded resource: a one-shot async loader
pub struct Resource {
    loader: Loader,
}

impl Resource {
    /// Create from an async loader receiving the resource name
    pub fn from_async<F, Fut, T, E>(loader: F) -> Self
    where
        F: FnOnce(String) -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        T: Any,
        E: fmt::Display,
    {
        Self {
            loader: Box::new(move |name| {
                async move {
                    loader(name)
                        .await
                        .map(|value| Box::new(value) as Box<dyn Any>)
                        .map_err(|error| error.to_string())
                }
                .boxed_local()
            }),
        }
    }

    /// Create a resource that resolves immediately to `value`
    pub fn ready<T: Any>(value: T) -> Self {
        Self::from_async(move |_| async move { Ok::<T, ResourceError>(value) })
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resource { .. }")
    }
}

/// Load state of a named resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Registered, waiting for the next load
    Queued,
    /// Loader is running
    Loading,
    /// Value is available
    Loaded,
    /// Loader failed; terminal until the resource is registered again
    Errored,
}

enum Slot {
    Queued(Resource),
    Loading,
}

#[derive(Default)]
struct Registry {
    queued: IndexMap<String, Slot>,
    loaded: IndexMap<String, Rc<dyn Any>>,
    errored: IndexMap<String, ResourceError>,
    in_flight: Option<LoadFuture>,
}

impl Registry {
    /// Mark the first queued resource as loading and hand out its loader
    fn take_next(&mut self) -> Option<(String, Resource)> {
        let (name, slot) = self
            .queued
            .iter_mut()
            .find(|(_, slot)| matches!(slot, Slot::Queued(_)))?;
        match std::mem::replace(slot, Slot::Loading) {
            Slot::Queued(resource) => Some((name.clone(), resource)),
            Slot::Loading => None,
        }
    }

    /// Store a loader outcome unless the resource was unloaded or replaced
    fn settle(&mut self, name: String, outcome: LoadOutput) -> Option<ResourceError> {
        if !matches!(self.queued.get(&name), Some(Slot::Loading)) {
            log::debug!("Discarding result for unloaded resource '{}'", name);
            return None;
        }
        self.queued.shift_remove(&name);

        match outcome {
            Ok(value) => {
                log::debug!("Loaded resource '{}'", name);
                self.loaded.insert(name, Rc::from(value));
                None
            }
            Err(message) => {
                let error = ResourceError::LoadFailed {
                    name: name.clone(),
                    message,
                };
                log::warn!("{}", error);
                self.errored.insert(name, error.clone());
                Some(error)
            }
        }
    }
}

/// Named resources and their load state
#[derive(Clone, Default)]
pub struct Resources {
    inner: Rc<RefCell<Registry>>,
}

impl Resources {
    /// Create an empty resource table
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: register a resource
    pub fn with(self, name: impl Into<String>, resource: Resource) -> Self {
        self.add(name, resource);
        self
    }

    /// Register a resource for the next load, replacing any previous entry
    pub fn add(&self, name: impl Into<String>, resource: Resource) {
        let name = name.into();
        let mut registry = self.inner.borrow_mut();
        registry.loaded.shift_remove(&name);
        registry.errored.shift_remove(&name);
        registry.queued.insert(name, Slot::Queued(resource));
    }

    /// Load every queued resource
    ///
    /// While a load is in flight this returns a clone of the same future.
    /// The future resolves once the queue is drained; failures do not stop
    /// the remaining loads and the first one is reported.
    pub fn load(&self) -> LoadFuture {
        let mut registry = self.inner.borrow_mut();
        if let Some(in_flight) = &registry.in_flight {
            if in_flight.peek().is_none() {
                return in_flight.clone();
            }
        }

        let future = load_queued(Rc::downgrade(&self.inner)).boxed_local().shared();
        registry.in_flight = Some(future.clone());
        future
    }

    /// Get a loaded value
    pub fn get<T: Any>(&self, name: &str) -> Result<Rc<T>, ResourceError> {
        let registry = self.inner.borrow();
        if let Some(error) = registry.errored.get(name) {
            return Err(error.clone());
        }

        let value = registry
            .loaded
            .get(name)
            .ok_or_else(|| ResourceError::NotLoaded(name.to_string()))?;

        Rc::clone(value)
            .downcast::<T>()
            .map_err(|_| ResourceError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Forget a resource in any state; an in-flight result for it is discarded
    pub fn unload(&self, name: &str) -> bool {
        let mut registry = self.inner.borrow_mut();
        let queued = registry.queued.shift_remove(name).is_some();
        let loaded = registry.loaded.shift_remove(name).is_some();
        let errored = registry.errored.shift_remove(name).is_some();
        queued || loaded || errored
    }

    /// Load state of a resource
    pub fn state(&self, name: &str) -> Option<LoadState> {
        let registry = self.inner.borrow();
        match registry.queued.get(name) {
            Some(Slot::Queued(_)) => Some(LoadState::Queued),
            Some(Slot::Loading) => Some(LoadState::Loading),
            None if registry.loaded.contains_key(name) => Some(LoadState::Loaded),
            None if registry.errored.contains_key(name) => Some(LoadState::Errored),
            None => None,
        }
    }

    /// Fraction of registered resources that finished loading
    ///
    /// `1.0` when nothing is registered.
    pub fn progress(&self) -> f32 {
        let registry = self.inner.borrow();
        let loaded = registry.loaded.len();
        let total = loaded + registry.queued.len();
        if total == 0 {
            1.0
        } else {
            loaded as f32 / total as f32
        }
    }

    /// Error of the first resource that failed to load, in failure order
    ///
    /// Errored resources stay errored until registered again with
    /// [`Resources::add`].
    pub fn first_error(&self) -> Option<ResourceError> {
        self.inner.borrow().errored.values().next().cloned()
    }

    /// Whether a load is in flight
    pub fn is_loading(&self) -> bool {
        self.inner
            .borrow()
            .in_flight
            .as_ref()
            .map_or(false, |future| future.peek().is_none())
    }

    /// Names of loaded resources in load order
    pub fn loaded_names(&self) -> Vec<String> {
        self.inner.borrow().loaded.keys().cloned().collect()
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.borrow();
        f.debug_struct("Resources")
            .field("queued", &registry.queued.len())
            .field("loaded", &registry.loaded.len())
            .field("errored", &registry.errored.len())
            .finish()
    }
}

/// Drain the queue one resource at a time; no borrow is held across an await
async fn load_queued(registry: Weak<RefCell<Registry>>) -> Result<(), ResourceError> {
    let mut first_error = None;

    loop {
        let Some(inner) = registry.upgrade() else {
            break;
        };
        let next = inner.borrow_mut().take_next();
        drop(inner);
        let Some((name, resource)) = next else {
            break;
        };

        log::debug!("Loading resource '{}'", name);
        let outcome = (resource.loader)(name.clone()).await;

        let Some(inner) = registry.upgrade() else {
            break;
        };
        let error = inner.borrow_mut().settle(name, outcome);
        if let Some(error) = error {
            first_error.get_or_insert(error);
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
