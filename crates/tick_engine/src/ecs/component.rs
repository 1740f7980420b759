//! Component trait and capability roots
//!
//! A component is stored under a declared [`Capability`]. By default that is
//! the component's own type; a family of components that should be
//! interchangeable for queries declares a shared root instead (usually a
//! trait object type such as `dyn Collider`):
//!
//! ```
//! use tick_engine::ecs::{Capability, Component};
//!
//! trait Collider {}
//!
//! struct Circle { radius: f32 }
//!
//! impl Collider for Circle {}
//!
//! impl Component for Circle {
//!     fn capability() -> Capability {
//!         Capability::of::<dyn Collider>()
//!     }
//! }
//! ```
//!
//! An entity holds at most one component per capability root.

use super::EntityId;
use crate::foundation::time::TickEvent;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Upcast helper so trait objects can be downcast to their concrete type
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert a box into `Box<dyn Any>`
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Tag a component is registered and queried under
#[derive(Clone, Copy)]
pub struct Capability {
    id: TypeId,
    name: &'static str,
}

impl Capability {
    /// Capability identified by a type (sized or not, e.g. `dyn Trait`)
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Human readable name of the root type
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.name)
    }
}

/// Data and behavior attached to one entity
///
/// Every hook has an empty default. The update hooks run during the matching
/// phase of every tick for as long as the component is attached.
pub trait Component: AsAny + 'static {
    /// Capability root this component type is stored under
    fn capability() -> Capability
    where
        Self: Sized,
    {
        Capability::of::<Self>()
    }

    /// Called when the component is bound to an entity
    fn on_add(&mut self, _entity: EntityId) {}

    /// Called when the component is unbound from its entity
    fn on_remove(&mut self, _entity: EntityId) {}

    /// Pre-update phase hook
    fn on_pre_update(&mut self, _tick: &TickEvent) {}

    /// Update phase hook
    fn on_update(&mut self, _tick: &TickEvent) {}

    /// Post-update phase hook
    fn on_post_update(&mut self, _tick: &TickEvent) {}
}

impl dyn Component {
    /// Downcast to a concrete component type
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast to a concrete component type
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Whether the stored component is a `T`
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Component")
    }
}
