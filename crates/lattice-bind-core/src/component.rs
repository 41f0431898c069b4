//! Per-node component storage with capability queries.
//!
//! Every scene node carries a [`ComponentSet`]: an ordered list of
//! type-erased components plus a capability table. A capability is any
//! `'static` type, concrete or `dyn Trait`, that a component can be viewed
//! as. Components are always capabilities of their own type; trait
//! capabilities are registered explicitly with [`ComponentSet::provide`].
//!
//! # Example
//!
//! ```
//! use lattice_bind_core::component::ComponentSet;
//!
//! trait Describe {
//!     fn describe(&self) -> String;
//! }
//!
//! #[derive(Clone)]
//! struct Label(String);
//!
//! impl Describe for Label {
//!     fn describe(&self) -> String {
//!         format!("label {}", self.0)
//!     }
//! }
//!
//! fn as_describe(label: &mut Label) -> &mut (dyn Describe + 'static) {
//!     label
//! }
//!
//! let mut set = ComponentSet::new();
//! set.insert(Label("title".into()));
//! assert!(set.provide::<Label, dyn Describe>(as_describe));
//!
//! let text = set.query_mut::<dyn Describe>().map(|d| d.describe());
//! assert_eq!(text.as_deref(), Some("label title"));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A value that can be attached to a scene node.
///
/// Blanket-implemented for every `Any + Clone + Send + Sync` type, so plain
/// structs become components without any boilerplate.
pub trait Component: Any + Send + Sync {
    /// Clone this component behind a fresh box.
    fn clone_component(&self) -> Box<dyn Component>;

    /// Get this component as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Get this component as mutable `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The concrete type name, for diagnostics.
    fn component_type_name(&self) -> &'static str;
}

impl<T: Any + Clone + Send + Sync> Component for T {
    fn clone_component(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Type-erased view of one component as capability `C`.
trait CastFn<C: ?Sized>: Send + Sync {
    fn cast<'a>(&self, component: &'a mut dyn Any) -> Option<&'a mut C>;
}

struct TypedCast<T, C: ?Sized> {
    cast: fn(&mut T) -> &mut C,
}

impl<T: 'static, C: ?Sized + 'static> CastFn<C> for TypedCast<T, C> {
    fn cast<'a>(&self, component: &'a mut dyn Any) -> Option<&'a mut C> {
        component.downcast_mut::<T>().map(self.cast)
    }
}

/// Sized holder so a `dyn CastFn<C>` can live inside a `dyn Any`.
struct Caster<C: ?Sized + 'static>(Box<dyn CastFn<C>>);

/// One row of the capability table.
#[derive(Clone)]
struct Capability {
    /// Index of the component the capability is served by.
    slot: usize,
    /// A `Caster<C>` for the capability's type.
    caster: Arc<dyn Any + Send + Sync>,
    /// Capability type name for diagnostics.
    type_name: &'static str,
}

fn identity<T>(value: &mut T) -> &mut T {
    value
}

/// Ordered component storage plus a capability table.
///
/// Cloning a set clones every component and keeps the capability table, so a
/// node instantiated from a template answers the same capability queries.
#[derive(Default)]
pub struct ComponentSet {
    slots: Vec<Box<dyn Component>>,
    capabilities: HashMap<TypeId, Capability>,
}

impl ComponentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a component, registering it as a capability of its own type.
    ///
    /// If a component of the same type is already present, the new one is
    /// stored as well, but type queries keep resolving to the first.
    /// Returns the component's slot index.
    pub fn insert<T: Any + Clone + Send + Sync>(&mut self, component: T) -> usize {
        let slot = self.slots.len();
        self.slots.push(Box::new(component));
        self.capabilities
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Capability {
                slot,
                caster: Arc::new(Caster::<T>(Box::new(TypedCast::<T, T> {
                    cast: identity::<T>,
                }))),
                type_name: std::any::type_name::<T>(),
            });
        slot
    }

    /// Register capability `C` for the first component of type `T`.
    ///
    /// Returns `false` when no component of type `T` is attached. A later
    /// registration for the same capability replaces the earlier one.
    ///
    /// For a trait capability the cast must name the object lifetime, as in
    /// `fn(&mut Row) -> &mut (dyn Trait + 'static)`, or be a closure such as
    /// `|row| row` with `C` given explicitly.
    pub fn provide<T, C>(&mut self, cast: fn(&mut T) -> &mut C) -> bool
    where
        T: Any + Send + Sync,
        C: ?Sized + 'static,
    {
        let Some(slot) = self
            .slots
            .iter()
            .position(|component| (**component).as_any().is::<T>())
        else {
            return false;
        };

        self.capabilities.insert(
            TypeId::of::<C>(),
            Capability {
                slot,
                caster: Arc::new(Caster::<C>(Box::new(TypedCast { cast }))),
                type_name: std::any::type_name::<C>(),
            },
        );
        true
    }

    /// Check whether capability `C` is available.
    pub fn has_capability<C: ?Sized + 'static>(&self) -> bool {
        self.capabilities.contains_key(&TypeId::of::<C>())
    }

    /// View a component as capability `C`.
    pub fn query_mut<C: ?Sized + 'static>(&mut self) -> Option<&mut C> {
        let capability = self.capabilities.get(&TypeId::of::<C>())?;
        let caster = capability.caster.downcast_ref::<Caster<C>>()?;
        let component = self.slots.get_mut(capability.slot)?;
        caster.0.cast((**component).as_any_mut())
    }

    /// Get the first component of concrete type `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.slots
            .iter()
            .find_map(|component| (**component).as_any().downcast_ref::<T>())
    }

    /// Get the first component of concrete type `T` mutably.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.slots
            .iter_mut()
            .find_map(|component| (**component).as_any_mut().downcast_mut::<T>())
    }

    /// Number of attached components.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no components are attached.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Type names of the attached components, in insertion order.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .map(|component| (**component).component_type_name())
            .collect()
    }

    /// Type names of every registered capability.
    pub fn capability_names(&self) -> Vec<&'static str> {
        self.capabilities.values().map(|c| c.type_name).collect()
    }
}

impl Clone for ComponentSet {
    fn clone(&self) -> Self {
        Self {
            slots: self
                .slots
                .iter()
                .map(|component| (**component).clone_component())
                .collect(),
            capabilities: self.capabilities.clone(),
        }
    }
}

impl fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSet")
            .field("components", &self.type_names())
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}
