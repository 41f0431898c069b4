//! Type-erased models.
//!
//! A list binds models of any caller-chosen type. [`Model`] gives every
//! `Eq + Hash + Debug` value dynamic equality and hashing so models can key
//! one table, and [`ModelKey`] is the shared, owned form stored in it.

use std::any::{Any, TypeId};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A value that can be bound to a view.
///
/// Blanket-implemented for every `Any + Eq + Hash + Debug + Send + Sync`
/// type. Models of different types never compare equal.
pub trait Model: Any + Send + Sync {
    /// Get this model as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Equality against a model of any type.
    fn dyn_eq(&self, other: &dyn Model) -> bool;

    /// Hash the model together with its type.
    fn dyn_hash(&self, state: &mut dyn Hasher);

    /// The concrete type name, for diagnostics.
    fn model_type_name(&self) -> &'static str;

    /// Debug formatting of the concrete value.
    fn fmt_model(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> Model for T
where
    T: Any + Eq + Hash + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Model) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn model_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn fmt_model(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PartialEq for dyn Model {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

impl Eq for dyn Model {}

impl Hash for dyn Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dyn_hash(state);
    }
}

impl fmt::Debug for dyn Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_model(f)
    }
}

/// A shared, type-erased model used as an association table key.
///
/// Cloning is cheap. Hashing and equality follow the wrapped value, and a
/// `ModelKey` can be looked up by `&dyn Model`.
#[derive(Clone)]
pub struct ModelKey(Arc<dyn Model>);

impl ModelKey {
    /// Wrap a model.
    pub fn new<M: Model>(model: M) -> Self {
        Self(Arc::new(model))
    }

    /// Borrow the wrapped model.
    pub fn as_model(&self) -> &dyn Model {
        &*self.0
    }

    /// Get the model as `T`, if that is its type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_model().as_any().downcast_ref::<T>()
    }

    /// Check whether the model is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.as_model().as_any().is::<T>()
    }

    /// The model's concrete type name.
    pub fn type_name(&self) -> &'static str {
        self.as_model().model_type_name()
    }
}

impl PartialEq for ModelKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_model() == other.as_model()
    }
}

impl Eq for ModelKey {}

impl Hash for ModelKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_model().hash(state);
    }
}

impl Borrow<dyn Model> for ModelKey {
    fn borrow(&self) -> &dyn Model {
        self.as_model()
    }
}

impl fmt::Debug for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_model().fmt_model(f)
    }
}

static_assertions::assert_impl_all!(ModelKey: Send, Sync, Clone);
