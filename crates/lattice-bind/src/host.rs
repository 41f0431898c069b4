//! The host presentation framework a [`ListView`](crate::ListView) drives.
//!
//! A [`ViewHost`] owns the views. It instantiates them from a template,
//! parents and activates them, destroys them (possibly deferred), answers
//! capability queries, and reports each view's destruction exactly once.
//!
//! [`SharedScene`] is the reference host.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use lattice_bind_core::{NodeId, ObserverId, SceneError, SharedScene};

/// One-shot notification delivered when a view is torn down.
pub type DestroyCallback<V> = Box<dyn FnOnce(V) + Send + Sync>;

/// Operations the binding manager needs from the host.
pub trait ViewHost: Send + Sync {
    /// Opaque reference to a view instance.
    type Handle: Copy + Eq + Hash + Debug + Send + Sync + 'static;
    /// Identifies a registered destruction callback.
    type Observer: Copy + Debug + Send + Sync + 'static;
    /// Host failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a new view from `template`. The copy is not parented.
    fn instantiate(&self, template: Self::Handle) -> Result<Self::Handle, Self::Error>;

    /// Move `view` under `parent`, or detach it with `None`.
    fn set_parent(
        &self,
        view: Self::Handle,
        parent: Option<Self::Handle>,
    ) -> Result<(), Self::Error>;

    /// Set the view's own active flag.
    fn set_active(&self, view: Self::Handle, active: bool) -> Result<(), Self::Error>;

    /// Tear the view down. The host may defer the actual removal, in which
    /// case the view stays in its parent's children until then.
    fn destroy(&self, view: Self::Handle) -> Result<(), Self::Error>;

    /// Whether the view is gone or waiting for a deferred destroy.
    fn is_destroyed(&self, view: Self::Handle) -> bool;

    /// The view's parent, `None` for a root or an already removed view.
    fn parent_of(&self, view: Self::Handle) -> Option<Self::Handle>;

    /// The view's direct children, in sibling order.
    fn children_of(&self, view: Self::Handle) -> Result<Vec<Self::Handle>, Self::Error>;

    /// Register a one-shot callback fired when the view is removed.
    fn on_destroyed(
        &self,
        view: Self::Handle,
        callback: DestroyCallback<Self::Handle>,
    ) -> Result<Self::Observer, Self::Error>;

    /// Drop a callback before it fires. Returns `false` if it already fired
    /// or the view is gone.
    fn cancel_on_destroyed(&self, view: Self::Handle, observer: Self::Observer) -> bool;

    /// Run `f` against the view's capability `C`.
    ///
    /// Returns `Ok(None)` when the view does not expose `C`. `f` must not
    /// call back into the host.
    fn with_capability<C, R, F>(&self, view: Self::Handle, f: F) -> Result<Option<R>, Self::Error>
    where
        C: ?Sized + 'static,
        F: FnOnce(&mut C) -> R;
}

impl ViewHost for SharedScene {
    type Handle = NodeId;
    type Observer = ObserverId;
    type Error = SceneError;

    fn instantiate(&self, template: NodeId) -> Result<NodeId, SceneError> {
        SharedScene::instantiate(self, template)
    }

    fn set_parent(&self, view: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        SharedScene::set_parent(self, view, parent)
    }

    fn set_active(&self, view: NodeId, active: bool) -> Result<(), SceneError> {
        SharedScene::set_active(self, view, active)
    }

    fn destroy(&self, view: NodeId) -> Result<(), SceneError> {
        SharedScene::destroy(self, view)
    }

    fn is_destroyed(&self, view: NodeId) -> bool {
        self.is_pending_destroy(view).unwrap_or(true)
    }

    fn parent_of(&self, view: NodeId) -> Option<NodeId> {
        self.parent(view).ok().flatten()
    }

    fn children_of(&self, view: NodeId) -> Result<Vec<NodeId>, SceneError> {
        self.children(view)
    }

    fn on_destroyed(
        &self,
        view: NodeId,
        callback: DestroyCallback<NodeId>,
    ) -> Result<ObserverId, SceneError> {
        self.observe_destroyed(view, callback)
    }

    fn cancel_on_destroyed(&self, view: NodeId, observer: ObserverId) -> bool {
        self.unobserve_destroyed(view, observer)
    }

    fn with_capability<C, R, F>(&self, view: NodeId, f: F) -> Result<Option<R>, SceneError>
    where
        C: ?Sized + 'static,
        F: FnOnce(&mut C) -> R,
    {
        self.with_component::<C, R, F>(view, f)
    }
}

impl<H: ViewHost> ViewHost for Arc<H> {
    type Handle = H::Handle;
    type Observer = H::Observer;
    type Error = H::Error;

    fn instantiate(&self, template: Self::Handle) -> Result<Self::Handle, Self::Error> {
        (**self).instantiate(template)
    }

    fn set_parent(
        &self,
        view: Self::Handle,
        parent: Option<Self::Handle>,
    ) -> Result<(), Self::Error> {
        (**self).set_parent(view, parent)
    }

    fn set_active(&self, view: Self::Handle, active: bool) -> Result<(), Self::Error> {
        (**self).set_active(view, active)
    }

    fn destroy(&self, view: Self::Handle) -> Result<(), Self::Error> {
        (**self).destroy(view)
    }

    fn is_destroyed(&self, view: Self::Handle) -> bool {
        (**self).is_destroyed(view)
    }

    fn parent_of(&self, view: Self::Handle) -> Option<Self::Handle> {
        (**self).parent_of(view)
    }

    fn children_of(&self, view: Self::Handle) -> Result<Vec<Self::Handle>, Self::Error> {
        (**self).children_of(view)
    }

    fn on_destroyed(
        &self,
        view: Self::Handle,
        callback: DestroyCallback<Self::Handle>,
    ) -> Result<Self::Observer, Self::Error> {
        (**self).on_destroyed(view, callback)
    }

    fn cancel_on_destroyed(&self, view: Self::Handle, observer: Self::Observer) -> bool {
        (**self).cancel_on_destroyed(view, observer)
    }

    fn with_capability<C, R, F>(&self, view: Self::Handle, f: F) -> Result<Option<R>, Self::Error>
    where
        C: ?Sized + 'static,
        F: FnOnce(&mut C) -> R,
    {
        (**self).with_capability::<C, R, F>(view, f)
    }
}

static_assertions::assert_impl_all!(SharedScene: ViewHost);
static_assertions::assert_impl_all!(Arc<SharedScene>: ViewHost);
