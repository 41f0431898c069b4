//! Item initialization strategies.
//!
//! Every strategy reduces to one primitive: run a function over the model
//! and one capability of the freshly instantiated view. [`InitStrategy::plain`]
//! and [`InitStrategy::with_args`] are thin adapters over
//! [`InitStrategy::custom`] targeting the [`InitItem`] and [`InitItemWith`]
//! capabilities.
//!
//! A view that does not expose the targeted capability is left as is.

use std::fmt;

use crate::host::ViewHost;

/// A view that can be initialized from a model.
pub trait InitItem<M> {
    /// Push `model` into the view.
    fn init_item(&mut self, model: &M);
}

/// A view that can be initialized from a model plus shared arguments.
pub trait InitItemWith<M, A> {
    /// Push `model` into the view, with the batch-wide `args`.
    fn init_item_with(&mut self, model: &M, args: &A);
}

type ApplyFn<'a, M, H> = Box<
    dyn Fn(&H, <H as ViewHost>::Handle, &M) -> Result<bool, <H as ViewHost>::Error> + 'a,
>;

/// How a [`ListView`](crate::ListView) initializes each new view.
pub struct InitStrategy<'a, M, H: ViewHost> {
    label: &'static str,
    apply: ApplyFn<'a, M, H>,
}

impl<'a, M: 'static, H: ViewHost> InitStrategy<'a, M, H> {
    /// Initialize through capability `C` with a caller-supplied function.
    ///
    /// `C` may be a concrete component type or a `dyn Trait` the view
    /// provides.
    pub fn custom<C, F>(f: F) -> Self
    where
        C: ?Sized + 'static,
        F: Fn(&M, &mut C) + 'a,
    {
        Self {
            label: "custom",
            apply: Box::new(move |host: &H, view: H::Handle, model: &M| {
                host.with_capability::<C, _, _>(view, |capability| f(model, capability))
                    .map(|applied| applied.is_some())
            }),
        }
    }

    /// Initialize through [`InitItem`].
    pub fn plain() -> Self {
        Self::custom::<dyn InitItem<M>, _>(|model, view| view.init_item(model)).labeled("plain")
    }

    /// Initialize through [`InitItemWith`], passing the same `args` to every
    /// item.
    pub fn with_args<A: 'static>(args: A) -> Self {
        Self::custom::<dyn InitItemWith<M, A>, _>(move |model, view| {
            view.init_item_with(model, &args)
        })
        .labeled("with_args")
    }

    fn labeled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Short name of the strategy kind, for logs.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Initialize `view` with `model`.
    ///
    /// Returns `Ok(false)` when the view lacks the capability.
    pub fn apply(&self, host: &H, view: H::Handle, model: &M) -> Result<bool, H::Error> {
        (self.apply)(host, view, model)
    }
}

impl<M, H: ViewHost> fmt::Debug for InitStrategy<'_, M, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitStrategy")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
