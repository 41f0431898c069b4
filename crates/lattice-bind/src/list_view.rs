//! The binding manager.
//!
//! A [`ListView`] keeps the views under one container in step with a
//! collection of models. It stamps views out of an inert template, pushes
//! each model into its view through an [`InitStrategy`], and tracks the
//! model ↔ view association until the view goes away, whether through
//! [`ListView::remove_item`], [`ListView::clear`], or the host tearing the
//! view down on its own.
//!
//! # Destruction
//!
//! Every tracked view carries a one-shot destruction observer. Explicit
//! removal asks the host to destroy the view first, then drops the table
//! entry and cancels the observer. The observer deletes by view identity, so
//! whichever path runs second finds nothing to do. A view the host refuses
//! to destroy stays bound. Views destroyed by the host are reported on
//! [`ListViewSignals::item_removed`] like explicit removals.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use lattice_bind::{InitItem, InitStrategy, ListView};
//! use lattice_bind_core::SharedScene;
//!
//! #[derive(Clone, Default)]
//! struct Row {
//!     text: String,
//! }
//!
//! impl InitItem<u32> for Row {
//!     fn init_item(&mut self, model: &u32) {
//!         self.text = format!("item {model}");
//!     }
//! }
//!
//! fn as_init(row: &mut Row) -> &mut (dyn InitItem<u32> + 'static) {
//!     row
//! }
//!
//! let scene = Arc::new(SharedScene::new());
//! let container = scene.create_node("list");
//! let template = scene.create_node("row");
//! scene.set_parent(template, Some(container)).unwrap();
//! scene.add_component(template, Row::default()).unwrap();
//! scene.provide::<Row, dyn InitItem<u32>>(template, as_init).unwrap();
//!
//! let mut list = ListView::new(scene.clone(), container, template).unwrap();
//! let views = list.init([1_u32, 2, 3], &InitStrategy::plain()).unwrap();
//!
//! assert_eq!(views.len(), 3);
//! assert_eq!(list.get_model_for_view::<u32>(views[1]).unwrap(), 2);
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use lattice_bind_core::logging::targets;
use lattice_bind_core::{Signal, ThreadAffinity};
use parking_lot::Mutex;

use crate::error::{BindError, BindResult};
use crate::host::ViewHost;
use crate::model::{Model, ModelKey};
use crate::strategy::InitStrategy;
use crate::table::AssociationTable;

/// Default name for lists created without one.
const DEFAULT_LIST_NAME: &str = "list-view";

/// What [`ListView::add_item`] does with a model that is already bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Bind the new view. The previous view stays in the container but is
    /// no longer tracked.
    #[default]
    Replace,
    /// Fail with [`BindError::DuplicateModel`] before instantiating anything.
    Reject,
}

/// Configuration for creating a ListView.
#[derive(Debug, Clone)]
pub struct ListViewConfig {
    /// Name used in logs.
    pub name: String,
    /// Handling of models that are added twice.
    pub duplicate_policy: DuplicatePolicy,
    /// Deactivate the template when the list is created.
    pub deactivate_template: bool,
}

impl Default for ListViewConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LIST_NAME.to_string(),
            duplicate_policy: DuplicatePolicy::default(),
            deactivate_template: true,
        }
    }
}

impl ListViewConfig {
    /// Create a new configuration with the given name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builder for creating ListViews with custom configuration.
pub struct ListViewBuilder<H: ViewHost> {
    host: H,
    container: H::Handle,
    template: H::Handle,
    config: ListViewConfig,
}

impl<H: ViewHost> ListViewBuilder<H> {
    /// Start a builder for a list over `container`, stamping views from
    /// `template`.
    pub fn new(host: H, container: H::Handle, template: H::Handle) -> Self {
        Self {
            host,
            container,
            template,
            config: ListViewConfig::default(),
        }
    }

    /// Set the name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the duplicate-model policy.
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    /// Set whether the template is deactivated on creation.
    pub fn deactivate_template(mut self, deactivate: bool) -> Self {
        self.config.deactivate_template = deactivate;
        self
    }

    /// Build the list.
    pub fn build(self) -> BindResult<ListView<H>> {
        ListView::with_config(self.host, self.container, self.template, self.config)
    }
}

/// Notifications emitted by a [`ListView`].
pub struct ListViewSignals<V> {
    item_added: Signal<V>,
    item_removed: Signal<V>,
    cleared: Signal<()>,
}

impl<V: Clone + Send + 'static> ListViewSignals<V> {
    fn new() -> Self {
        Self {
            item_added: Signal::new(),
            item_removed: Signal::new(),
            cleared: Signal::new(),
        }
    }

    /// Emitted with the new view after an item is bound.
    pub fn item_added(&self) -> &Signal<V> {
        &self.item_added
    }

    /// Emitted with the view after its binding is removed, explicitly or
    /// because the host destroyed it.
    pub fn item_removed(&self) -> &Signal<V> {
        &self.item_removed
    }

    /// Emitted after a clear that removed anything.
    pub fn cleared(&self) -> &Signal<()> {
        &self.cleared
    }
}

/// State reachable from destruction observers.
struct Shared<V, O> {
    name: String,
    table: Mutex<AssociationTable<V, O>>,
    signals: ListViewSignals<V>,
}

impl<V, O> Shared<V, O>
where
    V: Copy + Eq + Hash + Debug + Send + 'static,
    O: Copy,
{
    /// Host-side destruction path.
    fn forget_view(&self, view: V) {
        let removed = self.table.lock().remove_view(view);
        match removed {
            Some((model, _)) => {
                tracing::debug!(
                    target: targets::LIST_VIEW,
                    list = %self.name,
                    ?view,
                    ?model,
                    "view destroyed by host, binding removed"
                );
                self.signals.item_removed.emit(view);
            }
            None => {
                tracing::trace!(
                    target: targets::LIST_VIEW,
                    list = %self.name,
                    ?view,
                    "destroyed view was not tracked"
                );
            }
        }
    }
}

fn describe(model: &dyn Model) -> String {
    format!("{model:?}")
}

/// Keeps the views under a container synchronized with a set of models.
///
/// All operations must run on the thread that created the list.
pub struct ListView<H: ViewHost> {
    host: H,
    container: H::Handle,
    template: H::Handle,
    config: ListViewConfig,
    shared: Arc<Shared<H::Handle, H::Observer>>,
    affinity: ThreadAffinity,
}

impl<H: ViewHost> ListView<H> {
    /// Create a list over `container`, stamping views from `template`.
    pub fn new(host: H, container: H::Handle, template: H::Handle) -> BindResult<Self> {
        Self::with_config(host, container, template, ListViewConfig::default())
    }

    /// Start a [`ListViewBuilder`].
    pub fn builder(host: H, container: H::Handle, template: H::Handle) -> ListViewBuilder<H> {
        ListViewBuilder::new(host, container, template)
    }

    /// Create a list with a specific configuration.
    pub fn with_config(
        host: H,
        container: H::Handle,
        template: H::Handle,
        config: ListViewConfig,
    ) -> BindResult<Self> {
        if config.deactivate_template {
            host.set_active(template, false).map_err(BindError::host)?;
        }

        tracing::debug!(
            target: targets::LIST_VIEW,
            list = %config.name,
            ?container,
            ?template,
            policy = ?config.duplicate_policy,
            "created list view"
        );

        Ok(Self {
            host,
            container,
            template,
            shared: Arc::new(Shared {
                name: config.name.clone(),
                table: Mutex::new(AssociationTable::new()),
                signals: ListViewSignals::new(),
            }),
            config,
            affinity: ThreadAffinity::current(),
        })
    }

    /// Replace every item with one view per model, in order.
    ///
    /// Returns the new views index-aligned with `models`. A failure aborts
    /// the batch; items added before it stay bound.
    #[tracing::instrument(skip_all, target = "lattice_bind::list_view", level = "debug")]
    pub fn init<M, I>(
        &mut self,
        models: I,
        strategy: &InitStrategy<'_, M, H>,
    ) -> BindResult<Vec<H::Handle>>
    where
        M: Model,
        I: IntoIterator<Item = M>,
    {
        self.affinity
            .debug_assert_same_thread_with_msg("ListView::init called from wrong thread");
        self.clear()?;

        let views = models
            .into_iter()
            .map(|model| self.add_item(model, strategy))
            .collect::<BindResult<Vec<_>>>()?;

        tracing::debug!(
            target: targets::LIST_VIEW,
            list = %self.config.name,
            count = views.len(),
            strategy = strategy.label(),
            "initialized list"
        );
        Ok(views)
    }

    /// Instantiate, attach, activate and initialize one view for `model`.
    ///
    /// A view lacking the strategy's capability is still added and tracked.
    /// On failure after instantiation the new view is destroyed again.
    pub fn add_item<M: Model>(
        &mut self,
        model: M,
        strategy: &InitStrategy<'_, M, H>,
    ) -> BindResult<H::Handle> {
        self.affinity
            .debug_assert_same_thread_with_msg("ListView::add_item called from wrong thread");

        if self.config.duplicate_policy == DuplicatePolicy::Reject
            && self.shared.table.lock().contains_model(&model)
        {
            return Err(BindError::DuplicateModel {
                model: describe(&model),
            });
        }

        let view = self
            .host
            .instantiate(self.template)
            .map_err(BindError::host)?;

        let observer = match self.attach(view, &model, strategy) {
            Ok(observer) => observer,
            Err(err) => {
                if let Err(destroy_err) = self.host.destroy(view) {
                    tracing::warn!(
                        target: targets::LIST_VIEW,
                        list = %self.config.name,
                        ?view,
                        error = %destroy_err,
                        "failed to destroy half-built view"
                    );
                }
                return Err(err);
            }
        };

        let key = ModelKey::new(model);
        let displaced = self
            .shared
            .table
            .lock()
            .insert(key.clone(), view, Some(observer));

        if let Some(old) = displaced {
            if let Some(old_observer) = old.observer {
                self.host.cancel_on_destroyed(old.view, old_observer);
            }
            tracing::warn!(
                target: targets::LIST_VIEW,
                list = %self.config.name,
                model = ?key,
                orphaned = ?old.view,
                "model bound twice, previous view is no longer tracked"
            );
        }

        tracing::trace!(
            target: targets::LIST_VIEW,
            list = %self.config.name,
            ?view,
            model = ?key,
            "item added"
        );
        self.shared.signals.item_added.emit(view);
        Ok(view)
    }

    fn attach<M: Model>(
        &self,
        view: H::Handle,
        model: &M,
        strategy: &InitStrategy<'_, M, H>,
    ) -> BindResult<H::Observer> {
        self.host
            .set_parent(view, Some(self.container))
            .map_err(BindError::host)?;
        self.host.set_active(view, true).map_err(BindError::host)?;

        let initialized = strategy
            .apply(&self.host, view, model)
            .map_err(BindError::host)?;
        if !initialized {
            tracing::trace!(
                target: targets::LIST_VIEW,
                list = %self.config.name,
                ?view,
                strategy = strategy.label(),
                "view lacks the init capability, left as instantiated"
            );
        }

        let shared = Arc::downgrade(&self.shared);
        self.host
            .on_destroyed(
                view,
                Box::new(move |destroyed: H::Handle| {
                    if let Some(shared) = shared.upgrade() {
                        shared.forget_view(destroyed);
                    }
                }),
            )
            .map_err(BindError::host)
    }

    /// Destroy the view bound to `model` and unbind it.
    ///
    /// The binding is gone when this returns even if the host defers the
    /// destruction. If the host refuses to destroy the view, the binding and
    /// its observer are left in place. Returns the destroyed view.
    pub fn remove_item<M: Model>(&mut self, model: &M) -> BindResult<H::Handle> {
        self.affinity
            .debug_assert_same_thread_with_msg("ListView::remove_item called from wrong thread");

        let view = self.shared.table.lock().binding_for(model).map(|b| b.view);
        let Some(view) = view else {
            return Err(BindError::NotFound {
                model: describe(model),
            });
        };

        self.host.destroy(view).map_err(BindError::host)?;

        // A host that notifies synchronously has already unbound the view.
        let removed = self.shared.table.lock().remove_view(view);
        if let Some((key, binding)) = removed {
            if let Some(observer) = binding.observer {
                self.host.cancel_on_destroyed(view, observer);
            }
            tracing::trace!(
                target: targets::LIST_VIEW,
                list = %self.config.name,
                ?view,
                model = ?key,
                "item removed"
            );
            self.shared.signals.item_removed.emit(view);
        }
        Ok(view)
    }

    /// Destroy every child of the container except the template and drop
    /// all bindings. Clearing an empty list does nothing.
    ///
    /// Children are unbound one by one as they are destroyed; if the host
    /// fails part-way, the children not yet destroyed stay bound.
    #[tracing::instrument(skip_all, target = "lattice_bind::list_view", level = "debug")]
    pub fn clear(&mut self) -> BindResult<()> {
        self.affinity
            .debug_assert_same_thread_with_msg("ListView::clear called from wrong thread");

        let children = self
            .host
            .children_of(self.container)
            .map_err(BindError::host)?;

        let mut destroyed = 0;
        let mut unbound = 0;
        for child in children {
            if child == self.template || self.host.is_destroyed(child) {
                continue;
            }
            self.host.destroy(child).map_err(BindError::host)?;
            destroyed += 1;

            let removed = self.shared.table.lock().remove_view(child);
            if let Some((_, binding)) = removed {
                if let Some(observer) = binding.observer {
                    self.host.cancel_on_destroyed(child, observer);
                }
                unbound += 1;
            }
        }

        // Bindings whose views are pending destruction or left the container.
        let rest = self.shared.table.lock().drain();
        for (_, binding) in &rest {
            if let Some(observer) = binding.observer {
                self.host.cancel_on_destroyed(binding.view, observer);
            }
        }
        unbound += rest.len();

        if unbound == 0 && destroyed == 0 {
            return Ok(());
        }

        tracing::debug!(
            target: targets::LIST_VIEW,
            list = %self.config.name,
            unbound,
            destroyed,
            "cleared list"
        );
        self.shared.signals.cleared.emit(());
        Ok(())
    }

    /// The model bound to `view`, as a `T`.
    ///
    /// # Errors
    ///
    /// - [`BindError::NotAChild`] if `view` is not a child of the container
    /// - [`BindError::NotTracked`] if it is a child but not bound
    /// - [`BindError::TypeMismatch`] if the bound model is not a `T`
    pub fn get_model_for_view<T: Model + Clone>(&self, view: H::Handle) -> BindResult<T> {
        let key = self.model_key_for_view(view)?;
        key.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| BindError::TypeMismatch {
                view: format!("{view:?}"),
                expected: std::any::type_name::<T>(),
                actual: key.type_name(),
            })
    }

    /// The type-erased model bound to `view`.
    pub fn model_key_for_view(&self, view: H::Handle) -> BindResult<ModelKey> {
        if self.host.parent_of(view) != Some(self.container) {
            return Err(BindError::NotAChild {
                view: format!("{view:?}"),
            });
        }

        let key = self.shared.table.lock().model_for(view).cloned();
        key.ok_or_else(|| BindError::NotTracked {
            view: format!("{view:?}"),
        })
    }

    /// The view bound to `model`.
    pub fn view_for<M: Model>(&self, model: &M) -> Option<H::Handle> {
        self.shared.table.lock().view_for(model)
    }

    /// Check whether `model` is bound.
    pub fn contains<M: Model>(&self, model: &M) -> bool {
        self.shared.table.lock().contains_model(model)
    }

    /// Number of bound items.
    pub fn len(&self) -> usize {
        self.shared.table.lock().len()
    }

    /// Whether no items are bound.
    pub fn is_empty(&self) -> bool {
        self.shared.table.lock().is_empty()
    }

    /// Bound models, in no particular order.
    pub fn models(&self) -> Vec<ModelKey> {
        self.shared.table.lock().models()
    }

    /// Tracked views, in no particular order.
    pub fn views(&self) -> Vec<H::Handle> {
        self.shared.table.lock().views()
    }

    /// The container views are parented under.
    pub fn container(&self) -> H::Handle {
        self.container
    }

    /// The template views are instantiated from.
    pub fn template(&self) -> H::Handle {
        self.template
    }

    /// The host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The list's configuration.
    pub fn config(&self) -> &ListViewConfig {
        &self.config
    }

    /// The list's notifications.
    pub fn signals(&self) -> &ListViewSignals<H::Handle> {
        &self.shared.signals
    }
}

impl<H: ViewHost> Drop for ListView<H> {
    fn drop(&mut self) {
        // Views belong to the host; only detach our observers.
        let drained = self.shared.table.lock().drain();
        for (_, binding) in drained {
            if let Some(observer) = binding.observer {
                self.host.cancel_on_destroyed(binding.view, observer);
            }
        }
    }
}

static_assertions::assert_impl_all!(ListView<lattice_bind_core::SharedScene>: Send, Sync);
