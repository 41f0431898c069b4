//! Integration tests for ListView against the scene host.

use std::collections::HashSet;
use std::sync::Arc;

use lattice_bind::{
    BindError, DestroyCallback, DuplicatePolicy, InitItem, InitItemWith, InitStrategy, ListView,
    ListViewConfig, ViewHost,
};
use lattice_bind_core::{NodeId, ObserverId, SceneError, SharedScene};
use parking_lot::Mutex;

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lattice_bind=trace")
        .with_test_writer()
        .try_init();
}

/// A row view that can be initialized with or without a prefix.
#[derive(Clone, Default)]
struct ContactRow {
    label: String,
    inits: u32,
}

impl InitItem<i32> for ContactRow {
    fn init_item(&mut self, model: &i32) {
        self.label = model.to_string();
        self.inits += 1;
    }
}

impl InitItemWith<i32, String> for ContactRow {
    fn init_item_with(&mut self, model: &i32, prefix: &String) {
        self.label = format!("{prefix}{model}");
        self.inits += 1;
    }
}

fn as_init(row: &mut ContactRow) -> &mut (dyn InitItem<i32> + 'static) {
    row
}

fn as_init_with(
    row: &mut ContactRow,
) -> &mut (dyn InitItemWith<i32, String> + 'static) {
    row
}

struct Fixture {
    scene: Arc<SharedScene>,
    container: NodeId,
    template: NodeId,
}

impl Fixture {
    fn new() -> Self {
        setup();
        let scene = Arc::new(SharedScene::new());
        let container = scene.create_node("contacts");
        let template = scene.create_node("contact-row");
        scene.set_parent(template, Some(container)).unwrap();
        scene.add_component(template, ContactRow::default()).unwrap();
        scene
            .provide::<ContactRow, dyn InitItem<i32>>(template, as_init)
            .unwrap();
        scene
            .provide::<ContactRow, dyn InitItemWith<i32, String>>(template, as_init_with)
            .unwrap();
        Self {
            scene,
            container,
            template,
        }
    }

    fn list(&self) -> ListView<Arc<SharedScene>> {
        ListView::new(self.scene.clone(), self.container, self.template).unwrap()
    }

    fn label(&self, view: NodeId) -> Option<String> {
        self.scene
            .with_component::<ContactRow, _, _>(view, |row| row.label.clone())
            .unwrap()
    }

    /// Children of the container that are neither the template nor awaiting
    /// destruction.
    fn live_rows(&self) -> Vec<NodeId> {
        self.scene
            .children(self.container)
            .unwrap()
            .into_iter()
            .filter(|&child| {
                child != self.template && !self.scene.is_pending_destroy(child).unwrap()
            })
            .collect()
    }
}

/// Scene host whose `instantiate` and `destroy` can be limited to a number
/// of successful calls.
struct FlakyHost {
    scene: Arc<SharedScene>,
    instantiate_budget: Mutex<Option<usize>>,
    destroy_budget: Mutex<Option<usize>>,
}

impl FlakyHost {
    fn new(scene: Arc<SharedScene>) -> Arc<Self> {
        Arc::new(Self {
            scene,
            instantiate_budget: Mutex::new(None),
            destroy_budget: Mutex::new(None),
        })
    }

    fn spend(budget: &Mutex<Option<usize>>) -> Result<(), SceneError> {
        match &mut *budget.lock() {
            None => Ok(()),
            Some(0) => Err(SceneError::InvalidNodeId),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
        }
    }
}

impl ViewHost for FlakyHost {
    type Handle = NodeId;
    type Observer = ObserverId;
    type Error = SceneError;

    fn instantiate(&self, template: NodeId) -> Result<NodeId, SceneError> {
        Self::spend(&self.instantiate_budget)?;
        ViewHost::instantiate(&*self.scene, template)
    }

    fn set_parent(&self, view: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        ViewHost::set_parent(&*self.scene, view, parent)
    }

    fn set_active(&self, view: NodeId, active: bool) -> Result<(), SceneError> {
        ViewHost::set_active(&*self.scene, view, active)
    }

    fn destroy(&self, view: NodeId) -> Result<(), SceneError> {
        Self::spend(&self.destroy_budget)?;
        ViewHost::destroy(&*self.scene, view)
    }

    fn is_destroyed(&self, view: NodeId) -> bool {
        ViewHost::is_destroyed(&*self.scene, view)
    }

    fn parent_of(&self, view: NodeId) -> Option<NodeId> {
        ViewHost::parent_of(&*self.scene, view)
    }

    fn children_of(&self, view: NodeId) -> Result<Vec<NodeId>, SceneError> {
        ViewHost::children_of(&*self.scene, view)
    }

    fn on_destroyed(
        &self,
        view: NodeId,
        callback: DestroyCallback<NodeId>,
    ) -> Result<ObserverId, SceneError> {
        ViewHost::on_destroyed(&*self.scene, view, callback)
    }

    fn cancel_on_destroyed(&self, view: NodeId, observer: ObserverId) -> bool {
        ViewHost::cancel_on_destroyed(&*self.scene, view, observer)
    }

    fn with_capability<C, R, F>(&self, view: NodeId, f: F) -> Result<Option<R>, SceneError>
    where
        C: ?Sized + 'static,
        F: FnOnce(&mut C) -> R,
    {
        ViewHost::with_capability::<C, R, F>(&*self.scene, view, f)
    }
}

fn keys<H: ViewHost>(list: &ListView<H>) -> HashSet<i32> {
    list.models()
        .iter()
        .filter_map(|key| key.downcast_ref::<i32>().copied())
        .collect()
}

#[test]
fn test_init_binds_one_view_per_model_in_order() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let models = [4, 8, 15, 16, 23, 42];

    let views = list.init(models, &InitStrategy::plain()).unwrap();

    assert_eq!(views.len(), models.len());
    assert_eq!(list.len(), models.len());
    for (model, view) in models.iter().zip(&views) {
        assert_eq!(list.view_for(model), Some(*view));
        assert_eq!(list.get_model_for_view::<i32>(*view).unwrap(), *model);
        assert_eq!(fx.label(*view), Some(model.to_string()));
    }

    // Views follow the template in sibling order.
    let mut expected = vec![fx.template];
    expected.extend(&views);
    assert_eq!(fx.scene.children(fx.container).unwrap(), expected);
}

#[test]
fn test_init_twice_rebuilds_the_same_keys() {
    let fx = Fixture::new();
    let mut list = fx.list();

    let first = list.init([1, 2, 3], &InitStrategy::plain()).unwrap();
    let second = list.init([1, 2, 3], &InitStrategy::plain()).unwrap();

    assert_eq!(keys(&list), HashSet::from([1, 2, 3]));
    assert!(first.iter().all(|view| !second.contains(view)));

    fx.scene.process_destroyed();
    assert_eq!(fx.live_rows(), second);
    assert_eq!(list.len(), 3);
}

#[test]
fn test_init_with_args_shares_one_value() {
    let fx = Fixture::new();
    let mut list = fx.list();

    let views = list
        .init([7, 9], &InitStrategy::with_args("#".to_string()))
        .unwrap();

    assert_eq!(fx.label(views[0]).as_deref(), Some("#7"));
    assert_eq!(fx.label(views[1]).as_deref(), Some("#9"));
}

#[test]
fn test_init_custom_targets_any_capability() {
    let fx = Fixture::new();
    let mut list = fx.list();

    let strategy = InitStrategy::custom::<ContactRow, _>(|model: &i32, row: &mut ContactRow| {
        row.label = format!("contact #{model}");
    });
    let views = list.init([5], &strategy).unwrap();

    assert_eq!(fx.label(views[0]).as_deref(), Some("contact #5"));
}

#[test]
fn test_missing_capability_still_tracks_view() {
    setup();
    let scene = Arc::new(SharedScene::new());
    let container = scene.create_node("list");
    let template = scene.create_node("bare-row");
    scene.set_parent(template, Some(container)).unwrap();
    let mut list = ListView::new(scene.clone(), container, template).unwrap();

    let view = list.add_item(1, &InitStrategy::plain()).unwrap();

    assert!(scene.is_active(view).unwrap());
    assert_eq!(scene.parent(view).unwrap(), Some(container));
    assert_eq!(list.get_model_for_view::<i32>(view).unwrap(), 1);
}

#[test]
fn test_remove_unknown_model_is_not_found() {
    let fx = Fixture::new();
    let mut list = fx.list();
    list.add_item(1, &InitStrategy::plain()).unwrap();

    let err = list.remove_item(&2).unwrap_err();
    assert!(matches!(err, BindError::NotFound { ref model } if model == "2"));

    // Same value, different type.
    let err = list.remove_item(&1_i64).unwrap_err();
    assert!(matches!(err, BindError::NotFound { .. }));
    assert_eq!(list.len(), 1);
}

#[test]
fn test_lookup_after_remove_is_not_tracked_then_not_a_child() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let view = list.add_item(1, &InitStrategy::plain()).unwrap();
    assert_eq!(list.get_model_for_view::<i32>(view).unwrap(), 1);

    assert_eq!(list.remove_item(&1).unwrap(), view);
    assert!(!list.contains(&1));

    // Destruction is deferred: still a child, no longer tracked.
    assert!(matches!(
        list.get_model_for_view::<i32>(view),
        Err(BindError::NotTracked { .. })
    ));

    fx.scene.process_destroyed();
    assert!(matches!(
        list.get_model_for_view::<i32>(view),
        Err(BindError::NotAChild { .. })
    ));
}

#[test]
fn test_host_destruction_removes_exactly_one_binding() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let views = list.init([1, 2, 3], &InitStrategy::plain()).unwrap();

    fx.scene.destroy(views[1]).unwrap();
    assert_eq!(list.len(), 3);
    fx.scene.process_destroyed();

    assert_eq!(keys(&list), HashSet::from([1, 3]));
    assert_eq!(list.view_for(&1), Some(views[0]));
}

#[test]
fn test_host_destruction_after_remove_is_harmless() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let views = list.init([1, 2], &InitStrategy::plain()).unwrap();

    list.remove_item(&1).unwrap();
    fx.scene.destroy(views[0]).unwrap();
    fx.scene.process_destroyed();

    assert_eq!(keys(&list), HashSet::from([2]));
    assert!(list.remove_item(&1).is_err());
}

#[test]
fn test_removed_signal_fires_once_per_view() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let removed = Arc::new(Mutex::new(Vec::new()));
    let removed_clone = removed.clone();
    list.signals()
        .item_removed()
        .connect(move |view| removed_clone.lock().push(*view));

    let views = list.init([1, 2], &InitStrategy::plain()).unwrap();
    list.remove_item(&1).unwrap();
    fx.scene.destroy(views[1]).unwrap();
    fx.scene.process_destroyed();

    assert_eq!(*removed.lock(), vec![views[0], views[1]]);
}

#[test]
fn test_clear_with_only_template_is_a_no_op() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let cleared = Arc::new(Mutex::new(0));
    let cleared_clone = cleared.clone();
    list.signals()
        .cleared()
        .connect(move |_| *cleared_clone.lock() += 1);

    list.clear().unwrap();
    list.clear().unwrap();

    assert_eq!(*cleared.lock(), 0);
    assert_eq!(fx.scene.children(fx.container).unwrap(), vec![fx.template]);
    assert!(fx.scene.contains(fx.template));
}

#[test]
fn test_clear_leaves_no_bindings_and_no_live_rows() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let cleared = Arc::new(Mutex::new(0));
    let cleared_clone = cleared.clone();
    list.signals()
        .cleared()
        .connect(move |_| *cleared_clone.lock() += 1);

    list.init([1, 2, 3], &InitStrategy::plain()).unwrap();
    list.clear().unwrap();
    // Pending views are skipped, so a second clear changes nothing.
    list.clear().unwrap();

    assert!(list.is_empty());
    assert!(fx.live_rows().is_empty());
    assert_eq!(*cleared.lock(), 1);

    fx.scene.process_destroyed();
    assert_eq!(fx.scene.children(fx.container).unwrap(), vec![fx.template]);
    assert!(list.is_empty());
}

#[test]
fn test_clear_destroys_foreign_children_too() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let foreign = fx.scene.create_node("foreign");
    fx.scene.set_parent(foreign, Some(fx.container)).unwrap();

    assert!(matches!(
        list.get_model_for_view::<i32>(foreign),
        Err(BindError::NotTracked { .. })
    ));

    list.clear().unwrap();
    assert!(fx.scene.is_pending_destroy(foreign).unwrap());
    assert!(!fx.scene.is_pending_destroy(fx.template).unwrap());
}

#[test]
fn test_lookup_rejects_template_and_outsiders() {
    let fx = Fixture::new();
    let list = fx.list();
    let outsider = fx.scene.create_node("outsider");

    assert!(matches!(
        list.get_model_for_view::<i32>(fx.template),
        Err(BindError::NotTracked { .. })
    ));
    assert!(matches!(
        list.get_model_for_view::<i32>(outsider),
        Err(BindError::NotAChild { .. })
    ));
    assert!(matches!(
        list.get_model_for_view::<i32>(fx.container),
        Err(BindError::NotAChild { .. })
    ));
}

#[test]
fn test_duplicate_model_replaces_by_default() {
    let fx = Fixture::new();
    let mut list = fx.list();

    let first = list.add_item(1, &InitStrategy::plain()).unwrap();
    let second = list.add_item(1, &InitStrategy::plain()).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list.view_for(&1), Some(second));
    // The first view is orphaned: still a live child, no longer tracked.
    assert_eq!(fx.live_rows(), vec![first, second]);
    assert!(matches!(
        list.get_model_for_view::<i32>(first),
        Err(BindError::NotTracked { .. })
    ));

    // Destroying the orphan leaves the live binding alone.
    fx.scene.destroy(first).unwrap();
    fx.scene.process_destroyed();
    assert_eq!(list.view_for(&1), Some(second));
}

#[test]
fn test_duplicate_model_rejected_when_configured() {
    let fx = Fixture::new();
    let config = ListViewConfig {
        duplicate_policy: DuplicatePolicy::Reject,
        ..ListViewConfig::with_name("unique-contacts")
    };
    let mut list =
        ListView::with_config(fx.scene.clone(), fx.container, fx.template, config).unwrap();

    list.add_item(1, &InitStrategy::plain()).unwrap();
    let err = list.add_item(1, &InitStrategy::plain()).unwrap_err();

    assert!(matches!(err, BindError::DuplicateModel { .. }));
    assert_eq!(fx.live_rows().len(), 1);
    assert_eq!(list.config().name, "unique-contacts");
}

#[test]
fn test_models_of_mixed_types_share_one_list() {
    let fx = Fixture::new();
    let mut list = fx.list();

    let number = list.add_item(1, &InitStrategy::plain()).unwrap();
    let text = list
        .add_item("1".to_string(), &InitStrategy::plain())
        .unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list.get_model_for_view::<String>(text).unwrap(), "1");
    assert_eq!(list.get_model_for_view::<i32>(number).unwrap(), 1);
    // The String row has no InitItem<String> capability, so it keeps the
    // template's label.
    assert_eq!(fx.label(text).as_deref(), Some(""));
}

#[test]
fn test_added_signal_reports_each_view() {
    let fx = Fixture::new();
    let mut list = fx.list();
    let added = Arc::new(Mutex::new(Vec::new()));
    let added_clone = added.clone();
    list.signals()
        .item_added()
        .connect(move |view| added_clone.lock().push(*view));

    let views = list.init([1, 2, 3], &InitStrategy::plain()).unwrap();

    assert_eq!(*added.lock(), views);
}

#[test]
fn test_scenario_remove_and_typed_lookup() {
    let fx = Fixture::new();
    let mut list = fx.list();

    let views = list.init([1, 2, 3], &InitStrategy::plain()).unwrap();
    assert_eq!(keys(&list), HashSet::from([1, 2, 3]));

    list.remove_item(&2).unwrap();
    assert_eq!(keys(&list), HashSet::from([1, 3]));

    assert_eq!(list.get_model_for_view::<i32>(views[0]).unwrap(), 1);
    let err = list.get_model_for_view::<String>(views[0]).unwrap_err();
    match err {
        BindError::TypeMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, std::any::type_name::<String>());
            assert_eq!(actual, "i32");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn test_failed_destroy_keeps_item_bound() {
    let fx = Fixture::new();
    let host = FlakyHost::new(fx.scene.clone());
    let mut list = ListView::new(host.clone(), fx.container, fx.template).unwrap();
    let removed = Arc::new(Mutex::new(Vec::new()));
    let removed_clone = removed.clone();
    list.signals()
        .item_removed()
        .connect(move |view| removed_clone.lock().push(*view));

    let view = list.add_item(1, &InitStrategy::plain()).unwrap();
    *host.destroy_budget.lock() = Some(0);

    let err = list.remove_item(&1).unwrap_err();
    assert!(matches!(err, BindError::Host(_)));
    assert!(list.contains(&1));
    assert_eq!(list.get_model_for_view::<i32>(view).unwrap(), 1);
    assert!(removed.lock().is_empty());

    // The destruction observer is still registered.
    fx.scene.destroy(view).unwrap();
    fx.scene.process_destroyed();
    assert!(list.is_empty());
    assert_eq!(*removed.lock(), vec![view]);
}

#[test]
fn test_remove_retries_after_failed_destroy() {
    let fx = Fixture::new();
    let host = FlakyHost::new(fx.scene.clone());
    let mut list = ListView::new(host.clone(), fx.container, fx.template).unwrap();
    let view = list.add_item(1, &InitStrategy::plain()).unwrap();

    *host.destroy_budget.lock() = Some(0);
    assert!(list.remove_item(&1).is_err());

    *host.destroy_budget.lock() = None;
    assert_eq!(list.remove_item(&1).unwrap(), view);
    assert!(list.is_empty());
    assert!(fx.scene.is_pending_destroy(view).unwrap());
}

#[test]
fn test_failed_destroy_during_clear_keeps_remaining_rows_bound() {
    let fx = Fixture::new();
    let host = FlakyHost::new(fx.scene.clone());
    let mut list = ListView::new(host.clone(), fx.container, fx.template).unwrap();
    let views = list.init([1, 2, 3], &InitStrategy::plain()).unwrap();

    *host.destroy_budget.lock() = Some(1);
    assert!(matches!(list.clear(), Err(BindError::Host(_))));

    assert_eq!(keys(&list), HashSet::from([2, 3]));
    assert!(fx.scene.is_pending_destroy(views[0]).unwrap());
    assert_eq!(fx.live_rows(), vec![views[1], views[2]]);

    *host.destroy_budget.lock() = None;
    list.clear().unwrap();
    assert!(list.is_empty());
    assert!(fx.live_rows().is_empty());
}

#[test]
fn test_init_failure_keeps_earlier_items_and_stops() {
    let fx = Fixture::new();
    let host = FlakyHost::new(fx.scene.clone());
    let mut list = ListView::new(host.clone(), fx.container, fx.template).unwrap();

    *host.instantiate_budget.lock() = Some(2);
    let err = list.init([1, 2, 3, 4], &InitStrategy::plain()).unwrap_err();

    assert!(matches!(err, BindError::Host(_)));
    assert_eq!(list.len(), 2);
    assert_eq!(keys(&list), HashSet::from([1, 2]));
    assert!(!list.contains(&3));
    assert!(!list.contains(&4));
    assert_eq!(fx.live_rows().len(), 2);
}
