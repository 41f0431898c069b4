//! Scene tree: the host side of view binding.
//!
//! Provides the node system views live in:
//! - Stable node identifiers via arena-based storage
//! - Parent-child ownership with cascade destruction
//! - Active flags, inherited down the tree
//! - Per-node components with capability queries
//! - Instantiation of a node subtree from a template
//! - Deferred destruction with one-shot destruction observers
//!
//! # Key Types
//!
//! - [`NodeId`] - Unique stable identifier for each node
//! - [`Scene`] - The node arena and all tree operations
//! - [`SharedScene`] - Thread-safe wrapper that also delivers destruction
//!   notifications
//!
//! # Deferred Destruction
//!
//! [`Scene::destroy`] only marks a node. The node stays in the tree (and in
//! its parent's child list) until [`SharedScene::process_destroyed`] (or
//! [`Scene::take_destroyed`]) sweeps it, at which point every observer
//! registered with [`Scene::observe_destroyed`] on the node or any of its
//! descendants fires exactly once.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;

use parking_lot::RwLock;
use slotmap::{Key, SlotMap, new_key_type};

use crate::component::ComponentSet;
use crate::logging::targets;
use crate::signal::Signal;

new_key_type! {
    /// A unique identifier for a node in a [`Scene`].
    ///
    /// `NodeId`s are stable handles that remain valid while the tree changes.
    /// They become invalid once the node is swept after destruction.
    pub struct NodeId;
}

impl NodeId {
    /// Convert the NodeId to a raw u64 value.
    #[inline]
    pub fn as_raw(self) -> u64 {
        self.data().as_ffi()
    }
}

new_key_type! {
    /// Identifies one destruction observer registered on a node.
    pub struct ObserverId;
}

/// A one-shot callback fired when its node is swept.
pub type DestroyObserver = Box<dyn FnOnce(NodeId) + Send + Sync>;

/// Errors that can occur during scene operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The node ID is invalid or the node has been destroyed.
    InvalidNodeId,
    /// Attempted to set a node as its own parent/ancestor.
    CircularParentage,
    /// No component of the requested type is attached to the node.
    ComponentNotFound {
        /// The requested component type name.
        type_name: &'static str,
    },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNodeId => write!(f, "Invalid or destroyed node ID"),
            Self::CircularParentage => {
                write!(f, "Cannot set a node as its own parent or ancestor")
            }
            Self::ComponentNotFound { type_name } => {
                write!(f, "No component of type {type_name} attached to node")
            }
        }
    }
}

impl std::error::Error for SceneError {}

/// Result type for scene operations.
pub type SceneResult<T> = std::result::Result<T, SceneError>;

/// Internal data stored in the arena for each node.
struct NodeData {
    /// Human-readable name for debugging and lookup.
    name: String,
    /// Parent node (if any).
    parent: Option<NodeId>,
    /// Child nodes (owned), in sibling order.
    children: Vec<NodeId>,
    /// The node's own active flag, not considering ancestors.
    active: bool,
    /// Marked for destruction, waiting for the next sweep.
    pending_destroy: bool,
    /// Attached components.
    components: ComponentSet,
    /// One-shot destruction observers.
    observers: SlotMap<ObserverId, DestroyObserver>,
}

impl NodeData {
    fn new(name: String) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            active: true,
            pending_destroy: false,
            components: ComponentSet::new(),
            observers: SlotMap::with_key(),
        }
    }
}

/// Observers collected from a swept node, ready to be fired.
///
/// Returned by [`Scene::take_destroyed`] so the caller can fire observers
/// after releasing any lock guarding the scene.
pub struct DestroyedNode {
    id: NodeId,
    name: String,
    observers: Vec<DestroyObserver>,
}

impl DestroyedNode {
    /// The ID the node had.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The name the node had.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of observers waiting to fire.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Fire every observer, consuming them.
    pub fn notify(self) {
        let id = self.id;
        for observer in self.observers {
            observer(id);
        }
    }
}

impl fmt::Debug for DestroyedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestroyedNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// The node arena and tree operations.
///
/// Uses arena-based storage via SlotMap for stable node IDs and efficient
/// parent-child relationship management.
pub struct Scene {
    nodes: SlotMap<NodeId, NodeData>,
    /// Nodes marked by [`Scene::destroy`], in marking order.
    pending: Vec<NodeId>,
}

impl Scene {
    /// Create a new empty scene.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            pending: Vec::new(),
        }
    }

    /// Create a new active root node.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let id = self.nodes.insert(NodeData::new(name));
        tracing::trace!(target: targets::SCENE, ?id, "created node");
        id
    }

    /// Check if a node exists (marked nodes still exist until swept).
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn node(&self, id: NodeId) -> SceneResult<&NodeData> {
        self.nodes.get(id).ok_or(SceneError::InvalidNodeId)
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut NodeData> {
        self.nodes.get_mut(id).ok_or(SceneError::InvalidNodeId)
    }

    /// Get the node's name.
    pub fn name(&self, id: NodeId) -> SceneResult<&str> {
        self.node(id).map(|d| d.name.as_str())
    }

    /// Set the node's name.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> SceneResult<()> {
        self.node_mut(id).map(|d| d.name = name.into())
    }

    /// Set the parent of a node.
    ///
    /// This handles removing from the old parent and adding to the new parent.
    /// Passing `None` makes the node a root node.
    pub fn set_parent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> SceneResult<()> {
        if !self.nodes.contains_key(id) {
            return Err(SceneError::InvalidNodeId);
        }

        if let Some(parent_id) = new_parent {
            if !self.nodes.contains_key(parent_id) {
                return Err(SceneError::InvalidNodeId);
            }
            if self.is_ancestor_of(id, parent_id) {
                return Err(SceneError::CircularParentage);
            }
        }

        self.detach_from_parent(id);

        if let Some(data) = self.nodes.get_mut(id) {
            data.parent = new_parent;
        }

        if let Some(parent_id) = new_parent {
            if let Some(parent_data) = self.nodes.get_mut(parent_id) {
                parent_data.children.push(id);
            }
        }

        Ok(())
    }

    fn detach_from_parent(&mut self, id: NodeId) {
        let old_parent = self.nodes.get(id).and_then(|d| d.parent);
        if let Some(old_parent_id) = old_parent {
            if let Some(parent_data) = self.nodes.get_mut(old_parent_id) {
                parent_data.children.retain(|&child| child != id);
            }
        }
    }

    /// Check if `potential_ancestor` is `id` or one of its ancestors.
    fn is_ancestor_of(&self, potential_ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == potential_ancestor {
                return true;
            }
            current = self.nodes.get(current_id).and_then(|d| d.parent);
        }
        false
    }

    /// Get the parent of a node.
    pub fn parent(&self, id: NodeId) -> SceneResult<Option<NodeId>> {
        self.node(id).map(|d| d.parent)
    }

    /// Get the children of a node.
    pub fn children(&self, id: NodeId) -> SceneResult<&[NodeId]> {
        self.node(id).map(|d| d.children.as_slice())
    }

    /// Find a direct child by name.
    pub fn find_child_by_name(&self, id: NodeId, name: &str) -> SceneResult<Option<NodeId>> {
        let children = self.children(id)?;
        Ok(children
            .iter()
            .copied()
            .find(|&child| self.nodes.get(child).is_some_and(|d| d.name == name)))
    }

    /// Set the node's own active flag.
    pub fn set_active(&mut self, id: NodeId, active: bool) -> SceneResult<()> {
        self.node_mut(id).map(|d| d.active = active)
    }

    /// Get the node's own active flag, not considering ancestors.
    pub fn is_active(&self, id: NodeId) -> SceneResult<bool> {
        self.node(id).map(|d| d.active)
    }

    /// Check if a node is active in the hierarchy (itself and all ancestors
    /// are active).
    pub fn is_active_in_hierarchy(&self, id: NodeId) -> SceneResult<bool> {
        let data = self.node(id)?;
        if !data.active {
            return Ok(false);
        }

        let mut current = data.parent;
        while let Some(current_id) = current {
            match self.nodes.get(current_id) {
                Some(ancestor) if !ancestor.active => return Ok(false),
                Some(ancestor) => current = ancestor.parent,
                None => break,
            }
        }

        Ok(true)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Get the node's component set.
    pub fn components(&self, id: NodeId) -> SceneResult<&ComponentSet> {
        self.node(id).map(|d| &d.components)
    }

    /// Get the node's component set mutably.
    pub fn components_mut(&mut self, id: NodeId) -> SceneResult<&mut ComponentSet> {
        self.node_mut(id).map(|d| &mut d.components)
    }

    /// Attach a component to a node.
    pub fn add_component<T: Any + Clone + Send + Sync>(
        &mut self,
        id: NodeId,
        component: T,
    ) -> SceneResult<()> {
        self.components_mut(id)?.insert(component);
        Ok(())
    }

    /// Register capability `C` for the node's component of type `T`.
    pub fn provide<T, C>(&mut self, id: NodeId, cast: fn(&mut T) -> &mut C) -> SceneResult<()>
    where
        T: Any + Send + Sync,
        C: ?Sized + 'static,
    {
        if self.components_mut(id)?.provide(cast) {
            Ok(())
        } else {
            Err(SceneError::ComponentNotFound {
                type_name: std::any::type_name::<T>(),
            })
        }
    }

    /// Get the node's first component of type `T`.
    pub fn component<T: Any>(&self, id: NodeId) -> SceneResult<Option<&T>> {
        self.components(id).map(|c| c.get::<T>())
    }

    /// View one of the node's components as capability `C`.
    pub fn query_mut<C: ?Sized + 'static>(&mut self, id: NodeId) -> SceneResult<Option<&mut C>> {
        self.components_mut(id).map(|c| c.query_mut::<C>())
    }

    // =========================================================================
    // Instantiation
    // =========================================================================

    /// Create a copy of a node and its whole subtree.
    ///
    /// Names, active flags, components and capabilities are copied. The copy
    /// is a new root node; destruction observers and pending-destroy marks
    /// are not copied.
    #[tracing::instrument(skip(self), target = "lattice_bind_core::scene", level = "trace")]
    pub fn instantiate(&mut self, template: NodeId) -> SceneResult<NodeId> {
        let copy = self.clone_subtree(template)?;
        tracing::trace!(target: targets::SCENE, ?template, ?copy, "instantiated node");
        Ok(copy)
    }

    fn clone_subtree(&mut self, source: NodeId) -> SceneResult<NodeId> {
        let source_data = self.node(source)?;
        let mut data = NodeData::new(source_data.name.clone());
        data.active = source_data.active;
        data.components = source_data.components.clone();
        let source_children = source_data.children.clone();

        let copy = self.nodes.insert(data);
        for child in source_children {
            let child_copy = self.clone_subtree(child)?;
            self.set_parent(child_copy, Some(copy))?;
        }
        Ok(copy)
    }

    // =========================================================================
    // Destruction
    // =========================================================================

    /// Mark a node (and implicitly its subtree) for destruction.
    ///
    /// The node is removed by the next sweep. Marking an already marked node
    /// is a no-op.
    pub fn destroy(&mut self, id: NodeId) -> SceneResult<()> {
        let data = self.node_mut(id)?;
        if data.pending_destroy {
            return Ok(());
        }
        data.pending_destroy = true;
        self.pending.push(id);
        tracing::trace!(target: targets::SCENE, ?id, "marked node for destruction");
        Ok(())
    }

    /// Check if a node is marked for destruction.
    pub fn is_pending_destroy(&self, id: NodeId) -> SceneResult<bool> {
        self.node(id).map(|d| d.pending_destroy)
    }

    /// Number of nodes marked and waiting for the next sweep.
    pub fn pending_destroy_count(&self) -> usize {
        self.pending.len()
    }

    /// Remove every marked node and its descendants.
    ///
    /// Returns the swept nodes (descendants before their parents) with their
    /// observers, which the caller must fire via [`DestroyedNode::notify`].
    #[tracing::instrument(skip(self), target = "lattice_bind_core::scene", level = "trace")]
    pub fn take_destroyed(&mut self) -> Vec<DestroyedNode> {
        let pending = std::mem::take(&mut self.pending);
        let mut swept = Vec::new();
        for id in pending {
            // Already swept as part of a marked ancestor.
            if self.nodes.contains_key(id) {
                swept.extend(self.remove_subtree(id));
            }
        }
        if !swept.is_empty() {
            tracing::debug!(target: targets::SCENE, count = swept.len(), "swept destroyed nodes");
        }
        swept
    }

    /// Remove a node and its descendants right away.
    ///
    /// Returns the removed nodes for notification, like
    /// [`Scene::take_destroyed`].
    pub fn destroy_immediate(&mut self, id: NodeId) -> SceneResult<Vec<DestroyedNode>> {
        if !self.nodes.contains_key(id) {
            return Err(SceneError::InvalidNodeId);
        }
        Ok(self.remove_subtree(id))
    }

    fn remove_subtree(&mut self, id: NodeId) -> Vec<DestroyedNode> {
        let mut order = Vec::new();
        self.collect_postorder(id, &mut order);

        self.detach_from_parent(id);

        let removed: HashSet<NodeId> = order.iter().copied().collect();
        self.pending.retain(|pending| !removed.contains(pending));

        order
            .into_iter()
            .filter_map(|node_id| {
                self.nodes.remove(node_id).map(|data| DestroyedNode {
                    id: node_id,
                    name: data.name,
                    observers: data.observers.into_iter().map(|(_, o)| o).collect(),
                })
            })
            .collect()
    }

    /// Collect `id` and its descendants, children before parents.
    fn collect_postorder(&self, id: NodeId, result: &mut Vec<NodeId>) {
        if let Some(data) = self.nodes.get(id) {
            for &child in &data.children {
                self.collect_postorder(child, result);
            }
            result.push(id);
        }
    }

    /// Register a one-shot observer fired when the node is swept.
    pub fn observe_destroyed(
        &mut self,
        id: NodeId,
        observer: DestroyObserver,
    ) -> SceneResult<ObserverId> {
        self.node_mut(id).map(|d| d.observers.insert(observer))
    }

    /// Remove a destruction observer before it fires.
    ///
    /// Returns `false` if the node or the observer no longer exists.
    pub fn unobserve_destroyed(&mut self, id: NodeId, observer: ObserverId) -> bool {
        self.nodes
            .get_mut(id)
            .is_some_and(|d| d.observers.remove(observer).is_some())
    }

    /// Get the number of nodes in the scene.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over all root nodes (nodes with no parent).
    pub fn root_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, data)| data.parent.is_none())
            .map(|(id, _)| id)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// A thread-safe wrapper around [`Scene`].
///
/// Provides concurrent read access with exclusive write access via `RwLock`,
/// and owns the delivery of destruction notifications: observers always fire
/// after the lock is released, so they may call back into the scene.
pub struct SharedScene {
    inner: RwLock<Scene>,
    node_destroyed: Signal<NodeId>,
}

impl SharedScene {
    /// Create a new shared scene.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Scene::new()),
            node_destroyed: Signal::new(),
        }
    }

    /// Signal emitted once for every swept node, after its observers fired.
    pub fn node_destroyed(&self) -> &Signal<NodeId> {
        &self.node_destroyed
    }

    /// Create a new active root node.
    pub fn create_node(&self, name: impl Into<String>) -> NodeId {
        self.inner.write().create_node(name)
    }

    /// Check if a node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.read().contains(id)
    }

    /// Get the node's name.
    pub fn name(&self, id: NodeId) -> SceneResult<String> {
        self.inner.read().name(id).map(|s| s.to_string())
    }

    /// Set the parent of a node.
    pub fn set_parent(&self, id: NodeId, parent: Option<NodeId>) -> SceneResult<()> {
        self.inner.write().set_parent(id, parent)
    }

    /// Get the parent of a node.
    pub fn parent(&self, id: NodeId) -> SceneResult<Option<NodeId>> {
        self.inner.read().parent(id)
    }

    /// Get the children of a node (returns owned Vec for thread safety).
    pub fn children(&self, id: NodeId) -> SceneResult<Vec<NodeId>> {
        self.inner.read().children(id).map(|c| c.to_vec())
    }

    /// Set the node's own active flag.
    pub fn set_active(&self, id: NodeId, active: bool) -> SceneResult<()> {
        self.inner.write().set_active(id, active)
    }

    /// Get the node's own active flag.
    pub fn is_active(&self, id: NodeId) -> SceneResult<bool> {
        self.inner.read().is_active(id)
    }

    /// Check if a node is active in the hierarchy.
    pub fn is_active_in_hierarchy(&self, id: NodeId) -> SceneResult<bool> {
        self.inner.read().is_active_in_hierarchy(id)
    }

    /// Attach a component to a node.
    pub fn add_component<T: Any + Clone + Send + Sync>(
        &self,
        id: NodeId,
        component: T,
    ) -> SceneResult<()> {
        self.inner.write().add_component(id, component)
    }

    /// Register capability `C` for the node's component of type `T`.
    pub fn provide<T, C>(&self, id: NodeId, cast: fn(&mut T) -> &mut C) -> SceneResult<()>
    where
        T: Any + Send + Sync,
        C: ?Sized + 'static,
    {
        self.inner.write().provide(id, cast)
    }

    /// Run `f` against the node's capability `C`, if present.
    ///
    /// `f` runs under the write lock and must not call back into the scene.
    pub fn with_component<C, R, F>(&self, id: NodeId, f: F) -> SceneResult<Option<R>>
    where
        C: ?Sized + 'static,
        F: FnOnce(&mut C) -> R,
    {
        let mut scene = self.inner.write();
        Ok(scene.query_mut::<C>(id)?.map(f))
    }

    /// Create a copy of a node and its subtree.
    pub fn instantiate(&self, template: NodeId) -> SceneResult<NodeId> {
        self.inner.write().instantiate(template)
    }

    /// Mark a node for destruction.
    pub fn destroy(&self, id: NodeId) -> SceneResult<()> {
        self.inner.write().destroy(id)
    }

    /// Check if a node is marked for destruction.
    pub fn is_pending_destroy(&self, id: NodeId) -> SceneResult<bool> {
        self.inner.read().is_pending_destroy(id)
    }

    /// Sweep marked nodes and deliver their destruction notifications.
    ///
    /// Returns the number of nodes removed.
    pub fn process_destroyed(&self) -> usize {
        let swept = self.inner.write().take_destroyed();
        self.deliver(swept)
    }

    /// Remove a node and its subtree right away, delivering notifications.
    pub fn destroy_immediate(&self, id: NodeId) -> SceneResult<usize> {
        let swept = self.inner.write().destroy_immediate(id)?;
        Ok(self.deliver(swept))
    }

    fn deliver(&self, swept: Vec<DestroyedNode>) -> usize {
        let count = swept.len();
        for node in swept {
            let id = node.id();
            node.notify();
            self.node_destroyed.emit(id);
        }
        count
    }

    /// Register a one-shot destruction observer.
    pub fn observe_destroyed(
        &self,
        id: NodeId,
        observer: DestroyObserver,
    ) -> SceneResult<ObserverId> {
        self.inner.write().observe_destroyed(id, observer)
    }

    /// Remove a destruction observer before it fires.
    pub fn unobserve_destroyed(&self, id: NodeId, observer: ObserverId) -> bool {
        self.inner.write().unobserve_destroyed(id, observer)
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.read().node_count()
    }

    /// Access the scene with a read lock for complex operations.
    pub fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Scene) -> R,
    {
        f(&self.inner.read())
    }

    /// Access the scene with a write lock for complex operations.
    ///
    /// Swept nodes returned by [`Scene::take_destroyed`] inside `f` are not
    /// delivered automatically; use [`SharedScene::process_destroyed`].
    pub fn with_write<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Scene) -> R,
    {
        f(&mut self.inner.write())
    }
}

impl Default for SharedScene {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(SharedScene: Send, Sync);
