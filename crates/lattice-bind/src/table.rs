//! The model to view association table.
//!
//! Keeps a forward map (model → binding) and a reverse index (view → model)
//! in lock-step, so both directions resolve in O(1). Every mutation goes
//! through a method that updates both maps.

use std::collections::HashMap;
use std::hash::Hash;

use crate::model::{Model, ModelKey};

/// A tracked view and the destruction observer registered on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding<V, O> {
    /// The bound view.
    pub view: V,
    /// The destruction observer, if one was registered.
    pub observer: Option<O>,
}

/// Bidirectional model ↔ view association table.
#[derive(Debug)]
pub struct AssociationTable<V, O> {
    forward: HashMap<ModelKey, Binding<V, O>>,
    reverse: HashMap<V, ModelKey>,
}

impl<V, O> Default for AssociationTable<V, O> {
    fn default() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }
}

impl<V, O> AssociationTable<V, O>
where
    V: Copy + Eq + Hash,
    O: Copy,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `model` to `view`.
    ///
    /// Last write wins: a binding already present for `model` is displaced
    /// and returned, and its view is dropped from the reverse index.
    pub fn insert(&mut self, model: ModelKey, view: V, observer: Option<O>) -> Option<Binding<V, O>> {
        // A view is bound to at most one model.
        if let Some(previous_model) = self.reverse.remove(&view) {
            self.forward.remove(&previous_model);
        }

        let displaced = self
            .forward
            .insert(model.clone(), Binding { view, observer });
        if let Some(old) = &displaced {
            self.reverse.remove(&old.view);
        }
        self.reverse.insert(view, model);
        displaced
    }

    /// Unbind `model`, returning its key and binding.
    pub fn remove_model(&mut self, model: &dyn Model) -> Option<(ModelKey, Binding<V, O>)> {
        let (key, binding) = self.forward.remove_entry(model)?;
        self.reverse.remove(&binding.view);
        Some((key, binding))
    }

    /// Unbind whatever model `view` is bound to.
    ///
    /// Keyed by view identity: a view that was displaced by a later binding
    /// for the same model removes nothing.
    pub fn remove_view(&mut self, view: V) -> Option<(ModelKey, Binding<V, O>)> {
        let key = self.reverse.remove(&view)?;
        let binding = self.forward.remove(&key)?;
        Some((key, binding))
    }

    /// The model bound to `view`.
    pub fn model_for(&self, view: V) -> Option<&ModelKey> {
        self.reverse.get(&view)
    }

    /// The view bound to `model`.
    pub fn view_for(&self, model: &dyn Model) -> Option<V> {
        self.forward.get(model).map(|binding| binding.view)
    }

    /// The full binding for `model`.
    pub fn binding_for(&self, model: &dyn Model) -> Option<&Binding<V, O>> {
        self.forward.get(model)
    }

    /// Check whether `model` is bound.
    pub fn contains_model(&self, model: &dyn Model) -> bool {
        self.forward.contains_key(model)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Bound models, in no particular order.
    pub fn models(&self) -> Vec<ModelKey> {
        self.forward.keys().cloned().collect()
    }

    /// Tracked views, in no particular order.
    pub fn views(&self) -> Vec<V> {
        self.reverse.keys().copied().collect()
    }

    /// Remove every binding.
    pub fn drain(&mut self) -> Vec<(ModelKey, Binding<V, O>)> {
        self.reverse.clear();
        self.forward.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Table = AssociationTable<u32, u8>;

    fn key<M: Model>(model: M) -> ModelKey {
        ModelKey::new(model)
    }

    #[test]
    fn test_insert_and_lookup_both_ways() {
        let mut table = Table::new();
        assert!(table.insert(key(1), 10, Some(0)).is_none());
        assert!(table.insert(key("b"), 20, None).is_none());

        assert_eq!(table.view_for(&1), Some(10));
        assert_eq!(table.view_for(&"b"), Some(20));
        assert_eq!(table.model_for(10), Some(&key(1)));
        assert_eq!(table.model_for(30), None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.model_for(20), Some(&key("b")));
    }

    #[test]
    fn test_last_write_wins() {
        let mut table = Table::new();
        table.insert(key(1), 10, Some(1));

        let displaced = table.insert(key(1), 11, Some(2));
        assert_eq!(
            displaced,
            Some(Binding {
                view: 10,
                observer: Some(1)
            })
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.view_for(&1), Some(11));
        assert_eq!(table.model_for(10), None);

        // The orphaned view no longer removes anything.
        assert!(table.remove_view(10).is_none());
        assert_eq!(table.view_for(&1), Some(11));
    }

    #[test]
    fn test_rebinding_a_view_drops_its_old_model() {
        let mut table = Table::new();
        table.insert(key(1), 10, None);
        table.insert(key(2), 10, None);

        assert_eq!(table.len(), 1);
        assert!(!table.contains_model(&1));
        assert_eq!(table.model_for(10), Some(&key(2)));
    }

    #[test]
    fn test_remove_paths_converge() {
        let mut table = Table::new();
        table.insert(key(1), 10, None);
        table.insert(key(2), 20, None);

        let (model, binding) = table.remove_model(&1).unwrap();
        assert_eq!(model, key(1));
        assert_eq!(binding.view, 10);
        assert!(table.remove_view(10).is_none());

        assert!(table.remove_view(20).is_some());
        assert!(table.remove_model(&2).is_none());
        assert!(table.is_empty());
        assert!(table.views().is_empty());
    }

    #[test]
    fn test_drain() {
        let mut table = Table::new();
        for i in 0..4_u32 {
            table.insert(key(i), i * 10, None);
        }

        let mut drained: Vec<u32> = table.drain().into_iter().map(|(_, b)| b.view).collect();
        drained.sort_unstable();
        assert_eq!(drained, vec![0, 10, 20, 30]);
        assert!(table.is_empty());
        assert!(table.model_for(10).is_none());
    }
}
