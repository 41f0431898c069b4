//! Core systems for lattice-bind.
//!
//! This crate provides the reference host the binding manager runs against:
//!
//! - **Scene Tree**: Arena-backed nodes with parent-child ownership, active
//!   flags and template instantiation
//! - **Deferred Destruction**: Nodes are marked, then swept; one-shot
//!   observers fire exactly once per swept node
//! - **Components**: Per-node component storage with capability queries
//! - **Signal/Slot System**: Type-safe notifications
//! - **Thread Affinity**: Checks that UI-thread objects stay on their thread
//!
//! # Scene Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use lattice_bind_core::SharedScene;
//!
//! let scene = SharedScene::new();
//! let list = scene.create_node("list");
//! let template = scene.create_node("row-template");
//! scene.set_parent(template, Some(list)).unwrap();
//!
//! // Stamp out a row and watch for its destruction.
//! let row = scene.instantiate(template).unwrap();
//! scene.set_parent(row, Some(list)).unwrap();
//!
//! let destroyed = Arc::new(AtomicUsize::new(0));
//! let counter = destroyed.clone();
//! scene
//!     .observe_destroyed(row, Box::new(move |_| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     }))
//!     .unwrap();
//!
//! scene.destroy(row).unwrap();
//! assert_eq!(destroyed.load(Ordering::SeqCst), 0);
//!
//! scene.process_destroyed();
//! assert_eq!(destroyed.load(Ordering::SeqCst), 1);
//! assert_eq!(scene.children(list).unwrap(), vec![template]);
//! ```

pub mod component;
pub mod logging;
pub mod scene;
pub mod signal;
pub mod thread_check;

pub use component::{Component, ComponentSet};
pub use logging::{SceneTreeDebug, TreeFormatOptions, TreeStyle};
pub use scene::{
    DestroyObserver, DestroyedNode, NodeId, ObserverId, Scene, SceneError, SceneResult,
    SharedScene,
};
pub use signal::{ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
