//! Model/view binding for lattice-bind.
//!
//! A [`ListView`] keeps a set of view instances, owned by a [`ViewHost`],
//! synchronized with a collection of models:
//!
//! - **Bulk synchronization**: [`ListView::init`] replaces every item with
//!   one view per model, in order
//! - **Single items**: [`ListView::add_item`] and [`ListView::remove_item`]
//! - **Reverse lookup**: [`ListView::get_model_for_view`] maps a view back
//!   to its model, checking ownership and model type
//! - **Host-driven teardown**: views destroyed by the host drop their
//!   binding exactly once
//!
//! Views are initialized through [`InitStrategy`], which targets an optional
//! capability of the view ([`InitItem`], [`InitItemWith`], or any type the
//! caller picks). Views without the capability are still added.
//!
//! [`lattice_bind_core::SharedScene`] implements [`ViewHost`] and is the
//! reference host.

mod error;
pub mod host;
mod list_view;
pub mod model;
pub mod strategy;
pub mod table;

pub use error::{BindError, BindResult};
pub use host::{DestroyCallback, ViewHost};
pub use list_view::{DuplicatePolicy, ListView, ListViewBuilder, ListViewConfig, ListViewSignals};
pub use model::{Model, ModelKey};
pub use strategy::{InitItem, InitItemWith, InitStrategy};
pub use table::{AssociationTable, Binding};
