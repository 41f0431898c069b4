//! Signal/slot notifications.
//!
//! A [`Signal`] fans one value out to every connected closure, synchronously
//! and in connection order, on the emitting thread. Lists use signals to
//! announce rows coming and going; the scene uses one to announce swept
//! nodes.
//!
//! The slot list is copied before it is walked, so a slot may connect or
//! disconnect slots on the same signal (itself included) while it runs.
//!
//! # Example
//!
//! ```
//! use lattice_bind_core::Signal;
//!
//! let row_added = Signal::<u32>::new();
//!
//! let conn = row_added.connect(|row| {
//!     println!("row {row} added");
//! });
//!
//! row_added.emit(7);
//! row_added.disconnect(conn);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle to one connected slot, accepted by [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A typed notification with any number of connected slots.
///
/// `Args` is what every slot receives by reference; use `()` for a bare
/// notification and a tuple for several values.
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args: Clone + Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Clone + Send + 'static> Signal<Args> {
    /// An unconnected signal.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect `slot`; it runs on every later emit until disconnected.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Disconnect one slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    /// Disconnect every slot.
    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Suppress (or resume) emission. Slots stay connected.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether emission is suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Call every connected slot with `args`. Does nothing while blocked.
    #[tracing::instrument(skip_all, target = "lattice_bind_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "blocked, emit skipped");
            return;
        }

        let snapshot: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = snapshot.len(), "emit");

        for slot in snapshot {
            slot(&args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<u64>: Send, Sync);
