//! Thread affinity checks.
//!
//! A list and the views it binds belong to the UI thread that built them.
//! [`ThreadAffinity`] remembers that thread so entry points can check they
//! were not reached from elsewhere.
//!
//! ```
//! use lattice_bind_core::thread_check::ThreadAffinity;
//!
//! struct RowCache {
//!     owner: ThreadAffinity,
//! }
//!
//! impl RowCache {
//!     fn refresh(&self) {
//!         self.owner.debug_assert_same_thread_with_msg("RowCache::refresh");
//!     }
//! }
//!
//! RowCache { owner: ThreadAffinity::current() }.refresh();
//! ```

use std::thread::{self, ThreadId};

/// The thread an object is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// The owning thread.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.owner
    }

    /// Whether the caller runs on the owning thread.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panic unless called on the owning thread.
    #[inline]
    pub fn assert_same_thread(&self) {
        self.assert_same_thread_with_msg("accessed off its owning thread");
    }

    /// Panic with `context` unless called on the owning thread.
    pub fn assert_same_thread_with_msg(&self, context: &str) {
        if self.is_same_thread() {
            return;
        }
        wrong_thread(self.owner, context);
    }

    /// [`assert_same_thread`](Self::assert_same_thread) in debug builds,
    /// nothing in release builds.
    #[inline]
    pub fn debug_assert_same_thread(&self) {
        #[cfg(debug_assertions)]
        self.assert_same_thread();
    }

    /// [`assert_same_thread_with_msg`](Self::assert_same_thread_with_msg) in
    /// debug builds, nothing in release builds.
    #[inline]
    pub fn debug_assert_same_thread_with_msg(&self, context: &str) {
        #[cfg(debug_assertions)]
        self.assert_same_thread_with_msg(context);
        #[cfg(not(debug_assertions))]
        let _ = context;
    }
}

#[cold]
#[inline(never)]
fn wrong_thread(owner: ThreadId, context: &str) -> ! {
    let caller = thread::current();
    panic!(
        "thread affinity violated: {context}\n\
         owner thread: {owner:?}\n\
         calling thread: {:?} ({:?})\n\
         lists and their views must stay on the thread that created them",
        caller.name().unwrap_or("<unnamed>"),
        caller.id(),
    );
}
