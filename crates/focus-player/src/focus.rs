//! Audio focus capability and a minimal in-process arbiter.
//!
//! [`FocusArbiter`] grants focus to one client at a time. Granting focus to a new
//! client takes it from the previous holder, which is told through its
//! [`FocusListener`]. An interruption (for example an incoming call) takes focus from
//! everyone until it ends, then hands it back to the interrupted holder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Exclusive audio-output permission, as seen by one client.
pub trait FocusManager: Send + Sync {
    /// Ask for focus. `true` when granted.
    fn request_focus(&self) -> bool;
    /// Give focus up if held.
    fn release_focus(&self);
    /// Register the listener told about focus gain/loss. Replaces any earlier one.
    fn set_focus_listener(&self, listener: Arc<dyn FocusListener>);
}

/// Receives focus changes from a [`FocusManager`].
pub trait FocusListener: Send + Sync {
    fn on_focus_changed(&self, is_gained: bool);
}

/// Process-local focus arbiter shared by several [`FocusClient`]s.
pub struct FocusArbiter {
    state: Mutex<ArbiterState>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct ArbiterState {
    holder: Option<u64>,
    interrupted: bool,
    resume_to: Option<u64>,
    listeners: HashMap<u64, Arc<dyn FocusListener>>,
}

impl FocusArbiter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ArbiterState::default()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Create a new client handle bound to this arbiter.
    pub fn client(self: &Arc<Self>) -> FocusClient {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        FocusClient {
            id,
            arbiter: self.clone(),
        }
    }

    /// Take focus from the current holder until [`end_interruption`](Self::end_interruption).
    ///
    /// Requests are denied while interrupted. Returns `false` if already interrupted.
    pub fn interrupt(&self) -> bool {
        let notify = {
            let mut st = self.lock();
            if st.interrupted {
                return false;
            }
            st.interrupted = true;
            st.resume_to = st.holder.take();
            st.resume_to.and_then(|id| st.listeners.get(&id).cloned())
        };
        tracing::info!("audio focus interrupted");
        if let Some(listener) = notify {
            listener.on_focus_changed(false);
        }
        true
    }

    /// End an interruption, returning focus to the client that held it before.
    ///
    /// Returns `false` if no interruption was active.
    pub fn end_interruption(&self) -> bool {
        let notify = {
            let mut st = self.lock();
            if !st.interrupted {
                return false;
            }
            st.interrupted = false;
            st.holder = st.resume_to.take();
            st.holder.and_then(|id| st.listeners.get(&id).cloned())
        };
        tracing::info!("audio focus interruption ended");
        if let Some(listener) = notify {
            listener.on_focus_changed(true);
        }
        true
    }

    pub fn is_interrupted(&self) -> bool {
        self.lock().interrupted
    }

    fn request(&self, id: u64) -> bool {
        let notify = {
            let mut st = self.lock();
            if st.interrupted {
                tracing::debug!(client = id, "focus request denied during interruption");
                return false;
            }
            match st.holder.replace(id) {
                Some(prev) if prev != id => st.listeners.get(&prev).cloned(),
                _ => None,
            }
        };
        if let Some(listener) = notify {
            listener.on_focus_changed(false);
        }
        true
    }

    fn release(&self, id: u64) {
        let mut st = self.lock();
        if st.holder == Some(id) {
            st.holder = None;
        }
        if st.resume_to == Some(id) {
            st.resume_to = None;
        }
    }

    fn holds(&self, id: u64) -> bool {
        self.lock().holder == Some(id)
    }

    fn lock(&self) -> MutexGuard<'_, ArbiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One client of a [`FocusArbiter`]. Dropping it gives up focus.
pub struct FocusClient {
    id: u64,
    arbiter: Arc<FocusArbiter>,
}

impl FocusClient {
    pub fn has_focus(&self) -> bool {
        self.arbiter.holds(self.id)
    }
}

impl FocusManager for FocusClient {
    fn request_focus(&self) -> bool {
        self.arbiter.request(self.id)
    }

    fn release_focus(&self) {
        self.arbiter.release(self.id);
    }

    fn set_focus_listener(&self, listener: Arc<dyn FocusListener>) {
        self.arbiter.lock().listeners.insert(self.id, listener);
    }
}

impl Drop for FocusClient {
    fn drop(&mut self) {
        self.arbiter.release(self.id);
        self.arbiter.lock().listeners.remove(&self.id);
    }
}
