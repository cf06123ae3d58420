use crate::{AuthChangeEvent, AuthStateCallback, Session};
use std::sync::{Arc, Mutex, Weak};

type SharedCallback = Arc<dyn Fn(AuthChangeEvent, Option<&Session>) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
    entries: Mutex<Vec<(u64, SharedCallback)>>,
    next_id: Mutex<u64>,
}

impl Listeners {
    pub(crate) fn subscribe(self: &Arc<Self>, callback: AuthStateCallback) -> Subscription {
        let id = {
            let mut next_id = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next_id += 1;
            *next_id
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::from(callback)));
        Subscription {
            id,
            listeners: Arc::downgrade(self),
        }
    }

    /// Invokes every registered callback. Callbacks run outside the lock, so they may
    /// unsubscribe themselves.
    pub(crate) fn notify(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let callbacks: Vec<SharedCallback> = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(event, session);
        }
    }

    fn remove(&self, id: u64) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(entry_id, _)| *entry_id != id);
    }
}

/// Handle returned by [`crate::AuthClient::on_auth_state_change`].
///
/// Dropping the handle leaves the listener registered; call [`Subscription::unsubscribe`] to
/// remove it.
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub(crate) fn inert() -> Self {
        Self {
            id: 0,
            listeners: Weak::new(),
        }
    }

    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}
