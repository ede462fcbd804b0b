//! Signed-in user observable.
//!
//! The board never reads this; the presentation layer subscribes to it to
//! render the profile badge.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl User {
    /// Letter shown in the badge when there is no photo.
    pub fn initial(&self) -> char {
        self.display_name
            .as_deref()
            .and_then(|name| name.chars().next())
            .unwrap_or('U')
    }
}

pub type AuthCallback = Box<dyn Fn(Option<&User>) + Send + Sync>;

pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;

    /// Registers `callback` for sign-in state changes. It is invoked once
    /// right away with the current state. Dropping the returned handle
    /// unsubscribes.
    fn on_auth_state_changed(&self, callback: AuthCallback) -> Subscription;
}

/// Live registration with an [`IdentityProvider`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

type Listener = Arc<dyn Fn(Option<&User>) + Send + Sync>;

#[derive(Default)]
struct AuthState {
    user: Option<User>,
    listeners: Vec<(u64, Listener)>,
    next_listener: u64,
}

/// In-process identity provider; sign-in state is set by the host.
#[derive(Clone, Default)]
pub struct LocalIdentity {
    state: Arc<Mutex<AuthState>>,
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: User) {
        self.set_user(Some(user));
    }

    pub fn sign_out(&self) {
        self.set_user(None);
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        lock_state(&self.state)
    }

    fn set_user(&self, user: Option<User>) {
        let listeners: Vec<Listener> = {
            let mut state = self.lock();
            state.user = user.clone();
            state
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };
        log::info!(
            "auth state changed: {}",
            if user.is_some() { "signed in" } else { "signed out" }
        );
        for listener in listeners {
            listener(user.as_ref());
        }
    }
}

fn lock_state(state: &Mutex<AuthState>) -> MutexGuard<'_, AuthState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl IdentityProvider for LocalIdentity {
    fn current_user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    fn on_auth_state_changed(&self, callback: AuthCallback) -> Subscription {
        let listener: Listener = Arc::from(callback);
        let (key, user) = {
            let mut state = self.lock();
            let key = state.next_listener;
            state.next_listener += 1;
            state.listeners.push((key, Arc::clone(&listener)));
            (key, state.user.clone())
        };
        listener(user.as_ref());

        let state: Weak<Mutex<AuthState>> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                lock_state(&state).listeners.retain(|(k, _)| *k != key);
            }
        })
    }
}
