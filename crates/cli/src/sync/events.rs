// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Observer lists with disposable subscriptions.
//!
//! Callbacks run synchronously on the emitting task, outside the registry
//! lock, so a callback may subscribe or unsubscribe without deadlocking.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A list of callbacks notified with `&T`.
pub struct Listeners<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Listeners { registry: Arc::clone(&self.registry) }
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Listeners {
            registry: Arc::new(Mutex::new(Registry { next_id: 0, entries: Vec::new() })),
        }
    }

    /// Register a callback. It stays registered until the returned
    /// [`Subscription`] is disposed or dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                lock(&registry).entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Notify every registered callback, in registration order.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> =
            lock(&self.registry).entries.iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by every `on_*` registration.
///
/// Dropping it unsubscribes; call [`Subscription::detach`] to keep the
/// callback for the lifetime of the source instead.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Subscription { dispose: Some(Box::new(dispose)) }
    }

    /// Unsubscribe now.
    pub fn dispose(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    /// Keep the callback registered without holding the handle.
    pub fn detach(mut self) {
        self.dispose = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.dispose.is_some()).finish()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
