// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Event System
//!
//! Typed observers for connection and proximity events. Each subsystem
//! defines its own event enum and owns one dispatcher for it.

use std::sync::Arc;

/// Event handler trait.
///
/// Implement this trait to receive events of type `E`.
pub trait EventHandler<E>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: E);
}

/// Simple callback-based event handler.
///
/// Wraps a closure for easy event handling.
pub struct CallbackHandler<F> {
    callback: F,
}

impl<F> CallbackHandler<F> {
    /// Creates a new callback handler.
    pub fn new(callback: F) -> Self {
        CallbackHandler { callback }
    }
}

impl<E, F> EventHandler<E> for CallbackHandler<F>
where
    F: Fn(E) + Send + Sync,
{
    fn on_event(&self, event: E) {
        (self.callback)(event);
    }
}

/// Event dispatcher for managing multiple handlers.
pub struct EventDispatcher<E> {
    handlers: Vec<Arc<dyn EventHandler<E>>>,
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        EventDispatcher {
            handlers: Vec::new(),
        }
    }
}

impl<E: Clone> EventDispatcher<E> {
    /// Creates a new event dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event handler.
    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler<E>>) {
        self.handlers.push(handler);
    }

    /// Removes all handlers.
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches an event to all handlers.
    pub fn dispatch(&self, event: E) {
        for handler in &self.handlers {
            handler.on_event(event.clone());
        }
    }

    /// Dispatches a batch of events in order.
    pub fn dispatch_all(&self, events: Vec<E>) {
        for event in events {
            self.dispatch(event);
        }
    }
}
