//! Lifecycle notifications published by the plugin manager.
//!
//! Observers are called synchronously, in subscription order, after the
//! state change they describe has completed. An observer must not call
//! back into the manager that is notifying it.

use std::fmt;

/// A lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    /// Plugin finished loading and is active
    Loaded(String),
    /// Plugin's UI binding is no longer valid; published before `shutdown`
    UiBindingWithdrawn(String),
    /// Plugin was shut down and its module released
    Unloaded(String),
    /// The set of loaded plugins changed
    RegistryChanged,
}

impl PluginEvent {
    /// Plugin the event concerns, if any.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            PluginEvent::Loaded(name)
            | PluginEvent::UiBindingWithdrawn(name)
            | PluginEvent::Unloaded(name) => Some(name),
            PluginEvent::RegistryChanged => None,
        }
    }
}

impl fmt::Display for PluginEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginEvent::Loaded(name) => write!(f, "plugin loaded: {}", name),
            PluginEvent::UiBindingWithdrawn(name) => write!(f, "ui binding withdrawn: {}", name),
            PluginEvent::Unloaded(name) => write!(f, "plugin unloaded: {}", name),
            PluginEvent::RegistryChanged => f.write_str("registry changed"),
        }
    }
}

/// Receiver of lifecycle notifications (typically the presentation layer).
pub trait PluginObserver {
    fn on_event(&self, event: &PluginEvent);
}

impl<F> PluginObserver for F
where
    F: Fn(&PluginEvent),
{
    fn on_event(&self, event: &PluginEvent) {
        self(event)
    }
}

/// Observer that mirrors every event into `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl PluginObserver for LoggingObserver {
    fn on_event(&self, event: &PluginEvent) {
        match event {
            PluginEvent::Loaded(name) => tracing::debug!("Handling plugin loaded: {}", name),
            PluginEvent::UiBindingWithdrawn(name) => {
                tracing::debug!("Withdrawing UI binding: {}", name)
            }
            PluginEvent::Unloaded(name) => tracing::debug!("Handling plugin unloaded: {}", name),
            PluginEvent::RegistryChanged => tracing::trace!("Loaded plugins changed"),
        }
    }
}

/// Handle returned by [`ObserverList::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Ordered list of observers.
#[derive(Default)]
pub struct ObserverList {
    observers: Vec<(ObserverId, Box<dyn PluginObserver>)>,
    next_id: u64,
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("observer_count", &self.observers.len())
            .finish()
    }
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; it receives events after all earlier subscribers.
    pub fn subscribe(&mut self, observer: Box<dyn PluginObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        tracing::debug!("Subscribed observer {:?}", id);
        id
    }

    /// Remove an observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        let removed = self.observers.len() != before;
        if removed {
            tracing::debug!("Unsubscribed observer {:?}", id);
        }
        removed
    }

    /// Deliver an event to every observer.
    pub fn publish(&self, event: &PluginEvent) {
        for (_, observer) in &self.observers {
            observer.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
