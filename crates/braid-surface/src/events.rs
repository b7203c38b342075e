//! Typed publish/subscribe for controller events.

use std::collections::BTreeMap;

use braid_delta::Delta;

use crate::types::UpdateInfo;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// What the controller announces to its subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    /// An update cycle finished; the surface shows current decorated
    /// content.
    Updated(UpdateInfo),
    /// A reconciled change failed schema validation and was dropped whole;
    /// the surface was re-rendered from canonical content.
    ChangeRejected { change: Delta },
}

/// Subscriber registry for one event type.
///
/// Single-threaded, like the controller that owns it. Handlers run in
/// subscription order.
pub struct EventBus<E> {
    handlers: BTreeMap<u64, Box<dyn Fn(&E)>>,
    next_id: u64,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.insert(id, Box::new(handler));
        SubscriptionId(id)
    }

    /// Remove a handler. Returns whether it was still registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.handlers.remove(&id.0).is_some()
    }

    pub fn emit(&self, event: &E) {
        for handler in self.handlers.values() {
            handler(event);
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
