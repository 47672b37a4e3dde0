use std::collections::BTreeMap;

/// Handle returned by [`EventBus::subscribe`], needed to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey(u64);

type Handler<E> = Box<dyn FnMut(&E) + Send>;

/// Typed observer registry. Handlers run in subscription order. Whoever
/// subscribes is responsible for unsubscribing when the observed thing is
/// torn down
pub struct EventBus<E> {
    handlers: BTreeMap<SubscriptionKey, Handler<E>>,
    next_key: u64,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            next_key: 0,
        }
    }

    pub fn subscribe<F: FnMut(&E) + Send + 'static>(&mut self, handler: F) -> SubscriptionKey {
        let key = SubscriptionKey(self.next_key);
        self.next_key += 1;
        self.handlers.insert(key, Box::new(handler));
        key
    }

    /// Returns whether a handler was registered under `key`
    pub fn unsubscribe(&mut self, key: &SubscriptionKey) -> bool {
        self.handlers.remove(key).is_some()
    }

    pub fn publish(&mut self, event: &E) {
        for handler in self.handlers.values_mut() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
