//! Synchronous publish/subscribe, shared by component nodes, lists and caches.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Handle returned by [`Emitter::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<P> = Box<dyn FnMut(&P)>;

/// Named event hooks. Listeners of one event run in registration order.
pub struct Emitter<K, P> {
    next_id: u64,
    listeners: HashMap<K, Vec<(ListenerId, Callback<P>)>>,
}

impl<K, P> Default for Emitter<K, P> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: HashMap::new(),
        }
    }
}

impl<K: fmt::Debug + Eq + Hash, P> fmt::Debug for Emitter<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&K, usize> = self.listeners.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("Emitter").field("listeners", &counts).finish()
    }
}

impl<K: Eq + Hash, P> Emitter<K, P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, event: K, callback: impl FnMut(&P) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(event)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Remove a listener. Returns false if it was not registered for `event`.
    pub fn off(&mut self, event: &K, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        before != listeners.len()
    }

    pub fn emit(&mut self, event: &K, payload: &P) {
        if let Some(listeners) = self.listeners.get_mut(event) {
            for (_, callback) in listeners.iter_mut() {
                callback(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut emitter: Emitter<&str, i32> = Emitter::new();
        let l1 = log.clone();
        emitter.on("add", move |n| l1.borrow_mut().push(format!("first {n}")));
        let l2 = log.clone();
        emitter.on("add", move |n| l2.borrow_mut().push(format!("second {n}")));
        let l3 = log.clone();
        emitter.on("remove", move |n| l3.borrow_mut().push(format!("remove {n}")));

        emitter.emit(&"add", &1);
        assert_eq!(*log.borrow(), vec!["first 1", "second 1"]);
    }

    #[test]
    fn test_off() {
        let count = Rc::new(RefCell::new(0));
        let mut emitter: Emitter<&str, ()> = Emitter::new();
        let c = count.clone();
        let id = emitter.on("tick", move |_| *c.borrow_mut() += 1);
        emitter.emit(&"tick", &());
        assert!(emitter.off(&"tick", id));
        assert!(!emitter.off(&"tick", id));
        emitter.emit(&"tick", &());
        assert_eq!(*count.borrow(), 1);
    }
}
