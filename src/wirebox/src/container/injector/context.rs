use std::collections::HashMap;

use parking_lot::Mutex;

use crate::container::injector::DeferredFill;
use crate::container::SharedManaged;
use crate::key::Key;

/// The chain of requests leading to the current provisioning call, plus the
/// per-request scratch space used for cycle handling.
#[derive(Clone)]
pub struct CallContext<'a> {
    trace: InjectionTrace<'a>,
    store: Option<&'a ConstructionStore>,
}

impl<'a> CallContext<'a> {
    pub fn new(key: &'a dyn Key) -> Self {
        Self {
            trace: InjectionTrace::new(key),
            store: None,
        }
    }

    pub(crate) fn with_store(key: &'a dyn Key, store: &'a ConstructionStore) -> Self {
        Self {
            trace: InjectionTrace::new(key),
            store: Some(store),
        }
    }

    pub fn append<'b>(&'b self, key: &'b dyn Key) -> CallContext<'b> {
        CallContext {
            trace: self.trace.append(key),
            store: self.store,
        }
    }

    pub fn key(&self) -> &dyn Key {
        self.trace.key()
    }

    pub fn trace(&self) -> &InjectionTrace<'_> {
        &self.trace
    }

    pub(crate) fn store(&self) -> Option<&ConstructionStore> {
        self.store
    }
}

/// A linked list of the keys requested on the way to the current one,
/// allocated on the call stack.
#[derive(Clone)]
pub struct InjectionTrace<'a> {
    key: &'a dyn Key,
    previous: Option<&'a InjectionTrace<'a>>,
}

impl<'a> InjectionTrace<'a> {
    pub fn new(key: &'a dyn Key) -> Self {
        Self {
            key,
            previous: None,
        }
    }

    pub fn append<'b>(&'b self, key: &'b dyn Key) -> InjectionTrace<'b> {
        InjectionTrace {
            key,
            previous: Some(self),
        }
    }

    pub fn key(&self) -> &dyn Key {
        self.key
    }

    pub fn previous(&self) -> Option<&InjectionTrace<'a>> {
        self.previous
    }

    /// Whether `key` already appears among the ancestors of this request.
    pub fn previous_exist_key(&self, key: &dyn Key) -> bool {
        let mut this = self;
        while let Some(previous) = this.previous() {
            if previous.key() == key {
                return true;
            }
            this = previous;
        }
        false
    }
}

/// Per-request bookkeeping of constructions in flight, keyed by binding key.
///
/// While a key is marked as constructing, deferred handles for it register a
/// fill callback here instead of recursing; the callbacks run when the
/// construction finishes, which is what lets a cycle close without the
/// constructor ever observing a half-built dependency.
#[derive(Default)]
pub(crate) struct ConstructionStore {
    states: Mutex<HashMap<Box<dyn Key>, ConstructionState>>,
}

#[derive(Default)]
struct ConstructionState {
    constructing: bool,
    fills: Vec<DeferredFill>,
}

impl ConstructionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as under construction for the rest of this request.
    pub fn begin(&self, key: &dyn Key) {
        self.states
            .lock()
            .entry(key.dyn_clone())
            .or_default()
            .constructing = true;
    }

    /// Hands `fill` to the in-flight construction of `key`, or gives it back
    /// when no such construction exists.
    pub fn offer_fill(&self, key: &dyn Key, fill: DeferredFill) -> Option<DeferredFill> {
        let mut states = self.states.lock();
        match states.get_mut(key) {
            Some(state) if state.constructing => {
                state.fills.push(fill);
                None
            }
            _ => Some(fill),
        }
    }

    /// Ends the construction of `key`. On success the registered fills each
    /// receive their own handle to the constructed object; on failure they
    /// are dropped and the deferred handles stay empty.
    pub fn complete(&self, key: &dyn Key, object: Option<&dyn SharedManaged>) {
        let state = self.states.lock().remove(key);
        let Some(state) = state else {
            return;
        };
        if let Some(object) = object {
            for fill in state.fills {
                fill(object.dyn_clone().upcast_managed());
            }
        }
    }
}
