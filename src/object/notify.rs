//! Change notification events.
//!
//! [`Event`] is a single-threaded handler registry backed by a slotmap, so
//! handler ids stay valid (and stale ids stay harmless) across arbitrary
//! subscribe/unsubscribe sequences. Dispatch snapshots the registry first:
//! handlers may subscribe or unsubscribe (themselves or others) while an
//! emission is in flight.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Identifies a subscribed handler inside an [`Event`].
    pub struct HandlerId;
}

type Handler<A> = Rc<dyn Fn(&A)>;

/// A multicast notification with payload `A`.
pub struct Event<A: ?Sized + 'static> {
    handlers: RefCell<SlotMap<HandlerId, Handler<A>>>,
}

impl<A: ?Sized + 'static> Event<A> {
    /// Create an event with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(SlotMap::with_key()),
        }
    }

    /// Register `handler`; it runs on every subsequent [`emit`](Self::emit).
    pub fn subscribe(&self, handler: impl Fn(&A) + 'static) -> HandlerId {
        self.handlers.borrow_mut().insert(Rc::new(handler))
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.handlers.borrow_mut().remove(id).is_some()
    }

    /// Invoke every handler with `args`.
    ///
    /// A handler removed by an earlier handler during the same emission is
    /// skipped. Handlers added during the emission first run on the next one.
    pub fn emit(&self, args: &A) {
        let snapshot: Vec<(HandlerId, Handler<A>)> = self
            .handlers
            .borrow()
            .iter()
            .map(|(id, h)| (id, Rc::clone(h)))
            .collect();

        for (id, handler) in snapshot {
            if self.handlers.borrow().contains_key(id) {
                handler(args);
            }
        }
    }

    /// Number of subscribed handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Whether no handler is subscribed.
    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }
}

impl<A: ?Sized + 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Raised with the name of the property that changed.
pub type PropertyChangedEvent = Event<str>;

/// Raised when the items of a collection change.
pub type CollectionChangedEvent = Event<CollectionChange>;

/// What happened to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    Added { index: usize },
    Removed { index: usize },
    Replaced { index: usize },
    /// The contents changed wholesale (clear, or an unordered collection).
    Reset,
}

/// Property name raised alongside collection changes, for observers that only
/// understand property notifications.
pub const ITEM_INDEXER_NAME: &str = "Item[]";
