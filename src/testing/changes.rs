//! Change log helpers.
//!
//! [`ChangeLog`] listens to an object's notifications and renders them as
//! plain text lines, suitable for snapshot assertions.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::object::{Bindable, HandlerId};

// ---------------------------------------------------------------------------
// ChangeLog
// ---------------------------------------------------------------------------

/// Records every notification raised by one object until dropped.
///
/// Property changes are logged as the property name, collection changes as
/// their `Debug` form.
pub struct ChangeLog {
    object: Weak<dyn Bindable>,
    lines: Rc<RefCell<Vec<String>>>,
    property: Option<HandlerId>,
    collection: Option<HandlerId>,
}

impl ChangeLog {
    /// Start recording notifications from `object`.
    pub fn watch(object: &Rc<dyn Bindable>) -> Self {
        let lines = Rc::new(RefCell::new(Vec::new()));

        let property = object.property_changed().map(|event| {
            let lines = Rc::clone(&lines);
            event.subscribe(move |name| lines.borrow_mut().push(name.to_string()))
        });
        let collection = object.collection_changed().map(|event| {
            let lines = Rc::clone(&lines);
            event.subscribe(move |change| lines.borrow_mut().push(format!("{change:?}")))
        });

        Self {
            object: Rc::downgrade(object),
            lines,
            property,
            collection,
        }
    }

    /// Drain the recorded lines.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }

    /// Drain the recorded lines joined by `'\n'`.
    pub fn take_text(&self) -> String {
        self.take().join("\n")
    }
}

impl Drop for ChangeLog {
    fn drop(&mut self) {
        let Some(object) = self.object.upgrade() else {
            return;
        };
        if let (Some(event), Some(id)) = (object.property_changed(), self.property) {
            event.unsubscribe(id);
        }
        if let (Some(event), Some(id)) = (object.collection_changed(), self.collection) {
            event.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObservableList;

    #[test]
    fn records_collection_and_property_changes() {
        let list = Rc::new(ObservableList::new());
        let object: Rc<dyn Bindable> = list.clone();
        let log = ChangeLog::watch(&object);

        list.push(1i32);
        insta::assert_snapshot!(log.take_text(), @r"
        Added { index: 0 }
        Count
        Item[]
        ");
        assert!(log.take().is_empty());
    }

    #[test]
    fn drop_unsubscribes() {
        let list = Rc::new(ObservableList::new());
        let object: Rc<dyn Bindable> = list.clone();
        {
            let _log = ChangeLog::watch(&object);
            assert_eq!(list.property_changed().map(|e| e.handler_count()), Some(1));
        }
        assert_eq!(list.property_changed().map(|e| e.handler_count()), Some(0));
        assert_eq!(list.collection_changed().map(|e| e.handler_count()), Some(0));
    }
}
