//! Record: a dynamically shaped bindable object.
//!
//! A `Record` declares its properties at construction time instead of through
//! `#[derive(Bindable)]`, which makes it handy for building ad-hoc object
//! graphs in tests and tools.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::object::{AccessError, Bindable, PropertyChangedEvent, PropertyInfo};
use crate::value::{Value, ValueType};

struct Slot {
    info: PropertyInfo,
    value: Value,
}

/// A change-notifying object with a fixed set of named properties.
///
/// # Examples
///
/// ```
/// use console_bind::testing::Record;
/// use console_bind::object::Bindable;
/// use console_bind::Value;
///
/// let person = Record::new("Person").with("Name", "Ada").build();
/// assert_eq!(person.get_value("Name"), Ok(Value::from("Ada")));
/// ```
pub struct Record {
    type_name: String,
    slots: RefCell<BTreeMap<String, Slot>>,
    notifies: bool,
    property_changed: PropertyChangedEvent,
}

impl Record {
    /// Start a record of the given runtime type name.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            slots: RefCell::new(BTreeMap::new()),
            notifies: true,
            property_changed: PropertyChangedEvent::new(),
        }
    }

    /// Declare a writable property accepting any value (builder).
    pub fn with(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.declare(name.into(), ValueType::Any, true, value.into())
    }

    /// Declare a writable property of a fixed type (builder).
    pub fn with_typed(self, name: impl Into<String>, value_type: ValueType, value: impl Into<Value>) -> Self {
        self.declare(name.into(), value_type, true, value.into())
    }

    /// Declare a read-only property (builder).
    pub fn with_readonly(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.declare(name.into(), ValueType::Any, false, value.into())
    }

    /// Do not expose a property change event (builder).
    pub fn silent(mut self) -> Self {
        self.notifies = false;
        self
    }

    /// Finish building.
    pub fn build(self) -> Rc<Self> {
        Rc::new(self)
    }

    fn declare(self, name: String, value_type: ValueType, writable: bool, value: Value) -> Self {
        let info = PropertyInfo {
            name: name.clone(),
            value_type,
            writable,
        };
        self.slots.borrow_mut().insert(name, Slot { info, value });
        self
    }

    /// Current value of `name`, or `Null` if undeclared.
    pub fn get(&self, name: &str) -> Value {
        self.slots
            .borrow()
            .get(name)
            .map(|slot| slot.value.clone())
            .unwrap_or_default()
    }

    /// Assign `name` ignoring writability, raising a change if the value
    /// differs. Returns `false` if `name` was never declared.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let changed = {
            let mut slots = self.slots.borrow_mut();
            let Some(slot) = slots.get_mut(name) else {
                return false;
            };
            if slot.value == value {
                false
            } else {
                slot.value = value;
                true
            }
        };
        if changed && self.notifies {
            self.property_changed.emit(name);
        }
        true
    }

    /// Number of handlers listening for property changes.
    pub fn listener_count(&self) -> usize {
        self.property_changed.handler_count()
    }

    fn unknown(&self, name: &str) -> AccessError {
        AccessError::UnknownProperty {
            type_name: self.type_name.clone(),
            property: name.to_string(),
        }
    }
}

impl Bindable for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn property(&self, name: &str) -> Option<PropertyInfo> {
        self.slots.borrow().get(name).map(|slot| slot.info.clone())
    }

    fn get_value(&self, name: &str) -> Result<Value, AccessError> {
        self.slots
            .borrow()
            .get(name)
            .map(|slot| slot.value.clone())
            .ok_or_else(|| self.unknown(name))
    }

    fn set_value(&self, name: &str, value: Value) -> Result<(), AccessError> {
        let info = self.property(name).ok_or_else(|| self.unknown(name))?;
        if !info.writable {
            return Err(AccessError::ReadOnly { name: name.to_string() });
        }
        self.set(name, value.coerce(info.value_type)?);
        Ok(())
    }

    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        self.notifies.then_some(&self.property_changed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn set_notifies_only_on_change() {
        let rec = Record::new("R").with("X", 1i32).build();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        rec.property_changed.subscribe(move |_| h.set(h.get() + 1));

        rec.set("X", 1i32);
        rec.set("X", 2i32);
        assert_eq!(hits.get(), 1);
        assert_eq!(rec.get("X"), Value::I32(2));
    }

    #[test]
    fn set_value_respects_declaration() {
        let rec = Record::new("R")
            .with_readonly("Id", 7i32)
            .with_typed("Name", ValueType::String, "a")
            .build();
        assert_eq!(
            rec.set_value("Id", Value::I32(8)),
            Err(AccessError::ReadOnly { name: "Id".into() })
        );
        assert!(rec.set_value("Name", Value::I32(1)).is_err());
        assert!(rec.set_value("Missing", Value::Null).is_err());
        assert_eq!(rec.set_value("Name", Value::from("b")), Ok(()));
        assert_eq!(rec.get("Name"), Value::from("b"));
    }

    #[test]
    fn silent_record_exposes_no_event() {
        let rec = Record::new("R").with("X", 1i32).silent().build();
        assert!(rec.property_changed().is_none());
    }
}
