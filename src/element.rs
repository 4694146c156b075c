//! Element: a reference binding host.
//!
//! An [`Element`] is a retained UI node with a declared set of properties, a
//! data context, and parent/child links. It is the simplest complete
//! [`BindingHost`]: toolkits can use it directly or as a model for their own
//! widgets. Bindings are owned per target property and released when replaced,
//! unbound, or when the element is dropped.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use crate::binding::{Binding, BindingError, BindingHost, BindingOptions, DATA_CONTEXT, PARENT};
use crate::object::{AccessError, Bindable, PropertyChangedEvent, PropertyInfo};
use crate::value::{Value, ValueType};

struct Slot {
    info: PropertyInfo,
    value: Value,
}

/// A UI node that can host bindings.
pub struct Element {
    /// Widget type name (e.g. "Label", "Panel").
    widget_type: String,
    data_context: RefCell<Value>,
    parent: RefCell<Weak<Element>>,
    children: RefCell<Vec<Rc<Element>>>,
    properties: RefCell<BTreeMap<String, Slot>>,
    property_changed: PropertyChangedEvent,
    bindings: RefCell<HashMap<String, Rc<Binding>>>,
}

impl Element {
    /// Create an element with no declared properties (builder).
    pub fn new(widget_type: impl Into<String>) -> Self {
        Self {
            widget_type: widget_type.into(),
            data_context: RefCell::new(Value::Null),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            properties: RefCell::new(BTreeMap::new()),
            property_changed: PropertyChangedEvent::new(),
            bindings: RefCell::new(HashMap::new()),
        }
    }

    /// Declare a writable property (builder).
    pub fn with_property(
        self,
        name: impl Into<String>,
        value_type: ValueType,
        initial: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        let slot = Slot {
            info: PropertyInfo::new(name.clone(), value_type),
            value: initial.into(),
        };
        self.properties.borrow_mut().insert(name, slot);
        self
    }

    /// Set the initial data context (builder).
    pub fn with_data_context(self, context: impl Into<Value>) -> Self {
        *self.data_context.borrow_mut() = context.into();
        self
    }

    /// Finish building.
    pub fn build(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn widget_type(&self) -> &str {
        &self.widget_type
    }

    // ── Properties ───────────────────────────────────────────────────

    /// Current value of a declared property, or `Null`.
    pub fn get(&self, name: &str) -> Value {
        self.properties
            .borrow()
            .get(name)
            .map(|slot| slot.value.clone())
            .unwrap_or_default()
    }

    /// Assign a declared property, raising a change if the value differs.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), AccessError> {
        let changed = {
            let mut properties = self.properties.borrow_mut();
            let slot = properties
                .get_mut(name)
                .ok_or_else(|| AccessError::UnknownProperty {
                    type_name: self.widget_type.clone(),
                    property: name.to_string(),
                })?;
            let value = value.into().coerce(slot.info.value_type)?;
            if slot.value == value {
                false
            } else {
                slot.value = value;
                true
            }
        };
        if changed {
            self.property_changed.emit(name);
        }
        Ok(())
    }

    /// Number of handlers listening to this element's changes.
    pub fn listener_count(&self) -> usize {
        self.property_changed.handler_count()
    }

    // ── Data context ─────────────────────────────────────────────────

    pub fn data_context(&self) -> Value {
        self.data_context.borrow().clone()
    }

    /// Replace the data context, raising `DataContext` if it changed.
    pub fn set_data_context(&self, context: impl Into<Value>) {
        let context = context.into();
        let previous = self.data_context.replace(context.clone());
        if previous != context {
            self.property_changed.emit(DATA_CONTEXT);
        }
    }

    // ── Tree ─────────────────────────────────────────────────────────

    pub fn parent(&self) -> Option<Rc<Element>> {
        self.parent.borrow().upgrade()
    }

    pub fn children(&self) -> Vec<Rc<Element>> {
        self.children.borrow().clone()
    }

    /// Append `child`, moving it out of its previous parent. Raises `Parent`
    /// on the child once.
    pub fn append_child(self: &Rc<Self>, child: Rc<Element>) {
        child.unlink();
        *child.parent.borrow_mut() = Rc::downgrade(self);
        self.children.borrow_mut().push(Rc::clone(&child));
        child.property_changed.emit(PARENT);
    }

    /// Remove this element from its parent. Raises `Parent` if it had one.
    pub fn detach(&self) {
        if self.unlink() {
            self.property_changed.emit(PARENT);
        }
    }

    fn unlink(&self) -> bool {
        let Some(parent) = self.parent.replace(Weak::new()).upgrade() else {
            return false;
        };
        parent
            .children
            .borrow_mut()
            .retain(|c| !std::ptr::eq(Rc::as_ptr(c), self));
        true
    }

    // ── Bindings ─────────────────────────────────────────────────────

    /// Bind `property` to `path`, replacing any existing binding of it.
    pub fn bind(
        self: &Rc<Self>,
        property: &str,
        path: &str,
        options: BindingOptions,
    ) -> Result<Rc<Binding>, BindingError> {
        // Release the old binding first so it cannot react to the new one.
        self.unbind(property);
        let binding = Rc::new(Binding::with_options(self, property, path, options)?);
        self.bindings
            .borrow_mut()
            .insert(property.to_string(), Rc::clone(&binding));
        Ok(binding)
    }

    /// Remove the binding of `property`. Returns `false` if there was none.
    pub fn unbind(&self, property: &str) -> bool {
        let removed = self.bindings.borrow_mut().remove(property);
        removed.is_some()
    }

    /// The binding of `property`, if any.
    pub fn binding(&self, property: &str) -> Option<Rc<Binding>> {
        self.bindings.borrow().get(property).cloned()
    }
}

impl Bindable for Element {
    fn type_name(&self) -> &str {
        &self.widget_type
    }

    fn property(&self, name: &str) -> Option<PropertyInfo> {
        match name {
            DATA_CONTEXT => Some(PropertyInfo::new(DATA_CONTEXT, ValueType::Any)),
            PARENT => Some(PropertyInfo::read_only(PARENT, ValueType::Object)),
            _ => self.properties.borrow().get(name).map(|slot| slot.info.clone()),
        }
    }

    fn get_value(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            DATA_CONTEXT => Ok(self.data_context()),
            PARENT => Ok(self.parent().map(Value::object).unwrap_or_default()),
            _ => self
                .properties
                .borrow()
                .get(name)
                .map(|slot| slot.value.clone())
                .ok_or_else(|| AccessError::UnknownProperty {
                    type_name: self.widget_type.clone(),
                    property: name.to_string(),
                }),
        }
    }

    fn set_value(&self, name: &str, value: Value) -> Result<(), AccessError> {
        match name {
            DATA_CONTEXT => {
                self.set_data_context(value);
                Ok(())
            }
            PARENT => Err(AccessError::ReadOnly {
                name: PARENT.to_string(),
            }),
            _ => self.set(name, value),
        }
    }

    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        Some(&self.property_changed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl BindingHost for Element {
    fn data_context(&self) -> Value {
        Element::data_context(self)
    }

    fn parent_host(&self) -> Option<Rc<dyn BindingHost>> {
        self.parent().map(|p| p as Rc<dyn BindingHost>)
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("widget_type", &self.widget_type)
            .field("children", &self.children.borrow().len())
            .field("bindings", &self.bindings.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingMode;
    use crate::testing::{ChangeLog, Record};
    use pretty_assertions::assert_eq;

    fn text_box() -> Rc<Element> {
        Element::new("TextBox")
            .with_property("Text", ValueType::String, "")
            .with_property("Width", ValueType::I32, 10i32)
            .build()
    }

    #[test]
    fn declared_properties() {
        let el = text_box();
        assert_eq!(el.get("Text"), Value::from(""));
        assert!(el.property("Text").unwrap().writable);
        assert!(!el.property(PARENT).unwrap().writable);
        assert!(el.property("Nope").is_none());
    }

    #[test]
    fn set_coerces_and_checks_types() {
        let el = text_box();
        el.set("Width", 20i64).unwrap();
        assert_eq!(el.get("Width"), Value::I32(20));
        assert!(el.set("Width", "wide").is_err());
        assert!(el.set("Height", 1i32).is_err());
        el.set("Text", Value::Null).unwrap();
        assert_eq!(el.get("Text"), Value::Null);
    }

    #[test]
    fn notifications_only_on_change() {
        let el = text_box();
        let object: Rc<dyn Bindable> = el.clone();
        let log = ChangeLog::watch(&object);

        el.set("Text", "a").unwrap();
        el.set("Text", "a").unwrap();
        el.set_data_context(Value::from(1i32));
        el.set_data_context(Value::from(1i32));
        insta::assert_snapshot!(log.take_text(), @r"
        Text
        DataContext
        ");
    }

    #[test]
    fn tree_links_and_parent_notification() {
        let a = Element::new("Panel").build();
        let b = Element::new("Panel").build();
        let child = text_box();
        let object: Rc<dyn Bindable> = child.clone();
        let log = ChangeLog::watch(&object);

        a.append_child(Rc::clone(&child));
        b.append_child(Rc::clone(&child));
        assert!(a.children().is_empty());
        assert_eq!(b.children().len(), 1);
        assert!(Rc::ptr_eq(&child.parent().unwrap(), &b));

        child.detach();
        child.detach();
        assert!(child.parent().is_none());
        assert_eq!(log.take(), vec!["Parent", "Parent", "Parent"]);
    }

    #[test]
    fn parent_is_exposed_as_property() {
        let parent = Element::new("Panel").build();
        let child = text_box();
        parent.append_child(Rc::clone(&child));
        let expected: Rc<dyn Bindable> = parent.clone();
        assert_eq!(child.get_value(PARENT), Ok(Value::Object(expected)));
        assert!(child.set_value(PARENT, Value::Null).is_err());
    }

    #[test]
    fn bind_replaces_and_unbind_releases() {
        let source = Record::new("Person")
            .with("First", "Ada")
            .with("Last", "Lovelace")
            .build();
        let el = text_box();
        el.set_data_context(Value::object(source.clone()));

        el.bind("Text", "First", BindingOptions::new()).unwrap();
        el.bind("Text", "Last", BindingOptions::new()).unwrap();
        assert_eq!(el.get("Text"), Value::from("Lovelace"));
        assert_eq!(source.listener_count(), 1);

        source.set("First", "Augusta");
        assert_eq!(el.get("Text"), Value::from("Lovelace"));

        assert!(el.unbind("Text"));
        assert!(!el.unbind("Text"));
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn binding_lookup() {
        let el = text_box();
        el.set_data_context(Value::object(Record::new("Person").with("Name", "Ada").build()));
        let options = BindingOptions::new().with_mode(BindingMode::TwoWay);
        el.bind("Text", "Name", options).unwrap();

        let binding = el.binding("Text").unwrap();
        assert_eq!(binding.mode(), BindingMode::TwoWay);
        assert_eq!(binding.target(), "Text");
        assert!(el.binding("Width").is_none());
    }

    #[test]
    fn dropping_element_releases_sources() {
        let source = Record::new("Person").with("Name", "Ada").build();
        {
            let el = text_box();
            el.set_data_context(Value::object(source.clone()));
            el.bind("Text", "Name", BindingOptions::new()).unwrap();
            assert_eq!(source.listener_count(), 1);
        }
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn data_context_can_be_bound() {
        let inner = Record::new("Inner").with("Name", "nested").build();
        let outer = Record::new("Outer").with("Child", Value::object(inner)).build();
        let panel = Element::new("Panel").with_data_context(Value::object(outer)).build();
        let label = text_box();
        panel.append_child(Rc::clone(&label));

        label.bind(DATA_CONTEXT, "Child", BindingOptions::new()).unwrap();
        label.bind("Text", "Name", BindingOptions::new()).unwrap();
        assert_eq!(label.get("Text"), Value::from("nested"));
    }
}
