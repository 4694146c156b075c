//! Integration tests for console-bind.
//!
//! These tests exercise the public API from outside the crate: derived
//! bindable types, observable collections, elements and bindings working
//! together.

#![cfg(feature = "macros")]

use std::cell::RefCell;
use std::rc::Rc;

use console_bind::object::{ObservableList, ObservableMap};
use console_bind::testing::ChangeLog;
use console_bind::{
    Bindable, BindingError, BindingMode, BindingOptions, Element, PropertyChangedEvent,
    SyntaxError, Value, ValueType,
};
use pretty_assertions::assert_eq;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

#[derive(Bindable)]
#[bindable(type_name = "TestObject")]
struct TestObject {
    #[bindable(rename = "Property1")]
    inner: RefCell<Option<Rc<InnerObject>>>,
    #[bindable(notify)]
    changed: PropertyChangedEvent,
}

#[derive(Bindable)]
#[bindable(type_name = "InnerObject")]
struct InnerObject {
    property2: RefCell<Rc<ObservableList>>,
    #[bindable(notify)]
    changed: PropertyChangedEvent,
}

#[derive(Bindable)]
#[bindable(type_name = "LastObject")]
struct LastObject {
    property4: RefCell<String>,
    #[bindable(readonly)]
    id: RefCell<u32>,
    #[bindable(skip)]
    #[allow(dead_code)]
    scratch: Vec<u8>,
    #[bindable(notify)]
    changed: PropertyChangedEvent,
}

fn last(text: &str) -> Rc<LastObject> {
    Rc::new(LastObject {
        property4: RefCell::new(text.to_string()),
        id: RefCell::new(1),
        scratch: Vec::new(),
        changed: PropertyChangedEvent::new(),
    })
}

fn test_object(items: Vec<Value>) -> (Rc<TestObject>, Rc<ObservableList>) {
    let list = Rc::new(ObservableList::from_values(items));
    let inner = Rc::new(InnerObject {
        property2: RefCell::new(Rc::clone(&list)),
        changed: PropertyChangedEvent::new(),
    });
    let root = Rc::new(TestObject {
        inner: RefCell::new(Some(inner)),
        changed: PropertyChangedEvent::new(),
    });
    (root, list)
}

fn label() -> Element {
    Element::new("Label").with_property("Text", ValueType::Any, Value::Null)
}

// ---------------------------------------------------------------------------
// Derived registry
// ---------------------------------------------------------------------------

#[test]
fn derived_properties_follow_attributes() {
    let item = last("a");
    assert_eq!(item.type_name(), "LastObject");

    let info = item.property("Property4").unwrap();
    assert_eq!(info.value_type, ValueType::String);
    assert!(info.writable);
    assert!(!item.property("Id").unwrap().writable);
    assert!(item.property("Scratch").is_none());
    assert!(item.property("Changed").is_none());

    assert_eq!(item.get_value("Id"), Ok(Value::U32(1)));
    assert!(item.set_value("Id", Value::U32(2)).is_err());
    assert!(item.get_value("Missing").is_err());
}

#[test]
fn derived_set_value_converts_and_notifies_on_change() {
    let item = last("a");
    let object: Rc<dyn Bindable> = item.clone();
    let log = ChangeLog::watch(&object);

    item.set_value("Property4", Value::from("b")).unwrap();
    item.set_value("Property4", Value::from("b")).unwrap();
    assert!(item.set_value("Property4", Value::I32(3)).is_err());

    assert_eq!(log.take_text(), "Property4");
    assert_eq!(*item.property4.borrow(), "b");
}

#[test]
fn derived_option_field_accepts_null() {
    let (root, _) = test_object(vec![]);
    root.set_value("Property1", Value::Null).unwrap();
    assert!(root.inner.borrow().is_none());
    assert_eq!(root.get_value("Property1"), Ok(Value::Null));
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn nested_item_change_updates_target() {
    let first = last("first");
    let (root, _list) = test_object(vec![Value::object(first.clone()), Value::object(last("second"))]);
    let label = label().with_data_context(Value::object(root)).build();

    label
        .bind("Text", "Property1.Property2[0].Property4", BindingOptions::new())
        .unwrap();
    assert_eq!(label.get("Text"), Value::from("first"));

    first.set_value("Property4", Value::from("changed")).unwrap();
    assert_eq!(label.get("Text"), Value::from("changed"));
}

#[test]
fn replacing_list_item_updates_target() {
    let (root, list) = test_object(vec![Value::object(last("first"))]);
    let label = label().with_data_context(Value::object(root)).build();
    label
        .bind("Text", "Property1.Property2[0].Property4", BindingOptions::new())
        .unwrap();

    let replacement = last("replacement");
    list.set(0, Value::object(replacement.clone())).unwrap();
    assert_eq!(label.get("Text"), Value::from("replacement"));

    replacement.set_value("Property4", Value::from("again")).unwrap();
    assert_eq!(label.get("Text"), Value::from("again"));
}

#[derive(Bindable)]
struct Catalog {
    #[bindable(rename = "A")]
    shelf: RefCell<Rc<Shelf>>,
    #[bindable(rename = "C")]
    key: RefCell<String>,
    #[bindable(notify)]
    changed: PropertyChangedEvent,
}

#[derive(Bindable)]
struct Shelf {
    #[bindable(rename = "B", readonly)]
    books: RefCell<Rc<ObservableMap>>,
}

#[test]
fn nested_path_key_is_re_resolved() {
    let books = Rc::new(ObservableMap::new());
    books.insert("x", "Dune");
    books.insert("y", "Emma");
    let catalog = Rc::new(Catalog {
        shelf: RefCell::new(Rc::new(Shelf {
            books: RefCell::new(Rc::clone(&books)),
        })),
        key: RefCell::new("x".to_string()),
        changed: PropertyChangedEvent::new(),
    });
    let label = label().with_data_context(Value::object(catalog.clone())).build();
    let binding = label.bind("Text", "A.B[C]", BindingOptions::new()).unwrap();
    assert_eq!(label.get("Text"), Value::from("Dune"));

    catalog.set_value("C", Value::from("y")).unwrap();
    assert_eq!(label.get("Text"), Value::from("Emma"));

    books.insert("y", "Persuasion");
    assert_eq!(binding.value(), Ok(Value::from("Persuasion")));
    assert_eq!(label.get("Text"), Value::from("Persuasion"));
}

#[test]
fn malformed_path_never_binds() {
    let (root, _) = test_object(vec![]);
    let label = label().with_data_context(Value::object(root.clone())).build();

    let err = label.bind("Text", "A..B", BindingOptions::new()).unwrap_err();
    assert_eq!(
        err,
        BindingError::Syntax(SyntaxError::UnexpectedToken {
            position: 2,
            found: ".".to_string(),
        })
    );
    assert!(label.binding("Text").is_none());
    assert_eq!(root.changed.handler_count(), 0);
}

#[test]
fn two_way_write_back_targets_indexed_item() {
    let (root, list) = test_object(vec![Value::from("zero"), Value::from("one")]);
    let inner = root.inner.borrow().clone().unwrap();
    let label = label().with_data_context(Value::object(root.clone())).build();
    let binding = label
        .bind(
            "Text",
            "Property1.Property2[0]",
            BindingOptions::new().with_mode(BindingMode::TwoWay),
        )
        .unwrap();
    assert_eq!(label.get("Text"), Value::from("zero"));

    label.set("Text", "edited").unwrap();

    assert_eq!(list.get(0), Some(Value::from("edited")));
    assert_eq!(list.get(1), Some(Value::from("one")));
    let property2 = inner.get_value("Property2").unwrap();
    assert!(property2 == Value::object(Rc::clone(&list)));
    assert_eq!(label.get("Text"), Value::from("edited"));
    assert!(binding.take_error().is_none());
}

#[test]
fn detaching_host_releases_chain() {
    let item = last("first");
    let (root, list) = test_object(vec![Value::object(item.clone())]);
    let panel = Element::new("Panel")
        .with_data_context(Value::object(root.clone()))
        .build();
    let label = label().build();
    panel.append_child(Rc::clone(&label));

    let binding = label
        .bind("Text", "Property1.Property2[0].Property4", BindingOptions::new())
        .unwrap();
    assert_eq!(label.get("Text"), Value::from("first"));
    assert_eq!(binding.edge_count(), 4);
    assert_eq!(item.changed.handler_count(), 1);
    assert_eq!(panel.listener_count(), 1);

    label.detach();

    assert_eq!(binding.value(), Ok(Value::Null));
    assert_eq!(binding.edge_count(), 0);
    assert_eq!(root.changed.handler_count(), 0);
    assert_eq!(item.changed.handler_count(), 0);
    assert_eq!(list.collection_changed().map(|e| e.handler_count()), Some(0));
    assert_eq!(panel.listener_count(), 0);

    // The target keeps its last value; source edits no longer reach it.
    item.set_value("Property4", Value::from("ignored")).unwrap();
    assert_eq!(label.get("Text"), Value::from("first"));
}

// ---------------------------------------------------------------------------
// Data context inheritance
// ---------------------------------------------------------------------------

#[test]
fn two_way_binding_through_inherited_context() {
    let item = last("first");
    let panel = Element::new("Panel").build();
    let input = Element::new("Input")
        .with_property("Value", ValueType::String, Value::Null)
        .build();
    panel.append_child(Rc::clone(&input));
    input
        .bind(
            "Value",
            "Property4",
            BindingOptions::new().with_mode(BindingMode::TwoWay),
        )
        .unwrap();
    assert_eq!(input.get("Value"), Value::Null);

    panel.set_data_context(Value::object(item.clone()));
    assert_eq!(input.get("Value"), Value::from("first"));

    let object: Rc<dyn Bindable> = item.clone();
    let log = ChangeLog::watch(&object);
    input.set("Value", "typed").unwrap();
    assert_eq!(*item.property4.borrow(), "typed");
    assert_eq!(log.take_text(), "Property4");
    assert_eq!(input.get("Value"), Value::from("typed"));
}

#[test]
fn strict_binding_reports_missing_members() {
    let (root, _) = test_object(vec![]);
    let label = label().with_data_context(Value::object(root)).build();

    let err = label
        .bind("Text", "Property1.Nope", BindingOptions::new().strict(true))
        .unwrap_err();
    assert!(matches!(err, BindingError::Traversal(_)));

    label
        .bind("Text", "Property1.Nope", BindingOptions::new())
        .unwrap();
    assert_eq!(label.get("Text"), Value::Null);
}
