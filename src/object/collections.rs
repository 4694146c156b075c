//! Change-notifying collections.
//!
//! Both collections raise [`CollectionChange`]s, then `"Count"` when the length
//! changed, then [`ITEM_INDEXER_NAME`] on their property event. Notifications
//! are raised after the internal borrow is released, so handlers may read the
//! collection back.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::notify::{CollectionChange, CollectionChangedEvent, PropertyChangedEvent, ITEM_INDEXER_NAME};
use super::{AccessError, Bindable, IndexerInfo, PropertyInfo};
use crate::value::{Value, ValueType};

const COUNT: &str = "Count";

// ---------------------------------------------------------------------------
// ObservableList
// ---------------------------------------------------------------------------

/// An ordered list of [`Value`]s indexed by `i32`.
#[derive(Debug, Default)]
pub struct ObservableList {
    items: RefCell<Vec<Value>>,
    property_changed: PropertyChangedEvent,
    collection_changed: CollectionChangedEvent,
}

const LIST_INDEXERS: &[IndexerInfo] = &[IndexerInfo {
    params: &[ValueType::I32],
    writable: true,
}];

impl ObservableList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list holding `values`.
    pub fn from_values(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self {
            items: RefCell::new(values.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// Snapshot of the items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn push(&self, value: impl Into<Value>) {
        let index = {
            let mut items = self.items.borrow_mut();
            items.push(value.into());
            items.len() - 1
        };
        self.notify(CollectionChange::Added { index }, true);
    }

    /// Insert at `index`, shifting later items.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), AccessError> {
        {
            let mut items = self.items.borrow_mut();
            if index > items.len() {
                return Err(out_of_range(index, items.len()));
            }
            items.insert(index, value.into());
        }
        self.notify(CollectionChange::Added { index }, true);
        Ok(())
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut items = self.items.borrow_mut();
            (index < items.len()).then(|| items.remove(index))
        };
        if removed.is_some() {
            self.notify(CollectionChange::Removed { index }, true);
        }
        removed
    }

    /// Replace the item at `index`.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<(), AccessError> {
        {
            let mut items = self.items.borrow_mut();
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
            *slot = value.into();
        }
        self.notify(CollectionChange::Replaced { index }, false);
        Ok(())
    }

    pub fn clear(&self) {
        let had_items = !self.items.borrow().is_empty();
        self.items.borrow_mut().clear();
        self.notify(CollectionChange::Reset, had_items);
    }

    fn notify(&self, change: CollectionChange, count_changed: bool) {
        self.collection_changed.emit(&change);
        if count_changed {
            self.property_changed.emit(COUNT);
        }
        self.property_changed.emit(ITEM_INDEXER_NAME);
    }

    fn position(&self, args: &[Value]) -> Result<usize, AccessError> {
        let len = self.len();
        match args {
            [Value::I32(i)] => usize::try_from(*i)
                .ok()
                .filter(|&i| i < len)
                .ok_or(AccessError::IndexOutOfRange {
                    index: i64::from(*i),
                    len,
                }),
            [other] => Err(AccessError::type_mismatch(ValueType::I32, other)),
            _ => Err(AccessError::NoIndexer {
                type_name: self.type_name().to_string(),
            }),
        }
    }
}

fn out_of_range(index: usize, len: usize) -> AccessError {
    AccessError::IndexOutOfRange {
        index: i64::try_from(index).unwrap_or(i64::MAX),
        len,
    }
}

impl Bindable for ObservableList {
    fn type_name(&self) -> &str {
        "ObservableList"
    }

    fn property(&self, name: &str) -> Option<PropertyInfo> {
        (name == COUNT).then(|| PropertyInfo::read_only(COUNT, ValueType::I32))
    }

    fn indexers(&self) -> &[IndexerInfo] {
        LIST_INDEXERS
    }

    fn get_value(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            COUNT => Ok(Value::I32(i32::try_from(self.len()).unwrap_or(i32::MAX))),
            _ => Err(AccessError::UnknownProperty {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            }),
        }
    }

    fn set_value(&self, name: &str, _value: Value) -> Result<(), AccessError> {
        match name {
            COUNT => Err(AccessError::ReadOnly { name: name.to_string() }),
            _ => Err(AccessError::UnknownProperty {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            }),
        }
    }

    fn get_index(&self, _indexer: &IndexerInfo, args: &[Value]) -> Result<Value, AccessError> {
        let index = self.position(args)?;
        Ok(self.items.borrow()[index].clone())
    }

    fn set_index(&self, _indexer: &IndexerInfo, args: &[Value], value: Value) -> Result<(), AccessError> {
        let index = self.position(args)?;
        self.set(index, value)
    }

    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        Some(&self.property_changed)
    }

    fn collection_changed(&self) -> Option<&CollectionChangedEvent> {
        Some(&self.collection_changed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

// ---------------------------------------------------------------------------
// ObservableMap
// ---------------------------------------------------------------------------

/// A string-keyed map of [`Value`]s. Every mutation raises
/// [`CollectionChange::Reset`] since entries have no stable position.
#[derive(Debug, Default)]
pub struct ObservableMap {
    entries: RefCell<BTreeMap<String, Value>>,
    property_changed: PropertyChangedEvent,
    collection_changed: CollectionChangedEvent,
}

const MAP_INDEXERS: &[IndexerInfo] = &[IndexerInfo {
    params: &[ValueType::String],
    writable: true,
}];

impl ObservableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Insert or replace; returns the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let previous = self.entries.borrow_mut().insert(key.into(), value.into());
        self.notify(previous.is_none());
        previous
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.entries.borrow_mut().remove(key);
        if removed.is_some() {
            self.notify(true);
        }
        removed
    }

    fn notify(&self, count_changed: bool) {
        self.collection_changed.emit(&CollectionChange::Reset);
        if count_changed {
            self.property_changed.emit(COUNT);
        }
        self.property_changed.emit(ITEM_INDEXER_NAME);
    }

    fn key<'a>(&self, args: &'a [Value]) -> Result<&'a str, AccessError> {
        match args {
            [Value::String(key)] => Ok(key),
            [other] => Err(AccessError::type_mismatch(ValueType::String, other)),
            _ => Err(AccessError::NoIndexer {
                type_name: self.type_name().to_string(),
            }),
        }
    }
}

impl Bindable for ObservableMap {
    fn type_name(&self) -> &str {
        "ObservableMap"
    }

    fn property(&self, name: &str) -> Option<PropertyInfo> {
        (name == COUNT).then(|| PropertyInfo::read_only(COUNT, ValueType::I32))
    }

    fn indexers(&self) -> &[IndexerInfo] {
        MAP_INDEXERS
    }

    fn get_value(&self, name: &str) -> Result<Value, AccessError> {
        match name {
            COUNT => Ok(Value::I32(i32::try_from(self.len()).unwrap_or(i32::MAX))),
            _ => Err(AccessError::UnknownProperty {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            }),
        }
    }

    fn set_value(&self, name: &str, _value: Value) -> Result<(), AccessError> {
        match name {
            COUNT => Err(AccessError::ReadOnly { name: name.to_string() }),
            _ => Err(AccessError::UnknownProperty {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            }),
        }
    }

    fn get_index(&self, _indexer: &IndexerInfo, args: &[Value]) -> Result<Value, AccessError> {
        let key = self.key(args)?;
        self.get(key).ok_or_else(|| AccessError::KeyNotFound { key: key.to_string() })
    }

    fn set_index(&self, _indexer: &IndexerInfo, args: &[Value], value: Value) -> Result<(), AccessError> {
        let key = self.key(args)?;
        self.insert(key, value);
        Ok(())
    }

    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        Some(&self.property_changed)
    }

    fn collection_changed(&self) -> Option<&CollectionChangedEvent> {
        Some(&self.collection_changed)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
