//! Object capability contracts.
//!
//! Binding paths resolve names against whatever object shows up at runtime.
//! Instead of reflection, every bindable type implements [`Bindable`]: a small
//! registry answering "which property is called `name`", "which indexers do
//! you have", and performing the reads and writes. `#[derive(Bindable)]`
//! generates it for plain structs; [`collections`] implements it by hand.
//!
//! - [`notify`]: property and collection change events.
//! - [`collections`]: [`ObservableList`] and [`ObservableMap`].

pub mod notify;
pub mod collections;

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::value::{Value, ValueType};

pub use collections::{ObservableList, ObservableMap};
pub use notify::{
    CollectionChange, CollectionChangedEvent, Event, HandlerId, PropertyChangedEvent,
    ITEM_INDEXER_NAME,
};

// ---------------------------------------------------------------------------
// Accessor descriptors
// ---------------------------------------------------------------------------

/// A named property exposed by a [`Bindable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyInfo {
    pub name: String,
    pub value_type: ValueType,
    pub writable: bool,
}

impl PropertyInfo {
    /// A writable property.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            writable: true,
        }
    }

    /// A read-only property.
    pub fn read_only(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            writable: false,
            ..Self::new(name, value_type)
        }
    }
}

/// An indexer signature exposed by a [`Bindable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexerInfo {
    /// Parameter types, in order.
    pub params: &'static [ValueType],
    pub writable: bool,
}

impl IndexerInfo {
    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A resolved accessor: the thing a traversal step reads and writes through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    Property(PropertyInfo),
    Indexer(IndexerInfo),
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Property(info) => f.write_str(&info.name),
            Accessor::Indexer(info) => {
                f.write_str("[")?;
                for (i, ty) in info.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str("]")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by property and indexer accessors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccessError {
    #[error("{type_name} has no property '{property}'")]
    UnknownProperty { type_name: String, property: String },
    #[error("'{name}' is read-only")]
    ReadOnly { name: String },
    #[error("expected a value of type {expected}, got {found}")]
    TypeMismatch { expected: ValueType, found: ValueType },
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("key {key:?} not found")]
    KeyNotFound { key: String },
    #[error("{type_name} has no indexer")]
    NoIndexer { type_name: String },
}

impl AccessError {
    /// Type mismatch between an expected type and a supplied value.
    pub fn type_mismatch(expected: ValueType, found: &Value) -> Self {
        AccessError::TypeMismatch {
            expected,
            found: found.value_type(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bindable
// ---------------------------------------------------------------------------

/// An object whose members can be reached from a binding path.
///
/// Implementations are expected to be shared as `Rc<Self>` and mutated
/// through interior mutability; every accessor takes `&self`. An object that
/// raises [`property_changed`](Self::property_changed) must emit the property
/// name after the new value is observable.
pub trait Bindable: 'static {
    /// Runtime type name, used in diagnostics.
    fn type_name(&self) -> &str;

    /// Look up a property by name.
    fn property(&self, name: &str) -> Option<PropertyInfo>;

    /// Indexer signatures, in lookup priority order.
    fn indexers(&self) -> &[IndexerInfo] {
        &[]
    }

    fn get_value(&self, name: &str) -> Result<Value, AccessError>;

    fn set_value(&self, name: &str, value: Value) -> Result<(), AccessError>;

    /// Read through `indexer` with arguments already converted to its
    /// parameter types.
    fn get_index(&self, indexer: &IndexerInfo, args: &[Value]) -> Result<Value, AccessError> {
        let _ = (indexer, args);
        Err(AccessError::NoIndexer {
            type_name: self.type_name().to_string(),
        })
    }

    fn set_index(
        &self,
        indexer: &IndexerInfo,
        args: &[Value],
        value: Value,
    ) -> Result<(), AccessError> {
        let _ = (indexer, args, value);
        Err(AccessError::NoIndexer {
            type_name: self.type_name().to_string(),
        })
    }

    /// Property change notifications, if this object raises them.
    fn property_changed(&self) -> Option<&PropertyChangedEvent> {
        None
    }

    /// Collection change notifications, if this object is a collection.
    fn collection_changed(&self) -> Option<&CollectionChangedEvent> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl fmt::Debug for dyn Bindable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.type_name())
    }
}

/// Whether two trait objects are the same allocation.
pub fn same_object(a: &Rc<dyn Bindable>, b: &Rc<dyn Bindable>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl Bindable for Plain {
        fn type_name(&self) -> &str {
            "Plain"
        }

        fn property(&self, _name: &str) -> Option<PropertyInfo> {
            None
        }

        fn get_value(&self, name: &str) -> Result<Value, AccessError> {
            Err(AccessError::UnknownProperty {
                type_name: "Plain".into(),
                property: name.into(),
            })
        }

        fn set_value(&self, name: &str, _value: Value) -> Result<(), AccessError> {
            Err(AccessError::ReadOnly { name: name.into() })
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
            self
        }
    }

    #[test]
    fn defaults_have_no_indexer_or_events() {
        let plain = Plain;
        assert!(plain.indexers().is_empty());
        assert!(plain.property_changed().is_none());
        assert!(plain.collection_changed().is_none());

        const SIG: IndexerInfo = IndexerInfo {
            params: &[ValueType::I32],
            writable: false,
        };
        assert_eq!(
            plain.get_index(&SIG, &[Value::I32(0)]),
            Err(AccessError::NoIndexer {
                type_name: "Plain".into()
            })
        );
    }

    #[test]
    fn same_object_is_identity() {
        let a: Rc<dyn Bindable> = Rc::new(Plain);
        let b: Rc<dyn Bindable> = Rc::new(Plain);
        assert!(same_object(&a, &Rc::clone(&a)));
        assert!(!same_object(&a, &b));
    }

    #[test]
    fn accessor_display() {
        let prop = Accessor::Property(PropertyInfo::new("Title", ValueType::String));
        let idx = Accessor::Indexer(IndexerInfo {
            params: &[ValueType::String, ValueType::I32],
            writable: true,
        });
        assert_eq!(prop.to_string(), "Title");
        assert_eq!(idx.to_string(), "[String,i32]");
    }

    #[test]
    fn error_messages() {
        let err = AccessError::TypeMismatch {
            expected: ValueType::I32,
            found: ValueType::String,
        };
        assert_eq!(err.to_string(), "expected a value of type i32, got String");
        let err = AccessError::KeyNotFound { key: "x".into() };
        assert_eq!(err.to_string(), r#"key "x" not found"#);
    }
}
