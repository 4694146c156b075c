//! # console-bind
//!
//! A data-binding expression engine for console UI elements.
//!
//! console-bind parses binding path expressions such as
//! `Items[0].Name` or `Lookup[Selected.Key, "x"]`, walks them against a
//! runtime object graph, and keeps a target property synchronized with the
//! value at the end of the path. Every object the walk passes through is
//! watched for changes, so edits anywhere along the chain re-evaluate the
//! binding.
//!
//! ## Core Systems
//!
//! - **[`path`]**: logos tokenizer, node model and backtracking parser for path expressions
//! - **[`value`]**: dynamic [`Value`] representation and typed [`BindValue`] conversions
//! - **[`object`]**: the [`Bindable`] capability trait, change events and observable collections
//! - **[`traversal`]**: evaluates a path against an object graph and tracks the chain it visited
//! - **[`binding`]**: binding lifecycle, modes and loop suppression
//! - **[`element`]**: a minimal console element hosting bindings and data contexts
//! - **[`testing`]**: ad-hoc records and change logs for tests
//!
//! ## Example
//!
//! ```
//! use console_bind::testing::Record;
//! use console_bind::{BindingOptions, Element, Value, ValueType};
//!
//! let person = Record::new("Person").with("Name", "Ada").build();
//! let label = Element::new("Label")
//!     .with_property("Text", ValueType::Any, Value::Null)
//!     .with_data_context(Value::object(person.clone()))
//!     .build();
//!
//! label.bind("Text", "Name", BindingOptions::new()).unwrap();
//! assert_eq!(label.get("Text"), Value::from("Ada"));
//!
//! person.set("Name", "Grace");
//! assert_eq!(label.get("Text"), Value::from("Grace"));
//! ```

extern crate self as console_bind;

// Foundation
pub mod path;
pub mod value;

// Object model
pub mod object;

// Evaluation and lifecycle
pub mod traversal;
pub mod binding;
pub mod element;

// Test support
pub mod testing;

pub use binding::{
    Binding, BindingError, BindingHost, BindingMode, BindingOptions, DATA_CONTEXT, PARENT,
};
pub use element::Element;
pub use object::{AccessError, Bindable, PropertyChangedEvent};
pub use path::{parse_path, BindingPath, SyntaxError};
pub use traversal::{Traversal, TraversalError};
pub use value::{BindValue, Value, ValueType};

// Proc macros (feature-gated)
#[cfg(feature = "macros")]
pub use console_bind_macros::Bindable;

/// Support code for `#[derive(Bindable)]`. Not public API.
#[doc(hidden)]
pub mod __private {
    use std::cell::RefCell;

    use crate::object::{AccessError, PropertyChangedEvent};
    use crate::value::{BindValue, Value, ValueType};

    pub use crate::object::{Bindable, PropertyInfo};

    pub fn cell_value_type<T: BindValue>(_cell: &RefCell<T>) -> ValueType {
        T::value_type()
    }

    pub fn get_cell<T: BindValue>(cell: &RefCell<T>) -> Value {
        cell.borrow().to_value()
    }

    /// Convert, store, and raise `name` on `event` if the stored value changed.
    pub fn set_cell<T: BindValue>(
        cell: &RefCell<T>,
        name: &str,
        value: Value,
        event: Option<&PropertyChangedEvent>,
    ) -> Result<(), AccessError> {
        let converted = T::from_value(value.coerce(T::value_type())?)?;
        let changed = cell.borrow().to_value() != converted.to_value();
        if changed {
            *cell.borrow_mut() = converted;
            if let Some(event) = event {
                event.emit(name);
            }
        }
        Ok(())
    }

    pub fn unknown_property(type_name: &str, name: &str) -> AccessError {
        AccessError::UnknownProperty {
            type_name: type_name.to_string(),
            property: name.to_string(),
        }
    }

    pub fn read_only(name: &str) -> AccessError {
        AccessError::ReadOnly {
            name: name.to_string(),
        }
    }
}
