//! Proc macros for console-bind: `#[derive(Bindable)]`.
//!
//! This crate is not meant to be used directly; enable the `macros` feature on `console-bind`.

use proc_macro::TokenStream;

mod bindable;

/// Derive the `Bindable` property registry for a struct.
///
/// Every named field of type `RefCell<T>` (with `T: BindValue`) becomes a
/// property. Its binding name is the field name in PascalCase unless renamed.
///
/// # Attributes
///
/// - `#[bindable(type_name = "Name")]` on the struct overrides the runtime type name
/// - `#[bindable(rename = "Name")]` sets the property name
/// - `#[bindable(readonly)]` rejects writes through bindings
/// - `#[bindable(skip)]` hides a field
/// - `#[bindable(notify)]` marks the `PropertyChangedEvent` field raised on writes
///
/// # Example
///
/// ```ignore
/// #[derive(Bindable)]
/// struct Person {
///     name: RefCell<String>,
///     #[bindable(readonly)]
///     id: RefCell<u32>,
///     #[bindable(notify)]
///     changed: PropertyChangedEvent,
/// }
/// ```
#[proc_macro_derive(Bindable, attributes(bindable))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    bindable::derive_impl(input.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
