//! `#[derive(Bindable)]`: parse a struct and generate its property registry.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr, Result, Type};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// One exposed property: a `RefCell<T>` field.
#[derive(Debug, Clone)]
pub(crate) struct Property {
    /// The Rust field.
    pub field: Ident,
    /// The name binding paths use.
    pub name: String,
    pub writable: bool,
}

/// Everything the expansion needs about the derived struct.
#[derive(Debug)]
pub(crate) struct BindableInput {
    pub ident: Ident,
    pub generics: syn::Generics,
    pub type_name: String,
    pub properties: Vec<Property>,
    /// Field holding the `PropertyChangedEvent`, if any.
    pub notify: Option<Ident>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub(crate) fn parse_input(input: DeriveInput) -> Result<BindableInput> {
    let mut type_name = input.ident.to_string();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("bindable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type_name") {
                let lit: LitStr = meta.value()?.parse()?;
                type_name = lit.value();
                Ok(())
            } else {
                Err(meta.error("expected `type_name = \"...\"`"))
            }
        })?;
    }

    let fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(named) => named.named,
            other => {
                return Err(Error::new(
                    other.span(),
                    "Bindable can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.ident.span(),
                "Bindable can only be derived for structs",
            ))
        }
    };

    let mut properties: Vec<Property> = Vec::new();
    let mut notify = None;

    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let mut name = pascal_case(&ident.to_string());
        let mut writable = true;
        let mut skip = false;
        let mut is_notify = false;

        for attr in field.attrs.iter().filter(|a| a.path().is_ident("bindable")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let lit: LitStr = meta.value()?.parse()?;
                    name = lit.value();
                } else if meta.path.is_ident("readonly") {
                    writable = false;
                } else if meta.path.is_ident("skip") {
                    skip = true;
                } else if meta.path.is_ident("notify") {
                    is_notify = true;
                } else {
                    return Err(meta.error("expected `rename`, `readonly`, `skip` or `notify`"));
                }
                Ok(())
            })?;
        }

        if is_notify {
            if notify.is_some() {
                return Err(Error::new(ident.span(), "only one field may be `notify`"));
            }
            notify = Some(ident);
            continue;
        }
        if skip {
            continue;
        }
        if !is_ref_cell(&field.ty) {
            return Err(Error::new(
                field.ty.span(),
                "bindable properties must be `RefCell<T>`; mark other fields `#[bindable(skip)]`",
            ));
        }
        if properties.iter().any(|p| p.name == name) {
            return Err(Error::new(
                ident.span(),
                format!("duplicate property name `{name}`"),
            ));
        }
        properties.push(Property {
            field: ident,
            name,
            writable,
        });
    }

    Ok(BindableInput {
        ident: input.ident,
        generics: input.generics,
        type_name,
        properties,
        notify,
    })
}

fn is_ref_cell(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "RefCell"),
        _ => false,
    }
}

/// `first_name` becomes `FirstName`.
pub(crate) fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

pub(crate) fn expand(input: &BindableInput) -> TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let type_name = LitStr::new(&input.type_name, Span::call_site());

    let event = match &input.notify {
        Some(field) => quote! { ::core::option::Option::Some(&self.#field) },
        None => quote! { ::core::option::Option::None },
    };

    let info_arms = input.properties.iter().map(|p| {
        let field = &p.field;
        let name = &p.name;
        let writable = p.writable;
        quote! {
            #name => ::core::option::Option::Some(::console_bind::__private::PropertyInfo {
                name: ::std::string::String::from(#name),
                value_type: ::console_bind::__private::cell_value_type(&self.#field),
                writable: #writable,
            }),
        }
    });

    let get_arms = input.properties.iter().map(|p| {
        let field = &p.field;
        let name = &p.name;
        quote! {
            #name => ::core::result::Result::Ok(::console_bind::__private::get_cell(&self.#field)),
        }
    });

    let set_arms = input.properties.iter().map(|p| {
        let field = &p.field;
        let name = &p.name;
        if p.writable {
            quote! {
                #name => ::console_bind::__private::set_cell(&self.#field, #name, value, #event),
            }
        } else {
            quote! {
                #name => ::core::result::Result::Err(::console_bind::__private::read_only(#name)),
            }
        }
    });

    let property_changed = input.notify.as_ref().map(|field| {
        quote! {
            fn property_changed(&self) -> ::core::option::Option<&::console_bind::PropertyChangedEvent> {
                ::core::option::Option::Some(&self.#field)
            }
        }
    });

    quote! {
        impl #impl_generics ::console_bind::__private::Bindable for #ident #ty_generics #where_clause {
            fn type_name(&self) -> &str {
                #type_name
            }

            fn property(&self, name: &str) -> ::core::option::Option<::console_bind::__private::PropertyInfo> {
                match name {
                    #(#info_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn get_value(
                &self,
                name: &str,
            ) -> ::core::result::Result<::console_bind::Value, ::console_bind::AccessError> {
                match name {
                    #(#get_arms)*
                    _ => ::core::result::Result::Err(
                        ::console_bind::__private::unknown_property(#type_name, name),
                    ),
                }
            }

            #[allow(unused_variables)]
            fn set_value(
                &self,
                name: &str,
                value: ::console_bind::Value,
            ) -> ::core::result::Result<(), ::console_bind::AccessError> {
                match name {
                    #(#set_arms)*
                    _ => ::core::result::Result::Err(
                        ::console_bind::__private::unknown_property(#type_name, name),
                    ),
                }
            }

            #property_changed

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn into_any(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<dyn ::core::any::Any> {
                self
            }
        }
    }
}

/// Entry point used by the `proc_macro_derive` shim.
pub(crate) fn derive_impl(tokens: TokenStream) -> Result<TokenStream> {
    let input: DeriveInput = syn::parse2(tokens)?;
    Ok(expand(&parse_input(input)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    fn parse(tokens: TokenStream) -> Result<BindableInput> {
        parse_input(syn::parse2(tokens)?)
    }

    fn names(input: &BindableInput) -> Vec<(String, bool)> {
        input
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.writable))
            .collect()
    }

    #[test]
    fn pascal_case_conversion() {
        assert_eq!(pascal_case("name"), "Name");
        assert_eq!(pascal_case("first_name"), "FirstName");
        assert_eq!(pascal_case("item_2_label"), "Item2Label");
        assert_eq!(pascal_case("_hidden"), "Hidden");
    }

    #[test]
    fn default_names_and_type_name() {
        let input = parse(quote! {
            struct Person {
                first_name: RefCell<String>,
                age: std::cell::RefCell<i32>,
            }
        })
        .unwrap();
        assert_eq!(input.type_name, "Person");
        assert_eq!(
            names(&input),
            vec![("FirstName".to_string(), true), ("Age".to_string(), true)]
        );
        assert!(input.notify.is_none());
    }

    #[test]
    fn attributes_are_honored() {
        let input = parse(quote! {
            #[bindable(type_name = "TestObject")]
            struct Test {
                #[bindable(rename = "ID")]
                id: RefCell<i32>,
                #[bindable(readonly)]
                created: RefCell<String>,
                #[bindable(skip)]
                cache: Vec<u8>,
                #[bindable(notify)]
                changed: PropertyChangedEvent,
            }
        })
        .unwrap();
        assert_eq!(input.type_name, "TestObject");
        assert_eq!(
            names(&input),
            vec![("ID".to_string(), true), ("Created".to_string(), false)]
        );
        assert_eq!(input.notify.map(|i| i.to_string()), Some("changed".to_string()));
    }

    #[test]
    fn rejects_non_structs_and_tuple_structs() {
        let err = parse(quote! { enum E { A } }).unwrap_err();
        assert!(err.to_string().contains("structs"));

        let err = parse(quote! { struct T(RefCell<i32>); }).unwrap_err();
        assert!(err.to_string().contains("named fields"));
    }

    #[test]
    fn rejects_plain_fields() {
        let err = parse(quote! { struct S { name: String } }).unwrap_err();
        assert!(err.to_string().contains("RefCell"));
    }

    #[test]
    fn rejects_duplicate_names_and_notify_fields() {
        let err = parse(quote! {
            struct S {
                #[bindable(rename = "Name")]
                a: RefCell<i32>,
                name: RefCell<i32>,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("duplicate property name `Name`"));

        let err = parse(quote! {
            struct S {
                #[bindable(notify)]
                a: PropertyChangedEvent,
                #[bindable(notify)]
                b: PropertyChangedEvent,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("only one field"));
    }

    #[test]
    fn rejects_unknown_attribute() {
        let err = parse(quote! {
            struct S {
                #[bindable(hidden)]
                a: RefCell<i32>,
            }
        })
        .unwrap_err();
        assert!(err.to_string().contains("expected"));
    }

    #[test]
    fn expansion_wires_event_and_read_only() {
        let out = derive_impl(quote! {
            struct S {
                #[bindable(readonly)]
                id: RefCell<i32>,
                name: RefCell<String>,
                #[bindable(notify)]
                changed: PropertyChangedEvent,
            }
        })
        .unwrap()
        .to_string()
        .replace(' ', "");
        assert!(out.contains("fnproperty_changed"));
        assert!(out.contains("read_only(\"Id\")"));
        assert!(out.contains(
            "set_cell(&self.name,\"Name\",value,::core::option::Option::Some(&self.changed))"
        ));
    }

    #[test]
    fn expansion_without_notify_has_no_event() {
        let out = derive_impl(quote! {
            struct S { name: RefCell<String> }
        })
        .unwrap()
        .to_string()
        .replace(' ', "");
        assert!(!out.contains("fnproperty_changed"));
        assert!(out.contains("value,::core::option::Option::None"));
    }
}
