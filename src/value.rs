//! Dynamic values flowing through a binding chain.
//!
//! [`Value`] is what property getters return and setters accept.
//! [`BindValue`] converts between `Value` and concrete Rust types; the derive
//! macro uses it for every `RefCell<T>` property field.

use std::fmt;
use std::rc::Rc;

use crate::object::{AccessError, Bindable};

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

/// The runtime type of a [`Value`], or a property/parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Accepts every value.
    Any,
    Null,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Object,
}

impl ValueType {
    /// Whether a slot of this type accepts a value of type `found`.
    ///
    /// Object slots also accept `Null`.
    pub fn accepts(self, found: ValueType) -> bool {
        match self {
            ValueType::Any => true,
            ValueType::Object => matches!(found, ValueType::Object | ValueType::Null),
            expected => expected == found,
        }
    }

    /// Whether this is one of the integer or floating point types.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::I8
                | ValueType::I16
                | ValueType::I32
                | ValueType::I64
                | ValueType::U8
                | ValueType::U16
                | ValueType::U32
                | ValueType::U64
                | ValueType::F32
                | ValueType::F64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::U8 => "u8",
            ValueType::U16 => "u16",
            ValueType::U32 => "u32",
            ValueType::U64 => "u64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::String => "String",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A dynamically typed value.
///
/// Equality on [`Value::Object`] is identity: two values are equal when they
/// point at the same allocation.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Object(Rc<dyn Bindable>),
}

impl Value {
    /// Wrap a shared object.
    pub fn object<T: Bindable>(object: Rc<T>) -> Self {
        Value::Object(object)
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::I8(_) => ValueType::I8,
            Value::I16(_) => ValueType::I16,
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::U8(_) => ValueType::U8,
            Value::U16(_) => ValueType::U16,
            Value::U32(_) => ValueType::U32,
            Value::U64(_) => ValueType::U64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::String(_) => ValueType::String,
            Value::Object(_) => ValueType::Object,
        }
    }

    /// The object's own type name, or the primitive type name.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Object(obj) => obj.type_name(),
            other => other.value_type().name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&Rc<dyn Bindable>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as an integer, if it is an integer or an integral float.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::I8(n) => Some(n.into()),
            Value::I16(n) => Some(n.into()),
            Value::I32(n) => Some(n.into()),
            Value::I64(n) => Some(n.into()),
            Value::U8(n) => Some(n.into()),
            Value::U16(n) => Some(n.into()),
            Value::U32(n) => Some(n.into()),
            Value::U64(n) => Some(n.into()),
            Value::F32(n) => integral(f64::from(n)),
            Value::F64(n) => integral(n),
            _ => None,
        }
    }

    /// The value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(n) => Some(f64::from(n)),
            Value::F64(n) => Some(n),
            _ => self.as_integer().map(|n| n as f64),
        }
    }

    /// Convert a number literal to a value of numeric type `ty`.
    ///
    /// Integer targets round half to even and must be in range. `Any` yields
    /// `F64`. Returns `None` when `ty` is not numeric or the value does not fit.
    pub fn from_number(n: f64, ty: ValueType) -> Option<Value> {
        macro_rules! int {
            ($variant:ident, $ty:ty) => {{
                let r = n.round_ties_even();
                // `MAX as f64` can round up past the real maximum for 64-bit types.
                if r >= <$ty>::MIN as f64 && r < (<$ty>::MAX as f64) + 1.0 {
                    Some(Value::$variant(r as $ty))
                } else {
                    None
                }
            }};
        }

        match ty {
            ValueType::I8 => int!(I8, i8),
            ValueType::I16 => int!(I16, i16),
            ValueType::I32 => int!(I32, i32),
            ValueType::I64 => int!(I64, i64),
            ValueType::U8 => int!(U8, u8),
            ValueType::U16 => int!(U16, u16),
            ValueType::U32 => int!(U32, u32),
            ValueType::U64 => int!(U64, u64),
            ValueType::F32 => {
                let f = n as f32;
                f.is_finite().then_some(Value::F32(f))
            }
            ValueType::F64 | ValueType::Any => Some(Value::F64(n)),
            _ => None,
        }
    }
}

impl Value {
    /// Convert into a value storable in a slot of type `ty`.
    ///
    /// `Null` fits every slot. Numbers convert between numeric types when the
    /// value survives the conversion (integers must be integral and in range).
    pub fn coerce(self, ty: ValueType) -> Result<Value, AccessError> {
        if self.is_null() || ty.accepts(self.value_type()) {
            return Ok(self);
        }
        if !(ty.is_numeric() && self.value_type().is_numeric()) {
            return Err(AccessError::type_mismatch(ty, &self));
        }
        let converted = match ty {
            ValueType::I8 => i8::from_value(self.clone()).map(Value::from),
            ValueType::I16 => i16::from_value(self.clone()).map(Value::from),
            ValueType::I32 => i32::from_value(self.clone()).map(Value::from),
            ValueType::I64 => i64::from_value(self.clone()).map(Value::from),
            ValueType::U8 => u8::from_value(self.clone()).map(Value::from),
            ValueType::U16 => u16::from_value(self.clone()).map(Value::from),
            ValueType::U32 => u32::from_value(self.clone()).map(Value::from),
            ValueType::U64 => u64::from_value(self.clone()).map(Value::from),
            ValueType::F32 => f32::from_value(self.clone()).map(Value::from),
            _ => f64::from_value(self.clone()).map(Value::from),
        };
        converted.map_err(|_| AccessError::type_mismatch(ty, &self))
    }
}

fn integral(n: f64) -> Option<i128> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < 1.7e38).then_some(n as i128)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::I8(v) => f.debug_tuple("I8").field(v).finish(),
            Value::I16(v) => f.debug_tuple("I16").field(v).finish(),
            Value::I32(v) => f.debug_tuple("I32").field(v).finish(),
            Value::I64(v) => f.debug_tuple("I64").field(v).finish(),
            Value::U8(v) => f.debug_tuple("U8").field(v).finish(),
            Value::U16(v) => f.debug_tuple("U16").field(v).finish(),
            Value::U32(v) => f.debug_tuple("U32").field(v).finish(),
            Value::U64(v) => f.debug_tuple("U64").field(v).finish(),
            Value::F32(v) => f.debug_tuple("F32").field(v).finish(),
            Value::F64(v) => f.debug_tuple("F64").field(v).finish(),
            Value::String(v) => f.debug_tuple("String").field(v).finish(),
            Value::Object(obj) => write!(f, "Object(<{}>)", obj.type_name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Object(obj) => write!(f, "<{}>", obj.type_name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Rc<dyn Bindable>> for Value {
    fn from(obj: Rc<dyn Bindable>) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// BindValue
// ---------------------------------------------------------------------------

/// Conversion between a concrete property type and [`Value`].
pub trait BindValue: Sized {
    /// The declared type of a property holding `Self`.
    fn value_type() -> ValueType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, AccessError>;
}

macro_rules! int_bind_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl BindValue for $ty {
            fn value_type() -> ValueType {
                ValueType::$variant
            }

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            /// Accepts any integer or integral float that fits.
            fn from_value(value: Value) -> Result<Self, AccessError> {
                value
                    .as_integer()
                    .and_then(|n| <$ty>::try_from(n).ok())
                    .ok_or_else(|| AccessError::type_mismatch(ValueType::$variant, &value))
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    )*};
}

int_bind_value! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
}

impl BindValue for f64 {
    fn value_type() -> ValueType {
        ValueType::F64
    }

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        value
            .as_f64()
            .ok_or_else(|| AccessError::type_mismatch(ValueType::F64, &value))
    }
}

impl BindValue for f32 {
    fn value_type() -> ValueType {
        ValueType::F32
    }

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        value
            .as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| AccessError::type_mismatch(ValueType::F32, &value))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl BindValue for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        value
            .as_bool()
            .ok_or_else(|| AccessError::type_mismatch(ValueType::Bool, &value))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl BindValue for String {
    fn value_type() -> ValueType {
        ValueType::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(AccessError::type_mismatch(ValueType::String, &other)),
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl BindValue for Value {
    fn value_type() -> ValueType {
        ValueType::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        Ok(value)
    }
}

impl<T: Bindable> BindValue for Rc<T> {
    fn value_type() -> ValueType {
        ValueType::Object
    }

    fn to_value(&self) -> Value {
        Value::Object(Rc::clone(self) as Rc<dyn Bindable>)
    }

    /// Recovers the concrete type; an object of another type is a mismatch.
    fn from_value(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::Object(obj) => obj.into_any().downcast::<T>().map_err(|_| {
                AccessError::TypeMismatch {
                    expected: ValueType::Object,
                    found: ValueType::Object,
                }
            }),
            other => Err(AccessError::type_mismatch(ValueType::Object, &other)),
        }
    }
}

/// `None` maps to [`Value::Null`] and back.
impl<T: BindValue> BindValue for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self, AccessError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
