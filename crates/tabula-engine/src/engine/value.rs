//! Runtime values and declared property types.
//!
//! [`Value`] is the closed tagged union every formula evaluates to.
//! [`PropertyType`] names the host-side declared type of a property target;
//! the numeric class (all sized integers plus Float/Double/Decimal) is
//! mutually convertible for type-compatibility purposes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A runtime value produced by evaluation or stored in a Data slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    /// Opaque handle to a host object.
    ObjectRef(u64),
    Vector([f64; 3]),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Text(_) => ValueKind::Text,
            Value::ObjectRef(_) => ValueKind::ObjectRef,
            Value::Vector(_) => ValueKind::Vector,
        }
    }

    /// Numeric view of the value, if it has one. Booleans and text do not
    /// coerce; arithmetic is strictly over numerics.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::ObjectRef(h) => write!(f, "object:{}", h),
            Value::Vector([x, y, z]) => write!(f, "({}, {}, {})", x, y, z),
        }
    }
}

/// Discriminant of [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    Text,
    ObjectRef,
    Vector,
}

impl ValueKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::Text => "text",
            ValueKind::ObjectRef => "object reference",
            ValueKind::Vector => "vector",
        })
    }
}

/// Declared type of a host property, as reported by the type resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Decimal,
    Boolean,
    String,
    ObjectRef,
    Vector,
}

impl PropertyType {
    /// Membership in the numeric class: every sized integer plus Float,
    /// Double and Decimal. Any member converts to any other member.
    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            PropertyType::Boolean
                | PropertyType::String
                | PropertyType::ObjectRef
                | PropertyType::Vector
        )
    }

    /// The runtime kind a property of this type reads/writes as.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            PropertyType::Float | PropertyType::Double | PropertyType::Decimal => ValueKind::Float,
            PropertyType::Boolean => ValueKind::Boolean,
            PropertyType::String => ValueKind::Text,
            PropertyType::ObjectRef => ValueKind::ObjectRef,
            PropertyType::Vector => ValueKind::Vector,
            _ => ValueKind::Integer,
        }
    }

    /// Whether a value of `kind` may be written to a property of this type:
    /// exact match, or both sides in the numeric class.
    pub fn accepts(&self, kind: ValueKind) -> bool {
        self.value_kind() == kind || (self.is_numeric() && kind.is_numeric())
    }

    /// Parse a user-entered literal for this type. Returns None when the
    /// text does not form a value of the type (including out-of-range
    /// sized integers).
    pub fn parse_literal(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        match self {
            PropertyType::Float | PropertyType::Double | PropertyType::Decimal => {
                text.parse::<f64>().ok().filter(|n| n.is_finite()).map(Value::Float)
            }
            PropertyType::Boolean => match text {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            PropertyType::String => Some(Value::Text(text.to_string())),
            PropertyType::ObjectRef | PropertyType::Vector => None,
            _ => {
                let n = text.parse::<i64>().ok()?;
                let (lo, hi) = self.integer_bounds()?;
                (lo <= n && n <= hi).then_some(Value::Integer(n))
            }
        }
    }

    fn integer_bounds(&self) -> Option<(i64, i64)> {
        match self {
            PropertyType::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            PropertyType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            PropertyType::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            PropertyType::Int64 => Some((i64::MIN, i64::MAX)),
            PropertyType::UInt8 => Some((0, u8::MAX as i64)),
            PropertyType::UInt16 => Some((0, u16::MAX as i64)),
            PropertyType::UInt32 => Some((0, u32::MAX as i64)),
            PropertyType::UInt64 => Some((0, i64::MAX)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Int8 => "Int8",
            PropertyType::Int16 => "Int16",
            PropertyType::Int32 => "Int32",
            PropertyType::Int64 => "Int64",
            PropertyType::UInt8 => "UInt8",
            PropertyType::UInt16 => "UInt16",
            PropertyType::UInt32 => "UInt32",
            PropertyType::UInt64 => "UInt64",
            PropertyType::Float => "Float",
            PropertyType::Double => "Double",
            PropertyType::Decimal => "Decimal",
            PropertyType::Boolean => "Boolean",
            PropertyType::String => "String",
            PropertyType::ObjectRef => "ObjectRef",
            PropertyType::Vector => "Vector",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
