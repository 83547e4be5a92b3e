//! Slot definitions: columns and variables.
//!
//! A slot has exactly one kind at a time - Data (a literal), Property
//! (read through the host's property store), or Formula (an expression
//! over other slots). Changing the kind invalidates the slot's cached
//! graph edges; the session handles that on every edit.

use serde::{Deserialize, Serialize};

use tabula_engine::engine::{PropertyType, SlotRef, Value};

/// A (target type, property path) pair a column reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyTarget {
    pub type_name: String,
    pub path: String,
}

impl PropertyTarget {
    pub fn new(type_name: impl Into<String>, path: impl Into<String>) -> Self {
        PropertyTarget {
            type_name: type_name.into(),
            path: path.into(),
        }
    }
}

/// Bounds for a slider-edited numeric Data column. Valid only when
/// `min` is strictly less than `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// A literal value of a declared type.
    Data {
        value_type: PropertyType,
        value: Value,
        slider: Option<SliderRange>,
    },
    /// Read from a host object property each pass.
    Property { target: PropertyTarget },
    /// Computed from other slots; optionally written back to a target.
    Formula {
        text: String,
        target: Option<PropertyTarget>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: u32,
    pub kind: ColumnKind,
}

impl Column {
    pub fn slot(&self) -> SlotRef {
        SlotRef::Column(self.id)
    }

    pub fn formula_text(&self) -> Option<&str> {
        match &self.kind {
            ColumnKind::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The property target this column declares, if any (Property columns
    /// always, Formula columns when they write back).
    pub fn target(&self) -> Option<&PropertyTarget> {
        match &self.kind {
            ColumnKind::Property { target } => Some(target),
            ColumnKind::Formula { target, .. } => target.as_ref(),
            ColumnKind::Data { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableKind {
    Data { value: Value },
    Formula { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: u32,
    pub kind: VariableKind,
}

impl Variable {
    pub fn slot(&self) -> SlotRef {
        SlotRef::Variable(self.id)
    }

    pub fn formula_text(&self) -> Option<&str> {
        match &self.kind {
            VariableKind::Formula { text } => Some(text),
            _ => None,
        }
    }
}
