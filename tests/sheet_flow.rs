//! End-to-end flows through the public facade.

use std::collections::HashMap;

use tabula::{
    Column, ColumnKind, ErrorKind, ObjectHandle, PropertyError, PropertyStore, PropertyTarget,
    PropertyType, Session, SlotRef, TypeHandle, TypeResolver, Value, Variable, VariableKind,
    validate_data_value,
};

struct MemStore {
    props: HashMap<(u64, String, String), Value>,
}

impl MemStore {
    fn new() -> Self {
        MemStore {
            props: HashMap::new(),
        }
    }

    fn with(mut self, object: u64, type_name: &str, path: &str, value: Value) -> Self {
        self.props
            .insert((object, type_name.to_string(), path.to_string()), value);
        self
    }
}

impl PropertyStore for MemStore {
    fn get(
        &self,
        object: ObjectHandle,
        type_name: &str,
        path: &str,
    ) -> Result<Value, PropertyError> {
        self.props
            .get(&(object.0, type_name.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| PropertyError::PathInvalid {
                type_name: type_name.to_string(),
                path: path.to_string(),
            })
    }

    fn set(
        &mut self,
        object: ObjectHandle,
        type_name: &str,
        path: &str,
        value: Value,
    ) -> Result<bool, PropertyError> {
        self.props
            .insert((object.0, type_name.to_string(), path.to_string()), value);
        Ok(true)
    }
}

struct WidgetResolver;

impl TypeResolver for WidgetResolver {
    fn resolve(&self, type_name: &str) -> Option<TypeHandle> {
        (type_name == "Widget").then(|| TypeHandle {
            name: type_name.to_string(),
        })
    }

    fn property_type(&self, _handle: &TypeHandle, path: &str) -> Option<PropertyType> {
        match path {
            "width" => Some(PropertyType::Float),
            "count" => Some(PropertyType::Int32),
            "label" => Some(PropertyType::String),
            _ => None,
        }
    }
}

fn data_column(id: u32, value: i64) -> Column {
    Column {
        id,
        kind: ColumnKind::Data {
            value_type: PropertyType::Int64,
            value: Value::Integer(value),
            slider: None,
        },
    }
}

fn formula_column(id: u32, text: &str) -> Column {
    Column {
        id,
        kind: ColumnKind::Formula {
            text: text.to_string(),
            target: None,
        },
    }
}

#[test]
fn formula_result_follows_upstream_edit() {
    let mut session = Session::new();
    let mut store = MemStore::new();

    session.set_column(data_column(0, 5));
    session.set_column(formula_column(1, "C0 + 2"));
    session.evaluate_all(&mut store, &WidgetResolver, None);
    assert_eq!(
        session.cached_value(SlotRef::Column(1)),
        Some(&Value::Integer(7))
    );

    session.set_column(data_column(0, 10));
    session.evaluate_all(&mut store, &WidgetResolver, None);
    assert_eq!(
        session.cached_value(SlotRef::Column(1)),
        Some(&Value::Integer(12))
    );
}

#[test]
fn cycle_is_excluded_and_diagnosed_without_aborting() {
    let mut session = Session::new();
    let mut store = MemStore::new();

    session.set_column(formula_column(0, "C1 * 2"));
    session.set_column(formula_column(1, "C0 * 2"));
    session.set_column(formula_column(2, "1 + 1"));
    session.evaluate_all(&mut store, &WidgetResolver, None);

    assert!(session.cached_value(SlotRef::Column(0)).is_none());
    assert!(session.cached_value(SlotRef::Column(1)).is_none());
    assert_eq!(
        session.cached_value(SlotRef::Column(2)),
        Some(&Value::Integer(2))
    );
    assert!(
        session
            .diagnostics()
            .iter()
            .all(|d| d.kind == ErrorKind::CircularDependency && d.marker() == "#CIRC!")
    );

    let validation = session.validate_column(0, &WidgetResolver);
    assert_eq!(validation.kind, Some(ErrorKind::CircularDependency));
    assert!(!validation.suggestion.is_empty());
}

#[test]
fn one_bad_formula_does_not_poison_the_pass() {
    let mut session = Session::new();
    let mut store = MemStore::new();

    session.set_column(formula_column(0, "1 / 0"));
    session.set_column(formula_column(1, "3 * 3"));
    session.evaluate_all(&mut store, &WidgetResolver, None);

    assert!(session.cached_value(SlotRef::Column(0)).is_none());
    assert_eq!(
        session.cached_value(SlotRef::Column(1)),
        Some(&Value::Integer(9))
    );
    assert_eq!(session.diagnostics().len(), 1);
    assert_eq!(session.diagnostics()[0].slot, SlotRef::Column(0));
}

#[test]
fn variables_feed_columns_and_write_back_to_properties() {
    let mut session = Session::new();
    let mut store = MemStore::new().with(1, "Widget", "width", Value::Float(4.0));

    session.set_variable(Variable {
        id: 0,
        kind: VariableKind::Data {
            value: Value::Float(0.5),
        },
    });
    session.set_column(Column {
        id: 0,
        kind: ColumnKind::Property {
            target: PropertyTarget::new("Widget", "width"),
        },
    });
    session.set_column(Column {
        id: 1,
        kind: ColumnKind::Formula {
            text: "C0 * V0".to_string(),
            target: Some(PropertyTarget::new("Widget", "width")),
        },
    });

    session.evaluate_all(&mut store, &WidgetResolver, Some(ObjectHandle(1)));
    assert!(session.diagnostics().is_empty());
    assert_eq!(
        session.cached_value(SlotRef::Column(1)),
        Some(&Value::Float(2.0))
    );
    assert_eq!(
        store
            .get(ObjectHandle(1), "Widget", "width")
            .expect("written back"),
        Value::Float(2.0)
    );
}

#[test]
fn numeric_class_converts_but_text_does_not() {
    let mut session = Session::new();

    // Integer-producing formula into a Float property is accepted.
    session.set_column(Column {
        id: 0,
        kind: ColumnKind::Formula {
            text: "1 + 2".to_string(),
            target: Some(PropertyTarget::new("Widget", "width")),
        },
    });
    assert!(session.validate_column(0, &WidgetResolver).is_valid);

    // Text into an Int32 property is not.
    session.set_column(Column {
        id: 1,
        kind: ColumnKind::Formula {
            text: "\"n/a\"".to_string(),
            target: Some(PropertyTarget::new("Widget", "count")),
        },
    });
    let result = session.validate_column(1, &WidgetResolver);
    assert_eq!(result.kind, Some(ErrorKind::TypeMismatch));
}

#[test]
fn data_value_validation_names_the_expected_type() {
    let ok = validate_data_value(PropertyType::Float, "3.25");
    assert!(ok.is_valid);

    let bad = validate_data_value(PropertyType::Boolean, "maybe");
    assert!(!bad.is_valid);
    assert_eq!(bad.kind, Some(ErrorKind::TypeMismatch));
    assert!(bad.message.contains("Boolean"));
    assert!(!bad.suggestion.is_empty());
}

#[test]
fn sheet_report_aggregates_per_column() {
    let mut session = Session::new();
    let mut store = MemStore::new().with(1, "Widget", "width", Value::Float(1.0));

    session.set_column(Column {
        id: 0,
        kind: ColumnKind::Property {
            target: PropertyTarget::new("Widget", "width"),
        },
    });

    let rows = [ObjectHandle(1), ObjectHandle(2), ObjectHandle(3)];
    let report = session.evaluate_sheet(&mut store, &WidgetResolver, &rows);

    assert_eq!(report.len(), 1);
    assert_eq!(report[0].kind, ErrorKind::PropertyPathInvalid);
    assert_eq!(report[0].affected_rows, Some(2));
}
