//! Conversions between resolver output and dynamic-schema values.

use std::collections::HashMap;

use async_graphql::dynamic::FieldValue;
use async_graphql::{Name, Value};

/// What a named output type is, as far as value conversion cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputKind {
    Scalar,
    Object,
    Abstract,
    Enum,
}

pub(crate) type TypeKinds = HashMap<String, OutputKind>;

/// Type of a field or argument with nullability dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutputShape {
    Named(String),
    List(Box<OutputShape>),
}

/// Field of an input object, with its SDL default converted to JSON.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InputField {
    pub name: String,
    pub shape: OutputShape,
    pub default: Option<serde_json::Value>,
}

/// Input object fields by type name.
pub(crate) type InputObjects = HashMap<String, Vec<InputField>>;

/// Fills fields missing from input objects inside `value` with their
/// declared defaults, recursing through lists and nested inputs.
pub(crate) fn apply_input_defaults(
    value: &mut serde_json::Value,
    shape: &OutputShape,
    inputs: &InputObjects,
) {
    match (shape, value) {
        (OutputShape::List(inner), serde_json::Value::Array(items)) => {
            for item in items {
                apply_input_defaults(item, inner, inputs);
            }
        }
        (OutputShape::Named(type_name), serde_json::Value::Object(object)) => {
            let Some(fields) = inputs.get(type_name) else {
                return;
            };
            for field in fields {
                if !object.contains_key(&field.name) {
                    let Some(default) = &field.default else {
                        continue;
                    };
                    object.insert(field.name.clone(), default.clone());
                }
                if let Some(nested) = object.get_mut(&field.name) {
                    apply_input_defaults(nested, &field.shape, inputs);
                }
            }
        }
        _ => {}
    }
}

/// Converts a JSON value to a GraphQL value.
pub(crate) fn json_to_graphql_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else if let Some(f) = n.as_f64() {
                async_graphql::Number::from_f64(f).map_or(Value::Null, Value::Number)
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => {
            Value::List(arr.into_iter().map(json_to_graphql_value).collect())
        }
        serde_json::Value::Object(obj) => Value::Object(
            obj.into_iter()
                .map(|(k, v)| (Name::new(k), json_to_graphql_value(v)))
                .collect(),
        ),
    }
}

/// Shapes a resolver's JSON output for the dynamic schema.
///
/// Enum outputs become enum values, lists are split into list field values,
/// and objects returned for interfaces or unions are tagged with their
/// `__typename`.
pub(crate) fn to_field_value<'a>(
    value: serde_json::Value,
    shape: &OutputShape,
    kinds: &TypeKinds,
) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
    if value.is_null() {
        return Ok(None);
    }

    match shape {
        OutputShape::List(inner) => {
            let serde_json::Value::Array(items) = value else {
                return Err(async_graphql::Error::new(format!(
                    "Expected a list, got {}",
                    json_kind(&value)
                )));
            };
            let items = items
                .into_iter()
                .map(|item| {
                    Ok(to_field_value(item, inner, kinds)?
                        .unwrap_or_else(|| FieldValue::value(Value::Null)))
                })
                .collect::<Result<Vec<_>, async_graphql::Error>>()?;
            Ok(Some(FieldValue::list(items)))
        }
        OutputShape::Named(type_name) => match kinds.get(type_name) {
            Some(OutputKind::Enum) => match value {
                serde_json::Value::String(item) => {
                    Ok(Some(FieldValue::value(Value::Enum(Name::new(item)))))
                }
                other => Ok(Some(FieldValue::value(json_to_graphql_value(other)))),
            },
            Some(OutputKind::Abstract) => {
                let concrete = value
                    .get("__typename")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        async_graphql::Error::new(format!(
                            "Value for abstract type '{type_name}' is missing __typename"
                        ))
                    })?;
                Ok(Some(
                    FieldValue::value(json_to_graphql_value(value)).with_type(concrete),
                ))
            }
            _ => Ok(Some(FieldValue::value(json_to_graphql_value(value)))),
        },
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
