//! Contract schemas and argument validation.
//!
//! A contract schema describes the constructor and methods a deployed
//! contract exposes, with a type for every parameter. Types are written in a
//! small JSON language:
//!
//! - primitive names: `"any"`, `"null"`, `"bool"`, `"string"`, `"bytes"`,
//!   `"address"`, `"int"`, `"array"`, `"dict"`
//! - `[{"$rep": T}]`: an array whose every element is a `T`
//! - `[T1, T2, ...]`: a tuple-like array
//! - `{"$or": [T1, T2, ...]}`: any of the listed types
//! - `{"$dict": T}`: a map whose every value is a `T`
//! - `{"key": T, ...}`: a struct-like map

use crate::calldata::CalldataValue;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Error validating arguments against a contract schema.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema has no method with the requested name.
    #[error("schema missing method: {0}")]
    UnknownMethod(String),
    /// A declared parameter has no value.
    #[error("missing argument {name:?} for {method} (index {index})")]
    MissingArgument {
        /// The parameter name.
        name: String,
        /// The method name.
        method: String,
        /// The parameter's position.
        index: usize,
    },
    /// A value does not match the declared parameter type.
    #[error("invalid argument {name:?} for {method} (index {index})")]
    InvalidArgument {
        /// The parameter name.
        name: String,
        /// The method name.
        method: String,
        /// The parameter's position.
        index: usize,
    },
    /// The schema JSON is malformed.
    #[error("invalid schema type: {0}")]
    InvalidType(String),
}

/// A parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSchema {
    /// Any value.
    Any,
    /// The null sentinel.
    Null,
    /// A boolean.
    Bool,
    /// A string.
    String,
    /// A byte string, or its textual hex form.
    Bytes,
    /// An address, or its textual hex form.
    Address,
    /// An integer.
    Int,
    /// Any array.
    Array,
    /// Any map.
    Dict,
    /// An array whose elements all match the inner type.
    Repeated(Box<ParamSchema>),
    /// A tuple-like array. Only the array shape is checked.
    Tuple(Vec<ParamSchema>),
    /// A value matching at least one of the alternatives.
    Or(Vec<ParamSchema>),
    /// A map whose values all match the inner type.
    DictOf(Box<ParamSchema>),
    /// A struct-like map. Every listed key that is present must match.
    Struct(BTreeMap<String, ParamSchema>),
    /// A primitive name this crate does not know. Accepts anything.
    Unknown(String),
}

impl ParamSchema {
    /// Check a value against this type.
    pub fn validate(&self, value: &CalldataValue) -> bool {
        use CalldataValue as V;
        match self {
            Self::Any | Self::Unknown(_) => true,
            Self::Null => value.is_null(),
            Self::Bool => matches!(value, V::Bool(_)),
            Self::String => matches!(value, V::String(_)),
            Self::Bytes => matches!(value, V::Bytes(_) | V::String(_)),
            Self::Address => matches!(value, V::Address(_) | V::String(_)),
            Self::Int => matches!(value, V::Int(_)),
            Self::Array | Self::Tuple(_) => matches!(value, V::Array(_)),
            Self::Dict => matches!(value, V::Map(_)),
            Self::Repeated(inner) => {
                value.as_array().is_some_and(|items| items.iter().all(|v| inner.validate(v)))
            }
            Self::Or(alts) => alts.iter().any(|t| t.validate(value)),
            Self::DictOf(inner) => {
                value.as_map().is_some_and(|map| map.values().all(|v| inner.validate(v)))
            }
            Self::Struct(fields) => value.as_map().map_or(true, |map| {
                fields.iter().all(|(key, ty)| map.get(key).map_or(true, |v| ty.validate(v)))
            }),
        }
    }
}

impl TryFrom<Value> for ParamSchema {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(match name.as_str() {
                "any" => Self::Any,
                "null" => Self::Null,
                "bool" => Self::Bool,
                "string" => Self::String,
                "bytes" => Self::Bytes,
                "address" => Self::Address,
                "int" => Self::Int,
                "array" => Self::Array,
                "dict" => Self::Dict,
                _ => Self::Unknown(name),
            }),
            Value::Array(mut items) => {
                if items.len() == 1 {
                    if let Some(inner) = items[0].get_mut("$rep").map(Value::take) {
                        return Ok(Self::Repeated(Box::new(inner.try_into()?)));
                    }
                }
                items.into_iter().map(Self::try_from).collect::<Result<_, _>>().map(Self::Tuple)
            }
            Value::Object(mut map) => {
                if let Some(Value::Array(alts)) = map.get_mut("$or").map(Value::take) {
                    let alts = alts.into_iter().map(Self::try_from);
                    return alts.collect::<Result<_, _>>().map(Self::Or);
                }
                if let Some(inner) = map.remove("$dict") {
                    return Ok(Self::DictOf(Box::new(inner.try_into()?)));
                }
                map.into_iter()
                    .map(|(k, v)| Self::try_from(v).map(|t| (k, t)))
                    .collect::<Result<_, _>>()
                    .map(Self::Struct)
            }
            other => Err(SchemaError::InvalidType(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for ParamSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer)?.try_into().map_err(de::Error::custom)
    }
}

/// Constructor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ContractCtor {
    /// Positional parameters, as `[name, type]` pairs.
    pub params: Vec<(String, ParamSchema)>,
    /// Keyword parameters.
    #[serde(default)]
    pub kwparams: BTreeMap<String, ParamSchema>,
}

/// A contract method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractMethod {
    /// Positional parameters, as `[name, type]` pairs.
    pub params: Vec<(String, ParamSchema)>,
    /// Keyword parameters.
    #[serde(default)]
    pub kwparams: BTreeMap<String, ParamSchema>,
    /// The return type.
    pub ret: ParamSchema,
    /// Whether the method only reads state.
    pub readonly: bool,
    /// Whether the method accepts value.
    #[serde(default)]
    pub payable: bool,
}

/// The schema of a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContractSchema {
    /// The constructor.
    pub ctor: ContractCtor,
    /// Methods, by name.
    pub methods: BTreeMap<String, ContractMethod>,
}

/// Order named argument values by the method's declared parameters.
///
/// Every declared parameter must have a value. With `strict`, each value must
/// also match its declared type. Values for undeclared names are ignored.
pub fn build_positional_args(
    schema: &ContractSchema,
    method: &str,
    values: &BTreeMap<String, CalldataValue>,
    strict: bool,
) -> Result<Vec<CalldataValue>, SchemaError> {
    let decl = schema
        .methods
        .get(method)
        .ok_or_else(|| SchemaError::UnknownMethod(method.to_owned()))?;

    decl.params
        .iter()
        .enumerate()
        .map(|(index, (name, ty))| {
            let value = values.get(name).ok_or_else(|| SchemaError::MissingArgument {
                name: name.clone(),
                method: method.to_owned(),
                index,
            })?;
            if strict && !ty.validate(value) {
                return Err(SchemaError::InvalidArgument {
                    name: name.clone(),
                    method: method.to_owned(),
                    index,
                });
            }
            Ok(value.clone())
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn schema() -> ContractSchema {
        serde_json::from_value(json!({
            "ctor": {"params": [["owner", "address"]], "kwparams": {}},
            "methods": {
                "transfer": {
                    "params": [["to", "address"], ["amount", "int"]],
                    "kwparams": {},
                    "ret": "null",
                    "readonly": false
                },
                "tag": {
                    "params": [
                        ["labels", [{"$rep": "string"}]],
                        ["meta", {"$or": ["null", {"$dict": "int"}]}]
                    ],
                    "kwparams": {},
                    "ret": "any",
                    "readonly": true
                }
            }
        }))
        .unwrap()
    }

    fn args<const N: usize>(pairs: [(&str, CalldataValue); N]) -> BTreeMap<String, CalldataValue> {
        pairs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()
    }

    #[test]
    fn parses_schema() {
        let schema = schema();
        assert_eq!(schema.ctor.params[0], ("owner".to_owned(), ParamSchema::Address));
        let tag = &schema.methods["tag"];
        assert!(tag.readonly);
        assert_eq!(tag.params[0].1, ParamSchema::Repeated(Box::new(ParamSchema::String)));
        assert_eq!(
            tag.params[1].1,
            ParamSchema::Or(vec![
                ParamSchema::Null,
                ParamSchema::DictOf(Box::new(ParamSchema::Int))
            ])
        );
    }

    #[test]
    fn orders_arguments() {
        let values =
            args([("amount", 100u8.into()), ("to", "0xabc".into()), ("extra", true.into())]);
        let positional = build_positional_args(&schema(), "transfer", &values, true).unwrap();
        assert_eq!(positional, vec![CalldataValue::from("0xabc"), 100u8.into()]);
    }

    #[test]
    fn missing_and_invalid() {
        let schema = schema();
        assert_eq!(
            build_positional_args(&schema, "nope", &BTreeMap::new(), true),
            Err(SchemaError::UnknownMethod("nope".to_owned()))
        );

        let values = args([("to", "0xabc".into())]);
        assert_eq!(
            build_positional_args(&schema, "transfer", &values, true),
            Err(SchemaError::MissingArgument {
                name: "amount".to_owned(),
                method: "transfer".to_owned(),
                index: 1
            })
        );

        let values = args([("to", "0xabc".into()), ("amount", "100".into())]);
        assert!(matches!(
            build_positional_args(&schema, "transfer", &values, true),
            Err(SchemaError::InvalidArgument { index: 1, .. })
        ));
        assert!(build_positional_args(&schema, "transfer", &values, false).is_ok());
    }

    #[test]
    fn nested_types() {
        let schema = schema();
        let ok = args([
            ("labels", CalldataValue::Array(vec!["a".into(), "b".into()])),
            ("meta", [("n", CalldataValue::from(1u8))].into_iter().collect()),
        ]);
        assert!(build_positional_args(&schema, "tag", &ok, true).is_ok());

        let bad = args([
            ("labels", CalldataValue::Array(vec!["a".into(), 1u8.into()])),
            ("meta", CalldataValue::Null),
        ]);
        assert!(matches!(
            build_positional_args(&schema, "tag", &bad, true),
            Err(SchemaError::InvalidArgument { index: 0, .. })
        ));
    }

    #[test]
    fn struct_checks_present_keys() {
        let ty: ParamSchema = serde_json::from_value(json!({"a": "int", "b": "string"})).unwrap();
        let partial: CalldataValue = [("a", CalldataValue::from(1u8))].into_iter().collect();
        assert!(ty.validate(&partial));
        let wrong: CalldataValue = [("b", CalldataValue::from(1u8))].into_iter().collect();
        assert!(!ty.validate(&wrong));
    }
}
