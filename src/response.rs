//! Read-only views over decoded JSON responses.
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::{Error, Result};

/// A decoded JSON object with every nested object wrapped into another `ApiResponse`.
///
/// Fields are reachable both by name lookup that may fail ([`ApiResponse::field`]) and by plain
/// map lookup ([`ApiResponse::get`]). A missing field is an error for the former and `None` for
/// the latter; use [`ApiResponse::contains`] to test presence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiResponse {
    fields: BTreeMap<String, ResponseValue>,
}

/// A single value inside an [`ApiResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(Number),
    /// JSON string.
    String(String),
    /// List with every element wrapped.
    List(Vec<ResponseValue>),
    /// Nested object.
    Object(ApiResponse),
}

impl ApiResponse {
    /// Wrap a decoded JSON object.
    pub fn new(object: Map<String, Value>) -> ApiResponse {
        ApiResponse {
            fields: object
                .into_iter()
                .map(|(key, value)| (key, ResponseValue::from(value)))
                .collect(),
        }
    }

    /// Wrap a decoded response body, unwrapping a lone top-level `response` envelope.
    ///
    /// Fails with [`Error::UnexpectedPayload`] if the body (or the envelope contents) is not an
    /// object.
    pub fn from_body(body: Value) -> Result<ApiResponse> {
        let Value::Object(mut object) = body else {
            return Err(Error::UnexpectedPayload);
        };
        if object.len() == 1 {
            if let Some(inner) = object.remove("response") {
                return match inner {
                    Value::Object(inner) => Ok(ApiResponse::new(inner)),
                    _ => Err(Error::UnexpectedPayload),
                };
            }
        }
        Ok(ApiResponse::new(object))
    }

    /// Field `name`, or `None` if it is absent.
    pub fn get(&self, name: &str) -> Option<&ResponseValue> {
        self.fields.get(name)
    }

    /// Look up a field, failing if it is absent.
    pub fn field(&self, name: &str) -> Result<&ResponseValue> {
        self.fields.get(name).ok_or_else(|| Error::MissingField {
            name: name.to_owned(),
        })
    }

    /// Whether field `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate over field names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate over fields, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResponseValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// String field.
    pub fn str(&self, name: &str) -> Result<&str> {
        self.field(name)?
            .as_str()
            .ok_or_else(|| unexpected(name, "a string"))
    }

    /// Unsigned integer field, possibly sent as a string.
    pub fn u64(&self, name: &str) -> Result<u64> {
        self.field(name)?
            .as_u64()
            .ok_or_else(|| unexpected(name, "an unsigned integer"))
    }

    /// Signed integer field, possibly sent as a string.
    pub fn i64(&self, name: &str) -> Result<i64> {
        self.field(name)?
            .as_i64()
            .ok_or_else(|| unexpected(name, "an integer"))
    }

    /// Boolean field. The API also encodes flags as `0`/`1`, which is accepted here.
    pub fn bool(&self, name: &str) -> Result<bool> {
        self.field(name)?
            .as_bool()
            .ok_or_else(|| unexpected(name, "a boolean"))
    }

    /// Nested object field.
    pub fn object(&self, name: &str) -> Result<&ApiResponse> {
        self.field(name)?
            .as_object()
            .ok_or_else(|| unexpected(name, "an object"))
    }

    /// List field.
    pub fn list(&self, name: &str) -> Result<&[ResponseValue]> {
        self.field(name)?
            .as_list()
            .ok_or_else(|| unexpected(name, "a list"))
    }

    /// All elements of a list field that are objects.
    pub fn objects(&self, name: &str) -> Result<Vec<&ApiResponse>> {
        Ok(self
            .list(name)?
            .iter()
            .filter_map(ResponseValue::as_object)
            .collect())
    }

    /// Deserialize the wrapped object into a typed structure.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::from(self))?)
    }
}

fn unexpected(name: &str, expected: &'static str) -> Error {
    Error::UnexpectedType {
        name: name.to_owned(),
        expected,
    }
}

impl ResponseValue {
    /// Whether the value is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Unsigned integer, also parsed out of strings since the API sends 64-bit ids as strings.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Signed integer, also parsed out of strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// The number as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Boolean, accepting `0` and `1` as well.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Number(n) => match n.as_u64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        }
    }

    /// The elements, if this is a list.
    pub fn as_list(&self) -> Option<&[ResponseValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The object, if this is one.
    pub fn as_object(&self) -> Option<&ApiResponse> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl From<Value> for ResponseValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(object) => Self::Object(ApiResponse::new(object)),
        }
    }
}

impl From<&ResponseValue> for Value {
    fn from(value: &ResponseValue) -> Self {
        match value {
            ResponseValue::Null => Value::Null,
            ResponseValue::Bool(b) => Value::Bool(*b),
            ResponseValue::Number(n) => Value::Number(n.clone()),
            ResponseValue::String(s) => Value::String(s.clone()),
            ResponseValue::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            ResponseValue::Object(object) => Value::from(object),
        }
    }
}

impl From<&ApiResponse> for Value {
    fn from(response: &ApiResponse) -> Self {
        Value::Object(
            response
                .fields
                .iter()
                .map(|(key, value)| (key.clone(), Value::from(value)))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a ApiResponse {
    type Item = (&'a String, &'a ResponseValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ResponseValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
