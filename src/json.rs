//! JSON bridge.
//!
//! `to_json` lowers a [`Value`] to a `serde_json::Value` tree. `from_json`
//! lifts a tree into a [`Value`] and converts it to a target descriptor with
//! [`JsonTypeConverter`], which knows two things the plain engine does not:
//! records build themselves from JSON objects, and JSON object keys can stand
//! for integers.
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map as JsonMap, Number};

use crate::capability::{JsonConstructible, Jsonable};
use crate::config::{ConverterConfig, DecodeOptions};
use crate::converter::{Dispatch, TypeConverter};
use crate::error::{ConversionError, ErrorKind, Path, Result};
use crate::record::RecordType;
use crate::registry::HandlerRegistry;
use crate::types::{Category, TypeDesc};
use crate::value::{FixedNum, Map, Number as Num, Value};

// -------------------------------- Lifting -------------------------------- //

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Fixed(FixedNum::U64(u))
                } else {
                    Value::float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::str(s),
            serde_json::Value::Array(xs) => Value::list(xs.iter().map(Value::from)),
            serde_json::Value::Object(m) => {
                Value::dict(m.iter().map(|(k, v)| (Value::str(k), Value::from(v))))
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

// ------------------------------- Lowering -------------------------------- //

fn unserializable(value: &Value, path: &Path, why: &str) -> ConversionError {
    ConversionError::new(ErrorKind::Unserializable, format!("Can't convert {value} to JSON: {why}"))
        .with_value(value.clone())
        .at(path.clone())
}

fn float_to_json(value: &Value, x: f64, path: &Path) -> Result<serde_json::Value> {
    Number::from_f64(x)
        .map(serde_json::Value::Number)
        .ok_or_else(|| unserializable(value, path, "not a finite number"))
}

/// `to_json` with errors located under `path`.
pub fn to_json_at(value: &Value, path: &Path) -> Result<serde_json::Value> {
    use serde_json::Value as J;

    match value {
        Value::None => Ok(J::Null),
        Value::Bool(b) => Ok(J::Bool(*b)),
        Value::Int(i) => Ok(J::from(*i)),
        Value::Float(x) => float_to_json(value, x.0, path),
        Value::Str(s) => Ok(J::String(s.to_string())),
        Value::Record(r) => r.to_json().map_err(|e| e.within(path)),
        Value::Object(o) => match o.as_jsonable() {
            Some(j) => j.to_json().map_err(|e| e.within(path)),
            None => Err(unserializable(value, path, "no JSON representation")),
        },
        Value::Fixed(n) => match n.number() {
            Num::Int(i) => {
                if let Ok(i) = i64::try_from(i) {
                    Ok(J::from(i))
                } else if let Ok(u) = u64::try_from(i) {
                    Ok(J::from(u))
                } else {
                    Err(unserializable(value, path, "integer out of range"))
                }
            }
            Num::Float(x) => float_to_json(value, x, path),
        },
        Value::Dict(m) | Value::FrozenDict(m) => mapping_to_json(m, path),
        Value::List(_) | Value::Tuple(_) | Value::Range { .. } | Value::Set(_) | Value::FrozenSet(_) => {
            let mut out = Vec::new();
            for (i, elem) in value.iter_elements().into_iter().flatten().enumerate() {
                out.push(to_json_at(&elem, &path.index(i))?);
            }
            Ok(J::Array(out))
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Str,
    Int,
}

/// The first key decides whether keys are text or integers; every other key
/// must agree.
fn mapping_to_json(map: &Map, path: &Path) -> Result<serde_json::Value> {
    let mut out = JsonMap::new();
    let mut key_kind = None;

    for (k, v) in map {
        if key_kind.is_none() {
            key_kind = match k {
                Value::Str(_) => Some(KeyKind::Str),
                Value::Int(_) => Some(KeyKind::Int),
                _ => None,
            };
        }
        let key = match (key_kind, k) {
            (Some(KeyKind::Str), Value::Str(s)) => s.to_string(),
            (Some(KeyKind::Int), Value::Int(i)) => i.to_string(),
            _ => {
                return Err(ConversionError::new(ErrorKind::Unserializable, "Mapping keys must be str or int")
                    .with_value(k.clone())
                    .at(path.clone()));
            }
        };
        out.insert(key, to_json_at(v, &path.key(k))?);
    }
    Ok(serde_json::Value::Object(out))
}

// ---------------------------- JSON-aware engine -------------------------- //

static INT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?)([0-9]+(?:_[0-9]+)*)\s*$").expect("int key regex"));

fn parse_int_key(text: &str) -> Option<i64> {
    let caps = INT_KEY.captures(text)?;
    let sign = caps.get(1).map_or("", |m| m.as_str());
    let digits = caps.get(2)?.as_str().replace('_', "");
    format!("{sign}{digits}").parse().ok()
}

fn int_keyed(ty: &TypeDesc) -> bool {
    ty.dict_key_type().map(TypeDesc::category) == Some(Category::Integral)
}

/// Engine wrapper used for decoding: intercepts record descriptors and
/// integral-keyed dict descriptors, delegates everything else.
#[derive(Debug, Clone, Copy)]
pub struct JsonTypeConverter<'a> {
    types: &'a TypeConverter,
    options: DecodeOptions,
}

impl<'a> JsonTypeConverter<'a> {
    pub fn new(types: &'a TypeConverter, options: DecodeOptions) -> Self {
        Self { types, options }
    }

    pub fn types(&self) -> &'a TypeConverter {
        self.types
    }

    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    fn constructible(ty: &TypeDesc) -> Option<&Arc<RecordType>> {
        match ty {
            TypeDesc::Record(r) if r.json_mode().can_deserialize() => Some(r),
            _ => None,
        }
    }

    /// Reinterpret textual keys as integers.
    fn with_int_keys(&self, data: &Value, ty: &TypeDesc, path: &Path) -> Result<Value> {
        let Some(map) = data.as_mapping() else {
            return Ok(data.clone());
        };
        let invalid = || {
            ConversionError::new(ErrorKind::InvalidKeys, "Cannot convert JSON object keys to integers")
                .with_value(data.clone())
                .with_type(ty.clone())
                .at(path.clone())
        };
        let mut converted = Map::with_capacity(map.len());
        for (k, v) in map {
            let key = match k {
                Value::Str(s) => Value::Int(parse_int_key(s).ok_or_else(invalid)?),
                other if other.is_integral() => other.clone(),
                _ => return Err(invalid()),
            };
            converted.insert(key, v.clone());
        }
        Ok(Value::Dict(Arc::new(converted)))
    }
}

impl Dispatch for JsonTypeConverter<'_> {
    fn registry(&self) -> &HandlerRegistry {
        self.types.registry()
    }

    fn isinstance_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
        if Self::constructible(ty).is_some() {
            return Ok(ty.instance_of(value) || value.is_mapping());
        }
        if int_keyed(ty) && value.is_mapping() {
            let Ok(value) = self.with_int_keys(value, ty, path) else {
                return Ok(false);
            };
            return self.registry().resolve(ty)?.isinstance(self, &value, ty, path);
        }
        self.registry().resolve(ty)?.isinstance(self, value, ty, path)
    }

    fn ensure_isinstance_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<()> {
        if self.isinstance_at(value, ty, path)? {
            Ok(())
        } else {
            Err(ConversionError::mismatch(value, ty, path))
        }
    }

    fn convert_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<Value> {
        if let Some(record) = Self::constructible(ty) {
            if ty.instance_of(value) {
                return Ok(value.clone());
            }
            return record.from_json(self, value, path);
        }

        if int_keyed(ty) && value.is_mapping() {
            let value = self.with_int_keys(value, ty, path)?;
            return self.registry().resolve(ty)?.convert(self, &value, ty, path);
        }
        self.registry().resolve(ty)?.convert(self, value, ty, path)
    }
}

// ------------------------------- Converter ------------------------------- //

/// Converts values to and from JSON trees.
#[derive(Debug, Default)]
pub struct JsonConverter {
    types: TypeConverter,
}

impl JsonConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &ConverterConfig) -> Self {
        Self { types: TypeConverter::with_config(config) }
    }

    pub fn types(&self) -> &TypeConverter {
        &self.types
    }

    pub fn to_json(&self, value: &Value) -> Result<serde_json::Value> {
        to_json_at(value, &Path::root())
    }

    pub fn from_json(&self, ty: &TypeDesc, data: &serde_json::Value) -> Result<Value> {
        self.from_json_with(ty, data, DecodeOptions::default())
    }

    pub fn from_json_with(&self, ty: &TypeDesc, data: &serde_json::Value, options: DecodeOptions) -> Result<Value> {
        self.from_json_value(ty, &Value::from(data), options)
    }

    /// Decode data that has already been lifted into a [`Value`].
    pub fn from_json_value(&self, ty: &TypeDesc, data: &Value, options: DecodeOptions) -> Result<Value> {
        JsonTypeConverter::new(&self.types, options).convert_at(data, ty, &Path::root())
    }

    pub fn from_json_str(&self, ty: &TypeDesc, text: &str) -> Result<Value> {
        self.from_json(ty, &parse_json(text)?)
    }
}

pub static DEFAULT_JSON_CONVERTER: Lazy<JsonConverter> = Lazy::new(JsonConverter::new);

pub fn to_json(value: &Value) -> Result<serde_json::Value> {
    DEFAULT_JSON_CONVERTER.to_json(value)
}

pub fn from_json(ty: &TypeDesc, data: &serde_json::Value) -> Result<Value> {
    DEFAULT_JSON_CONVERTER.from_json(ty, data)
}

pub fn from_json_with(ty: &TypeDesc, data: &serde_json::Value, options: DecodeOptions) -> Result<Value> {
    DEFAULT_JSON_CONVERTER.from_json_with(ty, data, options)
}

pub fn parse_json(text: &str) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(text)?)
}
