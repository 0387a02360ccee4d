//! Declared records: a named, ordered field table with per-field type checks,
//! a constructor, and a JSON round trip.
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::capability::{JsonConstructible, Jsonable};
use crate::converter::{DEFAULT_CONVERTER, Dispatch};
use crate::error::{ConversionError, ErrorKind, Path, Result};
use crate::json::{JsonTypeConverter, to_json_at};
use crate::types::TypeDesc;
use crate::value::Value;

// ------------------------------- JSON mode ------------------------------- //

/// Which JSON directions a record supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonMode {
    #[default]
    Both,
    To,
    From,
    None,
}

impl JsonMode {
    pub fn can_serialize(self) -> bool {
        matches!(self, JsonMode::Both | JsonMode::To)
    }

    pub fn can_deserialize(self) -> bool {
        matches!(self, JsonMode::Both | JsonMode::From)
    }
}

/// `true`/`false` or one of `"both"`, `"to"`, `"from"`, `"none"`.
impl<'de> Deserialize<'de> for JsonMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(true) => Ok(JsonMode::Both),
            Repr::Flag(false) => Ok(JsonMode::None),
            Repr::Name(name) => match name.as_str() {
                "both" => Ok(JsonMode::Both),
                "to" => Ok(JsonMode::To),
                "from" => Ok(JsonMode::From),
                "none" => Ok(JsonMode::None),
                other => Err(serde::de::Error::custom(format!(
                    "json must be a boolean or one of \"both\", \"to\", \"from\", \"none\", got {other:?}"
                ))),
            },
        }
    }
}

// --------------------------------- Field --------------------------------- //

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: TypeDesc,
    pub default: Option<Value>,
    /// Accept `None` without any checks. Implies a `None` default.
    pub optional: bool,
    pub validate_type: bool,
    /// Takes precedence over `validate_type`.
    pub convert_type: bool,
    /// Include in JSON output.
    pub json: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            optional: false,
            validate_type: true,
            convert_type: true,
            json: true,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn validate_type(mut self, yes: bool) -> Self {
        self.validate_type = yes;
        self
    }

    pub fn convert_type(mut self, yes: bool) -> Self {
        self.convert_type = yes;
        self
    }

    pub fn json(mut self, yes: bool) -> Self {
        self.json = yes;
        self
    }

    pub fn effective_default(&self) -> Option<Value> {
        match &self.default {
            Some(default) => Some(default.clone()),
            None if self.optional => Some(Value::None),
            None => None,
        }
    }

    /// Apply the field's conversion or validation to an incoming value.
    pub fn check(&self, cx: &dyn Dispatch, value: Value, path: &Path) -> Result<Value> {
        if self.optional && value.is_none() {
            return Ok(value);
        }
        if self.convert_type {
            return cx.convert_at(&value, &self.ty, path);
        }
        if self.validate_type && !cx.isinstance_at(&value, &self.ty, path)? {
            return Err(ConversionError::new(
                ErrorKind::Mismatch,
                format!("{} must be of type {}, got {}", self.name, self.ty, value),
            )
            .with_type(self.ty.clone())
            .with_value(value)
            .at(path.clone()));
        }
        Ok(value)
    }
}

// ------------------------------ Record type ------------------------------ //

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RecordType {
    name: String,
    fields: Vec<Field>,
    closed: bool,
    json: JsonMode,
}

#[derive(Debug)]
pub struct RecordBuilder {
    name: String,
    fields: Vec<Field>,
    closed: bool,
    json: JsonMode,
}

impl RecordBuilder {
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Closed records reject unknown keys when decoded from JSON.
    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    pub fn json(mut self, json: JsonMode) -> Self {
        self.json = json;
        self
    }

    pub fn build(self) -> Result<Arc<RecordType>> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ConversionError::new(
                    ErrorKind::Declaration,
                    format!("Duplicate field {:?} in record {}", field.name, self.name),
                ));
            }
        }
        Ok(Arc::new(RecordType {
            name: self.name,
            fields: self.fields,
            closed: self.closed,
            json: self.json,
        }))
    }
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            fields: Vec::new(),
            closed: true,
            json: JsonMode::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn json_mode(&self) -> JsonMode {
        self.json
    }

    /// Construct an instance from named values, using the default converter.
    pub fn instantiate<I, K>(ty: &Arc<RecordType>, values: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        Self::instantiate_with(&*DEFAULT_CONVERTER, ty, values, &Path::root())
    }

    pub fn instantiate_with<I, K>(cx: &dyn Dispatch, ty: &Arc<RecordType>, values: I, path: &Path) -> Result<Value>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut slots: Vec<Option<Value>> = vec![None; ty.fields.len()];
        for (name, value) in values {
            let name = name.as_ref();
            let Some(i) = ty.field_index(name) else {
                return Err(ConversionError::new(
                    ErrorKind::UnknownKey,
                    format!("{} has no field {name:?}", ty.name),
                )
                .with_value(Value::str(name))
                .at(path.clone()));
            };
            slots[i] = Some(value);
        }

        let mut checked = Vec::with_capacity(slots.len());
        for (field, slot) in ty.fields.iter().zip(slots) {
            let Some(value) = slot.or_else(|| field.effective_default()) else {
                return Err(ConversionError::new(
                    ErrorKind::MissingField,
                    format!("Missing required field {:?} of {}", field.name, ty.name),
                )
                .at(path.clone()));
            };
            let field_path = path.key(&Value::str(&field.name));
            checked.push(field.check(cx, value, &field_path)?);
        }

        Ok(Value::Record(Arc::new(RecordValue { ty: ty.clone(), values: checked })))
    }
}

impl JsonConstructible for Arc<RecordType> {
    fn from_json(&self, cx: &JsonTypeConverter<'_>, data: &Value, path: &Path) -> Result<Value> {
        let Some(map) = data.as_mapping() else {
            return Err(ConversionError::new(
                ErrorKind::Mismatch,
                format!("Expected data for {} to be a mapping, got {}", self.name, data.class_name()),
            )
            .with_value(data.clone())
            .with_type(TypeDesc::Record(self.clone()))
            .at(path.clone()));
        };

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let key = Value::str(&field.name);
            let Some(item) = map.get(&key) else { continue };
            let value = if item.is_none() && field.optional {
                Value::None
            } else {
                cx.convert_at(item, &field.ty, &path.key(&key))?
            };
            values.push((field.name.as_str(), value));
        }

        let mut extra = map
            .keys()
            .filter(|k| k.as_str().is_none_or(|name| self.field(name).is_none()));
        if let Some(key) = extra.next() {
            if cx.options().ignore_extra_keys || !self.closed {
                let discarded = 1 + extra.count();
                tracing::debug!(record = %self.name, %path, discarded, "ignoring unknown keys");
            } else {
                return Err(ConversionError::new(ErrorKind::UnknownKey, format!("Unknown key {key} in data"))
                    .with_value(key.clone())
                    .with_type(TypeDesc::Record(self.clone()))
                    .at(path.clone()));
            }
        }

        RecordType::instantiate_with(cx.types(), self, values, path)
    }
}

// ----------------------------- Record value ------------------------------ //

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RecordValue {
    ty: Arc<RecordType>,
    values: Vec<Value>,
}

impl RecordValue {
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.ty.fields.iter().map(|f| f.name.as_str()).zip(&self.values)
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ty.name)?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}

impl Jsonable for RecordValue {
    fn to_json(&self) -> Result<serde_json::Value> {
        if !self.ty.json.can_serialize() {
            return Err(ConversionError::new(
                ErrorKind::Unserializable,
                format!("Instances of {} cannot be converted to JSON", self.ty.name),
            )
            .with_type(TypeDesc::Record(self.ty.clone())));
        }
        let mut out = serde_json::Map::new();
        for (field, value) in self.ty.fields.iter().zip(&self.values) {
            if field.json {
                let path = Path::root().key(&Value::str(&field.name));
                out.insert(field.name.clone(), to_json_at(value, &path)?);
            }
        }
        Ok(serde_json::Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point() -> Arc<RecordType> {
        RecordType::builder("Point")
            .field(Field::new("x", TypeDesc::int()))
            .field(Field::new("y", TypeDesc::int()).with_default(0))
            .field(Field::new("label", TypeDesc::str()).optional())
            .build()
            .unwrap()
    }

    #[test]
    fn defaults_fill_absent_fields() {
        let p = RecordType::instantiate(&point(), [("x", Value::Int(3))]).unwrap();
        let r = p.as_record().unwrap();
        assert_eq!(r.get("x"), Some(&Value::Int(3)));
        assert_eq!(r.get("y"), Some(&Value::Int(0)));
        assert_eq!(r.get("label"), Some(&Value::None));
        assert_eq!(p.to_string(), "Point(x=3, y=0, label=None)");
    }

    #[test]
    fn missing_and_unknown_fields_fail() {
        let err = RecordType::instantiate(&point(), [("y", Value::Int(1))]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingField);
        assert!(err.message.contains("\"x\""));

        let err = RecordType::instantiate(&point(), [("x", Value::Int(1)), ("z", Value::Int(2))]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownKey);
        assert_eq!(err.value, Some(Value::str("z")));
    }

    #[test]
    fn fields_convert_unless_told_to_only_validate() {
        let ty = RecordType::builder("Row")
            .field(Field::new("cells", TypeDesc::list_of(TypeDesc::float())))
            .field(Field::new("tag", TypeDesc::list()).convert_type(false))
            .field(Field::new("raw", TypeDesc::int()).convert_type(false).validate_type(false))
            .build()
            .unwrap();

        let row = RecordType::instantiate(
            &ty,
            [
                ("cells", Value::tuple([Value::Int(1)])),
                ("tag", Value::list([])),
                ("raw", Value::str("anything")),
            ],
        )
        .unwrap();
        let cells = row.as_record().unwrap().get("cells").unwrap();
        assert!(matches!(cells, Value::List(xs) if matches!(xs[0], Value::Float(_))));

        let err = RecordType::instantiate(
            &ty,
            [("cells", Value::list([])), ("tag", Value::tuple([])), ("raw", Value::None)],
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Mismatch);
        assert_eq!(err.message, "tag must be of type list, got ()");
        assert_eq!(err.path, Path::root().key(&Value::str("tag")));
    }

    #[test]
    fn optional_fields_accept_none_without_checks() {
        let p = RecordType::instantiate(&point(), [("x", Value::Int(1)), ("label", Value::None)]).unwrap();
        assert_eq!(p.as_record().unwrap().get("label"), Some(&Value::None));
        let err = RecordType::instantiate(&point(), [("x", Value::None)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Mismatch);
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let err = RecordType::builder("Dup")
            .field(Field::new("a", TypeDesc::int()))
            .field(Field::new("a", TypeDesc::str()))
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Declaration);
    }

    #[test]
    fn to_json_emits_json_fields_in_order() {
        let ty = RecordType::builder("User")
            .field(Field::new("name", TypeDesc::str()))
            .field(Field::new("secret", TypeDesc::str()).json(false))
            .field(Field::new("ids", TypeDesc::dict_of(TypeDesc::int(), TypeDesc::bool())))
            .build()
            .unwrap();
        let user = RecordType::instantiate(
            &ty,
            [
                ("name", Value::str("ann")),
                ("secret", Value::str("hunter2")),
                ("ids", Value::dict([(Value::Int(7), Value::Bool(true))])),
            ],
        )
        .unwrap();
        let json = user.as_record().unwrap().to_json().unwrap();
        assert_eq!(json, json!({"name": "ann", "ids": {"7": true}}));
        assert_eq!(serde_json::to_string(&json).unwrap(), r#"{"name":"ann","ids":{"7":true}}"#);
    }

    #[test]
    fn json_mode_parses_flags_and_names() {
        let modes: Vec<JsonMode> = serde_json::from_value(json!([true, false, "to", "from", "both", "none"])).unwrap();
        assert_eq!(
            modes,
            [JsonMode::Both, JsonMode::None, JsonMode::To, JsonMode::From, JsonMode::Both, JsonMode::None]
        );
        assert!(serde_json::from_value::<JsonMode>(json!("sideways")).is_err());
        assert!(JsonMode::To.can_serialize() && !JsonMode::To.can_deserialize());
    }
}
