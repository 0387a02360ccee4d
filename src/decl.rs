//! Record declarations in JSON.
//!
//! ```json
//! [{"name": "Point", "fields": [
//!     {"name": "x", "type": "int"},
//!     {"name": "y", "type": "int", "default": 0}
//! ]}]
//! ```
//!
//! Declarations load in order into a [`TypeNamespace`], so a later record may
//! name an earlier one in its field types.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::json::DEFAULT_JSON_CONVERTER;
use crate::path_de::{from_str_with_path, from_value_with_path};
use crate::record::{Field, JsonMode, RecordType};
use crate::types::{TypeDesc, TypeNamespace};

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDecl {
    pub name: String,
    #[serde(default = "yes")]
    pub closed: bool,
    #[serde(default)]
    pub json: JsonMode,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    /// Annotation text; absent means `Any`.
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
    /// JSON encoding of the default, decoded into the field type.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "yes")]
    pub validate_type: bool,
    #[serde(default = "yes")]
    pub convert_type: bool,
    #[serde(default = "yes")]
    pub json: bool,
}

impl TypeNamespace {
    /// Build and register one record.
    pub fn declare(&mut self, decl: &RecordDecl) -> Result<Arc<RecordType>> {
        let mut builder = RecordType::builder(&decl.name).closed(decl.closed).json(decl.json);

        for f in &decl.fields {
            let ctx = format!("{}.{}", decl.name, f.name);
            let ty = match &f.ty {
                Some(text) => self.parse(text).map_err(|e| e.with_context(&ctx))?,
                None => TypeDesc::Any,
            };
            let mut field = Field::new(&f.name, ty)
                .validate_type(f.validate_type)
                .convert_type(f.convert_type)
                .json(f.json);
            if f.optional {
                field = field.optional();
            }
            if let Some(default) = &f.default {
                let value = DEFAULT_JSON_CONVERTER
                    .from_json(&field.ty, default)
                    .map_err(|e| e.with_context(format!("default of {ctx}")))?;
                field = field.with_default(value);
            }
            builder = builder.field(field);
        }

        let ty = builder.build()?;
        self.register_record(ty.clone());
        Ok(ty)
    }

    /// Load a JSON array of declarations.
    pub fn load_declarations(&mut self, src: &str) -> Result<Vec<Arc<RecordType>>> {
        let decls: Vec<RecordDecl> = from_str_with_path(src)?;
        decls.iter().map(|decl| self.declare(decl)).collect()
    }

    pub fn load_declarations_value(&mut self, value: serde_json::Value) -> Result<Vec<Arc<RecordType>>> {
        let decls: Vec<RecordDecl> = from_value_with_path(value)?;
        decls.iter().map(|decl| self.declare(decl)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::json::{from_json, to_json};
    use crate::value::Value;
    use serde_json::json;

    const SHAPES: &str = r#"[
        {"name": "Point", "fields": [
            {"name": "x", "type": "int"},
            {"name": "y", "type": "int", "default": 0}
        ]},
        {"name": "Polygon", "json": "both", "fields": [
            {"name": "vertices", "type": "List[Point]"},
            {"name": "tags", "type": "Dict[int, str]", "default": {"1": "shape"}},
            {"name": "note", "type": "str", "optional": true, "json": false}
        ]}
    ]"#;

    #[test]
    fn later_declarations_reference_earlier_ones() {
        let mut ns = TypeNamespace::new();
        let declared = ns.load_declarations(SHAPES).unwrap();
        assert_eq!(declared.len(), 2);

        let polygon = ns.parse("Polygon").unwrap();
        let value = from_json(&polygon, &json!({"vertices": [{"x": 1}, {"x": 2, "y": 3}]})).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("note"), Some(&Value::None));
        assert_eq!(
            record.get("tags"),
            Some(&Value::dict([(Value::Int(1), Value::str("shape"))]))
        );
        assert_eq!(
            to_json(&value).unwrap(),
            json!({"vertices": [{"x": 1, "y": 0}, {"x": 2, "y": 3}], "tags": {"1": "shape"}})
        );
    }

    #[test]
    fn malformed_declarations_report_the_json_path() {
        let src = r#"[{"name": "P", "fields": [{"name": "x", "optional": "yes"}]}]"#;
        let err = TypeNamespace::new().load_declarations(src).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Declaration);
        assert!(err.message.contains("fields[0].optional"), "{}", err.message);

        let err = TypeNamespace::new()
            .load_declarations_value(json!([{"name": "P", "fields": [], "extra": 1}]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Declaration);

        let err = TypeNamespace::new().load_declarations("[{").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn bad_field_types_and_defaults_fail_at_declaration() {
        let mut ns = TypeNamespace::new();
        let err = ns
            .load_declarations(r#"[{"name": "P", "fields": [{"name": "x", "type": "Lst[int]"}]}]"#)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAnnotation);
        assert!(err.message.starts_with("P.x: "));

        let err = ns
            .load_declarations(r#"[{"name": "P", "fields": [{"name": "x", "type": "int", "default": "zero"}]}]"#)
            .unwrap_err();
        assert!(err.message.starts_with("default of P.x: "), "{}", err.message);
        assert!(ns.record("P").is_none());
    }

    #[test]
    fn untyped_fields_accept_anything() {
        let mut ns = TypeNamespace::new();
        let decl: RecordDecl = serde_json::from_value(json!({
            "name": "Bag", "closed": false, "fields": [{"name": "item"}]
        }))
        .unwrap();
        let bag = ns.declare(&decl).unwrap();
        assert_eq!(bag.fields()[0].ty, TypeDesc::Any);
        assert!(!bag.is_closed());
        let value = from_json(&TypeDesc::Record(bag), &json!({"item": [1, "two"], "extra": true})).unwrap();
        assert_eq!(
            value.as_record().unwrap().get("item"),
            Some(&Value::list([Value::Int(1), Value::str("two")]))
        );
    }
}
