//! Structural type conversion and validation.
//!
//! Given a [`Value`] and a [`TypeDesc`] such as `List[int]` or
//! `Mapping[str, Union[int, str]]`, decide whether the value conforms and,
//! if not, convert it into an equivalent value of that type where possible,
//! recursively, reporting the exact [`Path`] of any failure.
//!
//! The [`json`] module bridges values and `serde_json` trees, including
//! declared records ([`RecordType`]) that build themselves from JSON objects.
pub mod capability;
pub mod config;
pub mod converter;
pub mod decl;
pub mod error;
pub mod handler;
pub mod json;
pub mod path_de;
pub mod record;
pub mod registry;
pub mod types;
pub mod value;

pub use capability::{JsonConstructible, Jsonable, Object};
pub use config::{ConverterConfig, DecodeOptions};
pub use converter::{Dispatch, TypeConverter, convert, default_converter, ensure_is_instance, is_instance};
pub use decl::{FieldDecl, RecordDecl};
pub use error::{ConversionError, ErrorKind, Path, PathSegment, Result};
pub use json::{JsonConverter, JsonTypeConverter, from_json, from_json_with, parse_json, to_json};
pub use record::{Field, JsonMode, RecordType, RecordValue};
pub use types::{Builtin, TypeDesc, TypeNamespace, Typed};
pub use value::{FixedKind, FixedNum, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inventory_round_trip() -> anyhow::Result<()> {
        let mut ns = TypeNamespace::new();
        ns.load_declarations(
            r#"[
                {"name": "Item", "fields": [
                    {"name": "sku", "type": "str"},
                    {"name": "qty", "type": "int", "default": 1},
                    {"name": "price", "type": "Optional[float]"}
                ]},
                {"name": "Inventory", "fields": [
                    {"name": "bins", "type": "Dict[int, List[Item]]"}
                ]}
            ]"#,
        )?;
        let inventory = ns.parse("Inventory")?;

        let data = json!({"bins": {"4": [{"sku": "a-1", "price": 2.5}, {"sku": "b-2", "qty": 3, "price": null}]}});
        let value = from_json(&inventory, &data)?;
        assert!(is_instance(&value, &inventory)?);

        let out = to_json(&value)?;
        assert_eq!(
            out,
            json!({"bins": {"4": [
                {"sku": "a-1", "qty": 1, "price": 2.5},
                {"sku": "b-2", "qty": 3, "price": null}
            ]}})
        );
        // decoding the output again is stable
        assert_eq!(from_json(&inventory, &out)?, value);
        Ok(())
    }

    #[test]
    fn native_type_handles() -> anyhow::Result<()> {
        use std::collections::BTreeMap;

        let ty = TypeDesc::of::<BTreeMap<String, Vec<i64>>>();
        assert_eq!(ty.to_string(), "Dict[str, List[int]]");
        let value = convert(
            &Value::frozen_dict([(Value::str("k"), Value::tuple([Value::Fixed(FixedNum::U32(9))]))]),
            &TypeDesc::of::<BTreeMap<String, Vec<u32>>>(),
        );
        // `uint32` descriptors narrow to native ints
        assert_eq!(value?, Value::dict([(Value::str("k"), Value::list([Value::Int(9)]))]));
        assert_eq!(TypeDesc::of::<Vec<Value>>(), TypeDesc::list_of(TypeDesc::Any));
        assert_ne!(TypeDesc::of::<Vec<Value>>(), TypeDesc::from(Builtin::List));
        Ok(())
    }
}
