//! Optional capabilities a value or type may carry.
//!
//! The engine never reflects on arbitrary objects; anything it needs beyond
//! the closed [`Value`] model is expressed through these traits.
use std::fmt::Debug;

use crate::error::{Path, Result};
use crate::json::JsonTypeConverter;
use crate::value::Value;

/// Value that knows how to produce its own JSON tree.
pub trait Jsonable {
    fn to_json(&self) -> Result<serde_json::Value>;
}

/// Type that knows how to build an instance of itself from lifted JSON data.
///
/// Nested fields are converted through `cx`, so integral-keyed maps and
/// nested records inside the data are handled the JSON way.
pub trait JsonConstructible {
    fn from_json(&self, cx: &JsonTypeConverter<'_>, data: &Value, path: &Path) -> Result<Value>;
}

/// Opaque user object carried inside a [`Value`].
///
/// Matched nominally against `TypeDesc::Class` by its class name.
pub trait Object: Debug + Send + Sync + 'static {
    fn class_name(&self) -> &str;

    fn as_jsonable(&self) -> Option<&dyn Jsonable> {
        None
    }

    fn repr(&self) -> String {
        format!("<{} object>", self.class_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Opaque;

    impl Object for Opaque {
        fn class_name(&self) -> &str {
            "Opaque"
        }
    }

    #[derive(Debug)]
    struct Color(u8, u8, u8);

    impl Jsonable for Color {
        fn to_json(&self) -> Result<serde_json::Value> {
            Ok(json!([self.0, self.1, self.2]))
        }
    }

    impl Object for Color {
        fn class_name(&self) -> &str {
            "Color"
        }

        fn as_jsonable(&self) -> Option<&dyn Jsonable> {
            Some(self)
        }
    }

    #[test]
    fn objects_expose_optional_json_capability() {
        let plain = Value::object(Opaque);
        let color = Value::object(Color(1, 2, 3));
        assert_eq!(plain.to_string(), "<Opaque object>");
        assert_eq!(color.class_name(), "Color");

        let Value::Object(o) = &color else { panic!("not an object") };
        assert_eq!(o.as_jsonable().unwrap().to_json().unwrap(), json!([1, 2, 3]));
        let Value::Object(o) = &plain else { panic!("not an object") };
        assert!(o.as_jsonable().is_none());
    }
}
