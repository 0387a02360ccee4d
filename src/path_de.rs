use serde::de::DeserializeOwned;

use crate::error::{ConversionError, ErrorKind, Result};

fn located(err: serde_path_to_error::Error<serde_json::Error>) -> ConversionError {
    let path = err.path().to_string();
    let inner = err.into_inner();
    let kind = if inner.is_syntax() || inner.is_eof() {
        ErrorKind::Syntax
    } else {
        ErrorKind::Declaration
    };
    ConversionError::new(kind, format!("at JSON path {path} → {inner}"))
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

/// Same, for an already parsed tree.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(located)
}
