//! Conversion errors and the path at which they were raised.
use std::fmt;

use crate::types::TypeDesc;
use crate::value::Value;

// ------------------------------- Path ------------------------------------ //

/// One step of the recursive position inside a value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Position inside a sequence or collection.
    Index(usize),
    /// Key inside a mapping (or field name inside a record).
    Key(Value),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Key(k) => write!(f, "[{k}]"),
        }
    }
}

/// Ordered key/index tokens from the root value down to the failing one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment);
        Self(segments)
    }

    pub fn index(&self, i: usize) -> Self {
        self.child(PathSegment::Index(i))
    }

    pub fn key(&self, key: &Value) -> Self {
        self.child(PathSegment::Key(key.clone()))
    }

    /// `prefix` followed by `self`.
    fn rebased(&self, prefix: &Path) -> Self {
        let mut segments = prefix.0.clone();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ------------------------------- Error ----------------------------------- //

/// What went wrong, for callers that want to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Value does not have the shape the descriptor requires.
    Mismatch,
    /// No union branch accepted the value.
    NoUnionMatch,
    /// Record data carries a key the record does not declare.
    UnknownKey,
    /// Record construction lacks a required field.
    MissingField,
    /// Serialized mapping keys could not be reinterpreted as integers.
    InvalidKeys,
    /// Value has no JSON representation.
    Unserializable,
    /// Descriptor is not a valid type annotation.
    InvalidAnnotation,
    /// Descriptor is valid but has no handler (parameterized tuples).
    NotImplemented,
    /// Record declaration is malformed.
    Declaration,
    /// Serialized text is not valid JSON.
    Syntax,
}

/// The single error type of the crate.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}{}", path_suffix(.path))]
pub struct ConversionError {
    pub kind: ErrorKind,
    pub message: String,
    /// Offending value, when there is one.
    pub value: Option<Value>,
    /// Target descriptor, when there is one.
    pub ty: Option<TypeDesc>,
    pub path: Path,
}

fn path_suffix(path: &Path) -> String {
    if path.is_root() {
        String::new()
    } else {
        format!(" (at {path})")
    }
}

impl ConversionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            value: None,
            ty: None,
            path: Path::root(),
        }
    }

    /// `Expected instance of {ty}, got {value}`.
    pub fn mismatch(value: &Value, ty: &TypeDesc, path: &Path) -> Self {
        Self::new(
            ErrorKind::Mismatch,
            format!("Expected instance of {ty}, got {value}"),
        )
        .with_value(value.clone())
        .with_type(ty.clone())
        .at(path.clone())
    }

    pub fn invalid_annotation(text: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidAnnotation,
            format!("{text:?} is not a valid type annotation: {detail}"),
        )
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_type(mut self, ty: TypeDesc) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn at(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    /// Re-anchor an error raised by a nested, path-unaware call under `prefix`.
    pub fn within(mut self, prefix: &Path) -> Self {
        self.path = self.path.rebased(prefix);
        self
    }

    /// Prepend context to the message, keeping kind and payload.
    pub fn with_context(mut self, ctx: impl fmt::Display) -> Self {
        self.message = format!("{ctx}: {}", self.message);
        self
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::Syntax, e.to_string())
    }
}

pub type Result<T, E = ConversionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_display_nests_keys_and_indices() {
        let path = Path::root().key(&Value::from("items")).index(3).key(&Value::from(7));
        assert_eq!(path.to_string(), "[\"items\"][3][7]");
        assert_eq!(Path::root().to_string(), "<root>");
    }

    #[test]
    fn error_display_appends_non_root_path() {
        let err = ConversionError::mismatch(&Value::from("x"), &TypeDesc::int(), &Path::root().index(1));
        assert_eq!(err.kind, ErrorKind::Mismatch);
        assert_eq!(err.to_string(), "Expected instance of int, got \"x\" (at [1])");

        let root = ConversionError::mismatch(&Value::None, &TypeDesc::int(), &Path::root());
        assert_eq!(root.to_string(), "Expected instance of int, got None");
    }

    #[test]
    fn within_prepends_prefix() {
        let inner = ConversionError::new(ErrorKind::Unserializable, "nope").at(Path::root().index(0));
        let outer = inner.within(&Path::root().key(&Value::from("a")));
        assert_eq!(outer.path.to_string(), "[\"a\"][0]");
    }
}
