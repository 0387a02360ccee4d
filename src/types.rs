//! Type descriptors.
//!
//! `TypeDesc` is a closed algebra over the shapes the converter understands.
//! It is immutable and structurally comparable/hashable, so descriptors can key
//! the handler cache directly.
pub mod parse;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConversionError, ErrorKind, Result};
use crate::record::RecordType;
use crate::value::{FixedKind, Value};

pub use parse::TypeNamespace;

// -------------------------------- TYPES ---------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    Str,
    /// Abstract: anything integral-like.
    Integral,
    /// Abstract: anything real-like.
    Real,
    /// A foreign fixed-width numeric class.
    Fixed(FixedKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    List,
    Sequence,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Dict,
    Mapping,
    FrozenDict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Set,
    FrozenSet,
    Collection,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TupleShape {
    /// `tuple`
    Bare,
    /// `Tuple[A, B]`, `Tuple[()]`
    Fixed(Vec<TypeDesc>),
    /// `Tuple[A, ...]`
    Homogeneous(Box<TypeDesc>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Any,
    None,
    Scalar(ScalarType),
    /// Ordered, flattened, duplicate-free, at least two branches.
    Union(Vec<TypeDesc>),
    Sequence {
        kind: SequenceKind,
        elem: Option<Box<TypeDesc>>,
    },
    Mapping {
        kind: MappingKind,
        params: Option<Box<(TypeDesc, TypeDesc)>>,
    },
    Collection {
        kind: CollectionKind,
        elem: Option<Box<TypeDesc>>,
    },
    Tuple(TupleShape),
    Record(Arc<RecordType>),
    /// Opaque user class, matched by name.
    Class(Arc<str>),
}

/// Coarse classification used for routing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Any,
    None,
    Union,
    Integral,
    Real,
    Scalar,
    Mapping,
    Sequence,
    Collection,
    Tuple,
    Record,
    Opaque,
}

/// Handles for the builtin container classes. Each one is the same descriptor
/// as its unparameterized generic form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    List,
    Dict,
    Tuple,
    Set,
    FrozenSet,
}

impl From<Builtin> for TypeDesc {
    fn from(b: Builtin) -> Self {
        match b {
            Builtin::List => TypeDesc::list(),
            Builtin::Dict => TypeDesc::dict(),
            Builtin::Tuple => TypeDesc::tuple(),
            Builtin::Set => TypeDesc::set(),
            Builtin::FrozenSet => TypeDesc::frozen_set(),
        }
    }
}

// ------------------------------ Constructors ----------------------------- //

impl TypeDesc {
    pub fn bool() -> Self {
        TypeDesc::Scalar(ScalarType::Bool)
    }

    pub fn int() -> Self {
        TypeDesc::Scalar(ScalarType::Int)
    }

    pub fn float() -> Self {
        TypeDesc::Scalar(ScalarType::Float)
    }

    pub fn str() -> Self {
        TypeDesc::Scalar(ScalarType::Str)
    }

    pub fn integral() -> Self {
        TypeDesc::Scalar(ScalarType::Integral)
    }

    pub fn real() -> Self {
        TypeDesc::Scalar(ScalarType::Real)
    }

    pub fn fixed(kind: FixedKind) -> Self {
        TypeDesc::Scalar(ScalarType::Fixed(kind))
    }

    pub fn list() -> Self {
        TypeDesc::Sequence { kind: SequenceKind::List, elem: None }
    }

    pub fn list_of(elem: TypeDesc) -> Self {
        TypeDesc::Sequence { kind: SequenceKind::List, elem: Some(Box::new(elem)) }
    }

    pub fn sequence() -> Self {
        TypeDesc::Sequence { kind: SequenceKind::Sequence, elem: None }
    }

    pub fn sequence_of(elem: TypeDesc) -> Self {
        TypeDesc::Sequence { kind: SequenceKind::Sequence, elem: Some(Box::new(elem)) }
    }

    pub fn dict() -> Self {
        TypeDesc::Mapping { kind: MappingKind::Dict, params: None }
    }

    pub fn dict_of(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Mapping { kind: MappingKind::Dict, params: Some(Box::new((key, value))) }
    }

    pub fn mapping() -> Self {
        TypeDesc::Mapping { kind: MappingKind::Mapping, params: None }
    }

    pub fn mapping_of(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Mapping { kind: MappingKind::Mapping, params: Some(Box::new((key, value))) }
    }

    pub fn frozen_dict() -> Self {
        TypeDesc::Mapping { kind: MappingKind::FrozenDict, params: None }
    }

    pub fn frozen_dict_of(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Mapping { kind: MappingKind::FrozenDict, params: Some(Box::new((key, value))) }
    }

    pub fn set() -> Self {
        TypeDesc::Collection { kind: CollectionKind::Set, elem: None }
    }

    pub fn set_of(elem: TypeDesc) -> Self {
        TypeDesc::Collection { kind: CollectionKind::Set, elem: Some(Box::new(elem)) }
    }

    pub fn frozen_set() -> Self {
        TypeDesc::Collection { kind: CollectionKind::FrozenSet, elem: None }
    }

    pub fn frozen_set_of(elem: TypeDesc) -> Self {
        TypeDesc::Collection { kind: CollectionKind::FrozenSet, elem: Some(Box::new(elem)) }
    }

    pub fn collection() -> Self {
        TypeDesc::Collection { kind: CollectionKind::Collection, elem: None }
    }

    pub fn collection_of(elem: TypeDesc) -> Self {
        TypeDesc::Collection { kind: CollectionKind::Collection, elem: Some(Box::new(elem)) }
    }

    pub fn tuple() -> Self {
        TypeDesc::Tuple(TupleShape::Bare)
    }

    pub fn tuple_of(elems: Vec<TypeDesc>) -> Self {
        TypeDesc::Tuple(TupleShape::Fixed(elems))
    }

    pub fn tuple_homogeneous(elem: TypeDesc) -> Self {
        TypeDesc::Tuple(TupleShape::Homogeneous(Box::new(elem)))
    }

    pub fn record(ty: Arc<RecordType>) -> Self {
        TypeDesc::Record(ty)
    }

    pub fn class(name: impl AsRef<str>) -> Self {
        TypeDesc::Class(Arc::from(name.as_ref()))
    }

    /// Union of `branches`: nested unions are flattened, duplicates dropped
    /// (first occurrence kept) and a single survivor stands for itself.
    pub fn union<I: IntoIterator<Item = TypeDesc>>(branches: I) -> Result<Self> {
        union_of(branches).ok_or_else(|| {
            ConversionError::new(ErrorKind::InvalidAnnotation, "Union requires at least one branch")
        })
    }

    /// `Union[ty, None]`.
    pub fn optional(ty: TypeDesc) -> Self {
        union_of([ty, TypeDesc::None]).unwrap_or(TypeDesc::None)
    }

    /// Descriptor of a native Rust type.
    pub fn of<T: Typed + ?Sized>() -> Self {
        T::type_desc()
    }
}

fn union_of<I: IntoIterator<Item = TypeDesc>>(branches: I) -> Option<TypeDesc> {
    let mut flat = IndexSet::new();
    for branch in branches {
        match branch {
            TypeDesc::Union(inner) => flat.extend(inner),
            other => {
                flat.insert(other);
            }
        }
    }
    match flat.len() {
        0 => None,
        1 => flat.pop(),
        _ => Some(TypeDesc::Union(flat.into_iter().collect())),
    }
}

// ------------------------------ Inspection ------------------------------- //

impl TypeDesc {
    pub fn category(&self) -> Category {
        match self {
            TypeDesc::Any => Category::Any,
            TypeDesc::None => Category::None,
            TypeDesc::Union(_) => Category::Union,
            TypeDesc::Scalar(s) => match s {
                ScalarType::Int | ScalarType::Integral => Category::Integral,
                ScalarType::Fixed(k) if k.is_integer() => Category::Integral,
                ScalarType::Float | ScalarType::Real | ScalarType::Fixed(_) => Category::Real,
                ScalarType::Bool | ScalarType::Str => Category::Scalar,
            },
            TypeDesc::Sequence { .. } => Category::Sequence,
            TypeDesc::Mapping { .. } => Category::Mapping,
            TypeDesc::Collection { .. } => Category::Collection,
            TypeDesc::Tuple(_) => Category::Tuple,
            TypeDesc::Record(_) => Category::Record,
            TypeDesc::Class(_) => Category::Opaque,
        }
    }

    /// Union branches, or the descriptor itself.
    pub fn branches(&self) -> &[TypeDesc] {
        match self {
            TypeDesc::Union(branches) => branches,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_parameterized(&self) -> bool {
        match self {
            TypeDesc::Sequence { elem, .. } | TypeDesc::Collection { elem, .. } => elem.is_some(),
            TypeDesc::Mapping { params, .. } => params.is_some(),
            TypeDesc::Tuple(shape) => !matches!(shape, TupleShape::Bare),
            _ => false,
        }
    }

    /// Element parameter of a sequence or collection.
    pub fn element(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Sequence { elem, .. } | TypeDesc::Collection { elem, .. } => elem.as_deref(),
            _ => None,
        }
    }

    pub fn mapping_params(&self) -> Option<(&TypeDesc, &TypeDesc)> {
        match self {
            TypeDesc::Mapping { params: Some(p), .. } => Some((&p.0, &p.1)),
            _ => None,
        }
    }

    /// Key type of a dict-compatible (`Dict`, `Mapping`) parameterized mapping.
    pub fn dict_key_type(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Mapping { kind: MappingKind::Dict | MappingKind::Mapping, params: Some(p) } => {
                Some(&p.0)
            }
            _ => None,
        }
    }

    /// `Any` and unions are resolved fresh each time.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, TypeDesc::Any | TypeDesc::Union(_))
    }

    /// Nominal check: does `value` belong to this descriptor's base class?
    /// Parameters are ignored.
    pub fn instance_of(&self, value: &Value) -> bool {
        match self {
            TypeDesc::Any => true,
            TypeDesc::None => value.is_none(),
            TypeDesc::Scalar(s) => match s {
                ScalarType::Bool => matches!(value, Value::Bool(_)),
                ScalarType::Int => matches!(value, Value::Bool(_) | Value::Int(_)),
                ScalarType::Integral => value.is_integral(),
                ScalarType::Float => matches!(value, Value::Float(_)),
                ScalarType::Real => value.is_real(),
                ScalarType::Str => matches!(value, Value::Str(_)),
                ScalarType::Fixed(kind) => {
                    matches!(value, Value::Fixed(n) if n.kind() == *kind)
                }
            },
            TypeDesc::Union(branches) => branches.iter().any(|b| b.instance_of(value)),
            TypeDesc::Sequence { kind, .. } => match kind {
                SequenceKind::List => matches!(value, Value::List(_)),
                SequenceKind::Sequence => value.is_sequence(),
            },
            TypeDesc::Mapping { kind, .. } => match kind {
                MappingKind::Dict => matches!(value, Value::Dict(_)),
                MappingKind::FrozenDict => matches!(value, Value::FrozenDict(_)),
                MappingKind::Mapping => value.is_mapping(),
            },
            TypeDesc::Collection { kind, .. } => match kind {
                CollectionKind::Set => matches!(value, Value::Set(_)),
                CollectionKind::FrozenSet => matches!(value, Value::FrozenSet(_)),
                CollectionKind::Collection => value.is_collection(),
            },
            TypeDesc::Tuple(_) => matches!(value, Value::Tuple(_)),
            TypeDesc::Record(ty) => match value {
                Value::Record(r) => Arc::ptr_eq(r.record_type(), ty) || **r.record_type() == **ty,
                _ => false,
            },
            TypeDesc::Class(name) => matches!(value, Value::Object(o) if o.class_name() == &**name),
        }
    }
}

// ------------------------------- Display --------------------------------- //

fn write_params(f: &mut fmt::Formatter<'_>, base: &str, params: &[&TypeDesc]) -> fmt::Result {
    write!(f, "{base}[")?;
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{p}")?;
    }
    f.write_str("]")
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Bool => f.write_str("bool"),
            ScalarType::Int => f.write_str("int"),
            ScalarType::Float => f.write_str("float"),
            ScalarType::Str => f.write_str("str"),
            ScalarType::Integral => f.write_str("Integral"),
            ScalarType::Real => f.write_str("Real"),
            ScalarType::Fixed(kind) => write!(f, "{kind}"),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Any => f.write_str("Any"),
            TypeDesc::None => f.write_str("None"),
            TypeDesc::Scalar(s) => write!(f, "{s}"),
            TypeDesc::Union(branches) => match branches.as_slice() {
                [inner, TypeDesc::None] => write!(f, "Optional[{inner}]"),
                _ => write_params(f, "Union", &branches.iter().collect::<Vec<_>>()),
            },
            TypeDesc::Sequence { kind, elem } => {
                let (bare, generic) = match kind {
                    SequenceKind::List => ("list", "List"),
                    SequenceKind::Sequence => ("Sequence", "Sequence"),
                };
                match elem {
                    None => f.write_str(bare),
                    Some(e) => write_params(f, generic, &[&**e]),
                }
            }
            TypeDesc::Mapping { kind, params } => {
                let (bare, generic) = match kind {
                    MappingKind::Dict => ("dict", "Dict"),
                    MappingKind::Mapping => ("Mapping", "Mapping"),
                    MappingKind::FrozenDict => ("FrozenDict", "FrozenDict"),
                };
                match params {
                    None => f.write_str(bare),
                    Some(p) => write_params(f, generic, &[&p.0, &p.1]),
                }
            }
            TypeDesc::Collection { kind, elem } => {
                let (bare, generic) = match kind {
                    CollectionKind::Set => ("set", "Set"),
                    CollectionKind::FrozenSet => ("frozenset", "FrozenSet"),
                    CollectionKind::Collection => ("Collection", "Collection"),
                };
                match elem {
                    None => f.write_str(bare),
                    Some(e) => write_params(f, generic, &[&**e]),
                }
            }
            TypeDesc::Tuple(TupleShape::Bare) => f.write_str("tuple"),
            TypeDesc::Tuple(TupleShape::Fixed(elems)) if elems.is_empty() => f.write_str("Tuple[()]"),
            TypeDesc::Tuple(TupleShape::Fixed(elems)) => {
                write_params(f, "Tuple", &elems.iter().collect::<Vec<_>>())
            }
            TypeDesc::Tuple(TupleShape::Homogeneous(e)) => write!(f, "Tuple[{e}, ...]"),
            TypeDesc::Record(ty) => f.write_str(ty.name()),
            TypeDesc::Class(name) => f.write_str(name),
        }
    }
}

impl FromStr for TypeDesc {
    type Err = ConversionError;

    /// Parse against the builtin names only; records and classes need a
    /// [`TypeNamespace`].
    fn from_str(s: &str) -> Result<Self> {
        TypeNamespace::new().parse(s)
    }
}

impl Serialize for TypeDesc {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeDesc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ----------------------------- Native types ------------------------------ //

/// Rust types with a natural descriptor.
pub trait Typed {
    fn type_desc() -> TypeDesc;
}

macro_rules! typed_scalar {
    ($($t:ty => $desc:expr),* $(,)?) => {
        $(impl Typed for $t {
            fn type_desc() -> TypeDesc {
                $desc
            }
        })*
    };
}

typed_scalar! {
    bool => TypeDesc::bool(),
    i64 => TypeDesc::int(),
    f64 => TypeDesc::float(),
    str => TypeDesc::str(),
    String => TypeDesc::str(),
    () => TypeDesc::None,
    Value => TypeDesc::Any,
    i8 => TypeDesc::fixed(FixedKind::I8),
    i16 => TypeDesc::fixed(FixedKind::I16),
    i32 => TypeDesc::fixed(FixedKind::I32),
    u8 => TypeDesc::fixed(FixedKind::U8),
    u16 => TypeDesc::fixed(FixedKind::U16),
    u32 => TypeDesc::fixed(FixedKind::U32),
    u64 => TypeDesc::fixed(FixedKind::U64),
    f32 => TypeDesc::fixed(FixedKind::F32),
}

impl<T: Typed> Typed for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::list_of(T::type_desc())
    }
}

impl<T: Typed> Typed for Option<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::optional(T::type_desc())
    }
}

impl<K: Typed, V: Typed, S> Typed for HashMap<K, V, S> {
    fn type_desc() -> TypeDesc {
        TypeDesc::dict_of(K::type_desc(), V::type_desc())
    }
}

impl<K: Typed, V: Typed> Typed for BTreeMap<K, V> {
    fn type_desc() -> TypeDesc {
        TypeDesc::dict_of(K::type_desc(), V::type_desc())
    }
}

impl<K: Typed, V: Typed, S> Typed for IndexMap<K, V, S> {
    fn type_desc() -> TypeDesc {
        TypeDesc::dict_of(K::type_desc(), V::type_desc())
    }
}

impl<T: Typed, S> Typed for HashSet<T, S> {
    fn type_desc() -> TypeDesc {
        TypeDesc::set_of(T::type_desc())
    }
}

impl<T: Typed> Typed for BTreeSet<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::set_of(T::type_desc())
    }
}

impl<T: Typed, S> Typed for IndexSet<T, S> {
    fn type_desc() -> TypeDesc {
        TypeDesc::set_of(T::type_desc())
    }
}
