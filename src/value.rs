//! Dynamic runtime values.
//!
//! `Value` is what the converter inspects and produces. It covers the runtime
//! shapes the engine distinguishes: the absence sentinel, native scalars,
//! foreign fixed-width numerics, native and non-native sequences/mappings,
//! sets, record instances and opaque objects.
//!
//! Containers share storage through `Arc`, so cloning a value is cheap and
//! "the identical object" is observable through [`Value::same`].
pub mod num;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;

use crate::capability::Object;
use crate::record::RecordValue;

pub use num::{FixedKind, FixedNum, Number};

pub type Map = IndexMap<Value, Value>;
pub type Set = IndexSet<Value>;

#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Fixed(FixedNum),
    Str(Arc<str>),
    /// Native list.
    List(Arc<Vec<Value>>),
    /// Ordered sequence that is not a list.
    Tuple(Arc<Vec<Value>>),
    Range { start: i64, stop: i64, step: i64 },
    /// Native mapping.
    Dict(Arc<Map>),
    /// Mapping that is not a native dict.
    FrozenDict(Arc<Map>),
    Set(Arc<Set>),
    FrozenSet(Arc<Set>),
    Record(Arc<RecordValue>),
    Object(Arc<dyn Object>),
}

// ------------------------------ Construction ----------------------------- //

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn float(x: f64) -> Self {
        Value::Float(OrderedFloat(x))
    }

    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    pub fn tuple<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Tuple(Arc::new(items.into_iter().collect()))
    }

    pub fn dict<I: IntoIterator<Item = (Value, Value)>>(entries: I) -> Self {
        Value::Dict(Arc::new(entries.into_iter().collect()))
    }

    pub fn frozen_dict<I: IntoIterator<Item = (Value, Value)>>(entries: I) -> Self {
        Value::FrozenDict(Arc::new(entries.into_iter().collect()))
    }

    pub fn set<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Set(Arc::new(items.into_iter().collect()))
    }

    pub fn frozen_set<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::FrozenSet(Arc::new(items.into_iter().collect()))
    }

    pub fn range(start: i64, stop: i64) -> Self {
        Value::Range { start, stop, step: 1 }
    }

    /// `None` when `step` is zero.
    pub fn range_step(start: i64, stop: i64, step: i64) -> Option<Self> {
        (step != 0).then_some(Value::Range { start, stop, step })
    }

    pub fn object<O: Object>(object: O) -> Self {
        Value::Object(Arc::new(object))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<FixedNum> for Value {
    fn from(n: FixedNum) -> Self {
        Value::Fixed(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Dict(Arc::new(map))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

// ------------------------------ Inspection ------------------------------- //

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Name of the runtime class, as used in diagnostics.
    pub fn class_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Fixed(n) => n.kind().name(),
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Range { .. } => "range",
            Value::Dict(_) => "dict",
            Value::FrozenDict(_) => "FrozenDict",
            Value::Set(_) => "set",
            Value::FrozenSet(_) => "frozenset",
            Value::Record(r) => r.record_type().name(),
            Value::Object(o) => o.class_name(),
        }
    }

    /// Numeric view; booleans count as 0/1.
    pub fn number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(i128::from(*b))),
            Value::Int(i) => Some(Number::Int(i128::from(*i))),
            Value::Float(x) => Some(Number::Float(x.0)),
            Value::Fixed(n) => Some(n.number()),
            _ => None,
        }
    }

    /// Integral-like: bool, int, or any fixed-width integer.
    pub fn is_integral(&self) -> bool {
        match self {
            Value::Bool(_) | Value::Int(_) => true,
            Value::Fixed(n) => n.is_integer(),
            _ => false,
        }
    }

    /// Real-like: anything integral-like plus native and fixed-width floats.
    pub fn is_real(&self) -> bool {
        matches!(self, Value::Float(_) | Value::Fixed(_)) || self.is_integral()
    }

    /// Narrow an integral-like value to a native integer.
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integral() {
            return None;
        }
        match self.number()? {
            Number::Int(i) => i64::try_from(i).ok(),
            Number::Float(_) => None,
        }
    }

    /// Narrow a real-like value to a native float.
    pub fn to_f64(&self) -> Option<f64> {
        if !self.is_real() {
            return None;
        }
        self.number().map(|n| n.as_f64())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Map> {
        match self {
            Value::Dict(m) | Value::FrozenDict(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        self.as_mapping().is_some()
    }

    /// Ordered, sized, iterable. Text is never a sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::List(_) | Value::Tuple(_) | Value::Range { .. })
    }

    /// Sized + iterable + container.
    pub fn is_collection(&self) -> bool {
        self.is_sequence()
            || self.is_mapping()
            || matches!(self, Value::Set(_) | Value::FrozenSet(_) | Value::Str(_))
    }

    /// Number of elements of a collection.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(xs) | Value::Tuple(xs) => Some(xs.len()),
            Value::Range { start, stop, step } => Some(range_len(*start, *stop, *step)),
            Value::Dict(m) | Value::FrozenDict(m) => Some(m.len()),
            Value::Set(s) | Value::FrozenSet(s) => Some(s.len()),
            Value::Str(s) => Some(s.chars().count()),
            _ => None,
        }
    }

    /// Iterate a collection the way a `for` loop would: sequence elements,
    /// mapping keys, set members, characters of text.
    pub fn iter_elements(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        match self {
            Value::List(xs) | Value::Tuple(xs) => Some(Box::new(xs.iter().cloned())),
            Value::Range { start, step, .. } => {
                let (start, step) = (*start, *step);
                let n = self.len().unwrap_or(0);
                Some(Box::new((0..n).map(move |i| {
                    Value::Int((i128::from(start) + i as i128 * i128::from(step)) as i64)
                })))
            }
            Value::Dict(m) | Value::FrozenDict(m) => Some(Box::new(m.keys().cloned())),
            Value::Set(s) | Value::FrozenSet(s) => Some(Box::new(s.iter().cloned())),
            Value::Str(s) => Some(Box::new(s.chars().map(|c| Value::str(c.to_string())))),
            _ => None,
        }
    }

    /// Identity: the same shared object for containers and text, the same
    /// variant and bits for inline scalars.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.0.to_bits() == b.0.to_bits(),
            (Value::Fixed(a), Value::Fixed(b)) => a.kind() == b.kind() && a.number() == b.number(),
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => Arc::ptr_eq(a, b),
            (
                Value::Range { start, stop, step },
                Value::Range { start: s2, stop: e2, step: t2 },
            ) => (start, stop, step) == (s2, e2, t2),
            (Value::Dict(a), Value::Dict(b)) | (Value::FrozenDict(a), Value::FrozenDict(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Value::Set(a), Value::Set(b)) | (Value::FrozenSet(a), Value::FrozenSet(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
    let n = if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / (-step) + 1
    } else {
        0
    };
    n as usize
}

// ------------------------------- Equality -------------------------------- //

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.number(), other.number()) {
            return a == b;
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (
                Value::Range { start, stop, step },
                Value::Range { start: s2, stop: e2, step: t2 },
            ) => {
                let (n1, n2) = (range_len(*start, *stop, *step), range_len(*s2, *e2, *t2));
                n1 == n2 && (n1 == 0 || (start == s2 && (n1 == 1 || step == t2)))
            }
            (Value::Dict(a) | Value::FrozenDict(a), Value::Dict(b) | Value::FrozenDict(b)) => a == b,
            (Value::Set(a) | Value::FrozenSet(a), Value::Set(b) | Value::FrozenSet(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(n) = self.number() {
            n.hash(state);
            return;
        }
        match self {
            Value::Str(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            Value::List(xs) => {
                3u8.hash(state);
                xs.hash(state);
            }
            Value::Tuple(xs) => {
                4u8.hash(state);
                xs.hash(state);
            }
            Value::Range { start, stop, step } => {
                5u8.hash(state);
                range_len(*start, *stop, *step).hash(state);
            }
            // order-insensitive equality: only the size is stable
            Value::Dict(m) | Value::FrozenDict(m) => {
                6u8.hash(state);
                m.len().hash(state);
            }
            Value::Set(s) | Value::FrozenSet(s) => {
                7u8.hash(state);
                s.len().hash(state);
            }
            Value::Record(r) => {
                8u8.hash(state);
                r.hash(state);
            }
            Value::Object(o) => {
                9u8.hash(state);
                (Arc::as_ptr(o) as *const () as usize).hash(state);
            }
            _ => 10u8.hash(state),
        }
    }
}

// ------------------------------- Display --------------------------------- //

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = &'a Value>,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_map(f: &mut fmt::Formatter<'_>, map: &Map) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{k}: {v}")?;
    }
    f.write_str("}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{:?}", x.0),
            Value::Fixed(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{:?}", &**s),
            Value::List(xs) => {
                f.write_str("[")?;
                write_seq(f, xs.iter())?;
                f.write_str("]")
            }
            Value::Tuple(xs) => {
                f.write_str("(")?;
                write_seq(f, xs.iter())?;
                if xs.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Range { start, stop, step: 1 } => write!(f, "range({start}, {stop})"),
            Value::Range { start, stop, step } => write!(f, "range({start}, {stop}, {step})"),
            Value::Dict(m) => write_map(f, m),
            Value::FrozenDict(m) => {
                f.write_str("FrozenDict(")?;
                write_map(f, m)?;
                f.write_str(")")
            }
            Value::Set(s) if s.is_empty() => f.write_str("set()"),
            Value::Set(s) => {
                f.write_str("{")?;
                write_seq(f, s.iter())?;
                f.write_str("}")
            }
            Value::FrozenSet(s) if s.is_empty() => f.write_str("frozenset()"),
            Value::FrozenSet(s) => {
                f.write_str("frozenset({")?;
                write_seq(f, s.iter())?;
                f.write_str("})")
            }
            Value::Record(r) => write!(f, "{r}"),
            Value::Object(o) => f.write_str(&o.repr()),
        }
    }
}
