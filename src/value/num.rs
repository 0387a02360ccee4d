use std::fmt;
use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;

/// Foreign fixed-width numeric classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixedKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl FixedKind {
    pub const ALL: [FixedKind; 10] = [
        FixedKind::I8,
        FixedKind::I16,
        FixedKind::I32,
        FixedKind::I64,
        FixedKind::U8,
        FixedKind::U16,
        FixedKind::U32,
        FixedKind::U64,
        FixedKind::F32,
        FixedKind::F64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FixedKind::I8 => "int8",
            FixedKind::I16 => "int16",
            FixedKind::I32 => "int32",
            FixedKind::I64 => "int64",
            FixedKind::U8 => "uint8",
            FixedKind::U16 => "uint16",
            FixedKind::U32 => "uint32",
            FixedKind::U64 => "uint64",
            FixedKind::F32 => "float32",
            FixedKind::F64 => "float64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, FixedKind::F32 | FixedKind::F64)
    }
}

impl fmt::Display for FixedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A foreign fixed-width scalar: integral-like or real-like, never native.
#[derive(Clone, Copy, Debug)]
pub enum FixedNum {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(OrderedFloat<f32>),
    F64(OrderedFloat<f64>),
}

impl FixedNum {
    pub fn kind(&self) -> FixedKind {
        match self {
            FixedNum::I8(_) => FixedKind::I8,
            FixedNum::I16(_) => FixedKind::I16,
            FixedNum::I32(_) => FixedKind::I32,
            FixedNum::I64(_) => FixedKind::I64,
            FixedNum::U8(_) => FixedKind::U8,
            FixedNum::U16(_) => FixedKind::U16,
            FixedNum::U32(_) => FixedKind::U32,
            FixedNum::U64(_) => FixedKind::U64,
            FixedNum::F32(_) => FixedKind::F32,
            FixedNum::F64(_) => FixedKind::F64,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.kind().is_integer()
    }

    pub fn number(&self) -> Number {
        match *self {
            FixedNum::I8(n) => Number::Int(n.into()),
            FixedNum::I16(n) => Number::Int(n.into()),
            FixedNum::I32(n) => Number::Int(n.into()),
            FixedNum::I64(n) => Number::Int(n.into()),
            FixedNum::U8(n) => Number::Int(n.into()),
            FixedNum::U16(n) => Number::Int(n.into()),
            FixedNum::U32(n) => Number::Int(n.into()),
            FixedNum::U64(n) => Number::Int(n.into()),
            FixedNum::F32(x) => Number::Float(f64::from(x.0)),
            FixedNum::F64(x) => Number::Float(x.0),
        }
    }
}

impl fmt::Display for FixedNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.number())
    }
}

// ----------------------------- Numeric tower ----------------------------- //

/// Value-level view of any numeric, used for cross-class equality and hashing.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i128),
    Float(f64),
}

// Floats in this range convert to i128 without saturating.
const I128_SAFE: f64 = 1.0e38;

impl Number {
    /// The integer this number is exactly equal to, if any.
    pub fn as_exact_int(&self) -> Option<i128> {
        match *self {
            Number::Int(i) => Some(i),
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < I128_SAFE => {
                Some(x as i128)
            }
            Number::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Float(x) => x,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (Number::Int(_), Number::Float(_)) | (Number::Float(_), Number::Int(_)) => {
                match (self.as_exact_int(), other.as_exact_int()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
        }
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // integral-valued floats hash like the integer they equal
        match self.as_exact_int() {
            Some(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            None => {
                1u8.hash(state);
                OrderedFloat(self.as_f64()).hash(state);
            }
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}
