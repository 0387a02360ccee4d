//! Leaf handlers: nominal pass-through, `Any`, and numeric narrowing.
use crate::converter::Dispatch;
use crate::error::{ConversionError, Path, Result};
use crate::types::TypeDesc;
use crate::value::Value;

use super::{HandlerKind, TypeHandler};

/// Nominal check, no conversion.
#[derive(Debug, Default)]
pub struct TrivialHandler;

impl TypeHandler for TrivialHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Trivial
    }

    fn isinstance(&self, _cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, _path: &Path) -> Result<bool> {
        Ok(ty.instance_of(value))
    }
}

/// Everything matches; conversion is identity.
#[derive(Debug, Default)]
pub struct AnyHandler;

impl TypeHandler for AnyHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Any
    }

    fn isinstance(&self, _cx: &dyn Dispatch, _value: &Value, _ty: &TypeDesc, _path: &Path) -> Result<bool> {
        Ok(true)
    }

    fn convert(&self, _cx: &dyn Dispatch, value: &Value, _ty: &TypeDesc, _path: &Path) -> Result<Value> {
        Ok(value.clone())
    }
}

/// Integral descriptors. Converts any integral-like value to a native `int`.
#[derive(Debug, Default)]
pub struct IntHandler;

impl TypeHandler for IntHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Int
    }

    fn isinstance(&self, _cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, _path: &Path) -> Result<bool> {
        Ok(ty.instance_of(value))
    }

    fn convert(&self, _cx: &dyn Dispatch, value: &Value, _ty: &TypeDesc, path: &Path) -> Result<Value> {
        if let Value::Int(_) = value {
            return Ok(value.clone());
        }
        if !value.is_integral() {
            return Err(ConversionError::mismatch(value, &TypeDesc::integral(), path));
        }
        match value.to_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => Err(ConversionError::mismatch(value, &TypeDesc::int(), path)
                .with_context("integer out of range")),
        }
    }
}

/// Real descriptors. Converts any real-like value to a native `float`.
#[derive(Debug, Default)]
pub struct FloatHandler;

impl TypeHandler for FloatHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Float
    }

    fn isinstance(&self, _cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, _path: &Path) -> Result<bool> {
        Ok(ty.instance_of(value))
    }

    fn convert(&self, _cx: &dyn Dispatch, value: &Value, _ty: &TypeDesc, path: &Path) -> Result<Value> {
        if let Value::Float(_) = value {
            return Ok(value.clone());
        }
        match value.to_f64() {
            Some(x) => Ok(Value::float(x)),
            None => Err(ConversionError::mismatch(value, &TypeDesc::real(), path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use ordered_float::OrderedFloat;

    use crate::converter::TypeConverter;
    use crate::error::ErrorKind;
    use crate::types::TypeDesc;
    use crate::value::{FixedKind, FixedNum, Value};

    #[test]
    fn foreign_integers_become_native() {
        let tc = TypeConverter::new();
        for n in [
            FixedNum::I8(-3),
            FixedNum::I16(300),
            FixedNum::I32(7),
            FixedNum::I64(-9),
            FixedNum::U8(255),
            FixedNum::U16(1),
            FixedNum::U32(70_000),
            FixedNum::U64(42),
        ] {
            let v = Value::Fixed(n);
            let expected = v.to_i64().unwrap();
            assert!(!tc.isinstance(&v, &TypeDesc::int()).unwrap());
            assert!(tc.isinstance(&v, &TypeDesc::integral()).unwrap());
            let out = tc.convert(&v, &TypeDesc::int()).unwrap();
            assert!(matches!(out, Value::Int(i) if i == expected), "{n}");
        }
    }

    #[test]
    fn foreign_reals_become_native() {
        let tc = TypeConverter::new();
        let v = Value::Fixed(FixedNum::F32(OrderedFloat(1.5)));
        assert!(matches!(tc.convert(&v, &TypeDesc::float()).unwrap(), Value::Float(x) if x.0 == 1.5));
        assert!(matches!(tc.convert(&Value::Int(2), &TypeDesc::float()).unwrap(), Value::Float(x) if x.0 == 2.0));
        assert!(matches!(tc.convert(&Value::Bool(true), &TypeDesc::int()).unwrap(), Value::Int(1)));
    }

    #[test]
    fn reals_do_not_narrow_to_int() {
        let tc = TypeConverter::new();
        let err = tc.convert(&Value::float(1.0), &TypeDesc::int()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Mismatch);
        assert!(tc.convert(&Value::str("1"), &TypeDesc::float()).is_err());
    }

    #[test]
    fn u64_beyond_native_range_is_an_error() {
        let tc = TypeConverter::new();
        let v = Value::Fixed(FixedNum::U64(u64::MAX));
        let err = tc.convert(&v, &TypeDesc::fixed(FixedKind::U64)).unwrap_err();
        assert!(err.message.starts_with("integer out of range"));
    }

    #[test]
    fn bool_descriptor_is_not_widened() {
        let tc = TypeConverter::new();
        assert!(tc.convert(&Value::Int(1), &TypeDesc::bool()).is_err());
        assert!(matches!(tc.convert(&Value::Bool(false), &TypeDesc::bool()).unwrap(), Value::Bool(false)));
    }
}
