//! Mapping, collection, dict and list handlers.
//!
//! The dict and list handlers are the only ones that build new containers:
//! unparameterized conversion of an already-native value hands back the very
//! same object, everything else allocates.
use std::sync::Arc;

use crate::converter::Dispatch;
use crate::error::{ConversionError, Path, Result};
use crate::types::TypeDesc;
use crate::value::{Map, Value};

use super::{HandlerKind, TypeHandler};

// ------------------------------- Mappings -------------------------------- //

fn mapping_isinstance(cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
    if !ty.instance_of(value) {
        return Ok(false);
    }
    let (Some((key_ty, val_ty)), Some(map)) = (ty.mapping_params(), value.as_mapping()) else {
        return Ok(true);
    };
    for (k, v) in map {
        let item_path = path.key(k);
        if !cx.isinstance_at(k, key_ty, &item_path)? || !cx.isinstance_at(v, val_ty, &item_path)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Parameterized mappings that are not dict-compatible. Checks only.
#[derive(Debug, Default)]
pub struct MappingHandler;

impl TypeHandler for MappingHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Mapping
    }

    fn isinstance(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
        mapping_isinstance(cx, value, ty, path)
    }
}

/// `Dict` and `Mapping`: any mapping converts to a native dict.
#[derive(Debug, Default)]
pub struct DictHandler;

impl TypeHandler for DictHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Dict
    }

    fn isinstance(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
        mapping_isinstance(cx, value, ty, path)
    }

    fn convert(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<Value> {
        let Some(map) = value.as_mapping() else {
            return Err(ConversionError::mismatch(value, &TypeDesc::mapping(), path));
        };
        let Some((key_ty, val_ty)) = ty.mapping_params() else {
            return Ok(match value {
                Value::Dict(_) => value.clone(),
                _ => Value::Dict(Arc::new(map.clone())),
            });
        };

        let mut converted = Map::with_capacity(map.len());
        for (k, v) in map {
            let item_path = path.key(k);
            let kc = cx.convert_at(k, key_ty, &item_path)?;
            let vc = cx.convert_at(v, val_ty, &item_path)?;
            converted.insert(kc, vc);
        }
        Ok(Value::Dict(Arc::new(converted)))
    }
}

// ------------------------------ Collections ------------------------------ //

fn collection_isinstance(cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
    if !ty.instance_of(value) {
        return Ok(false);
    }
    let (Some(elem_ty), Some(elems)) = (ty.element(), value.iter_elements()) else {
        return Ok(true);
    };
    for (i, elem) in elems.enumerate() {
        if !cx.isinstance_at(&elem, elem_ty, &path.index(i))? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Parameterized non-mapping collections that are not list-compatible. Checks only.
#[derive(Debug, Default)]
pub struct CollectionHandler;

impl TypeHandler for CollectionHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Collection
    }

    fn isinstance(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
        collection_isinstance(cx, value, ty, path)
    }
}

/// `List` and `Sequence`: any non-text sequence converts to a native list.
#[derive(Debug, Default)]
pub struct ListHandler;

impl TypeHandler for ListHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::List
    }

    fn isinstance(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
        collection_isinstance(cx, value, ty, path)
    }

    fn convert(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<Value> {
        let elems = match value.iter_elements() {
            Some(elems) if value.is_sequence() => elems,
            _ => return Err(ConversionError::mismatch(value, &TypeDesc::sequence(), path)),
        };
        let Some(elem_ty) = ty.element() else {
            return Ok(match value {
                Value::List(_) => value.clone(),
                _ => Value::list(elems),
            });
        };

        let converted = elems
            .enumerate()
            .map(|(i, elem)| cx.convert_at(&elem, elem_ty, &path.index(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::from(converted))
    }
}

#[cfg(test)]
mod tests {
    use crate::converter::TypeConverter;
    use crate::error::{ErrorKind, Path};
    use crate::types::TypeDesc;
    use crate::value::{FixedNum, Value};

    #[test]
    fn unparameterized_native_containers_are_returned_as_is() {
        let tc = TypeConverter::new();
        let list = Value::list([Value::Int(1), Value::str("a")]);
        assert!(tc.convert(&list, &TypeDesc::list()).unwrap().same(&list));
        assert!(tc.convert(&list, &TypeDesc::sequence()).unwrap().same(&list));

        let dict = Value::dict([(Value::str("a"), Value::Int(1))]);
        assert!(tc.convert(&dict, &TypeDesc::dict()).unwrap().same(&dict));
        assert!(tc.convert(&dict, &TypeDesc::mapping()).unwrap().same(&dict));
    }

    #[test]
    fn parameterized_conversion_always_builds_new_containers() {
        let tc = TypeConverter::new();
        let list = Value::list([Value::Int(1), Value::Int(2)]);
        let out = tc.convert(&list, &TypeDesc::list_of(TypeDesc::int())).unwrap();
        assert_eq!(out, list);
        assert!(!out.same(&list));

        let dict = Value::dict([(Value::str("a"), Value::Int(1))]);
        let out = tc.convert(&dict, &TypeDesc::dict_of(TypeDesc::str(), TypeDesc::int())).unwrap();
        assert_eq!(out, dict);
        assert!(!out.same(&dict));
    }

    #[test]
    fn non_native_sequences_and_mappings_become_native() {
        let tc = TypeConverter::new();
        let tuple = Value::tuple([Value::Int(1), Value::Int(2), Value::Int(3)]);
        let out = tc.convert(&tuple, &TypeDesc::sequence_of(TypeDesc::int())).unwrap();
        assert!(matches!(&out, Value::List(xs) if xs.len() == 3));
        assert!(matches!(tc.convert(&tuple, &TypeDesc::list()).unwrap(), Value::List(_)));
        let range = tc.convert(&Value::range(0, 3), &TypeDesc::list()).unwrap();
        assert_eq!(range, Value::list([Value::Int(0), Value::Int(1), Value::Int(2)]));

        let frozen = Value::frozen_dict([(Value::Int(1), Value::Fixed(FixedNum::I16(2)))]);
        let out = tc.convert(&frozen, &TypeDesc::dict()).unwrap();
        assert!(matches!(&out, Value::Dict(_)));
        let out = tc.convert(&frozen, &TypeDesc::mapping_of(TypeDesc::int(), TypeDesc::int())).unwrap();
        assert!(matches!(&out, Value::Dict(m) if matches!(m.get(&Value::Int(1)), Some(Value::Int(2)))));
    }

    #[test]
    fn text_is_never_a_sequence() {
        let tc = TypeConverter::new();
        let err = tc.convert(&Value::str("abc"), &TypeDesc::sequence_of(TypeDesc::str())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Mismatch);
        assert!(!tc.isinstance(&Value::str("abc"), &TypeDesc::sequence()).unwrap());
        assert!(tc.convert(&Value::set([]), &TypeDesc::list()).is_err());
    }

    #[test]
    fn nested_failures_report_their_path() {
        let tc = TypeConverter::new();
        let ty = TypeDesc::dict_of(TypeDesc::str(), TypeDesc::list_of(TypeDesc::int()));
        let value = Value::dict([
            (Value::str("ok"), Value::list([Value::Int(1)])),
            (Value::str("bad"), Value::list([Value::Int(1), Value::str("x")])),
        ]);
        let err = tc.convert(&value, &ty).unwrap_err();
        assert_eq!(err.path, Path::root().key(&Value::str("bad")).index(1));
        assert_eq!(err.value, Some(Value::str("x")));
        assert_eq!(err.to_string(), "Expected instance of Integral, got \"x\" (at [\"bad\"][1])");
    }

    #[test]
    fn collections_check_elements_but_do_not_convert() {
        let tc = TypeConverter::new();
        let ints = TypeDesc::set_of(TypeDesc::int());
        let set = Value::set([Value::Int(1), Value::Int(2)]);
        assert!(tc.isinstance(&set, &ints).unwrap());
        assert!(tc.convert(&set, &ints).unwrap().same(&set));
        assert!(!tc.isinstance(&Value::set([Value::str("a")]), &ints).unwrap());
        assert!(tc.convert(&Value::frozen_set([]), &ints).is_err());

        let frozen = TypeDesc::frozen_dict_of(TypeDesc::str(), TypeDesc::int());
        let value = Value::frozen_dict([(Value::str("a"), Value::Int(1))]);
        assert!(tc.convert(&value, &frozen).unwrap().same(&value));
        assert!(tc.convert(&Value::dict([]), &frozen).is_err());
    }
}
