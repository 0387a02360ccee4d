//! Descriptor → handler resolution.
//!
//! Handler instances are created lazily, one per [`HandlerKind`]. Resolved
//! descriptors are cached by structural hash; `Any` and unions skip the cache
//! and go through the instance table every time.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::ConverterConfig;
use crate::error::{ConversionError, ErrorKind, Result};
use crate::handler::{HandlerKind, TypeHandler};
use crate::types::{Category, MappingKind, TupleShape, TypeDesc};

#[derive(Debug)]
pub struct HandlerRegistry {
    cache_enabled: bool,
    instances: RwLock<HashMap<HandlerKind, Arc<dyn TypeHandler>>>,
    cache: RwLock<HashMap<TypeDesc, Arc<dyn TypeHandler>>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(&ConverterConfig::default())
    }
}

impl HandlerRegistry {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            cache_enabled: config.cache_handlers,
            instances: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, ty: &TypeDesc) -> Result<Arc<dyn TypeHandler>> {
        if !self.cache_enabled || !ty.is_cacheable() {
            return Ok(self.handler_instance(find_handler_kind(ty)?));
        }

        // Fast path: read lock only
        if let Some(handler) = self.cache.read().get(ty) {
            return Ok(handler.clone());
        }

        let kind = find_handler_kind(ty)?;
        tracing::trace!(%ty, ?kind, "handler cache miss");
        let handler = self.handler_instance(kind);
        // Another thread may have resolved it meanwhile; either entry is equivalent.
        let mut cache = self.cache.write();
        Ok(cache.entry(ty.clone()).or_insert(handler).clone())
    }

    /// The shared instance for `kind`, created on first use.
    pub fn handler_instance(&self, kind: HandlerKind) -> Arc<dyn TypeHandler> {
        if let Some(handler) = self.instances.read().get(&kind) {
            return handler.clone();
        }
        let mut instances = self.instances.write();
        instances.entry(kind).or_insert_with(|| kind.create()).clone()
    }

    /// Number of descriptors resolved through the cache so far.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }
}

/// Pure routing: which handler kind serves `ty`.
pub fn find_handler_kind(ty: &TypeDesc) -> Result<HandlerKind> {
    let kind = match ty.category() {
        Category::Any => HandlerKind::Any,
        Category::Union => HandlerKind::Union,
        Category::Tuple => match ty {
            TypeDesc::Tuple(TupleShape::Fixed(_)) => {
                return Err(ConversionError::new(
                    ErrorKind::NotImplemented,
                    "Structured Tuple[] types not implemented",
                )
                .with_type(ty.clone()));
            }
            TypeDesc::Tuple(TupleShape::Homogeneous(_)) => {
                return Err(ConversionError::new(
                    ErrorKind::NotImplemented,
                    "Homogeneous Tuple[] types not implemented",
                )
                .with_type(ty.clone()));
            }
            _ => HandlerKind::Trivial,
        },
        Category::Mapping => match ty {
            TypeDesc::Mapping { kind: MappingKind::Dict | MappingKind::Mapping, .. } => HandlerKind::Dict,
            _ if ty.is_parameterized() => HandlerKind::Mapping,
            _ => HandlerKind::Trivial,
        },
        // every sequence kind is list-compatible
        Category::Sequence => HandlerKind::List,
        Category::Collection if ty.is_parameterized() => HandlerKind::Collection,
        Category::Integral => HandlerKind::Int,
        Category::Real => HandlerKind::Float,
        Category::None
        | Category::Scalar
        | Category::Collection
        | Category::Record
        | Category::Opaque => HandlerKind::Trivial,
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FixedKind;

    #[test]
    fn routes_by_shape() {
        let cases = [
            (TypeDesc::Any, HandlerKind::Any),
            (TypeDesc::optional(TypeDesc::int()), HandlerKind::Union),
            (TypeDesc::int(), HandlerKind::Int),
            (TypeDesc::integral(), HandlerKind::Int),
            (TypeDesc::fixed(FixedKind::U16), HandlerKind::Int),
            (TypeDesc::float(), HandlerKind::Float),
            (TypeDesc::fixed(FixedKind::F64), HandlerKind::Float),
            (TypeDesc::real(), HandlerKind::Float),
            (TypeDesc::bool(), HandlerKind::Trivial),
            (TypeDesc::str(), HandlerKind::Trivial),
            (TypeDesc::None, HandlerKind::Trivial),
            (TypeDesc::list(), HandlerKind::List),
            (TypeDesc::sequence_of(TypeDesc::int()), HandlerKind::List),
            (TypeDesc::dict(), HandlerKind::Dict),
            (TypeDesc::mapping_of(TypeDesc::str(), TypeDesc::int()), HandlerKind::Dict),
            (TypeDesc::frozen_dict(), HandlerKind::Trivial),
            (TypeDesc::frozen_dict_of(TypeDesc::str(), TypeDesc::int()), HandlerKind::Mapping),
            (TypeDesc::set(), HandlerKind::Trivial),
            (TypeDesc::set_of(TypeDesc::int()), HandlerKind::Collection),
            (TypeDesc::collection_of(TypeDesc::int()), HandlerKind::Collection),
            (TypeDesc::tuple(), HandlerKind::Trivial),
            (TypeDesc::class("Widget"), HandlerKind::Trivial),
        ];
        for (ty, kind) in cases {
            assert_eq!(find_handler_kind(&ty).unwrap(), kind, "{ty}");
        }
    }

    #[test]
    fn parameterized_tuples_are_not_implemented() {
        let err = find_handler_kind(&TypeDesc::tuple_of(vec![TypeDesc::int()])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotImplemented);
        assert_eq!(err.message, "Structured Tuple[] types not implemented");

        let err = find_handler_kind(&TypeDesc::tuple_homogeneous(TypeDesc::int())).unwrap_err();
        assert_eq!(err.message, "Homogeneous Tuple[] types not implemented");
    }

    #[test]
    fn caches_concrete_descriptors_only() {
        let registry = HandlerRegistry::default();
        let a = registry.resolve(&TypeDesc::list_of(TypeDesc::int())).unwrap();
        let b = registry.resolve(&TypeDesc::list_of(TypeDesc::int())).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        registry.resolve(&TypeDesc::Any).unwrap();
        registry.resolve(&TypeDesc::optional(TypeDesc::str())).unwrap();
        assert_eq!(registry.cached_len(), 1);

        // same instance regardless of which descriptor asked for it
        let c = registry.resolve(&TypeDesc::sequence()).unwrap();
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(registry.cached_len(), 2);
    }

    #[test]
    fn cache_can_be_disabled() {
        let registry = HandlerRegistry::new(&ConverterConfig { cache_handlers: false });
        let a = registry.resolve(&TypeDesc::dict()).unwrap();
        let b = registry.resolve(&TypeDesc::dict()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.cached_len(), 0);
    }
}
