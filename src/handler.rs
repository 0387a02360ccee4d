//! Conversion strategies, one per shape of descriptor.
//!
//! Handlers hold no state of their own. Every recursive step goes back through
//! the [`Dispatch`] they were handed, never straight to another handler, so a
//! wrapping converter sees nested descriptors too.
pub mod container;
pub mod scalar;
pub mod union;

use std::fmt::Debug;
use std::sync::Arc;

use crate::converter::Dispatch;
use crate::error::{ConversionError, Path, Result};
use crate::types::TypeDesc;
use crate::value::Value;

pub use container::{CollectionHandler, DictHandler, ListHandler, MappingHandler};
pub use scalar::{AnyHandler, FloatHandler, IntHandler, TrivialHandler};
pub use union::UnionHandler;

/// Identifies a handler implementation; the registry keeps one instance per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Trivial,
    Any,
    Int,
    Float,
    Union,
    Mapping,
    Dict,
    Collection,
    List,
}

impl HandlerKind {
    pub fn create(self) -> Arc<dyn TypeHandler> {
        match self {
            HandlerKind::Trivial => Arc::new(TrivialHandler),
            HandlerKind::Any => Arc::new(AnyHandler),
            HandlerKind::Int => Arc::new(IntHandler),
            HandlerKind::Float => Arc::new(FloatHandler),
            HandlerKind::Union => Arc::new(UnionHandler),
            HandlerKind::Mapping => Arc::new(MappingHandler),
            HandlerKind::Dict => Arc::new(DictHandler),
            HandlerKind::Collection => Arc::new(CollectionHandler),
            HandlerKind::List => Arc::new(ListHandler),
        }
    }
}

pub trait TypeHandler: Send + Sync + Debug {
    fn kind(&self) -> HandlerKind;

    /// Whether `value` already conforms to `ty`. Mismatches are `Ok(false)`.
    fn isinstance(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool>;

    fn ensure_isinstance(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<()> {
        if self.isinstance(cx, value, ty, path)? {
            Ok(())
        } else {
            Err(ConversionError::mismatch(value, ty, path))
        }
    }

    /// Default: no conversion, conforming values pass through unchanged.
    fn convert(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<Value> {
        self.ensure_isinstance(cx, value, ty, path)?;
        Ok(value.clone())
    }
}
