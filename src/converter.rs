//! The conversion engine.
//!
//! `TypeConverter` resolves a handler for the target descriptor and lets it
//! decide. Handlers recurse through [`Dispatch`], which is also the seam the
//! JSON converter uses to intercept nested descriptors.
use once_cell::sync::Lazy;

use crate::config::ConverterConfig;
use crate::error::{Path, Result};
use crate::registry::HandlerRegistry;
use crate::types::TypeDesc;
use crate::value::Value;

/// Recursive entry points handed to every handler.
pub trait Dispatch {
    fn registry(&self) -> &HandlerRegistry;

    fn isinstance_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool>;

    fn ensure_isinstance_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<()>;

    fn convert_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<Value>;
}

#[derive(Debug, Default)]
pub struct TypeConverter {
    registry: HandlerRegistry,
}

impl TypeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &ConverterConfig) -> Self {
        Self { registry: HandlerRegistry::new(config) }
    }

    /// Whether `value` conforms to `ty`, recursively. Only unresolvable
    /// descriptors are errors.
    pub fn isinstance(&self, value: &Value, ty: &TypeDesc) -> Result<bool> {
        self.isinstance_at(value, ty, &Path::root())
    }

    pub fn ensure_isinstance(&self, value: &Value, ty: &TypeDesc) -> Result<()> {
        self.ensure_isinstance_at(value, ty, &Path::root())
    }

    /// Convert `value` to an equivalent value of type `ty`.
    ///
    /// Mostly this is a checked pass-through. Real conversions happen for
    /// mappings into `dict`, non-text sequences into `list`, and foreign
    /// numerics into native `int`/`float`, recursively.
    pub fn convert(&self, value: &Value, ty: &TypeDesc) -> Result<Value> {
        self.convert_at(value, ty, &Path::root())
    }
}

impl Dispatch for TypeConverter {
    fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    fn isinstance_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
        self.registry.resolve(ty)?.isinstance(self, value, ty, path)
    }

    fn ensure_isinstance_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<()> {
        self.registry.resolve(ty)?.ensure_isinstance(self, value, ty, path)
    }

    fn convert_at(&self, value: &Value, ty: &TypeDesc, path: &Path) -> Result<Value> {
        self.registry.resolve(ty)?.convert(self, value, ty, path)
    }
}

// ---------------------------- Default instance --------------------------- //

/// Process-wide converter behind the free functions below.
pub static DEFAULT_CONVERTER: Lazy<TypeConverter> = Lazy::new(TypeConverter::new);

pub fn default_converter() -> &'static TypeConverter {
    &DEFAULT_CONVERTER
}

pub fn is_instance(value: &Value, ty: &TypeDesc) -> Result<bool> {
    DEFAULT_CONVERTER.isinstance(value, ty)
}

pub fn ensure_is_instance(value: &Value, ty: &TypeDesc) -> Result<()> {
    DEFAULT_CONVERTER.ensure_isinstance(value, ty)
}

pub fn convert(value: &Value, ty: &TypeDesc) -> Result<Value> {
    DEFAULT_CONVERTER.convert(value, ty)
}
