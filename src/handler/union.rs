use crate::converter::Dispatch;
use crate::error::{ConversionError, ErrorKind, Path, Result};
use crate::types::TypeDesc;
use crate::value::Value;

use super::{HandlerKind, TypeHandler};

/// `Union[...]`: first matching branch wins, no overlap resolution.
#[derive(Debug, Default)]
pub struct UnionHandler;

impl TypeHandler for UnionHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Union
    }

    fn isinstance(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<bool> {
        for branch in ty.branches() {
            if cx.isinstance_at(value, branch, path)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn convert(&self, cx: &dyn Dispatch, value: &Value, ty: &TypeDesc, path: &Path) -> Result<Value> {
        let branches = ty.branches();
        for branch in branches {
            if cx.isinstance_at(value, branch, path)? {
                return cx.convert_at(value, branch, path);
            }
        }

        let tried = branches.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
        tracing::debug!(%value, union = %ty, %path, "no union branch matched");
        Err(ConversionError::new(
            ErrorKind::NoUnionMatch,
            format!("Expected instance of {ty}, got {value}; tried {tried}"),
        )
        .with_value(value.clone())
        .with_type(ty.clone())
        .at(path.clone()))
    }
}
