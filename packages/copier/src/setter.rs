//! Assigning one value into a destination slot.

use recopy_core::{Data, Error, Kind, Result, Type, Value};

use crate::engine::Session;

impl Session<'_> {
    /// Store `from` into `to`.
    ///
    /// Returns `Ok(false)` when no direct strategy applies and the caller
    /// should fall back to a nested copy. Only converter failures are errors.
    pub(crate) fn set(&self, to: &mut Value, from: &Value) -> Result<bool> {
        if self.apply_converter(to, from)? {
            return Ok(true);
        }

        if to.ty().is_ptr() {
            if from.is_nil_ptr() {
                *to = to.ty().zero();
                return Ok(true);
            }
            if to.is_nil_ptr() {
                if let Some(valuer) = from.ty().valuer() {
                    // an invalid or absent source leaves the pointer nil
                    if !matches!(valuer(from), Ok(Some(_))) {
                        return Ok(true);
                    }
                }
                to.alloc_nil_ptr();
            }
            let Some(pointee) = to.as_pointer().cloned() else {
                return Ok(false);
            };
            return pointee.update(|inner| self.set_into(inner, from));
        }

        self.set_into(to, from)
    }

    fn set_into(&self, to: &mut Value, from: &Value) -> Result<bool> {
        if self.option.deep_copy {
            let mut aggregate = is_aggregate(to.ty());
            if matches!(to.data(), Data::Dynamic(None)) {
                if let Some(concrete) = concrete(from) {
                    aggregate = is_aggregate(concrete.ty());
                    let held = concrete.ty().zero();
                    *to = Value::from_parts(to.ty().clone(), Data::Dynamic(Some(Box::new(held))));
                }
            }
            if from.is_nil_ptr() {
                return Ok(true);
            }
            if aggregate && to.ty().scanner().is_none() {
                return Ok(false);
            }
        }

        if from.ty().convertible_to(to.ty()) {
            if let Some(converted) = from.convert(to.ty()) {
                *to = converted;
                return Ok(true);
            }
        }

        if let Some(scan) = to.ty().scanner().cloned() {
            let mut src = from.clone();
            while let Data::Ptr(ptr) = src.data() {
                let Some(ptr) = ptr else {
                    return Ok(true);
                };
                src = ptr.get();
            }
            if let Err(err) = scan(to, &src) {
                tracing::debug!(ty = %to.ty(), error = %err, "scanner rejected value");
                return Ok(false);
            }
            return Ok(true);
        }

        if let Some(valuer) = from.ty().valuer() {
            return match valuer(from) {
                Err(err) => {
                    tracing::debug!(ty = %from.ty(), error = %err, "valuer failed");
                    Ok(false)
                }
                Ok(None) => Ok(true),
                Ok(Some(value)) => {
                    if let Some(converted) = value.convert(to.ty()) {
                        *to = converted;
                    }
                    Ok(true)
                }
            };
        }

        match from.data() {
            Data::Ptr(Some(ptr)) => self.set(to, &ptr.get()),
            Data::Ptr(None) => Ok(true),
            _ => Ok(false),
        }
    }

    /// Run the converter registered for `(from type, to type)`, if any.
    pub(crate) fn apply_converter(&self, to: &mut Value, from: &Value) -> Result<bool> {
        let Some(converter) = self.converter(from.ty(), to.ty()) else {
            return Ok(false);
        };
        tracing::trace!(from = %from.ty(), to = %to.ty(), "converter hit");

        let to_ty = to.ty().clone();
        let failed = |source| Error::Converter {
            from: from.ty().to_string(),
            to: to_ty.to_string(),
            source,
        };
        let result = converter.call(from).map_err(failed)?;

        if matches!(result.data(), Data::Dynamic(None)) {
            *to = to_ty.zero();
            return Ok(true);
        }
        match result.convert(&to_ty) {
            Some(converted) => *to = converted,
            None => return Err(failed(format!("converter produced {}", result.ty()).into())),
        }
        Ok(true)
    }
}

fn is_aggregate(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Record(_) | Kind::Map(_, _) | Kind::Seq(_))
}

/// The value held by a dynamic slot, or the value itself.
fn concrete(value: &Value) -> Option<&Value> {
    match value.data() {
        Data::Dynamic(held) => held.as_deref(),
        _ => Some(value),
    }
}
