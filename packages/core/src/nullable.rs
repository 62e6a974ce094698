//! Nullable wrapper records with scan/value hooks.

use crate::record::Field;
use crate::types::Type;
use crate::value::{Data, Value};

const VALUE: usize = 0;
const VALID: usize = 1;

/// A record `{ Value: inner, Valid: bool }` that the copy engine fills and
/// reads through its hooks instead of field by field.
///
/// Scanning a plain value converts it into `inner` and marks the wrapper
/// valid; scanning an empty dynamic slot clears it. The valuer yields the
/// wrapped value, or nothing when the wrapper is not valid.
///
/// ```rust
/// use recopy_core::{nullable, Type, Value};
///
/// let null_string = nullable("NullString", Type::string());
/// let mut v = null_string.zero();
/// let scan = null_string.scanner().unwrap();
/// scan(&mut v, &Value::string("x")).unwrap();
/// assert_eq!(v.field("Valid"), Some(Value::bool(true)));
/// ```
pub fn nullable(name: &str, inner: Type) -> Type {
    let scan_into = inner.clone();
    Type::record(name)
        .field(Field::new("Value", inner))
        .field(Field::new("Valid", Type::bool()))
        .scanner(move |this, src| {
            let src = match src.data() {
                Data::Dynamic(None) => None,
                Data::Dynamic(Some(held)) => Some(held.as_ref()),
                _ => Some(src),
            };
            let Some(fields) = this.fields_mut() else {
                return Err("nullable receiver is not a record".into());
            };
            match src {
                None => {
                    fields[VALUE] = scan_into.zero();
                    fields[VALID] = Value::bool(false);
                }
                Some(src) => {
                    let converted = src.convert(&scan_into).ok_or_else(|| {
                        format!("cannot scan {} into {}", src.ty(), scan_into)
                    })?;
                    fields[VALUE] = converted;
                    fields[VALID] = Value::bool(true);
                }
            }
            Ok(())
        })
        .valuer(|this| {
            let fields = this.fields().ok_or("nullable receiver is not a record")?;
            if fields[VALID].as_bool() == Some(true) {
                Ok(Some(fields[VALUE].clone()))
            } else {
                Ok(None)
            }
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_sets_value_and_valid() {
        let ty = nullable("NullInt", Type::int());
        let mut v = ty.zero();
        let scan = ty.scanner().unwrap();

        scan(&mut v, &Value::from(7i32)).unwrap();
        assert_eq!(v.field("Value"), Some(Value::int(7)));
        assert_eq!(v.field("Valid"), Some(Value::bool(true)));

        scan(&mut v, &Value::nil()).unwrap();
        assert_eq!(v.field("Valid"), Some(Value::bool(false)));
    }

    #[test]
    fn scan_rejects_unconvertible() {
        let ty = nullable("NullInt", Type::int());
        let mut v = ty.zero();
        assert!((ty.scanner().unwrap())(&mut v, &Value::string("x")).is_err());
    }

    #[test]
    fn valuer_reports_absence() {
        let ty = nullable("NullString", Type::string());
        let valuer = ty.valuer().unwrap();

        assert_eq!(valuer(&ty.zero()).unwrap(), None);

        let set = ty
            .zero()
            .with_field("Value", "hello".into())
            .with_field("Valid", true.into());
        assert_eq!(valuer(&set).unwrap(), Some(Value::string("hello")));
    }
}
