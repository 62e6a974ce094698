//! Timestamp types and the converters between them.
//!
//! `Time` is an instant as a named int64 of nanoseconds since the Unix epoch.
//! `Timestamp` is the split `{Seconds, Nanos}` record used by wire schemas.

use lazy_static::lazy_static;
use recopy_core::{BoxError, Field, Type, Value};

use crate::option::{CopyOption, TypeConverter};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

lazy_static! {
    static ref TIME: Type = Type::named("Time", &Type::int());
    static ref TIMESTAMP: Type = Type::record("Timestamp")
        .field(Field::new("Seconds", Type::int()))
        .field(Field::new("Nanos", Type::int32()))
        .build();
}

pub fn time_type() -> Type {
    TIME.clone()
}

pub fn timestamp_type() -> Type {
    TIMESTAMP.clone()
}

/// A `Time` value.
pub fn time(unix_nanos: i64) -> Value {
    Value::int(unix_nanos)
        .convert(&TIME)
        .unwrap_or_else(|| TIME.zero())
}

/// A `Timestamp` value.
pub fn timestamp(seconds: i64, nanos: i32) -> Value {
    TIMESTAMP
        .zero()
        .with_field("Seconds", Value::int(seconds))
        .with_field("Nanos", Value::from(nanos))
}

/// `Time` to `Timestamp`.
pub fn time_to_timestamp() -> TypeConverter {
    TypeConverter::new(time_type(), timestamp_type(), |src| {
        let nanos = src.as_int().ok_or("time is not an integer")?;
        Ok(timestamp(
            nanos.div_euclid(NANOS_PER_SECOND),
            nanos.rem_euclid(NANOS_PER_SECOND) as i32,
        ))
    })
}

/// `Timestamp` to `Time`.
pub fn timestamp_to_time() -> TypeConverter {
    TypeConverter::new(timestamp_type(), time_type(), |src| {
        let seconds = int_field(src, "Seconds")?;
        let nanos = int_field(src, "Nanos")?;
        if !(0..NANOS_PER_SECOND).contains(&nanos) {
            return Err(format!("nanos {} out of range", nanos).into());
        }
        let unix_nanos = seconds
            .checked_mul(NANOS_PER_SECOND)
            .and_then(|s| s.checked_add(nanos))
            .ok_or("timestamp out of range")?;
        Ok(time(unix_nanos))
    })
}

fn int_field(value: &Value, name: &str) -> Result<i64, BoxError> {
    value
        .field(name)
        .and_then(|v| v.as_int())
        .ok_or_else(|| format!("timestamp has no {} field", name).into())
}

/// Both timestamp converters.
pub fn default_converters() -> Vec<TypeConverter> {
    vec![time_to_timestamp(), timestamp_to_time()]
}

/// An option with the timestamp converters ahead of the caller's own.
///
/// Every other setting of `option` is kept. A caller converter for the same
/// type pair shadows the built-in one.
pub fn with_well_known_converters(option: Option<CopyOption>) -> CopyOption {
    let mut option = option.unwrap_or_default();
    let mut converters = default_converters();
    converters.append(&mut option.converters);
    option.converters = converters;
    option
}
