//! Conversions between Value and serde types.
//!
//! Rendering follows the value's own type. Decoding needs a target [`Type`]
//! because JSON carries no record or width information.

use base64::Engine;
use recopy_core::{names_match, Data, Error, IntWidth, Kind, Pointer, Result, Type, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Convert a Value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    // Render as serde_json::Value first, then deserialize
    let json = value_to_json(&value);
    serde_json::from_value(json).map_err(|e| Error::decode(e.to_string()))
}

/// Convert a Rust type to a Value of type `ty` via serde.
pub fn to_value<T: Serialize>(ty: &Type, data: &T) -> Result<Value> {
    let json = serde_json::to_value(data).map_err(|e| Error::encode(e.to_string()))?;
    from_json(ty, json)
}

/// Render a Value as serde_json::Value.
///
/// Records become objects keyed by exported field name, with embedded
/// records inlined. Nil pointers, sequences, maps and empty dynamic slots
/// become `null`.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value.data() {
        Data::Bool(b) => serde_json::Value::Bool(*b),
        Data::Int(i) => serde_json::Value::Number((*i).into()),
        Data::Uint(u) => serde_json::Value::Number((*u).into()),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Data::String(s) => serde_json::Value::String(s.clone()),
        Data::Bytes(b) => {
            // JSON doesn't have bytes, so we base64 encode
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            serde_json::Value::String(encoded)
        }
        Data::Ptr(Some(ptr)) => value_to_json(&ptr.get()),
        Data::Seq(Some(items)) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Data::Map(Some(entries)) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (key_to_string(k), value_to_json(v)))
                .collect(),
        ),
        Data::Record(fields) => {
            let mut object = serde_json::Map::new();
            record_to_json(value.ty(), fields, &mut object);
            serde_json::Value::Object(object)
        }
        Data::Dynamic(Some(inner)) => value_to_json(inner),
        Data::Ptr(None) | Data::Seq(None) | Data::Map(None) | Data::Dynamic(None) => {
            serde_json::Value::Null
        }
    }
}

fn record_to_json(ty: &Type, fields: &[Value], object: &mut serde_json::Map<String, serde_json::Value>) {
    let Some(def) = ty.record_def() else {
        return;
    };
    for (field, value) in def.fields().iter().zip(fields) {
        if !field.is_exported() {
            continue;
        }
        if field.is_embedded() {
            let embedded = match value.data() {
                Data::Ptr(Some(ptr)) => ptr.get(),
                Data::Ptr(None) => continue,
                _ => value.clone(),
            };
            if let Some(inner) = embedded.fields() {
                record_to_json(embedded.ty(), inner, object);
            }
            continue;
        }
        object.insert(field.name().to_string(), value_to_json(value));
    }
}

fn key_to_string(key: &Value) -> String {
    match value_to_json(key) {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Decode `json` into a value of type `ty`.
///
/// `null` decodes to the zero value. Object keys match record fields exactly
/// first, then case-insensitively; unknown keys are ignored and missing
/// fields stay zero.
pub fn from_json(ty: &Type, json: serde_json::Value) -> Result<Value> {
    if json.is_null() {
        return Ok(ty.zero());
    }
    let data = match (ty.kind(), json) {
        (Kind::Bool, serde_json::Value::Bool(b)) => Data::Bool(b),
        (Kind::Int(width), serde_json::Value::Number(n)) => {
            let i = n
                .as_i64()
                .filter(|i| int_fits(*i, *width))
                .ok_or_else(|| mismatch(ty, &n))?;
            Data::Int(i)
        }
        (Kind::Uint(width), serde_json::Value::Number(n)) => {
            let u = n
                .as_u64()
                .filter(|u| width.bits() == 64 || *u < 1u64 << width.bits())
                .ok_or_else(|| mismatch(ty, &n))?;
            Data::Uint(u)
        }
        (Kind::Float(_), serde_json::Value::Number(n)) => {
            Data::Float(n.as_f64().ok_or_else(|| mismatch(ty, &n))?)
        }
        (Kind::String, serde_json::Value::String(s)) => Data::String(s),
        (Kind::Bytes, serde_json::Value::String(s)) => Data::Bytes(
            base64::engine::general_purpose::STANDARD
                .decode(&s)
                .map_err(|e| Error::decode(format!("{}: {}", ty, e)))?,
        ),
        (Kind::Ptr(elem), json) => Data::Ptr(Some(Pointer::new(from_json(elem, json)?))),
        (Kind::Seq(elem), serde_json::Value::Array(items)) => Data::Seq(Some(
            items
                .into_iter()
                .map(|item| from_json(elem, item))
                .collect::<Result<_>>()?,
        )),
        (Kind::Map(key, elem), serde_json::Value::Object(object)) => {
            let mut map = Value::from_parts(ty.clone(), Data::Map(Some(Vec::new())));
            for (k, v) in object {
                map.map_insert(key_from_string(key, k)?, from_json(elem, v)?);
            }
            return Ok(map);
        }
        (Kind::Record(_), serde_json::Value::Object(object)) => {
            return record_from_json(ty, &object);
        }
        (Kind::Dynamic, json) => Data::Dynamic(Some(Box::new(untyped(json)))),
        (_, json) => return Err(mismatch(ty, &json)),
    };
    Ok(Value::from_parts(ty.clone(), data))
}

fn record_from_json(ty: &Type, object: &serde_json::Map<String, serde_json::Value>) -> Result<Value> {
    let mut record = ty.zero();
    let Some(def) = ty.record_def() else {
        return Ok(record);
    };
    let Some(slots) = record.fields_mut() else {
        return Ok(ty.zero());
    };
    for (slot, field) in slots.iter_mut().zip(def.fields()) {
        if !field.is_exported() {
            continue;
        }
        if field.is_embedded() {
            let inner = record_from_json(&field.ty().deref(), object)?;
            *slot = if field.ty().is_ptr() {
                Value::from_parts(field.ty().clone(), Data::Ptr(Some(Pointer::new(inner))))
            } else {
                inner
            };
            continue;
        }
        let found = object.get(field.name()).or_else(|| {
            object
                .iter()
                .find(|(k, _)| names_match(k, field.name(), false))
                .map(|(_, v)| v)
        });
        if let Some(json) = found {
            *slot = from_json(field.ty(), json.clone())?;
        }
    }
    Ok(record)
}

fn key_from_string(ty: &Type, key: String) -> Result<Value> {
    match ty.kind() {
        Kind::String => Ok(Value::string(key).convert(ty).unwrap_or_else(|| ty.zero())),
        Kind::Int(_) | Kind::Uint(_) | Kind::Float(_) | Kind::Bool => {
            let json: serde_json::Value = serde_json::from_str(&key)
                .map_err(|_| Error::decode(format!("map key {:?} is not a {}", key, ty)))?;
            from_json(ty, json)
        }
        _ => Err(Error::decode(format!("unsupported map key type {}", ty))),
    }
}

/// Decode JSON with no target type.
fn untyped(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::nil(),
        serde_json::Value::Bool(b) => Value::bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::int(i)
            } else if let Some(u) = n.as_u64() {
                Value::uint(u)
            } else {
                Value::float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => {
            Value::seq(&Type::dynamic(), items.into_iter().map(untyped))
        }
        serde_json::Value::Object(object) => Value::map(
            &Type::string(),
            &Type::dynamic(),
            object.into_iter().map(|(k, v)| (Value::string(k), untyped(v))),
        ),
    }
}

fn int_fits(i: i64, width: IntWidth) -> bool {
    match width {
        IntWidth::W8 => i8::try_from(i).is_ok(),
        IntWidth::W16 => i16::try_from(i).is_ok(),
        IntWidth::W32 => i32::try_from(i).is_ok(),
        IntWidth::W64 => true,
    }
}

fn mismatch(ty: &Type, json: &impl std::fmt::Display) -> Error {
    Error::decode(format!("cannot decode {} into {}", json, ty))
}
