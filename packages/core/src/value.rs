//! The Value type - a typed, dynamically shaped value.
//!
//! Every value carries its [`Type`]. The payload lives in [`Data`], whose
//! variants mirror [`Kind`]. Pointers are shared cells: cloning a value clones
//! the handle, not the pointee, so two values can alias the same storage.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::fields::find_field;
use crate::types::{FloatWidth, IntWidth, Kind, Type};

/// Payload of a [`Value`].
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// `None` is the nil pointer.
    Ptr(Option<Pointer>),
    /// `None` is the nil sequence, distinct from an empty one.
    Seq(Option<Vec<Value>>),
    /// `None` is the nil map. Entries keep insertion order; keys are unique.
    Map(Option<Vec<(Value, Value)>>),
    /// One value per declared field, internal fields included.
    Record(Vec<Value>),
    /// `None` is an empty dynamic slot.
    Dynamic(Option<Box<Value>>),
}

/// Shared, mutable storage behind a pointer value.
#[derive(Clone)]
pub struct Pointer(Arc<RwLock<Value>>);

impl Pointer {
    pub fn new(value: Value) -> Self {
        Pointer(Arc::new(RwLock::new(value)))
    }

    /// Snapshot of the pointee.
    pub fn get(&self) -> Value {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the pointee; every alias observes the new value.
    pub fn set(&self, value: Value) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Mutate the pointee through a scratch copy, then store it back.
    ///
    /// No lock is held while `f` runs, so `f` may read other pointers,
    /// including aliases of this one.
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut scratch = self.get();
        let result = f(&mut scratch);
        self.set(scratch);
        result
    }

    /// True when both handles share the same storage.
    pub fn ptr_eq(&self, other: &Pointer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Pointer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.get() == other.get()
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&{:?}", self.get())
    }
}

/// A typed value.
#[derive(Clone, PartialEq)]
pub struct Value {
    ty: Type,
    data: Data,
}

impl Default for Value {
    /// An empty dynamic slot.
    fn default() -> Self {
        Value::nil()
    }
}

impl Value {
    // === Construction ===

    /// Pair a type with a payload. The payload must match the type's kind.
    pub fn from_parts(ty: Type, data: Data) -> Self {
        debug_assert!(
            data_matches(&ty, &data),
            "payload {:?} does not fit type {}",
            data,
            ty
        );
        Value { ty, data }
    }

    pub fn bool(v: bool) -> Self {
        Value::from_parts(Type::bool(), Data::Bool(v))
    }

    pub fn int(v: i64) -> Self {
        Value::from_parts(Type::int(), Data::Int(v))
    }

    pub fn uint(v: u64) -> Self {
        Value::from_parts(Type::uint(), Data::Uint(v))
    }

    pub fn float(v: f64) -> Self {
        Value::from_parts(Type::float64(), Data::Float(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::from_parts(Type::string(), Data::String(v.into()))
    }

    pub fn bytes(v: impl Into<Vec<u8>>) -> Self {
        Value::from_parts(Type::bytes(), Data::Bytes(v.into()))
    }

    /// A pointer to freshly allocated storage holding `pointee`.
    pub fn ptr(pointee: Value) -> Self {
        let ty = Type::ptr(&pointee.ty);
        Value::from_parts(ty, Data::Ptr(Some(Pointer::new(pointee))))
    }

    pub fn nil_ptr(elem: &Type) -> Self {
        Value::from_parts(Type::ptr(elem), Data::Ptr(None))
    }

    /// A sequence of `elem`; items that are not of `elem` are converted.
    pub fn seq(elem: &Type, items: impl IntoIterator<Item = Value>) -> Self {
        let items = items.into_iter().map(|v| v.coerce(elem)).collect();
        Value::from_parts(Type::seq(elem), Data::Seq(Some(items)))
    }

    /// A map from `key` to `value`; later duplicates replace earlier entries.
    pub fn map(key: &Type, value: &Type, entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut map = Value::from_parts(Type::map(key, value), Data::Map(Some(Vec::new())));
        for (k, v) in entries {
            map.map_insert(k.coerce(key), v.coerce(value));
        }
        map
    }

    /// A dynamic slot holding `inner`.
    pub fn dynamic(inner: Value) -> Self {
        Value::from_parts(Type::dynamic(), Data::Dynamic(Some(Box::new(inner))))
    }

    /// An empty dynamic slot.
    pub fn nil() -> Self {
        Value::from_parts(Type::dynamic(), Data::Dynamic(None))
    }

    /// Convert into `ty` when possible, otherwise keep the value as is.
    fn coerce(self, ty: &Type) -> Value {
        if self.ty == *ty {
            return self;
        }
        self.convert(ty).unwrap_or(self)
    }

    // === Inspection ===

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Data {
        &mut self.data
    }

    pub fn into_parts(self) -> (Type, Data) {
        (self.ty, self.data)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            Data::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.data {
            Data::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self.data {
            Data::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.data {
            Data::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            Data::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Pointer> {
        match &self.data {
            Data::Ptr(ptr) => ptr.as_ref(),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match &self.data {
            Data::Seq(items) => items.as_deref(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match &self.data {
            Data::Map(entries) => entries.as_deref(),
            _ => None,
        }
    }

    /// The value held by a dynamic slot.
    pub fn as_dynamic(&self) -> Option<&Value> {
        match &self.data {
            Data::Dynamic(inner) => inner.as_deref(),
            _ => None,
        }
    }

    /// Declared field values of a record.
    pub fn fields(&self) -> Option<&[Value]> {
        match &self.data {
            Data::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.data {
            Data::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// True for a nil pointer.
    pub fn is_nil_ptr(&self) -> bool {
        matches!(self.data, Data::Ptr(None))
    }

    /// True when the value equals the zero value of its type.
    ///
    /// A nil sequence or map is zero, an empty one is not. Records are zero
    /// when every field is.
    pub fn is_zero(&self) -> bool {
        match &self.data {
            Data::Bool(v) => !v,
            Data::Int(v) => *v == 0,
            Data::Uint(v) => *v == 0,
            Data::Float(v) => v.to_bits() == 0,
            Data::String(v) => v.is_empty(),
            Data::Bytes(v) => v.is_empty(),
            Data::Ptr(ptr) => ptr.is_none(),
            Data::Seq(items) => items.is_none(),
            Data::Map(entries) => entries.is_none(),
            Data::Record(fields) => fields.iter().all(Value::is_zero),
            Data::Dynamic(inner) => inner.is_none(),
        }
    }

    // === Conversion ===

    /// Convert into `to`, or `None` when the types are not convertible.
    ///
    /// Numeric conversions wrap or truncate to the target width.
    pub fn convert(&self, to: &Type) -> Option<Value> {
        if !self.ty.convertible_to(to) {
            return None;
        }
        if to.is_dynamic() {
            let data = match &self.data {
                Data::Dynamic(inner) => Data::Dynamic(inner.clone()),
                _ => Data::Dynamic(Some(Box::new(self.clone()))),
            };
            return Some(Value::from_parts(to.clone(), data));
        }
        let data = match (&self.data, to.kind()) {
            (Data::Int(v), Kind::Int(w)) => Data::Int(wrap_int(*v, *w)),
            (Data::Int(v), Kind::Uint(w)) => Data::Uint(wrap_uint(*v as u64, *w)),
            (Data::Int(v), Kind::Float(w)) => Data::Float(wrap_float(*v as f64, *w)),
            (Data::Uint(v), Kind::Int(w)) => Data::Int(wrap_int(*v as i64, *w)),
            (Data::Uint(v), Kind::Uint(w)) => Data::Uint(wrap_uint(*v, *w)),
            (Data::Uint(v), Kind::Float(w)) => Data::Float(wrap_float(*v as f64, *w)),
            (Data::Float(v), Kind::Int(w)) => Data::Int(wrap_int(*v as i64, *w)),
            (Data::Float(v), Kind::Uint(w)) => Data::Uint(wrap_uint(*v as u64, *w)),
            (Data::Float(v), Kind::Float(w)) => Data::Float(wrap_float(*v, *w)),
            (Data::String(v), Kind::Bytes) => Data::Bytes(v.clone().into_bytes()),
            (Data::Bytes(v), Kind::String) => Data::String(String::from_utf8_lossy(v).into_owned()),
            (data, _) => data.clone(),
        };
        Some(Value::from_parts(to.clone(), data))
    }

    /// Clone with fresh storage behind every pointer, recursively.
    pub fn deep_clone(&self) -> Value {
        let data = match &self.data {
            Data::Ptr(Some(ptr)) => Data::Ptr(Some(Pointer::new(ptr.get().deep_clone()))),
            Data::Seq(Some(items)) => Data::Seq(Some(items.iter().map(Value::deep_clone).collect())),
            Data::Map(Some(entries)) => Data::Map(Some(
                entries
                    .iter()
                    .map(|(k, v)| (k.deep_clone(), v.deep_clone()))
                    .collect(),
            )),
            Data::Record(fields) => Data::Record(fields.iter().map(Value::deep_clone).collect()),
            Data::Dynamic(Some(inner)) => Data::Dynamic(Some(Box::new(inner.deep_clone()))),
            data => data.clone(),
        };
        Value {
            ty: self.ty.clone(),
            data,
        }
    }

    // === Records ===

    /// Exported field by exact name, promoted fields included.
    pub fn field(&self, name: &str) -> Option<Value> {
        let field = find_field(&self.ty, name, true)?;
        self.field_at(field.path())
    }

    /// Set an exported field by exact name, converting `value` into the
    /// field's type when needed. Returns false when the field does not exist
    /// or the value does not fit.
    pub fn set_field(&mut self, name: &str, value: Value) -> bool {
        let Some(field) = find_field(&self.ty, name, true) else {
            return false;
        };
        let Some(value) = value.convert(field.ty()) else {
            return false;
        };
        self.alloc_path(field.path());
        self.with_field_at_mut(field.path(), |slot| *slot = value)
            .is_some()
    }

    /// Builder form of [`Value::set_field`]; a missing field is ignored.
    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.set_field(name, value);
        self
    }

    /// Field reached by following declared-field indexes, dereferencing
    /// embedded pointers on the way. `None` when a pointer on the path is nil.
    pub fn field_at(&self, path: &[usize]) -> Option<Value> {
        let Some((&index, rest)) = path.split_first() else {
            return Some(self.clone());
        };
        match &self.data {
            Data::Record(fields) => fields.get(index)?.field_at(rest),
            Data::Ptr(Some(ptr)) => ptr.get().field_at(path),
            _ => None,
        }
    }

    /// Run `f` on the field at `path`, writing through embedded pointers.
    pub fn with_field_at_mut<R>(&mut self, path: &[usize], f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let Some((&index, rest)) = path.split_first() else {
            return Some(f(self));
        };
        match &mut self.data {
            Data::Record(fields) => fields.get_mut(index)?.with_field_at_mut(rest, f),
            Data::Ptr(Some(ptr)) => {
                let ptr = ptr.clone();
                ptr.update(|inner| inner.with_field_at_mut(path, f))
            }
            _ => None,
        }
    }

    /// Allocate nil pointers along `path`, excluding the final field.
    pub fn alloc_path(&mut self, path: &[usize]) {
        if path.len() < 2 {
            return;
        }
        match &mut self.data {
            Data::Record(fields) => {
                if let Some(field) = fields.get_mut(path[0]) {
                    field.alloc_nil_ptr();
                    field.alloc_path(&path[1..]);
                }
            }
            Data::Ptr(Some(ptr)) => {
                let ptr = ptr.clone();
                ptr.update(|inner| inner.alloc_path(path));
            }
            _ => {}
        }
    }

    /// Point a nil pointer at a fresh zero value of its element type.
    pub fn alloc_nil_ptr(&mut self) {
        let Kind::Ptr(elem) = self.ty.kind() else {
            return;
        };
        if let Data::Ptr(slot) = &mut self.data {
            if slot.is_none() {
                *slot = Some(Pointer::new(elem.zero()));
            }
        }
    }

    // === Maps ===

    /// Insert or replace an entry, allocating a nil map.
    pub fn map_insert(&mut self, key: Value, value: Value) {
        if let Data::Map(entries) = &mut self.data {
            let entries = entries.get_or_insert_with(Vec::new);
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
    }

    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

fn wrap_int(v: i64, width: IntWidth) -> i64 {
    match width {
        IntWidth::W8 => v as i8 as i64,
        IntWidth::W16 => v as i16 as i64,
        IntWidth::W32 => v as i32 as i64,
        IntWidth::W64 => v,
    }
}

fn wrap_uint(v: u64, width: IntWidth) -> u64 {
    match width {
        IntWidth::W8 => v as u8 as u64,
        IntWidth::W16 => v as u16 as u64,
        IntWidth::W32 => v as u32 as u64,
        IntWidth::W64 => v,
    }
}

fn wrap_float(v: f64, width: FloatWidth) -> f64 {
    match width {
        FloatWidth::F32 => v as f32 as f64,
        FloatWidth::F64 => v,
    }
}

fn data_matches(ty: &Type, data: &Data) -> bool {
    matches!(
        (ty.kind(), data),
        (Kind::Bool, Data::Bool(_))
            | (Kind::Int(_), Data::Int(_))
            | (Kind::Uint(_), Data::Uint(_))
            | (Kind::Float(_), Data::Float(_))
            | (Kind::String, Data::String(_))
            | (Kind::Bytes, Data::Bytes(_))
            | (Kind::Ptr(_), Data::Ptr(_))
            | (Kind::Seq(_), Data::Seq(_))
            | (Kind::Map(_, _), Data::Map(_))
            | (Kind::Record(_), Data::Record(_))
            | (Kind::Dynamic, Data::Dynamic(_))
    )
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.data, self.ty.kind()) {
            (Data::Record(values), Kind::Record(def)) => {
                let mut out = f.debug_struct(&self.ty.name());
                for (field, value) in def.fields().iter().zip(values) {
                    out.field(field.name(), value);
                }
                out.finish()
            }
            (data, _) => write!(f, "{}({:?})", self.ty, data),
        }
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::from_parts(Type::int32(), Data::Int(v as i64))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::string(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}
