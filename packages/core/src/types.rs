//! Type descriptors.
//!
//! A [`Type`] is the runtime witness every [`Value`] carries. Named types
//! (built-in scalars, records, [`Type::named`] aliases) have an identity of
//! their own; unnamed composites (pointers, sequences, maps) are identical
//! when their element types are.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::error::BoxError;
use crate::record::{RecordBuilder, RecordDef};
use crate::value::{Data, Value};

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Custom scan hook: fill the receiver from an arbitrary source value.
pub type Scanner = Arc<dyn Fn(&mut Value, &Value) -> Result<(), BoxError> + Send + Sync>;

/// Custom value hook: produce a plain value, or `None` for "no value".
pub type Valuer = Arc<dyn Fn(&Value) -> Result<Option<Value>, BoxError> + Send + Sync>;

/// Width of an integer kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

/// Width of a floating point kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

/// The underlying shape of a type.
#[derive(Clone)]
pub enum Kind {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float(FloatWidth),
    String,
    Bytes,
    /// Indirection to a shared, mutable value.
    Ptr(Type),
    /// Ordered sequence.
    Seq(Type),
    /// Key-value mapping.
    Map(Type, Type),
    /// Record with named fields.
    Record(RecordDef),
    /// Holds a value of any concrete type.
    Dynamic,
}

impl Kind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Kind::Int(_) | Kind::Uint(_) | Kind::Float(_))
    }

    /// Short name of the kind, used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int(_) => "int",
            Kind::Uint(_) => "uint",
            Kind::Float(_) => "float",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Ptr(_) => "ptr",
            Kind::Seq(_) => "seq",
            Kind::Map(_, _) => "map",
            Kind::Record(_) => "record",
            Kind::Dynamic => "dynamic",
        }
    }
}

pub(crate) struct TypeDef {
    pub(crate) id: u64,
    pub(crate) name: Option<String>,
    pub(crate) kind: Kind,
    pub(crate) scanner: Option<Scanner>,
    pub(crate) valuer: Option<Valuer>,
}

/// A runtime type descriptor. Cheap to clone.
#[derive(Clone)]
pub struct Type(Arc<TypeDef>);

struct Builtins {
    bool: Type,
    int8: Type,
    int16: Type,
    int32: Type,
    int64: Type,
    uint8: Type,
    uint16: Type,
    uint32: Type,
    uint64: Type,
    float32: Type,
    float64: Type,
    string: Type,
    bytes: Type,
    dynamic: Type,
}

lazy_static! {
    static ref BUILTINS: Builtins = Builtins {
        bool: Type::builtin("bool", Kind::Bool),
        int8: Type::builtin("int8", Kind::Int(IntWidth::W8)),
        int16: Type::builtin("int16", Kind::Int(IntWidth::W16)),
        int32: Type::builtin("int32", Kind::Int(IntWidth::W32)),
        int64: Type::builtin("int", Kind::Int(IntWidth::W64)),
        uint8: Type::builtin("uint8", Kind::Uint(IntWidth::W8)),
        uint16: Type::builtin("uint16", Kind::Uint(IntWidth::W16)),
        uint32: Type::builtin("uint32", Kind::Uint(IntWidth::W32)),
        uint64: Type::builtin("uint", Kind::Uint(IntWidth::W64)),
        float32: Type::builtin("float32", Kind::Float(FloatWidth::F32)),
        float64: Type::builtin("float64", Kind::Float(FloatWidth::F64)),
        string: Type::builtin("string", Kind::String),
        bytes: Type::builtin("bytes", Kind::Bytes),
        dynamic: Type::builtin("any", Kind::Dynamic),
    };
}

impl Type {
    fn builtin(name: &str, kind: Kind) -> Type {
        Type::from_def(TypeDef {
            id: next_id(),
            name: Some(name.to_string()),
            kind,
            scanner: None,
            valuer: None,
        })
    }

    fn unnamed(kind: Kind) -> Type {
        Type::from_def(TypeDef {
            id: next_id(),
            name: None,
            kind,
            scanner: None,
            valuer: None,
        })
    }

    pub(crate) fn from_def(def: TypeDef) -> Type {
        Type(Arc::new(def))
    }

    pub(crate) fn fresh_id() -> u64 {
        next_id()
    }

    // === Built-in scalars ===

    pub fn bool() -> Type {
        BUILTINS.bool.clone()
    }

    pub fn int8() -> Type {
        BUILTINS.int8.clone()
    }

    pub fn int16() -> Type {
        BUILTINS.int16.clone()
    }

    pub fn int32() -> Type {
        BUILTINS.int32.clone()
    }

    /// The default signed integer (64-bit).
    pub fn int() -> Type {
        BUILTINS.int64.clone()
    }

    pub fn uint8() -> Type {
        BUILTINS.uint8.clone()
    }

    pub fn uint16() -> Type {
        BUILTINS.uint16.clone()
    }

    pub fn uint32() -> Type {
        BUILTINS.uint32.clone()
    }

    /// The default unsigned integer (64-bit).
    pub fn uint() -> Type {
        BUILTINS.uint64.clone()
    }

    pub fn float32() -> Type {
        BUILTINS.float32.clone()
    }

    pub fn float64() -> Type {
        BUILTINS.float64.clone()
    }

    pub fn string() -> Type {
        BUILTINS.string.clone()
    }

    pub fn bytes() -> Type {
        BUILTINS.bytes.clone()
    }

    /// The dynamic type: a slot that can hold a value of any type.
    pub fn dynamic() -> Type {
        BUILTINS.dynamic.clone()
    }

    // === Composites ===

    /// A distinct named type sharing `base`'s underlying shape.
    ///
    /// Values convert freely between a named type and its base, but the two
    /// are not identical: converters and field-name mappings keyed on one do
    /// not match the other.
    pub fn named(name: impl Into<String>, base: &Type) -> Type {
        Type::from_def(TypeDef {
            id: next_id(),
            name: Some(name.into()),
            kind: base.kind().clone(),
            scanner: base.0.scanner.clone(),
            valuer: base.0.valuer.clone(),
        })
    }

    pub fn ptr(elem: &Type) -> Type {
        Type::unnamed(Kind::Ptr(elem.clone()))
    }

    pub fn seq(elem: &Type) -> Type {
        Type::unnamed(Kind::Seq(elem.clone()))
    }

    pub fn map(key: &Type, value: &Type) -> Type {
        Type::unnamed(Kind::Map(key.clone(), value.clone()))
    }

    /// Start building a record type.
    pub fn record(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder::new(name)
    }

    // === Inspection ===

    pub fn kind(&self) -> &Kind {
        &self.0.kind
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn is_named(&self) -> bool {
        self.0.name.is_some()
    }

    /// Display name, e.g. `User`, `*User`, `[]int`, `map[string]int`.
    pub fn name(&self) -> String {
        if let Some(name) = &self.0.name {
            return name.clone();
        }
        match self.kind() {
            Kind::Ptr(elem) => format!("*{}", elem.name()),
            Kind::Seq(elem) => format!("[]{}", elem.name()),
            Kind::Map(key, value) => format!("map[{}]{}", key.name(), value.name()),
            kind => kind.label().to_string(),
        }
    }

    pub fn record_def(&self) -> Option<&RecordDef> {
        match self.kind() {
            Kind::Record(def) => Some(def),
            _ => None,
        }
    }

    /// Element type of a pointer, sequence or map.
    pub fn elem(&self) -> Option<&Type> {
        match self.kind() {
            Kind::Ptr(elem) | Kind::Seq(elem) | Kind::Map(_, elem) => Some(elem),
            _ => None,
        }
    }

    /// Key type of a map.
    pub fn key(&self) -> Option<&Type> {
        match self.kind() {
            Kind::Map(key, _) => Some(key),
            _ => None,
        }
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self.kind(), Kind::Ptr(_))
    }

    pub fn is_seq(&self) -> bool {
        matches!(self.kind(), Kind::Seq(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind(), Kind::Map(_, _))
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind(), Kind::Record(_))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind(), Kind::Dynamic)
    }

    /// Strip every pointer and sequence layer: `[]*User` becomes `User`.
    pub fn indirect(&self) -> Type {
        let mut ty = self.clone();
        while let Kind::Ptr(elem) | Kind::Seq(elem) = ty.kind() {
            let elem = elem.clone();
            ty = elem;
        }
        ty
    }

    /// Strip pointer layers only.
    pub fn deref(&self) -> Type {
        let mut ty = self.clone();
        while let Kind::Ptr(elem) = ty.kind() {
            let elem = elem.clone();
            ty = elem;
        }
        ty
    }

    pub fn scanner(&self) -> Option<&Scanner> {
        self.0.scanner.as_ref()
    }

    pub fn valuer(&self) -> Option<&Valuer> {
        self.0.valuer.as_ref()
    }

    // === Relations ===

    /// A value of this type can be stored into `to` unchanged.
    pub fn assignable_to(&self, to: &Type) -> bool {
        self == to || to.is_dynamic()
    }

    /// A value of this type can be converted into `to` with [`Value::convert`].
    pub fn convertible_to(&self, to: &Type) -> bool {
        if self.assignable_to(to) || identical_underlying(self, to) {
            return true;
        }
        match (self.kind(), to.kind()) {
            (from, into) if from.is_numeric() && into.is_numeric() => true,
            (Kind::String, Kind::Bytes) | (Kind::Bytes, Kind::String) => true,
            (Kind::Ptr(from), Kind::Ptr(into)) => {
                !self.is_named() && !to.is_named() && identical_underlying(from, into)
            }
            _ => false,
        }
    }

    /// The zero value of this type.
    pub fn zero(&self) -> Value {
        let data = match self.kind() {
            Kind::Bool => Data::Bool(false),
            Kind::Int(_) => Data::Int(0),
            Kind::Uint(_) => Data::Uint(0),
            Kind::Float(_) => Data::Float(0.0),
            Kind::String => Data::String(String::new()),
            Kind::Bytes => Data::Bytes(Vec::new()),
            Kind::Ptr(_) => Data::Ptr(None),
            Kind::Seq(_) => Data::Seq(None),
            Kind::Map(_, _) => Data::Map(None),
            Kind::Record(def) => Data::Record(def.fields().iter().map(|f| f.ty().zero()).collect()),
            Kind::Dynamic => Data::Dynamic(None),
        };
        Value::from_parts(self.clone(), data)
    }
}

fn identical_underlying(a: &Type, b: &Type) -> bool {
    match (a.kind(), b.kind()) {
        (Kind::Bool, Kind::Bool)
        | (Kind::String, Kind::String)
        | (Kind::Bytes, Kind::Bytes)
        | (Kind::Dynamic, Kind::Dynamic) => true,
        (Kind::Int(x), Kind::Int(y)) | (Kind::Uint(x), Kind::Uint(y)) => x == y,
        (Kind::Float(x), Kind::Float(y)) => x == y,
        (Kind::Ptr(x), Kind::Ptr(y)) | (Kind::Seq(x), Kind::Seq(y)) => x == y,
        (Kind::Map(k1, v1), Kind::Map(k2, v2)) => k1 == k2 && v1 == v2,
        (Kind::Record(r1), Kind::Record(r2)) => r1.same_layout(r2),
        _ => false,
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) || self.0.id == other.0.id {
            return true;
        }
        if self.is_named() || other.is_named() {
            return false;
        }
        match (self.kind(), other.kind()) {
            (Kind::Ptr(a), Kind::Ptr(b)) | (Kind::Seq(a), Kind::Seq(b)) => a == b,
            (Kind::Map(k1, v1), Kind::Map(k2, v2)) => k1 == k2 && v1 == v2,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_named() {
            0u8.hash(state);
            self.0.id.hash(state);
            return;
        }
        match self.kind() {
            Kind::Ptr(elem) => {
                1u8.hash(state);
                elem.hash(state);
            }
            Kind::Seq(elem) => {
                2u8.hash(state);
                elem.hash(state);
            }
            Kind::Map(key, value) => {
                3u8.hash(state);
                key.hash(state);
                value.hash(state);
            }
            _ => {
                0u8.hash(state);
                self.0.id.hash(state);
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.name())
    }
}
