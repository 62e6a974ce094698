//! Record types: ordered fields plus an optional method table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::types::{Kind, Scanner, Type, TypeDef, Valuer};
use crate::value::Value;

/// Zero-argument method returning a single value.
pub type GetterFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Single-argument method mutating its receiver.
pub type SetterFn = Arc<dyn Fn(&mut Value, Value) + Send + Sync>;

/// A field declared on a record.
#[derive(Clone)]
pub struct Field {
    name: String,
    ty: Type,
    tag: Option<String>,
    default: Option<String>,
    embedded: bool,
}

impl Field {
    /// A named field. It is exported when `name` starts with an upper-case letter.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field {
            name: name.into(),
            ty,
            tag: None,
            default: None,
            embedded: false,
        }
    }

    /// An anonymous field whose own fields are promoted into the enclosing record.
    ///
    /// The field takes the name of the embedded type (pointers stripped).
    pub fn embedded(ty: Type) -> Self {
        Field {
            name: ty.deref().name(),
            ty,
            tag: None,
            default: None,
            embedded: true,
        }
    }

    /// Attach a copy annotation, e.g. `"must,nopanic"`, `"-"` or `"FullName"`.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attach a default-value annotation.
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn copy_tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn default_annotation(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("tag", &self.tag)
            .field("embedded", &self.embedded)
            .finish()
    }
}

/// A zero-argument, single-return method.
#[derive(Clone)]
pub struct Getter {
    name: String,
    returns: Type,
    call: GetterFn,
}

impl Getter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn returns(&self) -> &Type {
        &self.returns
    }

    pub fn call(&self, receiver: &Value) -> Value {
        (self.call)(receiver)
    }
}

/// A single-argument method.
#[derive(Clone)]
pub struct Setter {
    name: String,
    param: Type,
    call: SetterFn,
}

impl Setter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param(&self) -> &Type {
        &self.param
    }

    pub fn call(&self, receiver: &mut Value, arg: Value) {
        (self.call)(receiver, arg)
    }
}

/// The layout and method table of a record type.
#[derive(Clone)]
pub struct RecordDef {
    fields: Vec<Field>,
    getters: Vec<Getter>,
    setters: Vec<Setter>,
    getter_index: HashMap<String, usize>,
    setter_index: HashMap<String, usize>,
}

impl RecordDef {
    /// Declared fields in declaration order, internal ones included.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Position of a declared (not promoted) field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn getter(&self, name: &str) -> Option<&Getter> {
        self.getter_index.get(name).map(|&i| &self.getters[i])
    }

    pub fn setter(&self, name: &str) -> Option<&Setter> {
        self.setter_index.get(name).map(|&i| &self.setters[i])
    }

    pub(crate) fn same_layout(&self, other: &RecordDef) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| {
                a.name == b.name && a.embedded == b.embedded && a.ty == b.ty
            })
    }
}

/// Builder returned by [`Type::record`].
///
/// ```rust
/// use recopy_core::{Field, Type};
///
/// let address = Type::record("Address")
///     .field(Field::new("City", Type::string()))
///     .field(Field::new("ZipCode", Type::string()))
///     .build();
/// assert_eq!(address.record_def().unwrap().fields().len(), 2);
/// ```
pub struct RecordBuilder {
    name: String,
    fields: Vec<Field>,
    getters: Vec<Getter>,
    setters: Vec<Setter>,
    scanner: Option<Scanner>,
    valuer: Option<Valuer>,
}

impl RecordBuilder {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        RecordBuilder {
            name: name.into(),
            fields: Vec::new(),
            getters: Vec::new(),
            setters: Vec::new(),
            scanner: None,
            valuer: None,
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Shorthand for `field(Field::embedded(ty))`.
    pub fn embed(self, ty: Type) -> Self {
        self.field(Field::embedded(ty))
    }

    pub fn getter<F>(mut self, name: impl Into<String>, returns: Type, call: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.getters.push(Getter {
            name: name.into(),
            returns,
            call: Arc::new(call),
        });
        self
    }

    pub fn setter<F>(mut self, name: impl Into<String>, param: Type, call: F) -> Self
    where
        F: Fn(&mut Value, Value) + Send + Sync + 'static,
    {
        self.setters.push(Setter {
            name: name.into(),
            param,
            call: Arc::new(call),
        });
        self
    }

    pub fn scanner<F>(mut self, scan: F) -> Self
    where
        F: Fn(&mut Value, &Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.scanner = Some(Arc::new(scan));
        self
    }

    pub fn valuer<F>(mut self, value: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<Value>, BoxError> + Send + Sync + 'static,
    {
        self.valuer = Some(Arc::new(value));
        self
    }

    pub fn build(self) -> Type {
        let getter_index = self
            .getters
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.clone(), i))
            .collect();
        let setter_index = self
            .setters
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        Type::from_def(TypeDef {
            id: Type::fresh_id(),
            name: Some(self.name),
            kind: Kind::Record(RecordDef {
                fields: self.fields,
                getters: self.getters,
                setters: self.setters,
                getter_index,
                setter_index,
            }),
            scanner: self.scanner,
            valuer: self.valuer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_follows_capitalisation() {
        assert!(Field::new("Name", Type::string()).is_exported());
        assert!(!Field::new("secret", Type::string()).is_exported());
        assert!(!Field::new("", Type::string()).is_exported());
    }

    #[test]
    fn embedded_field_takes_type_name() {
        let base = Type::record("Base").build();
        let field = Field::embedded(Type::ptr(&base));
        assert_eq!(field.name(), "Base");
        assert!(field.is_embedded());
    }

    #[test]
    fn method_table_lookup() {
        let ty = Type::record("Counter")
            .field(Field::new("Count", Type::int()))
            .getter("Double", Type::int(), |v| {
                let count = v.field("Count").and_then(|c| c.as_int()).unwrap_or(0);
                Value::int(count * 2)
            })
            .setter("Reset", Type::int(), |v, arg| {
                v.set_field("Count", arg);
            })
            .build();
        let def = ty.record_def().unwrap();

        let mut counter = ty.zero().with_field("Count", Value::int(21));
        assert_eq!(def.getter("Double").unwrap().call(&counter), Value::int(42));
        assert!(def.getter("Missing").is_none());

        def.setter("Reset").unwrap().call(&mut counter, Value::int(0));
        assert_eq!(counter.field("Count"), Some(Value::int(0)));
    }

    #[test]
    fn layouts_compare_by_name_and_type() {
        let a = Type::record("A").field(Field::new("X", Type::int())).build();
        let b = Type::record("B").field(Field::new("X", Type::int())).build();
        let c = Type::record("C").field(Field::new("Y", Type::int())).build();
        assert!(a.record_def().unwrap().same_layout(b.record_def().unwrap()));
        assert!(!a.record_def().unwrap().same_layout(c.record_def().unwrap()));
        assert!(a.convertible_to(&b));
        assert!(!a.convertible_to(&c));
    }
}
