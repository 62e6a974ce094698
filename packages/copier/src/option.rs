//! Per-call copy policy.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use recopy_core::{BoxError, Type, Value};

/// Transform function of a [`TypeConverter`].
pub type ConvertFn = Arc<dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync>;

/// A user-supplied transform for one exact (source type, destination type) pair.
///
/// Converters run before any structural copy. Returning [`Value::nil`] stores
/// the destination's zero value.
#[derive(Clone)]
pub struct TypeConverter {
    src: Type,
    dst: Type,
    func: ConvertFn,
}

impl TypeConverter {
    pub fn new<F>(src: Type, dst: Type, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        TypeConverter {
            src,
            dst,
            func: Arc::new(func),
        }
    }

    pub fn src(&self) -> &Type {
        &self.src
    }

    pub fn dst(&self) -> &Type {
        &self.dst
    }

    pub fn call(&self, from: &Value) -> Result<Value, BoxError> {
        (self.func)(from)
    }
}

impl fmt::Debug for TypeConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeConverter({} -> {})", self.src, self.dst)
    }
}

/// Field renames for one (source type, destination type) pair.
///
/// ```rust
/// use recopy::FieldNameMapping;
/// use recopy_core::{Field, Type};
///
/// let user = Type::record("User").field(Field::new("Name", Type::string())).build();
/// let dto = Type::record("UserDto").field(Field::new("FullName", Type::string())).build();
///
/// let mapping = FieldNameMapping::new(user, dto).map("Name", "FullName");
/// assert_eq!(mapping.get("Name"), Some("FullName"));
/// ```
#[derive(Clone, Debug)]
pub struct FieldNameMapping {
    src: Type,
    dst: Type,
    mapping: HashMap<String, String>,
}

impl FieldNameMapping {
    pub fn new(src: Type, dst: Type) -> Self {
        FieldNameMapping {
            src,
            dst,
            mapping: HashMap::new(),
        }
    }

    /// Copy source field `from` into destination field `to`.
    pub fn map(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.mapping.insert(from.into(), to.into());
        self
    }

    pub fn src(&self) -> &Type {
        &self.src
    }

    pub fn dst(&self) -> &Type {
        &self.dst
    }

    pub fn get(&self, from: &str) -> Option<&str> {
        self.mapping.get(from).map(String::as_str)
    }

    pub(crate) fn table(&self) -> &HashMap<String, String> {
        &self.mapping
    }
}

/// Options for [`copy_with_option`](crate::copy_with_option).
///
/// The default is case-insensitive, shallow, with no converters or mappings.
///
/// ```rust
/// use recopy::CopyOption;
///
/// let option = CopyOption::default().deep_copy().ignore_empty();
/// assert!(option.deep_copy && option.ignore_empty);
/// assert!(!option.case_sensitive);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CopyOption {
    /// Skip source fields holding the zero value of their type.
    pub ignore_empty: bool,
    /// Match field names exactly instead of under case folding.
    pub case_sensitive: bool,
    /// Give the destination its own copy of pointed-to data.
    pub deep_copy: bool,
    /// Converters by exact type pair; a later entry shadows an earlier one.
    pub converters: Vec<TypeConverter>,
    /// Field renames by exact type pair.
    pub field_name_mapping: Vec<FieldNameMapping>,
    /// Check `must` fields at the end of every record copy.
    pub enforce_must: bool,
}

impl CopyOption {
    pub fn ignore_empty(mut self) -> Self {
        self.ignore_empty = true;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    pub fn deep_copy(mut self) -> Self {
        self.deep_copy = true;
        self
    }

    pub fn converter(mut self, converter: TypeConverter) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn field_name_mapping(mut self, mapping: FieldNameMapping) -> Self {
        self.field_name_mapping.push(mapping);
        self
    }

    pub fn enforce_must(mut self) -> Self {
        self.enforce_must = true;
        self
    }

    pub(crate) fn converter_table(&self) -> HashMap<(Type, Type), &TypeConverter> {
        self.converters
            .iter()
            .map(|c| ((c.src.clone(), c.dst.clone()), c))
            .collect()
    }

    pub(crate) fn mapping_table(&self) -> HashMap<(Type, Type), &FieldNameMapping> {
        self.field_name_mapping
            .iter()
            .map(|m| ((m.src.clone(), m.dst.clone()), m))
            .collect()
    }
}
