//! recopy: field-by-field copies between differently shaped records
//!
//! The engine walks a source and a destination [`Value`] in lockstep:
//! - Pointers and dynamic slots are resolved before dispatch
//! - Scalars are converted, maps and sequences copied entry by entry
//! - Records are matched by field name, with tags, renames, converters,
//!   and getter/setter methods taking part
//!
//! # Example
//!
//! ```rust
//! use recopy::copy;
//! use recopy_core::{Field, Type, Value};
//!
//! let user = Type::record("User")
//!     .field(Field::new("Name", Type::string()))
//!     .field(Field::new("Age", Type::int()))
//!     .build();
//! let employee = Type::record("Employee")
//!     .field(Field::new("Name", Type::string()))
//!     .field(Field::new("Age", Type::int32()))
//!     .build();
//!
//! let alice = user.zero()
//!     .with_field("Name", "Alice".into())
//!     .with_field("Age", 30i64.into());
//! let mut out = employee.zero();
//! copy(&mut out, &alice).unwrap();
//! assert_eq!(out.field("Age"), Some(Value::from(30i32)));
//! ```

mod engine;
mod flags;
mod names;
mod option;
mod setter;
pub mod well_known;

pub use option::{ConvertFn, CopyOption, FieldNameMapping, TypeConverter};
pub use recopy_core::{Error, Result, Value};

/// Copy `from` into `to` with default options.
pub fn copy(to: &mut Value, from: &Value) -> Result<()> {
    copy_with_option(to, from, &CopyOption::default())
}

/// Copy `from` into `to`.
///
/// `to` is written in place; pointers inside it are written through. A nil
/// pointer or empty dynamic slot on either side is an error.
pub fn copy_with_option(to: &mut Value, from: &Value, option: &CopyOption) -> Result<()> {
    engine::Session::new(option).copy(to, from)
}
