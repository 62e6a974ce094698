//! Core recopy model: types and values the copy engine walks
//!
//! This layer gives Rust programs the runtime type information the engine
//! needs:
//! - `Type`: Descriptor with a `Kind`, identity, and optional scan/value hooks
//! - `Value`: Typed payload; pointers are shared cells that can alias
//! - `RecordDef`: Ordered fields, embedded records, getter/setter methods
//! - `deep_fields`: Flattened, cached field lists for records
//! - `parse_tag`: Copy annotations (`-`, `must`, `nopanic`, renames)
//!
//! # Example
//!
//! ```rust
//! use recopy_core::{Field, Type, Value};
//!
//! let user = Type::record("User")
//!     .field(Field::new("Name", Type::string()))
//!     .field(Field::new("Age", Type::int()))
//!     .build();
//!
//! let alice = user.zero().with_field("Name", "Alice".into());
//! assert_eq!(alice.field("Name"), Some(Value::string("Alice")));
//! assert_eq!(alice.field("Age"), Some(Value::int(0)));
//! ```

mod error;
mod fields;
mod nullable;
mod record;
mod tag;
mod types;
mod value;

pub use error::{BoxError, Error, Result};
pub use fields::{deep_fields, find_field, names_match, DeepField};
pub use nullable::nullable;
pub use record::{Field, Getter, GetterFn, RecordBuilder, RecordDef, Setter, SetterFn};
pub use tag::{parse_tag, ParsedTag, TagFlags};
pub use types::{FloatWidth, IntWidth, Kind, Scanner, Type, Valuer};
pub use value::{Data, Pointer, Value};
