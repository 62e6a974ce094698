//! Serde integration for recopy
//!
//! This layer connects described values to plain Rust types via serde. It adds:
//! - `value_to_json` / `from_json`: render and decode values as JSON
//! - `to_value` / `from_value`: move between Rust types and values
//! - `copy_serde` / `copy_typed`: run the copy engine between Rust types
//!
//! # Example
//!
//! ```rust,ignore
//! use recopy_serde::{copy_serde, CopyOption};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! fn to_dto(user: &User, dto: &mut UserDto) -> Result<()> {
//!     copy_serde(dto, &USER_DTO, user, &USER, &CopyOption::default())
//! }
//! ```

mod convert;
mod typed;

pub use convert::{from_json, from_value, to_value, value_to_json};
pub use typed::{copy_serde, copy_typed, Describe};

// Re-export the pieces needed to describe and copy
pub use recopy::CopyOption;
pub use recopy_core::{Error, Field, Result, Type, Value};
