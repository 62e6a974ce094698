//! Copies between plain Rust types.
//!
//! Each side is encoded through its [`Type`] description, copied with the
//! engine, and the destination is decoded back. The destination is encoded
//! first so fields the source does not cover keep their values.

use recopy::{copy_with_option, CopyOption};
use recopy_core::{Result, Type};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::convert::{from_value, to_value};

/// A Rust type with a recopy type description.
///
/// Implementations should hand out the same cached [`Type`] on every call:
/// record types compare by identity, so converters and field name mappings
/// registered against one description do not match a rebuilt one.
///
/// # Example
///
/// ```rust,ignore
/// lazy_static! {
///     static ref USER: Type = Type::record("User")
///         .field(Field::new("Name", Type::string()))
///         .build();
/// }
///
/// impl Describe for User {
///     fn describe() -> Type {
///         USER.clone()
///     }
/// }
/// ```
pub trait Describe {
    fn describe() -> Type;
}

/// Copy `from` into `to` using explicit type descriptions.
pub fn copy_serde<S, D>(to: &mut D, to_ty: &Type, from: &S, from_ty: &Type, option: &CopyOption) -> Result<()>
where
    S: Serialize,
    D: Serialize + DeserializeOwned,
{
    let source = to_value(from_ty, from)?;
    let mut dest = to_value(to_ty, to)?;
    copy_with_option(&mut dest, &source, option)?;
    tracing::trace!(from = %from_ty, to = %to_ty, "decoding copied value");
    *to = from_value(dest)?;
    Ok(())
}

/// Copy between two described types.
pub fn copy_typed<S, D>(to: &mut D, from: &S, option: &CopyOption) -> Result<()>
where
    S: Describe + Serialize,
    D: Describe + Serialize + DeserializeOwned,
{
    copy_serde(to, &D::describe(), from, &S::describe(), option)
}
