//! Copy annotations on record fields.
//!
//! A tag is a comma-separated list: `-` ignores the field, `must` requires it
//! to be copied, `nopanic` turns a missed `must` into an error, and any other
//! token renames the field.

use std::ops::{BitOr, BitOrAssign};

use crate::error::{Error, Result};

/// Per-field bit flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TagFlags(u8);

impl TagFlags {
    /// The field must be copied to.
    pub const MUST: TagFlags = TagFlags(1 << 0);
    /// A missed `MUST` is reported as an error rather than a panic.
    pub const NO_PANIC: TagFlags = TagFlags(1 << 1);
    /// The field is never copied to.
    pub const IGNORE: TagFlags = TagFlags(1 << 2);
    /// Bookkeeping: a copy into the field happened during this call.
    pub const HAS_COPIED: TagFlags = TagFlags(1 << 3);

    pub const fn empty() -> Self {
        TagFlags(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: TagFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: TagFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for TagFlags {
    type Output = TagFlags;

    fn bitor(self, rhs: TagFlags) -> TagFlags {
        TagFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for TagFlags {
    fn bitor_assign(&mut self, rhs: TagFlags) {
        self.insert(rhs);
    }
}

/// Result of parsing one tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedTag {
    pub flags: TagFlags,
    /// Explicit field name override.
    pub name: Option<String>,
}

/// Parse a copy tag.
///
/// ```rust
/// use recopy_core::{parse_tag, TagFlags};
///
/// let tag = parse_tag("must,nopanic").unwrap();
/// assert!(tag.flags.contains(TagFlags::MUST | TagFlags::NO_PANIC));
///
/// let tag = parse_tag("FullName").unwrap();
/// assert_eq!(tag.name.as_deref(), Some("FullName"));
/// ```
pub fn parse_tag(tag: &str) -> Result<ParsedTag> {
    let mut parsed = ParsedTag::default();
    for token in tag.split(',') {
        match token {
            "-" => {
                return Ok(ParsedTag {
                    flags: TagFlags::IGNORE,
                    name: None,
                })
            }
            "must" => parsed.flags |= TagFlags::MUST,
            "nopanic" => parsed.flags |= TagFlags::NO_PANIC,
            name if name.chars().next().is_some_and(char::is_uppercase) => {
                parsed.name = Some(name.trim().to_string());
            }
            other => {
                return Err(Error::FieldNameTagStartNotUpperCase {
                    tag: other.to_string(),
                })
            }
        }
    }
    Ok(parsed)
}
