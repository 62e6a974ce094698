//! Tag flags collected for one record copy.

use std::collections::HashMap;

use recopy_core::{deep_fields, parse_tag, Error, Result, TagFlags, Type};

/// Field name to tag name, both directions.
#[derive(Debug, Default)]
pub(crate) struct TagNameMapping {
    pub(crate) field_name_to_tag: HashMap<String, String>,
    pub(crate) tag_to_field_name: HashMap<String, String>,
}

impl TagNameMapping {
    fn insert(&mut self, field: &str, tag: String) {
        self.field_name_to_tag.insert(field.to_string(), tag.clone());
        self.tag_to_field_name.insert(tag, field.to_string());
    }
}

/// Destination bit flags plus the renames declared on both sides.
#[derive(Debug, Default)]
pub(crate) struct Flags {
    /// Destination field flags, in field order.
    bit_flags: Vec<(String, TagFlags)>,
    pub(crate) src_names: TagNameMapping,
    pub(crate) dest_names: TagNameMapping,
}

impl Flags {
    /// Parse the tags of `to_type` and, when there is a source, `from_type`.
    pub(crate) fn collect(to_type: &Type, from_type: Option<&Type>) -> Result<Flags> {
        let mut flags = Flags::default();

        for field in deep_fields(to_type).iter() {
            let Some(tag) = field.copy_tag().filter(|t| !t.is_empty()) else {
                continue;
            };
            let parsed = parse_tag(tag)?;
            flags.bit_flags.push((field.name().to_string(), parsed.flags));
            if let Some(name) = parsed.name {
                flags.dest_names.insert(field.name(), name);
            }
        }

        if let Some(from_type) = from_type {
            for field in deep_fields(from_type).iter() {
                let Some(tag) = field.copy_tag().filter(|t| !t.is_empty()) else {
                    continue;
                };
                if let Some(name) = parse_tag(tag)?.name {
                    flags.src_names.insert(field.name(), name);
                }
            }
        }

        Ok(flags)
    }

    pub(crate) fn get(&self, field: &str) -> TagFlags {
        self.bit_flags
            .iter()
            .find(|(name, _)| name == field)
            .map_or(TagFlags::empty(), |(_, flags)| *flags)
    }

    /// Record a copy into a tagged field.
    pub(crate) fn mark_copied(&mut self, field: &str) {
        if let Some((_, flags)) = self.bit_flags.iter_mut().find(|(name, _)| name == field) {
            flags.insert(TagFlags::HAS_COPIED);
        }
    }

    /// Fail on the first `must` field that was not copied.
    ///
    /// # Panics
    ///
    /// When the field is tagged `must` without `nopanic`.
    pub(crate) fn check(&self) -> Result<()> {
        for (name, flags) in &self.bit_flags {
            if flags.contains(TagFlags::HAS_COPIED) || !flags.contains(TagFlags::MUST) {
                continue;
            }
            tracing::debug!(field = %name, "must field was not copied");
            if flags.contains(TagFlags::NO_PANIC) {
                return Err(Error::MustNotCopied {
                    field: name.clone(),
                });
            }
            panic!("Field {} has must tag but was not copied", name);
        }
        Ok(())
    }
}
