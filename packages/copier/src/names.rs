//! Effective source and destination field names.

use std::collections::HashMap;

use crate::flags::Flags;

/// Resolve `(source name, destination name)` for field `name`.
///
/// An explicit mapping entry wins. Otherwise a tag rename on the source side
/// is matched against destination tags, then `name` itself is looked up as a
/// destination tag. The source name is resolved the same way from the
/// destination side.
pub(crate) fn get_field_name(
    name: &str,
    flags: &Flags,
    mapping: Option<&HashMap<String, String>>,
) -> (String, String) {
    if let Some(mapped) = mapping.and_then(|m| m.get(name)) {
        return (name.to_string(), mapped.clone());
    }

    let dest = match flags.src_names.field_name_to_tag.get(name) {
        Some(tag) => flags
            .dest_names
            .tag_to_field_name
            .get(tag)
            .unwrap_or(tag)
            .clone(),
        None => flags
            .dest_names
            .tag_to_field_name
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string()),
    };

    let src = match flags.dest_names.field_name_to_tag.get(name) {
        Some(tag) => flags
            .src_names
            .tag_to_field_name
            .get(tag)
            .unwrap_or(tag)
            .clone(),
        None => flags
            .src_names
            .tag_to_field_name
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string()),
    };

    (src, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recopy_core::{Field, Type};

    fn flags(dest: &Type, src: &Type) -> Flags {
        Flags::collect(dest, Some(src)).unwrap()
    }

    #[test]
    fn identity_without_rules() {
        let ty = Type::record("Plain")
            .field(Field::new("Name", Type::string()))
            .build();
        let f = flags(&ty, &ty);
        assert_eq!(
            get_field_name("Name", &f, None),
            ("Name".to_string(), "Name".to_string())
        );
    }

    #[test]
    fn explicit_mapping_wins() {
        let ty = Type::record("Plain")
            .field(Field::new("Name", Type::string()).tag("Other"))
            .build();
        let f = flags(&ty, &ty);
        let mapping = HashMap::from([("Name".to_string(), "FullName".to_string())]);
        assert_eq!(
            get_field_name("Name", &f, Some(&mapping)),
            ("Name".to_string(), "FullName".to_string())
        );
    }

    #[test]
    fn shared_tag_links_differently_named_fields() {
        let src = Type::record("Src")
            .field(Field::new("Address", Type::string()).tag("Mail"))
            .build();
        let dest = Type::record("Dest")
            .field(Field::new("Email", Type::string()).tag("Mail"))
            .build();
        let f = flags(&dest, &src);

        let (_, dest_name) = get_field_name("Address", &f, None);
        assert_eq!(dest_name, "Email");

        let (src_name, _) = get_field_name("Email", &f, None);
        assert_eq!(src_name, "Address");
    }

    #[test]
    fn destination_tag_names_the_source_field() {
        let src = Type::record("Src")
            .field(Field::new("Login", Type::string()))
            .build();
        let dest = Type::record("Dest")
            .field(Field::new("UserName", Type::string()).tag("Login"))
            .build();
        let f = flags(&dest, &src);

        assert_eq!(get_field_name("Login", &f, None).1, "UserName");
        assert_eq!(get_field_name("UserName", &f, None).0, "Login");
    }
}
