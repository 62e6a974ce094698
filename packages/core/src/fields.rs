//! Flattened field enumeration.
//!
//! `deep_fields` lists a record's exported fields with the fields of
//! embedded records inlined right after the embedding field. Results are
//! memoized per type for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;

use crate::record::{Field, RecordDef};
use crate::types::Type;

lazy_static! {
    static ref DEEP_FIELDS: RwLock<HashMap<Type, Arc<[DeepField]>>> = RwLock::new(HashMap::new());
}

/// An exported field together with its index path from the root record.
#[derive(Clone, Debug)]
pub struct DeepField {
    field: Field,
    path: Vec<usize>,
}

impl DeepField {
    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn ty(&self) -> &Type {
        self.field.ty()
    }

    pub fn copy_tag(&self) -> Option<&str> {
        self.field.copy_tag()
    }

    /// Declared-field indexes from the root record down to this field.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Nesting depth: 1 for a field declared on the root record.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Flattened exported fields of `ty` after stripping pointers and sequences.
///
/// Non-record types have no fields. Two threads racing on the same type may
/// both compute the list; the content is identical so the last write wins.
pub fn deep_fields(ty: &Type) -> Arc<[DeepField]> {
    let ty = ty.indirect();

    if let Some(cached) = DEEP_FIELDS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&ty)
    {
        return cached.clone();
    }

    let fields: Arc<[DeepField]> = match ty.record_def() {
        Some(def) => flatten(def).into(),
        None => Vec::new().into(),
    };
    tracing::trace!(ty = %ty, count = fields.len(), "cached flattened fields");

    DEEP_FIELDS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(ty, fields.clone());
    fields
}

fn flatten(def: &RecordDef) -> Vec<DeepField> {
    let mut out = Vec::with_capacity(def.fields().len());
    for (index, field) in def.fields().iter().enumerate() {
        if !field.is_exported() {
            continue;
        }
        out.push(DeepField {
            field: field.clone(),
            path: vec![index],
        });
        if field.is_embedded() {
            for promoted in deep_fields(field.ty()).iter() {
                let mut path = Vec::with_capacity(promoted.path.len() + 1);
                path.push(index);
                path.extend_from_slice(&promoted.path);
                out.push(DeepField {
                    field: promoted.field.clone(),
                    path,
                });
            }
        }
    }
    out
}

/// Look a field up by name. The shallowest match wins, then declaration order.
pub fn find_field(ty: &Type, name: &str, case_sensitive: bool) -> Option<DeepField> {
    let fields = deep_fields(ty);
    let mut best: Option<&DeepField> = None;
    for field in fields
        .iter()
        .filter(|f| names_match(f.name(), name, case_sensitive))
    {
        if best.map_or(true, |b| field.depth() < b.depth()) {
            best = Some(field);
        }
    }
    best.cloned()
}

/// Compare two field names, exactly or under simple case folding.
pub fn names_match(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        return a == b;
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Type {
        Type::record("Base")
            .field(Field::new("ID", Type::int()))
            .field(Field::new("createdBy", Type::string()))
            .build()
    }

    #[test]
    fn only_exported_fields_are_listed() {
        let names: Vec<_> = deep_fields(&base()).iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["ID"]);
    }

    #[test]
    fn embedded_fields_are_inlined_after_the_embedding_field() {
        let user = Type::record("User")
            .field(Field::new("Name", Type::string()))
            .embed(Type::ptr(&base()))
            .field(Field::new("Email", Type::string()))
            .build();

        let fields = deep_fields(&user);
        let names: Vec<_> = fields.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["Name", "Base", "ID", "Email"]);
        assert_eq!(fields[2].path(), &[1, 0]);
    }

    #[test]
    fn pointers_and_sequences_are_stripped() {
        let ty = base();
        let direct = deep_fields(&ty);
        let through = deep_fields(&Type::seq(&Type::ptr(&ty)));
        assert!(Arc::ptr_eq(&direct, &through));
    }

    #[test]
    fn scalars_have_no_fields() {
        assert!(deep_fields(&Type::int()).is_empty());
    }

    #[test]
    fn shallowest_match_wins() {
        let inner = Type::record("Inner")
            .field(Field::new("Name", Type::string()))
            .build();
        let outer = Type::record("Outer")
            .embed(inner)
            .field(Field::new("Name", Type::string()))
            .build();

        let found = find_field(&outer, "Name", true).unwrap();
        assert_eq!(found.path(), &[1]);
    }

    #[test]
    fn case_folding() {
        assert!(names_match("Name", "NAME", false));
        assert!(!names_match("Name", "NAME", true));
        assert!(find_field(&base(), "id", false).is_some());
        assert!(find_field(&base(), "id", true).is_none());
    }

    #[test]
    fn concurrent_population_is_consistent() {
        let ty = Type::record("Shared")
            .field(Field::new("A", Type::int()))
            .field(Field::new("B", Type::int()))
            .build();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ty = ty.clone();
                std::thread::spawn(move || deep_fields(&ty).len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
    }
}
