use recopy::well_known::{self, with_well_known_converters};
use recopy::{copy, copy_with_option, CopyOption, Error, FieldNameMapping};
use recopy_core::{nullable, Field, Type, Value};

fn person() -> Type {
    Type::record("Person")
        .field(Field::new("ID", Type::int()))
        .field(Field::new("Name", Type::string()))
        .build()
}

fn bob(ty: &Type) -> Value {
    ty.zero()
        .with_field("ID", Value::int(5))
        .with_field("Name", "Bob".into())
}

#[test]
fn copy_into_embedded_pointer_fields() {
    let base = Type::record("Base")
        .field(Field::new("ID", Type::int()))
        .build();
    let member = Type::record("Member")
        .embed(Type::ptr(&base))
        .field(Field::new("Name", Type::string()))
        .build();
    let person = person();

    let mut dst = member.zero();
    copy(&mut dst, &bob(&person)).unwrap();
    assert_eq!(dst.field("ID"), Some(Value::int(5)));
    assert_eq!(dst.field("Name"), Some(Value::string("Bob")));

    let mut flat = person.zero();
    copy(&mut flat, &dst).unwrap();
    assert_eq!(flat, bob(&person));
}

#[test]
fn field_name_mapping_renames() {
    let person = person();
    let card = Type::record("Card")
        .field(Field::new("FullName", Type::string()))
        .build();
    let option = CopyOption::default()
        .field_name_mapping(FieldNameMapping::new(person.clone(), card.clone()).map("Name", "FullName"));

    let mut dst = card.zero();
    copy_with_option(&mut dst, &bob(&person), &option).unwrap();
    assert_eq!(dst.field("FullName"), Some(Value::string("Bob")));

    // mappings only apply to their own type pair
    let mut unmapped = card.zero();
    copy(&mut unmapped, &bob(&person)).unwrap();
    assert_eq!(unmapped.field("FullName"), Some(Value::string("")));
}

#[test]
fn tag_renames_destination_field() {
    let source = Type::record("Signup")
        .field(Field::new("Mail", Type::string()))
        .build();
    let account = Type::record("Account")
        .field(Field::new("Email", Type::string()).tag("Mail"))
        .build();

    let mut dst = account.zero();
    copy(&mut dst, &source.zero().with_field("Mail", "b@example.com".into())).unwrap();
    assert_eq!(dst.field("Email"), Some(Value::string("b@example.com")));
}

#[test]
fn getter_method_feeds_destination_field() {
    let person = Type::record("Person")
        .field(Field::new("First", Type::string()))
        .field(Field::new("Last", Type::string()))
        .getter("FullName", Type::string(), |v| {
            let part = |name| {
                v.field(name)
                    .and_then(|f| f.as_str().map(str::to_string))
                    .unwrap_or_default()
            };
            Value::string(format!("{} {}", part("First"), part("Last")))
        })
        .build();
    let badge = Type::record("Badge")
        .field(Field::new("FullName", Type::string()))
        .build();

    let src = person
        .zero()
        .with_field("First", "Ada".into())
        .with_field("Last", "Lovelace".into());
    let mut dst = badge.zero();
    copy(&mut dst, &src).unwrap();
    assert_eq!(dst.field("FullName"), Some(Value::string("Ada Lovelace")));
}

#[test]
fn setter_method_receives_unmatched_field() {
    let source = Type::record("Form")
        .field(Field::new("Age", Type::int()))
        .build();
    let profile = Type::record("Profile")
        .field(Field::new("Years", Type::int()))
        .setter("Age", Type::int(), |v, arg| {
            v.set_field("Years", arg);
        })
        .build();

    let mut dst = profile.zero();
    copy(&mut dst, &source.zero().with_field("Age", Value::int(42))).unwrap();
    assert_eq!(dst.field("Years"), Some(Value::int(42)));
}

#[test]
fn nullable_wrappers_scan_and_yield() {
    let null_string = nullable("NullString", Type::string());
    let wrapped = Type::record("Wrapped")
        .field(Field::new("Nick", null_string.clone()))
        .build();
    let plain = Type::record("Plain")
        .field(Field::new("Nick", Type::string()))
        .build();
    let optional = Type::record("Optional")
        .field(Field::new("Nick", Type::ptr(&Type::string())))
        .build();

    let mut scanned = wrapped.zero();
    copy(&mut scanned, &plain.zero().with_field("Nick", "bobby".into())).unwrap();
    let nick = scanned.field("Nick").unwrap();
    assert_eq!(nick.field("Value"), Some(Value::string("bobby")));
    assert_eq!(nick.field("Valid"), Some(Value::bool(true)));

    let mut unwrapped = plain.zero();
    copy(&mut unwrapped, &scanned).unwrap();
    assert_eq!(unwrapped.field("Nick"), Some(Value::string("bobby")));

    // an invalid wrapper leaves an optional destination unset
    let mut absent = optional.zero();
    copy(&mut absent, &wrapped.zero()).unwrap();
    assert!(absent.field("Nick").unwrap().is_nil_ptr());
}

#[test]
fn dynamic_destination_is_committed() {
    let person = person();
    let mut dst = Value::dynamic(person.zero());
    copy(&mut dst, &bob(&person)).unwrap();
    assert_eq!(dst.as_dynamic(), Some(&bob(&person)));

    let mut scalar = Value::dynamic(Value::from(0i32));
    copy(&mut scalar, &Value::int(7)).unwrap();
    assert_eq!(scalar.as_dynamic(), Some(&Value::from(7i32)));
}

#[test]
fn invalid_endpoints() {
    let person = person();

    let mut nil_slot = Value::nil();
    assert!(matches!(
        copy(&mut nil_slot, &bob(&person)),
        Err(Error::InvalidCopyDestination)
    ));

    let mut nil_ptr = Value::nil_ptr(&person);
    assert!(matches!(
        copy(&mut nil_ptr, &bob(&person)),
        Err(Error::InvalidCopyDestination)
    ));

    let mut dst = person.zero();
    assert!(matches!(
        copy(&mut dst, &Value::nil_ptr(&person)),
        Err(Error::InvalidCopyFrom)
    ));

    // destination is checked first
    assert!(matches!(
        copy(&mut nil_ptr, &Value::nil_ptr(&person)),
        Err(Error::InvalidCopyDestination)
    ));
}

#[test]
fn copy_through_destination_pointer() {
    let person = person();
    let mut dst = Value::ptr(person.zero());
    let alias = dst.clone();
    copy(&mut dst, &bob(&person)).unwrap();
    assert_eq!(alias.as_pointer().unwrap().get(), bob(&person));
}

#[test]
fn sequence_of_records_into_other_records() {
    let person = person();
    let contact = Type::record("Contact")
        .field(Field::new("Name", Type::string()))
        .build();
    let people = Value::seq(
        &person,
        vec![bob(&person), bob(&person).with_field("Name", "Eve".into())],
    );

    let mut by_value = Type::seq(&contact).zero();
    copy(&mut by_value, &people).unwrap();
    let names: Vec<_> = by_value
        .as_seq()
        .unwrap()
        .iter()
        .map(|c| c.field("Name").unwrap())
        .collect();
    assert_eq!(names, vec![Value::string("Bob"), Value::string("Eve")]);

    let mut by_pointer = Type::seq(&Type::ptr(&contact)).zero();
    copy(&mut by_pointer, &people).unwrap();
    let second = by_pointer.as_seq().unwrap()[1].as_pointer().unwrap().get();
    assert_eq!(second.field("Name"), Some(Value::string("Eve")));
}

#[test]
fn sequence_into_single_record_keeps_last() {
    let person = person();
    let people = Value::seq(
        &person,
        vec![bob(&person), bob(&person).with_field("Name", "Eve".into())],
    );

    let mut dst = person.zero();
    copy(&mut dst, &people).unwrap();
    assert_eq!(dst.field("Name"), Some(Value::string("Eve")));
}

#[test]
fn single_record_into_sequence() {
    let person = person();
    let mut dst = Type::seq(&person).zero();
    copy(&mut dst, &bob(&person)).unwrap();
    assert_eq!(dst.as_seq().unwrap(), &[bob(&person)]);
}

#[test]
fn ignore_empty_skips_zero_fields() {
    let person = person();
    let src = person.zero().with_field("ID", Value::int(9));

    let mut kept = bob(&person);
    copy_with_option(&mut kept, &src, &CopyOption::default().ignore_empty()).unwrap();
    assert_eq!(kept.field("ID"), Some(Value::int(9)));
    assert_eq!(kept.field("Name"), Some(Value::string("Bob")));

    let mut overwritten = bob(&person);
    copy(&mut overwritten, &src).unwrap();
    assert_eq!(overwritten.field("Name"), Some(Value::string("")));
}

#[test]
fn internal_fields_are_preserved_when_set() {
    let session = Type::record("Session")
        .field(Field::new("User", Type::string()))
        .field(Field::new("token", Type::string()))
        .build();
    let with_token = |user: &str, token: &str| {
        let mut v = session.zero().with_field("User", user.into());
        v.fields_mut().unwrap()[1] = Value::string(token);
        v
    };

    let mut dst = with_token("old", "mine");
    copy(&mut dst, &with_token("new", "theirs")).unwrap();
    assert_eq!(dst.field("User"), Some(Value::string("new")));
    assert_eq!(dst.fields().unwrap()[1], Value::string("mine"));

    let mut empty = with_token("old", "");
    copy(&mut empty, &with_token("new", "theirs")).unwrap();
    assert_eq!(empty.fields().unwrap()[1], Value::string("theirs"));
}

#[test]
fn nested_fallback_errors_are_swallowed() {
    let inner_src = Type::record("InnerSrc")
        .field(Field::new("X", Type::int()))
        .build();
    let broken = Type::record("Broken")
        .field(Field::new("X", Type::int()).tag("lowercase"))
        .field(Field::new("Y", Type::int()))
        .build();
    let outer_src = Type::record("OuterSrc")
        .field(Field::new("Name", Type::string()))
        .field(Field::new("Inner", inner_src.clone()))
        .build();
    let outer_dst = Type::record("OuterDst")
        .field(Field::new("Name", Type::string()))
        .field(Field::new("Inner", broken.clone()))
        .build();

    let inner = inner_src.zero().with_field("X", Value::int(1));
    let src = outer_src
        .zero()
        .with_field("Name", "n".into())
        .with_field("Inner", inner.clone());

    let mut dst = outer_dst.zero();
    copy(&mut dst, &src).unwrap();
    assert_eq!(dst.field("Name"), Some(Value::string("n")));
    assert_eq!(dst.field("Inner"), Some(broken.zero()));

    // the same failure is reported at the top level
    let mut direct = broken.zero();
    assert!(matches!(
        copy(&mut direct, &inner),
        Err(Error::FieldNameTagStartNotUpperCase { .. })
    ));

    // and from map values
    let from = Value::map(&Type::string(), &inner_src, vec![(Value::string("k"), inner)]);
    let mut to = Type::map(&Type::string(), &broken).zero();
    assert!(copy(&mut to, &from).is_err());
}

#[test]
fn unrelated_shapes_are_skipped() {
    let person = person();
    let mut dst = person.zero();
    copy(&mut dst, &Value::string("not a record")).unwrap();
    assert_eq!(dst, person.zero());
}

#[test]
fn well_known_timestamp_converters() {
    let event = Type::record("Event")
        .field(Field::new("At", well_known::time_type()))
        .build();
    let wire = Type::record("WireEvent")
        .field(Field::new("At", well_known::timestamp_type()))
        .build();
    let src = event
        .zero()
        .with_field("At", well_known::time(1_500_000_000_250_000_000));

    let mut dst = wire.zero();
    copy_with_option(&mut dst, &src, &with_well_known_converters(None)).unwrap();
    assert_eq!(
        dst.field("At"),
        Some(well_known::timestamp(1_500_000_000, 250_000_000))
    );

    let mut back = event.zero();
    copy_with_option(&mut back, &dst, &with_well_known_converters(None)).unwrap();
    assert_eq!(back, src);

    // without the converters the shapes do not meet
    let mut untouched = wire.zero();
    copy(&mut untouched, &src).unwrap();
    assert_eq!(untouched, wire.zero());
}

#[test]
fn failed_nested_copy_does_not_satisfy_must() {
    let source = Type::record("Counts")
        .field(Field::new("M", Type::map(&Type::string(), &Type::int())))
        .build();
    let dest = Type::record("Indexed")
        .field(Field::new("M", Type::map(&Type::int(), &Type::int())).tag("must,nopanic"))
        .build();
    let counts = Value::map(&Type::string(), &Type::int(), vec![(Value::string("a"), Value::int(1))]);

    let mut dst = dest.zero();
    let option = CopyOption::default().enforce_must();
    let err = copy_with_option(&mut dst, &source.zero().with_field("M", counts), &option).unwrap_err();
    assert!(matches!(err, Error::MustNotCopied { ref field } if field == "M"));
    assert_eq!(dst.field("M"), Some(Type::map(&Type::int(), &Type::int()).zero()));
}

#[test]
fn sequence_element_fallback_errors_are_swallowed() {
    let inner_src = Type::record("InnerSrc")
        .field(Field::new("X", Type::int()))
        .build();
    // same layout, so the element types are convertible
    let broken = Type::record("Broken")
        .field(Field::new("X", Type::int()).tag("lowercase"))
        .build();
    let items = Value::seq(&inner_src, vec![inner_src.zero().with_field("X", Value::int(1))]);

    let mut dst = Type::seq(&broken).zero();
    let option = CopyOption::default().deep_copy();
    copy_with_option(&mut dst, &items, &option).unwrap();
    assert_eq!(dst.as_seq().unwrap(), &[broken.zero()]);
}

#[test]
fn dynamic_destination_is_committed_on_error() {
    let inner_src = Type::record("InnerSrc")
        .field(Field::new("X", Type::int()))
        .build();
    let broken = Type::record("Broken")
        .field(Field::new("X", Type::int()).tag("lowercase"))
        .field(Field::new("Y", Type::int()))
        .build();

    let mut dst = Value::dynamic(broken.zero());
    let result = copy(&mut dst, &inner_src.zero().with_field("X", Value::int(1)));
    assert!(matches!(result, Err(Error::FieldNameTagStartNotUpperCase { .. })));
    let held = dst.as_dynamic().unwrap();
    assert_eq!(held.ty(), &broken);
    assert_eq!(held, &broken.zero());
}

#[test]
fn source_lookup_follows_case_sensitivity() {
    let profile = Type::record("Profile")
        .field(Field::new("Contact", Type::string()))
        .field(Field::new("Alias", Type::string()))
        .build();
    let card = Type::record("Card")
        .field(Field::new("Contact", Type::string()).tag("ALIAS"))
        .build();
    let src = profile
        .zero()
        .with_field("Contact", "c".into())
        .with_field("Alias", "a".into());

    let mut folded = card.zero();
    copy(&mut folded, &src).unwrap();
    assert_eq!(folded.field("Contact"), Some(Value::string("a")));

    let mut exact = card.zero();
    copy_with_option(&mut exact, &src, &CopyOption::default().case_sensitive()).unwrap();
    assert_eq!(exact.field("Contact"), Some(Value::string("")));
}
