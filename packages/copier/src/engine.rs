//! The copy walk: indirection, shape dispatch, and record field passes.

use std::collections::HashMap;
use std::mem;

use recopy_core::{
    deep_fields, find_field, Data, Error, Kind, Pointer, Result, TagFlags, Type, Value,
};

use crate::flags::Flags;
use crate::names::get_field_name;
use crate::option::{CopyOption, FieldNameMapping, TypeConverter};

/// Lookup tables built once per top-level copy.
pub(crate) struct Session<'a> {
    pub(crate) option: &'a CopyOption,
    converters: HashMap<(Type, Type), &'a TypeConverter>,
    mappings: HashMap<(Type, Type), &'a FieldNameMapping>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(option: &'a CopyOption) -> Self {
        Session {
            option,
            converters: option.converter_table(),
            mappings: option.mapping_table(),
        }
    }

    pub(crate) fn converter(&self, from: &Type, to: &Type) -> Option<&'a TypeConverter> {
        if self.converters.is_empty() {
            return None;
        }
        self.converters.get(&(from.clone(), to.clone())).copied()
    }

    fn mapping(&self, from: &Type, to: &Type) -> Option<&'a HashMap<String, String>> {
        if self.mappings.is_empty() {
            return None;
        }
        self.mappings
            .get(&(from.clone(), to.clone()))
            .map(|m| m.table())
    }

    /// Copy `from` into `to`, resolving indirection on both sides first.
    pub(crate) fn copy(&self, to: &mut Value, from: &Value) -> Result<()> {
        match to.data() {
            Data::Ptr(None) | Data::Dynamic(None) => Err(Error::InvalidCopyDestination),
            Data::Ptr(Some(ptr)) => {
                let ptr = ptr.clone();
                ptr.update(|inner| self.copy(inner, from))
            }
            Data::Dynamic(Some(held)) => {
                let scratch = allocated_zero(held.ty());
                let mut guard = CommitOnDrop { slot: to, scratch };
                self.copy(&mut guard.scratch, from)
            }
            _ => {
                let (from, through_ptr) = resolve(from).ok_or(Error::InvalidCopyFrom)?;
                self.copy_resolved(to, from, through_ptr)
            }
        }
    }

    fn copy_resolved(&self, to: &mut Value, from: Value, through_ptr: bool) -> Result<()> {
        let from_type = from.ty().indirect();
        let to_type = to.ty().indirect();

        if !matches!(from.ty().kind(), Kind::Seq(_) | Kind::Record(_) | Kind::Map(_, _))
            && from.ty().convertible_to(to.ty())
        {
            let from = if self.option.deep_copy && through_ptr {
                from.deep_clone()
            } else {
                from
            };
            if let Some(converted) = from.convert(to.ty()) {
                *to = converted;
            }
            return Ok(());
        }

        if let (Kind::Map(from_key, _), Kind::Map(to_key, to_elem)) =
            (from.ty().kind(), to.ty().kind())
        {
            if !from_key.convertible_to(to_key) {
                return Err(Error::MapKeyNotMatch {
                    from: from_key.to_string(),
                    to: to_key.to_string(),
                });
            }
            let (to_key, to_elem) = (to_key.clone(), to_elem.clone());
            return self.copy_map(to, &from, to_key, to_elem);
        }

        if let (Kind::Seq(_), Kind::Seq(to_elem)) = (from.ty().kind(), to.ty().kind()) {
            let to_elem = to_elem.clone();
            let len = from.as_seq().map_or(0, <[Value]>::len);
            if let Data::Seq(items @ None) = to.data_mut() {
                *items = Some(vec![to_elem.zero(); len]);
            }
            if from_type.convertible_to(&to_type) {
                self.copy_seq(to, &from, &to_elem)?;
                return Ok(());
            }
        }

        if !from_type.is_record() || !to_type.is_record() {
            tracing::trace!(from = %from.ty(), to = %to.ty(), "no copy strategy, skipping");
            return Ok(());
        }

        match self.apply_converter(to, &from) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => tracing::debug!(error = %err, "record converter failed, copying fields"),
        }

        self.copy_records(to, &from, &from_type, &to_type)
    }

    fn copy_map(&self, to: &mut Value, from: &Value, to_key: Type, to_elem: Type) -> Result<()> {
        if let Data::Map(entries @ None) = to.data_mut() {
            *entries = Some(Vec::new());
        }
        let elem_type = if to_elem.is_seq() {
            to_elem.clone()
        } else {
            to_elem.deref()
        };

        for (key, value) in from.as_map().unwrap_or_default() {
            let mut new_key = to_key.zero();
            if !self.set(&mut new_key, key)? {
                return Err(Error::not_supported(format!(
                    "map, old key: {}, new key: {}",
                    key.ty(),
                    to_key
                )));
            }

            let mut new_value = elem_type.zero();
            if !self.set(&mut new_value, value)? {
                self.copy(&mut new_value, value)?;
            }

            to.map_insert(new_key, rewrap(new_value, &to_elem));
        }
        Ok(())
    }

    fn copy_seq(&self, to: &mut Value, from: &Value, to_elem: &Type) -> Result<()> {
        let Data::Seq(Some(items)) = to.data_mut() else {
            return Ok(());
        };
        for (i, item) in from.as_seq().unwrap_or_default().iter().enumerate() {
            if items.len() < i + 1 {
                items.push(to_elem.zero());
            }
            let slot = &mut items[i];
            if !self.set(slot, item)? {
                self.fallback(slot, item, "sequence element");
            }
        }
        Ok(())
    }

    /// Nested copy used when a direct set is impossible. Failures leave the
    /// slot as it was and are not reported; the result says whether the copy
    /// went through.
    fn fallback(&self, slot: &mut Value, from: &Value, what: &str) -> bool {
        let before = slot.clone();
        match self.copy(slot, from) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, from = %from.ty(), to = %slot.ty(), "skipping {}", what);
                *slot = before;
                false
            }
        }
    }

    fn copy_records(&self, to: &mut Value, from: &Value, from_type: &Type, to_type: &Type) -> Result<()> {
        let is_slice = from.ty().is_seq() || to.ty().is_seq();
        let sources: Vec<Option<Value>> = match from.as_seq() {
            Some(items) => items.iter().map(|item| resolve(item).map(|(v, _)| v)).collect(),
            None if from.ty().is_seq() => Vec::new(),
            None => vec![Some(from.clone())],
        };
        let mapping = self.mapping(from_type, to_type);

        for (i, source) in sources.iter().enumerate() {
            if !is_slice || !to.ty().is_seq() {
                self.copy_record(to, source.as_ref(), to_type, mapping)?;
                continue;
            }

            let mut dest = to_type.zero();
            let converted = match source {
                Some(source) => self.apply_converter(&mut dest, source).unwrap_or(false),
                None => false,
            };
            if !converted {
                self.copy_record(&mut dest, source.as_ref(), to_type, mapping)?;
            }
            self.place(to, i, dest, to_type)?;
        }
        Ok(())
    }

    /// Copy one source record into `dest`.
    fn copy_record(
        &self,
        dest: &mut Value,
        source: Option<&Value>,
        to_type: &Type,
        mapping: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        let from_type = source.map(Value::ty);
        let mut flags = Flags::collect(to_type, from_type)?;

        if let Some(source) = source {
            if let Ok(true) = self.apply_converter(dest, source) {
                return Ok(());
            }
            self.preserve_internal_fields(dest, source);
            self.copy_fields(dest, source, to_type, &mut flags, mapping)?;
            self.copy_getters(dest, source, to_type, &mut flags, mapping);
        }

        if self.option.enforce_must {
            flags.check()?;
        }
        Ok(())
    }

    /// Internal fields are not visible to the field pass. On a record of the
    /// same type the unset ones are taken from the source.
    fn preserve_internal_fields(&self, dest: &mut Value, source: &Value) {
        if dest.ty() != source.ty() {
            return;
        }
        let Some(def) = dest.ty().record_def() else {
            return;
        };
        let internal: Vec<usize> = def
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_exported())
            .map(|(i, _)| i)
            .collect();
        let (Some(src), Some(dst)) = (source.fields(), dest.fields_mut()) else {
            return;
        };
        for i in internal {
            if dst[i].is_zero() {
                dst[i] = if self.option.deep_copy {
                    src[i].deep_clone()
                } else {
                    src[i].clone()
                };
            }
        }
    }

    fn copy_fields(
        &self,
        dest: &mut Value,
        source: &Value,
        to_type: &Type,
        flags: &mut Flags,
        mapping: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        for field in deep_fields(source.ty()).iter() {
            let (src_name, dest_name) = get_field_name(field.name(), flags, mapping);
            let to_field = find_field(to_type, &dest_name, self.option.case_sensitive);
            let target = to_field.as_ref().map_or(dest_name.as_str(), |f| f.name());
            if flags.get(target).contains(TagFlags::IGNORE) {
                continue;
            }

            let Some(from_value) = find_field(source.ty(), &src_name, self.option.case_sensitive)
                .and_then(|f| source.field_at(f.path()))
            else {
                continue;
            };
            if self.option.ignore_empty && from_value.is_zero() {
                continue;
            }

            let Some(to_field) = to_field else {
                self.call_setter(dest, to_type, &dest_name, from_value);
                continue;
            };

            dest.alloc_path(to_field.path());
            let outcome = dest.with_field_at_mut(to_field.path(), |slot| -> Result<bool> {
                Ok(self.set(slot, &from_value)? || self.fallback(slot, &from_value, "field"))
            });
            if let Some(outcome) = outcome {
                if outcome? {
                    flags.mark_copied(to_field.name());
                }
            }
        }
        Ok(())
    }

    /// Hand a source value with no matching field to a setter method.
    fn call_setter(&self, dest: &mut Value, to_type: &Type, name: &str, arg: Value) {
        let Some(setter) = to_type.record_def().and_then(|def| def.setter(name)) else {
            return;
        };
        if arg.ty().assignable_to(setter.param()) {
            tracing::trace!(method = name, "copying through setter");
            let arg = arg.convert(setter.param()).unwrap_or(arg);
            setter.call(dest, arg);
        }
    }

    /// Fill destination fields from zero-argument getter methods on the source.
    fn copy_getters(
        &self,
        dest: &mut Value,
        source: &Value,
        to_type: &Type,
        flags: &mut Flags,
        mapping: Option<&HashMap<String, String>>,
    ) {
        let Some(def) = source.ty().record_def() else {
            return;
        };
        for field in deep_fields(to_type).iter() {
            let (src_name, dest_name) = get_field_name(field.name(), flags, mapping);
            let Some(getter) = def.getter(&src_name) else {
                continue;
            };
            let Some(to_field) = find_field(to_type, &dest_name, self.option.case_sensitive) else {
                continue;
            };
            if flags.get(to_field.name()).contains(TagFlags::IGNORE) {
                continue;
            }

            let value = getter.call(source);
            if self.option.ignore_empty && value.is_zero() {
                continue;
            }

            dest.alloc_path(to_field.path());
            let copied = dest.with_field_at_mut(to_field.path(), |slot| self.set(slot, &value));
            if let Some(Ok(true)) = copied {
                flags.mark_copied(to_field.name());
            }
        }
    }

    /// Store a finished record at position `index` of the destination sequence.
    fn place(&self, to: &mut Value, index: usize, dest: Value, to_type: &Type) -> Result<()> {
        let Some(elem) = to.ty().elem().cloned() else {
            return Ok(());
        };
        let item = if Type::ptr(to_type).assignable_to(&elem) {
            Value::from_parts(Type::ptr(to_type), Data::Ptr(Some(Pointer::new(dest))))
        } else if to_type.assignable_to(&elem) {
            dest
        } else {
            return Ok(());
        };
        let Some(item) = item.convert(&elem) else {
            return Ok(());
        };

        let Data::Seq(items) = to.data_mut() else {
            return Ok(());
        };
        let items = items.get_or_insert_with(Vec::new);
        if items.len() < index + 1 {
            items.push(item);
            return Ok(());
        }
        let slot = &mut items[index];
        if !self.set(slot, &item)? {
            self.fallback(slot, &item, "sequence element");
        }
        Ok(())
    }
}

/// Resolve pointers and dynamic slots to a concrete value.
///
/// Returns the value and whether a pointer was followed, or `None` when a
/// nil pointer or empty slot is reached.
fn resolve(value: &Value) -> Option<(Value, bool)> {
    let mut current = value.clone();
    let mut through_ptr = false;
    loop {
        let next = match current.data() {
            Data::Ptr(ptr) => {
                through_ptr = true;
                ptr.as_ref()?.get()
            }
            Data::Dynamic(held) => held.as_deref()?.clone(),
            _ => return Some((current, through_ptr)),
        };
        current = next;
    }
}

/// Zero value of `ty` with every pointer layer allocated.
fn allocated_zero(ty: &Type) -> Value {
    match ty.kind() {
        Kind::Ptr(elem) => Value::from_parts(
            ty.clone(),
            Data::Ptr(Some(Pointer::new(allocated_zero(elem)))),
        ),
        _ => ty.zero(),
    }
}

/// Wrap `value` in pointer layers until it has type `target`.
fn rewrap(value: Value, target: &Type) -> Value {
    match target.kind() {
        Kind::Ptr(elem) if value.ty() != target => {
            let inner = rewrap(value, elem);
            Value::from_parts(target.clone(), Data::Ptr(Some(Pointer::new(inner))))
        }
        _ => value,
    }
}

/// Writes the scratch value back into the dynamic slot on every exit path.
struct CommitOnDrop<'v> {
    slot: &'v mut Value,
    scratch: Value,
}

impl Drop for CommitOnDrop<'_> {
    fn drop(&mut self) {
        let committed = mem::take(&mut self.scratch);
        let ty = self.slot.ty().clone();
        *self.slot = Value::from_parts(ty, Data::Dynamic(Some(Box::new(committed))));
    }
}
