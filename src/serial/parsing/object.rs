//! Objects, arrays, enums, and the flag-driven class-data reader.

use std::collections::HashSet;
use std::io::Read;

use super::{
    content::Content,
    errors::{Error, ErrorContext},
    Parser,
};
use crate::serial::{
    descriptor::{ClassDescRef, DescFlags, FieldTag, LAYOUT_MASK},
    postproc, OBJECT_VALUE_KEY,
};
use crate::value::{Object, Value};

const SERIALIZABLE: u8 = DescFlags::SERIALIZABLE.bits();
const SERIALIZABLE_WRITE: u8 = DescFlags::SERIALIZABLE.union(DescFlags::WRITE_METHOD).bits();
const EXTERNALIZABLE_BLOCK: u8 = DescFlags::EXTERNALIZABLE.union(DescFlags::BLOCK_DATA).bits();
const EXTERNALIZABLE_V1: u8 = DescFlags::EXTERNALIZABLE.bits();

impl<R: Read> Parser<R> {
    /// Reads one value of the given field type. Object and array fields
    /// recurse into the content dispatcher.
    fn read_primitive(&mut self, tag: FieldTag) -> Result<Value, Error> {
        Ok(match tag {
            FieldTag::Byte => Value::Byte(
                self.reader
                    .read_i8()
                    .context("error reading byte primitive")?,
            ),
            FieldTag::Char => {
                let code = self
                    .reader
                    .read_u16()
                    .context("error reading char primitive")?;
                let c = char::from_u32(code.into()).unwrap_or(char::REPLACEMENT_CHARACTER);
                Value::Str(c.to_string())
            }
            FieldTag::Double => Value::Double(
                self.reader
                    .read_f64()
                    .context("error reading double primitive")?,
            ),
            FieldTag::Float => Value::Float(
                self.reader
                    .read_f32()
                    .context("error reading float primitive")?,
            ),
            FieldTag::Int => Value::Int(
                self.reader
                    .read_i32()
                    .context("error reading int primitive")?,
            ),
            FieldTag::Long => Value::Long(
                self.reader
                    .read_i64()
                    .context("error reading long primitive")?,
            ),
            FieldTag::Short => Value::Short(
                self.reader
                    .read_i16()
                    .context("error reading short primitive")?,
            ),
            FieldTag::Boolean => {
                let raw = self
                    .reader
                    .read_i8()
                    .context("error reading boolean primitive")?;
                Value::Bool(raw != 0)
            }
            FieldTag::Object => self
                .content(None)
                .context("error reading object primitive")?
                .into_value(),
            FieldTag::Array => self
                .content(None)
                .context("error reading array primitive")?
                .into_value(),
        })
    }

    /// Reads the primitive field values of one class layer, in descriptor
    /// order.
    fn read_field_values(&mut self, cls: &ClassDescRef) -> Result<Object, Error> {
        // Field values may recurse arbitrarily deep into the dispatcher, so
        // the descriptor borrow must not be held across the reads.
        let fields = cls.borrow().fields.clone();
        let mut values = Object::new();
        for field in &fields {
            let tag = FieldTag::try_from(field.type_char)?;
            let value = self
                .read_primitive(tag)
                .context("error reading primitive field value")?;
            values.insert(field.name.clone(), value);
        }
        Ok(values)
    }

    /// Reads one class layer's contribution to an object, as selected by
    /// the low nibble of the descriptor flags, and runs the container
    /// normalizer registered for the class, if any.
    fn class_data(&mut self, cls: &ClassDescRef) -> Result<Object, Error> {
        let flags = cls.borrow().flags;
        let mut annotations = Vec::new();
        let mut data = match flags & LAYOUT_MASK {
            SERIALIZABLE | SERIALIZABLE_WRITE => self
                .read_field_values(cls)
                .context("error reading class data field values")?,
            EXTERNALIZABLE_BLOCK => Object::new(),
            EXTERNALIZABLE_V1 => return Err(Error::ExternalContent),
            _ => return Err(Error::UnsupportedClassFlags(flags)),
        };
        if matches!(flags & LAYOUT_MASK, SERIALIZABLE_WRITE | EXTERNALIZABLE_BLOCK) {
            annotations = self.annotations().context("error reading annotations")?;
            data.insert("@", Value::Array(annotations.clone()));
        }
        let signature = cls.borrow().signature();
        if let Some(normalize) = postproc::lookup(&signature) {
            data = normalize(data, &annotations, self.time_zone)?;
        }
        Ok(data)
    }

    /// Walks the inheritance chain from the root-most superclass down to
    /// the most derived class, flattening each layer's fields into the
    /// shell. The seen-set is keyed on handle identity so a malformed
    /// descriptor cycle terminates.
    fn class_data_chain(
        &mut self,
        cls: &ClassDescRef,
        shell: &mut Object,
        extends: &mut Object,
        seen: &mut HashSet<usize>,
    ) -> Result<(), Error> {
        let (handle, name, super_desc) = {
            let cls = cls.borrow();
            (cls.handle, cls.name.clone(), cls.super_desc.clone())
        };
        seen.insert(handle);
        if let Some(super_desc) = super_desc {
            let super_handle = super_desc.borrow().handle;
            if !seen.contains(&super_handle) {
                self.class_data_chain(&super_desc, shell, extends, seen)?;
            }
        }
        let layer = self
            .class_data(cls)
            .context("error reading recursive class data")?;
        extends.insert(name, Value::Object(layer.clone()));
        for (key, value) in layer {
            shell.insert(key, value);
        }
        Ok(())
    }

    /// Parses an `Object` entity: descriptor, deferred handle, and one data
    /// layer per class in the inheritance chain.
    pub(super) fn parse_object(&mut self) -> Result<Content, Error> {
        let cls = self.class_desc().context("error reading object class")?;
        let deferred = self.handles.reserve();
        let mut shell = Object::new();
        let mut extends = Object::new();
        if let Some(cls) = cls {
            let mut seen = HashSet::new();
            self.class_data_chain(&cls, &mut shell, &mut extends, &mut seen)
                .context("error reading recursive class data")?;
        }
        shell.insert("extends", Value::Object(extends));
        Ok(Content::Value(
            deferred.commit(&mut self.handles, Value::Object(shell)),
        ))
    }

    /// Parses an `Array` entity. The committed value is the bare element
    /// sequence; later references to the array's handle resolve to it.
    pub(super) fn parse_array(&mut self) -> Result<Content, Error> {
        let cls = self.class_desc().context("error parsing array class")?;
        let deferred = self.handles.reserve();
        let size = self
            .reader
            .read_i32()
            .context("error reading array size")?;
        let Some(cls) = cls else {
            let mut shell = Object::new();
            shell.insert("class", Value::Null);
            shell.insert("length", Value::Int(size));
            return Ok(Content::Value(
                deferred.commit(&mut self.handles, Value::Object(shell)),
            ));
        };
        let component = cls.borrow().name.bytes().nth(1).unwrap_or(0);
        let tag = FieldTag::try_from(component)?;
        // The announced count is untrusted; grow the buffer as elements
        // actually decode instead of pre-allocating it.
        let mut elements = Vec::new();
        for _ in 0..size {
            elements.push(
                self.read_primitive(tag)
                    .context("error reading primitive array member")?,
            );
        }
        Ok(Content::Value(
            deferred.commit(&mut self.handles, Value::Array(elements)),
        ))
    }

    /// Parses an `Enum` entity. The result carries the constant name as its
    /// canonical projection, so callers receive the bare string.
    pub(super) fn parse_enum(&mut self) -> Result<Content, Error> {
        let _cls = self.class_desc().context("error parsing enum class")?;
        let deferred = self.handles.reserve();
        let constant = self
            .content(None)
            .context("error parsing enum constant")?
            .into_value();
        let mut shell = Object::new();
        shell.insert(OBJECT_VALUE_KEY, constant);
        Ok(Content::Value(
            deferred.commit(&mut self.handles, Value::Object(shell)),
        ))
    }
}
