//! Class descriptor parsing.

use std::io::Read;
use std::rc::Rc;

use super::{
    content::{Content, CLASS_DESC_TAGS},
    errors::{Error, ErrorContext},
    Parser,
};
use crate::serial::descriptor::{ClassDesc, ClassDescRef, DescFlags, FieldDesc};
use crate::value::Value;

const SERIAL_VERSION_UID_LENGTH: usize = 8;
const MIN_CLASS_NAME_LENGTH: usize = 2;

impl<R: Read> Parser<R> {
    /// Reads a class descriptor through the restricted dispatcher. The
    /// descriptor slot may also hold `Null` (no descriptor) or a reference
    /// to one decoded earlier.
    pub(super) fn class_desc(&mut self) -> Result<Option<ClassDescRef>, Error> {
        match self
            .content(Some(&CLASS_DESC_TAGS))
            .context("error reading class description")?
        {
            Content::Class(cls) => Ok(Some(cls)),
            Content::Value(Value::Null) => Ok(None),
            Content::Value(_) | Content::EndBlock => Err(Error::UnexpectedClassDesc),
        }
    }

    /// Parses an inline class descriptor.
    ///
    /// The descriptor claims its handle right after name and UID, before its
    /// flags, fields, annotations, and super descriptor are read; the stream
    /// may reference it from inside any of those sections.
    pub(super) fn parse_class_desc(&mut self) -> Result<ClassDescRef, Error> {
        let name = self.utf().context("error reading class name")?;
        if name.len() < MIN_CLASS_NAME_LENGTH {
            return Err(Error::InvalidClassName(name));
        }
        let serial_version_uid = self
            .read_string(SERIAL_VERSION_UID_LENGTH, true)
            .context("error reading class serialVersionUID")?;

        let cls = ClassDesc::new(name, serial_version_uid);
        cls.borrow_mut().handle = self.handles.push_class(Rc::clone(&cls));

        let flags = self
            .reader
            .read_u8()
            .context("error reading class flags")?;
        {
            let mut cls = cls.borrow_mut();
            cls.flags = flags;
            cls.is_enum = DescFlags::from_bits_retain(flags).contains(DescFlags::ENUM);
        }

        let field_count = self
            .reader
            .read_u16()
            .context("error reading class field count")?;
        let mut fields = Vec::with_capacity(field_count.into());
        for _ in 0..field_count {
            fields.push(self.field_desc().context("error reading class field")?);
        }
        cls.borrow_mut().fields = fields;

        let annotations = self
            .annotations()
            .context("error reading class annotations")?;
        cls.borrow_mut().annotations = annotations;

        let super_desc = self.class_desc().context("error reading class super")?;
        cls.borrow_mut().super_desc = super_desc;

        Ok(cls)
    }

    /// Parses a field descriptor: type character, name, and for object and
    /// array fields the declared class name, which must decode to a string.
    fn field_desc(&mut self) -> Result<FieldDesc, Error> {
        let type_char = self
            .reader
            .read_u8()
            .context("error reading field type")?;
        let name = self.utf().context("error reading field name")?;
        let mut field = FieldDesc {
            type_char,
            name,
            class_name: None,
        };
        if FieldDesc::has_class_name(type_char) {
            let class_name = self
                .content(None)
                .context("error reading field class name")?;
            match class_name.into_value() {
                Value::Str(class_name) => field.class_name = Some(class_name),
                _ => return Err(Error::UnexpectedFieldClassNameType),
            }
        }
        Ok(field)
    }

    /// Parses a `Class` entity: a descriptor that claims one extra handle
    /// and surfaces as the descriptor itself.
    pub(super) fn parse_class(&mut self) -> Result<Content, Error> {
        match self.class_desc().context("error parsing class")? {
            Some(cls) => {
                self.handles.push_class(Rc::clone(&cls));
                Ok(Content::Class(cls))
            }
            None => {
                // The slot is still claimed; later references to it resolve
                // like references to any unfinished entity.
                let _ = self.handles.reserve();
                Ok(Content::Value(Value::Null))
            }
        }
    }
}
