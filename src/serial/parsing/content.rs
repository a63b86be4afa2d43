//! The type-tagged dispatcher and the leaf entity parsers.

use std::io::Read;
use std::rc::Rc;

use super::{
    errors::{Error, ErrorContext},
    Parser,
};
use crate::serial::{descriptor::ClassDescRef, handles::Slot, OBJECT_VALUE_KEY};
use crate::value::Value;

/// The first wire handle ID; slot indices count up from it.
const BASE_WIRE_HANDLE: i32 = 0x007E_0000;

/// A wire type tag, `0x70` through `0x7E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TypeTag {
    Null,
    Reference,
    ClassDesc,
    Object,
    String,
    Array,
    Class,
    BlockData,
    EndBlockData,
    Reset,
    BlockDataLong,
    Exception,
    LongString,
    ProxyClassDesc,
    Enum,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Reference => "Reference",
            Self::ClassDesc => "ClassDesc",
            Self::Object => "Object",
            Self::String => "String",
            Self::Array => "Array",
            Self::Class => "Class",
            Self::BlockData => "BlockData",
            Self::EndBlockData => "EndBlockData",
            Self::Reset => "Reset",
            Self::BlockDataLong => "BlockDataLong",
            Self::Exception => "Exception",
            Self::LongString => "LongString",
            Self::ProxyClassDesc => "ProxyClassDesc",
            Self::Enum => "Enum",
        }
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Error> {
        match raw {
            0x70 => Ok(Self::Null),
            0x71 => Ok(Self::Reference),
            0x72 => Ok(Self::ClassDesc),
            0x73 => Ok(Self::Object),
            0x74 => Ok(Self::String),
            0x75 => Ok(Self::Array),
            0x76 => Ok(Self::Class),
            0x77 => Ok(Self::BlockData),
            0x78 => Ok(Self::EndBlockData),
            0x79 => Ok(Self::Reset),
            0x7A => Ok(Self::BlockDataLong),
            0x7B => Ok(Self::Exception),
            0x7C => Ok(Self::LongString),
            0x7D => Ok(Self::ProxyClassDesc),
            0x7E => Ok(Self::Enum),
            unknown => Err(Error::UnknownType(unknown)),
        }
    }
}

/// The tags allowed where a class descriptor is expected.
pub(super) const CLASS_DESC_TAGS: [TypeTag; 4] = [
    TypeTag::ClassDesc,
    TypeTag::ProxyClassDesc,
    TypeTag::Null,
    TypeTag::Reference,
];

/// What a single dispatch produced: a plain value, a class descriptor, or
/// the end-of-block sentinel the annotation loops stop on.
#[derive(Debug)]
pub(super) enum Content {
    Value(Value),
    Class(ClassDescRef),
    EndBlock,
}

impl Content {
    /// Coerces into a plain value for positions that need one. Descriptors
    /// degrade to an empty object, the block terminator to null; neither
    /// appears in a value position in a well-formed stream.
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(value) => value,
            Self::Class(_) => Value::Object(crate::value::Object::new()),
            Self::EndBlock => Value::Null,
        }
    }
}

impl<R: Read> Parser<R> {
    /// Reads the next type tag and dispatches to its entity parser.
    ///
    /// `allowed` restricts which tags are valid at the current position.
    /// An object shell carrying a canonical projection is replaced by it;
    /// otherwise the shell's bookkeeping keys are stripped before the value
    /// surfaces.
    pub(super) fn content(&mut self, allowed: Option<&[TypeTag]>) -> Result<Content, Error> {
        let raw = self.reader.read_u8()?;
        let Ok(tag) = TypeTag::try_from(raw) else {
            // Leave the foreign byte in the stream for the caller.
            self.reader.unread_byte(raw);
            return Err(Error::UnknownType(raw));
        };
        if let Some(allowed) = allowed {
            if !allowed.contains(&tag) {
                return Err(Error::TypeNotAllowedHere(tag.name()));
            }
        }
        let content = match tag {
            TypeTag::Null => Content::Value(Value::Null),
            TypeTag::Reference => self.parse_reference()?,
            TypeTag::ClassDesc => Content::Class(self.parse_class_desc()?),
            TypeTag::Object => self.parse_object()?,
            TypeTag::String => Content::Value(self.parse_string()?),
            TypeTag::Array => self.parse_array()?,
            TypeTag::Class => self.parse_class()?,
            TypeTag::BlockData => Content::Value(self.parse_block_data()?),
            TypeTag::EndBlockData => Content::EndBlock,
            TypeTag::BlockDataLong => Content::Value(self.parse_block_data_long()?),
            TypeTag::LongString => Content::Value(self.parse_long_string()?),
            TypeTag::Enum => self.parse_enum()?,
            TypeTag::Reset | TypeTag::Exception | TypeTag::ProxyClassDesc => {
                return Err(Error::Unsupported(tag.name()))
            }
        };
        Ok(finish_shell(content))
    }

    /// Resolves a back-reference. An index pointing at a reserved slot
    /// yields the cycle sentinel; an out-of-range index silently yields
    /// null rather than an error.
    fn parse_reference(&mut self) -> Result<Content, Error> {
        let ref_id = self
            .reader
            .read_i32()
            .context("error reading reference index")?;
        let index = i64::from(ref_id) - i64::from(BASE_WIRE_HANDLE);
        let Ok(index) = usize::try_from(index) else {
            return Ok(Content::Value(Value::Null));
        };
        Ok(match self.handles.get(index) {
            None => Content::Value(Value::Null),
            Some(Slot::Pending) => Content::Value(self.cycle_value.clone()),
            Some(Slot::Value(value)) => Content::Value(value.clone()),
            Some(Slot::Class(cls)) => Content::Class(Rc::clone(cls)),
        })
    }

    fn parse_string(&mut self) -> Result<Value, Error> {
        let s = self.utf().context("error parsing string")?;
        Ok(self.handles.push_value(Value::Str(s)))
    }

    fn parse_long_string(&mut self) -> Result<Value, Error> {
        let s = self.utf_long().context("error parsing long string")?;
        Ok(self.handles.push_value(Value::Str(s)))
    }

    fn parse_block_data(&mut self) -> Result<Value, Error> {
        let size = self
            .reader
            .read_u8()
            .context("error parsing block data size")?;
        let data = self.reader.read_chunk(size.into())?;
        Ok(Value::Bytes(data))
    }

    fn parse_block_data_long(&mut self) -> Result<Value, Error> {
        let size = self
            .reader
            .read_u32()
            .context("error parsing block data long size")?;
        let data = self.read_block(size as usize)?;
        Ok(Value::Bytes(data))
    }

    /// Reads content values up to the next end-of-block marker.
    pub(super) fn annotations(&mut self) -> Result<Vec<Value>, Error> {
        let mut annotations = Vec::new();
        loop {
            match self.content(None).context("error reading class annotation")? {
                Content::EndBlock => break,
                content => annotations.push(content.into_value()),
            }
        }
        Ok(annotations)
    }
}

/// Applies the shell contract after a dispatch: a non-null canonical
/// projection replaces the shell wholesale; otherwise the annotation and
/// inheritance bookkeeping is stripped.
fn finish_shell(content: Content) -> Content {
    let Content::Value(Value::Object(mut shell)) = content else {
        return content;
    };
    if shell
        .get(OBJECT_VALUE_KEY)
        .is_some_and(|value| *value != Value::Null)
    {
        if let Some(value) = shell.remove(OBJECT_VALUE_KEY) {
            return Content::Value(value);
        }
    }
    shell.remove("@");
    shell.remove("extends");
    Content::Value(Value::Object(shell))
}
