//! Class descriptors and their field metadata.

use std::{cell::RefCell, rc::Rc};

use bitflags::bitflags;

use crate::value::Value;

bitflags! {
    /// The class descriptor flag byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct DescFlags: u8 {
        /// The class defines a `writeObject` method.
        const WRITE_METHOD = 0x01;
        /// The class implements `java.io.Serializable`.
        const SERIALIZABLE = 0x02;
        /// The class implements `java.io.Externalizable`.
        const EXTERNALIZABLE = 0x04;
        /// Externalizable data is written in block-data mode.
        const BLOCK_DATA = 0x08;
        /// The class is an enum type.
        const ENUM = 0x10;
    }
}

/// The low nibble of the flag byte selects how class data is laid out.
pub(crate) const LAYOUT_MASK: u8 = 0x0F;

/// A class descriptor decoded from the stream.
///
/// A descriptor is registered in the handle table before its flags, fields,
/// annotations, and super descriptor are read, so references inside those
/// sections can resolve to the descriptor itself. Construction therefore
/// goes through a shared, interiorly mutable cell.
#[derive(Debug)]
pub(crate) struct ClassDesc {
    /// Fully qualified class name, at least two bytes long.
    pub name: String,
    /// The serialVersionUID as 16 lowercase hex characters.
    pub serial_version_uid: String,
    /// The handle-table index the descriptor was registered under. This is
    /// the identity key for the superclass walk.
    pub handle: usize,
    /// The raw flag byte.
    pub flags: u8,
    /// Derived from [`DescFlags::ENUM`].
    pub is_enum: bool,
    pub fields: Vec<FieldDesc>,
    pub annotations: Vec<Value>,
    pub super_desc: Option<ClassDescRef>,
}

pub(crate) type ClassDescRef = Rc<RefCell<ClassDesc>>;

impl ClassDesc {
    /// A fresh descriptor holding only its name and UID; everything else is
    /// filled in as the stream is read.
    pub fn new(name: String, serial_version_uid: String) -> ClassDescRef {
        Rc::new(RefCell::new(Self {
            name,
            serial_version_uid,
            handle: 0,
            flags: 0,
            is_enum: false,
            fields: Vec::new(),
            annotations: Vec::new(),
            super_desc: None,
        }))
    }

    /// The `name@uidHex` key the normalizer registry is indexed by.
    pub fn signature(&self) -> String {
        format!("{}@{}", self.name, self.serial_version_uid)
    }
}

/// A single class member.
#[derive(Debug, Clone)]
pub(crate) struct FieldDesc {
    /// The raw type character. Validated lazily, when a value is read
    /// through it.
    pub type_char: u8,
    pub name: String,
    /// The declared class name, present for object and array fields only.
    pub class_name: Option<String>,
}

impl FieldDesc {
    /// Whether the field carries an object or array reference, which makes
    /// its descriptor include a declared class name.
    pub fn has_class_name(type_char: u8) -> bool {
        matches!(type_char, b'L' | b'[')
    }
}

/// A field type character, keyed the way the wire format spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldTag {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Object,
    Array,
}

/// Error for an unrecognized field-type character.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown field type '{0}'")]
pub struct UnknownFieldType(pub char);

impl TryFrom<u8> for FieldTag {
    type Error = UnknownFieldType;

    fn try_from(type_char: u8) -> Result<Self, Self::Error> {
        match type_char {
            b'B' => Ok(Self::Byte),
            b'C' => Ok(Self::Char),
            b'D' => Ok(Self::Double),
            b'F' => Ok(Self::Float),
            b'I' => Ok(Self::Int),
            b'J' => Ok(Self::Long),
            b'S' => Ok(Self::Short),
            b'Z' => Ok(Self::Boolean),
            b'L' => Ok(Self::Object),
            b'[' => Ok(Self::Array),
            unexpected => Err(UnknownFieldType(char::from(unexpected))),
        }
    }
}
