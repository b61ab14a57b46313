use serde::{Deserialize, Serialize};
use std::fmt;

use crate::wire::UOFFSET_SIZE;

/// The coarse class of a primitive, used to decide which literals and which
/// declarations (enum bases, defaults) a primitive may take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeClass {
    Bool,
    Char,
    Int,
    Float,
    String,
}

/// Every primitive type name a schema may use.
///
/// The serde representation is the schema spelling (`"ubyte"`, `"float64"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Bool,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Long,
    ULong,
    Double,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
}

pub const PRIMITIVE_TYPES: [PrimitiveType; 22] = [
    PrimitiveType::Bool,
    PrimitiveType::Byte,
    PrimitiveType::UByte,
    PrimitiveType::Short,
    PrimitiveType::UShort,
    PrimitiveType::Int,
    PrimitiveType::UInt,
    PrimitiveType::Float,
    PrimitiveType::Long,
    PrimitiveType::ULong,
    PrimitiveType::Double,
    PrimitiveType::Int8,
    PrimitiveType::UInt8,
    PrimitiveType::Int16,
    PrimitiveType::UInt16,
    PrimitiveType::Int32,
    PrimitiveType::UInt32,
    PrimitiveType::Int64,
    PrimitiveType::UInt64,
    PrimitiveType::Float32,
    PrimitiveType::Float64,
    PrimitiveType::String,
];

impl PrimitiveType {
    /// Looks up a primitive by its exact schema spelling.
    pub fn from_name(name: &str) -> Option<PrimitiveType> {
        PRIMITIVE_TYPES.iter().copied().find(|p| p.name() == name)
    }

    /// The schema spelling.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool    => "bool",
            PrimitiveType::Byte    => "byte",
            PrimitiveType::UByte   => "ubyte",
            PrimitiveType::Short   => "short",
            PrimitiveType::UShort  => "ushort",
            PrimitiveType::Int     => "int",
            PrimitiveType::UInt    => "uint",
            PrimitiveType::Float   => "float",
            PrimitiveType::Long    => "long",
            PrimitiveType::ULong   => "ulong",
            PrimitiveType::Double  => "double",
            PrimitiveType::Int8    => "int8",
            PrimitiveType::UInt8   => "uint8",
            PrimitiveType::Int16   => "int16",
            PrimitiveType::UInt16  => "uint16",
            PrimitiveType::Int32   => "int32",
            PrimitiveType::UInt32  => "uint32",
            PrimitiveType::Int64   => "int64",
            PrimitiveType::UInt64  => "uint64",
            PrimitiveType::Float32 => "float32",
            PrimitiveType::Float64 => "float64",
            PrimitiveType::String  => "string",
        }
    }

    /// The Rust type generated code uses to hold a value of this primitive.
    pub fn native_name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Byte | PrimitiveType::Int8 => "i8",
            PrimitiveType::UByte | PrimitiveType::UInt8 => "u8",
            PrimitiveType::Short | PrimitiveType::Int16 => "i16",
            PrimitiveType::UShort | PrimitiveType::UInt16 => "u16",
            PrimitiveType::Int | PrimitiveType::Int32 => "i32",
            PrimitiveType::UInt | PrimitiveType::UInt32 => "u32",
            PrimitiveType::Long | PrimitiveType::Int64 => "i64",
            PrimitiveType::ULong | PrimitiveType::UInt64 => "u64",
            PrimitiveType::Float | PrimitiveType::Float32 => "f32",
            PrimitiveType::Double | PrimitiveType::Float64 => "f64",
            PrimitiveType::String => "String",
        }
    }

    pub fn type_class(self) -> TypeClass {
        match self {
            PrimitiveType::Bool => TypeClass::Bool,
            PrimitiveType::Byte | PrimitiveType::UByte => TypeClass::Char,
            PrimitiveType::Float
            | PrimitiveType::Double
            | PrimitiveType::Float32
            | PrimitiveType::Float64 => TypeClass::Float,
            PrimitiveType::String => TypeClass::String,
            _ => TypeClass::Int,
        }
    }

    /// Inline size in bytes. A `string` is stored out of line, so its inline
    /// footprint is the `uoffset` pointing at it.
    pub fn size(self) -> usize {
        match self {
            PrimitiveType::Bool
            | PrimitiveType::Byte
            | PrimitiveType::UByte
            | PrimitiveType::Int8
            | PrimitiveType::UInt8 => 1,
            PrimitiveType::Short
            | PrimitiveType::UShort
            | PrimitiveType::Int16
            | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int
            | PrimitiveType::UInt
            | PrimitiveType::Float
            | PrimitiveType::Int32
            | PrimitiveType::UInt32
            | PrimitiveType::Float32 => 4,
            PrimitiveType::Long
            | PrimitiveType::ULong
            | PrimitiveType::Double
            | PrimitiveType::Int64
            | PrimitiveType::UInt64
            | PrimitiveType::Float64 => 8,
            PrimitiveType::String => UOFFSET_SIZE,
        }
    }

    /// Scalars are naturally aligned, so alignment always equals size.
    pub fn alignment(self) -> usize {
        self.size()
    }

    /// True for everything stored inline (every primitive except `string`).
    pub fn is_scalar(self) -> bool {
        self != PrimitiveType::String
    }

    pub fn is_integer(self) -> bool {
        matches!(self.type_class(), TypeClass::Int | TypeClass::Char)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            PrimitiveType::UByte
                | PrimitiveType::UShort
                | PrimitiveType::UInt
                | PrimitiveType::ULong
                | PrimitiveType::UInt8
                | PrimitiveType::UInt16
                | PrimitiveType::UInt32
                | PrimitiveType::UInt64
        )
    }

    /// Inclusive value range of an integer primitive, `None` for the others.
    pub fn integer_range(self) -> Option<(i128, i128)> {
        if !self.is_integer() {
            return None;
        }
        let bits = (self.size() * 8) as u32;
        if self.is_unsigned() {
            Some((0, (1i128 << bits) - 1))
        } else {
            Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1))
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
