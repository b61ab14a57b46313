//! The parse tree handed from the front-end to the semantic compiler.
//!
//! Nothing here is interpreted yet: type names are the literal text written
//! in the schema, default values are kept as literals, and array-ness is a flag.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDeclaration {
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Declaration {
    Include(String),
    Namespace(Vec<String>),
    Attribute(String),
    RootType(String),
    FileExtension(String),
    FileIdentifier(String),
    Enum(EnumDeclaration),
    Union(UnionDeclaration),
    Struct(CompoundDeclaration),
    Table(CompoundDeclaration),
}

/// A scalar or string constant as written in the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Bool(bool),
    Integer(i128),
    Float(f64),
    String(String),
    Ident(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b)    => write!(f, "{}", b),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(x)   => write!(f, "{:?}", x),
            Literal::String(s)  => f.write_str(s),
            Literal::Ident(s)   => f.write_str(s),
        }
    }
}

/// One `name` or `name: value` entry of a `( ... )` metadata list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub name:  String,
    pub value: Option<Literal>,
}

/// An enum constant or a union member: `Name` or `Name = 3`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueDeclaration {
    pub name:   String,
    pub value:  Option<i128>,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDeclaration {
    pub name:       String,
    pub underlying: String,
    pub metadata:   Vec<MetadataEntry>,
    pub values:     Vec<EnumValueDeclaration>,
    pub line:       usize,
    pub column:     usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionDeclaration {
    pub name:     String,
    pub metadata: Vec<MetadataEntry>,
    pub members:  Vec<EnumValueDeclaration>,
    pub line:     usize,
    pub column:   usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDeclaration {
    pub name:          String,
    pub type_name:     String,
    pub is_array:      bool,
    pub default_value: Option<Literal>,
    pub metadata:      Vec<MetadataEntry>,
    pub line:          usize,
    pub column:        usize,
}

/// The body shared by `struct` and `table` declarations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundDeclaration {
    pub name:     String,
    pub metadata: Vec<MetadataEntry>,
    pub fields:   Vec<FieldDeclaration>,
    pub line:     usize,
    pub column:   usize,
}
