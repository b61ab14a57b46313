use flowflat_schema::PrimitiveType;
use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::ast::Literal;

/// Recognised metadata on declarations and fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Metadata {
    Deprecated,
    Required,
    Key,
    ForceAlign(u64),
    /// A reserved name the compiler knows but which has no effect on
    /// resolution or layout (`id`, `hash`, `bit_flags`, ...).
    Builtin { name: String, value: Option<Literal> },
    /// An attribute introduced by an `attribute` declaration.
    User { name: String, value: Option<Literal> },
}

impl Metadata {
    pub fn name(&self) -> &str {
        match self {
            Metadata::Deprecated         => "deprecated",
            Metadata::Required           => "required",
            Metadata::Key                => "key",
            Metadata::ForceAlign(_)      => "force_align",
            Metadata::Builtin { name, .. } => name,
            Metadata::User { name, .. }    => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValue {
    pub name:  String,
    pub value: i128,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enum {
    pub name:       String,
    pub underlying: PrimitiveType,
    pub values:     Vec<EnumValue>,
    pub metadata:   Vec<Metadata>,
}

impl Enum {
    pub fn identifiers(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn value_of(&self, identifier: &str) -> Option<i128> {
        self.values
            .iter()
            .find(|v| v.name == identifier)
            .map(|v| v.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Union {
    pub name:     String,
    pub members:  Vec<String>,
    pub metadata: Vec<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:          String,
    pub line:          usize,
    pub column:        usize,
    pub type_name:     String,
    pub is_array:      bool,
    pub default_value: Option<Literal>,
    pub metadata:      Vec<Metadata>,
}

impl Field {
    pub fn is_deprecated(&self) -> bool {
        self.metadata.contains(&Metadata::Deprecated)
    }

    pub fn is_required(&self) -> bool {
        self.metadata.contains(&Metadata::Required)
    }

    /// The type as written, `[T]` for arrays.
    pub fn type_literal(&self) -> String {
        if self.is_array {
            format!("[{}]", self.type_name)
        } else {
            self.type_name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Struct {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub fields:   Vec<Field>,
    pub metadata: Vec<Metadata>,
}

impl Struct {
    pub fn force_align(&self) -> Option<u64> {
        self.metadata.iter().find_map(|m| match m {
            Metadata::ForceAlign(n) => Some(*n),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub fields:   Vec<Field>,
    pub metadata: Vec<Metadata>,
}

/// A declaration found by name, primitives included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeDecl<'a> {
    Primitive(PrimitiveType),
    Enum(&'a Enum),
    Union(&'a Union),
    Struct(&'a Struct),
    Table(&'a Table),
}

impl TypeDecl<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeDecl::Primitive(_) => "primitive",
            TypeDecl::Enum(_)      => "enum",
            TypeDecl::Union(_)     => "union",
            TypeDecl::Struct(_)    => "struct",
            TypeDecl::Table(_)     => "table",
        }
    }
}

/// The symbol table of one schema file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpressionTree {
    pub namespace_path:    Option<Vec<String>>,
    pub includes:          Vec<String>,
    pub attributes:        IndexSet<String>,
    pub root_types:        IndexSet<String>,
    pub file_identifier:   Option<String>,
    pub file_extension:    Option<String>,
    pub enums:             IndexMap<String, Enum>,
    pub unions:            IndexMap<String, Union>,
    pub structs:           IndexMap<String, Struct>,
    pub tables:            IndexMap<String, Table>,
    /// Names of all enums, unions, structs and tables in source order.
    pub declaration_order: Vec<String>,
}

impl ExpressionTree {
    /// The declared namespace, empty for the global namespace.
    pub fn namespace(&self) -> &[String] {
        self.namespace_path.as_deref().unwrap_or(&[])
    }

    /// True if `name` is a primitive or declared in this file.
    pub fn type_exists(&self, name: &str) -> bool {
        PrimitiveType::from_name(name).is_some() || self.find_type(name).is_some()
    }

    /// Looks up a user-defined declaration of this file by its local name.
    pub fn find_type(&self, name: &str) -> Option<TypeDecl<'_>> {
        if let Some(e) = self.enums.get(name) {
            Some(TypeDecl::Enum(e))
        } else if let Some(u) = self.unions.get(name) {
            Some(TypeDecl::Union(u))
        } else if let Some(s) = self.structs.get(name) {
            Some(TypeDecl::Struct(s))
        } else {
            self.tables.get(name).map(TypeDecl::Table)
        }
    }
}

/// A fully qualified type reference: namespace path plus local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName {
    pub path: Vec<String>,
    pub name: String,
}

impl TypeName {
    pub fn new(path: &[String], name: &str) -> Self {
        TypeName {
            path: path.to_vec(),
            name: name.to_string(),
        }
    }

    /// Splits `a.b.T` into path `[a, b]` and name `T`.
    pub fn parse(dotted: &str) -> Self {
        let mut segments: Vec<String> = dotted.split('.').map(str::to_string).collect();
        let name = segments.pop().unwrap_or_default();
        TypeName {
            path: segments,
            name,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.path {
            write!(f, "{}.", segment)?;
        }
        f.write_str(&self.name)
    }
}

impl Serialize for TypeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_equality_needs_path_and_name() {
        let a = TypeName::parse("a.b.T");
        assert_eq!(a.path, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(a.name, "T");
        assert_eq!(a, TypeName::new(&["a".into(), "b".into()], "T"));
        assert_ne!(a, TypeName::parse("T"));
        assert_ne!(a, TypeName::parse("a.T"));
        assert_eq!(a.to_string(), "a.b.T");
        assert_eq!(TypeName::parse("T").to_string(), "T");
    }

    #[test]
    fn test_type_name_serializes_as_dotted_string() {
        let json = serde_json::to_string(&TypeName::parse("x.Y")).unwrap();
        assert_eq!(json, "\"x.Y\"");
    }

    #[test]
    fn test_find_type_covers_every_kind() {
        let mut tree = ExpressionTree::default();
        tree.tables.insert(
            "T".into(),
            Table { name: "T".into(), line: 1, column: 1, fields: vec![], metadata: vec![] },
        );
        assert!(matches!(tree.find_type("T"), Some(TypeDecl::Table(_))));
        assert!(tree.find_type("int").is_none());
        assert!(tree.type_exists("int"));
        assert!(!tree.type_exists("U"));
        assert!(tree.namespace().is_empty());
    }
}
