//! The resolved form of a session: every declaration keyed by its qualified
//! name, with every type reference already resolved.

use flowflat_schema::PrimitiveType;
use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    ast::Literal,
    error::FlowflatError,
    resolver::StaticContext,
    session::Session,
    types::{EnumValue, Field, Metadata, TypeDecl, TypeName},
    utils::quote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Primitive(PrimitiveType),
    Enum,
    Union,
    Struct,
    Table,
}

/// A resolved field type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRef {
    pub name: TypeName,
    pub kind: TypeKind,
}

impl TypeRef {
    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// True for references that order the emitted declarations.
    pub fn is_dependency(&self) -> bool {
        matches!(self.kind, TypeKind::Union | TypeKind::Struct | TypeKind::Table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrField {
    pub name:          String,
    pub ty:            TypeRef,
    pub is_array:      bool,
    pub default_value: Option<Literal>,
    pub metadata:      Vec<Metadata>,
}

impl IrField {
    pub fn is_deprecated(&self) -> bool {
        self.metadata.contains(&Metadata::Deprecated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrEnum {
    pub name:       TypeName,
    pub underlying: PrimitiveType,
    pub values:     Vec<EnumValue>,
    pub metadata:   Vec<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrUnion {
    pub name:     TypeName,
    pub members:  Vec<TypeName>,
    pub metadata: Vec<Metadata>,
}

/// A struct or a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrCompound {
    pub name:        TypeName,
    pub fields:      Vec<IrField>,
    pub metadata:    Vec<Metadata>,
    pub force_align: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Declaration {
    Enum(IrEnum),
    Union(IrUnion),
    Struct(IrCompound),
    Table(IrCompound),
}

impl Declaration {
    pub fn name(&self) -> &TypeName {
        match self {
            Declaration::Enum(e)   => &e.name,
            Declaration::Union(u)  => &u.name,
            Declaration::Struct(s) => &s.name,
            Declaration::Table(t)  => &t.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Declaration::Enum(_)   => "enum",
            Declaration::Union(_)  => "union",
            Declaration::Struct(_) => "struct",
            Declaration::Table(_)  => "table",
        }
    }

    /// Unions, structs and tables this declaration refers to, in field order
    /// and without repeats. Enums have none.
    pub fn dependencies(&self) -> Vec<&TypeName> {
        let references: Vec<&TypeName> = match self {
            Declaration::Enum(_) => Vec::new(),
            Declaration::Union(u) => u.members.iter().collect(),
            Declaration::Struct(c) | Declaration::Table(c) => c
                .fields
                .iter()
                .filter(|f| f.ty.is_dependency())
                .map(|f| &f.ty.name)
                .collect(),
        };
        let mut deps: Vec<&TypeName> = Vec::new();
        for name in references {
            if !deps.contains(&name) {
                deps.push(name);
            }
        }
        deps
    }
}

/// Lowers every declaration of the session, files in registration order and
/// declarations in source order.
pub fn lower_session(session: &Session) -> Result<IndexMap<TypeName, Declaration>, FlowflatError> {
    let mut lowered = IndexMap::new();
    for (_, tree) in session.files() {
        let ctx = StaticContext::new(session, tree);
        for name in &tree.declaration_order {
            let qualified = TypeName::new(tree.namespace(), name);
            let decl = match tree.find_type(name) {
                Some(TypeDecl::Enum(e)) => Declaration::Enum(IrEnum {
                    name:       qualified.clone(),
                    underlying: e.underlying,
                    values:     e.values.clone(),
                    metadata:   e.metadata.clone(),
                }),
                Some(TypeDecl::Union(u)) => Declaration::Union(IrUnion {
                    name:     qualified.clone(),
                    members:  u
                        .members
                        .iter()
                        .map(|m| ctx.qualified(m))
                        .collect::<Result<_, _>>()?,
                    metadata: u.metadata.clone(),
                }),
                Some(TypeDecl::Struct(s)) => Declaration::Struct(IrCompound {
                    name:        qualified.clone(),
                    fields:      lower_fields(&ctx, &s.fields)?,
                    metadata:    s.metadata.clone(),
                    force_align: s.force_align(),
                }),
                Some(TypeDecl::Table(t)) => Declaration::Table(IrCompound {
                    name:        qualified.clone(),
                    fields:      lower_fields(&ctx, &t.fields)?,
                    metadata:    t.metadata.clone(),
                    force_align: None,
                }),
                Some(TypeDecl::Primitive(_)) | None => {
                    return Err(FlowflatError::Internal(format!(
                        "Declaration {} is listed but missing",
                        quote(name)
                    )))
                }
            };
            lowered.insert(qualified, decl);
        }
    }
    Ok(lowered)
}

fn lower_fields(ctx: &StaticContext, fields: &[Field]) -> Result<Vec<IrField>, FlowflatError> {
    fields
        .iter()
        .map(|field| {
            let (name, decl) = ctx
                .resolve(&field.type_name)
                .ok_or_else(|| FlowflatError::TypeNotFound(quote(&field.type_name)))?;
            let kind = match decl {
                TypeDecl::Primitive(p) => TypeKind::Primitive(p),
                TypeDecl::Enum(_)      => TypeKind::Enum,
                TypeDecl::Union(_)     => TypeKind::Union,
                TypeDecl::Struct(_)    => TypeKind::Struct,
                TypeDecl::Table(_)     => TypeKind::Table,
            };
            Ok(IrField {
                name:          field.name.clone(),
                ty:            TypeRef { name, kind },
                is_array:      field.is_array,
                default_value: field.default_value.clone(),
                metadata:      field.metadata.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(files: &[(&str, &str)]) -> IndexMap<TypeName, Declaration> {
        let mut session = Session::new();
        for (path, text) in files {
            session.register_source(*path, text).unwrap();
        }
        lower_session(&session).unwrap()
    }

    #[test]
    fn test_references_are_qualified() {
        let ir = lower(&[
            ("geo.fbs", "namespace geo; struct Vec2 { x: float; y: float; }"),
            ("game.fbs", "namespace game; enum Team : byte { Red, Blue } table Unit { pos: geo.Vec2; team: Team; hp: int; }"),
        ]);
        let names: Vec<String> = ir.keys().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["geo.Vec2", "game.Team", "game.Unit"]);

        let unit = match &ir[&TypeName::parse("game.Unit")] {
            Declaration::Table(t) => t,
            other => panic!("expected a table, got {:?}", other),
        };
        assert_eq!(unit.fields[0].ty.name.to_string(), "geo.Vec2");
        assert_eq!(unit.fields[0].ty.kind, TypeKind::Struct);
        assert_eq!(unit.fields[1].ty.kind, TypeKind::Enum);
        assert_eq!(unit.fields[2].ty.name.to_string(), "game.int");
        assert_eq!(unit.fields[2].ty.primitive(), Some(PrimitiveType::Int));
    }

    #[test]
    fn test_dependencies_skip_primitives_and_enums() {
        let ir = lower(&[(
            "f.fbs",
            "enum E : int { A } struct S { a: int; } table A { x: int; } \
             union U { A } table T { e: E; s: S; u: U; a: [A]; again: A; n: string; }",
        )]);
        let deps: Vec<String> = ir[&TypeName::parse("T")]
            .dependencies()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(deps, vec!["S", "U", "A"]);
        assert!(ir[&TypeName::parse("E")].dependencies().is_empty());
        assert_eq!(ir[&TypeName::parse("U")].kind_name(), "union");
    }

    #[test]
    fn test_declarations_serialize_with_their_kind() {
        let ir = lower(&[("f.fbs", "union U { T } table T { x: int; }")]);
        let json = serde_json::to_value(&ir[&TypeName::parse("U")]).unwrap();
        assert_eq!(json["kind"], "union");
        assert_eq!(json["members"][0], "T");
    }
}
