use flowflat_schema::{PrimitiveType, TypeClass};
use std::collections::HashMap;

use crate::{
    ast::Literal,
    config::CompilerConfig,
    error::FlowflatError,
    resolver::StaticContext,
    session::Session,
    types::{Field, Metadata, TypeDecl, TypeName},
    utils::quote,
};

/// Largest accepted `force_align` value.
pub const MAX_FORCE_ALIGN: u64 = 256;

/// Checks every registered file. Returns the first violation found.
pub fn verify_session(session: &Session, config: &CompilerConfig) -> Result<(), FlowflatError> {
    verify_unique_names(session)?;
    for (path, tree) in session.files() {
        verify_file(&StaticContext::new(session, tree), config)?;
        log::debug!("verified {}", quote(path));
    }
    Ok(())
}

/// A qualified name may only be declared by one file of the session.
pub fn verify_unique_names(session: &Session) -> Result<(), FlowflatError> {
    let mut seen: HashMap<TypeName, &str> = HashMap::new();
    for (path, tree) in session.files() {
        for name in &tree.declaration_order {
            let qualified = TypeName::new(tree.namespace(), name);
            if let Some(previous) = seen.get(&qualified) {
                return Err(FlowflatError::DuplicateDefinition(format!(
                    "Type {} is defined in both {} and {}",
                    quote(&qualified.to_string()),
                    quote(previous),
                    quote(path)
                )));
            }
            seen.insert(qualified, path);
        }
    }
    Ok(())
}

/// Checks one file: root types, then unions, then struct fields, then table
/// fields, then whatever metadata is left.
pub fn verify_file(ctx: &StaticContext, config: &CompilerConfig) -> Result<(), FlowflatError> {
    let tree = ctx.current;

    for root in &tree.root_types {
        match ctx.resolve(root) {
            Some((_, TypeDecl::Table(_))) => {}
            Some((_, other)) => {
                return Err(FlowflatError::Structural(format!(
                    "Type {} was declared to be root but is a {}, not a table",
                    quote(root),
                    other.kind_name()
                )))
            }
            None => {
                return Err(FlowflatError::TypeNotFound(format!(
                    "Type {} was declared to be root but doesn't exist",
                    quote(root)
                )))
            }
        }
    }

    let discriminant = config.discriminant_type()?;
    let max_members = discriminant
        .integer_range()
        .map(|(_, max)| max as usize)
        .unwrap_or(usize::MAX);
    for (name, u) in &tree.unions {
        if u.members.len() > max_members {
            return Err(FlowflatError::InvalidValue(format!(
                "Union {} has {} members but a {} discriminant holds at most {}",
                quote(name),
                u.members.len(),
                discriminant,
                max_members
            )));
        }
        for member in &u.members {
            match ctx.resolve(member) {
                Some((_, TypeDecl::Table(_))) => {}
                Some((_, other)) => {
                    return Err(FlowflatError::Structural(format!(
                        "Type {} was used in union {} but is a {}, not a table",
                        quote(member),
                        quote(name),
                        other.kind_name()
                    )))
                }
                None => {
                    return Err(FlowflatError::TypeNotFound(format!(
                        "Type {} was used in union {} but doesn't exist",
                        quote(member),
                        quote(name)
                    )))
                }
            }
        }
        verify_declaration_metadata(ctx, "union", name, &u.metadata)?;
    }

    for (name, s) in &tree.structs {
        for field in &s.fields {
            verify_field(ctx, true, name, field)?;
        }
        verify_declaration_metadata(ctx, "struct", name, &s.metadata)?;
    }

    for (name, t) in &tree.tables {
        for field in &t.fields {
            verify_field(ctx, false, name, field)?;
        }
        verify_declaration_metadata(ctx, "table", name, &t.metadata)?;
    }

    for (name, e) in &tree.enums {
        verify_declaration_metadata(ctx, "enum", name, &e.metadata)?;
    }

    Ok(())
}

fn verify_field(
    ctx: &StaticContext,
    is_struct: bool,
    owner: &str,
    field: &Field,
) -> Result<(), FlowflatError> {
    let kind = if is_struct { "struct" } else { "table" };
    let location = format!("Field {} in {} {}", quote(&field.name), kind, quote(owner));

    let decl = match ctx.resolve(&field.type_name) {
        Some((_, decl)) => decl,
        None => {
            return Err(FlowflatError::TypeNotFound(format!(
                "{} {} defines field {} of type {}, but {} can't be found",
                if is_struct { "Struct" } else { "Table" },
                quote(owner),
                quote(&field.name),
                field.type_literal(),
                quote(&field.type_name)
            )))
        }
    };

    if let Some(default) = &field.default_value {
        if field.is_array {
            return Err(FlowflatError::TypeCompatibility(format!(
                "{}: Can't assign value to array type {}",
                location,
                field.type_literal()
            )));
        }
        match decl {
            TypeDecl::Enum(e) => {
                let known = match default {
                    Literal::Ident(identifier) => e.value_of(identifier).is_some(),
                    _ => false,
                };
                if !known {
                    return Err(FlowflatError::TypeCompatibility(format!(
                        "{}: invalid enum value {}, possible values are: [{}]",
                        location,
                        quote(&default.to_string()),
                        e.identifiers().join(", ")
                    )));
                }
            }
            TypeDecl::Primitive(p) => {
                if !literal_matches(p, default) {
                    return Err(FlowflatError::TypeCompatibility(format!(
                        "{}: {} is not a valid {} value",
                        location,
                        quote(&default.to_string()),
                        p
                    )));
                }
            }
            _ => {
                return Err(FlowflatError::TypeCompatibility(format!(
                    "{}: Can't assign value to user defined type {}",
                    location,
                    field.type_literal()
                )))
            }
        }
    }

    if is_struct {
        let fixed_size = !field.is_array
            && match decl {
                TypeDecl::Primitive(p) => p.is_scalar(),
                TypeDecl::Enum(_) | TypeDecl::Struct(_) => true,
                TypeDecl::Union(_) | TypeDecl::Table(_) => false,
            };
        if !fixed_size {
            return Err(FlowflatError::Structural(format!(
                "{}: structs can only hold scalars, enums and structs, not {}",
                location,
                field.type_literal()
            )));
        }
    }

    for metadata in &field.metadata {
        match metadata {
            Metadata::Deprecated if is_struct => {
                return Err(FlowflatError::Structural(format!(
                    "{}: struct fields can't be deprecated",
                    location
                )))
            }
            Metadata::Required => {
                let scalar = !field.is_array
                    && match decl {
                        TypeDecl::Primitive(p) => p.is_scalar(),
                        TypeDecl::Enum(_) => true,
                        _ => false,
                    };
                if is_struct || scalar {
                    return Err(FlowflatError::TypeCompatibility(format!(
                        "{}: only non-scalar table fields can be required",
                        location
                    )));
                }
            }
            Metadata::ForceAlign(_) => {
                return Err(FlowflatError::Structural(format!(
                    "{}: force_align only applies to structs",
                    location
                )))
            }
            Metadata::User { name, .. } => verify_attribute_declared(ctx, name, &location)?,
            _ => {}
        }
    }

    Ok(())
}

fn verify_declaration_metadata(
    ctx: &StaticContext,
    kind: &str,
    owner: &str,
    metadata: &[Metadata],
) -> Result<(), FlowflatError> {
    let location = format!("{} {}", kind, quote(owner));
    for entry in metadata {
        match entry {
            Metadata::ForceAlign(n) => {
                if kind != "struct" {
                    return Err(FlowflatError::Structural(format!(
                        "{}: force_align only applies to structs",
                        location
                    )));
                }
                if !n.is_power_of_two() || *n > MAX_FORCE_ALIGN {
                    return Err(FlowflatError::InvalidValue(format!(
                        "{}: force_align must be a power of two up to {}, found {}",
                        location, MAX_FORCE_ALIGN, n
                    )));
                }
            }
            Metadata::User { name, .. } => verify_attribute_declared(ctx, name, &location)?,
            _ => {}
        }
    }
    Ok(())
}

fn verify_attribute_declared(ctx: &StaticContext, name: &str, location: &str) -> Result<(), FlowflatError> {
    let declared = ctx.current.attributes.contains(name)
        || ctx.session.files().any(|(_, tree)| tree.attributes.contains(name));
    if !declared {
        return Err(FlowflatError::UnknownAttribute(format!(
            "{} uses attribute {}, which was never declared",
            location,
            quote(name)
        )));
    }
    Ok(())
}

/// Whether `literal` is a valid default for a field of type `primitive`.
pub fn literal_matches(primitive: PrimitiveType, literal: &Literal) -> bool {
    match (primitive.type_class(), literal) {
        (TypeClass::Bool, Literal::Bool(_)) => true,
        (TypeClass::Int | TypeClass::Char, Literal::Integer(n)) => primitive
            .integer_range()
            .map(|(min, max)| *n >= min && *n <= max)
            .unwrap_or(false),
        (TypeClass::Float, Literal::Integer(_)) => true,
        (TypeClass::Float, Literal::Float(x)) => x.is_finite(),
        (TypeClass::Float, Literal::Ident(s)) => matches!(s.as_str(), "nan" | "inf" | "infinity"),
        (TypeClass::String, Literal::String(_)) => true,
        _ => false,
    }
}
