//! Symbol table construction: turns one parsed schema into an
//! [`ExpressionTree`], failing on the first declaration that breaks a
//! per-file rule. Nothing is resolved here; type names stay as written.

use flowflat_schema::{PrimitiveType, TypeClass, FILE_IDENTIFIER_LENGTH};
use std::collections::HashSet;

use crate::{
    ast::{
        CompoundDeclaration, Declaration, EnumDeclaration, Literal, MetadataEntry,
        SchemaDeclaration, UnionDeclaration,
    },
    error::FlowflatError,
    types::{Enum, EnumValue, ExpressionTree, Field, Metadata, Struct, Table, Union},
    utils::{dotted, quote},
};

pub const RESERVED_ATTRIBUTES: [&str; 10] = [
    "id",
    "deprecated",
    "required",
    "force_align",
    "bit_flags",
    "nested_flatbuffer",
    "flexbuffer",
    "key",
    "hash",
    "original_order",
];
pub const RESERVED_ATTRIBUTE_PREFIX: &str = "native_";

pub fn is_reserved_attribute(name: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&name) || name.starts_with(RESERVED_ATTRIBUTE_PREFIX)
}

/// Builds the symbol table of one file. Pure: it looks at nothing but `schema`,
/// so independent files can be built in any order (or in parallel).
pub fn build_expression_tree(schema: &SchemaDeclaration) -> Result<ExpressionTree, FlowflatError> {
    let mut tree = ExpressionTree::default();

    for declaration in &schema.declarations {
        match declaration {
            Declaration::Include(path) => tree.includes.push(path.clone()),
            Declaration::Namespace(path) => {
                if let Some(previous) = &tree.namespace_path {
                    return Err(FlowflatError::DuplicateDefinition(format!(
                        "Unexpected namespace declaration {}, {} was declared before",
                        quote(&dotted(path)),
                        quote(&dotted(previous))
                    )));
                }
                tree.namespace_path = Some(path.clone());
            }
            Declaration::Attribute(name) => {
                if tree.attributes.contains(name) {
                    return Err(FlowflatError::DuplicateDefinition(format!(
                        "Attribute {} defined multiple times",
                        quote(name)
                    )));
                }
                if is_reserved_attribute(name) {
                    return Err(FlowflatError::ReservedIdentifier(format!(
                        "Attribute {} is reserved",
                        quote(name)
                    )));
                }
                tree.attributes.insert(name.clone());
            }
            Declaration::RootType(name) => {
                if PrimitiveType::from_name(name).is_some() {
                    return Err(FlowflatError::Structural(format!(
                        "Primitive type {} can't be declared as root type",
                        quote(name)
                    )));
                }
                tree.root_types.insert(name.clone());
            }
            Declaration::FileExtension(extension) => {
                if let Some(previous) = &tree.file_extension {
                    return Err(FlowflatError::DuplicateDefinition(format!(
                        "Multiple file extensions {} and {}",
                        quote(previous),
                        quote(extension)
                    )));
                }
                tree.file_extension = Some(extension.clone());
            }
            Declaration::FileIdentifier(identifier) => {
                if identifier.len() != FILE_IDENTIFIER_LENGTH {
                    return Err(FlowflatError::InvalidValue(format!(
                        "File identifiers need to be exactly {} bytes long but {} is {} bytes long",
                        FILE_IDENTIFIER_LENGTH,
                        quote(identifier),
                        identifier.len()
                    )));
                }
                if let Some(previous) = &tree.file_identifier {
                    return Err(FlowflatError::DuplicateDefinition(format!(
                        "Multiple file identifiers {} and {}",
                        quote(previous),
                        quote(identifier)
                    )));
                }
                tree.file_identifier = Some(identifier.clone());
            }
            Declaration::Enum(decl) => {
                check_new_type(&tree, &decl.name)?;
                let new_enum = build_enum(decl)?;
                tree.declaration_order.push(new_enum.name.clone());
                tree.enums.insert(new_enum.name.clone(), new_enum);
            }
            Declaration::Union(decl) => {
                check_new_type(&tree, &decl.name)?;
                let new_union = build_union(decl)?;
                tree.declaration_order.push(new_union.name.clone());
                tree.unions.insert(new_union.name.clone(), new_union);
            }
            Declaration::Struct(decl) => {
                check_new_type(&tree, &decl.name)?;
                let fields = build_fields(decl, "struct")?;
                tree.declaration_order.push(decl.name.clone());
                tree.structs.insert(
                    decl.name.clone(),
                    Struct {
                        name:     decl.name.clone(),
                        line:     decl.line,
                        column:   decl.column,
                        fields,
                        metadata: build_metadata(&decl.metadata)?,
                    },
                );
            }
            Declaration::Table(decl) => {
                check_new_type(&tree, &decl.name)?;
                let fields = build_fields(decl, "table")?;
                tree.declaration_order.push(decl.name.clone());
                tree.tables.insert(
                    decl.name.clone(),
                    Table {
                        name:     decl.name.clone(),
                        line:     decl.line,
                        column:   decl.column,
                        fields,
                        metadata: build_metadata(&decl.metadata)?,
                    },
                );
            }
        }
    }

    log::debug!(
        "built symbol table for namespace {}: {} declarations",
        quote(&dotted(tree.namespace())),
        tree.declaration_order.len()
    );
    Ok(tree)
}

fn check_new_type(tree: &ExpressionTree, name: &str) -> Result<(), FlowflatError> {
    if tree.type_exists(name) {
        return Err(FlowflatError::DuplicateDefinition(format!(
            "Type {} already exists",
            quote(name)
        )));
    }
    Ok(())
}

fn build_enum(decl: &EnumDeclaration) -> Result<Enum, FlowflatError> {
    let underlying = match PrimitiveType::from_name(&decl.underlying) {
        Some(p) if matches!(p.type_class(), TypeClass::Int | TypeClass::Char) => p,
        _ => {
            return Err(FlowflatError::TypeCompatibility(format!(
                "Type {} can't be used as base for enum {}",
                quote(&decl.underlying),
                quote(&decl.name)
            )))
        }
    };
    let (min, max) = underlying.integer_range().unwrap_or((i64::MIN as i128, i64::MAX as i128));

    let mut values: Vec<EnumValue> = Vec::with_capacity(decl.values.len());
    let mut used_identifiers = HashSet::new();
    let mut used_values = HashSet::new();
    let mut last_value: i128 = -1;

    for val in &decl.values {
        if val.name.contains('.') {
            return Err(FlowflatError::InvalidValue(format!(
                "Enum {} declares qualified identifier {}",
                quote(&decl.name),
                quote(&val.name)
            )));
        }
        let value = match val.value {
            Some(explicit) => explicit,
            None => last_value.checked_add(1).ok_or_else(|| {
                FlowflatError::InvalidValue(format!(
                    "Enum {}: value of {} overflows",
                    quote(&decl.name),
                    quote(&val.name)
                ))
            })?,
        };
        last_value = value;

        if used_values.contains(&value) {
            return Err(FlowflatError::InvalidValue(format!(
                "Duplicate value for enum {}: {}",
                quote(&decl.name),
                value
            )));
        }
        if used_identifiers.contains(val.name.as_str()) {
            return Err(FlowflatError::InvalidValue(format!(
                "Duplicate identifier for enum {}: {}",
                quote(&decl.name),
                quote(&val.name)
            )));
        }
        if value < min || value > max {
            return Err(FlowflatError::InvalidValue(format!(
                "Enum {}: value {} of {} does not fit in {}",
                quote(&decl.name),
                value,
                quote(&val.name),
                underlying
            )));
        }
        used_values.insert(value);
        used_identifiers.insert(val.name.as_str());
        values.push(EnumValue {
            name: val.name.clone(),
            value,
        });
    }

    Ok(Enum {
        name: decl.name.clone(),
        underlying,
        values,
        metadata: build_metadata(&decl.metadata)?,
    })
}

fn build_union(decl: &UnionDeclaration) -> Result<Union, FlowflatError> {
    let mut members: Vec<String> = Vec::with_capacity(decl.members.len());
    for member in &decl.members {
        if let Some(value) = member.value {
            return Err(FlowflatError::InvalidValue(format!(
                "Can't assign values to union members (union={}, member={}, value={})",
                quote(&decl.name),
                quote(&member.name),
                value
            )));
        }
        if members.contains(&member.name) {
            return Err(FlowflatError::DuplicateDefinition(format!(
                "Union {} lists member {} twice",
                quote(&decl.name),
                quote(&member.name)
            )));
        }
        members.push(member.name.clone());
    }
    Ok(Union {
        name: decl.name.clone(),
        members,
        metadata: build_metadata(&decl.metadata)?,
    })
}

fn build_fields(decl: &CompoundDeclaration, kind: &str) -> Result<Vec<Field>, FlowflatError> {
    let mut fields: Vec<Field> = Vec::with_capacity(decl.fields.len());
    for field in &decl.fields {
        if fields.iter().any(|f| f.name == field.name) {
            return Err(FlowflatError::DuplicateDefinition(format!(
                "Duplicate field {} in {} {}",
                quote(&field.name),
                kind,
                quote(&decl.name)
            )));
        }
        fields.push(Field {
            name:          field.name.clone(),
            line:          field.line,
            column:        field.column,
            type_name:     field.type_name.clone(),
            is_array:      field.is_array,
            default_value: field.default_value.clone(),
            metadata:      build_metadata(&field.metadata)?,
        });
    }
    Ok(fields)
}

/// Maps raw `(name, value)` entries onto [`Metadata`].
pub fn build_metadata(entries: &[MetadataEntry]) -> Result<Vec<Metadata>, FlowflatError> {
    entries
        .iter()
        .map(|entry| {
            Ok(match entry.name.as_str() {
                "deprecated" => Metadata::Deprecated,
                "required"   => Metadata::Required,
                "key"        => Metadata::Key,
                "force_align" => match entry.value {
                    Some(Literal::Integer(n)) if n > 0 && n <= i128::from(u64::MAX) => Metadata::ForceAlign(n as u64),
                    _ => {
                        return Err(FlowflatError::InvalidValue(format!(
                            "force_align needs a positive integer, found {}",
                            entry
                                .value
                                .as_ref()
                                .map(|v| quote(&v.to_string()))
                                .unwrap_or_else(|| "nothing".to_string())
                        )))
                    }
                },
                name if is_reserved_attribute(name) => Metadata::Builtin {
                    name:  name.to_string(),
                    value: entry.value.clone(),
                },
                name => Metadata::User {
                    name:  name.to_string(),
                    value: entry.value.clone(),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::parse_schema;
    use crate::tokenizer::tokenize_schema;

    fn build(text: &str) -> Result<ExpressionTree, FlowflatError> {
        let schema = parse_schema(&tokenize_schema(text).unwrap()).unwrap();
        build_expression_tree(&schema)
    }

    fn kind_of(text: &str) -> ErrorKind {
        build(text).unwrap_err().kind()
    }

    #[test]
    fn test_enum_values_are_auto_assigned() {
        let tree = build("enum Color : int { Red, Green = 5, Blue }").unwrap();
        let color = &tree.enums["Color"];
        let values: Vec<_> = color.values.iter().map(|v| (v.name.as_str(), v.value)).collect();
        assert_eq!(values, vec![("Red", 0), ("Green", 5), ("Blue", 6)]);
        assert_eq!(color.underlying, PrimitiveType::Int);
    }

    #[test]
    fn test_enum_auto_value_follows_negative_explicit_value() {
        let tree = build("enum Level : byte { Low = -2, Mid, High }").unwrap();
        let values: Vec<_> = tree.enums["Level"].values.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![-2, -1, 0]);
    }

    #[test]
    fn test_ulong_enum_values_above_the_signed_range() {
        let tree = build("enum Mask : ulong { High = 18446744073709551614, Top }").unwrap();
        let values: Vec<_> = tree.enums["Mask"].values.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![u64::MAX as i128 - 1, u64::MAX as i128]);

        assert_eq!(kind_of("enum Mask : ulong { Top = 18446744073709551615, Over }"), ErrorKind::Value);
    }

    #[test]
    fn test_enum_rejections() {
        assert_eq!(kind_of("enum E : float { A }"), ErrorKind::TypeCompatibility);
        assert_eq!(kind_of("enum E : string { A }"), ErrorKind::TypeCompatibility);
        assert_eq!(kind_of("enum E : Other { A }"), ErrorKind::TypeCompatibility);
        assert_eq!(kind_of("enum E : int { A = 1, B = 0, C }"), ErrorKind::Value);
        assert_eq!(kind_of("enum E : int { A, B, A }"), ErrorKind::Value);
        assert_eq!(kind_of("enum E : ubyte { A = 255, B }"), ErrorKind::Value);
        assert_eq!(kind_of("enum E : ubyte { A = -1 }"), ErrorKind::Value);
    }

    #[test]
    fn test_duplicate_type_names_in_one_file() {
        assert_eq!(
            kind_of("table T { a: int; } struct T { b: int; }"),
            ErrorKind::DuplicateDefinition
        );
        assert_eq!(kind_of("enum T : int { A } union T { X }"), ErrorKind::DuplicateDefinition);
        assert_eq!(kind_of("table int { a: int; }"), ErrorKind::DuplicateDefinition);
        assert_eq!(kind_of("table T { a: int; a: float; }"), ErrorKind::DuplicateDefinition);
    }

    #[test]
    fn test_header_rules() {
        assert_eq!(kind_of("namespace a; namespace b;"), ErrorKind::DuplicateDefinition);
        assert_eq!(kind_of("attribute foo; attribute foo;"), ErrorKind::DuplicateDefinition);
        assert_eq!(kind_of("attribute key;"), ErrorKind::ReservedIdentifier);
        assert_eq!(kind_of("attribute native_inline;"), ErrorKind::ReservedIdentifier);
        assert_eq!(kind_of("root_type int;"), ErrorKind::Structural);
        assert_eq!(kind_of(r#"file_identifier "ABC";"#), ErrorKind::Value);
        assert_eq!(kind_of(r#"file_identifier "ABCDE";"#), ErrorKind::Value);
        assert_eq!(
            kind_of(r#"file_identifier "ABCD"; file_identifier "EFGH";"#),
            ErrorKind::DuplicateDefinition
        );
        assert_eq!(
            kind_of(r#"file_extension "a"; file_extension "b";"#),
            ErrorKind::DuplicateDefinition
        );
    }

    #[test]
    fn test_union_rules() {
        assert_eq!(kind_of("union U { A = 1 }"), ErrorKind::Value);
        assert_eq!(kind_of("union U { A, A }"), ErrorKind::DuplicateDefinition);
        let tree = build("union U { A, b.B }").unwrap();
        assert_eq!(tree.unions["U"].members, vec!["A".to_string(), "b.B".to_string()]);
    }

    #[test]
    fn test_header_is_recorded() {
        let tree = build(
            r#"
            include "other.fbs";
            namespace a.b;
            attribute priority;
            file_identifier "ABCD";
            file_extension "bin";
            root_type Later;
            table Later { x: int; }
            "#,
        )
        .unwrap();
        assert_eq!(tree.namespace(), ["a".to_string(), "b".to_string()]);
        assert_eq!(tree.includes, vec!["other.fbs".to_string()]);
        assert!(tree.attributes.contains("priority"));
        assert!(tree.root_types.contains("Later"));
        assert_eq!(tree.file_identifier.as_deref(), Some("ABCD"));
        assert_eq!(tree.file_extension.as_deref(), Some("bin"));
        assert_eq!(tree.declaration_order, vec!["Later".to_string()]);
    }

    #[test]
    fn test_fields_keep_raw_literals_and_metadata() {
        let tree = build(
            "attribute priority; struct S (force_align: 16) { a: int = 5 (priority: 1); } table T { s: [S] (deprecated); }",
        )
        .unwrap();
        let s = &tree.structs["S"];
        assert_eq!(s.force_align(), Some(16));
        assert_eq!(s.fields[0].default_value, Some(Literal::Integer(5)));
        assert_eq!(
            s.fields[0].metadata,
            vec![Metadata::User { name: "priority".into(), value: Some(Literal::Integer(1)) }]
        );
        let t = &tree.tables["T"];
        assert!(t.fields[0].is_array);
        assert!(t.fields[0].is_deprecated());
        assert_eq!(t.fields[0].type_literal(), "[S]");
    }

    #[test]
    fn test_force_align_needs_a_positive_integer() {
        assert_eq!(kind_of("struct S (force_align) { a: int; }"), ErrorKind::Value);
        assert_eq!(kind_of("struct S (force_align: 0) { a: int; }"), ErrorKind::Value);
    }
}
