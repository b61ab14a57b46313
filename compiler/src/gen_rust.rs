use flowflat_schema::{vtable_size, PrimitiveType, TypeClass};

use crate::{
    ast::Literal,
    compiler::CompiledSession,
    config::RustGenConfig,
    error::FlowflatError,
    ir::{Declaration, IrCompound, IrEnum, IrField, IrUnion, TypeKind},
    layout::SerializationInfo,
    types::TypeName,
    utils::quote,
};

/// Converts a name to PascalCase.
/// Underscored names are split into words; an all-caps name such as `SIGNAL`
/// keeps only its first letter upper case. Anything else only gets its first
/// letter raised.
fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
            Some(first) => first.to_uppercase().chain(chars).collect(),
        }
    }

    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| capitalize(word, true))
            .collect()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a name to snake_case, keeping acronyms together
/// (`sessionID` becomes `session_id`).
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let boundary = i > 0
                && (!chars[i - 1].is_uppercase() || chars.get(i + 1).is_some_and(|n| n.is_lowercase()));
            if boundary && !snake.ends_with('_') {
                snake.push('_');
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

fn escape_rust_keyword(s: &str) -> String {
    const KEYWORDS: [&str; 38] = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn",
        "else", "enum", "extern", "false", "fn", "for", "if", "impl", "in",
        "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
        "self", "Self", "static", "struct", "super", "trait", "true", "type",
        "unsafe", "use", "where", "while",
    ];
    if KEYWORDS.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

fn type_ident(name: &str) -> String {
    escape_rust_keyword(&to_pascal_case(name))
}

fn field_ident(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

fn module_ident(segment: &str) -> String {
    escape_rust_keyword(&to_snake_case(segment))
}

fn const_ident(name: &str) -> String {
    to_snake_case(name).to_uppercase()
}

/// Path to `target` as seen from the module of `namespace`. Types of other
/// namespaces are addressed from the crate root.
fn type_path(target: &TypeName, namespace: &[String]) -> String {
    let local = type_ident(&target.name);
    if target.path.as_slice() == namespace {
        return local;
    }
    let mut segments = vec!["crate".to_string()];
    segments.extend(target.path.iter().map(|s| module_ident(s)));
    segments.push(local);
    segments.join("::")
}

fn derives(base: &[&str], with_default: bool, config: &RustGenConfig) -> String {
    let mut traits = base.to_vec();
    if with_default {
        traits.push("Default");
    }
    if config.serde_derives {
        traits.push("Serialize");
    }
    format!("#[derive({})]", traits.join(", "))
}

/// Generates Rust declarations for every type of the compiled file `path`,
/// wrapped in one module per namespace segment.
pub fn compile_session_to_rust(
    compiled: &CompiledSession,
    path: &str,
    config: &RustGenConfig,
) -> Result<String, FlowflatError> {
    let file = compiled.file(path).ok_or_else(|| {
        FlowflatError::InvalidValue(format!("{} is not part of the compiled session", quote(path)))
    })?;
    let namespace = file.namespace.as_slice();
    let mut rust_code: Vec<String> = Vec::new();

    rust_code.push(format!("// Generated by flowflat from {}. Do not edit.", path));
    rust_code.push(String::new());

    for segment in namespace {
        rust_code.push(format!("pub mod {} {{", module_ident(segment)));
    }
    if config.serde_derives {
        rust_code.push("use serde::Serialize;".to_string());
        rust_code.push(String::new());
    }

    if let Some(identifier) = &file.file_identifier {
        rust_code.push(format!("pub const FILE_IDENTIFIER: &str = {:?};", identifier));
    }
    if let Some(extension) = &file.file_extension {
        rust_code.push(format!("pub const FILE_EXTENSION: &str = {:?};", extension));
    }
    if file.file_identifier.is_some() || file.file_extension.is_some() {
        rust_code.push(String::new());
    }

    for name in &file.order {
        let compiled_type = compiled.get(name).ok_or_else(|| {
            FlowflatError::Internal(format!("{} is ordered but was never compiled", quote(&name.to_string())))
        })?;
        let layout = &compiled_type.layout;
        rust_code.push(match &compiled_type.declaration {
            Declaration::Enum(e)   => generate_enum(e, config),
            Declaration::Union(u)  => generate_union(u, namespace, layout, compiled.union_discriminant, config)?,
            Declaration::Struct(s) => generate_struct(s, namespace, layout, config)?,
            Declaration::Table(t)  => generate_table(t, namespace, layout, config)?,
        });
    }

    for _ in namespace {
        rust_code.push("}".to_string());
    }

    Ok(rust_code.join("\n"))
}

fn generate_enum(e: &IrEnum, config: &RustGenConfig) -> String {
    let enum_name = type_ident(&e.name.name);
    let variants: Vec<String> = e
        .values
        .iter()
        .map(|v| format!("    {} = {},", type_ident(&v.name), v.value))
        .collect();

    let mut code = format!(
        "{}\n#[repr({})]\npub enum {} {{\n{}\n}}\n",
        derives(&["Debug", "Clone", "Copy", "PartialEq", "Eq", "Hash"], false, config),
        e.underlying.native_name(),
        enum_name,
        variants.join("\n")
    );

    // flatbuffers readers treat a missing enum field as 0
    if let Some(default) = e.values.iter().find(|v| v.value == 0).or_else(|| e.values.first()) {
        code.push_str(&format!(
            "\nimpl Default for {} {{\n    fn default() -> Self {{\n        {}::{}\n    }}\n}}\n",
            enum_name,
            enum_name,
            type_ident(&default.name)
        ));
    }
    code
}

/// Variant names for the members of `u`. Members whose local names collide
/// are prefixed with their namespace segments (`a.T` becomes `AT`).
fn union_variants(u: &IrUnion) -> Result<Vec<String>, FlowflatError> {
    let locals: Vec<String> = u.members.iter().map(|m| type_ident(&m.name)).collect();
    let variants: Vec<String> = u
        .members
        .iter()
        .zip(&locals)
        .map(|(member, local)| {
            if locals.iter().filter(|l| *l == local).count() > 1 {
                let mut qualified: String = member.path.iter().map(|s| to_pascal_case(s)).collect();
                qualified.push_str(&to_pascal_case(&member.name));
                escape_rust_keyword(&qualified)
            } else {
                local.clone()
            }
        })
        .collect();

    for (index, variant) in variants.iter().enumerate() {
        if variant == "None" || variants[..index].contains(variant) {
            return Err(FlowflatError::InvalidValue(format!(
                "Union {} has no distinct Rust variant name for member {}",
                quote(&u.name.to_string()),
                quote(&u.members[index].to_string())
            )));
        }
    }
    Ok(variants)
}

fn generate_union(
    u: &IrUnion,
    namespace: &[String],
    layout: &SerializationInfo,
    discriminant: PrimitiveType,
    config: &RustGenConfig,
) -> Result<String, FlowflatError> {
    let union_name = type_ident(&u.name.name);
    let mut variants = vec!["    #[default]\n    None,".to_string()];
    let mut tags = vec!["            Self::None => 0,".to_string()];
    for (index, (member, variant)) in u.members.iter().zip(union_variants(u)?).enumerate() {
        variants.push(format!("    {}({}),", variant, type_path(member, namespace)));
        tags.push(format!("            Self::{}(_) => {},", variant, index + 1));
    }

    let mut consts = Vec::new();
    if config.emit_layout_constants {
        consts.push(format!("    pub const SIZE: usize = {};", layout.size));
        consts.push(format!("    pub const ALIGN: usize = {};", layout.alignment));
        consts.push(String::new());
    }

    Ok(format!(
        "{}\npub enum {} {{\n{}\n}}\n\nimpl {} {{\n{}    pub fn tag(&self) -> {} {{\n        match self {{\n{}\n        }}\n    }}\n}}\n",
        derives(&["Debug", "Clone", "PartialEq"], true, config),
        union_name,
        variants.join("\n"),
        union_name,
        consts.iter().map(|c| format!("{}\n", c)).collect::<String>(),
        discriminant.native_name(),
        tags.join("\n")
    ))
}

fn generate_struct(
    s: &IrCompound,
    namespace: &[String],
    layout: &SerializationInfo,
    config: &RustGenConfig,
) -> Result<String, FlowflatError> {
    let struct_name = type_ident(&s.name.name);
    let has_defaults = s.fields.iter().any(|f| f.default_value.is_some());

    let fields: Vec<String> = s
        .fields
        .iter()
        .map(|f| format!("    pub {}: {},", field_ident(&f.name), base_type(f, namespace)))
        .collect();

    let mut code = format!(
        "{}\n#[repr(C, align({}))]\npub struct {} {{\n{}\n}}\n",
        derives(&["Debug", "Clone", "Copy", "PartialEq"], !has_defaults, config),
        layout.alignment,
        struct_name,
        fields.join("\n")
    );

    if has_defaults {
        let mut assignments = Vec::new();
        for field in &s.fields {
            let value = match &field.default_value {
                Some(literal) => default_expr(field, literal, namespace)?,
                None => "Default::default()".to_string(),
            };
            assignments.push(format!("            {}: {},", field_ident(&field.name), value));
        }
        code.push_str(&default_impl(&struct_name, &assignments));
    }

    if config.emit_layout_constants {
        code.push_str(&format!(
            "\nimpl {} {{\n    pub const SIZE: usize = {};\n    pub const ALIGN: usize = {};\n}}\n",
            struct_name, layout.size, layout.alignment
        ));
        code.push_str(&format!(
            "\nconst _: () = assert!(std::mem::size_of::<{}>() == {}::SIZE);\n",
            struct_name, struct_name
        ));
    }
    Ok(code)
}

fn generate_table(
    t: &IrCompound,
    namespace: &[String],
    layout: &SerializationInfo,
    config: &RustGenConfig,
) -> Result<String, FlowflatError> {
    let table_name = type_ident(&t.name.name);
    let live: Vec<(usize, &IrField)> = t
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.is_deprecated())
        .collect();
    let has_defaults = live.iter().any(|(_, f)| f.default_value.is_some());

    let fields: Vec<String> = live
        .iter()
        .map(|(_, f)| format!("    pub {}: {},", field_ident(&f.name), table_field_type(f, namespace)))
        .collect();

    let mut code = format!(
        "{}\npub struct {} {{\n{}\n}}\n",
        derives(&["Debug", "Clone", "PartialEq"], !has_defaults, config),
        table_name,
        fields.join("\n")
    );

    if has_defaults {
        let mut assignments = Vec::new();
        for (_, field) in &live {
            let value = match &field.default_value {
                Some(literal) => format!("Some({})", default_expr(field, literal, namespace)?),
                None => "Default::default()".to_string(),
            };
            assignments.push(format!("            {}: {},", field_ident(&field.name), value));
        }
        code.push_str(&default_impl(&table_name, &assignments));
    }

    if config.emit_layout_constants {
        let mut consts = vec![
            format!("    pub const SIZE: usize = {};", layout.size),
            format!("    pub const ALIGN: usize = {};", layout.alignment),
            format!("    pub const VTABLE_SIZE: usize = {};", vtable_size(t.fields.len())),
        ];
        for (index, field) in &live {
            if let Some(tag) = layout.union_tag_offsets.get(index) {
                consts.push(format!("    pub const VT_{}_TYPE: usize = {};", const_ident(&field.name), tag));
            }
            if let Some(offset) = layout.field_offsets.as_ref().and_then(|m| m.get(index)) {
                consts.push(format!("    pub const VT_{}: usize = {};", const_ident(&field.name), offset));
            }
        }
        code.push_str(&format!("\nimpl {} {{\n{}\n}}\n", table_name, consts.join("\n")));
    }
    Ok(code)
}

fn default_impl(type_name: &str, assignments: &[String]) -> String {
    format!(
        "\nimpl Default for {} {{\n    fn default() -> Self {{\n        Self {{\n{}\n        }}\n    }}\n}}\n",
        type_name,
        assignments.join("\n")
    )
}

/// The Rust type of one element of `field`.
fn base_type(field: &IrField, namespace: &[String]) -> String {
    match field.ty.kind {
        TypeKind::Primitive(p) => p.native_name().to_string(),
        _ => type_path(&field.ty.name, namespace),
    }
}

/// Table fields are optional; arrays become vectors and unions carry their
/// own `None` variant.
fn table_field_type(field: &IrField, namespace: &[String]) -> String {
    let base = base_type(field, namespace);
    if field.is_array {
        format!("Vec<{}>", base)
    } else if field.ty.kind == TypeKind::Union {
        base
    } else {
        format!("Option<{}>", base)
    }
}

fn default_expr(field: &IrField, literal: &Literal, namespace: &[String]) -> Result<String, FlowflatError> {
    let mismatch = || {
        FlowflatError::Internal(format!(
            "default {} of field {} survived validation",
            quote(&literal.to_string()),
            quote(&field.name)
        ))
    };
    match field.ty.kind {
        TypeKind::Enum => Ok(format!(
            "{}::{}",
            type_path(&field.ty.name, namespace),
            type_ident(&literal.to_string())
        )),
        TypeKind::Primitive(p) => match (p.type_class(), literal) {
            (TypeClass::Bool, Literal::Bool(b)) => Ok(b.to_string()),
            (TypeClass::Int | TypeClass::Char, Literal::Integer(n)) => Ok(n.to_string()),
            (TypeClass::Float, Literal::Integer(n)) => Ok(format!("{}.0", n)),
            (TypeClass::Float, Literal::Float(x)) => Ok(format!("{:?}", x)),
            (TypeClass::Float, Literal::Ident(s)) => Ok(match s.as_str() {
                "nan" => format!("{}::NAN", p.native_name()),
                _ => format!("{}::INFINITY", p.native_name()),
            }),
            (TypeClass::String, Literal::String(s)) => Ok(format!("{:?}.to_string()", s)),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}
