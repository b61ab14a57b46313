use flowflat_schema::PrimitiveType;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::{
    config::CompilerConfig,
    error::FlowflatError,
    ir::{lower_session, Declaration},
    layout::{resolve_layouts, SerializationInfo},
    order::establish_order,
    resolver::StaticContext,
    session::Session,
    types::TypeName,
    utils::quote,
    verifier::verify_session,
};

/// A resolved declaration together with its computed layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledType {
    pub declaration: Declaration,
    pub layout:      SerializationInfo,
}

/// What a code generator needs to know about one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledFile {
    pub path:            String,
    pub namespace:       Vec<String>,
    pub includes:        Vec<String>,
    pub root_types:      Vec<TypeName>,
    pub file_identifier: Option<String>,
    pub file_extension:  Option<String>,
    /// The session emission order restricted to this file's declarations.
    pub order:           Vec<TypeName>,
}

/// The resolved, validated, ordered and laid out form of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledSession {
    pub union_discriminant: PrimitiveType,
    pub order:              Vec<TypeName>,
    /// Every declaration, in emission order.
    pub types:              IndexMap<TypeName, CompiledType>,
    pub files:              Vec<CompiledFile>,
}

impl CompiledSession {
    pub fn get(&self, name: &TypeName) -> Option<&CompiledType> {
        self.types.get(name)
    }

    pub fn layout(&self, name: &TypeName) -> Option<&SerializationInfo> {
        self.types.get(name).map(|t| &t.layout)
    }

    pub fn file(&self, path: &str) -> Option<&CompiledFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Runs every phase over a fully registered session. The first error stops
/// the whole compilation.
pub fn compile_session(session: &Session, config: &CompilerConfig) -> Result<CompiledSession, FlowflatError> {
    let discriminant = config.discriminant_type()?;

    verify_session(session, config)?;
    let mut declarations = lower_session(session)?;
    let order = establish_order(&declarations)?;
    let mut layouts = resolve_layouts(&declarations, &order, discriminant)?;

    let mut types = IndexMap::with_capacity(order.len());
    for name in &order {
        let missing = || FlowflatError::Internal(format!("{} lost during compilation", quote(&name.to_string())));
        let declaration = declarations.shift_remove(name).ok_or_else(missing)?;
        let layout = layouts.shift_remove(name).ok_or_else(missing)?;
        types.insert(name.clone(), CompiledType { declaration, layout });
    }

    let mut files = Vec::with_capacity(session.len());
    for (path, tree) in session.files() {
        let ctx = StaticContext::new(session, tree);
        let own: IndexSet<TypeName> = tree
            .declaration_order
            .iter()
            .map(|name| TypeName::new(tree.namespace(), name))
            .collect();
        files.push(CompiledFile {
            path:            path.to_string(),
            namespace:       tree.namespace().to_vec(),
            includes:        tree.includes.clone(),
            root_types:      tree
                .root_types
                .iter()
                .map(|root| ctx.qualified(root))
                .collect::<Result<_, _>>()?,
            file_identifier: tree.file_identifier.clone(),
            file_extension:  tree.file_extension.clone(),
            order:           order.iter().filter(|n| own.contains(*n)).cloned().collect(),
        });
    }

    log::debug!("compiled {} types from {} files", types.len(), files.len());
    Ok(CompiledSession {
        union_discriminant: discriminant,
        order,
        types,
        files,
    })
}

/// Compiles a single schema text as a one-file session.
pub fn compile_schema(text: &str) -> Result<CompiledSession, FlowflatError> {
    let mut session = Session::new();
    session.register_source("schema.fbs", text)?;
    session.compile(&CompilerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_compile_schema_orders_and_lays_out() {
        let compiled = compile_schema(
            "enum Kind : byte { A, B } table Line { a: Point; b: Point; kind: Kind; } \
             table Point { x: float; y: float; } root_type Line;",
        )
        .unwrap();

        let order: Vec<String> = compiled.order.iter().map(|n| n.to_string()).collect();
        assert_eq!(order, vec!["Kind", "Point", "Line"]);
        let keys: Vec<String> = compiled.types.keys().map(|n| n.to_string()).collect();
        assert_eq!(keys, order);

        let line = compiled.layout(&TypeName::parse("Line")).unwrap();
        let offsets = line.field_offsets.as_ref().unwrap();
        assert_eq!(offsets.get(&0), Some(&4));
        assert_eq!(offsets.get(&1), Some(&8));
        assert_eq!(offsets.get(&2), Some(&12));

        let file = compiled.file("schema.fbs").unwrap();
        assert_eq!(file.root_types, vec![TypeName::parse("Line")]);
        assert_eq!(file.order, compiled.order);
    }

    #[test]
    fn test_files_keep_their_own_slice_of_the_order() {
        let mut session = Session::new();
        session
            .register_source("game.fbs", "namespace game; table Unit { pos: geo.Vec2; } root_type Unit;")
            .unwrap();
        session
            .register_source("geo.fbs", "namespace geo; struct Vec2 { x: float; y: float; }")
            .unwrap();
        let compiled = session.compile(&CompilerConfig::default()).unwrap();

        let game = compiled.file("game.fbs").unwrap();
        assert_eq!(game.namespace, vec!["game".to_string()]);
        assert_eq!(game.order, vec![TypeName::parse("game.Unit")]);
        assert_eq!(game.root_types, vec![TypeName::parse("game.Unit")]);
        let geo = compiled.file("geo.fbs").unwrap();
        assert_eq!(geo.order, vec![TypeName::parse("geo.Vec2")]);
        assert_eq!(
            compiled.order,
            vec![TypeName::parse("geo.Vec2"), TypeName::parse("game.Unit")]
        );
    }

    #[test]
    fn test_first_error_stops_compilation() {
        let err = compile_schema("table T { a: Missing; } struct S { s: S; }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeResolution);

        let err = compile_schema("struct S { s: S; }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_bad_discriminant_is_rejected_up_front() {
        let mut session = Session::new();
        session.register_source("f.fbs", "table T { x: int; }").unwrap();
        let err = session
            .compile(&CompilerConfig::new().union_discriminant("float"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_compiled_session_serializes() {
        let compiled = compile_schema("table A { x: int = 3; } union U { A }").unwrap();
        let json = serde_json::to_value(&compiled).unwrap();
        assert_eq!(json["order"][0], "A");
        assert_eq!(json["types"]["A"]["declaration"]["kind"], "table");
        assert_eq!(json["types"]["A"]["layout"]["field_offsets"]["0"], 4);
        assert_eq!(json["types"]["U"]["layout"]["size"], 1);
        assert_eq!(json["union_discriminant"], "ubyte");
    }
}
