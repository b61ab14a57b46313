//! Name resolution.
//!
//! A type name used inside a file is resolved against, in order:
//!
//! 1. the primitive catalog (primitives are visible in every namespace),
//! 2. the file's own declarations, for unqualified names,
//! 3. a candidate list built from the file's namespace: with namespace
//!    `a.b`, a reference `x.T` tries `a.b.x.T`, then `a.x.T`, then `x.T`.
//!
//! Each candidate is looked up in every registered file declaring exactly
//! that namespace, in registration order. The first hit wins.

use flowflat_schema::PrimitiveType;

use crate::{
    error::FlowflatError,
    session::Session,
    types::{ExpressionTree, TypeDecl, TypeName},
    utils::quote,
};

#[derive(Debug, Clone, Copy)]
pub struct StaticContext<'s> {
    pub session: &'s Session,
    pub current: &'s ExpressionTree,
}

impl<'s> StaticContext<'s> {
    pub fn new(session: &'s Session, current: &'s ExpressionTree) -> Self {
        StaticContext { session, current }
    }

    pub fn resolve(&self, name: &str) -> Option<(TypeName, TypeDecl<'s>)> {
        let namespace = self.current.namespace();

        if let Some(primitive) = PrimitiveType::from_name(name) {
            return Some((TypeName::new(namespace, name), TypeDecl::Primitive(primitive)));
        }

        if !name.contains('.') {
            if let Some(decl) = self.current.find_type(name) {
                return Some((TypeName::new(namespace, name), decl));
            }
        }

        for candidate in self.candidates(name) {
            log::trace!("resolving {}: trying {}", quote(name), quote(&candidate.to_string()));
            if let Some(decl) = self.lookup(&candidate) {
                return Some((candidate, decl));
            }
        }
        None
    }

    /// Qualified names `name` may refer to, most specific first.
    pub fn candidates(&self, name: &str) -> Vec<TypeName> {
        let reference = TypeName::parse(name);
        let namespace = self.current.namespace();
        (0..=namespace.len())
            .rev()
            .map(|depth| {
                let mut path = namespace[..depth].to_vec();
                path.extend(reference.path.iter().cloned());
                TypeName {
                    path,
                    name: reference.name.clone(),
                }
            })
            .collect()
    }

    fn lookup(&self, candidate: &TypeName) -> Option<TypeDecl<'s>> {
        let current = self.current;
        if current.namespace() == candidate.path.as_slice() {
            if let Some(decl) = current.find_type(&candidate.name) {
                return Some(decl);
            }
        }
        self.session
            .files()
            .filter(|(_, tree)| tree.namespace() == candidate.path.as_slice())
            .find_map(|(_, tree)| tree.find_type(&candidate.name))
    }

    pub fn qualified(&self, name: &str) -> Result<TypeName, FlowflatError> {
        self.resolve(name)
            .map(|(qualified, _)| qualified)
            .ok_or_else(|| FlowflatError::TypeNotFound(quote(name)))
    }

    pub fn type_by_name(&self, name: &str) -> Result<TypeDecl<'s>, FlowflatError> {
        self.resolve(name)
            .map(|(_, decl)| decl)
            .ok_or_else(|| FlowflatError::TypeNotFound(quote(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn session(files: &[(&str, &str)]) -> Session {
        let mut session = Session::new();
        for (path, text) in files {
            session.register_source(*path, text).unwrap();
        }
        session
    }

    #[test]
    fn test_primitives_resolve_in_the_current_namespace() {
        let s = session(&[("a.fbs", "namespace a.b; table T { x: int; }")]);
        let ctx = s.context("a.fbs").unwrap();
        let (name, decl) = ctx.resolve("int").unwrap();
        assert_eq!(name.to_string(), "a.b.int");
        assert_eq!(decl, TypeDecl::Primitive(PrimitiveType::Int));
    }

    #[test]
    fn test_current_namespace_wins_over_global() {
        let s = session(&[
            ("global.fbs", "table T { g: int; }"),
            ("ns.fbs", "namespace a.b; table T { n: int; }"),
        ]);
        let ctx = s.context("ns.fbs").unwrap();
        let (name, decl) = ctx.resolve("T").unwrap();
        assert_eq!(name.to_string(), "a.b.T");
        match decl {
            TypeDecl::Table(t) => assert_eq!(t.fields[0].name, "n"),
            other => panic!("expected a table, got {:?}", other),
        }

        let global = s.context("global.fbs").unwrap();
        assert_eq!(global.qualified("T").unwrap().to_string(), "T");
    }

    #[test]
    fn test_same_namespace_in_another_file() {
        let s = session(&[
            ("one.fbs", "namespace a.b; table One { x: int; }"),
            ("two.fbs", "namespace a.b; table Two { one: One; }"),
        ]);
        let ctx = s.context("two.fbs").unwrap();
        assert_eq!(ctx.qualified("One").unwrap().to_string(), "a.b.One");
    }

    #[test]
    fn test_parent_namespaces_then_global() {
        let s = session(&[
            ("parent.fbs", "namespace a; table P { x: int; }"),
            ("global.fbs", "table G { x: int; }"),
            ("child.fbs", "namespace a.b; table C { x: int; }"),
        ]);
        let ctx = s.context("child.fbs").unwrap();
        assert_eq!(ctx.qualified("P").unwrap().to_string(), "a.P");
        assert_eq!(ctx.qualified("G").unwrap().to_string(), "G");
    }

    #[test]
    fn test_global_files_see_each_other() {
        let s = session(&[
            ("one.fbs", "table Point { x: float; }"),
            ("two.fbs", "table Line { a: Point; }"),
        ]);
        let ctx = s.context("two.fbs").unwrap();
        assert_eq!(ctx.qualified("Point").unwrap(), TypeName::parse("Point"));
    }

    #[test]
    fn test_qualified_references() {
        let s = session(&[
            ("geo.fbs", "namespace geo; struct Vec2 { x: float; y: float; }"),
            ("game.fbs", "namespace game; table Unit { pos: geo.Vec2; }"),
            ("nested.fbs", "namespace game.geo; table Local { x: int; }"),
        ]);
        let ctx = s.context("game.fbs").unwrap();
        assert_eq!(ctx.qualified("geo.Vec2").unwrap().to_string(), "geo.Vec2");
        assert_eq!(ctx.qualified("game.geo.Local").unwrap().to_string(), "game.geo.Local");
        // relative to the current namespace first
        assert_eq!(ctx.qualified("geo.Local").unwrap().to_string(), "game.geo.Local");
        assert!(matches!(ctx.type_by_name("geo.Vec2"), Ok(TypeDecl::Struct(_))));

        let err = ctx.qualified("geo.Missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeResolution);
    }

    #[test]
    fn test_candidates_are_most_specific_first() {
        let s = session(&[("f.fbs", "namespace a.b; table T { x: int; }")]);
        let ctx = s.context("f.fbs").unwrap();
        let names: Vec<_> = ctx.candidates("x.T").iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["a.b.x.T", "a.x.T", "x.T"]);
    }

    #[test]
    fn test_unknown_names_and_determinism() {
        let s = session(&[("f.fbs", "table T { x: int; }")]);
        let ctx = s.context("f.fbs").unwrap();
        assert!(ctx.resolve("Nope").is_none());
        assert_eq!(ctx.resolve("T").map(|r| r.0), ctx.resolve("T").map(|r| r.0));
    }
}
