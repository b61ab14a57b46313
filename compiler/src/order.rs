use indexmap::{IndexMap, IndexSet};

use crate::{
    error::FlowflatError,
    ir::Declaration,
    types::TypeName,
};

/// Emission order for `declarations`: every enum first, then unions, structs
/// and tables such that each comes after everything it references.
///
/// Ready declarations are emitted in declaration order, so the result only
/// depends on the input. A round that places nothing means the rest form a
/// cycle.
pub fn establish_order(declarations: &IndexMap<TypeName, Declaration>) -> Result<Vec<TypeName>, FlowflatError> {
    let mut order: Vec<TypeName> = declarations
        .values()
        .filter(|d| matches!(d, Declaration::Enum(_)))
        .map(|d| d.name().clone())
        .collect();

    let mut graph: IndexMap<&TypeName, IndexSet<&TypeName>> = declarations
        .iter()
        .filter(|(_, d)| !matches!(d, Declaration::Enum(_)))
        .map(|(name, d)| {
            let deps = d
                .dependencies()
                .into_iter()
                .filter(|dep| declarations.contains_key(*dep))
                .collect();
            (name, deps)
        })
        .collect();

    while !graph.is_empty() {
        let ready: Vec<&TypeName> = graph
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .collect();

        if ready.is_empty() {
            let remaining: Vec<String> = graph.keys().map(|n| n.to_string()).collect();
            return Err(FlowflatError::Structural(format!(
                "cyclic dependency between types: {}",
                remaining.join(", ")
            )));
        }

        for name in &ready {
            graph.shift_remove(*name);
            order.push((*name).clone());
        }
        for deps in graph.values_mut() {
            for name in &ready {
                deps.shift_remove(*name);
            }
        }
    }

    log::debug!(
        "emission order: {}",
        order.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ")
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, ir::lower_session, session::Session};

    fn order_of(text: &str) -> Result<Vec<String>, FlowflatError> {
        let mut session = Session::new();
        session.register_source("f.fbs", text)?;
        let ir = lower_session(&session)?;
        Ok(establish_order(&ir)?.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn test_dependencies_come_first() {
        let order = order_of("table Line { a: Point; b: Point; } table Point { x: float; y: float; }").unwrap();
        assert_eq!(order, vec!["Point", "Line"]);
    }

    #[test]
    fn test_enums_lead_and_ready_types_keep_declaration_order() {
        let order = order_of(
            "table C { b: B; } table A { x: int; } enum E : int { X } struct B { a: int; } union U { A, C }",
        )
        .unwrap();
        assert_eq!(order, vec!["E", "A", "B", "C", "U"]);
    }

    #[test]
    fn test_every_edge_points_backwards() {
        let mut session = Session::new();
        session
            .register_source(
                "f.fbs",
                "table Root { u: Any; s: Outer; } union Any { Leaf, Mid } table Mid { l: [Leaf]; } \
                 table Leaf { x: int; } struct Outer { i: Inner; } struct Inner { v: double; }",
            )
            .unwrap();
        let ir = lower_session(&session).unwrap();
        let order = establish_order(&ir).unwrap();
        assert_eq!(order.len(), ir.len());
        for (name, decl) in &ir {
            let at = order.iter().position(|n| n == name).unwrap();
            for dep in decl.dependencies() {
                let dep_at = order.iter().position(|n| n == dep).unwrap();
                assert!(dep_at < at, "{} must come before {}", dep, name);
            }
        }
    }

    #[test]
    fn test_cycles_are_structural_errors() {
        let err = order_of("struct S { f: S; }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("cyclic"), "{}", err);

        let err = order_of("struct A { b: B; } struct B { a: A; } table Ok { x: int; }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("A, B"), "{}", err);
        assert!(!err.to_string().contains("Ok"), "{}", err);

        assert_eq!(order_of("table T { next: [T]; }").unwrap_err().kind(), ErrorKind::Structural);
    }
}
