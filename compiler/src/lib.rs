//! flowflat-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for flatbuffers-style `.fbs` schema files,
//!  2) Per-file symbol tables (`ExpressionTree`) and a `Session` holding them,
//!  3) Namespace-aware name resolution (`StaticContext`),
//!  4) Validation, dependency ordering and layout resolution,
//!  5) Rust code generation from the compiled session,
//!  6) Error types (`FlowflatError`) and configuration.

pub mod error;
pub mod utils;
pub mod ast;
pub mod tokenizer;
pub mod parser;
pub mod types;
pub mod builder;
pub mod session;
pub mod resolver;
pub mod config;
pub mod verifier;
pub mod ir;
pub mod order;
pub mod layout;
pub mod compiler;
pub mod gen_rust;

pub use builder::build_expression_tree;
pub use compiler::{compile_schema, compile_session, CompiledFile, CompiledSession, CompiledType};
pub use config::{CompilerConfig, RustGenConfig};
pub use error::{ErrorKind, FlowflatError};
pub use gen_rust::compile_session_to_rust;
pub use layout::SerializationInfo;
pub use resolver::StaticContext;
pub use session::Session;
pub use types::{ExpressionTree, TypeName};
