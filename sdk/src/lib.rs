//! flowflat
//!
//! Facade over the flowflat compiler for drivers and build scripts.
//!
//! - `compile_files` reads schema files and compiles them as one session
//! - `generate_rust` produces Rust source for every compiled file
//! - `Config` bundles the compiler and generator settings, loadable from JSON

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub use flowflat_compiler::{
    compile_schema, compile_session_to_rust, CompiledFile, CompiledSession, CompiledType, CompilerConfig,
    ErrorKind, FlowflatError, RustGenConfig, SerializationInfo, Session, TypeName,
};
pub use flowflat_schema::{PrimitiveType, TypeClass};

/// Settings for a whole run, as stored in a JSON config file:
///
/// ```json
/// { "compiler": { "union_discriminant": "ubyte" }, "rust": { "serde_derives": true } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compiler: CompilerConfig,
    pub rust:     RustGenConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, FlowflatError> {
        serde_json::from_str(text).map_err(|e| FlowflatError::InvalidValue(format!("Invalid config: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FlowflatError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Reads every file in `paths`, registers it under the path as given and
/// compiles the session.
pub fn compile_files<P: AsRef<Path>>(paths: &[P], config: &CompilerConfig) -> Result<CompiledSession, FlowflatError> {
    let mut session = Session::new();
    for path in paths {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        session.register_source(path.to_string_lossy(), &text)?;
    }
    log::debug!("compiling {} files", session.len());
    session.compile(config)
}

/// Pretty-printed JSON of the compiled IR.
pub fn ir_to_json(compiled: &CompiledSession) -> Result<String, FlowflatError> {
    serde_json::to_string_pretty(compiled).map_err(|e| FlowflatError::Internal(e.to_string()))
}

/// Rust source for each compiled file, paired with the file's path.
pub fn generate_rust(compiled: &CompiledSession, config: &RustGenConfig) -> Result<Vec<(String, String)>, FlowflatError> {
    compiled
        .files
        .iter()
        .map(|file| Ok((file.path.clone(), compile_session_to_rust(compiled, &file.path, config)?)))
        .collect()
}

pub mod error {
    pub use flowflat_compiler::error::{ErrorKind, FlowflatError};
}

pub mod schema {
    pub use flowflat_schema::*;
}
