//! Configuration for the compiler pipeline and the Rust generator.

use flowflat_schema::{PrimitiveType, TypeClass};
use serde::{Deserialize, Serialize};

use crate::{error::FlowflatError, utils::quote};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Primitive used to store union discriminants.
    pub union_discriminant: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            union_discriminant: "ubyte".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn union_discriminant(mut self, value: impl Into<String>) -> Self {
        self.union_discriminant = value.into();
        self
    }

    /// The configured discriminant, which must be an unsigned integer of one
    /// or two bytes.
    pub fn discriminant_type(&self) -> Result<PrimitiveType, FlowflatError> {
        match PrimitiveType::from_name(&self.union_discriminant) {
            Some(p)
                if matches!(p.type_class(), TypeClass::Int | TypeClass::Char)
                    && p.is_unsigned()
                    && p.size() <= 2 =>
            {
                Ok(p)
            }
            _ => Err(FlowflatError::InvalidValue(format!(
                "{} can't be used as union discriminant, use an unsigned 1 or 2 byte integer",
                quote(&self.union_discriminant)
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RustGenConfig {
    /// Add `#[derive(Serialize)]` to generated types.
    pub serde_derives: bool,
    /// Emit `SIZE`, `ALIGN` and `VT_*` constants from the computed layout.
    pub emit_layout_constants: bool,
}

impl Default for RustGenConfig {
    fn default() -> Self {
        Self {
            serde_derives: false,
            emit_layout_constants: true,
        }
    }
}

impl RustGenConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serde_derives(mut self, value: bool) -> Self {
        self.serde_derives = value;
        self
    }

    pub fn emit_layout_constants(mut self, value: bool) -> Self {
        self.emit_layout_constants = value;
        self
    }
}
