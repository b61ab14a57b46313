//! The wire-format contract shared by the flowflat compiler and any runtime
//! that reads or writes flowflat buffers.
//!
//! This crate does not encode anything. It fixes the facts both sides must
//! agree on bit-for-bit: the catalog of primitive types with their sizes and
//! alignments, and the offset types used for out-of-line references and
//! vtables.
//!
//! ```
//! use flowflat_schema::*;
//!
//! let int = PrimitiveType::from_name("int").unwrap();
//! assert_eq!(int.size(), 4);
//! assert_eq!(int.type_class(), TypeClass::Int);
//!
//! // a `long` following a `byte` is padded to its own alignment
//! assert_eq!(align_up(1, PrimitiveType::Long.alignment()), 8);
//! assert_eq!(PrimitiveType::String.size(), UOFFSET_SIZE);
//! ```

pub mod primitive;
pub mod wire;

pub use primitive::*;
pub use wire::*;
