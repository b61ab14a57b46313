//! Offset types of the wire format.
//!
//! A table instance starts with an `SOffset` to its vtable. The vtable is a
//! run of `VOffset`s: its own byte length, the table's inline length, then one
//! entry per field index holding the field's byte offset from the table start
//! (0 when absent). Strings, vectors, tables and union values are referenced
//! through a `UOffset` stored in the referencing slot.

/// Unsigned offset to out-of-line data, relative to where it is stored.
pub type UOffset = u32;
/// Signed offset from a table to its vtable.
pub type SOffset = i32;
/// Offset entry inside a vtable.
pub type VOffset = u16;

pub const UOFFSET_SIZE: usize = std::mem::size_of::<UOffset>();
pub const SOFFSET_SIZE: usize = std::mem::size_of::<SOffset>();
pub const VOFFSET_SIZE: usize = std::mem::size_of::<VOffset>();

/// The two leading vtable entries (vtable length, table inline length).
pub const VTABLE_HEADER_SIZE: usize = 2 * VOFFSET_SIZE;

pub const FILE_IDENTIFIER_LENGTH: usize = 4;

/// Rounds `offset` up to the next multiple of `alignment`.
/// An alignment of 0 is treated as 1.
pub fn align_up(offset: usize, alignment: usize) -> usize {
    let alignment = alignment.max(1);
    offset.div_ceil(alignment) * alignment
}

/// Byte length of a vtable describing `field_count` field indices.
pub fn vtable_size(field_count: usize) -> usize {
    VTABLE_HEADER_SIZE + field_count * VOFFSET_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(4, 4), 4);
        assert_eq!(align_up(5, 8), 8);
        assert_eq!(align_up(3, 0), 3);
    }

    #[test]
    fn test_vtable_size() {
        assert_eq!(vtable_size(0), 4);
        assert_eq!(vtable_size(3), 10);
    }
}
