//! Binary layout of every resolved type.
//!
//! Layouts are computed in emission order and cached by qualified name. A
//! field whose type has no cached layout yet means the order was wrong; that
//! is reported as an internal error rather than resolved on demand.

use flowflat_schema::{align_up, PrimitiveType, SOFFSET_SIZE, UOFFSET_SIZE};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    error::FlowflatError,
    ir::{Declaration, IrCompound, IrField, TypeKind},
    types::TypeName,
    utils::quote,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializationInfo {
    pub alignment: usize,
    pub size:      usize,
    /// Tables only: field index to slot offset from the table start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_offsets: Option<BTreeMap<usize, usize>>,
    /// Tables only: field index of a union field to its discriminant slot.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub union_tag_offsets: BTreeMap<usize, usize>,
}

impl SerializationInfo {
    fn scalar(size: usize, alignment: usize) -> Self {
        SerializationInfo {
            alignment,
            size,
            field_offsets: None,
            union_tag_offsets: BTreeMap::new(),
        }
    }

    pub fn of_primitive(primitive: PrimitiveType) -> Self {
        Self::scalar(primitive.size(), primitive.alignment())
    }
}

#[derive(Debug)]
pub struct LayoutResolver {
    discriminant: PrimitiveType,
    cache:        IndexMap<TypeName, SerializationInfo>,
}

impl LayoutResolver {
    pub fn new(discriminant: PrimitiveType) -> Self {
        LayoutResolver {
            discriminant,
            cache: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &TypeName) -> Option<&SerializationInfo> {
        self.cache.get(name)
    }

    /// Computes and caches the layout of `decl`, or returns the cached one.
    pub fn resolve(&mut self, decl: &Declaration) -> Result<&SerializationInfo, FlowflatError> {
        let name = decl.name();
        if !self.cache.contains_key(name) {
            let info = match decl {
                Declaration::Enum(e)   => SerializationInfo::of_primitive(e.underlying),
                Declaration::Union(_)  => SerializationInfo::of_primitive(self.discriminant),
                Declaration::Struct(s) => self.struct_layout(s)?,
                Declaration::Table(t)  => self.table_layout(t)?,
            };
            log::debug!(
                "layout of {} {}: size {}, alignment {}",
                decl.kind_name(),
                name,
                info.size,
                info.alignment
            );
            self.cache.insert(name.clone(), info);
        }
        self.cache
            .get(name)
            .ok_or_else(|| FlowflatError::Internal(format!("layout of {} was not cached", quote(&name.to_string()))))
    }

    pub fn into_layouts(self) -> IndexMap<TypeName, SerializationInfo> {
        self.cache
    }

    fn cached(&self, name: &TypeName, owner: &TypeName, field: &IrField) -> Result<&SerializationInfo, FlowflatError> {
        self.cache.get(name).ok_or_else(|| {
            FlowflatError::Internal(format!(
                "field {} of {} needs the layout of {}, which was not computed yet",
                quote(&field.name),
                quote(&owner.to_string()),
                quote(&name.to_string())
            ))
        })
    }

    /// Size and alignment of the slot `field` occupies in its parent.
    fn slot(&self, owner: &TypeName, field: &IrField) -> Result<(usize, usize), FlowflatError> {
        if field.is_array {
            return Ok((UOFFSET_SIZE, UOFFSET_SIZE));
        }
        Ok(match field.ty.kind {
            TypeKind::Primitive(PrimitiveType::String) => (UOFFSET_SIZE, UOFFSET_SIZE),
            TypeKind::Primitive(p) => (p.size(), p.alignment()),
            TypeKind::Enum | TypeKind::Struct => {
                let info = self.cached(&field.ty.name, owner, field)?;
                (info.size, info.alignment)
            }
            TypeKind::Union | TypeKind::Table => (UOFFSET_SIZE, UOFFSET_SIZE),
        })
    }

    fn struct_layout(&self, s: &IrCompound) -> Result<SerializationInfo, FlowflatError> {
        let mut offset = 0;
        let mut alignment = 1;
        for field in &s.fields {
            let (size, align) = self.slot(&s.name, field)?;
            offset = align_up(offset, align) + size;
            alignment = alignment.max(align);
        }
        if let Some(forced) = s.force_align {
            alignment = alignment.max(forced as usize);
        }
        Ok(SerializationInfo::scalar(align_up(offset, alignment), alignment))
    }

    fn table_layout(&self, t: &IrCompound) -> Result<SerializationInfo, FlowflatError> {
        let mut offset = SOFFSET_SIZE;
        let mut alignment = SOFFSET_SIZE;
        let mut field_offsets = BTreeMap::new();
        let mut union_tag_offsets = BTreeMap::new();

        for (index, field) in t.fields.iter().enumerate() {
            if field.is_deprecated() {
                continue;
            }
            if field.ty.kind == TypeKind::Union {
                let (size, align) = if field.is_array {
                    (UOFFSET_SIZE, UOFFSET_SIZE)
                } else {
                    (self.discriminant.size(), self.discriminant.alignment())
                };
                offset = align_up(offset, align);
                union_tag_offsets.insert(index, offset);
                offset += size;
            }
            let (size, align) = self.slot(&t.name, field)?;
            offset = align_up(offset, align);
            field_offsets.insert(index, offset);
            offset += size;
            alignment = alignment.max(align);
        }

        Ok(SerializationInfo {
            alignment,
            size: align_up(offset, alignment),
            field_offsets: Some(field_offsets),
            union_tag_offsets,
        })
    }
}

/// Lays out every declaration, walking `order`.
pub fn resolve_layouts(
    declarations: &IndexMap<TypeName, Declaration>,
    order: &[TypeName],
    discriminant: PrimitiveType,
) -> Result<IndexMap<TypeName, SerializationInfo>, FlowflatError> {
    let mut resolver = LayoutResolver::new(discriminant);
    for name in order {
        let decl = declarations.get(name).ok_or_else(|| {
            FlowflatError::Internal(format!("{} is ordered but was never declared", quote(&name.to_string())))
        })?;
        resolver.resolve(decl)?;
    }
    Ok(resolver.into_layouts())
}
