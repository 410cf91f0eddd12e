use std::collections::HashMap;

use glam::{Mat4, Vec3};

/// Which stages declare a binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageMask {
    pub vertex: bool,
    pub fragment: bool,
}

impl StageMask {
    pub const VERTEX: Self = Self { vertex: true, fragment: false };
    pub const FRAGMENT: Self = Self { vertex: false, fragment: true };

    pub fn union(self, other: Self) -> Self {
        Self {
            vertex: self.vertex || other.vertex,
            fragment: self.fragment || other.fragment,
        }
    }
}

/// Value type of a named uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    /// Anything the typed setters cannot write (integers, arrays, nested structs)
    Other,
}

/// Where a named uniform lives inside the staging blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub block: usize,
    pub offset: u32,
    pub kind: UniformKind,
}

/// A named value inside a uniform buffer, as reflected from the shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

/// CPU copy of one uniform buffer binding
#[derive(Debug, Clone)]
pub struct UniformBlock {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub stages: StageMask,
    pub members: Vec<UniformMember>,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(name: String, group: u32, binding: u32, stages: StageMask, size: u32, members: Vec<UniformMember>) -> Self {
        Self {
            name,
            group,
            binding,
            stages,
            members,
            data: vec![0; size as usize],
            dirty: true,
        }
    }

    pub fn bytes(&self) -> &[u8] { &self.data }

    pub fn size(&self) -> u64 { self.data.len() as u64 }

    /// Set when the staging bytes changed since the last upload
    pub fn is_dirty(&self) -> bool { self.dirty }

    pub fn mark_clean(&mut self) { self.dirty = false; }
}

/// Name → location table plus staging storage, built once at link time
#[derive(Debug, Clone, Default)]
pub struct UniformTable {
    blocks: Vec<UniformBlock>,
    locations: HashMap<String, UniformLocation>,
}

impl UniformTable {
    pub fn new(blocks: Vec<UniformBlock>) -> Self {
        let mut locations = HashMap::new();
        for (index, block) in blocks.iter().enumerate() {
            for member in &block.members {
                if locations.contains_key(&member.name) {
                    tracing::debug!(name = %member.name, block = %block.name, "uniform name already bound by an earlier block");
                    continue;
                }
                locations.insert(
                    member.name.clone(),
                    UniformLocation { block: index, offset: member.offset, kind: member.kind },
                );
            }
        }
        Self { blocks, locations }
    }

    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.locations.get(name).copied()
    }

    pub fn blocks(&self) -> &[UniformBlock] { &self.blocks }

    pub fn blocks_mut(&mut self) -> &mut [UniformBlock] { &mut self.blocks }

    pub fn set_matrix4(&mut self, name: &str, value: &Mat4) {
        self.write(name, UniformKind::Mat4, bytemuck::cast_slice(&value.to_cols_array()));
    }

    pub fn set_vector3(&mut self, name: &str, value: Vec3) {
        self.write(name, UniformKind::Vec3, bytemuck::cast_slice(&value.to_array()));
    }

    fn write(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) {
        let Some(location) = self.location(name) else {
            tracing::trace!(name, "uniform not found, write skipped");
            return;
        };
        if location.kind != kind {
            tracing::trace!(name, expected = ?location.kind, got = ?kind, "uniform type mismatch, write skipped");
            return;
        }
        let block = &mut self.blocks[location.block];
        let start = location.offset as usize;
        let Some(target) = block.data.get_mut(start..start + bytes.len()) else {
            return;
        };
        if *target != *bytes {
            target.copy_from_slice(bytes);
            block.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> UniformTable {
        let transforms = UniformBlock::new(
            "transforms".into(),
            0,
            0,
            StageMask::VERTEX,
            128,
            vec![
                UniformMember { name: "model".into(), offset: 0, kind: UniformKind::Mat4 },
                UniformMember { name: "view".into(), offset: 64, kind: UniformKind::Mat4 },
            ],
        );
        let lighting = UniformBlock::new(
            "lighting".into(),
            0,
            1,
            StageMask::FRAGMENT,
            32,
            vec![
                UniformMember { name: "lightPos".into(), offset: 0, kind: UniformKind::Vec3 },
                UniformMember { name: "view".into(), offset: 16, kind: UniformKind::Vec3 },
            ],
        );
        UniformTable::new(vec![transforms, lighting])
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
    }

    #[test]
    fn matrix_lands_at_member_offset() {
        let mut table = table();
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        table.set_matrix4("view", &m);
        let block = &table.blocks()[0];
        assert_eq!(floats(&block.bytes()[64..128]), m.to_cols_array().to_vec());
        assert!(floats(&block.bytes()[0..64]).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn vector_write_touches_twelve_bytes() {
        let mut table = table();
        table.set_vector3("lightPos", Vec3::new(1.2, 1.0, 2.0));
        let bytes = table.blocks()[1].bytes();
        assert_eq!(floats(&bytes[0..12]), vec![1.2, 1.0, 2.0]);
        assert!(bytes[12..].iter().all(|b| *b == 0));
    }

    #[test]
    fn first_block_wins_on_duplicate_names() {
        let table = table();
        let location = table.location("view").unwrap();
        assert_eq!(location.block, 0);
        assert_eq!(location.kind, UniformKind::Mat4);
    }

    #[test]
    fn unknown_and_mistyped_writes_are_ignored() {
        let mut table = table();
        for block in table.blocks_mut() {
            block.mark_clean();
        }
        table.set_matrix4("nonexistent", &Mat4::IDENTITY);
        table.set_vector3("model", Vec3::ONE);
        table.set_matrix4("lightPos", &Mat4::IDENTITY);
        assert!(table.blocks().iter().all(|b| !b.is_dirty()));
        assert!(table.blocks().iter().all(|b| b.bytes().iter().all(|v| *v == 0)));
    }

    #[test]
    fn rewriting_the_same_value_keeps_block_clean() {
        let mut table = table();
        table.set_matrix4("model", &Mat4::IDENTITY);
        table.blocks_mut()[0].mark_clean();
        table.set_matrix4("model", &Mat4::IDENTITY);
        assert!(!table.blocks()[0].is_dirty());
        table.set_matrix4("model", &Mat4::ZERO);
        assert!(table.blocks()[0].is_dirty());
    }
}
