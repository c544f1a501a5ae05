use serde::{Deserialize, Serialize};

/// Number of distinct solid terrain materials, each rendered as one
/// instanced batch per chunk.
pub const MATERIAL_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    Air,
    Grass,
    Dirt,
    Stone,
    Sand,
    Snow,
    Water,
}

impl BlockType {
    pub fn is_air(self) -> bool {
        self == BlockType::Air
    }

    /// Water is passable for exposure purposes: a solid face touching
    /// water must still be rendered.
    pub fn exposes_neighbors(self) -> bool {
        matches!(self, BlockType::Air | BlockType::Water)
    }

    pub fn is_solid(self) -> bool {
        !matches!(self, BlockType::Air | BlockType::Water)
    }

    /// Batch slot of a solid block inside the per-chunk instance sets.
    pub fn material_index(self) -> Option<usize> {
        match self {
            BlockType::Grass => Some(0),
            BlockType::Dirt => Some(1),
            BlockType::Stone => Some(2),
            BlockType::Sand => Some(3),
            BlockType::Snow => Some(4),
            BlockType::Air | BlockType::Water => None,
        }
    }

    pub fn from_material_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(BlockType::Grass),
            1 => Some(BlockType::Dirt),
            2 => Some(BlockType::Stone),
            3 => Some(BlockType::Sand),
            4 => Some(BlockType::Snow),
            _ => None,
        }
    }
}
