use crate::block::BlockType;

/// Surface height above which mountain tops turn to snow.
pub const SNOW_LINE: i32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiomeType {
    Desert,
    Plains,
    Forest,
    Mountains,
}

impl BiomeType {
    /// Classification from a biome-noise sample in [-1, 1]. The comparator
    /// order matters: values below -0.5 are Desert, -0.5 itself is Plains.
    pub fn from_noise(value: f32) -> Self {
        if value < -0.5 {
            BiomeType::Desert
        } else if value < 0.0 {
            BiomeType::Plains
        } else if value < 0.5 {
            BiomeType::Forest
        } else {
            BiomeType::Mountains
        }
    }

    /// Block exposed at the surface (y == height).
    pub fn surface_block(self, y: i32) -> BlockType {
        match self {
            BiomeType::Desert => BlockType::Sand,
            BiomeType::Mountains => {
                if y > SNOW_LINE {
                    BlockType::Snow
                } else {
                    BlockType::Stone
                }
            }
            BiomeType::Plains | BiomeType::Forest => BlockType::Grass,
        }
    }

    /// Block in the shallow band just under the surface
    /// (height - 4 < y < height).
    pub fn subsurface_block(self) -> BlockType {
        match self {
            BiomeType::Desert => BlockType::Sand,
            _ => BlockType::Dirt,
        }
    }

    pub fn deep_block(self) -> BlockType {
        BlockType::Stone
    }

    /// Per-column probability of a tree or house placement.
    pub fn special_object_probability(self) -> f64 {
        match self {
            BiomeType::Forest => 0.04,
            BiomeType::Plains => 0.001,
            BiomeType::Desert | BiomeType::Mountains => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_boundaries_are_exact() {
        // strict `<` at each threshold: the boundary value falls upward
        assert_eq!(BiomeType::from_noise(-0.50001), BiomeType::Desert);
        assert_eq!(BiomeType::from_noise(-0.5), BiomeType::Plains);
        assert_eq!(BiomeType::from_noise(-0.00001), BiomeType::Plains);
        assert_eq!(BiomeType::from_noise(0.0), BiomeType::Forest);
        assert_eq!(BiomeType::from_noise(0.49999), BiomeType::Forest);
        assert_eq!(BiomeType::from_noise(0.5), BiomeType::Mountains);
        assert_eq!(BiomeType::from_noise(1.0), BiomeType::Mountains);
    }

    #[test]
    fn mountain_surface_depends_on_snow_line() {
        assert_eq!(
            BiomeType::Mountains.surface_block(SNOW_LINE),
            BlockType::Stone
        );
        assert_eq!(
            BiomeType::Mountains.surface_block(SNOW_LINE + 1),
            BlockType::Snow
        );
    }

    #[test]
    fn desert_stays_sand_below_surface() {
        assert_eq!(BiomeType::Desert.surface_block(50), BlockType::Sand);
        assert_eq!(BiomeType::Desert.subsurface_block(), BlockType::Sand);
        assert_eq!(BiomeType::Plains.subsurface_block(), BlockType::Dirt);
    }
}
