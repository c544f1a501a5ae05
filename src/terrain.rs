use {
    crate::{biome::BiomeType, noise::SimplexNoise},
    std::sync::atomic::{AtomicBool, Ordering},
};

/// Height returned everywhere while flat-terrain mode is active.
pub const FLAT_HEIGHT: i32 = 70;

/// Columns lower than this are flooded up to the water surface.
pub const WATER_LEVEL: i32 = 60;

/// Pure height/biome oracle over world (x, z) coordinates.
///
/// Owns one noise field per purpose so the individual terms stay
/// independent of each other for a given seed.
pub struct TerrainField {
    main_noise: SimplexNoise,
    detail_noise: SimplexNoise,
    mountain_noise: SimplexNoise,
    biome_noise: SimplexNoise,
    cave_noise: SimplexNoise,
    // atomic so the generation worker can share the field by Arc while the
    // main thread owns the toggle
    flat_mode: AtomicBool,
    seed: u64,
}

impl TerrainField {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            // main: broad continental shape
            main_noise: SimplexNoise::new(seed.wrapping_add(0x5EED_0001)),
            // detail: small-scale roughness
            detail_noise: SimplexNoise::new(seed.wrapping_add(0x5EED_0002)),
            // mountain: extra uplift inside mountain biomes
            mountain_noise: SimplexNoise::new(seed.wrapping_add(0x5EED_0003)),
            // biome: classification field
            biome_noise: SimplexNoise::new(seed.wrapping_add(0x5EED_0004)),
            cave_noise: SimplexNoise::new(seed.wrapping_add(0x5EED_0005)),
            flat_mode: AtomicBool::new(false),
        }
    }

    /// Debug/test switch: bypasses every noise term and fixes the height.
    pub fn set_flat_mode(&self, enabled: bool) {
        if self.flat_mode.swap(enabled, Ordering::Relaxed) != enabled {
            log::info!("flat terrain mode: {enabled}");
        }
    }

    pub fn flat_mode(&self) -> bool {
        self.flat_mode.load(Ordering::Relaxed)
    }

    /// World seed, mixed into per-chunk placement randomness.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn biome_at(&self, x: f32, z: f32) -> BiomeType {
        BiomeType::from_noise(self.biome_noise.noise2d(x / 200.0, z / 200.0))
    }

    pub fn height_at(&self, x: f32, z: f32) -> i32 {
        if self.flat_mode() {
            return FLAT_HEIGHT;
        }

        let mut height = (self.main_noise.noise2d(x / 100.0, z / 100.0) + 1.0) / 2.0 * 60.0 + 40.0;
        height += self.detail_noise.noise2d(x / 30.0, z / 30.0) * 10.0;

        if self.biome_at(x, z) == BiomeType::Mountains {
            let uplift = self.mountain_noise.noise2d(x / 50.0, z / 50.0);
            if uplift > 0.1 {
                height += (uplift - 0.1) * 2.0 * 150.0;
            }
        }

        if self.biome_at(x, z) == BiomeType::Desert {
            height = height * 0.5 + 40.0;
        }

        // cliff term reuses the main field at a tighter scale
        let cliff = self.main_noise.noise2d(x / 20.0, z / 20.0);
        if cliff > 0.7 {
            height += (cliff - 0.7) * 100.0;
        }

        height.floor() as i32
    }

    /// Cave carving predicate. Only carves a mid-height band: never at the
    /// surface crust, never near bedrock.
    pub fn is_cave(&self, x: f32, y: f32, z: f32, surface_height: i32) -> bool {
        if self.flat_mode() {
            return false;
        }
        if y <= 20.0 || y >= (surface_height - 5) as f32 {
            return false;
        }
        self.cave_noise.noise3d(x / 30.0, y / 30.0, z / 30.0) > 0.7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_are_deterministic() {
        let a = TerrainField::new(1234);
        let b = TerrainField::new(1234);
        for i in -50..50 {
            let x = i as f32 * 7.3;
            let z = i as f32 * -3.1;
            assert_eq!(a.height_at(x, z), b.height_at(x, z));
            assert_eq!(a.biome_at(x, z), b.biome_at(x, z));
        }
    }

    #[test]
    fn flat_mode_returns_constant_height() {
        let terrain = TerrainField::new(9);
        terrain.set_flat_mode(true);
        for i in -100..100 {
            assert_eq!(terrain.height_at(i as f32 * 13.7, i as f32 * 5.9), FLAT_HEIGHT);
        }
    }

    #[test]
    fn flat_mode_disables_caves() {
        let terrain = TerrainField::new(9);
        terrain.set_flat_mode(true);
        for y in 0..FLAT_HEIGHT {
            assert!(!terrain.is_cave(8.0, y as f32, 8.0, FLAT_HEIGHT));
        }
    }

    #[test]
    fn caves_never_break_the_surface_or_bedrock() {
        let terrain = TerrainField::new(77);
        for i in 0..200 {
            let x = i as f32 * 11.0;
            let z = i as f32 * 17.0;
            let height = terrain.height_at(x, z);
            for y in [0, 5, 20, height - 5, height - 1, height] {
                if y <= 20 || y >= height - 5 {
                    assert!(!terrain.is_cave(x, y as f32, z, height));
                }
            }
        }
    }

    #[test]
    fn heights_never_drop_below_the_world_floor() {
        // base term bottoms out at 30, desert remap at 55; the cliff term
        // only ever adds
        let terrain = TerrainField::new(4242);
        for i in -300..300 {
            let height = terrain.height_at(i as f32 * 9.1, i as f32 * -4.7);
            assert!(height > 0, "height below world floor: {height}");
        }
    }
}
