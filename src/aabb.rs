use crate::chunk::{CHUNK_SIZE, MAX_HEIGHT};

#[derive(Debug, Clone)]
pub struct AABB {
    pub min: glam::Vec3,
    pub max: glam::Vec3,
}

impl AABB {
    pub fn new(min: glam::Vec3, max: glam::Vec3) -> Self {
        Self { min, max }
    }

    /// World-space bounding volume of a chunk column: the full world
    /// height, since chunk content can reach anywhere up to the ceiling.
    pub fn chunk_bounds(cx: i32, cz: i32) -> Self {
        let x = (cx * CHUNK_SIZE as i32) as f32;
        let z = (cz * CHUNK_SIZE as i32) as f32;
        Self {
            min: glam::Vec3::new(x, 0.0, z),
            max: glam::Vec3::new(
                x + CHUNK_SIZE as f32,
                MAX_HEIGHT as f32,
                z + CHUNK_SIZE as f32,
            ),
        }
    }

    pub fn center(&self) -> glam::Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> glam::Vec3 {
        (self.max - self.min) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_bounds_span_the_full_height() {
        let aabb = AABB::chunk_bounds(-1, 2);
        assert_eq!(aabb.min, glam::Vec3::new(-16.0, 0.0, 32.0));
        assert_eq!(aabb.max, glam::Vec3::new(0.0, MAX_HEIGHT as f32, 48.0));
        assert_eq!(aabb.center().y, MAX_HEIGHT as f32 / 2.0);
    }
}
