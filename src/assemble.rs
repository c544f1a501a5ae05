use {
    crate::{
        aabb::AABB,
        block::MATERIAL_COUNT,
        chunk::{CHUNK_SIZE, ChunkData, SpecialObjectKind},
        scene::{RenderBuffer, ResourceTracker},
    },
    bytemuck::{Pod, Zeroable},
    glam::Vec3,
};

/// Static upper bound on instances per material batch. Exposure culling
/// keeps real counts near the surface area of a chunk, far below this.
pub const BLOCK_BATCH_CAPACITY: usize = 8192;

/// Water is one instance per column at most.
pub const WATER_BATCH_CAPACITY: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Initial harvestable wood per tree.
pub const TREE_WOOD: u32 = 10;

/// One instanced block, chunk-local position plus material slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlockInstance {
    pub position: [f32; 3],
    pub material: u32,
}

/// A draw batch: the owned buffer resource plus its CPU-side instances.
/// Only the first `buffer.active()` instances are drawn.
#[derive(Debug)]
pub struct InstanceBatch {
    pub buffer: RenderBuffer,
    pub instances: Vec<BlockInstance>,
}

impl InstanceBatch {
    fn new(tracker: &ResourceTracker, capacity: usize, instances: Vec<BlockInstance>) -> Self {
        let mut buffer = RenderBuffer::new(tracker, capacity);
        if instances.len() > capacity {
            log::warn!(
                "instance batch overflow: {} > {capacity}, truncating",
                instances.len()
            );
        }
        buffer.set_active(instances.len().min(capacity));
        Self { buffer, instances }
    }
}

/// Tree sub-entity. Children are named fields, never positional lookups.
#[derive(Debug)]
pub struct TreeEntity {
    pub position: Vec3,
    pub trunk: RenderBuffer,
    pub foliage: RenderBuffer,
    pub label: RenderBuffer,
    pub highlight: RenderBuffer,
    pub wood_remaining: u32,
    pub highlighted: bool,
}

impl TreeEntity {
    fn dispose(&mut self) {
        self.trunk.dispose();
        self.foliage.dispose();
        self.label.dispose();
        self.highlight.dispose();
    }
}

#[derive(Debug)]
pub struct HouseEntity {
    pub position: Vec3,
    pub base: RenderBuffer,
    pub roof: RenderBuffer,
}

impl HouseEntity {
    fn dispose(&mut self) {
        self.base.dispose();
        self.roof.dispose();
    }
}

/// Realized render subtree of one chunk, positioned at
/// (cx * 16, 0, cz * 16). Owned exclusively by the chunk cache.
#[derive(Debug)]
pub struct ChunkNode {
    pub coords: (i32, i32),
    pub origin: Vec3,
    pub material_batches: [InstanceBatch; MATERIAL_COUNT],
    pub water: InstanceBatch,
    pub trees: Vec<TreeEntity>,
    pub houses: Vec<HouseEntity>,
    pub aabb: AABB,
    // topmost solid y per local column, the probe surface for exact
    // terrain-height queries
    top_solid: [[Option<u16>; CHUNK_SIZE]; CHUNK_SIZE],
    disposed: bool,
}

impl ChunkNode {
    /// Topmost solid world y of the local column, if any block survived
    /// carving there.
    pub fn surface_y(&self, local_x: usize, local_z: usize) -> Option<i32> {
        self.top_solid[local_x][local_z].map(i32::from)
    }

    /// Release every owned buffer. Called exactly once, by the eviction
    /// pass that removes this node from the cache.
    pub fn dispose(&mut self) {
        debug_assert!(!self.disposed, "chunk node disposed twice");
        if self.disposed {
            return;
        }
        self.disposed = true;
        for batch in &mut self.material_batches {
            batch.buffer.dispose();
        }
        self.water.buffer.dispose();
        for tree in &mut self.trees {
            tree.dispose();
        }
        for house in &mut self.houses {
            house.dispose();
        }
    }
}

/// Groups the generated block lists into per-material instance batches and
/// spawns tree/house sub-entities. Town halls are placed independently by
/// the furniture module and never pass through here.
pub fn assemble_chunk(
    tracker: &ResourceTracker,
    cx: i32,
    cz: i32,
    data: &ChunkData,
) -> ChunkNode {
    let origin = Vec3::new(
        (cx * CHUNK_SIZE as i32) as f32,
        0.0,
        (cz * CHUNK_SIZE as i32) as f32,
    );

    let mut per_material: [Vec<BlockInstance>; MATERIAL_COUNT] = Default::default();
    let mut top_solid = [[None::<u16>; CHUNK_SIZE]; CHUNK_SIZE];

    for block in &data.visible_blocks {
        if block.material_index >= MATERIAL_COUNT {
            log::warn!("skipping block with unknown material {}", block.material_index);
            continue;
        }
        per_material[block.material_index].push(BlockInstance {
            position: [block.x as f32, block.y as f32, block.z as f32],
            material: block.material_index as u32,
        });

        let column = &mut top_solid[block.x as usize][block.z as usize];
        let y = block.y as u16;
        if column.is_none_or(|top| y > top) {
            *column = Some(y);
        }
    }

    let material_batches = per_material
        .map(|instances| InstanceBatch::new(tracker, BLOCK_BATCH_CAPACITY, instances));

    let water_instances = data
        .water_blocks
        .iter()
        .map(|w| BlockInstance {
            position: [w.x as f32, w.y as f32, w.z as f32],
            material: 0,
        })
        .collect();
    let water = InstanceBatch::new(tracker, WATER_BATCH_CAPACITY, water_instances);

    let mut trees = Vec::new();
    let mut houses = Vec::new();
    for object in &data.special_objects {
        let position = origin + Vec3::new(object.x as f32, object.y as f32, object.z as f32);
        match object.kind {
            SpecialObjectKind::Tree => trees.push(TreeEntity {
                position,
                trunk: RenderBuffer::new(tracker, 1),
                foliage: RenderBuffer::new(tracker, 1),
                label: RenderBuffer::new(tracker, 1),
                highlight: RenderBuffer::new(tracker, 1),
                wood_remaining: TREE_WOOD,
                highlighted: false,
            }),
            SpecialObjectKind::House => houses.push(HouseEntity {
                position,
                base: RenderBuffer::new(tracker, 1),
                roof: RenderBuffer::new(tracker, 1),
            }),
        }
    }

    ChunkNode {
        coords: (cx, cz),
        origin,
        material_batches,
        water,
        trees,
        houses,
        aabb: AABB::chunk_bounds(cx, cz),
        top_solid,
        disposed: false,
    }
}

/// Multi-part town hall structure. Assembled here, placed by the
/// furniture module directly under the persistent root.
#[derive(Debug)]
pub struct TownHallNode {
    pub id: usize,
    pub position: Vec3,
    pub foundation: RenderBuffer,
    pub walls: RenderBuffer,
    pub roof: RenderBuffer,
    pub banner: RenderBuffer,
    disposed: bool,
}

impl TownHallNode {
    pub fn dispose(&mut self) {
        debug_assert!(!self.disposed, "town hall disposed twice");
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.foundation.dispose();
        self.walls.dispose();
        self.roof.dispose();
        self.banner.dispose();
    }
}

pub fn assemble_town_hall(tracker: &ResourceTracker, id: usize, position: Vec3) -> TownHallNode {
    TownHallNode {
        id,
        position,
        foundation: RenderBuffer::new(tracker, 1),
        walls: RenderBuffer::new(tracker, 1),
        roof: RenderBuffer::new(tracker, 1),
        banner: RenderBuffer::new(tracker, 1),
        disposed: false,
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{chunk, terrain::TerrainField},
    };

    #[test]
    fn batches_cover_every_visible_block() {
        let terrain = TerrainField::new(11);
        let data = chunk::generate(&terrain, 1, -2);
        let tracker = ResourceTracker::default();
        let node = assemble_chunk(&tracker, 1, -2, &data);

        let batched: usize = node
            .material_batches
            .iter()
            .map(|batch| batch.instances.len())
            .sum();
        assert_eq!(batched, data.visible_blocks.len());

        let active: usize = node
            .material_batches
            .iter()
            .map(|batch| batch.buffer.active())
            .sum();
        assert_eq!(active, batched.min(MATERIAL_COUNT * BLOCK_BATCH_CAPACITY));

        assert_eq!(node.water.instances.len(), data.water_blocks.len());
        assert_eq!(
            node.trees.len() + node.houses.len(),
            data.special_objects.len()
        );
    }

    #[test]
    fn chunk_node_is_positioned_at_its_origin() {
        let tracker = ResourceTracker::default();
        let node = assemble_chunk(&tracker, 3, -4, &ChunkData::default());
        assert_eq!(node.origin, Vec3::new(48.0, 0.0, -64.0));
        assert_eq!(node.aabb.min.x, 48.0);
        assert_eq!(node.aabb.max.x, 64.0);
    }

    #[test]
    fn probe_surface_tracks_topmost_visible_block() {
        let terrain = TerrainField::new(1);
        terrain.set_flat_mode(true);
        let data = chunk::generate(&terrain, 0, 0);
        let tracker = ResourceTracker::default();
        let node = assemble_chunk(&tracker, 0, 0, &data);

        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                assert_eq!(node.surface_y(x, z), Some(crate::terrain::FLAT_HEIGHT));
            }
        }
    }

    #[test]
    fn dispose_releases_every_buffer_exactly_once() {
        let terrain = TerrainField::new(321);
        // pick a forest-heavy area so tree sub-entities are exercised too
        let data = chunk::generate(&terrain, 5, 5);
        let tracker = ResourceTracker::default();
        let mut node = assemble_chunk(&tracker, 5, 5, &data);

        assert!(tracker.live() > 0);
        node.dispose();
        assert_eq!(tracker.live(), 0);
        // second dispose must not double count (debug builds assert)
    }

    #[test]
    fn town_hall_parts_are_named_and_disposable() {
        let tracker = ResourceTracker::default();
        let mut hall = assemble_town_hall(&tracker, 2, Vec3::new(250.0, 64.0, 250.0));
        assert_eq!(tracker.allocated(), 4);
        hall.dispose();
        assert_eq!(tracker.live(), 0);
    }
}
