use {
    crate::{
        assemble::assemble_town_hall,
        chunk::{ChunkCoords, world_to_chunk_coords},
        scene::{NodeId, ResourceTracker, SceneNode, SceneRoot},
        terrain::TerrainField,
    },
    glam::Vec3,
};

/// Side length of the populated world area. Town halls sit a quarter of it
/// out from the origin in every diagonal direction.
pub const WORLD_SIZE: i32 = 1000;

struct HallSite {
    id: usize,
    x: i32,
    z: i32,
}

/// Static world furniture: four town halls attached once, directly under
/// the persistent root. They are never hidden and never evicted, so the
/// streaming controller does not know about them at all.
pub struct TownHalls {
    sites: Vec<HallSite>,
    nodes: Vec<NodeId>,
    placed: bool,
}

impl TownHalls {
    pub fn new() -> Self {
        let offset = WORLD_SIZE / 4;
        let sites = [(offset, offset), (offset, -offset), (-offset, offset), (-offset, -offset)]
            .into_iter()
            .enumerate()
            .map(|(id, (x, z))| HallSite { id, x, z })
            .collect();
        Self {
            sites,
            nodes: Vec::new(),
            placed: false,
        }
    }

    /// Attach every hall to the scene, sampling the terrain height once per
    /// site. Calling again is a no-op: the halls persist for the lifetime
    /// of the world.
    pub fn place(
        &mut self,
        scene: &mut dyn SceneRoot,
        tracker: &ResourceTracker,
        terrain: &TerrainField,
    ) {
        if self.placed {
            log::debug!("town halls already placed");
            return;
        }
        self.placed = true;

        for site in &self.sites {
            let ground = terrain.height_at(site.x as f32, site.z as f32);
            let position = Vec3::new(site.x as f32, (ground + 1) as f32, site.z as f32);
            let hall = assemble_town_hall(tracker, site.id, position);
            let id = scene.add(SceneNode::TownHall(hall));
            self.nodes.push(id);
            log::info!(
                "placed town hall {} at ({}, {}, {})",
                site.id,
                position.x,
                position.y,
                position.z
            );
        }
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Chunk coordinates containing a hall, prioritized by area prerender.
    pub fn landmark_chunks(&self) -> Vec<ChunkCoords> {
        self.sites
            .iter()
            .map(|site| world_to_chunk_coords(site.x as f32, site.z as f32))
            .collect()
    }
}

impl Default for TownHalls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::scene::SceneGraph};

    #[test]
    fn placement_is_idempotent() {
        let mut scene = SceneGraph::new();
        let tracker = scene.tracker();
        let terrain = TerrainField::new(7);
        let mut halls = TownHalls::new();

        halls.place(&mut scene, &tracker, &terrain);
        assert!(halls.is_placed());
        assert_eq!(scene.len(), 4);
        let allocated = tracker.allocated();

        halls.place(&mut scene, &tracker, &terrain);
        assert_eq!(scene.len(), 4);
        assert_eq!(tracker.allocated(), allocated);
        assert_eq!(halls.node_ids().len(), 4);
    }

    #[test]
    fn halls_sit_on_the_diagonals() {
        let halls = TownHalls::new();
        let chunks = halls.landmark_chunks();
        assert_eq!(chunks.len(), 4);
        let offset = WORLD_SIZE / 4;
        assert!(chunks.contains(&world_to_chunk_coords(offset as f32, offset as f32)));
        assert!(chunks.contains(&world_to_chunk_coords(-offset as f32, -offset as f32)));
    }

    #[test]
    fn placement_height_is_sampled_only_once() {
        let mut scene = SceneGraph::new();
        let tracker = scene.tracker();
        let terrain = TerrainField::new(99);
        let mut halls = TownHalls::new();
        halls.place(&mut scene, &tracker, &terrain);

        // placement never reads the scene again, so a later flat-mode flip
        // must not move the halls
        terrain.set_flat_mode(true);
        halls.place(&mut scene, &tracker, &terrain);
        assert_eq!(scene.len(), 4);
    }
}
