use {
    crate::{
        aabb::AABB,
        assemble::assemble_chunk,
        chunk::{self, CHUNK_SIZE, ChunkCoords, ChunkData, MAX_HEIGHT, world_to_chunk_coords},
        frustum::Frustum,
        scene::{NodeId, ResourceTracker, SceneNode, SceneRoot},
        terrain::TerrainField,
        worker::{WorkerChannel, WorkerEvent},
    },
    glam::Vec3,
    std::{
        collections::{HashMap, HashSet, VecDeque},
        panic::{AssertUnwindSafe, catch_unwind},
        sync::Arc,
    },
};

/// Soft ceiling on cached chunks; eviction only runs above it.
pub const MAX_CACHED_CHUNKS: usize = 100;

/// Eviction removes at least this many entries per pass, so the pass does
/// not run every frame while hovering at the ceiling.
pub const MIN_EVICTIONS: usize = 10;

/// Chunks within render distance + this margin are never evicted.
pub const UNLOAD_MARGIN: i32 = 5;

/// Generation tasks consumed per frame.
pub const TASK_BUDGET_PER_FRAME: usize = 6;

/// Coordinates processed per prerender step.
pub const PRERENDER_BUDGET_PER_FRAME: usize = 8;

pub const DEFAULT_RENDER_DISTANCE: i32 = 3;
pub const MIN_RENDER_DISTANCE: i32 = 1;
pub const MAX_RENDER_DISTANCE: i32 = 30;

fn chebyshev(a: ChunkCoords, b: ChunkCoords) -> i32 {
    (a.0 - b.0).abs().max((a.1 - b.1).abs())
}

/// Chunk cache and streaming controller.
///
/// Owns every chunk subtree it attaches to the scene: nothing else removes
/// or disposes them. Chunks that leave the view are hidden, not evicted;
/// eviction is a separate pass gated on the cache ceiling.
pub struct StreamingController {
    terrain: Arc<TerrainField>,
    tracker: ResourceTracker,
    worker: Option<WorkerChannel>,
    chunks: HashMap<ChunkCoords, NodeId>,
    last_accessed: HashMap<ChunkCoords, u64>,
    /// Candidate set of the most recent visibility pass.
    visible: HashSet<ChunkCoords>,
    /// Coordinates queued or handed to the worker. At most one generation
    /// is ever in flight per coordinate.
    pending: HashSet<ChunkCoords>,
    task_queue: VecDeque<ChunkCoords>,
    /// Viewer chunk of the last full update; unchanged chunk means the
    /// whole pass is skipped.
    last_chunk: Option<ChunkCoords>,
    render_distance: i32,
    frame: u64,
    evicted_total: u64,
    worker_warned: bool,
}

impl StreamingController {
    pub fn new(
        terrain: Arc<TerrainField>,
        tracker: ResourceTracker,
        worker: Option<WorkerChannel>,
    ) -> Self {
        Self {
            terrain,
            tracker,
            worker,
            chunks: HashMap::new(),
            last_accessed: HashMap::new(),
            visible: HashSet::new(),
            pending: HashSet::new(),
            task_queue: VecDeque::new(),
            last_chunk: None,
            render_distance: DEFAULT_RENDER_DISTANCE,
            frame: 0,
            evicted_total: 0,
            worker_warned: false,
        }
    }

    pub fn render_distance(&self) -> i32 {
        self.render_distance
    }

    pub fn set_render_distance(&mut self, distance: i32) {
        let clamped = distance.clamp(MIN_RENDER_DISTANCE, MAX_RENDER_DISTANCE);
        if clamped != distance {
            log::warn!("render distance {distance} clamped to {clamped}");
        }
        if clamped != self.render_distance {
            self.render_distance = clamped;
            // force the next update to rescan even from the same chunk
            self.last_chunk = None;
        }
    }

    pub fn cached_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_cached(&self, coords: ChunkCoords) -> bool {
        self.chunks.contains_key(&coords)
    }

    pub fn is_pending(&self, coords: ChunkCoords) -> bool {
        self.pending.contains(&coords)
    }

    pub fn queued_tasks(&self) -> usize {
        self.task_queue.len()
    }

    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    pub fn chunk_node(&self, coords: ChunkCoords) -> Option<NodeId> {
        self.chunks.get(&coords).copied()
    }

    /// Visibility pass, run once per frame. No-op while the viewer stays
    /// inside the same chunk.
    pub fn update(&mut self, scene: &mut dyn SceneRoot, viewer: Vec3, frustum: &Frustum) {
        self.frame += 1;

        let viewer_chunk = world_to_chunk_coords(viewer.x, viewer.z);
        if self.last_chunk == Some(viewer_chunk) {
            return;
        }
        self.last_chunk = Some(viewer_chunk);

        // the chunk under the viewer is never deferred
        if !self.chunks.contains_key(&viewer_chunk) {
            self.generate_sync(scene, viewer_chunk);
        }

        let distance = self.render_distance;
        let mut wanted = HashSet::new();
        for dx in -distance..=distance {
            for dz in -distance..=distance {
                if dx * dx + dz * dz > distance * distance {
                    continue;
                }
                let coords = (viewer_chunk.0 + dx, viewer_chunk.1 + dz);
                let in_view = coords == viewer_chunk
                    || frustum.intersects_aabb(&AABB::chunk_bounds(coords.0, coords.1));
                if !in_view {
                    continue;
                }
                wanted.insert(coords);

                if let Some(&id) = self.chunks.get(&coords) {
                    scene.set_visible(id, true);
                    self.last_accessed.insert(coords, self.frame);
                } else if self.pending.insert(coords) {
                    self.task_queue.push_back(coords);
                }
            }
        }

        // everything that left the candidate set is hidden, never removed
        for coords in self.visible.difference(&wanted) {
            if let Some(&id) = self.chunks.get(coords) {
                scene.set_visible(id, false);
            }
        }
        self.visible = wanted;

        self.manage_chunk_cache(scene, viewer_chunk);
    }

    /// Consume worker replies and up to `budget` queued generation tasks.
    pub fn drain_tasks(&mut self, scene: &mut dyn SceneRoot, budget: usize) {
        self.poll_worker(scene);

        for _ in 0..budget {
            let Some(coords) = self.task_queue.pop_front() else {
                break;
            };

            // realized since it was queued (sync viewer path or prerender)
            if let Some(&id) = self.chunks.get(&coords) {
                self.pending.remove(&coords);
                if self.visible.contains(&coords) {
                    scene.set_visible(id, true);
                    self.last_accessed.insert(coords, self.frame);
                }
                continue;
            }

            let issued = self
                .worker
                .as_mut()
                .map(|worker| worker.request(coords.0, coords.1));
            match issued {
                // stays pending until the reply arrives
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    let came_up = self
                        .worker
                        .as_ref()
                        .is_some_and(WorkerChannel::is_initialized);
                    self.note_worker_failure(&err.to_string(), came_up);
                    self.generate_sync(scene, coords);
                }
                None => self.generate_sync(scene, coords),
            }
        }
    }

    fn poll_worker(&mut self, scene: &mut dyn SceneRoot) {
        let Some(worker) = &mut self.worker else {
            return;
        };
        for event in worker.poll() {
            match event {
                WorkerEvent::Initialized => log::debug!("generation worker ready"),
                WorkerEvent::ChunkGenerated { cx, cz, data } => {
                    let coords = (cx, cz);
                    if !self.pending.contains(&coords) || self.chunks.contains_key(&coords) {
                        log::debug!("dropping stale generation for {coords:?}");
                        self.pending.remove(&coords);
                        continue;
                    }
                    self.realize(scene, coords, &data);
                }
                WorkerEvent::Failed { cx, cz, message } => {
                    log::warn!("worker failed on ({cx}, {cz}): {message}, generating inline");
                    let coords = (cx, cz);
                    if self.pending.contains(&coords) && !self.chunks.contains_key(&coords) {
                        self.generate_sync(scene, coords);
                    } else {
                        self.pending.remove(&coords);
                    }
                }
            }
        }
    }

    fn note_worker_failure(&mut self, message: &str, came_up: bool) {
        if self.worker_warned {
            log::debug!("generation worker unavailable: {message}");
        } else if came_up {
            log::warn!("generation worker lost, falling back to inline generation: {message}");
            self.worker_warned = true;
        } else {
            log::warn!(
                "generation worker never initialized, falling back to inline generation: {message}"
            );
            self.worker_warned = true;
        }
    }

    fn generate_sync(&mut self, scene: &mut dyn SceneRoot, coords: ChunkCoords) {
        let terrain = Arc::clone(&self.terrain);
        match catch_unwind(AssertUnwindSafe(|| {
            chunk::generate(&terrain, coords.0, coords.1)
        })) {
            Ok(data) => {
                self.realize(scene, coords, &data);
            }
            Err(_) => {
                // leave it absent; the next visibility pass re-enqueues it
                log::warn!("chunk generation failed at {coords:?}, skipping");
                self.pending.remove(&coords);
            }
        }
    }

    fn realize(&mut self, scene: &mut dyn SceneRoot, coords: ChunkCoords, data: &ChunkData) -> NodeId {
        let node = assemble_chunk(&self.tracker, coords.0, coords.1, data);
        let id = scene.add(SceneNode::Chunk(node));
        scene.set_visible(id, self.visible.contains(&coords));
        self.chunks.insert(coords, id);
        self.last_accessed.insert(coords, self.frame);
        self.pending.remove(&coords);
        id
    }

    /// Evict the least recently touched chunks once the cache exceeds its
    /// ceiling. Members of the current candidate set and chunks near the
    /// viewer are exempt.
    fn manage_chunk_cache(&mut self, scene: &mut dyn SceneRoot, viewer_chunk: ChunkCoords) {
        if self.chunks.len() <= MAX_CACHED_CHUNKS {
            return;
        }
        let target = (self.chunks.len() - MAX_CACHED_CHUNKS).max(MIN_EVICTIONS);
        let unload_distance = self.render_distance + UNLOAD_MARGIN;

        let mut entries: Vec<(ChunkCoords, u64)> = self
            .chunks
            .keys()
            .map(|&coords| {
                (
                    coords,
                    self.last_accessed.get(&coords).copied().unwrap_or(0),
                )
            })
            .collect();
        entries.sort_by_key(|&(_, touched)| touched);

        let mut evicted = 0usize;
        for (coords, _) in entries {
            if evicted >= target {
                break;
            }
            if self.visible.contains(&coords) {
                continue;
            }
            if chebyshev(coords, viewer_chunk) <= unload_distance {
                continue;
            }
            if let Some(id) = self.chunks.remove(&coords) {
                self.last_accessed.remove(&coords);
                if let Some(mut node) = scene.remove(id) {
                    node.dispose();
                }
                evicted += 1;
            }
        }

        if evicted > 0 {
            self.evicted_total += evicted as u64;
            log::debug!(
                "evicted {evicted} chunks, {} cached",
                self.chunks.len()
            );
        }
    }

    /// Exact terrain height under (x, z): a downward probe against the
    /// realized chunk geometry, which respects cave carving. Falls back to
    /// the procedural height when the chunk is not realized.
    pub fn terrain_height(&self, scene: &dyn SceneRoot, x: f32, z: f32) -> i32 {
        if !x.is_finite() || !z.is_finite() {
            log::warn!("non-finite height query ({x}, {z})");
            return self.terrain.height_at(0.0, 0.0);
        }

        let coords = world_to_chunk_coords(x, z);
        if let Some(&id) = self.chunks.get(&coords) {
            if let Some(node) = scene.chunk(id) {
                let local_x = (x.floor() as i32).rem_euclid(CHUNK_SIZE as i32) as usize;
                let local_z = (z.floor() as i32).rem_euclid(CHUNK_SIZE as i32) as usize;
                if let Some(y) = node.surface_y(local_x, local_z) {
                    if (0..MAX_HEIGHT as i32).contains(&y) {
                        return y;
                    }
                }
            }
        }
        self.terrain.height_at(x, z)
    }

    pub fn prerender_area(
        &self,
        center: ChunkCoords,
        radius: i32,
        landmarks: &[ChunkCoords],
    ) -> PrerenderJob {
        PrerenderJob::new(center, radius, landmarks)
    }
}

/// Warms the cache over a square chunk area before the viewer arrives.
/// Landmark chunks go first, then the rest in distance-ascending order
/// from the center.
pub struct PrerenderJob {
    queue: VecDeque<ChunkCoords>,
}

impl PrerenderJob {
    pub fn new(center: ChunkCoords, radius: i32, landmarks: &[ChunkCoords]) -> Self {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        for &coords in landmarks {
            if seen.insert(coords) {
                queue.push_back(coords);
            }
        }

        let mut area = Vec::new();
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                let coords = (center.0 + dx, center.1 + dz);
                if !seen.contains(&coords) {
                    area.push(coords);
                }
            }
        }
        area.sort_by_key(|&(cx, cz)| {
            let dx = cx - center.0;
            let dz = cz - center.1;
            dx * dx + dz * dz
        });
        queue.extend(area);

        Self { queue }
    }

    /// Realize up to PRERENDER_BUDGET_PER_FRAME coordinates. Coordinates
    /// already in flight elsewhere are requeued rather than generated a
    /// second time. Returns how many were processed.
    pub fn step(
        &mut self,
        controller: &mut StreamingController,
        scene: &mut dyn SceneRoot,
    ) -> usize {
        let mut processed = 0;
        while processed < PRERENDER_BUDGET_PER_FRAME {
            let Some(coords) = self.queue.pop_front() else {
                break;
            };
            processed += 1;

            if controller.is_cached(coords) {
                continue;
            }
            if controller.is_pending(coords) {
                self.queue.push_back(coords);
                continue;
            }
            controller.generate_sync(scene, coords);
        }
        processed
    }

    pub fn is_done(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}
