use {
    crate::assemble::{ChunkNode, TownHallNode},
    std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Handle to a subtree attached to the persistent render graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// Shared allocation/disposal counters. Every render resource created
/// through a tracker is counted, so leak checks reduce to comparing the
/// two counts.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    allocated: Arc<AtomicUsize>,
    disposed: Arc<AtomicUsize>,
}

impl ResourceTracker {
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::Relaxed)
    }

    pub fn live(&self) -> usize {
        self.allocated() - self.disposed()
    }
}

/// Opaque owned geometry/material resource. Stands in for a GPU-side
/// instance buffer: a fixed capacity with only the first `active`
/// instances drawn.
#[derive(Debug)]
pub struct RenderBuffer {
    capacity: usize,
    active: usize,
    disposed: bool,
    tracker: ResourceTracker,
}

impl RenderBuffer {
    pub fn new(tracker: &ResourceTracker, capacity: usize) -> Self {
        tracker.allocated.fetch_add(1, Ordering::Relaxed);
        Self {
            capacity,
            active: 0,
            disposed: false,
            tracker: tracker.clone(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, count: usize) {
        debug_assert!(count <= self.capacity);
        self.active = count.min(self.capacity);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release the resource. Must happen exactly once, on the main thread,
    /// before the owning cache entry is removed.
    pub fn dispose(&mut self) {
        debug_assert!(!self.disposed, "render buffer disposed twice");
        if !self.disposed {
            self.disposed = true;
            self.tracker.disposed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Tagged subtree variants. Entities are plain data; behavior lives in
/// free functions dispatched on the tag, never in the node itself.
#[derive(Debug)]
pub enum SceneNode {
    Chunk(ChunkNode),
    TownHall(TownHallNode),
}

impl SceneNode {
    pub fn dispose(&mut self) {
        match self {
            SceneNode::Chunk(chunk) => chunk.dispose(),
            SceneNode::TownHall(hall) => hall.dispose(),
        }
    }
}

/// Boundary contract of the external render-graph owner. The streaming
/// controller only ever talks to this seam.
pub trait SceneRoot {
    fn add(&mut self, node: SceneNode) -> NodeId;

    /// Detach a subtree and hand ownership back to the caller, who is
    /// responsible for disposing it.
    fn remove(&mut self, id: NodeId) -> Option<SceneNode>;

    fn set_visible(&mut self, id: NodeId, visible: bool);

    fn is_visible(&self, id: NodeId) -> bool;

    fn chunk(&self, id: NodeId) -> Option<&ChunkNode>;
}

struct Attached {
    node: SceneNode,
    visible: bool,
}

/// In-memory render graph used by the frame driver and the tests.
pub struct SceneGraph {
    nodes: std::collections::HashMap<NodeId, Attached>,
    next_id: u64,
    tracker: ResourceTracker,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: std::collections::HashMap::new(),
            next_id: 0,
            tracker: ResourceTracker::default(),
        }
    }

    pub fn tracker(&self) -> ResourceTracker {
        self.tracker.clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRoot for SceneGraph {
    fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Attached {
                node,
                visible: true,
            },
        );
        id
    }

    fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        self.nodes.remove(&id).map(|attached| attached.node)
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(attached) = self.nodes.get_mut(&id) {
            attached.visible = visible;
        }
    }

    fn is_visible(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|attached| attached.visible)
    }

    fn chunk(&self, id: NodeId) -> Option<&ChunkNode> {
        match self.nodes.get(&id) {
            Some(Attached {
                node: SceneNode::Chunk(chunk),
                ..
            }) => Some(chunk),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposal_is_counted_once() {
        let tracker = ResourceTracker::default();
        let mut buffer = RenderBuffer::new(&tracker, 128);
        assert_eq!(tracker.allocated(), 1);
        assert_eq!(tracker.disposed(), 0);

        buffer.dispose();
        assert_eq!(tracker.disposed(), 1);
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn active_count_is_clamped_to_capacity() {
        let tracker = ResourceTracker::default();
        let mut buffer = RenderBuffer::new(&tracker, 4);
        buffer.set_active(3);
        assert_eq!(buffer.active(), 3);
    }

    #[test]
    fn visibility_toggles_without_removal() {
        let mut scene = SceneGraph::new();
        let tracker = scene.tracker();
        let node = crate::assemble::assemble_chunk(
            &tracker,
            0,
            0,
            &crate::chunk::ChunkData::default(),
        );
        let id = scene.add(SceneNode::Chunk(node));

        assert!(scene.is_visible(id));
        scene.set_visible(id, false);
        assert!(!scene.is_visible(id));
        assert_eq!(scene.len(), 1);

        let mut removed = scene.remove(id).unwrap();
        removed.dispose();
        assert_eq!(scene.len(), 0);
        assert_eq!(tracker.live(), 0);
    }
}
