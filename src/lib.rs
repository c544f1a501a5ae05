pub mod aabb;
pub mod assemble;
pub mod biome;
pub mod block;
pub mod chunk;
pub mod frustum;
pub mod furniture;
pub mod noise;
pub mod scene;
pub mod streaming;
pub mod terrain;
pub mod worker;

pub use {
    aabb::AABB,
    chunk::{CHUNK_SIZE, ChunkCoords, ChunkData, MAX_HEIGHT},
    frustum::Frustum,
    scene::{SceneGraph, SceneRoot},
    streaming::{PrerenderJob, StreamingController},
    terrain::TerrainField,
    worker::WorkerChannel,
};
