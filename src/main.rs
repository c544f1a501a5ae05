use {
    clap::Parser,
    glam::{Mat4, Vec3},
    std::{sync::Arc, time::Instant},
    voxide::{
        chunk::world_to_chunk_coords,
        frustum::Frustum,
        furniture::TownHalls,
        scene::SceneGraph,
        streaming::{DEFAULT_RENDER_DISTANCE, StreamingController, TASK_BUDGET_PER_FRAME},
        terrain::TerrainField,
        worker::WorkerChannel,
    },
};

#[derive(Parser)]
#[command(about = "headless chunk streaming driver")]
struct Args {
    /// World seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Render distance in chunks
    #[arg(long, default_value_t = DEFAULT_RENDER_DISTANCE)]
    render_distance: i32,

    /// Flat terrain mode
    #[arg(long)]
    flat: bool,

    /// Generate chunks inline instead of on the worker thread
    #[arg(long)]
    no_worker: bool,

    /// Prerender radius in chunks around spawn, 0 disables
    #[arg(long, default_value_t = 0)]
    prerender: i32,

    /// Simulated frames to run
    #[arg(long, default_value_t = 600)]
    frames: u32,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let terrain = Arc::new(TerrainField::new(args.seed));
    terrain.set_flat_mode(args.flat);

    let mut scene = SceneGraph::new();
    let tracker = scene.tracker();

    let worker = (!args.no_worker).then(|| WorkerChannel::spawn(Arc::clone(&terrain)));
    let mut controller = StreamingController::new(Arc::clone(&terrain), tracker.clone(), worker);
    controller.set_render_distance(args.render_distance);

    let mut halls = TownHalls::new();
    halls.place(&mut scene, &tracker, &terrain);

    if args.prerender > 0 {
        let start = Instant::now();
        let mut job = controller.prerender_area((0, 0), args.prerender, &halls.landmark_chunks());
        while !job.is_done() {
            job.step(&mut controller, &mut scene);
            controller.drain_tasks(&mut scene, TASK_BUDGET_PER_FRAME);
        }
        log::info!(
            "prerendered {} chunks in {}ms",
            controller.cached_chunks(),
            start.elapsed().as_millis()
        );
    }

    // scripted viewer path: a slow outward spiral over the terrain
    for frame in 0..args.frames {
        let t = frame as f32 / 60.0;
        let radius = 24.0 + t * 12.0;
        let angle = t * 0.35;
        let x = radius * angle.cos();
        let z = radius * angle.sin();
        let y = controller.terrain_height(&scene, x, z) as f32 + 2.0;
        let eye = Vec3::new(x, y, z);
        let forward = Vec3::new(-angle.sin(), 0.0, angle.cos());

        let view = Mat4::look_at_rh(eye, eye + forward, Vec3::Y);
        let proj = Mat4::perspective_rh(80f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0);
        let frustum = Frustum::from_matrix(proj * view);

        controller.update(&mut scene, eye, &frustum);
        controller.drain_tasks(&mut scene, TASK_BUDGET_PER_FRAME);

        // once per simulated second
        if frame % 60 == 0 || frame + 1 == args.frames {
            log::info!(
                "frame {frame} | chunk {:?} | cached {} | queued {} | evicted {} | live buffers {}",
                world_to_chunk_coords(eye.x, eye.z),
                controller.cached_chunks(),
                controller.queued_tasks(),
                controller.evicted_total(),
                tracker.live(),
            );
        }
    }
}
