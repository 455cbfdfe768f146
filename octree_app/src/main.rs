//! Headless batching demo
//!
//! Fills a scene with drifting objects spread over many regions, then runs
//! the spatial index and batching pipeline for a fixed number of frames,
//! logging what each frame produced.
//!
//! Usage: `octree_batch_demo [config.toml|config.ron]`

use rand::prelude::*;
use render_octree::foundation::time::Stopwatch;
use render_octree::prelude::*;

const OBJECT_COUNT: usize = 5000;
const FRAME_COUNT: u64 = 240;
const WORLD_EXTENT: f32 = 600.0;
const MAX_SPEED: f32 = 40.0;
const FRAME_DELTA: f32 = 1.0 / 60.0;
/// Objects replaced every frame
const CHURN_PER_FRAME: usize = 25;
const STATS_INTERVAL: u64 = 60;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] render_octree::core::ConfigError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

struct Drifter {
    handle: ObjectHandle,
    position: Vec3,
    velocity: Vec3,
    half_extent: f32,
}

struct DemoWorld {
    scene: SceneObjects,
    drifters: Vec<Drifter>,
    meshes: Vec<MeshRef>,
    materials: Vec<MaterialRef>,
    rng: StdRng,
}

impl DemoWorld {
    fn new(materials: Vec<MaterialRef>) -> Self {
        let meshes = (0..4u32)
            .flat_map(|source| (0..=source as u16).map(move |submesh| MeshRef::new(MeshSourceRef(source), submesh)))
            .collect();

        Self {
            scene: SceneObjects::new(),
            drifters: Vec::with_capacity(OBJECT_COUNT),
            meshes,
            materials,
            rng: StdRng::seed_from_u64(0x0C7_7EE),
        }
    }

    fn random_point(&mut self, extent: f32) -> Vec3 {
        Vec3::new(
            self.rng.gen_range(-extent..extent),
            self.rng.gen_range(-extent..extent),
            self.rng.gen_range(-extent..extent),
        )
    }

    fn spawn_drifter(&mut self) {
        let position = self.random_point(WORLD_EXTENT);
        let velocity = self.random_point(MAX_SPEED);
        let half_extent = self.rng.gen_range(0.25..2.0);

        // One object in fifty has no mesh and is skipped by the batcher
        let mesh = if self.rng.gen_ratio(1, 50) {
            None
        } else {
            self.meshes.choose(&mut self.rng).copied()
        };
        let material = self.materials.choose(&mut self.rng).copied();

        let handle = self.scene.spawn(mesh, material, &Transform::from_position(position), half_extent);
        self.drifters.push(Drifter { handle, position, velocity, half_extent });
    }

    fn step(&mut self) {
        self.scene.begin_frame();

        for _ in 0..CHURN_PER_FRAME.min(self.drifters.len()) {
            let index = self.rng.gen_range(0..self.drifters.len());
            let drifter = self.drifters.swap_remove(index);
            self.scene.destroy(drifter.handle);
            self.spawn_drifter();
        }

        for drifter in &mut self.drifters {
            drifter.position += drifter.velocity * FRAME_DELTA;
            for axis in 0..3 {
                if drifter.position[axis].abs() > WORLD_EXTENT {
                    drifter.velocity[axis] = -drifter.velocity[axis];
                }
            }
            self.scene.set_transform(drifter.handle, &Transform::from_position(drifter.position), drifter.half_extent);
        }
    }
}

fn build_assets() -> (MaterialLibrary, Vec<MaterialRef>) {
    let mut assets = MaterialLibrary::new();
    let shaders = [
        assets.register_shader("pbr"),
        assets.register_shader("unlit"),
        assets.register_shader("emissive"),
    ];

    let mut materials: Vec<MaterialRef> = (0..9)
        .map(|i| assets.register_material(format!("material_{i}"), Some(shaders[i % shaders.len()])))
        .collect();
    // Drawn with the default material
    materials.push(assets.register_material("unfinished", None));

    (assets, materials)
}

fn run() -> Result<(), DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load_from_file(&path)?,
        None => PipelineConfig::default(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str()))
        .init();
    log::info!("Starting batching demo with {:?}", config.spatial);

    let (assets, materials) = build_assets();
    let mut world = DemoWorld::new(materials);
    for _ in 0..OBJECT_COUNT {
        world.spawn_drifter();
    }

    let mut frame = FrameContext::new(&config)?;
    let mut total_time = Stopwatch::new();

    for frame_index in 0..FRAME_COUNT {
        if frame_index > 0 {
            world.step();
        }

        total_time.start();
        let shaders = frame.run_frame(&mut world.scene, &assets)?.shader_count();
        total_time.stop();

        if frame_index % STATS_INTERVAL == 0 {
            let stats = frame.frame_stats();
            let index = frame.index_stats();
            log::info!(
                "Frame {}: {} regions, {} instances in {} draws over {} shaders ({} meshless, {} fallbacks)",
                frame_index,
                stats.regions_walked,
                stats.flags,
                stats.segments,
                shaders,
                stats.walk.skipped_no_mesh,
                stats.walk.material_fallbacks,
            );
            log::info!(
                "  index: +{} -{} moved {} cross-region {} unchanged {}; walk {}us sort {}us compress {}us",
                index.inserted,
                index.removed,
                index.moved,
                index.cross_region,
                index.unchanged,
                stats.walk_us,
                stats.sort_us,
                stats.compress_us,
            );
        }
    }

    log::info!(
        "Ran {} frames in {:.2}ms ({:.3}ms per frame), {} regions",
        FRAME_COUNT,
        total_time.elapsed().as_secs_f64() * 1000.0,
        total_time.elapsed().as_secs_f64() * 1000.0 / FRAME_COUNT as f64,
        frame.spatial().region_count(),
    );
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        log::error!("{}", error);
        eprintln!("octree_batch_demo: {error}");
        std::process::exit(1);
    }
}
