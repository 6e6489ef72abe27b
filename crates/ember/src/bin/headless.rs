//! # EMBER Headless Runner
//!
//! Runs the full engine loop against a device-less backend: resource
//! loads, the fixed-step simulation, the frame hand-off and the graphics
//! thread's visibility and pass scheduling.
//!
//! ## Usage
//!
//! ```bash
//! ember_headless --frames 600 --config ember.toml
//! RUST_LOG=ember=debug ember_headless
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use ember::{Engine, EngineConfig, EngineContext, EngineResult, Game};
use ember_core::{LoadMode, MemorySource};
use ember_rendering::{
    HeadlessBackend, Light, Mat4, Material, MaterialParams, Model, ModelParams, RenderWorld,
    RenderWorldInstance, UiCommand, Vec3,
};
use tracing_subscriber::EnvFilter;

const CUBE_OBJ: &str = "\
o cube
v -0.5 -0.5 -0.5
v  0.5 -0.5 -0.5
v  0.5  0.5 -0.5
v -0.5  0.5 -0.5
v -0.5 -0.5  0.5
v  0.5 -0.5  0.5
v  0.5  0.5  0.5
v -0.5  0.5  0.5
f 1 3 2
f 1 4 3
f 5 6 7
f 5 7 8
f 1 2 6
f 1 6 5
f 4 7 3
f 4 8 7
f 1 5 8
f 1 8 4
f 2 3 7
f 2 7 6
";

const CRATE_MATERIAL: &str = "\
name = \"crate\"

[textures]
";

const GRID: i32 = 8;
const SPACING: f32 = 3.0;
const ORBIT_SPEED: f32 = 0.4;

/// A grid of cubes under a sun, seen from an orbiting camera.
#[derive(Default)]
struct OrbitDemo {
    angle: f32,
    frame: u64,
}

impl Game for OrbitDemo {
    #[allow(clippy::cast_precision_loss)]
    fn on_start(&mut self, ctx: &EngineContext, world: &mut RenderWorld) {
        let cube = ctx.load::<Model>(ModelParams::new("cube.obj"), LoadMode::NonBlocking);
        let material = ctx.load::<Material>(MaterialParams::new("crate.toml"), LoadMode::NonBlocking);

        let half = GRID / 2;
        for x in -half..half {
            for z in -half..half {
                let position = Vec3::new(x as f32 * SPACING, 0.0, z as f32 * SPACING);
                world.add_instance(
                    RenderWorldInstance::new(Mat4::from_translation(position), cube.clone())
                        .with_material(material.clone()),
                );
            }
        }
        world.add_light(
            Light::directional(Vec3::new(-0.3, -1.0, -0.2), Vec3::ONE).with_shadows(true),
        );

        world.camera_mut().far = 60.0;
        tracing::info!("Demo scene: {} instances", world.instances().len());
    }

    fn on_fixed_update(&mut self, dt: f32, _ctx: &EngineContext, world: &mut RenderWorld) {
        self.angle += ORBIT_SPEED * dt;
        let camera = world.camera_mut();
        camera.position = Vec3::new(self.angle.cos() * 20.0, 8.0, self.angle.sin() * 20.0);
        camera.target = Vec3::ZERO;
    }

    fn on_update(&mut self, _dt: f32, _ctx: &EngineContext, _world: &mut RenderWorld) {
        self.frame += 1;
    }

    fn on_ui(&mut self, ui: &mut Vec<UiCommand>) {
        ui.push(UiCommand::Text {
            position: [8.0, 16.0],
            text: format!("frame {}", self.frame),
            color: [255, 255, 255, 255],
        });
    }

    fn on_shutdown(&mut self) {
        tracing::info!("Demo ran {} frames", self.frame);
    }
}

struct Args {
    frames: u64,
    config: Option<String>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        frames: 600,
        config: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" | "-f" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.frames = value.parse().unwrap_or(600);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.config = Some(value.clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: ember_headless [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -f, --frames <N>       Frames to run (default: 600)");
                println!("  -c, --config <PATH>    Engine config TOML");
                println!("  -h, --help             Show this help");
                return None;
            }
            other => tracing::warn!("Ignoring unknown argument \"{}\"", other),
        }
        i += 1;
    }
    Some(parsed)
}

fn run(args: &Args) -> EngineResult<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let [width, height] = config.window_size;
    let step = config.fixed_timestep;

    let source = MemorySource::new()
        .with_file("cube.obj", CUBE_OBJ)
        .with_file("crate.toml", CRATE_MATERIAL);
    let backend = HeadlessBackend::new(width, height);
    let mut engine = Engine::with_source(config, Arc::new(source), backend, OrbitDemo::default())?;

    let start = Instant::now();
    for _ in 0..args.frames {
        let report = engine.tick(step)?;
        if report.frame > 0 && report.frame % 120 == 0 {
            let stats = engine.render_stats();
            tracing::info!(
                "Frame {}: {} visible, {} draw calls, {:.2} ms",
                report.frame,
                stats.last_visible(),
                stats.draw_calls,
                stats.frame_time_ms
            );
        }
    }
    let elapsed = start.elapsed();

    let stats = engine.shutdown()?;
    println!("┌─ EMBER HEADLESS ─────────────────────────────────────────────────┐");
    println!("│ Frames:             {}", stats.frames);
    println!("│ Draw calls:         {}", stats.draw_calls);
    println!("│ Shadow draw calls:  {}", stats.shadow_draw_calls);
    println!("│ UI commands:        {}", stats.ui_commands);
    println!("│ Worst frame:        {:.3} ms", stats.worst_frame_time_ms);
    println!("│ Wall time:          {:.3} s", elapsed.as_secs_f64());
    println!("└──────────────────────────────────────────────────────────────────┘");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args() else {
        return ExitCode::SUCCESS;
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("ember_headless failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
