/*
 * Life Ecosystem Simulation
 *
 * Birds, wandering creatures and plants share a wrap-around world. Agents
 * flock with their own kind, flee larger strangers and predators, hunt
 * smaller prey when hungry, grow, reproduce and die of age or starvation.
 *
 * Usage: life [params.json]
 * Logging is controlled with RUST_LOG (e.g. RUST_LOG=life=debug).
 */

use anyhow::Context;
use nannou::prelude::*;
use tracing::{error, info};

use life::{renderer, SimulationParams, World};

/// Ticks between status lines in the log.
const STATUS_INTERVAL: u64 = 600;

struct Model {
    world: World,
}

fn main() {
    init_tracing();
    nannou::app(model).update(update).run();
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn build_world() -> anyhow::Result<World> {
    let params = match std::env::args().nth(1) {
        Some(path) => SimulationParams::from_json_file(&path)
            .with_context(|| format!("loading simulation parameters from {path}"))?,
        None => SimulationParams::default(),
    };
    let mut world = World::new(params).context("building world")?;
    world.populate().context("spawning initial population")?;
    Ok(world)
}

// Initialize the model
fn model(app: &App) -> Model {
    let world = match build_world() {
        Ok(world) => world,
        Err(err) => {
            error!("{err:#}");
            std::process::exit(1);
        }
    };

    let params = world.params();
    app.new_window()
        .title("Life")
        .size(params.viewport_width as u32, params.viewport_height as u32)
        .view(view)
        .build()
        .expect("Failed to create window");

    info!(population = world.len(), "Starting Life simulation");
    Model { world }
}

// Advance the simulation by one tick per frame
fn update(app: &App, model: &mut Model, update: Update) {
    let info = model.world.debug_info_mut();
    info.fps = app.fps();
    info.frame_time = update.since_last;

    let info = model.world.tick();
    if info.tick > 0 && info.tick % STATUS_INTERVAL == 0 {
        info!(
            tick = info.tick,
            fps = info.fps,
            population = ?info.population_by_kind,
            "simulation status"
        );
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);
    renderer::draw_world(&draw, &model.world);
    draw.to_frame(app, &frame).expect("Failed to draw frame");
}
