//! Headless demo host for orrery skies.
//!
//! Loads `config.ron` (created with defaults on first run), applies CLI
//! overrides, builds a sky from `--scene` or the built-in solar scene and runs
//! the update/draw loop against a recording sprite batch.
//!
//! Run with `cargo run -p orrery-demo -- --frames 1200 --cloud-alpha 0.3`.

mod sim;

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use orrery_config::{CliArgs, Config};
use orrery_sky::Scene;
use tracing::{info, warn};

use crate::sim::Simulation;

/// Scene used when `--scene` is not given.
pub(crate) const BUILTIN_SCENE: &str = include_str!("../scenes/solar.ron");

fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(orrery_config::default_config_dir)
        .unwrap_or_else(|| PathBuf::from(".orrery"));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    orrery_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let scene = match &args.scene {
        Some(path) => Scene::load(path)?,
        None => Scene::from_ron_str(BUILTIN_SCENE)?,
    };
    if scene.sky.is_empty() {
        warn!("scene has no bodies");
    }
    info!(
        bodies = scene.sky.len(),
        viewport = format_args!("{}x{}", config.viewport.width, config.viewport.height),
        "sky ready"
    );

    let labels: Vec<_> = scene
        .sky
        .ids()
        .map(|id| (id, scene.name_of(id).unwrap_or("?").to_string()))
        .collect();

    let mut sim = Simulation::new(scene.sky, &config);
    let stats = sim.run(config.simulation.frames, config.simulation.report_interval);

    info!(
        frames = stats.frames,
        day_frames = stats.day_frames,
        transitions = stats.transitions,
        sprites = stats.sprites,
        "run finished"
    );
    if stats.frames > 0 {
        info!(
            "average {:.2} visible bodies per frame",
            stats.visible_bodies as f64 / stats.frames as f64
        );
    }
    for (id, name) in &labels {
        if let Some(body) = sim.sky().get(*id) {
            let p = body.position();
            info!(body = %name, x = p.x, y = p.y, "final position");
        }
    }
    Ok(())
}
