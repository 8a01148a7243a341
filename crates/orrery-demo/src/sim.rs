//! Headless frame loop: clock, viewer and sky driven against a recording batch.

use glam::Vec2;
use orrery_config::Config;
use orrery_sky::{BatchState, Environment, RecordingBatch, Sky, SkyClock, SpriteBatch};
use tracing::{info, trace};

/// Counters accumulated over a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub frames: u32,
    /// Frames that ended during the day half.
    pub day_frames: u32,
    /// Sum over frames of the bodies that were visible.
    pub visible_bodies: usize,
    /// Sprites submitted to the batch.
    pub sprites: usize,
    /// Day/night transitions observed.
    pub transitions: u32,
}

/// One sky plus the host state that drives it.
pub struct Simulation {
    sky: Sky,
    clock: SkyClock,
    env: Environment,
    batch: RecordingBatch,
    ticks_per_frame: f64,
    player_speed: f32,
    trace_batch: bool,
    stats: RunStats,
}

impl Simulation {
    pub fn new(sky: Sky, config: &Config) -> Self {
        let mut clock = SkyClock::new(config.clock.day_length, config.clock.night_length);
        clock.is_day = config.clock.start_in_day;
        clock.tick(config.clock.start_time);

        let mut env = Environment {
            viewport: Vec2::new(config.viewport.width as f32, config.viewport.height as f32),
            world_width: config.world.width,
            surface_height: config.world.surface_height,
            cloud_alpha: config.simulation.cloud_alpha,
            ..Default::default()
        };
        let start = config.world.player_start.map_or(
            Vec2::new(env.world_width / 2.0, env.surface_height / 2.0),
            |(x, y)| Vec2::new(x, y),
        );
        env.center_on_player(start);
        clock.apply(&mut env);

        Self {
            sky,
            clock,
            env,
            batch: RecordingBatch::begun(BatchState::default()),
            ticks_per_frame: config.clock.ticks_per_frame,
            player_speed: config.world.player_speed,
            trace_batch: config.debug.trace_batch,
            stats: RunStats::default(),
        }
    }

    pub fn sky(&self) -> &Sky {
        &self.sky
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Advance the clock and the viewer, then update and draw the sky.
    ///
    /// Returns the number of visible bodies this frame.
    pub fn step(&mut self) -> usize {
        let was_day = self.clock.is_day;
        self.clock.tick(self.ticks_per_frame);
        self.clock.apply(&mut self.env);
        if self.clock.is_day != was_day {
            self.stats.transitions += 1;
            info!(is_day = self.clock.is_day, "sky turned over");
        }

        let mut player = self.env.player_center;
        player.x = (player.x + self.player_speed).rem_euclid(self.env.world_width.max(1.0));
        self.env.center_on_player(player);

        self.batch.clear();
        let visible = self.sky.render(&mut self.batch, &self.env);
        debug_assert!(self.batch.is_begun(), "host batch left closed");

        if self.trace_batch {
            for command in self.batch.commands() {
                trace!(?command, "batch");
            }
        }

        self.stats.frames += 1;
        if self.env.is_day {
            self.stats.day_frames += 1;
        }
        self.stats.visible_bodies += visible;
        self.stats.sprites += self.batch.draws().count();
        visible
    }

    /// Run `frames` frames, logging a summary every `report_interval` frames.
    pub fn run(&mut self, frames: u32, report_interval: u32) -> RunStats {
        for frame in 1..=frames {
            let visible = self.step();
            if report_interval > 0 && frame % report_interval == 0 {
                info!(
                    frame,
                    is_day = self.env.is_day,
                    fraction = format_args!("{:.3}", self.env.time_fraction()),
                    visible,
                    sprites = self.batch.draws().count(),
                    "frame summary"
                );
            }
        }
        self.stats
    }
}
