//! Host environment snapshot and the day/night sky clock.
//!
//! Bodies never read host globals. Every update and draw receives an
//! [`Environment`] describing the frame: viewport, where the screen sits in
//! the world, the local player, time of day and cloud cover. [`SkyClock`]
//! is a small host-side helper that advances the day/night halves and writes
//! them into a snapshot.

use glam::Vec2;

/// Default length of the day half in ticks.
pub const DEFAULT_DAY_LENGTH: f64 = 54_000.0;
/// Default length of the night half in ticks.
pub const DEFAULT_NIGHT_LENGTH: f64 = 32_400.0;

/// Read-only view of the host state for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    /// Host simulation is paused; updates become no-ops.
    pub paused: bool,
    /// Ticks elapsed in the active day or night half.
    pub time: f64,
    /// `true` during the day half, `false` during the night half.
    pub is_day: bool,
    /// Length of the day half in ticks.
    pub day_length: f64,
    /// Length of the night half in ticks.
    pub night_length: f64,
    /// Viewport size in pixels.
    pub viewport: Vec2,
    /// World coordinates of the viewport's top-left corner.
    pub screen_position: Vec2,
    /// World coordinates of the local player's center.
    pub player_center: Vec2,
    /// Width of the world in world units.
    pub world_width: f32,
    /// Height of the surface layer in world units.
    pub surface_height: f32,
    /// Ambient cloud cover in `[0, 1]`.
    pub cloud_alpha: f32,
}

impl Default for Environment {
    fn default() -> Self {
        let viewport = Vec2::new(1920.0, 1080.0);
        let world_width = 67_200.0;
        let surface_height = 7_200.0;
        let player_center = Vec2::new(world_width / 2.0, surface_height / 2.0);
        Self {
            paused: false,
            time: 0.0,
            is_day: true,
            day_length: DEFAULT_DAY_LENGTH,
            night_length: DEFAULT_NIGHT_LENGTH,
            viewport,
            screen_position: player_center - viewport / 2.0,
            player_center,
            world_width,
            surface_height,
            cloud_alpha: 0.0,
        }
    }
}

impl Environment {
    /// Center of the viewport in screen space.
    pub fn screen_center(&self) -> Vec2 {
        self.viewport / 2.0
    }

    /// Center of the viewport in world space.
    pub fn screen_center_in_world(&self) -> Vec2 {
        self.screen_position + self.viewport / 2.0
    }

    /// Length of the half (day or night) currently in progress.
    pub fn active_length(&self) -> f64 {
        if self.is_day {
            self.day_length
        } else {
            self.night_length
        }
    }

    /// Progress through the active half, `0.0` at its start.
    ///
    /// Returns `0.0` for a degenerate zero-length half.
    pub fn time_fraction(&self) -> f64 {
        let length = self.active_length();
        if length <= 0.0 { 0.0 } else { self.time / length }
    }

    /// Move the viewport so the player sits at its center.
    pub fn center_on_player(&mut self, player_center: Vec2) {
        self.player_center = player_center;
        self.screen_position = player_center - self.viewport / 2.0;
    }
}

/// Day/night clock measured in ticks.
///
/// Time counts up through the current half and wraps into the other half
/// when it reaches that half's length.
#[derive(Clone, Debug, PartialEq)]
pub struct SkyClock {
    /// Ticks elapsed in the current half.
    pub time: f64,
    /// Whether the current half is the day.
    pub is_day: bool,
    /// Length of the day half in ticks.
    pub day_length: f64,
    /// Length of the night half in ticks.
    pub night_length: f64,
    /// Whether the clock is frozen.
    pub paused: bool,
}

impl Default for SkyClock {
    fn default() -> Self {
        Self::new(DEFAULT_DAY_LENGTH, DEFAULT_NIGHT_LENGTH)
    }
}

impl SkyClock {
    /// Create a clock at the start of the day.
    pub fn new(day_length: f64, night_length: f64) -> Self {
        Self {
            time: 0.0,
            is_day: true,
            day_length,
            night_length,
            paused: false,
        }
    }

    fn active_length(&self) -> f64 {
        if self.is_day {
            self.day_length
        } else {
            self.night_length
        }
    }

    /// Advance by `dt` ticks, flipping between day and night as halves end.
    pub fn tick(&mut self, dt: f64) {
        if self.paused {
            return;
        }
        if !dt.is_finite() {
            log::warn!("ignoring non-finite clock step {dt}");
            return;
        }
        self.time += dt;
        // Both halves must be positive and finite or this would never terminate.
        let cycle = self.day_length + self.night_length;
        if self.day_length <= 0.0 || self.night_length <= 0.0 || !cycle.is_finite() {
            return;
        }
        // Whole cycles end in the same half; at most two flips remain.
        if self.time >= cycle {
            self.time = self.time.rem_euclid(cycle);
        }
        while self.time >= self.active_length() {
            self.time -= self.active_length();
            self.is_day = !self.is_day;
        }
    }

    /// Progress through the current half in `[0, 1)`.
    pub fn fraction(&self) -> f64 {
        let length = self.active_length();
        if length <= 0.0 { 0.0 } else { self.time / length }
    }

    /// Copy the clock's time fields into an environment snapshot.
    pub fn apply(&self, env: &mut Environment) {
        env.time = self.time;
        env.is_day = self.is_day;
        env.day_length = self.day_length;
        env.night_length = self.night_length;
        env.paused = self.paused;
    }
}
