//! Environment-driven positioning: parallax and the day/night sky arc.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Color, Environment};

/// When a body follows the day/night arc, and when it is visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkyRotationMode {
    /// No arc. The body is always drawn.
    #[default]
    None,
    /// Arcs every half but is only drawn during the day.
    Day,
    /// Arcs every half but is only drawn during the night.
    Night,
    /// Arcs and is drawn during both halves.
    Any,
}

impl SkyRotationMode {
    /// Whether a body in this mode is drawn given the host's day flag.
    pub fn is_visible(self, is_day: bool) -> bool {
        match self {
            SkyRotationMode::Day => is_day,
            SkyRotationMode::Night => !is_day,
            SkyRotationMode::None | SkyRotationMode::Any => true,
        }
    }
}

/// Parallax coefficients relative to the world center.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Parallax {
    /// Horizontal parallax speed.
    pub speed_x: f32,
    /// Vertical parallax speed.
    pub speed_y: f32,
    /// Offset from the screen center when the viewer is at the world center.
    pub average_offset: Vec2,
}

impl Parallax {
    /// Parallax drives position when any coefficient or the offset is non-zero.
    pub fn is_active(&self) -> bool {
        self.speed_x != 0.0 || self.speed_y != 0.0 || self.average_offset != Vec2::ZERO
    }

    /// Screen position for the current viewer location.
    pub fn position(&self, env: &Environment) -> Vec2 {
        let world_center = Vec2::new(env.world_width / 2.0, env.surface_height / 2.0);
        let from_center = env.screen_center_in_world() - world_center;
        let screen_center = env.screen_center();
        Vec2::new(
            screen_center.x - from_center.x * self.speed_x + self.average_offset.x,
            screen_center.y - from_center.y * self.speed_y + self.average_offset.y,
        )
    }
}

/// Result of evaluating the sky arc for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcPose {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: f32,
    pub color: Color,
}

/// Height of the arc's parabola for a time fraction `t` in `[0, 1]`.
///
/// `1.0` at the horizons, `0.0` at mid-arc.
pub fn arc_parabola(t: f64) -> f64 {
    if t < 0.5 {
        ((t - 0.5) * 2.0).powi(2)
    } else {
        (1.0 - t * 2.0).powi(2)
    }
}

/// Evaluate the rise/set arc for a body of width `body_width`.
///
/// The body crosses the viewport plus its own width on each side, rotates
/// linearly with time, shrinks toward the top of the arc and fades with
/// cloud cover.
pub fn sky_arc(env: &Environment, body_width: f32) -> ArcPose {
    let t = env.time_fraction();
    let width = body_width as f64;

    let x = (t * (env.viewport.x as f64 + width * 2.0)).floor() - width;
    let y_par = arc_parabola(t);

    let surface_span = (env.surface_height as f64 - 600.0).max(1.0);
    let bg_top =
        -(env.player_center.y as f64 - env.viewport.y as f64 / 2.0) / surface_span * 200.0;
    let y = (bg_top + y_par * 250.0 + 180.0).floor();

    let fade = (1.0 - env.cloud_alpha * 1.5).max(0.0);

    ArcPose {
        position: Vec2::new(x as f32, y as f32),
        rotation: (t as f32) * 2.0 - 7.3,
        scale: (1.2 - y_par * 0.4) as f32,
        color: Color::WHITE.scaled(fade),
    }
}
