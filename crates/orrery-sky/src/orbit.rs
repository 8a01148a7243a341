//! Planar orbit state and the per-tick phase advance.
//!
//! Circular orbits advance at a constant angular rate. Elliptical orbits use
//! an areal-velocity approximation: the rate is scaled by the inverse square
//! of the current radius against the period of the equivalent circle. This is
//! not a Kepler solution; existing orbit tunings depend on it.

use std::f32::consts::{PI, TAU};

use glam::Vec2;

/// Orbit configuration of a body around its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orbit {
    /// Ellipse axes at zero tilt, `(a, b)`. Equal axes mean a circle.
    pub ellipse: Vec2,
    /// Tilt of the ellipse in radians.
    pub tilt: f32,
    /// Current angle around the parent in radians.
    pub phase: f32,
    /// Angular rate of the equivalent circular orbit, radians per tick.
    pub angular_rate: f32,
}

impl Orbit {
    /// Circular orbit of the given radius.
    pub fn circular(radius: f32, phase: f32, angular_rate: f32) -> Self {
        Self {
            ellipse: Vec2::splat(radius),
            tilt: 0.0,
            phase,
            angular_rate,
        }
    }

    /// Elliptical orbit with axes `ellipse` and the given tilt.
    pub fn elliptical(ellipse: Vec2, tilt: f32, phase: f32, angular_rate: f32) -> Self {
        Self {
            ellipse,
            tilt,
            phase,
            angular_rate,
        }
    }

    /// Finite, non-negative axes, both positive for a true ellipse, and a
    /// finite phase and rate.
    pub fn is_valid(&self) -> bool {
        let (a, b) = (self.ellipse.x, self.ellipse.y);
        let finite = a.is_finite()
            && b.is_finite()
            && self.tilt.is_finite()
            && self.phase.is_finite()
            && self.angular_rate.is_finite();
        if !finite {
            return false;
        }
        if self.is_circular() {
            a >= 0.0
        } else {
            a > 0.0 && b > 0.0
        }
    }

    pub fn is_circular(&self) -> bool {
        self.ellipse.x == self.ellipse.y
    }

    /// Distance from the parent at the current phase.
    pub fn radius(&self) -> f32 {
        if self.is_circular() {
            self.ellipse.x
        } else {
            ellipse_radius(self.ellipse.x, self.ellipse.y, self.phase + self.tilt)
        }
    }

    /// Angular speed for this tick in radians.
    pub fn angular_speed(&self) -> f32 {
        if self.is_circular() {
            self.angular_rate
        } else {
            elliptic_angular_speed(self.ellipse, self.radius(), self.angular_rate)
        }
    }

    /// Advance the phase by one tick and return the new offset from the parent.
    pub fn step(&mut self) -> Vec2 {
        self.phase += self.angular_speed();
        self.offset()
    }

    /// Offset from the parent at the current phase.
    pub fn offset(&self) -> Vec2 {
        polar(self.radius(), self.phase)
    }
}

/// Radius of an origin-centered ellipse with axes `a`, `b` at angle `theta`.
pub fn ellipse_radius(a: f32, b: f32, theta: f32) -> f32 {
    let (sin, cos) = theta.sin_cos();
    let denom = (a * a * sin * sin + b * b * cos * cos).sqrt();
    // Degenerate ellipse with the angle along a zero axis.
    if denom == 0.0 { 0.0 } else { a * b / denom }
}

/// Approximate angular speed on an ellipse at distance `radius`.
///
/// `ω = π (min + max) √(min·max) / (T r²)` where `T = 2π / circular_rate`.
/// A zero rate or a non-positive radius yields zero speed.
pub fn elliptic_angular_speed(ellipse: Vec2, radius: f32, circular_rate: f32) -> f32 {
    if circular_rate == 0.0 || !radius.is_finite() || radius <= 0.0 {
        return 0.0;
    }
    let minor = ellipse.x.min(ellipse.y);
    let major = ellipse.x.max(ellipse.y);
    let period = TAU / circular_rate;
    PI / (period * radius * radius) * (minor + major) * (minor * major).sqrt()
}

/// Cartesian vector of length `radius` at angle `theta`.
pub fn polar(radius: f32, theta: f32) -> Vec2 {
    let (sin, cos) = theta.sin_cos();
    Vec2::new(radius * cos, radius * sin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_orbit_is_constant_radius() {
        let mut orbit = Orbit::circular(150.0, 0.3, 0.05);
        for _ in 0..500 {
            let offset = orbit.step();
            assert!(
                (offset.length() - 150.0).abs() < 1e-3,
                "r = {}",
                offset.length()
            );
        }
    }

    #[test]
    fn test_circular_phase_advances_by_rate() {
        let mut orbit = Orbit::circular(10.0, 1.0, 0.25);
        orbit.step();
        orbit.step();
        assert!((orbit.phase - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_ellipse_radius_on_axes() {
        assert!((ellipse_radius(200.0, 100.0, 0.0) - 200.0).abs() < 1e-3);
        assert!((ellipse_radius(200.0, 100.0, PI / 2.0) - 100.0).abs() < 1e-3);
        assert!((ellipse_radius(200.0, 100.0, PI) - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_ellipse_radius_lies_on_ellipse() {
        let (a, b) = (300.0_f32, 120.0_f32);
        for i in 0..64 {
            let theta = i as f32 / 64.0 * TAU;
            let p = polar(ellipse_radius(a, b, theta), theta);
            let on = (p.x / a).powi(2) + (p.y / b).powi(2);
            assert!((on - 1.0).abs() < 1e-4, "theta={theta} -> {on}");
        }
    }

    #[test]
    fn test_elliptic_distance_matches_formula_every_tick() {
        let mut orbit = Orbit::elliptical(Vec2::new(250.0, 100.0), 0.4, 0.0, 0.02);
        for _ in 0..400 {
            let offset = orbit.step();
            let expected = ellipse_radius(250.0, 100.0, orbit.phase + 0.4);
            assert!((offset.length() - expected).abs() < 1e-2);
        }
    }

    #[test]
    fn test_elliptic_speed_faster_near_periapsis() {
        let ellipse = Vec2::new(300.0, 100.0);
        let near = elliptic_angular_speed(ellipse, 100.0, 0.01);
        let far = elliptic_angular_speed(ellipse, 300.0, 0.01);
        assert!(near > far, "near {near} should exceed far {far}");
        assert!((near / far - 9.0).abs() < 1e-3, "inverse-square scaling");
    }

    #[test]
    fn test_elliptic_speed_matches_approximation() {
        let ellipse = Vec2::new(200.0, 100.0);
        let rate = 0.03;
        let r = 150.0;
        let expected = PI / ((TAU / rate) * r * r) * 300.0 * (20_000.0_f32).sqrt();
        let got = elliptic_angular_speed(ellipse, r, rate);
        assert!((got - expected).abs() < 1e-7);
    }

    #[test]
    fn test_zero_rate_does_not_move() {
        let mut orbit = Orbit::elliptical(Vec2::new(200.0, 100.0), 0.0, 1.0, 0.0);
        orbit.step();
        assert_eq!(orbit.phase, 1.0);
    }

    #[test]
    fn test_degenerate_ellipse_stays_finite() {
        let mut orbit = Orbit::elliptical(Vec2::new(100.0, 0.0), 0.0, 0.0, 0.05);
        for _ in 0..10 {
            let offset = orbit.step();
            assert!(offset.is_finite(), "offset {offset}");
            assert!(orbit.phase.is_finite());
        }
        assert_eq!(ellipse_radius(100.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_orbit_validity() {
        assert!(Orbit::circular(0.0, 0.0, 0.1).is_valid());
        assert!(Orbit::elliptical(Vec2::new(40.0, 20.0), 0.3, 0.0, 0.1).is_valid());
        assert!(!Orbit::circular(-5.0, 0.0, 0.1).is_valid());
        assert!(!Orbit::elliptical(Vec2::new(100.0, 0.0), 0.0, 0.0, 0.1).is_valid());
        assert!(!Orbit::elliptical(Vec2::new(100.0, -3.0), 0.0, 0.0, 0.1).is_valid());
        assert!(!Orbit::circular(f32::NAN, 0.0, 0.1).is_valid());
        assert!(!Orbit::circular(10.0, 0.0, f32::INFINITY).is_valid());
    }

    #[test]
    fn test_polar_round_trip() {
        for i in 0..32 {
            let theta = i as f32 / 32.0 * TAU;
            let v = polar(42.0, theta);
            assert!((v.length() - 42.0).abs() < 1e-4);
            let back = v.y.atan2(v.x).rem_euclid(TAU);
            let diff = (back - theta).abs();
            assert!(diff < 1e-4 || (TAU - diff) < 1e-4, "theta={theta} back={back}");
        }
    }
}
