//! Math utilities and types
//!
//! The simulation is planar: poses are a 2D position plus a rotation angle.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// Linear interpolation between two vectors
pub fn lerp(a: &Vec2, b: &Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// Interpolate between two angles (radians) along the shortest arc
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    use std::f32::consts::{PI, TAU};

    let mut delta = (b - a) % TAU;
    if delta > PI {
        delta -= TAU;
    } else if delta < -PI {
        delta += TAU;
    }
    a + delta * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_lerp_endpoints_and_midpoint() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(10.0, -4.0);

        assert_relative_eq!(lerp(&a, &b, 0.0), a);
        assert_relative_eq!(lerp(&a, &b, 1.0), b);
        assert_relative_eq!(lerp(&a, &b, 0.5), Vec2::new(5.0, -2.0));
    }

    #[test]
    fn test_lerp_angle_takes_short_way_round() {
        // From just below +PI to just above -PI is a small step, not a full turn
        let result = lerp_angle(PI - 0.1, -PI + 0.1, 0.5);
        assert_relative_eq!(result.abs(), PI, epsilon = 1e-5);
    }
}
