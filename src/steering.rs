/*
 * Steering Module
 *
 * Small vector helpers shared by the agent behaviours: magnitude limiting,
 * magnitude setting, headings and signed angle wrapping.
 */

use nannou::prelude::*;

const FULL_TURN: f32 = std::f32::consts::TAU;
const HALF_TURN: f32 = std::f32::consts::PI;

// Clamp the magnitude of a vector to `max`
#[inline]
pub fn limit(v: Vec2, max: f32) -> Vec2 {
    let max = max.max(0.0);
    let len_sq = v.length_squared();
    if len_sq > max * max && len_sq > 0.0 {
        v * (max / len_sq.sqrt())
    } else {
        v
    }
}

// Rescale a vector to the given magnitude. A zero vector stays zero,
// a negative magnitude flips the direction.
#[inline]
pub fn set_magnitude(v: Vec2, magnitude: f32) -> Vec2 {
    let len = v.length();
    if len > 0.0 {
        v * (magnitude / len)
    } else {
        Vec2::ZERO
    }
}

// Angle of a vector measured from the +x axis
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Wrap an angle into (-π, π].
pub fn wrap_signed_angle(mut angle: f32) -> f32 {
    if angle.is_nan() {
        return 0.0;
    }
    while angle <= -HALF_TURN {
        angle += FULL_TURN;
    }
    while angle > HALF_TURN {
        angle -= FULL_TURN;
    }
    angle
}

// Exponential smoothing step
#[inline]
pub fn approach(value: f32, target: f32, factor: f32) -> f32 {
    value + (target - value) * factor
}
