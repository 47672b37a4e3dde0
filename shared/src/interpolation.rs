use std::f32::consts::{PI, TAU};

use crate::FieldValue;

/// Tolerance used for snapping and angle comparisons when a caller does not
/// supply its own
pub const DEFAULT_EPSILON: f32 = 1.0e-4;

pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() <= epsilon
}

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Exponential convergence factor for one presentation step of `dt` seconds
/// at convergence `rate`, clamped so a long frame never overshoots
pub fn convergence_factor(dt: f32, rate: f32) -> f32 {
    (dt * rate).clamp(0.0, 1.0)
}

/// Wraps an angle in radians into (-PI, PI]
pub fn normalize_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if approx_eq(wrapped, -PI, DEFAULT_EPSILON) {
        PI
    } else {
        wrapped
    }
}

/// Signed delta taking the short way around the circle from `from` to `to`
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    normalize_angle(from + shortest_angle_delta(from, to) * t)
}

pub fn angles_approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
    shortest_angle_delta(a, b).abs() <= epsilon
}

/// Snaps `value` onto the nearest multiple of `step` if it is within
/// `tolerance` of it
pub fn snap_to_grid(value: f32, step: f32, tolerance: f32) -> Option<f32> {
    if step <= 0.0 {
        return None;
    }
    let nearest = (value / step).round() * step;
    if approx_eq(value, nearest, tolerance) {
        Some(nearest)
    } else {
        None
    }
}

/// A peer-local display copy of one replicated field.
///
/// Presentation code steps this toward the last authoritative value every
/// frame; nothing here ever flows back into authoritative state.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayValue {
    current: FieldValue,
}

impl DisplayValue {
    pub fn new(initial: FieldValue) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &FieldValue {
        &self.current
    }

    /// Moves toward `target` by `lerp(current, target, dt * rate)`. Angles
    /// take the shortest path, non-numeric values snap immediately
    pub fn step(&mut self, target: &FieldValue, dt: f32, rate: f32) {
        let t = convergence_factor(dt, rate);
        self.current = match (&self.current, target) {
            (FieldValue::Scalar(current), FieldValue::Scalar(target)) => {
                FieldValue::Scalar(settle(lerp(*current, *target, t), *target))
            }
            (FieldValue::Angle(current), FieldValue::Angle(target)) => {
                let next = lerp_angle(*current, *target, t);
                if angles_approx_eq(next, *target, DEFAULT_EPSILON) {
                    FieldValue::Angle(*target)
                } else {
                    FieldValue::Angle(next)
                }
            }
            (FieldValue::Vector(current), FieldValue::Vector(target)) => {
                let mut next = [0.0; 3];
                for axis in 0..3 {
                    next[axis] = settle(lerp(current[axis], target[axis], t), target[axis]);
                }
                FieldValue::Vector(next)
            }
            _ => target.clone(),
        };
    }
}

fn settle(value: f32, target: f32) -> f32 {
    if approx_eq(value, target, DEFAULT_EPSILON) {
        target
    } else {
        value
    }
}
