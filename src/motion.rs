use bevy::prelude::*;

use crate::constants::*;

/// Shared speed/steering/drift math used by both the player controller and the
/// AI driver. Pure functions only — keeping a single copy here is what stops
/// the two controllers from drifting apart.

/// Moves `current` toward `target` by at most `rate * dt`, never overshooting.
pub fn integrate_speed(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    let max_delta = (rate * dt).max(0.0);
    let gap = target - current;
    if gap.abs() <= max_delta {
        target
    } else {
        current + gap.signum() * max_delta
    }
}

/// Steering authority for a turn input in [-1, 1]: full strength at standstill,
/// linearly halved as speed approaches the maximum.
pub fn steering_gain(turn_input: f32, base_steer: f32, speed_ratio: f32) -> f32 {
    let agility = 1.0 - 0.5 * speed_ratio.clamp(0.0, 1.0);
    turn_input * base_steer * agility
}

pub struct DriftResult {
    pub velocity: Vec3,
    /// Yaw torque (rad/s^2) when the car is sliding hard enough to kick the
    /// tail out; `None` below the slide thresholds.
    pub yaw_torque: Option<f32>,
}

/// Recombines a velocity into its forward and (drift-scaled) lateral parts.
/// Braking loosens the rear by scaling the drift factor up.
pub fn apply_drift(
    velocity: Vec3,
    forward: Vec3,
    right: Vec3,
    drift_factor: f32,
    is_braking: bool,
) -> DriftResult {
    let forward_speed = velocity.dot(forward);
    let lateral_speed = velocity.dot(right);

    let effective_drift = if is_braking {
        drift_factor * BRAKING_DRIFT_SCALE
    } else {
        drift_factor
    };

    let recombined = forward * forward_speed + right * lateral_speed * effective_drift;

    let yaw_torque = if lateral_speed.abs() > DRIFT_LATERAL_THRESHOLD
        && forward_speed.abs() > DRIFT_SPEED_THRESHOLD
    {
        Some(lateral_speed * DRIFT_TORQUE_SCALE)
    } else {
        None
    };

    DriftResult {
        velocity: recombined,
        yaw_torque,
    }
}

/// Signed wheel spin in revolutions per second for a given forward speed.
pub fn wheel_spin_rate(speed: f32, wheel_radius: f32) -> f32 {
    speed.signum() * speed.abs() / (std::f32::consts::TAU * wheel_radius)
}

/// Visual yaw offset for a steering wheel, in degrees.
pub fn wheel_steer_angle(steer_input: f32, steering_angle: f32) -> f32 {
    steer_input * steering_angle
}
