use bevy::prelude::*;

use crate::constants::*;

#[derive(Component)]
pub struct Car;

#[derive(Component)]
pub struct PlayerControlled;

#[derive(Component)]
pub struct AIControlled;

#[derive(Component, Clone, Deref, DerefMut)]
pub struct Velocity {
    pub velocity: Vec3,
}

impl Velocity {
    pub fn new() -> Self {
        Self {
            velocity: Vec3::ZERO,
        }
    }
}

impl From<Vec3> for Velocity {
    fn from(velocity: Vec3) -> Self {
        Self { velocity }
    }
}

/// Yaw rate in radians per second, fed by drift torque.
#[derive(Component, Default, Deref, DerefMut)]
pub struct AngularVelocity(pub f32);

/// Per-car motion tunables. `speed`, `acceleration` and `mass` are mutated
/// transiently by active power-up effects and restored from per-activation
/// snapshots when an effect expires.
#[derive(Component, Clone)]
pub struct CarSpecs {
    pub speed: f32,
    pub max_speed_kmh: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub off_track_deceleration: f32,
    pub braking: f32,
    pub steering: f32,
    pub drift_factor: f32,
    pub mass: f32,
    pub jump_force: f32,
    pub wheel_radius: f32,
    pub steering_angle: f32,
    pub body_tilt_amount: f32,
}

impl CarSpecs {
    pub fn player() -> Self {
        Self {
            speed: BASE_SPEED,
            max_speed_kmh: MAX_SPEED_KMH,
            acceleration: ACCELERATION,
            deceleration: DECELERATION,
            off_track_deceleration: OFF_TRACK_DECELERATION,
            braking: BRAKING,
            steering: STEERING,
            drift_factor: DRIFT_FACTOR,
            mass: CAR_MASS,
            jump_force: JUMP_FORCE,
            wheel_radius: WHEEL_RADIUS,
            steering_angle: STEERING_ANGLE,
            body_tilt_amount: BODY_TILT_AMOUNT,
        }
    }

    /// AI cars tune their top speed in `speed` directly (km/h) and never use
    /// the braking/drift fields of the player controller.
    pub fn ai() -> Self {
        Self {
            speed: AI_MAX_SPEED,
            max_speed_kmh: AI_MAX_SPEED,
            acceleration: AI_ACCELERATION,
            braking: AI_BRAKING,
            steering: AI_STEERING,
            ..Self::player()
        }
    }
}

/// Base motion values captured once at spawn. Effect restoration always goes
/// through per-activation snapshots, never through these, but they define the
/// "no effect active" invariant and the UI read model.
#[derive(Component, Clone)]
pub struct CarBaseline {
    pub speed: f32,
    pub acceleration: f32,
    pub mass: f32,
}

impl CarBaseline {
    pub fn of(specs: &CarSpecs) -> Self {
        Self {
            speed: specs.speed,
            acceleration: specs.acceleration,
            mass: specs.mass,
        }
    }
}

#[derive(Component, Clone)]
pub struct CarMotion {
    pub current_speed: f32,
    pub lateral_velocity: f32,
    pub grounded: bool,
    pub off_track: bool,
    pub inverted_controls: bool,
}

impl Default for CarMotion {
    fn default() -> Self {
        Self {
            current_speed: 0.0,
            lateral_velocity: 0.0,
            grounded: true,
            off_track: false,
            inverted_controls: false,
        }
    }
}

/// Per-frame input intent. The host (or the built-in keyboard sampler) writes
/// this; the fixed-rate controller only ever reads it.
#[derive(Component, Clone, Default)]
pub struct CarInput {
    pub throttle: f32,
    pub steer: f32,
    pub brake: bool,
    pub jump: bool,
    pub reset_rotation: bool,
    pub deploy_star: bool,
}

impl CarInput {
    /// Clamps axes to [-1, 1] and zeroes NaNs so bad input can never poison
    /// the integrator.
    pub fn sanitized(&self) -> CarInput {
        let clean = |axis: f32| {
            if axis.is_nan() {
                0.0
            } else {
                axis.clamp(-1.0, 1.0)
            }
        };
        CarInput {
            throttle: clean(self.throttle),
            steer: clean(self.steer),
            ..self.clone()
        }
    }
}

/// Cosmetic roll of the car body while steering, eased at frame rate.
#[derive(Component, Default)]
pub struct CarBodyTilt {
    pub roll: f32,
}

#[derive(Clone)]
pub struct Wheel {
    pub steers: bool,
    pub spin_angle: f32,
    pub steer_angle: f32,
}

/// Visual wheel state; front wheels steer, back wheels spin the other way
/// round (the meshes face backwards).
#[derive(Component, Clone)]
pub struct WheelSet {
    pub wheels: Vec<Wheel>,
}

impl WheelSet {
    pub fn four() -> Self {
        let wheel = |steers| Wheel {
            steers,
            spin_angle: 0.0,
            steer_angle: 0.0,
        };
        Self {
            wheels: vec![wheel(true), wheel(true), wheel(false), wheel(false)],
        }
    }
}

/// Marker entity parented above a shielded car for the duration of the shield.
#[derive(Component)]
pub struct ShieldBubble {
    pub owner: Entity,
}

/// The player is holding a collected star, ready to deploy.
#[derive(Component)]
pub struct HeldStar;
