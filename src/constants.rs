// Simulation timing
pub const PHYSICS_HZ: f64 = 60.0; // fixed physics step, input/cosmetics run per frame

// Player car tuning
// Top speeds are tuned in km/h (hence the /3.6 conversions); everything else is
// metres and seconds.
pub const BASE_SPEED: f32 = 20.0;
pub const MAX_SPEED_KMH: f32 = 150.0;
pub const ACCELERATION: f32 = 5.0;
pub const DECELERATION: f32 = 3.0;
pub const OFF_TRACK_DECELERATION: f32 = 3.5; // multiplier on deceleration while off track
pub const BRAKING: f32 = 60.0;
pub const STEERING: f32 = 3.0;
pub const STEER_RATE_SCALE: f32 = 50.0; // degrees/sec per unit of turn strength
pub const DRIFT_FACTOR: f32 = 0.7;
pub const CAR_MASS: f32 = 1.0;
pub const JUMP_FORCE: f32 = 5.0;
pub const GRAVITY: f32 = 9.81;
pub const ANGULAR_DRAG: f32 = 0.05;
pub const INPUT_DEADZONE: f32 = 0.01;

// Drift feel thresholds
pub const DRIFT_LATERAL_THRESHOLD: f32 = 3.0;
pub const DRIFT_SPEED_THRESHOLD: f32 = 10.0;
pub const DRIFT_TORQUE_SCALE: f32 = 0.05;
pub const BRAKING_DRIFT_SCALE: f32 = 1.2;

// Cosmetics
pub const BODY_TILT_AMOUNT: f32 = 5.0;
pub const BODY_TILT_RATE: f32 = 5.0;
pub const WHEEL_RADIUS: f32 = 0.4;
pub const STEERING_ANGLE: f32 = 30.0;

// AI car tuning
pub const AI_MAX_SPEED: f32 = 30.0;
pub const AI_ACCELERATION: f32 = 20.0;
pub const AI_BRAKING: f32 = 30.0;
pub const AI_STEERING: f32 = 3.0;
pub const AI_STEER_RATE_SCALE: f32 = 100.0;
pub const WAYPOINT_RANGE: f32 = 5.0; // nav stopping distance
pub const BRAKE_ZONE_TARGET_FRACTION: f32 = 0.5;
pub const BRAKE_ZONE_SPEED_THRESHOLD_FRACTION: f32 = 0.9;
pub const STUCK_RECOVERY_Y_OFFSET: f32 = 1.0;

// Power-up effects (player)
pub const BOOST_SPEED: f32 = 30.0;
pub const BOOST_ACCELERATION: f32 = 8.0;
pub const BOOST_DURATION: f32 = 3.0;
pub const RAMP_BOOST_SPEED: f32 = 35.0;
pub const RAMP_BOOST_ACCELERATION: f32 = 12.0;
pub const RAMP_BOOST_DURATION: f32 = 0.5;
pub const SLOW_SPEED: f32 = 5.0;
pub const SLOW_ACCELERATION: f32 = 3.0;
pub const SLOW_DURATION: f32 = 3.0;
pub const SHIELD_DURATION: f32 = 5.0;
pub const SHIELD_MASS: f32 = 500.0;
pub const INVERT_DURATION: f32 = 3.0;

// Power-up effects (AI)
pub const AI_BOOST_MULTIPLIER: f32 = 1.5;
pub const AI_SLOW_MULTIPLIER: f32 = 0.5;
pub const AI_EFFECT_DURATION: f32 = 2.0;
pub const AI_SHIELD_DURATION: f32 = 10.0;
pub const AI_SHIELD_MASS: f32 = 1000.0;

// Pickups and star blocks
pub const PICKUP_RESPAWN_DELAY: f32 = 5.0;
pub const STAR_BLOCK_LIFETIME: f32 = 3.0;
pub const STAR_BOUNCE_FORCE: f32 = 2.0;
pub const STAR_DEPLOY_DISTANCE: f32 = 2.0;
pub const STAR_DEPLOY_Y_OFFSET: f32 = 2.0;
pub const AI_STAR_SPAWN_OFFSET: [f32; 3] = [0.0, 5.0, -3.0];
pub const STAR_BLOCK_HALF_EXTENT: f32 = 1.0;

// Checkpoints and laps
pub const MAX_LAPS: u32 = 3;
pub const FLOOR_RESPAWN_TIME: f32 = 0.3;
pub const CHECKPOINT_BUFFER_TIME: f32 = 1.0;
pub const LAP_RESET_BUFFER_TIME: f32 = 1.0;

/// Converts a km/h tuning value to metres per second.
pub fn kmh_to_ms(kmh: f32) -> f32 {
    kmh / 3.6
}
