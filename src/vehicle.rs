use bevy::prelude::*;

use crate::components::{
    AngularVelocity, CarBodyTilt, CarInput, CarMotion, CarSpecs, PlayerControlled, Velocity,
    WheelSet,
};
use crate::constants::*;
use crate::motion::{
    apply_drift, integrate_speed, steering_gain, wheel_spin_rate, wheel_steer_angle,
};

const GROUND_Y: f32 = 0.0;

/// Zeroes residual speed and velocity, used by the checkpoint respawn path so
/// the car never carries crash momentum into the next segment.
pub fn reset_movement(motion: &mut CarMotion, velocity: &mut Vec3) {
    motion.current_speed = 0.0;
    motion.lateral_velocity = 0.0;
    *velocity = Vec3::ZERO;
}

/// One fixed-rate physics step for a player car. This is the whole §"vehicle
/// controller" state machine: input shaping, speed integration, steering,
/// drift recombination, jump/gravity, and the final position update.
pub fn step_car(
    transform: &mut Transform,
    velocity: &mut Vec3,
    angular: &mut f32,
    motion: &mut CarMotion,
    specs: &CarSpecs,
    input: &CarInput,
    dt: f32,
) {
    let input = input.sanitized();

    if input.reset_rotation {
        let (yaw, _, _) = transform.rotation.to_euler(EulerRot::YXZ);
        transform.rotation = Quat::from_rotation_y(yaw);
        *angular = 0.0;
    }

    let (throttle, steer) = if motion.inverted_controls {
        (-input.throttle, -input.steer)
    } else {
        (input.throttle, input.steer)
    };

    // Speed integration: toward the throttle target while driving, toward zero
    // (harder when off track) while coasting, hardest while braking.
    let target_speed = specs.speed * throttle;
    let coast_deceleration = if motion.off_track {
        specs.deceleration * specs.off_track_deceleration
    } else {
        specs.deceleration
    };
    motion.current_speed = if throttle.abs() > INPUT_DEADZONE {
        integrate_speed(motion.current_speed, target_speed, specs.acceleration, dt)
    } else {
        integrate_speed(motion.current_speed, 0.0, coast_deceleration, dt)
    };
    if input.brake {
        motion.current_speed = integrate_speed(motion.current_speed, 0.0, specs.braking, dt);
    }

    // Steering loses authority as speed approaches the maximum.
    let max_speed = kmh_to_ms(specs.max_speed_kmh);
    if steer.abs() > INPUT_DEADZONE {
        let speed_ratio = (motion.current_speed.abs() / max_speed).clamp(0.0, 1.0);
        let turn_strength = steering_gain(steer, specs.steering, speed_ratio);
        transform.rotate_y((turn_strength * STEER_RATE_SCALE * dt).to_radians());
    }

    // Residual yaw rate from drift torque.
    transform.rotate_y(*angular * dt);
    *angular *= (1.0 - ANGULAR_DRAG * dt).max(0.0);

    // Drift: recombine forward motion plus leftover lateral momentum on the
    // post-steering axes, scaling the lateral part by the drift factor.
    let forward = *transform.forward();
    let right = *transform.right();
    let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
    let lateral_residual = horizontal - forward * horizontal.dot(forward);
    let composed = forward * motion.current_speed + lateral_residual;
    let drift = apply_drift(composed, forward, right, specs.drift_factor, input.brake);
    let mut planar = drift.velocity;
    if let Some(torque) = drift.yaw_torque {
        *angular += torque * dt;
    }
    if planar.length() > max_speed {
        planar = planar.normalize() * max_speed;
    }
    motion.current_speed = planar.dot(forward);
    motion.lateral_velocity = planar.dot(right);

    // Jump and gravity act on the vertical channel only.
    let mut vertical = velocity.y;
    if input.jump && motion.grounded {
        vertical += specs.jump_force / specs.mass;
        motion.grounded = false;
    }
    if !motion.grounded {
        vertical -= GRAVITY * dt;
    }

    transform.translation += planar * dt + Vec3::Y * vertical * dt;
    if transform.translation.y <= GROUND_Y && vertical <= 0.0 {
        transform.translation.y = GROUND_Y;
        vertical = 0.0;
        motion.grounded = true;
    }

    *velocity = planar + Vec3::Y * vertical;
}

/// Default keyboard sampler; hosts with their own input layer can skip this
/// system and write `CarInput` themselves. Does nothing when no keyboard
/// input resource exists (headless hosts).
pub fn sample_player_input(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    mut cars: Query<&mut CarInput, With<PlayerControlled>>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    for mut input in cars.iter_mut() {
        let mut throttle = 0.0;
        if keyboard.pressed(KeyCode::KeyW) || keyboard.pressed(KeyCode::ArrowUp) {
            throttle += 1.0;
        }
        if keyboard.pressed(KeyCode::KeyS) || keyboard.pressed(KeyCode::ArrowDown) {
            throttle -= 1.0;
        }
        let mut steer = 0.0;
        if keyboard.pressed(KeyCode::KeyA) || keyboard.pressed(KeyCode::ArrowLeft) {
            steer += 1.0;
        }
        if keyboard.pressed(KeyCode::KeyD) || keyboard.pressed(KeyCode::ArrowRight) {
            steer -= 1.0;
        }

        input.throttle = throttle;
        input.steer = steer;
        input.brake = keyboard.pressed(KeyCode::ControlLeft);
        // Edge intents latch until the fixed step consumes them; a press on a
        // frame without a physics tick must not be lost.
        input.jump |= keyboard.just_pressed(KeyCode::Space);
        input.reset_rotation |= keyboard.just_pressed(KeyCode::KeyR);
        input.deploy_star |= keyboard.just_pressed(KeyCode::ShiftLeft);
    }
}

pub fn apply_car_physics(
    time: Res<Time>,
    mut cars: Query<
        (
            &mut Transform,
            &mut Velocity,
            &mut AngularVelocity,
            &mut CarMotion,
            &CarSpecs,
            &mut CarInput,
        ),
        With<PlayerControlled>,
    >,
) {
    let dt = time.delta_secs();
    for (mut transform, mut velocity, mut angular, mut motion, specs, mut input) in cars.iter_mut()
    {
        step_car(
            &mut transform,
            &mut velocity,
            &mut angular,
            &mut motion,
            specs,
            &input,
            dt,
        );
        // Latched edge intents are delivered to exactly one fixed step.
        input.jump = false;
        input.reset_rotation = false;
    }
}

/// Frame-rate cosmetic roll toward the steering direction.
pub fn update_body_tilt(
    time: Res<Time>,
    mut cars: Query<(&mut CarBodyTilt, &CarInput, &CarSpecs)>,
) {
    let blend = (time.delta_secs() * BODY_TILT_RATE).clamp(0.0, 1.0);
    for (mut tilt, input, specs) in cars.iter_mut() {
        let target = -input.sanitized().steer * specs.body_tilt_amount;
        tilt.roll += (target - tilt.roll) * blend;
    }
}

/// Frame-rate wheel visuals: spin from forward speed, steer offset on the
/// front wheels, both via the shared motion formulas.
pub fn update_wheels(
    time: Res<Time>,
    mut cars: Query<(&mut WheelSet, &CarMotion, &CarInput, &CarSpecs)>,
) {
    let dt = time.delta_secs();
    for (mut wheel_set, motion, input, specs) in cars.iter_mut() {
        let revs_per_sec = wheel_spin_rate(motion.current_speed, specs.wheel_radius);
        let steer = input.sanitized().steer;
        for wheel in wheel_set.wheels.iter_mut() {
            let direction = if wheel.steers { 1.0 } else { -1.0 };
            wheel.spin_angle += revs_per_sec * 360.0 * direction * dt;
            if wheel.steers {
                wheel.steer_angle = wheel_steer_angle(steer, specs.steering_angle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn car() -> (Transform, Vec3, f32, CarMotion, CarSpecs) {
        (
            Transform::default(),
            Vec3::ZERO,
            0.0,
            CarMotion::default(),
            CarSpecs::player(),
        )
    }

    fn step(
        transform: &mut Transform,
        velocity: &mut Vec3,
        angular: &mut f32,
        motion: &mut CarMotion,
        specs: &CarSpecs,
        input: &CarInput,
        ticks: usize,
    ) {
        for _ in 0..ticks {
            step_car(transform, velocity, angular, motion, specs, input, DT);
        }
    }

    #[test]
    fn test_throttle_accelerates_forward() {
        let (mut transform, mut velocity, mut angular, mut motion, specs) = car();
        let input = CarInput {
            throttle: 1.0,
            ..Default::default()
        };

        step(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &input, 60,
        );

        assert!(motion.current_speed > 0.0);
        // Default orientation faces -Z
        assert!(transform.translation.z < 0.0);
        assert!(motion.current_speed <= specs.speed + 1e-3);
    }

    #[test]
    fn test_coasting_decays_to_rest() {
        let (mut transform, mut velocity, mut angular, mut motion, specs) = car();
        motion.current_speed = 10.0;

        let idle = CarInput::default();
        step(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &idle, 600,
        );

        assert_eq!(motion.current_speed, 0.0);
    }

    #[test]
    fn test_off_track_decelerates_faster() {
        let specs = CarSpecs::player();
        let idle = CarInput::default();

        let (mut t1, mut v1, mut a1, mut on_track, _) = car();
        on_track.current_speed = 10.0;
        step_car(&mut t1, &mut v1, &mut a1, &mut on_track, &specs, &idle, DT);

        let (mut t2, mut v2, mut a2, mut off_track, _) = car();
        off_track.current_speed = 10.0;
        off_track.off_track = true;
        step_car(&mut t2, &mut v2, &mut a2, &mut off_track, &specs, &idle, DT);

        assert!(off_track.current_speed < on_track.current_speed);
    }

    #[test]
    fn test_inverted_controls_flip_axes() {
        let (mut transform, mut velocity, mut angular, mut motion, specs) = car();
        motion.inverted_controls = true;
        let input = CarInput {
            throttle: 1.0,
            ..Default::default()
        };

        step(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &input, 30,
        );

        assert!(motion.current_speed < 0.0);
    }

    #[test]
    fn test_nan_input_is_ignored() {
        let (mut transform, mut velocity, mut angular, mut motion, specs) = car();
        let input = CarInput {
            throttle: f32::NAN,
            steer: f32::NAN,
            ..Default::default()
        };

        step(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &input, 10,
        );

        assert_eq!(motion.current_speed, 0.0);
        assert!(transform.translation.is_finite());
    }

    #[test]
    fn test_jump_leaves_ground_and_lands() {
        let (mut transform, mut velocity, mut angular, mut motion, specs) = car();
        let jump = CarInput {
            jump: true,
            ..Default::default()
        };

        step_car(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &jump, DT,
        );
        assert!(!motion.grounded);
        assert!(velocity.y > 0.0);

        // Holding jump in the air must not double-jump
        let peak_vy = velocity.y;
        step_car(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &jump, DT,
        );
        assert!(velocity.y < peak_vy);

        let idle = CarInput::default();
        step(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &idle, 600,
        );
        assert!(motion.grounded);
        assert_eq!(transform.translation.y, 0.0);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn test_steering_turns_the_car() {
        let (mut transform, mut velocity, mut angular, mut motion, specs) = car();
        let input = CarInput {
            throttle: 1.0,
            steer: 1.0,
            ..Default::default()
        };

        let start_forward = *transform.forward();
        step(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &input, 60,
        );
        let end_forward = *transform.forward();

        assert!(start_forward.dot(end_forward) < 0.999);
    }

    #[test]
    fn test_velocity_clamped_to_max_speed() {
        let (mut transform, mut velocity, mut angular, mut motion, mut specs) = car();
        // Boosted top speed beyond the hard velocity cap
        specs.speed = 100.0;
        motion.current_speed = 100.0;
        let input = CarInput {
            throttle: 1.0,
            ..Default::default()
        };

        step_car(
            &mut transform, &mut velocity, &mut angular, &mut motion, &specs, &input, DT,
        );

        let max = kmh_to_ms(specs.max_speed_kmh);
        assert!(velocity.length() <= max + 1e-3);
    }

    #[test]
    fn test_edge_inputs_latch_until_a_fixed_step_runs() {
        use bevy::ecs::system::RunSystemOnce;

        let mut world = World::new();
        world.init_resource::<Time>();
        let mut keyboard = ButtonInput::<KeyCode>::default();
        keyboard.press(KeyCode::Space);
        world.insert_resource(keyboard);
        let player = world
            .spawn((
                PlayerControlled,
                Transform::default(),
                Velocity::new(),
                AngularVelocity::default(),
                CarMotion::default(),
                CarInput::default(),
                CarSpecs::player(),
            ))
            .id();

        world.run_system_once(sample_player_input).expect("sampler runs");
        assert!(world.get::<CarInput>(player).expect("input").jump);

        // A render frame with no fixed tick: the key is no longer
        // just-pressed, but the latched intent must survive
        world.resource_mut::<ButtonInput<KeyCode>>().clear();
        world.run_system_once(sample_player_input).expect("sampler runs");
        assert!(world.get::<CarInput>(player).expect("input").jump);

        // The fixed step consumes it exactly once
        world.run_system_once(apply_car_physics).expect("physics runs");
        assert!(!world.get::<CarInput>(player).expect("input").jump);
        assert!(!world.get::<CarMotion>(player).expect("motion").grounded);
    }

    #[test]
    fn test_reset_movement_zeroes_everything() {
        let (_, _, _, mut motion, _) = car();
        let mut velocity = Vec3::new(3.0, 1.0, -4.0);
        motion.current_speed = 15.0;
        motion.lateral_velocity = 2.0;

        reset_movement(&mut motion, &mut velocity);

        assert_eq!(motion.current_speed, 0.0);
        assert_eq!(motion.lateral_velocity, 0.0);
        assert_eq!(velocity, Vec3::ZERO);
    }
}
