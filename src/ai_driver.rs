use bevy::prelude::*;

use crate::components::{AIControlled, CarMotion, CarSpecs};
use crate::constants::*;
use crate::motion::{integrate_speed, steering_gain};
use crate::race::RaceState;
use crate::zones::{InteractionKind, ZoneEvent, ZonePhase};

/// Angle-to-waypoint that maps to full steering lock.
const STEER_CLAMP_DEGREES: f32 = 45.0;

/// Path-following collaborator abstraction: the pathfinding itself is out of
/// scope, so a straight-line backend fills in the contract (destination,
/// pending state, remaining distance, desired velocity) and moves the body.
#[derive(Component)]
pub struct NavAgent {
    pub destination: Option<Vec3>,
    pub path_pending: bool,
    pub remaining_distance: f32,
    pub desired_velocity: Vec3,
    pub stopping_distance: f32,
    pub speed: f32,
    pub acceleration: f32,
    pub angular_speed: f32,
}

impl NavAgent {
    pub fn new(stopping_distance: f32, speed: f32, acceleration: f32, angular_speed: f32) -> Self {
        Self {
            destination: None,
            path_pending: false,
            remaining_distance: f32::INFINITY,
            desired_velocity: Vec3::ZERO,
            stopping_distance,
            speed,
            acceleration,
            angular_speed,
        }
    }

    pub fn set_destination(&mut self, target: Vec3) {
        self.destination = Some(target);
        self.path_pending = true;
    }
}

/// Ordered, cyclic waypoint list with the current index.
#[derive(Component, Clone)]
pub struct Route {
    pub waypoints: Vec<Vec3>,
    pub current: usize,
}

impl Route {
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self {
            waypoints,
            current: 0,
        }
    }

    pub fn current_waypoint(&self) -> Option<Vec3> {
        self.waypoints.get(self.current).copied()
    }

    pub fn advance(&mut self) {
        if !self.waypoints.is_empty() {
            self.current = (self.current + 1) % self.waypoints.len();
        }
    }
}

#[derive(Component)]
pub struct AiDriver {
    pub current_speed: f32,
    pub target_speed: f32,
    pub braking: bool,
    /// Brake zones only bite above this (m/s), so a slow car is not slowed
    /// further on entry.
    pub braking_speed_threshold: f32,
}

impl AiDriver {
    pub fn new(specs: &CarSpecs) -> Self {
        Self {
            current_speed: specs.speed,
            target_speed: specs.speed,
            braking: false,
            braking_speed_threshold: kmh_to_ms(specs.speed * BRAKE_ZONE_SPEED_THRESHOLD_FRACTION),
        }
    }

    pub fn enter_brake_zone(&mut self, agent_speed: f32, specs: &CarSpecs) {
        if agent_speed >= self.braking_speed_threshold {
            self.braking = true;
            self.target_speed = specs.speed * BRAKE_ZONE_TARGET_FRACTION;
        }
    }

    pub fn exit_brake_zone(&mut self, specs: &CarSpecs) {
        self.braking = false;
        self.target_speed = specs.speed;
    }
}

/// Simplified AI lap counting: a before-finish zone arms the counter, the
/// finish line while armed scores the lap. No checkpoint-completeness here —
/// the AI can't be blocked the way the player validator blocks cheats, and the
/// two behaviors are deliberately kept separate.
#[derive(Component)]
pub struct AiLapTracker {
    pub laps: u32,
    pub max_laps: u32,
    armed: bool,
}

impl AiLapTracker {
    pub fn new(max_laps: u32) -> Self {
        Self {
            laps: 0,
            max_laps,
            armed: false,
        }
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Counts the lap if armed, returning the new lap total; unarmed
    /// crossings return `None` and change nothing.
    pub fn cross_finish_line(&mut self) -> Option<u32> {
        if !self.armed {
            return None;
        }
        self.laps += 1;
        self.armed = false;
        Some(self.laps)
    }

    pub fn finished(&self) -> bool {
        self.laps >= self.max_laps
    }
}

/// One backend tick: resolve a pending path request, then move straight toward
/// the destination at the configured speed, updating the distance/velocity
/// hints the driver reads.
pub fn step_nav(agent: &mut NavAgent, translation: &mut Vec3, dt: f32) {
    let Some(destination) = agent.destination else {
        agent.remaining_distance = f32::INFINITY;
        agent.desired_velocity = Vec3::ZERO;
        return;
    };

    let mut to_target = destination - *translation;
    to_target.y = 0.0;
    agent.remaining_distance = to_target.length();

    if agent.path_pending {
        // Path resolves one tick after the request, like a real agent.
        agent.path_pending = false;
        agent.desired_velocity = Vec3::ZERO;
        return;
    }

    if agent.remaining_distance <= f32::EPSILON {
        agent.desired_velocity = Vec3::ZERO;
        return;
    }

    let direction = to_target / agent.remaining_distance;
    agent.desired_velocity = direction * agent.speed;

    let step = agent.speed * dt;
    if step >= agent.remaining_distance {
        translation.x = destination.x;
        translation.z = destination.z;
        agent.remaining_distance = 0.0;
    } else {
        *translation += direction * step;
        agent.remaining_distance -= step;
    }
}

/// Signed yaw (radians) from `forward` to `direction`, positive turning left.
pub fn signed_yaw_delta(forward: Vec3, direction: Vec3) -> f32 {
    let current = forward.x.atan2(forward.z);
    let target = direction.x.atan2(direction.z);
    wrap_angle(target - current)
}

fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut wrapped = (angle + PI) % TAU;
    if wrapped < 0.0 {
        wrapped += TAU;
    }
    wrapped - PI
}

pub fn update_nav_agents(time: Res<Time>, mut agents: Query<(&mut NavAgent, &mut Transform)>) {
    let dt = time.delta_secs();
    for (mut agent, mut transform) in agents.iter_mut() {
        step_nav(&mut agent, &mut transform.translation, dt);
    }
}

pub fn drive_ai_cars(
    time: Res<Time>,
    mut cars: Query<
        (
            &mut Transform,
            &mut NavAgent,
            &mut Route,
            &mut AiDriver,
            &mut CarMotion,
            &CarSpecs,
        ),
        With<AIControlled>,
    >,
) {
    let dt = time.delta_secs();
    for (mut transform, mut agent, mut route, mut driver, mut motion, specs) in cars.iter_mut() {
        let Some(waypoint) = route.current_waypoint() else {
            warn_once!("AI car has no route; skipping drive tick");
            continue;
        };
        if agent.destination.is_none() {
            agent.set_destination(waypoint);
        }

        // Waypoint reached: advance (wrapping) and request the next path.
        if !agent.path_pending && agent.remaining_distance <= agent.stopping_distance {
            route.advance();
            if let Some(next) = route.current_waypoint() {
                agent.set_destination(next);
            }
        }

        // Steer toward the current waypoint regardless of path state.
        if let Some(target) = route.current_waypoint() {
            let mut to_target = target - transform.translation;
            to_target.y = 0.0;
            if to_target.length_squared() > f32::EPSILON {
                let direction = to_target.normalize();
                let forward = *transform.forward();
                let delta = signed_yaw_delta(forward, direction);
                let turn_input = (delta.to_degrees() / STEER_CLAMP_DEGREES).clamp(-1.0, 1.0);
                let max_speed = kmh_to_ms(specs.speed);
                let speed_ratio = (agent.speed / max_speed).clamp(0.0, 1.0);
                let turn_strength = steering_gain(turn_input, specs.steering, speed_ratio);
                transform.rotate_y((turn_strength * AI_STEER_RATE_SCALE * dt).to_radians());
            }
        }

        // Full speed unless a brake zone lowered the target.
        driver.current_speed = if driver.braking {
            integrate_speed(driver.current_speed, driver.target_speed, specs.braking, dt)
        } else {
            integrate_speed(driver.current_speed, specs.speed, specs.acceleration, dt)
        };
        agent.speed = kmh_to_ms(driver.current_speed);
        motion.current_speed = agent.speed;
    }
}

pub fn handle_ai_zone_events(
    mut events: EventReader<ZoneEvent>,
    mut cars: Query<
        (
            &mut Transform,
            &mut NavAgent,
            &mut AiDriver,
            &mut AiLapTracker,
            &Route,
            &CarSpecs,
        ),
        With<AIControlled>,
    >,
    mut next_state: ResMut<NextState<RaceState>>,
) {
    for event in events.read() {
        let Ok((mut transform, mut agent, mut driver, mut laps, route, specs)) =
            cars.get_mut(event.car)
        else {
            continue;
        };

        match (event.kind, event.phase) {
            (InteractionKind::BrakingZone, ZonePhase::Entered) => {
                driver.enter_brake_zone(agent.speed, specs);
            }
            (InteractionKind::BrakingZone, ZonePhase::Exited) => {
                driver.exit_brake_zone(specs);
            }
            (InteractionKind::StuckZone, ZonePhase::Entered) => {
                // Hard recovery: no animation, straight back onto the route.
                let Some(waypoint) = route.current_waypoint() else {
                    warn!("stuck AI car has no route to recover to");
                    continue;
                };
                info!("AI car stuck outside the map, teleporting to its waypoint");
                let recovered = waypoint + Vec3::Y * STUCK_RECOVERY_Y_OFFSET;
                transform.translation = recovered;
                agent.set_destination(recovered);
            }
            (InteractionKind::BeforeFinish, ZonePhase::Entered) => {
                laps.arm();
            }
            (InteractionKind::FinishLine, ZonePhase::Entered) => {
                if let Some(completed) = laps.cross_finish_line() {
                    if laps.finished() {
                        info!("AI car finished all {} laps, player loses", laps.max_laps);
                        next_state.set(RaceState::Defeat);
                    } else {
                        info!("AI car is on lap {}", completed + 1);
                    }
                }
            }
            _ => {}
        }
    }
}
