use bevy::prelude::*;
use std::collections::HashSet;

use crate::components::{
    AIControlled, Car, CarMotion, CarSpecs, HeldStar, PlayerControlled, ShieldBubble, Velocity,
};
use crate::constants::*;
use crate::zones::{zone_contains, InteractionKind, TriggerZone, ZoneEvent, ZonePhase};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectKind {
    Boost,
    PowerDown,
    OffTrackSlow,
    Shield,
    InvertedControls,
}

impl EffectKind {
    /// Boosts, power-downs and the off-track slow all fight over the same
    /// speed/acceleration fields; at most one of them may be active per car.
    fn is_speed_class(self) -> bool {
        matches!(
            self,
            EffectKind::Boost | EffectKind::PowerDown | EffectKind::OffTrackSlow
        )
    }
}

/// Values captured at activation time and written back verbatim on expiry.
/// Never recomputed: ramp boosts and pickup boosts share the boost slot, and
/// hardcoded restore targets would let one clobber the other's baseline.
#[derive(Clone, Copy, Debug)]
enum EffectRestore {
    SpeedAccel { speed: f32, acceleration: f32 },
    MaxSpeed { speed: f32 },
    Mass { mass: f32 },
    None,
}

pub struct ActiveEffect {
    pub kind: EffectKind,
    /// `None` runs until explicitly ended (off-track slow).
    pub remaining: Option<f32>,
    restore: EffectRestore,
}

/// Per-car list of in-flight timed modifiers. Every activation entry point is
/// idempotent while the same kind is already running: re-entry is a no-op, not
/// a duration reset.
#[derive(Component, Default)]
pub struct ActiveEffects {
    effects: Vec<ActiveEffect>,
}

impl ActiveEffects {
    pub fn is_active(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }

    pub fn is_shielded(&self) -> bool {
        self.is_active(EffectKind::Shield)
    }

    fn has_speed_effect(&self) -> bool {
        self.effects.iter().any(|effect| effect.kind.is_speed_class())
    }

    /// Pickup or ramp boost on a player car: swaps speed and acceleration for
    /// boosted values, restoring the pre-activation pair after `duration`.
    pub fn activate_boost(
        &mut self,
        specs: &mut CarSpecs,
        boost_speed: f32,
        boost_acceleration: f32,
        duration: f32,
    ) -> bool {
        if self.has_speed_effect() {
            return false;
        }
        self.effects.push(ActiveEffect {
            kind: EffectKind::Boost,
            remaining: Some(duration),
            restore: EffectRestore::SpeedAccel {
                speed: specs.speed,
                acceleration: specs.acceleration,
            },
        });
        specs.speed = boost_speed;
        specs.acceleration = boost_acceleration;
        true
    }

    /// Slow-down pickup on a player car. Shield takes precedence: the effect
    /// is dropped outright, not queued.
    pub fn activate_power_down(
        &mut self,
        specs: &mut CarSpecs,
        slow_speed: f32,
        slow_acceleration: f32,
        duration: f32,
    ) -> bool {
        if self.is_shielded() || self.has_speed_effect() {
            return false;
        }
        self.effects.push(ActiveEffect {
            kind: EffectKind::PowerDown,
            remaining: Some(duration),
            restore: EffectRestore::SpeedAccel {
                speed: specs.speed,
                acceleration: specs.acceleration,
            },
        });
        specs.speed = slow_speed;
        specs.acceleration = slow_acceleration;
        true
    }

    /// AI cars scale their max speed instead of swapping in fixed values.
    pub fn activate_speed_scale(
        &mut self,
        kind: EffectKind,
        specs: &mut CarSpecs,
        multiplier: f32,
        duration: f32,
    ) -> bool {
        debug_assert!(kind.is_speed_class());
        if kind == EffectKind::PowerDown && self.is_shielded() {
            return false;
        }
        if self.has_speed_effect() {
            return false;
        }
        self.effects.push(ActiveEffect {
            kind,
            remaining: Some(duration),
            restore: EffectRestore::MaxSpeed { speed: specs.speed },
        });
        specs.speed *= multiplier;
        true
    }

    /// Floor-contact slow: no timer, lasts until `end_off_track_slow`.
    /// Deliberately not suppressed by shields, matching the floor hazard
    /// being terrain rather than an attack.
    pub fn begin_off_track_slow(
        &mut self,
        specs: &mut CarSpecs,
        slow_speed: f32,
        slow_acceleration: f32,
    ) -> bool {
        if self.has_speed_effect() {
            return false;
        }
        self.effects.push(ActiveEffect {
            kind: EffectKind::OffTrackSlow,
            remaining: None,
            restore: EffectRestore::SpeedAccel {
                speed: specs.speed,
                acceleration: specs.acceleration,
            },
        });
        specs.speed = slow_speed;
        specs.acceleration = slow_acceleration;
        true
    }

    pub fn end_off_track_slow(&mut self, specs: &mut CarSpecs) -> bool {
        let Some(index) = self
            .effects
            .iter()
            .position(|effect| effect.kind == EffectKind::OffTrackSlow)
        else {
            return false;
        };
        let effect = self.effects.remove(index);
        apply_restore(effect.restore, specs);
        true
    }

    pub fn activate_shield(&mut self, specs: &mut CarSpecs, mass: f32, duration: f32) -> bool {
        if self.is_shielded() {
            return false;
        }
        self.effects.push(ActiveEffect {
            kind: EffectKind::Shield,
            remaining: Some(duration),
            restore: EffectRestore::Mass { mass: specs.mass },
        });
        specs.mass = mass;
        true
    }

    pub fn activate_inverted_controls(&mut self, motion: &mut CarMotion, duration: f32) -> bool {
        if self.is_shielded() || self.is_active(EffectKind::InvertedControls) {
            return false;
        }
        self.effects.push(ActiveEffect {
            kind: EffectKind::InvertedControls,
            remaining: Some(duration),
            restore: EffectRestore::None,
        });
        motion.inverted_controls = true;
        true
    }

    /// Counts down every timed effect and restores expired ones, returning
    /// the kinds that ended this tick so callers can tear down their visuals.
    pub fn tick(&mut self, dt: f32, specs: &mut CarSpecs, motion: &mut CarMotion) -> Vec<EffectKind> {
        let mut expired = Vec::new();
        let mut index = 0;
        while index < self.effects.len() {
            let due = match self.effects[index].remaining.as_mut() {
                Some(remaining) => {
                    *remaining -= dt;
                    *remaining <= 0.0
                }
                None => false,
            };
            if due {
                let effect = self.effects.remove(index);
                apply_restore(effect.restore, specs);
                if effect.kind == EffectKind::InvertedControls {
                    motion.inverted_controls = false;
                }
                expired.push(effect.kind);
            } else {
                index += 1;
            }
        }
        expired
    }
}

fn apply_restore(restore: EffectRestore, specs: &mut CarSpecs) {
    match restore {
        EffectRestore::SpeedAccel {
            speed,
            acceleration,
        } => {
            specs.speed = speed;
            specs.acceleration = acceleration;
        }
        EffectRestore::MaxSpeed { speed } => specs.speed = speed,
        EffectRestore::Mass { mass } => specs.mass = mass,
        EffectRestore::None => {}
    }
}

/// A limited-availability resource on the track: consumed on contact,
/// reappears after its own fixed delay.
#[derive(Component)]
pub struct Pickup {
    pub respawn: Timer,
}

impl Pickup {
    pub fn new() -> Self {
        Self {
            respawn: Timer::from_seconds(PICKUP_RESPAWN_DELAY, TimerMode::Once),
        }
    }
}

/// Deployed star obstacle; bounces any car other than its deployer.
#[derive(Component)]
pub struct StarBlock {
    pub deployed_by: Entity,
    pub lifetime: Timer,
    pub half_extents: Vec3,
    /// Cars currently in contact, so the bounce fires once per contact.
    overlapping: HashSet<Entity>,
}

impl StarBlock {
    pub fn new(deployed_by: Entity) -> Self {
        Self {
            deployed_by,
            lifetime: Timer::from_seconds(STAR_BLOCK_LIFETIME, TimerMode::Once),
            half_extents: Vec3::splat(STAR_BLOCK_HALF_EXTENT),
            overlapping: HashSet::new(),
        }
    }
}

/// "Play effect X" cue for the presentation layer; the core never waits on it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectCue {
    SpeedBoost,
    PowerDown,
    Shield,
    InvertControls,
    Star,
}

#[derive(Event, Clone, Copy, Debug)]
pub struct EffectNotification {
    pub car: Entity,
    pub cue: EffectCue,
}

pub fn handle_pickup_events(
    mut commands: Commands,
    mut events: EventReader<ZoneEvent>,
    mut pickups: Query<(&mut TriggerZone, &mut Pickup)>,
    mut cars: Query<
        (
            Entity,
            &Transform,
            &mut CarSpecs,
            &mut CarMotion,
            &mut ActiveEffects,
            Option<&PlayerControlled>,
        ),
        With<Car>,
    >,
    mut notifications: EventWriter<EffectNotification>,
) {
    for event in events.read() {
        if event.phase != ZonePhase::Entered {
            continue;
        }
        if !event.kind.is_pickup() && event.kind != InteractionKind::SpeedRamp {
            continue;
        }
        let Ok((car, transform, mut specs, mut motion, mut effects, player)) =
            cars.get_mut(event.car)
        else {
            continue;
        };
        let is_player = player.is_some();

        let activated = match event.kind {
            InteractionKind::SpeedRamp => {
                let on = if is_player {
                    effects.activate_boost(
                        &mut specs,
                        RAMP_BOOST_SPEED,
                        RAMP_BOOST_ACCELERATION,
                        RAMP_BOOST_DURATION,
                    )
                } else {
                    effects.activate_speed_scale(
                        EffectKind::Boost,
                        &mut specs,
                        AI_BOOST_MULTIPLIER,
                        AI_EFFECT_DURATION,
                    )
                };
                on.then_some(EffectCue::SpeedBoost)
            }
            InteractionKind::SpeedPickup => {
                let on = if is_player {
                    effects.activate_boost(
                        &mut specs,
                        BOOST_SPEED,
                        BOOST_ACCELERATION,
                        BOOST_DURATION,
                    )
                } else {
                    effects.activate_speed_scale(
                        EffectKind::Boost,
                        &mut specs,
                        AI_BOOST_MULTIPLIER,
                        AI_EFFECT_DURATION,
                    )
                };
                on.then_some(EffectCue::SpeedBoost)
            }
            InteractionKind::PowerDownPickup => {
                if effects.is_shielded() {
                    info!("car hit a powerdown but has a shield");
                }
                let on = if is_player {
                    effects.activate_power_down(
                        &mut specs,
                        SLOW_SPEED,
                        SLOW_ACCELERATION,
                        SLOW_DURATION,
                    )
                } else {
                    effects.activate_speed_scale(
                        EffectKind::PowerDown,
                        &mut specs,
                        AI_SLOW_MULTIPLIER,
                        AI_EFFECT_DURATION,
                    )
                };
                on.then_some(EffectCue::PowerDown)
            }
            InteractionKind::ShieldPickup => {
                let (mass, duration) = if is_player {
                    (SHIELD_MASS, SHIELD_DURATION)
                } else {
                    (AI_SHIELD_MASS, AI_SHIELD_DURATION)
                };
                let on = effects.activate_shield(&mut specs, mass, duration);
                if on {
                    info!("shield activated, mass now {}", specs.mass);
                    commands.spawn((
                        ShieldBubble { owner: car },
                        Transform::from_translation(transform.translation + Vec3::Y),
                    ));
                }
                on.then_some(EffectCue::Shield)
            }
            InteractionKind::InvertPickup => {
                // AI cars consume the pickup but shrug off the effect.
                let on = is_player
                    && effects.activate_inverted_controls(&mut motion, INVERT_DURATION);
                on.then_some(EffectCue::InvertControls)
            }
            InteractionKind::StarPickup => {
                if is_player {
                    commands.entity(car).insert(HeldStar);
                    info!("car collected the star power-up");
                } else {
                    // AI deploys immediately at its fixed offset.
                    let offset = Vec3::from(AI_STAR_SPAWN_OFFSET);
                    let spawn_pos = transform.translation + transform.rotation * offset;
                    commands.spawn((
                        StarBlock::new(car),
                        Transform::from_translation(spawn_pos),
                    ));
                }
                Some(EffectCue::Star)
            }
            _ => None,
        };

        if let Some(cue) = activated {
            notifications.write(EffectNotification { car, cue });
        }

        // Pickups deactivate themselves and rearm after their own delay;
        // ramps stay live and rely on the idempotent re-entry guard.
        if event.kind.is_pickup() {
            if let Ok((mut zone, mut pickup)) = pickups.get_mut(event.zone) {
                zone.enabled = false;
                pickup.respawn.reset();
            }
        }
    }
}

/// Sustained floor contact: slow the car and flag it off-track for the
/// duration of the contact, no timer involved.
pub fn handle_floor_contact(
    mut events: EventReader<ZoneEvent>,
    mut cars: Query<
        (&mut CarSpecs, &mut CarMotion, &mut ActiveEffects),
        With<PlayerControlled>,
    >,
    mut notifications: EventWriter<EffectNotification>,
) {
    for event in events.read() {
        if event.kind != InteractionKind::Floor {
            continue;
        }
        let Ok((mut specs, mut motion, mut effects)) = cars.get_mut(event.car) else {
            continue;
        };
        match event.phase {
            ZonePhase::Entered => {
                if effects.begin_off_track_slow(&mut specs, SLOW_SPEED, SLOW_ACCELERATION) {
                    notifications.write(EffectNotification {
                        car: event.car,
                        cue: EffectCue::PowerDown,
                    });
                }
                motion.off_track = true;
            }
            ZonePhase::Exited => {
                effects.end_off_track_slow(&mut specs);
                motion.off_track = false;
            }
        }
    }
}

pub fn tick_active_effects(
    mut commands: Commands,
    time: Res<Time>,
    mut cars: Query<(Entity, &mut CarSpecs, &mut CarMotion, &mut ActiveEffects), With<Car>>,
    bubbles: Query<(Entity, &ShieldBubble)>,
) {
    let dt = time.delta_secs();
    for (car, mut specs, mut motion, mut effects) in cars.iter_mut() {
        for expired in effects.tick(dt, &mut specs, &mut motion) {
            if expired == EffectKind::Shield {
                info!("shield ran out, mass back to {}", specs.mass);
                for (bubble, shield) in bubbles.iter() {
                    if shield.owner == car {
                        commands.entity(bubble).despawn();
                    }
                }
            }
        }
    }
}

/// Keeps each shield bubble floating above its owner.
pub fn update_shield_bubbles(
    mut bubbles: Query<(&ShieldBubble, &mut Transform)>,
    cars: Query<&Transform, (With<Car>, Without<ShieldBubble>)>,
) {
    for (shield, mut transform) in bubbles.iter_mut() {
        if let Ok(owner) = cars.get(shield.owner) {
            transform.translation = owner.translation + Vec3::Y;
        }
    }
}

pub fn respawn_pickups(time: Res<Time>, mut pickups: Query<(&mut Pickup, &mut TriggerZone)>) {
    for (mut pickup, mut zone) in pickups.iter_mut() {
        if !zone.enabled {
            pickup.respawn.tick(time.delta());
            if pickup.respawn.just_finished() {
                zone.enabled = true;
                debug!("powerup respawned");
            }
        }
    }
}

/// Player star deployment: drop the held star block behind the car. The
/// latched deploy intent is consumed here whether or not a star is held, so
/// an early press cannot fire a star collected later.
pub fn deploy_star_blocks(
    mut commands: Commands,
    mut cars: Query<
        (
            Entity,
            &Transform,
            &mut crate::components::CarInput,
            Option<&HeldStar>,
        ),
        With<PlayerControlled>,
    >,
    mut notifications: EventWriter<EffectNotification>,
) {
    for (car, transform, mut input, held) in cars.iter_mut() {
        if !input.deploy_star {
            continue;
        }
        input.deploy_star = false;
        if held.is_none() {
            continue;
        }
        let forward = *transform.forward();
        let spawn_pos = transform.translation - forward * STAR_DEPLOY_DISTANCE
            + Vec3::Y * STAR_DEPLOY_Y_OFFSET;
        commands.spawn((StarBlock::new(car), Transform::from_translation(spawn_pos)));
        commands.entity(car).remove::<HeldStar>();
        notifications.write(EffectNotification {
            car,
            cue: EffectCue::Star,
        });
        info!("star block deployed behind the car");
    }
}

/// Ages star blocks out and knocks back any other car on the tick it first
/// touches one. AI cars move kinematically, so the shove displaces their
/// transform and the nav agent resumes the route from there; player cars take
/// the hit through the controller's speed and velocity channels, which the
/// next `step_car` integrates.
pub fn update_star_blocks(
    mut commands: Commands,
    time: Res<Time>,
    mut blocks: Query<(Entity, &Transform, &mut StarBlock), Without<Car>>,
    mut cars: Query<
        (
            Entity,
            &mut Transform,
            &mut Velocity,
            &mut CarMotion,
            &CarSpecs,
            Option<&AIControlled>,
        ),
        With<Car>,
    >,
) {
    for (block_entity, block_transform, mut block) in blocks.iter_mut() {
        block.lifetime.tick(time.delta());
        if block.lifetime.finished() {
            commands.entity(block_entity).despawn();
            debug!("star obstacle despawned");
            continue;
        }
        let mut inside = HashSet::new();
        for (car, mut car_transform, mut velocity, mut motion, specs, ai) in cars.iter_mut() {
            if car == block.deployed_by {
                continue;
            }
            if !zone_contains(
                car_transform.translation,
                block_transform.translation,
                block.half_extents,
            ) {
                continue;
            }
            inside.insert(car);
            if block.overlapping.contains(&car) {
                // Still in contact from a previous tick, already bounced.
                continue;
            }
            let mut direction = car_transform.translation - block_transform.translation;
            direction.y = 0.0;
            let impulse = direction.normalize_or_zero() * STAR_BOUNCE_FORCE / specs.mass;
            if ai.is_some() {
                car_transform.translation += impulse;
            } else {
                let forward = *car_transform.forward();
                let along_forward = impulse.dot(forward);
                motion.current_speed += along_forward;
                **velocity += impulse - forward * along_forward;
            }
        }
        block.overlapping = inside;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> (CarSpecs, CarMotion, ActiveEffects) {
        (
            CarSpecs::player(),
            CarMotion::default(),
            ActiveEffects::default(),
        )
    }

    #[test]
    fn test_boost_restores_baseline_after_duration() {
        let (mut specs, mut motion, mut effects) = player();

        assert!(effects.activate_boost(&mut specs, BOOST_SPEED, BOOST_ACCELERATION, BOOST_DURATION));
        assert_eq!(specs.speed, BOOST_SPEED);
        assert_eq!(specs.acceleration, BOOST_ACCELERATION);

        // Just before expiry, still boosted
        effects.tick(BOOST_DURATION - 0.1, &mut specs, &mut motion);
        assert_eq!(specs.speed, BOOST_SPEED);

        let expired = effects.tick(0.2, &mut specs, &mut motion);
        assert_eq!(expired, vec![EffectKind::Boost]);
        assert_eq!(specs.speed, BASE_SPEED);
        assert_eq!(specs.acceleration, ACCELERATION);
    }

    #[test]
    fn test_reentry_is_noop_not_duration_reset() {
        let (mut specs, mut motion, mut effects) = player();

        assert!(effects.activate_boost(&mut specs, BOOST_SPEED, BOOST_ACCELERATION, BOOST_DURATION));
        effects.tick(BOOST_DURATION - 0.5, &mut specs, &mut motion);

        // Re-activation must not restart the clock
        assert!(!effects.activate_boost(
            &mut specs,
            BOOST_SPEED,
            BOOST_ACCELERATION,
            BOOST_DURATION
        ));
        let expired = effects.tick(0.6, &mut specs, &mut motion);
        assert_eq!(expired, vec![EffectKind::Boost]);
        assert_eq!(specs.speed, BASE_SPEED);
    }

    #[test]
    fn test_shield_suppresses_power_down() {
        let (mut specs, mut motion, mut effects) = player();

        assert!(effects.activate_shield(&mut specs, SHIELD_MASS, SHIELD_DURATION));
        assert_eq!(specs.mass, SHIELD_MASS);

        assert!(!effects.activate_power_down(
            &mut specs,
            SLOW_SPEED,
            SLOW_ACCELERATION,
            SLOW_DURATION
        ));
        assert_eq!(specs.speed, BASE_SPEED);
        assert_eq!(specs.acceleration, ACCELERATION);
        assert!(!effects.is_active(EffectKind::PowerDown));

        // Shield expiry restores mass
        effects.tick(SHIELD_DURATION + 0.1, &mut specs, &mut motion);
        assert_eq!(specs.mass, CAR_MASS);
    }

    #[test]
    fn test_shield_suppresses_inverted_controls_but_not_boost() {
        let (mut specs, mut motion, mut effects) = player();

        effects.activate_shield(&mut specs, SHIELD_MASS, SHIELD_DURATION);
        assert!(!effects.activate_inverted_controls(&mut motion, INVERT_DURATION));
        assert!(!motion.inverted_controls);

        assert!(effects.activate_boost(&mut specs, BOOST_SPEED, BOOST_ACCELERATION, BOOST_DURATION));
        assert_eq!(specs.speed, BOOST_SPEED);
    }

    #[test]
    fn test_speed_effects_are_mutually_exclusive() {
        let (mut specs, mut motion, mut effects) = player();

        assert!(effects.activate_boost(&mut specs, BOOST_SPEED, BOOST_ACCELERATION, BOOST_DURATION));
        // Opposite-kind activation while a speed effect runs is ignored, so the
        // boost's restore target can never be clobbered.
        assert!(!effects.activate_power_down(
            &mut specs,
            SLOW_SPEED,
            SLOW_ACCELERATION,
            SLOW_DURATION
        ));
        assert_eq!(specs.speed, BOOST_SPEED);

        effects.tick(BOOST_DURATION + 0.1, &mut specs, &mut motion);
        assert_eq!(specs.speed, BASE_SPEED);
        assert_eq!(specs.acceleration, ACCELERATION);
    }

    #[test]
    fn test_ai_speed_scale_round_trips() {
        let mut specs = CarSpecs::ai();
        let mut motion = CarMotion::default();
        let mut effects = ActiveEffects::default();

        // 30 km/h max boosted by 1.5 reads 45 until the effect expires
        assert!(effects.activate_speed_scale(
            EffectKind::Boost,
            &mut specs,
            AI_BOOST_MULTIPLIER,
            AI_EFFECT_DURATION
        ));
        assert_eq!(specs.speed, 45.0);

        effects.tick(AI_EFFECT_DURATION + 0.1, &mut specs, &mut motion);
        assert_eq!(specs.speed, AI_MAX_SPEED);
    }

    #[test]
    fn test_off_track_slow_lasts_until_contact_ends() {
        let (mut specs, mut motion, mut effects) = player();

        assert!(effects.begin_off_track_slow(&mut specs, SLOW_SPEED, SLOW_ACCELERATION));
        assert_eq!(specs.speed, SLOW_SPEED);

        // No timer: ticking far past any duration changes nothing
        effects.tick(60.0, &mut specs, &mut motion);
        assert_eq!(specs.speed, SLOW_SPEED);

        assert!(effects.end_off_track_slow(&mut specs));
        assert_eq!(specs.speed, BASE_SPEED);
        assert_eq!(specs.acceleration, ACCELERATION);

        // Ending twice is a no-op
        assert!(!effects.end_off_track_slow(&mut specs));
    }

    #[test]
    fn test_inverted_controls_flag_round_trip() {
        let (mut specs, mut motion, mut effects) = player();

        assert!(effects.activate_inverted_controls(&mut motion, INVERT_DURATION));
        assert!(motion.inverted_controls);
        assert!(!effects.activate_inverted_controls(&mut motion, INVERT_DURATION));

        let expired = effects.tick(INVERT_DURATION + 0.1, &mut specs, &mut motion);
        assert_eq!(expired, vec![EffectKind::InvertedControls]);
        assert!(!motion.inverted_controls);
    }

    #[test]
    fn test_star_block_shoves_ai_car_on_contact_edge() {
        use bevy::ecs::system::RunSystemOnce;

        let mut world = World::new();
        world.init_resource::<Time>();
        let deployer = world.spawn_empty().id();
        world.spawn((StarBlock::new(deployer), Transform::default()));

        // Heavy enough that the shove leaves it inside the block
        let mut specs = CarSpecs::ai();
        specs.mass = 500.0;
        let ai = world
            .spawn((
                Car,
                AIControlled,
                Transform::from_xyz(0.5, 0.0, 0.0),
                Velocity::new(),
                CarMotion::default(),
                specs,
            ))
            .id();

        world.run_system_once(update_star_blocks).expect("system runs");
        let shoved = world.get::<Transform>(ai).expect("transform").translation;
        assert!(shoved.x > 0.5);

        // Sustained contact does not keep pushing
        world.run_system_once(update_star_blocks).expect("system runs");
        assert_eq!(
            world.get::<Transform>(ai).expect("transform").translation,
            shoved
        );
    }

    #[test]
    fn test_star_block_knocks_player_through_controller_state() {
        use bevy::ecs::system::RunSystemOnce;

        let mut world = World::new();
        world.init_resource::<Time>();
        let deployer = world.spawn_empty().id();
        world.spawn((StarBlock::new(deployer), Transform::default()));

        // Player just past the block, facing -Z: the bounce lands against the
        // direction of travel
        let player = world
            .spawn((
                Car,
                PlayerControlled,
                Transform::from_xyz(0.0, 0.0, 0.5),
                Velocity::new(),
                CarMotion::default(),
                CarSpecs::player(),
            ))
            .id();

        world.run_system_once(update_star_blocks).expect("system runs");
        let motion = world.get::<CarMotion>(player).expect("motion");
        assert!(motion.current_speed < 0.0);
        // Transform is untouched; the next physics step integrates the hit
        assert_eq!(
            world.get::<Transform>(player).expect("transform").translation,
            Vec3::new(0.0, 0.0, 0.5)
        );
    }

    #[test]
    fn test_star_block_ignores_its_deployer() {
        use bevy::ecs::system::RunSystemOnce;

        let mut world = World::new();
        world.init_resource::<Time>();
        let deployer = world
            .spawn((
                Car,
                PlayerControlled,
                Transform::default(),
                Velocity::new(),
                CarMotion::default(),
                CarSpecs::player(),
            ))
            .id();
        world.spawn((StarBlock::new(deployer), Transform::default()));

        world.run_system_once(update_star_blocks).expect("system runs");
        let motion = world.get::<CarMotion>(deployer).expect("motion");
        assert_eq!(motion.current_speed, 0.0);
        assert_eq!(
            world.get::<Transform>(deployer).expect("transform").translation,
            Vec3::ZERO
        );
    }

    #[test]
    fn test_deploy_intent_consumed_even_without_a_star() {
        use crate::components::CarInput;
        use bevy::ecs::system::RunSystemOnce;

        let mut world = World::new();
        world.init_resource::<Events<EffectNotification>>();
        let empty_handed = world
            .spawn((
                PlayerControlled,
                Transform::default(),
                CarInput {
                    deploy_star: true,
                    ..CarInput::default()
                },
            ))
            .id();

        world.run_system_once(deploy_star_blocks).expect("system runs");
        assert!(!world.get::<CarInput>(empty_handed).expect("input").deploy_star);
        assert_eq!(world.query::<&StarBlock>().iter(&world).count(), 0);

        // A star collected later needs a fresh press
        world.entity_mut(empty_handed).insert(HeldStar);
        world.run_system_once(deploy_star_blocks).expect("system runs");
        assert_eq!(world.query::<&StarBlock>().iter(&world).count(), 0);

        world.get_mut::<CarInput>(empty_handed).expect("input").deploy_star = true;
        world.run_system_once(deploy_star_blocks).expect("system runs");
        assert_eq!(world.query::<&StarBlock>().iter(&world).count(), 1);
        assert!(world.get::<HeldStar>(empty_handed).is_none());
    }

    #[test]
    fn test_no_effect_means_baseline_speed() {
        let (mut specs, mut motion, mut effects) = player();
        let baseline = crate::components::CarBaseline::of(&specs);

        // Run a full boost and a full shield through their lifecycles
        effects.activate_boost(&mut specs, BOOST_SPEED, BOOST_ACCELERATION, BOOST_DURATION);
        effects.activate_shield(&mut specs, SHIELD_MASS, SHIELD_DURATION);
        effects.tick(SHIELD_DURATION + 1.0, &mut specs, &mut motion);

        assert_eq!(specs.speed, baseline.speed);
        assert_eq!(specs.acceleration, baseline.acceleration);
        assert_eq!(specs.mass, baseline.mass);
    }
}
