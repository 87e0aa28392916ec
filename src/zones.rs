use bevy::prelude::*;
use std::collections::HashSet;

use crate::components::Car;

/// Closed taxonomy of everything a car can run into on the track. Zones are
/// classified once at spawn; every consumer dispatches on this enum instead of
/// comparing tag strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum InteractionKind {
    Checkpoint,
    FinishLine,
    BeforeFinish,
    BrakingZone,
    SpeedRamp,
    StuckZone,
    Floor,
    SpeedPickup,
    PowerDownPickup,
    ShieldPickup,
    InvertPickup,
    StarPickup,
}

impl InteractionKind {
    pub fn is_pickup(self) -> bool {
        matches!(
            self,
            InteractionKind::SpeedPickup
                | InteractionKind::PowerDownPickup
                | InteractionKind::ShieldPickup
                | InteractionKind::InvertPickup
                | InteractionKind::StarPickup
        )
    }
}

/// An axis-aligned trigger volume. Consumed pickups flip `enabled` off until
/// their respawn timer brings them back.
#[derive(Component)]
pub struct TriggerZone {
    pub kind: InteractionKind,
    pub half_extents: Vec3,
    pub enabled: bool,
}

impl TriggerZone {
    pub fn new(kind: InteractionKind, half_extents: Vec3) -> Self {
        Self {
            kind,
            half_extents,
            enabled: true,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ZonePhase {
    Entered,
    Exited,
}

#[derive(Event, Clone, Copy, Debug)]
pub struct ZoneEvent {
    pub car: Entity,
    pub zone: Entity,
    pub kind: InteractionKind,
    pub phase: ZonePhase,
}

/// Zones a car is currently inside, for enter/exit edge detection.
#[derive(Component, Default)]
pub struct ZoneOverlaps {
    pub current: HashSet<Entity>,
}

pub fn zone_contains(car_pos: Vec3, zone_pos: Vec3, half_extents: Vec3) -> bool {
    let delta = car_pos - zone_pos;
    delta.x.abs() < half_extents.x
        && delta.y.abs() < half_extents.y
        && delta.z.abs() < half_extents.z
}

/// Fixed-rate overlap test of every car against every enabled zone, emitting
/// enter/exit events on edges. Disabling a zone while a car stands inside it
/// produces an exit on the next tick.
pub fn detect_zone_events(
    mut cars: Query<(Entity, &Transform, &mut ZoneOverlaps), With<Car>>,
    zones: Query<(Entity, &Transform, &TriggerZone)>,
    mut events: EventWriter<ZoneEvent>,
) {
    for (car, car_transform, mut overlaps) in cars.iter_mut() {
        let car_pos = car_transform.translation;
        let mut inside: HashSet<Entity> = HashSet::new();

        for (zone, zone_transform, trigger) in zones.iter() {
            if trigger.enabled
                && zone_contains(car_pos, zone_transform.translation, trigger.half_extents)
            {
                inside.insert(zone);
            }
        }

        for &zone in inside.difference(&overlaps.current) {
            if let Ok((_, _, trigger)) = zones.get(zone) {
                events.write(ZoneEvent {
                    car,
                    zone,
                    kind: trigger.kind,
                    phase: ZonePhase::Entered,
                });
            }
        }
        for &zone in overlaps.current.difference(&inside) {
            if let Ok((_, _, trigger)) = zones.get(zone) {
                events.write(ZoneEvent {
                    car,
                    zone,
                    kind: trigger.kind,
                    phase: ZonePhase::Exited,
                });
            }
        }

        overlaps.current = inside;
    }
}
