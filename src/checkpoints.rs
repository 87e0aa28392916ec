use bevy::prelude::*;
use std::collections::HashSet;

use crate::components::{CarMotion, PlayerControlled, Velocity};
use crate::constants::*;
use crate::race::RaceState;
use crate::vehicle::reset_movement;
use crate::zones::{InteractionKind, ZoneEvent, ZonePhase};

/// Total checkpoint count, discovered once when the track is spawned and
/// injected here rather than re-queried from the scene.
#[derive(Resource, Clone, Copy)]
pub struct CheckpointRegistry {
    pub total: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LapOutcome {
    /// Finish line crossed with checkpoints missing: no partial credit.
    Incomplete,
    LapCompleted(u32),
    RaceWon,
}

/// Authoritative, cheat-resistant lap validation for the player car: a lap
/// only counts when every checkpoint on the track was touched since the last
/// rollover, in any order.
#[derive(Component)]
pub struct CheckpointTracker {
    collected: HashSet<Entity>,
    last_checkpoint: Option<(Entity, Vec3)>,
    lap: u32,
    max_laps: u32,
    /// Collected sets archived per completed lap.
    lap_history: Vec<HashSet<Entity>>,
    on_floor: bool,
    floor_timer: f32,
    checkpoint_buffer_timer: f32,
    lap_reset_timer: f32,
}

impl CheckpointTracker {
    pub fn new(max_laps: u32) -> Self {
        Self {
            collected: HashSet::new(),
            last_checkpoint: None,
            lap: 1,
            max_laps,
            lap_history: Vec::new(),
            on_floor: false,
            floor_timer: 0.0,
            checkpoint_buffer_timer: 0.0,
            lap_reset_timer: 0.0,
        }
    }

    pub fn collected_count(&self) -> usize {
        self.collected.len()
    }

    pub fn current_lap(&self) -> u32 {
        self.lap
    }

    pub fn max_laps(&self) -> u32 {
        self.max_laps
    }

    pub fn last_checkpoint_position(&self) -> Option<Vec3> {
        self.last_checkpoint.map(|(_, position)| position)
    }

    pub fn lap_history(&self) -> &[HashSet<Entity>] {
        &self.lap_history
    }

    fn lap_resetting(&self) -> bool {
        self.lap_reset_timer > 0.0
    }

    /// Checkpoint contact. Ignored during the post-lap grace window so a
    /// checkpoint straddling the finish line can't double count; otherwise an
    /// idempotent set insert that also resets the floor-respawn state.
    pub fn on_checkpoint(&mut self, checkpoint: Entity, position: Vec3, total: usize) {
        if self.lap_resetting() {
            return;
        }
        if self.collected.insert(checkpoint) {
            self.last_checkpoint = Some((checkpoint, position));
            info!(
                "collected checkpoint, lap {}: {}/{}",
                self.lap,
                self.collected.len(),
                total
            );
        } else {
            self.last_checkpoint = Some((checkpoint, position));
        }
        self.on_floor = false;
        self.floor_timer = 0.0;
        self.checkpoint_buffer_timer = CHECKPOINT_BUFFER_TIME;
    }

    /// Finish-line contact: all-or-nothing lap validation.
    pub fn on_finish_line(&mut self, total: usize) -> LapOutcome {
        if self.collected.len() != total {
            info!(
                "cannot complete lap, {}/{} checkpoints",
                self.collected.len(),
                total
            );
            return LapOutcome::Incomplete;
        }

        self.lap_history.push(std::mem::take(&mut self.collected));
        self.lap_reset_timer = LAP_RESET_BUFFER_TIME;

        if self.lap >= self.max_laps {
            info!("laps finished, race completed");
            return LapOutcome::RaceWon;
        }
        self.lap += 1;
        info!("starting lap {}", self.lap);
        LapOutcome::LapCompleted(self.lap)
    }

    pub fn on_floor_entered(&mut self) {
        if self.checkpoint_buffer_timer <= 0.0 {
            self.on_floor = true;
            self.floor_timer = 0.0;
        }
    }

    pub fn on_floor_exited(&mut self) {
        self.on_floor = false;
        self.floor_timer = 0.0;
    }

    /// Per-frame timer upkeep. Returns true when sustained floor contact has
    /// crossed the respawn threshold this frame.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.checkpoint_buffer_timer > 0.0 {
            self.checkpoint_buffer_timer -= dt;
        }
        if self.lap_reset_timer > 0.0 {
            self.lap_reset_timer -= dt;
        }

        if self.on_floor && self.checkpoint_buffer_timer <= 0.0 {
            self.floor_timer += dt;
            if self.floor_timer >= FLOOR_RESPAWN_TIME {
                self.floor_timer = 0.0;
                self.on_floor = false;
                return true;
            }
        }
        false
    }
}

/// Frame-rate timer upkeep plus the respawn-to-last-checkpoint path.
pub fn tick_checkpoint_trackers(
    time: Res<Time>,
    mut cars: Query<
        (
            &mut CheckpointTracker,
            &mut Transform,
            &mut Velocity,
            &mut CarMotion,
        ),
        With<PlayerControlled>,
    >,
) {
    let dt = time.delta_secs();
    for (mut tracker, mut transform, mut velocity, mut motion) in cars.iter_mut() {
        if !tracker.tick(dt) {
            continue;
        }
        match tracker.last_checkpoint_position() {
            Some(position) => {
                transform.translation = position;
                reset_movement(&mut motion, &mut velocity);
                info!("respawned at last checkpoint");
            }
            None => info!("no checkpoint reached yet, cannot respawn"),
        }
    }
}

pub fn handle_checkpoint_events(
    mut events: EventReader<ZoneEvent>,
    registry: Option<Res<CheckpointRegistry>>,
    zones: Query<&Transform, Without<PlayerControlled>>,
    mut cars: Query<&mut CheckpointTracker, With<PlayerControlled>>,
    mut next_state: ResMut<NextState<RaceState>>,
) {
    let Some(registry) = registry else {
        warn_once!("no checkpoint registry, ignoring checkpoint events");
        return;
    };
    for event in events.read() {
        let Ok(mut tracker) = cars.get_mut(event.car) else {
            continue;
        };
        match (event.kind, event.phase) {
            (InteractionKind::Checkpoint, ZonePhase::Entered) => {
                let Ok(zone_transform) = zones.get(event.zone) else {
                    continue;
                };
                tracker.on_checkpoint(event.zone, zone_transform.translation, registry.total);
            }
            (InteractionKind::FinishLine, ZonePhase::Entered) => {
                if tracker.on_finish_line(registry.total) == LapOutcome::RaceWon {
                    next_state.set(RaceState::Victory);
                }
            }
            (InteractionKind::Floor, ZonePhase::Entered) => tracker.on_floor_entered(),
            (InteractionKind::Floor, ZonePhase::Exited) => tracker.on_floor_exited(),
            _ => {}
        }
    }
}
