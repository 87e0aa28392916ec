use bevy::prelude::*;

use crate::checkpoints::{CheckpointRegistry, CheckpointTracker};
use crate::components::PlayerControlled;

/// Race lifecycle. `Setup` until the track is spawned; `Victory`/`Defeat` are
/// terminal and freeze the simulation clock.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum RaceState {
    #[default]
    Setup,
    Racing,
    Victory,
    Defeat,
}

impl RaceState {
    pub fn is_over(&self) -> bool {
        matches!(self, RaceState::Victory | RaceState::Defeat)
    }
}

/// Read model for the presentation layer: lap and checkpoint progress of the
/// player car, refreshed every frame while racing.
#[derive(Resource, Default, Clone, Copy)]
pub struct RaceHud {
    pub current_lap: u32,
    pub max_laps: u32,
    pub checkpoints_collected: usize,
    pub checkpoints_total: usize,
}

pub fn update_race_hud(
    mut hud: ResMut<RaceHud>,
    registry: Option<Res<CheckpointRegistry>>,
    player: Query<&CheckpointTracker, With<PlayerControlled>>,
) {
    let Ok(tracker) = player.single() else {
        return;
    };
    hud.current_lap = tracker.current_lap();
    hud.max_laps = tracker.max_laps();
    hud.checkpoints_collected = tracker.collected_count();
    hud.checkpoints_total = registry.map(|r| r.total).unwrap_or(0);
}

pub fn on_victory(mut time: ResMut<Time<Virtual>>) {
    info!("race won, freezing the simulation");
    time.pause();
}

pub fn on_defeat(mut time: ResMut<Time<Virtual>>) {
    info!("race lost, freezing the simulation");
    time.pause();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RaceState::Setup.is_over());
        assert!(!RaceState::Racing.is_over());
        assert!(RaceState::Victory.is_over());
        assert!(RaceState::Defeat.is_over());
    }
}
