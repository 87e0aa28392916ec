pub mod ai_driver;
pub mod checkpoints;
pub mod components;
pub mod constants;
pub mod motion;
pub mod powerups;
pub mod race;
pub mod track;
pub mod vehicle;
pub mod zones;

use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

pub use ai_driver::{AiDriver, AiLapTracker, NavAgent, Route};
pub use checkpoints::{CheckpointRegistry, CheckpointTracker, LapOutcome};
pub use components::{
    AIControlled, Car, CarInput, CarMotion, CarSpecs, PlayerControlled, Velocity,
};
pub use powerups::{ActiveEffects, EffectCue, EffectKind, EffectNotification, Pickup, StarBlock};
pub use race::{RaceHud, RaceState};
pub use track::{load_track_from_file, spawn_track, TrackDefinition, TrackLoadError};
pub use zones::{InteractionKind, TriggerZone, ZoneEvent, ZonePhase};

/// The whole gameplay core as one plugin. Input sampling and cosmetics run at
/// frame rate; everything that moves cars or judges the race runs on the fixed
/// 60 Hz step so outcomes do not depend on the render rate.
pub struct KartCorePlugin;

impl Plugin for KartCorePlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<StatesPlugin>() {
            app.add_plugins(StatesPlugin);
        }
        app.init_state::<RaceState>()
            .init_resource::<RaceHud>()
            .insert_resource(Time::<Fixed>::from_hz(constants::PHYSICS_HZ))
            .add_event::<ZoneEvent>()
            .add_event::<EffectNotification>()
            .add_systems(
                Update,
                (
                    vehicle::sample_player_input,
                    vehicle::update_body_tilt,
                    vehicle::update_wheels,
                    checkpoints::tick_checkpoint_trackers,
                    race::update_race_hud,
                    powerups::update_shield_bubbles,
                )
                    .run_if(in_state(RaceState::Racing)),
            )
            .add_systems(
                FixedUpdate,
                (
                    vehicle::apply_car_physics,
                    ai_driver::update_nav_agents,
                    ai_driver::drive_ai_cars,
                    zones::detect_zone_events,
                    checkpoints::handle_checkpoint_events,
                    powerups::handle_pickup_events,
                    powerups::handle_floor_contact,
                    ai_driver::handle_ai_zone_events,
                    powerups::tick_active_effects,
                    powerups::respawn_pickups,
                    powerups::deploy_star_blocks,
                    powerups::update_star_blocks,
                )
                    .chain()
                    .run_if(in_state(RaceState::Racing)),
            )
            .add_systems(OnEnter(RaceState::Victory), race::on_victory)
            .add_systems(OnEnter(RaceState::Defeat), race::on_defeat);
    }
}
