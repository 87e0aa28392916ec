use bevy::prelude::*;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::ai_driver::{AiDriver, AiLapTracker, NavAgent, Route};
use crate::checkpoints::{CheckpointRegistry, CheckpointTracker};
use crate::components::{
    AIControlled, AngularVelocity, Car, CarBaseline, CarBodyTilt, CarInput, CarMotion, CarSpecs,
    PlayerControlled, Velocity, WheelSet,
};
use crate::constants::*;
use crate::powerups::{ActiveEffects, Pickup};
use crate::zones::{InteractionKind, TriggerZone, ZoneOverlaps};

/// Everything a track contributes to the simulation, loaded from a JSON asset
/// or built in code. All gameplay collaborators (routes, checkpoint registry,
/// zones) come from here at spawn time; nothing searches the scene later.
#[derive(Deserialize, Clone, Debug)]
pub struct TrackDefinition {
    pub name: String,
    pub laps: u32,
    pub player_spawn: PoseDef,
    pub ai_spawns: Vec<PoseDef>,
    pub waypoints: Vec<[f32; 3]>,
    pub checkpoints: Vec<ZoneDef>,
    pub finish_line: ZoneDef,
    pub before_finish: ZoneDef,
    #[serde(default)]
    pub braking_zones: Vec<ZoneDef>,
    #[serde(default)]
    pub speed_ramps: Vec<ZoneDef>,
    #[serde(default)]
    pub stuck_zones: Vec<ZoneDef>,
    #[serde(default)]
    pub floor_regions: Vec<ZoneDef>,
    #[serde(default)]
    pub pickup_spawns: Vec<[f32; 3]>,
}

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct PoseDef {
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_degrees: f32,
}

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct ZoneDef {
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
}

impl PoseDef {
    fn transform(&self) -> Transform {
        Transform::from_translation(Vec3::from(self.position))
            .with_rotation(Quat::from_rotation_y(self.yaw_degrees.to_radians()))
    }
}

#[derive(Debug)]
pub enum TrackLoadError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for TrackLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackLoadError::Io(err) => write!(f, "failed to open track file: {}", err),
            TrackLoadError::Parse(err) => write!(f, "failed to parse track file: {}", err),
        }
    }
}

impl std::error::Error for TrackLoadError {}

impl From<std::io::Error> for TrackLoadError {
    fn from(err: std::io::Error) -> Self {
        TrackLoadError::Io(err)
    }
}

impl From<serde_json::Error> for TrackLoadError {
    fn from(err: serde_json::Error) -> Self {
        TrackLoadError::Parse(err)
    }
}

pub fn load_track_from_file<P: AsRef<Path>>(path: P) -> Result<TrackDefinition, TrackLoadError> {
    let file = File::open(path)?;
    let track = serde_json::from_reader(BufReader::new(file))?;
    Ok(track)
}

impl TrackDefinition {
    /// Small oval used by the demo binary and integration tests: four
    /// checkpoints, a finish straight, one of everything else.
    pub fn demo() -> Self {
        let zone = |x: f32, z: f32| ZoneDef {
            position: [x, 0.0, z],
            half_extents: [6.0, 4.0, 6.0],
        };
        Self {
            name: "demo oval".into(),
            laps: MAX_LAPS,
            player_spawn: PoseDef {
                position: [0.0, 0.0, -2.0],
                yaw_degrees: 0.0,
            },
            ai_spawns: vec![PoseDef {
                position: [3.0, 0.0, -2.0],
                yaw_degrees: 0.0,
            }],
            waypoints: vec![
                [0.0, 0.0, -40.0],
                [40.0, 0.0, -80.0],
                [80.0, 0.0, -40.0],
                [80.0, 0.0, 20.0],
                [40.0, 0.0, 60.0],
                [0.0, 0.0, 20.0],
            ],
            checkpoints: vec![
                zone(0.0, -40.0),
                zone(80.0, -40.0),
                zone(80.0, 20.0),
                zone(0.0, 20.0),
            ],
            finish_line: zone(0.0, -10.0),
            before_finish: zone(0.0, 10.0),
            braking_zones: vec![zone(40.0, -80.0)],
            speed_ramps: vec![zone(40.0, 60.0)],
            stuck_zones: vec![ZoneDef {
                position: [120.0, 0.0, 0.0],
                half_extents: [20.0, 10.0, 120.0],
            }],
            floor_regions: vec![ZoneDef {
                position: [-60.0, 0.0, 0.0],
                half_extents: [20.0, 10.0, 120.0],
            }],
            pickup_spawns: vec![
                [20.0, 0.0, -60.0],
                [80.0, 0.0, -10.0],
                [20.0, 0.0, 40.0],
            ],
        }
    }
}

fn spawn_zone(commands: &mut Commands, kind: InteractionKind, def: &ZoneDef) -> Entity {
    commands
        .spawn((
            TriggerZone::new(kind, Vec3::from(def.half_extents)),
            Transform::from_translation(Vec3::from(def.position)),
        ))
        .id()
}

/// Spawns the whole race: zones, pickups, the player car and the AI grid.
/// Every collaborator is handed over here, construction-time.
pub fn spawn_track(commands: &mut Commands, track: &TrackDefinition) {
    if track.checkpoints.is_empty() {
        warn!("track '{}' has no checkpoints, laps can never complete", track.name);
    }
    if track.waypoints.is_empty() {
        warn!("track '{}' has no waypoints, AI cars will not drive", track.name);
    }

    for def in &track.checkpoints {
        spawn_zone(commands, InteractionKind::Checkpoint, def);
    }
    commands.insert_resource(CheckpointRegistry {
        total: track.checkpoints.len(),
    });
    info!(
        "total checkpoints in track '{}': {}",
        track.name,
        track.checkpoints.len()
    );

    spawn_zone(commands, InteractionKind::FinishLine, &track.finish_line);
    spawn_zone(commands, InteractionKind::BeforeFinish, &track.before_finish);
    for def in &track.braking_zones {
        spawn_zone(commands, InteractionKind::BrakingZone, def);
    }
    for def in &track.speed_ramps {
        spawn_zone(commands, InteractionKind::SpeedRamp, def);
    }
    for def in &track.stuck_zones {
        spawn_zone(commands, InteractionKind::StuckZone, def);
    }
    for def in &track.floor_regions {
        spawn_zone(commands, InteractionKind::Floor, def);
    }

    // Each spawn point gets a random pickup kind for the session.
    let pickup_kinds = [
        InteractionKind::SpeedPickup,
        InteractionKind::PowerDownPickup,
        InteractionKind::ShieldPickup,
        InteractionKind::InvertPickup,
        InteractionKind::StarPickup,
    ];
    let mut rng = rand::rng();
    for position in &track.pickup_spawns {
        let kind = *pickup_kinds
            .choose(&mut rng)
            .unwrap_or(&InteractionKind::SpeedPickup);
        commands.spawn((
            TriggerZone::new(kind, Vec3::splat(1.5)),
            Pickup::new(),
            Transform::from_translation(Vec3::from(*position)),
        ));
    }

    spawn_player_car(commands, track.player_spawn.transform(), track.laps);
    let waypoints: Vec<Vec3> = track.waypoints.iter().map(|&p| Vec3::from(p)).collect();
    for spawn in &track.ai_spawns {
        spawn_ai_car(commands, spawn.transform(), waypoints.clone(), track.laps);
    }
}

pub fn spawn_player_car(commands: &mut Commands, transform: Transform, laps: u32) -> Entity {
    let specs = CarSpecs::player();
    commands
        .spawn((
            Car,
            PlayerControlled,
            transform,
            Velocity::new(),
            AngularVelocity::default(),
            CarMotion::default(),
            CarInput::default(),
            CarBaseline::of(&specs),
            specs,
            ActiveEffects::default(),
            CheckpointTracker::new(laps),
            ZoneOverlaps::default(),
            CarBodyTilt::default(),
            WheelSet::four(),
        ))
        .id()
}

pub fn spawn_ai_car(
    commands: &mut Commands,
    transform: Transform,
    waypoints: Vec<Vec3>,
    laps: u32,
) -> Entity {
    let specs = CarSpecs::ai();
    let agent = NavAgent::new(
        WAYPOINT_RANGE,
        kmh_to_ms(specs.speed),
        specs.acceleration,
        specs.steering * 50.0,
    );
    commands
        .spawn((
            Car,
            AIControlled,
            transform,
            Velocity::new(),
            CarMotion::default(),
            AiDriver::new(&specs),
            agent,
            Route::new(waypoints),
            AiLapTracker::new(laps),
            CarBaseline::of(&specs),
            specs,
            ActiveEffects::default(),
            ZoneOverlaps::default(),
            WheelSet::four(),
        ))
        .id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_track_is_consistent() {
        let track = TrackDefinition::demo();
        assert_eq!(track.checkpoints.len(), 4);
        assert!(!track.waypoints.is_empty());
        assert!(track.laps >= 1);
        assert!(!track.ai_spawns.is_empty());
    }

    #[test]
    fn test_track_parses_from_json() {
        let json = r#"{
            "name": "parse test",
            "laps": 2,
            "player_spawn": { "position": [0.0, 0.0, 0.0], "yaw_degrees": 90.0 },
            "ai_spawns": [],
            "waypoints": [[1.0, 0.0, 2.0]],
            "checkpoints": [
                { "position": [0.0, 0.0, 10.0], "half_extents": [5.0, 2.0, 5.0] }
            ],
            "finish_line": { "position": [0.0, 0.0, 0.0], "half_extents": [5.0, 2.0, 1.0] },
            "before_finish": { "position": [0.0, 0.0, 5.0], "half_extents": [5.0, 2.0, 1.0] }
        }"#;

        let track: TrackDefinition = serde_json::from_str(json).expect("valid track json");
        assert_eq!(track.name, "parse test");
        assert_eq!(track.laps, 2);
        assert_eq!(track.checkpoints.len(), 1);
        // Optional sections default to empty
        assert!(track.braking_zones.is_empty());
        assert!(track.pickup_spawns.is_empty());
    }

    #[test]
    fn test_missing_track_file_is_an_error() {
        let result = load_track_from_file("does-not-exist.json");
        assert!(matches!(result, Err(TrackLoadError::Io(_))));
    }
}
