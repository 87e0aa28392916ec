use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use rusty_karts::constants::PHYSICS_HZ;
use rusty_karts::race::{RaceHud, RaceState};
use rusty_karts::track::{load_track_from_file, spawn_track, TrackDefinition};
use rusty_karts::KartCorePlugin;

/// Headless demo: runs the race core without a renderer, logging progress.
/// Pass a track JSON path as the first argument to race somewhere other than
/// the built-in demo oval.
fn main() {
    let track = match std::env::args().nth(1) {
        Some(path) => match load_track_from_file(&path) {
            Ok(track) => track,
            Err(err) => {
                eprintln!("{}, falling back to the demo track", err);
                TrackDefinition::demo()
            }
        },
        None => TrackDefinition::demo(),
    };

    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / PHYSICS_HZ,
            ))),
        )
        .add_plugins(LogPlugin::default())
        .add_plugins(KartCorePlugin)
        .insert_resource(DemoTrack(track))
        .add_systems(Startup, setup_race)
        .add_systems(Update, (log_progress, exit_when_over))
        .run();
}

#[derive(Resource)]
struct DemoTrack(TrackDefinition);

fn setup_race(
    mut commands: Commands,
    track: Res<DemoTrack>,
    mut next_state: ResMut<NextState<RaceState>>,
) {
    info!("starting race on '{}'", track.0.name);
    spawn_track(&mut commands, &track.0);
    next_state.set(RaceState::Racing);
}

fn log_progress(hud: Res<RaceHud>, mut last: Local<(u32, usize)>) {
    let snapshot = (hud.current_lap, hud.checkpoints_collected);
    if snapshot != *last {
        *last = snapshot;
        info!(
            "lap {}/{}, checkpoints {}/{}",
            hud.current_lap, hud.max_laps, hud.checkpoints_collected, hud.checkpoints_total
        );
    }
}

fn exit_when_over(state: Res<State<RaceState>>, mut exit: EventWriter<AppExit>) {
    if state.get().is_over() {
        exit.write(AppExit::Success);
    }
}
