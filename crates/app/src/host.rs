//! Host side of the campus subsystem.
//!
//! The host orchestrator owns activation: once loading has finished it keeps
//! asking the subsystem to activate until it reports `Entered`, and stops
//! when the host itself deactivates or destroys it. With the stdio bridge
//! enabled, outbound notifications are written to stdout as JSON lines and
//! inbound command lines on stdin become [`SubsystemCommand`]s.

use std::time::Duration;

use bevy::prelude::*;

use scene::commands::SubsystemCommand;
use scene::controller::{SceneSubsystem, SubsystemPhase};
use scene::notifications::{HostNotification, HostNotificationEvent, SubsystemSwitchRequest};
use scene::SceneSet;

/// Interval between activation attempts.
pub const ACTIVATION_RETRY: Duration = Duration::from_millis(200);

#[derive(Resource, Debug)]
pub struct HostOrchestrator {
    /// The host wants the outdoor scene live.
    pub wants_outdoor: bool,
    /// Loading has finished at least once.
    loaded: bool,
    retry: Timer,
}

impl Default for HostOrchestrator {
    fn default() -> Self {
        Self {
            wants_outdoor: true,
            loaded: false,
            retry: Timer::new(ACTIVATION_RETRY, TimerMode::Repeating),
        }
    }
}

/// Lines read from stdin by the reader thread.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Resource)]
pub struct StdinLines(std::sync::Mutex<std::sync::mpsc::Receiver<String>>);

pub struct HostPlugin {
    /// Bridge notifications and commands over stdout/stdin.
    pub stdio: bool,
}

impl Plugin for HostPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HostOrchestrator>()
            .add_systems(
                Update,
                (track_host_intent, orchestrate_activation)
                    .chain()
                    .after(SceneSet::Publish),
            )
            .add_systems(Update, log_switch_requests.after(SceneSet::Publish));

        if self.stdio {
            app.add_systems(Update, write_notifications.after(SceneSet::Publish));
            #[cfg(not(target_arch = "wasm32"))]
            {
                app.insert_resource(spawn_stdin_reader())
                    .add_systems(Update, read_stdin_commands.before(SceneSet::Ingest));
            }
        }
    }
}

// =============================================================================
// Orchestration
// =============================================================================

/// Follow loading progress and the host's own lifecycle commands.
pub fn track_host_intent(
    mut orchestrator: ResMut<HostOrchestrator>,
    mut notifications: EventReader<HostNotificationEvent>,
    mut commands: EventReader<SubsystemCommand>,
) {
    for HostNotificationEvent(n) in notifications.read() {
        match n {
            HostNotification::LoadingFinished => orchestrator.loaded = true,
            HostNotification::LoadingStarted => orchestrator.retry.reset(),
            _ => {}
        }
    }
    for command in commands.read() {
        match command {
            SubsystemCommand::Activate => orchestrator.wants_outdoor = true,
            SubsystemCommand::Deactivate | SubsystemCommand::Destroy => {
                orchestrator.wants_outdoor = false
            }
            _ => {}
        }
    }
}

/// Retry activation until the subsystem is entered.
pub fn orchestrate_activation(
    time: Res<Time>,
    subsystem: Res<SceneSubsystem>,
    mut orchestrator: ResMut<HostOrchestrator>,
    mut commands: EventWriter<SubsystemCommand>,
) {
    if !orchestrator.wants_outdoor || !orchestrator.loaded {
        return;
    }
    match subsystem.phase() {
        SubsystemPhase::Entered | SubsystemPhase::Destroyed => return,
        SubsystemPhase::Initializing if subsystem.is_loading() => return,
        _ => {}
    }
    if orchestrator.retry.tick(time.delta()).just_finished() {
        debug!("HostOrchestrator: requesting activation");
        commands.send(SubsystemCommand::Activate);
    }
}

fn log_switch_requests(mut switches: EventReader<SubsystemSwitchRequest>) {
    for switch in switches.read() {
        info!(
            "HostOrchestrator: switch to '{}' for '{}' requested",
            switch.target, switch.key
        );
    }
}

// =============================================================================
// stdio bridge
// =============================================================================

/// One JSON line per notification, plus subsystem switch requests in the same
/// `{"cmd", "param"}` envelope.
pub fn notification_lines(
    notifications: impl IntoIterator<Item = HostNotification>,
    switches: impl IntoIterator<Item = SubsystemSwitchRequest>,
) -> Vec<String> {
    let mut lines = Vec::new();
    for n in notifications {
        match n.to_json() {
            Ok(line) => lines.push(line),
            Err(e) => error!("HostBridge: failed to encode {n:?}: {e}"),
        }
    }
    for s in switches {
        lines.push(
            serde_json::json!({
                "cmd": "switchSubsystem",
                "param": { "target": s.target, "key": s.key },
            })
            .to_string(),
        );
    }
    lines
}

fn write_notifications(
    mut notifications: EventReader<HostNotificationEvent>,
    mut switches: EventReader<SubsystemSwitchRequest>,
) {
    use std::io::Write;

    let lines = notification_lines(
        notifications.read().map(|n| n.0.clone()),
        switches.read().cloned(),
    );
    if lines.is_empty() {
        return;
    }
    let mut stdout = std::io::stdout().lock();
    for line in lines {
        if writeln!(stdout, "{line}").is_err() {
            return;
        }
    }
    let _ = stdout.flush();
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_stdin_reader() -> StdinLines {
    use std::io::BufRead;

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    StdinLines(std::sync::Mutex::new(rx))
}

/// Parse one inbound line. Blank lines are `None`.
#[cfg(not(target_arch = "wasm32"))]
pub fn parse_command_line(line: &str) -> Option<Result<SubsystemCommand, serde_json::Error>> {
    let line = line.trim();
    (!line.is_empty()).then(|| SubsystemCommand::from_json_str(line))
}

#[cfg(not(target_arch = "wasm32"))]
fn read_stdin_commands(lines: Res<StdinLines>, mut commands: EventWriter<SubsystemCommand>) {
    let Ok(rx) = lines.0.lock() else {
        return;
    };
    for line in rx.try_iter() {
        match parse_command_line(&line) {
            Some(Ok(command)) => {
                commands.send(command);
            }
            Some(Err(e)) => warn!("HostBridge: ignoring malformed command: {e}"),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::state::app::StatesPlugin;
    use bevy::time::TimeUpdateStrategy;
    use scene::test_harness::{building_model, campus_manifest, ground_model};
    use scene::{AssetLoadReport, ScenePlugin};

    fn host_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(
                50,
            )))
            .insert_resource(campus_manifest())
            .add_plugins(ScenePlugin)
            .add_plugins(HostPlugin { stdio: false });
        app.update();
        app
    }

    fn report_campus(app: &mut App) {
        let world = app.world_mut();
        world.send_event(AssetLoadReport {
            name: "地面".into(),
            outcome: Ok(ground_model("地面")),
        });
        world.send_event(AssetLoadReport {
            name: "A1_Building".into(),
            outcome: Ok(building_model("A1_Building", Vec3::ZERO)),
        });
        world.send_event(AssetLoadReport {
            name: "corrupt".into(),
            outcome: Err(scene::model::AssetError::Malformed {
                name: "corrupt".into(),
                reason: "bad header".into(),
            }),
        });
    }

    fn phase(app: &App) -> SubsystemPhase {
        app.world().resource::<SceneSubsystem>().phase()
    }

    #[test]
    fn test_orchestrator_enters_after_loading() {
        let mut app = host_app();
        for _ in 0..5 {
            app.update();
        }
        assert_eq!(phase(&app), SubsystemPhase::Initializing);

        report_campus(&mut app);
        for _ in 0..10 {
            app.update();
        }
        assert_eq!(phase(&app), SubsystemPhase::Entered);
    }

    #[test]
    fn test_host_deactivate_stops_retries() {
        let mut app = host_app();
        report_campus(&mut app);
        for _ in 0..10 {
            app.update();
        }
        app.world_mut().send_event(SubsystemCommand::Deactivate);
        for _ in 0..20 {
            app.update();
        }
        assert_eq!(phase(&app), SubsystemPhase::Left);
        assert!(!app.world().resource::<HostOrchestrator>().wants_outdoor);
    }

    #[test]
    fn test_notification_lines_envelope() {
        let lines = notification_lines(
            [HostNotification::LoadingFinished],
            [SubsystemSwitchRequest {
                target: "indoorSubsystem".into(),
                key: "A1".into(),
            }],
        );
        assert_eq!(lines[0], r#"{"cmd":"onLoaded"}"#);
        let switch: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(switch["cmd"], "switchSubsystem");
        assert_eq!(switch["param"]["key"], "A1");
    }

    #[test]
    fn test_parse_command_line() {
        assert!(parse_command_line("   ").is_none());
        assert_eq!(
            parse_command_line(r#"{"cmd":"activate"}"#).unwrap().unwrap(),
            SubsystemCommand::Activate
        );
        assert!(parse_command_line("{not json").unwrap().is_err());
    }
}
