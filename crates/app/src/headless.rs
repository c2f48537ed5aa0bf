//! Headless `--headless` mode: a blocking synchronous loop that reads JSON
//! subsystem commands from stdin and writes host notifications to stdout.
//!
//! No window or renderer is created. Models are "loaded" by checking that
//! their files exist under the asset root, which is enough to drive the
//! subsystem lifecycle end to end from an external host.
//!
//! ## Protocol
//!
//! Each line of stdin is a [`SubsystemCommand`] as JSON (`{"cmd": ...}`).
//! After every command the app runs a short burst of frames and writes each
//! resulting notification as one JSON line. Errors are written as
//! `{"cmd": "error", "param": <message>}`.

use std::path::PathBuf;

use bevy::prelude::*;

use scene::manifest::{AssetDescriptor, ManifestError, SceneManifest};
use scene::model::{AssetError, LoadedModel};
use scene::{AssetFetchRequest, AssetLoadReport, SceneSet};

/// Frames run after each command so queued work and short camera moves settle.
pub const FRAMES_PER_COMMAND: u32 = 8;

/// Directory the manifest's model paths are relative to.
#[derive(Resource, Debug, Clone)]
pub struct AssetRoot(pub PathBuf);

/// Resolve a descriptor against the asset root without parsing it.
pub fn inspect_model(root: &std::path::Path, descriptor: &AssetDescriptor) -> AssetLoadReport {
    let outcome = if root.join(&descriptor.path).is_file() {
        Ok(LoadedModel::new(descriptor.name.as_str()))
    } else {
        Err(AssetError::Missing {
            name: descriptor.name.clone(),
        })
    };
    AssetLoadReport {
        name: descriptor.name.clone(),
        outcome,
    }
}

fn inspect_fetches(
    root: Res<AssetRoot>,
    mut requests: EventReader<AssetFetchRequest>,
    mut reports: EventWriter<AssetLoadReport>,
) {
    for request in requests.read() {
        for descriptor in &request.descriptors {
            reports.send(inspect_model(&root.0, descriptor));
        }
    }
}

/// Notification lines published since the last drain.
#[derive(Resource, Default)]
struct Outbox(Vec<String>);

fn collect_notifications(
    mut outbox: ResMut<Outbox>,
    mut notifications: EventReader<scene::notifications::HostNotificationEvent>,
    mut switches: EventReader<scene::notifications::SubsystemSwitchRequest>,
) {
    outbox.0.extend(crate::host::notification_lines(
        notifications.read().map(|n| n.0.clone()),
        switches.read().cloned(),
    ));
}

/// Build the headless app: scene core, host orchestrator and file probing.
pub fn build_headless_app(
    manifest: Result<SceneManifest, ManifestError>,
    asset_root: PathBuf,
) -> App {
    use bevy::state::app::StatesPlugin;

    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(StatesPlugin);

    app.insert_resource(scene::controller::SceneSubsystem::new(manifest));
    app.add_plugins(scene::ScenePlugin);
    app.add_plugins(crate::host::HostPlugin { stdio: false });

    app.insert_resource(AssetRoot(asset_root))
        .init_resource::<Outbox>()
        .add_systems(Update, inspect_fetches.after(SceneSet::Publish))
        .add_systems(Update, collect_notifications.after(SceneSet::Publish));

    // Initial update so Startup systems execute and the batch is issued.
    app.update();
    app
}

fn drain(app: &mut App) -> Vec<String> {
    std::mem::take(&mut app.world_mut().resource_mut::<Outbox>().0)
}

fn error_line(message: String) -> String {
    serde_json::json!({ "cmd": "error", "param": message }).to_string()
}

pub fn run_headless(manifest: Result<SceneManifest, ManifestError>, asset_root: PathBuf) {
    use std::io::{BufRead, Write};

    use crate::host::parse_command_line;

    let mut app = build_headless_app(manifest, asset_root);
    for _ in 0..FRAMES_PER_COMMAND {
        app.update();
    }

    // -- I/O setup -----------------------------------------------------------
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    for line in drain(&mut app) {
        let _ = writeln!(stdout, "{line}");
    }
    let _ = stdout.flush();

    // Log to stderr so it does not interfere with the JSON protocol on stdout.
    eprintln!("campus headless mode ready, waiting for commands on stdin");

    // -- Main command loop ---------------------------------------------------
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("stdin read error: {e}");
                break;
            }
        };

        match parse_command_line(&line) {
            None => continue,
            Some(Err(e)) => {
                let _ = writeln!(stdout, "{}", error_line(format!("Parse error: {e}")));
            }
            Some(Ok(command)) => {
                app.world_mut().send_event(command);
                for _ in 0..FRAMES_PER_COMMAND {
                    app.update();
                }
                for out in drain(&mut app) {
                    let _ = writeln!(stdout, "{out}");
                }
            }
        }
        let _ = stdout.flush();
    }

    eprintln!("campus headless mode shutting down");
}
