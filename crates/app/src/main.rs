use std::path::PathBuf;

use bevy::prelude::*;
use bevy::window::PresentMode;
use bevy::winit::{UpdateMode, WinitSettings};
use clap::Parser;

use scene::controller::SceneSubsystem;
use scene::manifest::{ManifestError, SceneManifest};

#[cfg(not(target_arch = "wasm32"))]
mod headless;
mod host;

/// Directory models are served from; manifest model paths are relative to it.
const ASSET_ROOT: &str = "assets";

/// Manifest used when neither an argument nor `CAMPUS_MANIFEST` names one.
const DEFAULT_MANIFEST: &str = "assets/campus.json";

#[derive(Parser, Debug)]
#[command(name = "campus")]
#[command(about = "Interactive 3D campus scene", long_about = None)]
struct Cli {
    /// Scene manifest (JSON)
    #[arg(env = "CAMPUS_MANIFEST", default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,

    /// Run without a window, reading commands from stdin
    #[arg(long)]
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    headless: bool,

    /// Bridge notifications and commands over stdout/stdin
    #[arg(long)]
    stdio: bool,
}

#[cfg(not(target_arch = "wasm32"))]
fn load_manifest(path: &std::path::Path) -> Result<SceneManifest, ManifestError> {
    SceneManifest::from_path(path)
}

#[cfg(target_arch = "wasm32")]
fn load_manifest(_path: &std::path::Path) -> Result<SceneManifest, ManifestError> {
    // No filesystem on the web; the page host drives commands instead.
    Ok(SceneManifest::default())
}

fn main() {
    let options = Cli::parse();
    let manifest = load_manifest(&options.manifest);

    #[cfg(not(target_arch = "wasm32"))]
    if options.headless {
        headless::run_headless(manifest, PathBuf::from(ASSET_ROOT));
        return;
    }

    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Campus".to_string(),
                    resolution: (1280.0, 720.0).into(),
                    present_mode: PresentMode::AutoVsync,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: ASSET_ROOT.to_string(),
                ..default()
            }),
    )
    .insert_resource(WinitSettings {
        focused_mode: UpdateMode::Continuous,
        unfocused_mode: UpdateMode::reactive_low_power(std::time::Duration::from_millis(100)),
    })
    // Insert before ScenePlugin so the plugin keeps this instance.
    .insert_resource(SceneSubsystem::new(manifest))
    .add_plugins((
        scene::ScenePlugin,
        rendering::RenderingPlugin,
        host::HostPlugin {
            stdio: options.stdio,
        },
    ));

    app.run();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_and_manifest_path() {
        let cli = Cli::try_parse_from(["campus", "--headless", "campus/site.json", "--stdio"]).unwrap();
        assert!(cli.headless);
        assert!(cli.stdio);
        assert_eq!(cli.manifest, PathBuf::from("campus/site.json"));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["campus", "--fullscreen"]).is_err());
    }

    #[test]
    fn test_windowed_by_default() {
        let cli = Cli::try_parse_from(["campus"]).unwrap();
        assert!(!cli.headless);
        assert!(!cli.stdio);
    }
}
