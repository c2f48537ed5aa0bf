//! Scene collaborators.
//!
//! Secondary scene features (clip playback, the on-screen hint, weather
//! bounds) plug into the controller through [`SceneCollaborator`]. The
//! controller walks its [`Collaborators`] list on every lifecycle edge and
//! frame, so adding a feature never touches the state machine.

use std::any::Any;
use std::time::Duration;

use bevy::prelude::*;

use crate::config::{SCENE_HINT, WEATHER_HEADROOM, WEATHER_PADDING};
use crate::manifest::AssetClass;
use crate::model::{Bounds, LoadedModel};

pub trait SceneCollaborator: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// A classified asset finished loading.
    fn on_asset(&mut self, _model: &LoadedModel, _class: &AssetClass) {}

    fn on_enter(&mut self) {}

    fn on_leave(&mut self) {}

    fn update(&mut self, _dt: Duration) {}

    fn as_any(&self) -> &dyn Any;
}

#[derive(Default)]
pub struct Collaborators {
    list: Vec<Box<dyn SceneCollaborator>>,
}

impl Collaborators {
    /// The built-in set.
    pub fn standard() -> Self {
        let mut collaborators = Self::default();
        collaborators.register(AnimationCollaborator::default());
        collaborators.register(SceneHintCollaborator::default());
        collaborators.register(WeatherBoundsCollaborator::default());
        collaborators
    }

    pub fn register(&mut self, collaborator: impl SceneCollaborator) {
        if self.list.iter().any(|c| c.name() == collaborator.name()) {
            warn!(
                "Collaborators: '{}' already registered, ignoring",
                collaborator.name()
            );
            return;
        }
        self.list.push(Box::new(collaborator));
    }

    pub fn get<T: SceneCollaborator>(&self) -> Option<&T> {
        self.list.iter().find_map(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.list.iter().map(|c| c.name()).collect()
    }

    pub fn asset_loaded(&mut self, model: &LoadedModel, class: &AssetClass) {
        for c in &mut self.list {
            c.on_asset(model, class);
        }
    }

    pub fn enter(&mut self) {
        for c in &mut self.list {
            c.on_enter();
        }
    }

    pub fn leave(&mut self) {
        for c in &mut self.list {
            c.on_leave();
        }
    }

    pub fn update(&mut self, dt: Duration) {
        for c in &mut self.list {
            c.update(dt);
        }
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// =============================================================================
// Built-ins
// =============================================================================

/// One looping clip: the first clip of an animated asset.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopingClip {
    pub asset: String,
    pub clip: String,
    pub elapsed: Duration,
}

/// Loops the first clip of every animated asset while the scene is entered.
#[derive(Debug, Default)]
pub struct AnimationCollaborator {
    clips: Vec<LoopingClip>,
    playing: bool,
}

impl AnimationCollaborator {
    pub fn clips(&self) -> &[LoopingClip] {
        &self.clips
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

impl SceneCollaborator for AnimationCollaborator {
    fn name(&self) -> &'static str {
        "animation"
    }

    fn on_asset(&mut self, model: &LoadedModel, _class: &AssetClass) {
        let Some(first) = model.animations.first() else {
            return;
        };
        if self.clips.iter().any(|c| c.asset == model.name) {
            return;
        }
        self.clips.push(LoopingClip {
            asset: model.name.clone(),
            clip: first.clone(),
            elapsed: Duration::ZERO,
        });
    }

    fn on_enter(&mut self) {
        self.playing = true;
    }

    fn on_leave(&mut self) {
        self.playing = false;
    }

    fn update(&mut self, dt: Duration) {
        if !self.playing {
            return;
        }
        for clip in &mut self.clips {
            clip.elapsed += dt;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hint telling the user how to get the default view back.
#[derive(Debug, Default)]
pub struct SceneHintCollaborator {
    visible: bool,
}

impl SceneHintCollaborator {
    pub fn text(&self) -> Option<&'static str> {
        self.visible.then_some(SCENE_HINT)
    }
}

impl SceneCollaborator for SceneHintCollaborator {
    fn name(&self) -> &'static str {
        "scene_hint"
    }

    fn on_enter(&mut self) {
        self.visible = true;
    }

    fn on_leave(&mut self) {
        self.visible = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Region the weather effects cover: the ground bounds with some padding.
#[derive(Debug, Default)]
pub struct WeatherBoundsCollaborator {
    bounds: Option<Bounds>,
    active: bool,
}

impl WeatherBoundsCollaborator {
    /// Bounds to draw weather in, only while the scene is entered.
    pub fn active_bounds(&self) -> Option<Bounds> {
        self.bounds.filter(|_| self.active)
    }
}

impl SceneCollaborator for WeatherBoundsCollaborator {
    fn name(&self) -> &'static str {
        "weather_bounds"
    }

    fn on_asset(&mut self, model: &LoadedModel, class: &AssetClass) {
        if *class == AssetClass::Ground {
            self.bounds = model
                .bounds
                .map(|b| b.padded(WEATHER_PADDING, WEATHER_HEADROOM));
        }
    }

    fn on_enter(&mut self) {
        self.active = true;
    }

    fn on_leave(&mut self) {
        self.active = false;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// Tooltip
// =============================================================================

/// Floating text over the hovered building. Transient: created lazily on
/// enter and dropped on leave.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tooltip {
    pub text: String,
    pub anchor: Vec3,
    pub visible: bool,
}

impl Tooltip {
    pub fn show(&mut self, text: impl Into<String>, anchor: Vec3) {
        self.text = text.into();
        self.anchor = anchor;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animated(name: &str) -> LoadedModel {
        LoadedModel::new(name).with_animations(vec!["spin".into(), "idle".into()])
    }

    #[test]
    fn test_standard_set_has_builtins() {
        let c = Collaborators::standard();
        assert_eq!(c.names(), vec!["animation", "scene_hint", "weather_bounds"]);
        assert!(c.get::<SceneHintCollaborator>().is_some());
    }

    #[test]
    fn test_duplicate_registration_ignored() {
        let mut c = Collaborators::standard();
        c.register(SceneHintCollaborator::default());
        assert_eq!(c.names().len(), 3);
    }

    #[test]
    fn test_animation_loops_first_clip_only_while_entered() {
        let mut c = Collaborators::standard();
        c.asset_loaded(&animated("fountain"), &AssetClass::Decoration);
        c.update(Duration::from_secs(1));
        let anim = c.get::<AnimationCollaborator>().unwrap();
        assert_eq!(anim.clips()[0].clip, "spin");
        assert_eq!(anim.clips()[0].elapsed, Duration::ZERO);

        c.enter();
        c.update(Duration::from_secs(2));
        assert_eq!(
            c.get::<AnimationCollaborator>().unwrap().clips()[0].elapsed,
            Duration::from_secs(2)
        );
        c.leave();
        assert!(!c.get::<AnimationCollaborator>().unwrap().is_playing());
    }

    #[test]
    fn test_hint_follows_enter_and_leave() {
        let mut c = Collaborators::standard();
        assert!(c.get::<SceneHintCollaborator>().unwrap().text().is_none());
        c.enter();
        assert_eq!(c.get::<SceneHintCollaborator>().unwrap().text(), Some(SCENE_HINT));
        c.leave();
        assert!(c.get::<SceneHintCollaborator>().unwrap().text().is_none());
    }

    #[test]
    fn test_weather_bounds_from_ground() {
        let mut c = Collaborators::standard();
        let ground = LoadedModel::new("ground")
            .with_bounds(Bounds::new(Vec3::new(-10.0, -2.0, -10.0), Vec3::new(10.0, 0.0, 10.0)));
        c.asset_loaded(&ground, &AssetClass::Ground);
        assert!(c.get::<WeatherBoundsCollaborator>().unwrap().active_bounds().is_none());
        c.enter();
        let bounds = c.get::<WeatherBoundsCollaborator>().unwrap().active_bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-110.0, -2.0, -110.0));
        assert_eq!(bounds.max, Vec3::new(110.0, 500.0, 110.0));
    }
}
