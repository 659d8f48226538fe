//! View state handed to the render step.
//!
//! Selected source, theme and auto-rotation are modeled as immutable
//! snapshots: every change produces a new `ViewState`, and the render
//! step is a pure function of one snapshot. No global state.

use glam::Vec3;

/// Yaw advance per rendered frame while auto-rotation is on, radians.
pub const ROTATION_STEP: f32 = 0.002;

pub const DEFAULT_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, 20.0);
pub const DEFAULT_CAMERA_FOV_DEGREES: f32 = 50.0;

pub const AMBIENT_LIGHT_INTENSITY: f32 = 0.5;
pub const POINT_LIGHT_POSITION: Vec3 = Vec3::new(10.0, 10.0, 10.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn background(self) -> [f32; 3] {
        match self {
            Theme::Dark => [0.2, 0.2, 0.2],
            Theme::Light => [1.0, 1.0, 1.0],
        }
    }

    pub fn foreground(self) -> [f32; 3] {
        match self {
            Theme::Dark => [1.0, 1.0, 1.0],
            Theme::Light => [0.2, 0.2, 0.2],
        }
    }

    /// The point light follows the foreground color so the model stays
    /// readable against either background.
    pub fn light_color(self) -> [f32; 3] {
        self.foreground()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub theme: Theme,
    pub auto_rotate: bool,
    pub yaw: f32,
    pub source: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            auto_rotate: true,
            yaw: 0.0,
            source: None,
        }
    }
}

impl ViewState {
    pub fn with_theme_toggled(&self) -> Self {
        Self {
            theme: self.theme.toggled(),
            ..self.clone()
        }
    }

    pub fn with_auto_rotate(&self, auto_rotate: bool) -> Self {
        Self {
            auto_rotate,
            ..self.clone()
        }
    }

    pub fn with_source(&self, source: Option<String>) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    /// One frame forward: the model spins only while auto-rotation is
    /// enabled.
    pub fn advanced(&self) -> Self {
        let yaw = if self.auto_rotate {
            self.yaw + ROTATION_STEP
        } else {
            self.yaw
        };
        Self {
            yaw,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Theme, ViewState, ROTATION_STEP};

    #[test]
    fn defaults_match_initial_view() {
        let state = ViewState::default();
        assert_eq!(state.theme, Theme::Dark);
        assert!(state.auto_rotate);
        assert_eq!(state.yaw, 0.0);
    }

    #[test]
    fn theme_toggle_round_trips() {
        let state = ViewState::default();
        let toggled = state.with_theme_toggled();
        assert_eq!(toggled.theme, Theme::Light);
        assert_eq!(toggled.with_theme_toggled().theme, state.theme);
        // Snapshot semantics: the original is untouched
        assert_eq!(state.theme, Theme::Dark);
    }

    #[test]
    fn rotation_only_advances_while_enabled() {
        let spinning = ViewState::default().advanced().advanced();
        assert!((spinning.yaw - 2.0 * ROTATION_STEP).abs() < 1e-9);

        let paused = spinning.with_auto_rotate(false).advanced();
        assert!((paused.yaw - spinning.yaw).abs() < 1e-9);
    }

    #[test]
    fn themes_disagree_on_background() {
        assert_ne!(Theme::Dark.background(), Theme::Light.background());
        assert_eq!(Theme::Dark.light_color(), Theme::Light.background());
    }
}
