use crate::model;
use eframe::egui;

mod actions;
mod analyzer;
mod forms;
mod geometry;
mod highlight;
mod history;
mod persistence;
mod render;
mod settings;
mod update;

pub(crate) const MIN_ZOOM: f32 = 0.2;
pub(crate) const MAX_ZOOM: f32 = 3.0;
/// Wheel notch factors; pinch zoom uses egui's accumulated per-frame delta.
pub(crate) const WHEEL_ZOOM_OUT: f32 = 0.9;
pub(crate) const WHEEL_ZOOM_IN: f32 = 1.1;
/// Holding a card still this long flips the board into deletion mode.
pub(crate) const LONG_PRESS_SECS: f64 = 0.7;
/// Pointer travel past this cancels the long press and counts as a drag.
pub(crate) const DRAG_THRESHOLD: f32 = 5.0;
pub(crate) const SIDEBAR_MIN_WIDTH: f32 = 250.0;
pub(crate) const SIDEBAR_MAX_FRAC: f32 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionMode {
    /// Access gate shown until the user picks a role.
    Gate,
    /// Full editing rights.
    Architect,
    /// Read-only browsing; every mutation is a silent no-op.
    Observer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PanelView {
    Intel,
    Info,
    Edit,
    Settings,
}

/// The one pointer gesture in flight. Idle is `None`; deletion mode and group
/// assignment mode are board-wide flags, not gestures.
#[derive(Clone, Debug)]
enum Gesture {
    Panning,
    DraggingCard {
        id: String,
        grab_offset: egui::Vec2,
        press_screen: egui::Pos2,
        press_time: f64,
        moved: bool,
        /// Board as it was at press time; pushed as one history entry when
        /// the drag ends with actual movement.
        before: Box<model::BoardData>,
    },
    Linking {
        from_id: String,
        start_world: egui::Pos2,
    },
    ResizingSidebar,
}

#[derive(Clone, Copy, Debug)]
struct View {
    pan_screen: egui::Vec2,
    zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            pan_screen: egui::Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl View {
    fn world_to_screen(&self, origin: egui::Pos2, world: egui::Pos2) -> egui::Pos2 {
        origin + self.pan_screen + world.to_vec2() * self.zoom
    }

    fn screen_to_world(&self, origin: egui::Pos2, screen: egui::Pos2) -> egui::Pos2 {
        ((screen - origin - self.pan_screen) / self.zoom).to_pos2()
    }

    fn zoom_about_screen_point(
        &mut self,
        origin: egui::Pos2,
        screen_point: egui::Pos2,
        zoom_delta: f32,
    ) {
        let before = self.screen_to_world(origin, screen_point);
        self.zoom = (self.zoom * zoom_delta).clamp(MIN_ZOOM, MAX_ZOOM);
        let after_screen = self.world_to_screen(origin, before);
        self.pan_screen += screen_point - after_screen;
    }
}

pub struct NexusApp {
    board: model::BoardData,
    view: View,
    mode: SessionMode,
    key_input: String,
    auth_failed: bool,
    gesture: Option<Gesture>,
    deletion_mode: bool,
    group_assignment_mode: bool,
    active_group_id: Option<String>,
    focused_char_id: Option<String>,
    hovered_rel_id: Option<String>,
    sidebar_open: bool,
    panel: PanelView,
    form: Option<forms::EditForm>,
    history: history::History<model::BoardData>,
    intel_input: String,
    analysis: Option<analyzer::AnalysisJob>,
    status: Option<String>,
    settings: settings::AppSettings,
}

impl NexusApp {
    fn config_path() -> Option<String> {
        if let Some(home) = std::env::var_os("HOME") {
            let path = std::path::PathBuf::from(home)
                .join(".config")
                .join("nexus-board.toml");
            if path.exists() {
                return Some(path.display().to_string());
            }
        }
        if std::path::Path::new("settings.toml").exists() {
            return Some("settings.toml".to_string());
        }
        None
    }

    /// Desktop stand-in for the web build's `?s=` query parameter.
    fn startup_share_string() -> Option<String> {
        if let Some(arg) = std::env::args().nth(1) {
            return Some(arg);
        }
        std::env::var("NEXUS_SHARE").ok()
    }

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings_path = Self::config_path().unwrap_or_else(|| "settings.toml".to_string());
        let settings = settings::load_settings(&settings_path).unwrap_or_default();

        let share = Self::startup_share_string();
        let archive = persistence::load_archive();
        let (board, forced_read_only) = persistence::hydrate(
            share.as_deref(),
            archive.as_deref(),
            model::PRELOADED_BOARD_JSON,
        );
        let mode = if forced_read_only {
            SessionMode::Observer
        } else {
            SessionMode::Gate
        };

        Self {
            board,
            view: View::default(),
            mode,
            key_input: String::new(),
            auth_failed: false,
            gesture: None,
            deletion_mode: false,
            group_assignment_mode: false,
            active_group_id: None,
            focused_char_id: None,
            hovered_rel_id: None,
            sidebar_open: false,
            panel: PanelView::Intel,
            form: None,
            history: history::History::new(history::HISTORY_LIMIT),
            intel_input: String::new(),
            analysis: None,
            status: None,
            settings,
        }
    }
}
