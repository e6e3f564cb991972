use crate::model;
use eframe::egui;

use super::{analyzer, geometry, Gesture, NexusApp, PanelView, SessionMode};

impl NexusApp {
    pub(super) fn can_edit(&self) -> bool {
        self.mode == SessionMode::Architect
    }

    /// The only path for board mutations: refuses in read-only sessions,
    /// records the pre-mutation snapshot, then applies the closure. Returns
    /// whether the mutation ran.
    pub(super) fn commit<F: FnOnce(&mut model::BoardData)>(&mut self, f: F) -> bool {
        if !self.can_edit() {
            return false;
        }
        self.history.record(self.board.clone());
        f(&mut self.board);
        true
    }

    /// Pushes a pre-recorded snapshot, used by drags which record once at
    /// release instead of per pointer move.
    pub(super) fn commit_recorded(&mut self, before: model::BoardData) {
        if !self.can_edit() {
            return;
        }
        self.history.record(before);
    }

    pub(super) fn undo(&mut self) {
        if !self.can_edit() {
            return;
        }
        if let Some(previous) = self.history.undo(self.board.clone()) {
            self.board = previous;
            self.after_restore();
        }
    }

    pub(super) fn redo(&mut self) {
        if !self.can_edit() {
            return;
        }
        if let Some(next) = self.history.redo(self.board.clone()) {
            self.board = next;
            self.after_restore();
        }
    }

    /// Restored snapshots may no longer contain whatever the UI points at.
    fn after_restore(&mut self) {
        self.gesture = None;
        if let Some(id) = &self.focused_char_id {
            if self.board.character(id).is_none() {
                self.focused_char_id = None;
            }
        }
        if self.form.take().is_some() && self.panel == PanelView::Edit {
            self.panel = PanelView::Intel;
        }
    }

    pub(super) fn delete_character(&mut self, id: &str) {
        let owned = id.to_string();
        if self.commit(|board| board.remove_character(&owned)) {
            if self.focused_char_id.as_deref() == Some(id) {
                self.focused_char_id = None;
            }
        }
    }

    pub(super) fn delete_relationship(&mut self, id: &str) {
        let owned = id.to_string();
        if self.commit(|board| board.remove_relationship(&owned)) {
            if self.hovered_rel_id.as_deref() == Some(id) {
                self.hovered_rel_id = None;
            }
            self.form = None;
            if self.panel == PanelView::Edit {
                self.panel = PanelView::Intel;
            }
        }
    }

    /// Completes a link gesture released over `to_id`.
    pub(super) fn finish_link(&mut self, from_id: &str, to_id: &str) {
        let (from, to) = (from_id.to_string(), to_id.to_string());
        self.commit(|board| {
            board.create_link(&from, &to);
        });
    }

    /// Double-click on empty board: one history entry covers the spawn, then
    /// the editor opens on the fresh card without recording again.
    pub(super) fn spawn_character_and_edit(&mut self, world: egui::Pos2) {
        let mut spawned = None;
        self.commit(|board| {
            spawned = Some(board.spawn_character(world));
        });
        if let Some(id) = spawned {
            self.open_character_editor(&id, false);
        }
    }

    pub(super) fn toggle_group_membership(&mut self, char_id: &str) {
        let Some(group_id) = self.active_group_id.clone() else {
            return;
        };
        let char_id = char_id.to_string();
        self.commit(|board| {
            if let Some(c) = board.character_mut(&char_id) {
                if c.group_id.as_deref() == Some(group_id.as_str()) {
                    c.group_id = None;
                } else {
                    c.group_id = Some(group_id);
                }
            }
        });
    }

    /// Activating a group clears character focus; activating the already
    /// active group deactivates it. Outside assignment mode the view zooms to
    /// frame the members.
    pub(super) fn activate_group(&mut self, group_id: &str, viewport: egui::Vec2) {
        if self.active_group_id.as_deref() == Some(group_id) {
            self.active_group_id = None;
            return;
        }
        self.active_group_id = Some(group_id.to_string());
        self.focused_char_id = None;
        if !self.group_assignment_mode {
            self.focus_group(group_id, viewport);
        }
    }

    fn focus_group(&mut self, group_id: &str, viewport: egui::Vec2) {
        let rects: Vec<egui::Rect> = self
            .board
            .characters
            .iter()
            .filter(|c| c.group_id.as_deref() == Some(group_id))
            .map(geometry::card_rect)
            .collect();
        if let Some((zoom, pan)) = geometry::fit_bounds(&rects, viewport) {
            self.view.zoom = zoom;
            self.view.pan_screen = pan;
        }
    }

    pub(super) fn toggle_focus(&mut self, char_id: &str) {
        if self.focused_char_id.as_deref() == Some(char_id) {
            self.focused_char_id = None;
        } else {
            self.focused_char_id = Some(char_id.to_string());
        }
    }

    pub(super) fn auto_arrange(&mut self) {
        if self.commit(model::BoardData::auto_arrange) {
            self.status = Some("LAYOUT REBUILT".to_string());
        }
    }

    pub(super) fn add_gallery_images(&mut self, char_id: &str, urls: Vec<String>) {
        if urls.is_empty() {
            return;
        }
        let char_id = char_id.to_string();
        self.commit(|board| {
            if let Some(c) = board.character_mut(&char_id) {
                c.gallery.extend(urls);
            }
        });
    }

    /// Kicks off the configured analyzer with the current intel text plus a
    /// board export for context.
    pub(super) fn request_analysis(&mut self) {
        if !self.can_edit() || self.analysis.is_some() {
            return;
        }
        let Some(command) = self.settings.analyzer_command.clone() else {
            self.status = Some("NO ANALYZER CONFIGURED".to_string());
            return;
        };
        let board_json = serde_json::to_string(&self.board).unwrap_or_default();
        let prompt = format!("{}\n---\n{}", self.intel_input, board_json);
        self.analysis = Some(analyzer::spawn(
            Box::new(analyzer::CommandAnalyzer { command }),
            prompt,
        ));
        self.status = Some("ANALYZING".to_string());
    }

    pub(super) fn poll_analysis(&mut self, ctx: &egui::Context) {
        let Some(job) = &self.analysis else {
            return;
        };
        match job.poll() {
            analyzer::Poll::Pending => {
                ctx.request_repaint_after(std::time::Duration::from_millis(200));
            }
            analyzer::Poll::Done(Ok(suggestion)) => {
                self.analysis = None;
                let mut added = 0;
                self.commit(|board| {
                    added = analyzer::apply_suggestion(board, suggestion);
                });
                self.status = Some(format!("ANALYSIS MERGED: {added} ADDITIONS"));
            }
            analyzer::Poll::Done(Err(e)) => {
                self.analysis = None;
                log::warn!("intel analysis failed: {e}");
                self.status = Some("ANALYSIS FAILED".to_string());
            }
        }
    }

    /// Escape: abandon every transient state at once.
    pub(super) fn cancel_all(&mut self) {
        self.gesture = None;
        self.deletion_mode = false;
        self.group_assignment_mode = false;
        self.active_group_id = None;
        self.focused_char_id = None;
        self.hovered_rel_id = None;
        self.sidebar_open = false;
        self.form = None;
        self.panel = PanelView::Intel;
    }

    /// Pressing the canvas background drops focus and transient modes, then
    /// the caller starts a pan.
    pub(super) fn background_press(&mut self) {
        self.focused_char_id = None;
        self.deletion_mode = false;
        self.group_assignment_mode = false;
        self.sidebar_open = false;
        self.gesture = Some(Gesture::Panning);
    }
}
