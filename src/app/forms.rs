use crate::model;
use eframe::egui;

use super::{history, NexusApp, PanelView};

#[derive(Clone, Debug, PartialEq)]
pub(super) enum EditTarget {
    Character(model::Character),
    Relationship(model::Relationship),
}

impl EditTarget {
    fn id(&self) -> &str {
        match self {
            EditTarget::Character(c) => &c.id,
            EditTarget::Relationship(r) => &r.id,
        }
    }
}

/// Draft state of the detail editor. Keeps its own undo stack, separate from
/// the board's: text edits are flushed when a field loses focus, not per
/// keystroke, so one flush equals one undo step.
pub(super) struct EditForm {
    pub target: EditTarget,
    committed: EditTarget,
    history: history::History<EditTarget>,
}

impl EditForm {
    fn new(target: EditTarget) -> Self {
        Self {
            committed: target.clone(),
            target,
            history: history::History::new(history::HISTORY_LIMIT),
        }
    }

    /// Commits the draft if it drifted from the last committed state.
    /// Returns the state to apply to the board.
    fn flush(&mut self) -> Option<EditTarget> {
        if self.target == self.committed {
            return None;
        }
        self.history.record(self.committed.clone());
        self.committed = self.target.clone();
        Some(self.target.clone())
    }

    fn undo(&mut self) -> Option<EditTarget> {
        let previous = self.history.undo(self.committed.clone())?;
        self.committed = previous.clone();
        self.target = previous.clone();
        Some(previous)
    }

    fn redo(&mut self) -> Option<EditTarget> {
        let next = self.history.redo(self.committed.clone())?;
        self.committed = next.clone();
        self.target = next.clone();
        Some(next)
    }
}

impl NexusApp {
    /// `record` distinguishes a user opening the editor (one board-level undo
    /// step, so closing after edits can be undone wholesale) from the editor
    /// opening on a just-spawned card whose spawn already recorded.
    pub(super) fn open_character_editor(&mut self, id: &str, record: bool) {
        let Some(c) = self.board.character(id).cloned() else {
            return;
        };
        if record && self.can_edit() {
            self.history.record(self.board.clone());
        }
        self.form = Some(EditForm::new(EditTarget::Character(c)));
        self.panel = PanelView::Edit;
        self.sidebar_open = true;
    }

    pub(super) fn open_relationship_editor(&mut self, id: &str, record: bool) {
        let Some(r) = self.board.relationship(id).cloned() else {
            return;
        };
        if record && self.can_edit() {
            self.history.record(self.board.clone());
        }
        self.form = Some(EditForm::new(EditTarget::Relationship(r)));
        self.panel = PanelView::Edit;
        self.sidebar_open = true;
    }

    /// Writes a flushed form state back into the board, without board-level
    /// history (the open already recorded). Card position is whatever the
    /// board says; the form never moves cards.
    fn apply_form_target(&mut self, target: &EditTarget) {
        if !self.can_edit() {
            return;
        }
        match target {
            EditTarget::Character(c) => {
                if let Some(live) = self.board.character_mut(&c.id) {
                    let position = live.position;
                    *live = c.clone();
                    live.position = position;
                }
            }
            EditTarget::Relationship(r) => {
                if let Some(live) = self.board.relationship_mut(&r.id) {
                    *live = r.clone();
                }
            }
        }
    }

    pub(super) fn form_ui(&mut self, ui: &mut egui::Ui) {
        let Some(mut form) = self.form.take() else {
            return;
        };
        if match &form.target {
            EditTarget::Character(c) => self.board.character(&c.id).is_none(),
            EditTarget::Relationship(r) => self.board.relationship(&r.id).is_none(),
        } {
            self.panel = PanelView::Intel;
            return;
        }

        let editable = self.can_edit();
        let mut commit_now = false;
        let mut close = false;
        let mut delete = false;
        let mut gallery_additions: Vec<String> = Vec::new();

        ui.horizontal(|ui| {
            ui.heading(match &form.target {
                EditTarget::Character(_) => "ASSET DOSSIER",
                EditTarget::Relationship(_) => "LINK DOSSIER",
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("CLOSE").clicked() {
                    close = true;
                }
                if editable {
                    if ui
                        .add_enabled(form.history.can_redo(), egui::Button::new("REDO"))
                        .clicked()
                    {
                        if let Some(state) = form.redo() {
                            self.apply_form_target(&state);
                        }
                    }
                    if ui
                        .add_enabled(form.history.can_undo(), egui::Button::new("UNDO"))
                        .clicked()
                    {
                        if let Some(state) = form.undo() {
                            self.apply_form_target(&state);
                        }
                    }
                }
            });
        });
        ui.separator();

        match &mut form.target {
            EditTarget::Character(c) => {
                commit_now |= text_field(ui, editable, "NAME", &mut c.name);
                let mut name_en = c.name_en.clone().unwrap_or_default();
                ui.label("CODENAME");
                let response = ui.add_enabled(editable, egui::TextEdit::singleline(&mut name_en));
                if response.changed() {
                    c.name_en = if name_en.is_empty() {
                        None
                    } else {
                        Some(name_en)
                    };
                }
                if response.lost_focus() {
                    commit_now = true;
                }
                commit_now |= text_field(ui, editable, "ROLE", &mut c.role);
                commit_now |= text_field(ui, editable, "AFFILIATION", &mut c.affiliation);
                commit_now |= text_field(ui, editable, "IMAGE URL", &mut c.image_url);
                ui.label("DOSSIER");
                if ui
                    .add_enabled(editable, egui::TextEdit::multiline(&mut c.description))
                    .lost_focus()
                {
                    commit_now = true;
                }

                ui.separator();
                ui.label(format!("GALLERY ({})", c.gallery.len()));
                if editable && ui.button("ADD IMAGES").clicked() {
                    if let Some(paths) = rfd::FileDialog::new()
                        .add_filter("Images", &["png", "jpg", "jpeg", "webp"])
                        .pick_files()
                    {
                        gallery_additions = paths
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect();
                    }
                }
                if let Some(group_id) = &c.group_id {
                    if let Some(group) = model::group_by_id(group_id) {
                        ui.label(format!("GROUP: {}", group.name));
                    }
                }
                if editable && ui.button("DELETE ASSET").clicked() {
                    delete = true;
                }
            }
            EditTarget::Relationship(r) => {
                ui.label("LABEL");
                if ui
                    .add_enabled(editable, egui::TextEdit::singleline(&mut r.label))
                    .lost_focus()
                {
                    commit_now = true;
                }
                ui.label("DOSSIER");
                if ui
                    .add_enabled(editable, egui::TextEdit::multiline(&mut r.description))
                    .lost_focus()
                {
                    commit_now = true;
                }

                let types: Vec<(String, String)> = self
                    .board
                    .rel_types
                    .iter()
                    .map(|t| (t.id.clone(), t.label.clone()))
                    .collect();
                let current_label = types
                    .iter()
                    .find(|(id, _)| *id == r.type_id)
                    .map(|(_, label)| label.clone())
                    .unwrap_or_else(|| r.type_id.clone());
                ui.add_enabled_ui(editable, |ui| {
                    egui::ComboBox::from_id_salt("rel_type")
                        .selected_text(current_label)
                        .show_ui(ui, |ui| {
                            for (id, label) in &types {
                                if ui
                                    .selectable_label(r.type_id == *id, label)
                                    .clicked()
                                {
                                    r.type_id = id.clone();
                                    commit_now = true;
                                }
                            }
                        });
                });
                if ui
                    .add_enabled(
                        editable,
                        egui::Checkbox::new(&mut r.is_bi_directional, "BIDIRECTIONAL"),
                    )
                    .changed()
                {
                    commit_now = true;
                }
                if ui
                    .add_enabled(editable, egui::Checkbox::new(&mut r.is_dashed, "DASHED"))
                    .changed()
                {
                    commit_now = true;
                }
                if editable && ui.button("SEVER LINK").clicked() {
                    delete = true;
                }
            }
        }

        if commit_now {
            if let Some(state) = form.flush() {
                self.apply_form_target(&state);
            }
        }
        if let EditTarget::Character(c) = &form.target {
            let id = c.id.clone();
            if delete {
                self.delete_character(&id);
                return;
            }
            if !gallery_additions.is_empty() {
                self.add_gallery_images(&id, gallery_additions);
                if let Some(live) = self.board.character(&id).cloned() {
                    form.target = EditTarget::Character(live.clone());
                    form.committed = EditTarget::Character(live);
                }
            }
        } else if let EditTarget::Relationship(r) = &form.target {
            if delete {
                let id = r.id.clone();
                self.delete_relationship(&id);
                return;
            }
        }
        if close {
            if let Some(state) = form.flush() {
                self.apply_form_target(&state);
            }
            self.panel = PanelView::Intel;
            return;
        }
        self.form = Some(form);
    }
}

fn text_field(ui: &mut egui::Ui, editable: bool, label: &str, value: &mut String) -> bool {
    ui.label(label);
    ui.add_enabled(editable, egui::TextEdit::singleline(value))
        .lost_focus()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character_target(name: &str) -> EditTarget {
        EditTarget::Character(model::Character {
            id: "c1".to_string(),
            name: name.to_string(),
            name_en: None,
            role: String::new(),
            affiliation: String::new(),
            description: String::new(),
            image_url: String::new(),
            gallery: Vec::new(),
            position: model::Point::default(),
            group_id: None,
        })
    }

    #[test]
    fn flush_only_records_on_change() {
        let mut form = EditForm::new(character_target("A"));
        assert!(form.flush().is_none());
        assert!(!form.history.can_undo());

        form.target = character_target("B");
        let flushed = form.flush().unwrap();
        assert_eq!(flushed.id(), "c1");
        assert!(form.history.can_undo());
        // Unchanged again: nothing new recorded.
        assert!(form.flush().is_none());
    }

    #[test]
    fn form_undo_walks_committed_states() {
        let mut form = EditForm::new(character_target("A"));
        form.target = character_target("B");
        form.flush();
        form.target = character_target("C");
        form.flush();

        let back = form.undo().unwrap();
        assert_eq!(back, character_target("B"));
        let back = form.undo().unwrap();
        assert_eq!(back, character_target("A"));
        assert!(form.undo().is_none());

        let forward = form.redo().unwrap();
        assert_eq!(forward, character_target("B"));
    }

    #[test]
    fn undo_discards_unflushed_draft() {
        let mut form = EditForm::new(character_target("A"));
        form.target = character_target("B");
        form.flush();
        // Draft typed but never flushed.
        form.target = character_target("B-draft");
        let back = form.undo().unwrap();
        assert_eq!(back, character_target("A"));
        assert_eq!(form.target, character_target("A"));
    }
}
