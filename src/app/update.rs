use crate::model;
use eframe::egui;

use super::{
    DRAG_THRESHOLD, Gesture, LONG_PRESS_SECS, NexusApp, PanelView, SIDEBAR_MAX_FRAC,
    SIDEBAR_MIN_WIDTH, SessionMode, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT, geometry, highlight, render,
};

const ACCENT: egui::Color32 = egui::Color32::from_rgb(250, 204, 21);
const DANGER: egui::Color32 = egui::Color32::from_rgb(220, 38, 38);

enum CardAct {
    Focus(String),
    Edit(String),
    Delete(String),
    ToggleGroup(String),
    StartDrag {
        id: String,
        grab_offset: egui::Vec2,
        press_screen: egui::Pos2,
    },
    StartLink {
        id: String,
        start_world: egui::Pos2,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragKind {
    Pan,
    Move,
    Ignore,
}

fn pressed_drag_button(response: &egui::Response) -> Option<egui::PointerButton> {
    [
        egui::PointerButton::Primary,
        egui::PointerButton::Middle,
        egui::PointerButton::Secondary,
    ]
    .into_iter()
    .find(|b| response.drag_started_by(*b))
}

/// Middle drags pan no matter what they land on; only primary drags move the
/// card under the pointer.
fn card_drag_kind(button: egui::PointerButton, can_edit: bool, deletion_mode: bool) -> DragKind {
    match button {
        egui::PointerButton::Middle => DragKind::Pan,
        egui::PointerButton::Primary if can_edit && !deletion_mode => DragKind::Move,
        _ => DragKind::Ignore,
    }
}

/// One notch is roughly this many scroll points.
const WHEEL_NOTCH_POINTS: f32 = 50.0;

/// Stacks one zoom step per wheel notch accumulated this frame; sub-notch
/// trackpad scrolls still count as one.
fn wheel_zoom_factor(raw_scroll: f32) -> f32 {
    let notches = (raw_scroll.abs() / WHEEL_NOTCH_POINTS).round().max(1.0) as i32;
    let base = if raw_scroll > 0.0 {
        WHEEL_ZOOM_IN
    } else {
        WHEEL_ZOOM_OUT
    };
    base.powi(notches)
}

impl eframe::App for NexusApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.mode == SessionMode::Gate {
            self.gate_ui(ctx);
            return;
        }
        self.poll_analysis(ctx);

        let wants_keyboard = ctx.wants_keyboard_input();
        let mut escape = false;
        ctx.input_mut(|i| {
            // Escape is the global cancel and works even mid-edit.
            escape = i.consume_key(egui::Modifiers::NONE, egui::Key::Escape);
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                self.export_dialog();
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::O) {
                self.import_dialog();
            }
            if !wants_keyboard {
                if i.consume_key(
                    egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
                    egui::Key::Z,
                ) || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y)
                {
                    self.redo();
                } else if i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z) {
                    self.undo();
                }
            }
        });
        if escape {
            self.cancel_all();
        }

        self.top_bar(ctx);
        self.group_rail(ctx);
        if self.sidebar_open {
            self.sidebar(ctx);
        }
        self.status_bar(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.canvas_ui(ui);
            });
    }
}

impl NexusApp {
    fn gate_ui(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(140.0);
                ui.label(
                    egui::RichText::new(format!(
                        "{} {}",
                        self.board.title_white, self.board.title_yellow
                    ))
                    .size(42.0)
                    .strong(),
                );
                ui.label("ACCESS PROTOCOL");
                ui.add_space(24.0);

                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.key_input)
                        .password(true)
                        .hint_text("ACCESS KEY"),
                );
                let submitted =
                    response.lost_focus() && ctx.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("INITIALIZE").clicked() || submitted {
                    if self.key_input == self.settings.access_key {
                        self.mode = SessionMode::Architect;
                        self.auth_failed = false;
                    } else {
                        self.auth_failed = true;
                    }
                }
                if self.auth_failed {
                    ui.colored_label(DANGER, "ACCESS DENIED");
                }
                ui.add_space(12.0);
                if ui.button("ENTER AS OBSERVER").clicked() {
                    self.mode = SessionMode::Observer;
                }
                if ui.button("LOAD EXTERNAL INTEL").clicked() {
                    self.startup_import_dialog();
                }
            });
        });
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.can_edit() {
                    if ui
                        .add_enabled(self.history.can_undo(), egui::Button::new("UNDO"))
                        .clicked()
                    {
                        self.undo();
                    }
                    if ui
                        .add_enabled(self.history.can_redo(), egui::Button::new("REDO"))
                        .clicked()
                    {
                        self.redo();
                    }
                    ui.separator();
                    if ui.button("ARRANGE").clicked() {
                        self.auto_arrange();
                    }
                    if ui.button("IMPORT").clicked() {
                        self.import_dialog();
                    }
                }
                if ui.button("SAVE").clicked() {
                    self.export_dialog();
                }
                if ui.button("SHARE").clicked() {
                    self.copy_share_link(ctx);
                }
                ui.separator();
                let bw = self.board.is_global_black_and_white;
                if ui.selectable_label(bw, "B&W").clicked() {
                    self.commit(|board| board.is_global_black_and_white = !bw);
                }
                if ui.selectable_label(self.sidebar_open, "PANEL").clicked() {
                    self.sidebar_open = !self.sidebar_open;
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.mode == SessionMode::Observer {
                        ui.colored_label(ACCENT, "OBSERVER");
                    }
                    if self.deletion_mode {
                        ui.colored_label(DANGER, "DELETION MODE, ESC TO EXIT");
                    }
                    if self.group_assignment_mode {
                        ui.colored_label(ACCENT, "TAGGING MODE");
                    }
                });
            });
        });
    }

    fn group_rail(&mut self, ctx: &egui::Context) {
        let viewport = ctx.screen_rect().size();
        egui::SidePanel::right("group_rail")
            .exact_width(64.0)
            .resizable(false)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    for group in model::GROUPS {
                        let active = self.active_group_id.as_deref() == Some(group.id);
                        let color = model::color_from_hex(group.color);
                        let text = if active {
                            egui::RichText::new(group.label)
                                .color(egui::Color32::BLACK)
                                .strong()
                        } else {
                            egui::RichText::new(group.label).color(color)
                        };
                        let fill = if active {
                            color
                        } else {
                            egui::Color32::TRANSPARENT
                        };
                        let response = ui
                            .add_sized([44.0, 32.0], egui::Button::new(text).fill(fill))
                            .on_hover_text(group.name);
                        if response.clicked() {
                            self.activate_group(group.id, viewport);
                        }
                    }
                    ui.add_space(8.0);
                    ui.separator();
                    if self.can_edit()
                        && ui
                            .selectable_label(self.group_assignment_mode, "TAG")
                            .on_hover_text("Assign cards to the active group")
                            .clicked()
                    {
                        self.group_assignment_mode = !self.group_assignment_mode;
                    }
                });
            });
    }

    fn sidebar(&mut self, ctx: &egui::Context) {
        let screen_w = ctx.screen_rect().width();
        let width = self
            .board
            .sidebar_width
            .clamp(SIDEBAR_MIN_WIDTH, (screen_w * SIDEBAR_MAX_FRAC).max(SIDEBAR_MIN_WIDTH));
        egui::SidePanel::left("sidebar")
            .exact_width(width)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui
                        .selectable_label(self.panel == PanelView::Intel, "INTEL")
                        .clicked()
                    {
                        self.panel = PanelView::Intel;
                    }
                    if ui
                        .selectable_label(self.panel == PanelView::Info, "INFO")
                        .clicked()
                    {
                        self.panel = PanelView::Info;
                    }
                    if self.form.is_some()
                        && ui
                            .selectable_label(self.panel == PanelView::Edit, "EDIT")
                            .clicked()
                    {
                        self.panel = PanelView::Edit;
                    }
                    if ui
                        .selectable_label(self.panel == PanelView::Settings, "CONFIG")
                        .clicked()
                        && self.panel != PanelView::Settings
                    {
                        // One undo step covers everything tweaked in the
                        // settings view until it is next opened.
                        if self.can_edit() {
                            self.history.record(self.board.clone());
                        }
                        self.panel = PanelView::Settings;
                    }
                });
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| match self.panel {
                    PanelView::Intel => self.intel_ui(ui),
                    PanelView::Info => self.info_ui(ui),
                    PanelView::Edit => self.form_ui(ui),
                    PanelView::Settings => self.settings_ui(ui),
                });

                let panel_rect = ui.max_rect();
                let handle = egui::Rect::from_min_max(
                    egui::pos2(panel_rect.right() - 4.0, panel_rect.top()),
                    egui::pos2(panel_rect.right() + 4.0, panel_rect.bottom()),
                );
                let response =
                    ui.interact(handle, ui.id().with("sidebar_resize"), egui::Sense::drag());
                if response.hovered() || response.dragged() {
                    ctx.set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
                }
                if response.drag_started() && self.can_edit() && self.gesture.is_none() {
                    self.gesture = Some(Gesture::ResizingSidebar);
                }
            });
    }

    fn intel_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("INTEL DROP");
        ui.label("Paste raw intel; the analyzer proposes assets and links.");
        ui.add(
            egui::TextEdit::multiline(&mut self.intel_input)
                .desired_rows(8)
                .hint_text("Field notes, transcripts, rumors..."),
        );
        let busy = self.analysis.is_some();
        let can_run = self.can_edit() && !busy && !self.intel_input.trim().is_empty();
        let label = if busy { "ANALYZING..." } else { "ANALYZE" };
        if ui
            .add_enabled(can_run, egui::Button::new(label))
            .clicked()
        {
            self.request_analysis();
        }
        if !self.can_edit() {
            ui.colored_label(ACCENT, "Observer sessions cannot run analysis.");
        }
    }

    fn info_ui(&mut self, ui: &mut egui::Ui) {
        let Some(c) = self
            .focused_char_id
            .as_deref()
            .and_then(|id| self.board.character(id))
        else {
            ui.label("Click a card to read its dossier.");
            return;
        };
        ui.heading(&c.name);
        if let Some(name_en) = c.name_en.as_deref().filter(|s| !s.is_empty()) {
            ui.colored_label(ACCENT, name_en);
        }
        ui.label(format!("ROLE: {}", c.role));
        ui.label(format!("AFFILIATION: {}", c.affiliation));
        if let Some(group) = c.group_id.as_deref().and_then(model::group_by_id) {
            ui.colored_label(model::color_from_hex(group.color), group.name);
        }
        ui.separator();
        ui.label(&c.description);
        if !c.gallery.is_empty() {
            ui.separator();
            ui.label(format!("GALLERY: {} items", c.gallery.len()));
        }
        let id = c.id.clone();
        if self.can_edit() && ui.button("OPEN DOSSIER EDITOR").clicked() {
            self.open_character_editor(&id, true);
        }
    }

    fn settings_ui(&mut self, ui: &mut egui::Ui) {
        let editable = self.can_edit();
        ui.heading("BOARD CONFIG");
        ui.label("TITLE");
        ui.horizontal(|ui| {
            ui.add_enabled(
                editable,
                egui::TextEdit::singleline(&mut self.board.title_white).desired_width(100.0),
            );
            ui.add_enabled(
                editable,
                egui::TextEdit::singleline(&mut self.board.title_yellow).desired_width(100.0),
            );
        });

        ui.label("BACKDROP");
        let backdrop = self.board.background_style.clone();
        egui::ComboBox::from_id_salt("backdrop")
            .selected_text(&backdrop)
            .show_ui(ui, |ui| {
                for style in ["default", "blueprint", "noir"] {
                    if ui.selectable_label(backdrop == style, style).clicked() && editable {
                        self.board.background_style = style.to_string();
                    }
                }
            });

        ui.separator();
        ui.heading("LINK TYPES");
        let mut remove: Option<String> = None;
        for i in 0..self.board.rel_types.len() {
            ui.horizontal(|ui| {
                let t = &mut self.board.rel_types[i];
                ui.add_enabled(
                    editable,
                    egui::TextEdit::singleline(&mut t.label).desired_width(100.0),
                );
                ui.add_enabled(
                    editable,
                    egui::TextEdit::singleline(&mut t.color).desired_width(70.0),
                );
                let swatch = model::color_from_hex(&t.color);
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(16.0, 16.0), egui::Sense::hover());
                ui.painter().rect_filled(rect, 2.0, swatch);
                if editable && ui.button("✕").clicked() {
                    remove = Some(t.id.clone());
                }
            });
        }
        if let Some(id) = remove {
            // Links keeping the dangling typeId are fine; they render white.
            self.board.rel_types.retain(|t| t.id != id);
        }
        if editable && ui.button("ADD TYPE").clicked() {
            self.board.rel_types.push(model::RelationshipTypeConfig {
                id: format!("t-{}", uuid::Uuid::now_v7()),
                label: "NEW TYPE".to_string(),
                color: "#ffffff".to_string(),
            });
        }
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(status) = &self.status {
                    ui.label(status);
                } else {
                    ui.label("Ready");
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Zoom: {:.0}%", self.view.zoom * 100.0));
                    ui.separator();
                    ui.label(format!("Assets: {}", self.board.characters.len()));
                    ui.separator();
                    ui.label(format!("Links: {}", self.board.relationships.len()));
                });
            });
        });
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let origin = rect.min;

        // Pinch reports an accumulated per-frame factor; the wheel falls back
        // to fixed notches. Both anchor on the pointer.
        let (raw_scroll, pinch) = ctx.input(|i| (i.raw_scroll_delta.y, i.zoom_delta()));
        if let Some(hover_pos) = ctx.input(|i| i.pointer.hover_pos()) {
            if rect.contains(hover_pos) {
                if (pinch - 1.0).abs() > 1e-3 {
                    self.view.zoom_about_screen_point(origin, hover_pos, pinch);
                } else if raw_scroll.abs() > 0.0 {
                    self.view
                        .zoom_about_screen_point(origin, hover_pos, wheel_zoom_factor(raw_scroll));
                }
            }
        }

        let pointer_pos = ctx.input(|i| i.pointer.interact_pos());
        let pointer_world = pointer_pos.map(|p| self.view.screen_to_world(origin, p));

        let painter = ui.painter_at(rect);
        render::draw_background(&painter, rect, &self.board.background_style);
        render::draw_titles(&painter, rect, &self.board);

        let hl = highlight::resolve(
            self.active_group_id.as_deref(),
            self.focused_char_id.as_deref(),
            &self.board.characters,
            &self.board.relationships,
        );
        let mono = self.board.is_global_black_and_white;
        let zoom = self.view.zoom;

        // Edges first so cards sit above lines. Dashed ones go to the back of
        // the draw order, the hovered one to the front.
        let rels = self.board.relationships.clone();
        let mut order: Vec<usize> = (0..rels.len()).collect();
        order.sort_by_key(|&i| {
            let r = &rels[i];
            let hovered = self.hovered_rel_id.as_deref() == Some(r.id.as_str());
            (!r.is_dashed as u8, hovered as u8)
        });
        let mut hovered_edge: Option<String> = None;
        let mut clicked_edge: Option<String> = None;
        for i in order {
            let r = &rels[i];
            let (Some(from), Some(to)) = (
                self.board.character(&r.from_id),
                self.board.character(&r.to_id),
            ) else {
                continue;
            };
            let (a, b) =
                geometry::nearest_anchor_pair(geometry::card_rect(from), geometry::card_rect(to));
            let (index, total) = highlight::parallel_rank(&rels, r);
            let world = geometry::edge_curve(a, b, index, total);
            let curve = geometry::EdgeCurve {
                p1: self.view.world_to_screen(origin, world.p1),
                p2: self.view.world_to_screen(origin, world.p2),
                control: self.view.world_to_screen(origin, world.control),
            };
            let dimmed = hl.rel_dimmed(&r.id);
            let pill = render::draw_edge(
                &painter,
                &render::EdgeVisual {
                    curve,
                    color: self
                        .board
                        .rel_type(&r.type_id)
                        .map(|t| model::color_from_hex(&t.color))
                        .unwrap_or(egui::Color32::WHITE),
                    label: &r.label,
                    dashed: r.is_dashed,
                    bidirectional: r.is_bi_directional,
                    hovered: self.hovered_rel_id.as_deref() == Some(r.id.as_str()),
                    dimmed,
                    monochrome: mono,
                    zoom,
                },
            );
            // Dimmed edges are display-only.
            if dimmed {
                continue;
            }
            let edge_response =
                ui.interact(pill, ui.id().with(("edge", &r.id)), egui::Sense::click());
            if edge_response.hovered() {
                hovered_edge = Some(r.id.clone());
            }
            if edge_response.clicked() && self.can_edit() {
                clicked_edge = Some(r.id.clone());
            }
            if !r.description.is_empty() {
                edge_response.on_hover_text(&r.description);
            }
        }
        self.hovered_rel_id = hovered_edge;

        // Cards, with their sub-targets layered above the background response
        // so presses route to the topmost widget.
        let chars = self.board.characters.clone();
        let mut acts: Vec<CardAct> = Vec::new();
        for c in &chars {
            let world_rect = geometry::card_rect(c);
            let screen_rect = egui::Rect::from_min_max(
                self.view.world_to_screen(origin, world_rect.min),
                self.view.world_to_screen(origin, world_rect.max),
            );
            if !screen_rect.intersects(rect) {
                continue;
            }
            let dimmed = hl.char_dimmed(&c.id);
            let focused = self.focused_char_id.as_deref() == Some(c.id.as_str());
            render::draw_card(
                &painter,
                &render::CardVisual {
                    character: c,
                    rect: screen_rect,
                    zoom,
                    focused,
                    dimmed,
                    monochrome: mono,
                    deletion_mode: self.deletion_mode && self.can_edit(),
                },
            );

            let card_response = ui.interact(
                screen_rect,
                ui.id().with(("card", &c.id)),
                egui::Sense::click_and_drag(),
            );
            if card_response.double_clicked()
                && self.can_edit()
                && !self.deletion_mode
                && !self.group_assignment_mode
            {
                acts.push(CardAct::Edit(c.id.clone()));
            } else if card_response.clicked() {
                if self.group_assignment_mode {
                    acts.push(CardAct::ToggleGroup(c.id.clone()));
                } else if !self.deletion_mode {
                    acts.push(CardAct::Focus(c.id.clone()));
                }
            }
            if self.gesture.is_none() {
                if let Some(button) = pressed_drag_button(&card_response) {
                    match card_drag_kind(button, self.can_edit(), self.deletion_mode) {
                        DragKind::Pan => self.gesture = Some(Gesture::Panning),
                        DragKind::Move => {
                            if let (Some(press), Some(world)) = (pointer_pos, pointer_world) {
                                acts.push(CardAct::StartDrag {
                                    id: c.id.clone(),
                                    grab_offset: world - c.position.to_pos2(),
                                    press_screen: press,
                                });
                            }
                        }
                        DragKind::Ignore => {}
                    }
                }
            }

            if self.can_edit() {
                render::draw_link_handle(&painter, screen_rect, zoom);
                let handle_response = ui.interact(
                    render::link_handle_rect(screen_rect, zoom),
                    ui.id().with(("link", &c.id)),
                    egui::Sense::click_and_drag(),
                );
                if self.gesture.is_none() {
                    match pressed_drag_button(&handle_response) {
                        Some(egui::PointerButton::Middle) => {
                            self.gesture = Some(Gesture::Panning);
                        }
                        Some(egui::PointerButton::Primary) => {
                            acts.push(CardAct::StartLink {
                                id: c.id.clone(),
                                start_world: egui::pos2(world_rect.right(), world_rect.center().y),
                            });
                        }
                        _ => {}
                    }
                }
                if self.deletion_mode {
                    let delete_response = ui.interact(
                        render::delete_button_rect(screen_rect, zoom),
                        ui.id().with(("delete", &c.id)),
                        egui::Sense::click(),
                    );
                    if delete_response.clicked() {
                        acts.push(CardAct::Delete(c.id.clone()));
                    }
                }
            }
        }

        for act in acts {
            match act {
                CardAct::Focus(id) => {
                    self.toggle_focus(&id);
                    if self.focused_char_id.is_some() {
                        self.panel = PanelView::Info;
                        self.sidebar_open = true;
                    }
                }
                CardAct::Edit(id) => self.open_character_editor(&id, true),
                CardAct::Delete(id) => self.delete_character(&id),
                CardAct::ToggleGroup(id) => self.toggle_group_membership(&id),
                CardAct::StartDrag {
                    id,
                    grab_offset,
                    press_screen,
                } => {
                    self.gesture = Some(Gesture::DraggingCard {
                        id,
                        grab_offset,
                        press_screen,
                        press_time: ctx.input(|i| i.time),
                        moved: false,
                        before: Box::new(self.board.clone()),
                    });
                }
                CardAct::StartLink { id, start_world } => {
                    self.gesture = Some(Gesture::Linking {
                        from_id: id,
                        start_world,
                    });
                }
            }
        }
        if let Some(id) = clicked_edge {
            self.open_relationship_editor(&id, true);
        }

        // Background interactions: whatever the cards didn't capture.
        if response.double_clicked() && self.can_edit() && !self.deletion_mode {
            if let Some(world) = pointer_world {
                self.spawn_character_and_edit(world);
            }
        } else if (response.drag_started_by(egui::PointerButton::Primary)
            || response.drag_started_by(egui::PointerButton::Middle))
            && self.gesture.is_none()
        {
            self.background_press();
        } else if response.clicked() {
            self.focused_char_id = None;
            self.deletion_mode = false;
            self.group_assignment_mode = false;
        }

        self.advance_gesture(&ctx, &painter, origin, pointer_pos, pointer_world, &chars);
    }

    fn advance_gesture(
        &mut self,
        ctx: &egui::Context,
        painter: &egui::Painter,
        origin: egui::Pos2,
        pointer_pos: Option<egui::Pos2>,
        pointer_world: Option<egui::Pos2>,
        chars: &[model::Character],
    ) {
        let released = ctx.input(|i| i.pointer.any_released());
        let delta = ctx.input(|i| i.pointer.delta());
        let now = ctx.input(|i| i.time);

        match self.gesture.take() {
            None => {}
            Some(Gesture::Panning) => {
                self.view.pan_screen += delta;
                if !released {
                    self.gesture = Some(Gesture::Panning);
                }
            }
            Some(Gesture::DraggingCard {
                id,
                grab_offset,
                press_screen,
                press_time,
                mut moved,
                before,
            }) => {
                if let Some(p) = pointer_pos {
                    if !moved
                        && ((p.x - press_screen.x).abs() > DRAG_THRESHOLD
                            || (p.y - press_screen.y).abs() > DRAG_THRESHOLD)
                    {
                        moved = true;
                    }
                }
                let mut long_press = false;
                if moved {
                    // Live position update; history waits for the release.
                    if let Some(world) = pointer_world {
                        if let Some(c) = self.board.character_mut(&id) {
                            c.position = model::Point {
                                x: world.x - grab_offset.x,
                                y: world.y - grab_offset.y,
                            };
                        }
                    }
                } else if now - press_time >= LONG_PRESS_SECS {
                    // Held still long enough: the whole board enters deletion
                    // mode and the press stops being a drag.
                    self.deletion_mode = true;
                    long_press = true;
                } else {
                    ctx.request_repaint_after(std::time::Duration::from_millis(50));
                }

                if released {
                    if moved {
                        self.commit_recorded(*before);
                    }
                } else if !long_press {
                    self.gesture = Some(Gesture::DraggingCard {
                        id,
                        grab_offset,
                        press_screen,
                        press_time,
                        moved,
                        before,
                    });
                }
            }
            Some(Gesture::Linking {
                from_id,
                start_world,
            }) => {
                if let Some(p) = pointer_pos {
                    render::draw_rubber_band(
                        painter,
                        self.view.world_to_screen(origin, start_world),
                        p,
                    );
                }
                if released {
                    if let Some(world) = pointer_world {
                        let target = chars
                            .iter()
                            .rev()
                            .find(|c| geometry::card_rect(c).contains(world));
                        if let Some(target) = target {
                            self.finish_link(&from_id, &target.id);
                        }
                    }
                } else {
                    self.gesture = Some(Gesture::Linking {
                        from_id,
                        start_world,
                    });
                }
            }
            Some(Gesture::ResizingSidebar) => {
                if let Some(p) = pointer_pos {
                    let max =
                        (ctx.screen_rect().width() * SIDEBAR_MAX_FRAC).max(SIDEBAR_MIN_WIDTH);
                    self.board.sidebar_width = p.x.clamp(SIDEBAR_MIN_WIDTH, max);
                }
                if !released {
                    self.gesture = Some(Gesture::ResizingSidebar);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_drag_on_a_card_pans() {
        assert_eq!(
            card_drag_kind(egui::PointerButton::Middle, true, false),
            DragKind::Pan
        );
        // Panning needs no edit rights and survives deletion mode.
        assert_eq!(
            card_drag_kind(egui::PointerButton::Middle, false, true),
            DragKind::Pan
        );
    }

    #[test]
    fn only_primary_drags_move_cards() {
        assert_eq!(
            card_drag_kind(egui::PointerButton::Primary, true, false),
            DragKind::Move
        );
        assert_eq!(
            card_drag_kind(egui::PointerButton::Primary, false, false),
            DragKind::Ignore
        );
        assert_eq!(
            card_drag_kind(egui::PointerButton::Primary, true, true),
            DragKind::Ignore
        );
        assert_eq!(
            card_drag_kind(egui::PointerButton::Secondary, true, false),
            DragKind::Ignore
        );
    }

    #[test]
    fn wheel_zoom_scales_with_notch_count() {
        assert!((wheel_zoom_factor(50.0) - WHEEL_ZOOM_IN).abs() < 1e-6);
        assert!((wheel_zoom_factor(-50.0) - WHEEL_ZOOM_OUT).abs() < 1e-6);
        assert!((wheel_zoom_factor(150.0) - WHEEL_ZOOM_IN.powi(3)).abs() < 1e-6);
        assert!((wheel_zoom_factor(-100.0) - WHEEL_ZOOM_OUT.powi(2)).abs() < 1e-6);
    }

    #[test]
    fn sub_notch_scroll_still_zooms_one_step() {
        assert!((wheel_zoom_factor(10.0) - WHEEL_ZOOM_IN).abs() < 1e-6);
        assert!((wheel_zoom_factor(-1.0) - WHEEL_ZOOM_OUT).abs() < 1e-6);
    }
}
