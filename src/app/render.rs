use crate::model;
use eframe::egui;

use super::geometry::EdgeCurve;

const BG_FILL: egui::Color32 = egui::Color32::from_rgb(9, 9, 11);
const CARD_FILL: egui::Color32 = egui::Color32::from_rgb(24, 24, 27);
const CARD_BORDER: egui::Color32 = egui::Color32::from_rgb(63, 63, 70);
const IMAGE_FILL: egui::Color32 = egui::Color32::from_rgb(14, 14, 16);
const ACCENT: egui::Color32 = egui::Color32::from_rgb(250, 204, 21);
const MUTED: egui::Color32 = egui::Color32::from_rgb(113, 113, 122);
const DANGER: egui::Color32 = egui::Color32::from_rgb(220, 38, 38);

/// Grayscale then fade; dimming is how the highlight filter manifests,
/// nothing is ever hidden.
fn tint(color: egui::Color32, dimmed: bool, monochrome: bool) -> egui::Color32 {
    let mut c = color;
    if monochrome || dimmed {
        let [r, g, b, a] = c.to_array();
        let gray = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) as u8;
        c = egui::Color32::from_rgba_unmultiplied(gray, gray, gray, a);
    }
    if dimmed {
        c = c.gamma_multiply(0.25);
    }
    c
}

pub(super) fn draw_background(painter: &egui::Painter, rect: egui::Rect, style: &str) {
    let fill = match style {
        "blueprint" => egui::Color32::from_rgb(10, 16, 28),
        "noir" => egui::Color32::BLACK,
        _ => BG_FILL,
    };
    painter.rect_filled(rect, 0.0, fill);
    // Sparse dot grid for spatial reference while panning.
    let spacing = 48.0;
    let dot = egui::Color32::from_rgb(34, 34, 38);
    let mut x = rect.left();
    while x < rect.right() {
        let mut y = rect.top();
        while y < rect.bottom() {
            painter.circle_filled(egui::pos2(x, y), 1.0, dot);
            y += spacing;
        }
        x += spacing;
    }
}

pub(super) fn draw_titles(painter: &egui::Painter, rect: egui::Rect, board: &model::BoardData) {
    let pos = rect.left_top() + egui::vec2(24.0, 18.0);
    let white_rect = painter.text(
        pos,
        egui::Align2::LEFT_TOP,
        &board.title_white,
        egui::FontId::proportional(36.0),
        egui::Color32::WHITE,
    );
    painter.text(
        white_rect.right_top() + egui::vec2(10.0, 0.0),
        egui::Align2::LEFT_TOP,
        &board.title_yellow,
        egui::FontId::proportional(36.0),
        ACCENT,
    );
}

pub(super) struct CardVisual<'a> {
    pub character: &'a model::Character,
    /// Screen-space card rect.
    pub rect: egui::Rect,
    pub zoom: f32,
    pub focused: bool,
    pub dimmed: bool,
    pub monochrome: bool,
    pub deletion_mode: bool,
}

/// Link handle on the right edge, vertically centered.
pub(super) fn link_handle_rect(card: egui::Rect, zoom: f32) -> egui::Rect {
    let r = 9.0 * zoom.max(0.5);
    egui::Rect::from_center_size(
        egui::pos2(card.right(), card.center().y),
        egui::vec2(r * 2.0, r * 2.0),
    )
}

/// Deletion-mode kill button hanging off the top-left corner.
pub(super) fn delete_button_rect(card: egui::Rect, zoom: f32) -> egui::Rect {
    let r = 10.0 * zoom.max(0.5);
    egui::Rect::from_center_size(card.left_top(), egui::vec2(r * 2.0, r * 2.0))
}

pub(super) fn draw_card(painter: &egui::Painter, v: &CardVisual<'_>) {
    let mono = v.monochrome;
    painter.rect_filled(v.rect, 2.0, tint(CARD_FILL, v.dimmed, mono));

    // Portrait block fills the upper part of the card, text strip below.
    let image_h = v.rect.height() * 0.62;
    let image_rect = egui::Rect::from_min_size(v.rect.min, egui::vec2(v.rect.width(), image_h));
    painter.rect_filled(image_rect, 2.0, tint(IMAGE_FILL, v.dimmed, mono));
    let initial = v
        .character
        .name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string());
    painter.text(
        image_rect.center(),
        egui::Align2::CENTER_CENTER,
        initial,
        egui::FontId::proportional(48.0 * v.zoom),
        tint(MUTED, v.dimmed, mono),
    );

    let pad = 8.0 * v.zoom;
    let mut cursor = egui::pos2(v.rect.left() + pad, image_rect.bottom() + pad);
    let headline = v
        .character
        .name_en
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&v.character.name);
    let r = painter.text(
        cursor,
        egui::Align2::LEFT_TOP,
        headline,
        egui::FontId::proportional(15.0 * v.zoom),
        tint(ACCENT, v.dimmed, mono),
    );
    cursor.y = r.bottom() + 2.0 * v.zoom;
    let r = painter.text(
        cursor,
        egui::Align2::LEFT_TOP,
        &v.character.name,
        egui::FontId::proportional(12.0 * v.zoom),
        tint(egui::Color32::WHITE, v.dimmed, mono),
    );
    cursor.y = r.bottom() + 4.0 * v.zoom;
    painter.text(
        cursor,
        egui::Align2::LEFT_TOP,
        v.character.role.to_uppercase(),
        egui::FontId::proportional(9.0 * v.zoom),
        tint(MUTED, v.dimmed, mono),
    );

    let (border, width) = if v.deletion_mode {
        (DANGER, 2.0)
    } else if v.focused {
        (ACCENT, 3.0)
    } else {
        (CARD_BORDER, 2.0)
    };
    painter.rect_stroke(
        v.rect,
        2.0,
        egui::Stroke::new(width, tint(border, v.dimmed, mono)),
        egui::StrokeKind::Middle,
    );

    if let Some(group_id) = &v.character.group_id {
        if let Some(group) = model::group_by_id(group_id) {
            painter.circle_filled(
                v.rect.right_top() + egui::vec2(-8.0 * v.zoom, 8.0 * v.zoom),
                4.0 * v.zoom.max(0.5),
                tint(model::color_from_hex(group.color), v.dimmed, mono),
            );
        }
    }

    if v.deletion_mode {
        let btn = delete_button_rect(v.rect, v.zoom);
        painter.circle_filled(btn.center(), btn.width() / 2.0, DANGER);
        painter.text(
            btn.center(),
            egui::Align2::CENTER_CENTER,
            "×",
            egui::FontId::proportional(btn.height() * 0.8),
            egui::Color32::WHITE,
        );
    }
}

pub(super) fn draw_link_handle(painter: &egui::Painter, card: egui::Rect, zoom: f32) {
    let rect = link_handle_rect(card, zoom);
    painter.circle_filled(rect.center(), rect.width() / 2.0, ACCENT);
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        "+",
        egui::FontId::proportional(rect.height() * 0.9),
        egui::Color32::BLACK,
    );
}

pub(super) struct EdgeVisual<'a> {
    /// Screen-space curve.
    pub curve: EdgeCurve,
    pub color: egui::Color32,
    pub label: &'a str,
    pub dashed: bool,
    pub bidirectional: bool,
    pub hovered: bool,
    pub dimmed: bool,
    pub monochrome: bool,
    pub zoom: f32,
}

/// Draws one relationship edge and returns the screen rect of its label pill,
/// which doubles as the edge's click target.
pub(super) fn draw_edge(painter: &egui::Painter, v: &EdgeVisual<'_>) -> egui::Rect {
    let color = tint(v.color, v.dimmed, v.monochrome);
    let width = if v.hovered { 4.0 } else { 2.0 };
    let stroke = egui::Stroke::new(width, color);

    if v.dashed {
        let points: Vec<egui::Pos2> = (0..=24)
            .map(|i| v.curve.point_at(i as f32 / 24.0))
            .collect();
        painter.extend(egui::Shape::dashed_line(
            &points,
            stroke,
            8.0 * v.zoom,
            4.0 * v.zoom,
        ));
    } else {
        painter.add(egui::epaint::QuadraticBezierShape::from_points_stroke(
            [v.curve.p1, v.curve.control, v.curve.p2],
            false,
            egui::Color32::TRANSPARENT,
            stroke,
        ));
        // Directed edges get an arrowhead at the target; bidirectional edges
        // get none, matching their symmetric reading.
        if !v.bidirectional {
            draw_arrowhead(painter, v.curve, color, v.zoom);
        }
    }

    let mid = v.curve.point_at(0.5);
    let font = egui::FontId::proportional(11.0 * v.zoom.max(0.6));
    let galley = painter.layout_no_wrap(v.label.to_string(), font, egui::Color32::WHITE);
    let pill = egui::Rect::from_center_size(
        mid,
        galley.size() + egui::vec2(16.0 * v.zoom, 8.0 * v.zoom),
    );
    if v.dashed {
        painter.rect_stroke(
            pill,
            pill.height() / 2.0,
            egui::Stroke::new(1.5, tint(egui::Color32::WHITE, v.dimmed, v.monochrome)),
            egui::StrokeKind::Middle,
        );
        painter.galley(
            pill.center() - galley.size() / 2.0,
            galley,
            tint(egui::Color32::WHITE, v.dimmed, v.monochrome),
        );
    } else {
        painter.rect_filled(pill, 2.0, egui::Color32::BLACK);
        painter.rect_stroke(
            pill,
            2.0,
            egui::Stroke::new(1.5, color),
            egui::StrokeKind::Middle,
        );
        painter.galley(pill.center() - galley.size() / 2.0, galley, color);
    }
    pill
}

fn draw_arrowhead(painter: &egui::Painter, curve: EdgeCurve, color: egui::Color32, zoom: f32) {
    // Tangent at the end of a quadratic Bézier points from control to p2.
    let dir = (curve.p2 - curve.control).normalized();
    if !dir.is_finite() {
        return;
    }
    let size = 8.0 * zoom.max(0.5);
    let perp = egui::vec2(-dir.y, dir.x);
    let tip = curve.p2;
    let base = tip - dir * size;
    painter.add(egui::Shape::convex_polygon(
        vec![tip, base + perp * size * 0.5, base - perp * size * 0.5],
        color,
        egui::Stroke::NONE,
    ));
}

/// The in-flight link gesture, drawn from the source anchor to the pointer.
pub(super) fn draw_rubber_band(painter: &egui::Painter, from: egui::Pos2, to: egui::Pos2) {
    painter.line_segment([from, to], egui::Stroke::new(2.0, ACCENT));
    painter.circle_filled(to, 3.0, ACCENT);
}
