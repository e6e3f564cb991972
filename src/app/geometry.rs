use crate::model;
use eframe::egui;

pub(super) fn card_rect(c: &model::Character) -> egui::Rect {
    egui::Rect::from_min_size(
        c.position.to_pos2(),
        egui::vec2(model::CARD_W, model::CARD_H),
    )
}

/// Mid-edge anchor points in top, bottom, left, right order. The enumeration
/// order matters: `nearest_anchor_pair` keeps the first pair on distance ties.
fn card_anchors(rect: egui::Rect) -> [egui::Pos2; 4] {
    [
        egui::pos2(rect.center().x, rect.top()),
        egui::pos2(rect.center().x, rect.bottom()),
        egui::pos2(rect.left(), rect.center().y),
        egui::pos2(rect.right(), rect.center().y),
    ]
}

/// Closest pair among the 4x4 anchor combinations of two cards. Strict `<`
/// keeps the first-encountered pair when distances tie, so the choice is
/// stable for symmetric layouts.
pub(super) fn nearest_anchor_pair(a: egui::Rect, b: egui::Rect) -> (egui::Pos2, egui::Pos2) {
    let anchors_a = card_anchors(a);
    let anchors_b = card_anchors(b);
    let mut best = (anchors_a[0], anchors_b[0]);
    let mut best_dist = f32::INFINITY;
    for p1 in anchors_a {
        for p2 in anchors_b {
            let d = (p2 - p1).length();
            if d < best_dist {
                best_dist = d;
                best = (p1, p2);
            }
        }
    }
    best
}

/// A quadratic Bézier edge in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct EdgeCurve {
    pub p1: egui::Pos2,
    pub p2: egui::Pos2,
    pub control: egui::Pos2,
}

impl EdgeCurve {
    pub fn point_at(&self, t: f32) -> egui::Pos2 {
        let u = 1.0 - t;
        let x = u * u * self.p1.x + 2.0 * u * t * self.control.x + t * t * self.p2.x;
        let y = u * u * self.p1.y + 2.0 * u * t * self.control.y + t * t * self.p2.y;
        egui::pos2(x, y)
    }
}

const PARALLEL_SPACING: f32 = 35.0;
const BOW: f32 = 50.0;

/// Offsets the endpoints of the `index`-th of `total` parallel edges along the
/// shared perpendicular, then bows the control point a further fixed amount on
/// the same side. A single edge (total == 1) gets a zero endpoint offset but
/// still bows.
pub(super) fn edge_curve(a: egui::Pos2, b: egui::Pos2, index: usize, total: usize) -> EdgeCurve {
    let d = b - a;
    let dist = d.length().max(1.0);
    let perp = egui::vec2(-d.y / dist, d.x / dist);
    let offset = (index as f32 - (total as f32 - 1.0) / 2.0) * PARALLEL_SPACING;
    let p1 = a + perp * offset;
    let p2 = b + perp * offset;
    let mid = egui::pos2((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0);
    EdgeCurve {
        p1,
        p2,
        control: mid + perp * BOW,
    }
}

const FIT_PADDING: f32 = 150.0;
const FIT_MIN_ZOOM: f32 = 0.3;
const FIT_MAX_ZOOM: f32 = 1.2;

/// Zoom and pan that frame the given world rects inside the viewport, with
/// breathing room around them and the zoom clamped to a readable range.
pub(super) fn fit_bounds(rects: &[egui::Rect], viewport: egui::Vec2) -> Option<(f32, egui::Vec2)> {
    let mut it = rects.iter();
    let mut bounds = *it.next()?;
    for r in it {
        bounds = bounds.union(*r);
    }
    let padded = bounds.expand(FIT_PADDING);
    let zoom = (viewport.x / padded.width())
        .min(viewport.y / padded.height())
        .clamp(FIT_MIN_ZOOM, FIT_MAX_ZOOM);
    let pan = viewport / 2.0 - bounds.center().to_vec2() * zoom;
    Some((zoom, pan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::View;

    #[test]
    fn screen_world_round_trip_across_zoom_range() {
        let origin = egui::pos2(13.0, 7.0);
        for zoom in [0.2, 0.5, 1.0, 2.0, 3.0] {
            let view = View {
                pan_screen: egui::vec2(40.0, -25.0),
                zoom,
            };
            let world = egui::pos2(321.5, -118.25);
            let screen = view.world_to_screen(origin, world);
            let back = view.screen_to_world(origin, screen);
            assert!((back - world).length() < 1e-3, "zoom {zoom}: {back:?}");
        }
    }

    #[test]
    fn zoom_clamps_to_limits() {
        let mut view = View::default();
        for _ in 0..100 {
            view.zoom_about_screen_point(egui::Pos2::ZERO, egui::Pos2::ZERO, 0.9);
        }
        assert_eq!(view.zoom, 0.2);
        for _ in 0..100 {
            view.zoom_about_screen_point(egui::Pos2::ZERO, egui::Pos2::ZERO, 1.1);
        }
        assert_eq!(view.zoom, 3.0);
    }

    #[test]
    fn zoom_keeps_anchor_point_fixed() {
        let mut view = View {
            pan_screen: egui::vec2(10.0, 20.0),
            zoom: 1.0,
        };
        let origin = egui::pos2(0.0, 0.0);
        let anchor = egui::pos2(250.0, 140.0);
        let world_before = view.screen_to_world(origin, anchor);
        view.zoom_about_screen_point(origin, anchor, 1.1);
        let world_after = view.screen_to_world(origin, anchor);
        assert!((world_after - world_before).length() < 1e-2);
    }

    #[test]
    fn side_by_side_cards_connect_right_to_left() {
        let a = card_rect(&char_at(0.0, 0.0));
        let b = card_rect(&char_at(300.0, 0.0));
        let (p1, p2) = nearest_anchor_pair(a, b);
        assert_eq!(p1, egui::pos2(160.0, 110.0));
        assert_eq!(p2, egui::pos2(300.0, 110.0));
    }

    #[test]
    fn stacked_cards_connect_bottom_to_top() {
        let a = card_rect(&char_at(0.0, 0.0));
        let b = card_rect(&char_at(0.0, 400.0));
        let (p1, p2) = nearest_anchor_pair(a, b);
        assert_eq!(p1, egui::pos2(80.0, 220.0));
        assert_eq!(p2, egui::pos2(80.0, 400.0));
    }

    #[test]
    fn parallel_edges_get_distinct_offsets() {
        let a = egui::pos2(0.0, 0.0);
        let b = egui::pos2(200.0, 0.0);
        let first = edge_curve(a, b, 0, 2);
        let second = edge_curve(a, b, 1, 2);
        // Perpendicular of a horizontal edge is vertical: offsets -17.5/+17.5.
        assert!((first.p1.y - (-17.5)).abs() < 1e-4);
        assert!((second.p1.y - 17.5).abs() < 1e-4);
        assert_ne!(first, second);
    }

    #[test]
    fn single_edge_still_bows() {
        let curve = edge_curve(egui::pos2(0.0, 0.0), egui::pos2(200.0, 0.0), 0, 1);
        assert_eq!(curve.p1, egui::pos2(0.0, 0.0));
        assert_eq!(curve.p2, egui::pos2(200.0, 0.0));
        assert!((curve.control.y - 50.0).abs() < 1e-4);
        assert_eq!(curve.point_at(0.0), curve.p1);
        assert_eq!(curve.point_at(1.0), curve.p2);
    }

    #[test]
    fn fit_bounds_frames_rects_within_zoom_range() {
        let rects = [
            egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(160.0, 220.0)),
            egui::Rect::from_min_size(egui::pos2(600.0, 300.0), egui::vec2(160.0, 220.0)),
        ];
        let viewport = egui::vec2(1280.0, 800.0);
        let (zoom, pan) = fit_bounds(&rects, viewport).unwrap();
        assert!((FIT_MIN_ZOOM..=FIT_MAX_ZOOM).contains(&zoom));
        // The bounds center should land on the viewport center.
        let center = egui::pos2(380.0, 260.0);
        let view = View {
            pan_screen: pan,
            zoom,
        };
        let on_screen = view.world_to_screen(egui::Pos2::ZERO, center);
        assert!((on_screen.to_vec2() - viewport / 2.0).length() < 1e-2);
    }

    #[test]
    fn fit_bounds_of_nothing_is_none() {
        assert!(fit_bounds(&[], egui::vec2(800.0, 600.0)).is_none());
    }

    fn char_at(x: f32, y: f32) -> model::Character {
        model::Character {
            id: "t".to_string(),
            name: "t".to_string(),
            name_en: None,
            role: String::new(),
            affiliation: String::new(),
            description: String::new(),
            image_url: String::new(),
            gallery: Vec::new(),
            position: model::Point { x, y },
            group_id: None,
        }
    }
}
