use crate::model;
use std::collections::HashSet;

/// Emphasis sets for the current frame. When `filter_active` is false the sets
/// are empty and nothing is dimmed; consumers only ever dim, never hide.
#[derive(Clone, Debug, Default)]
pub(super) struct Highlight {
    pub chars: HashSet<String>,
    pub rels: HashSet<String>,
    pub filter_active: bool,
}

impl Highlight {
    pub fn char_dimmed(&self, id: &str) -> bool {
        self.filter_active && !self.chars.contains(id)
    }

    pub fn rel_dimmed(&self, id: &str) -> bool {
        self.filter_active && !self.rels.contains(id)
    }
}

/// Pure highlight resolution. Group mode wins over character focus; both
/// cleared means no filter.
///
/// In character-focus mode an edge joins the emphasis set when the character
/// is its source, or when it is bidirectional or dashed and the character is
/// either endpoint. A plain directed edge pointing *into* the focused
/// character stays dim, as do its other endpoints; the focused character's
/// full neighborhood only lights up along edges it can "reach".
pub(super) fn resolve(
    active_group: Option<&str>,
    focused_char: Option<&str>,
    characters: &[model::Character],
    relationships: &[model::Relationship],
) -> Highlight {
    if let Some(group_id) = active_group {
        let chars: HashSet<String> = characters
            .iter()
            .filter(|c| c.group_id.as_deref() == Some(group_id))
            .map(|c| c.id.clone())
            .collect();
        let rels = relationships
            .iter()
            .filter(|r| chars.contains(&r.from_id) && chars.contains(&r.to_id))
            .map(|r| r.id.clone())
            .collect();
        return Highlight {
            chars,
            rels,
            filter_active: true,
        };
    }

    if let Some(focus) = focused_char {
        let mut chars = HashSet::new();
        let mut rels = HashSet::new();
        chars.insert(focus.to_string());
        for r in relationships {
            let outbound = r.from_id == focus;
            let undirected = (r.is_bi_directional || r.is_dashed)
                && (r.from_id == focus || r.to_id == focus);
            if outbound || undirected {
                rels.insert(r.id.clone());
                chars.insert(r.from_id.clone());
                chars.insert(r.to_id.clone());
            }
        }
        return Highlight {
            chars,
            rels,
            filter_active: true,
        };
    }

    Highlight::default()
}

/// Position of `rel` among all edges joining the same unordered endpoint
/// pair, ordered lexicographically by id. Returns `(index, total)` for the
/// parallel-edge fan-out.
pub(super) fn parallel_rank(
    relationships: &[model::Relationship],
    rel: &model::Relationship,
) -> (usize, usize) {
    let mut ids: Vec<&str> = relationships
        .iter()
        .filter(|r| {
            (r.from_id == rel.from_id && r.to_id == rel.to_id)
                || (r.from_id == rel.to_id && r.to_id == rel.from_id)
        })
        .map(|r| r.id.as_str())
        .collect();
    ids.sort_unstable();
    let index = ids.iter().position(|id| *id == rel.id).unwrap_or(0);
    (index, ids.len().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Character, Point, Relationship};

    fn character(id: &str, group: Option<&str>) -> Character {
        Character {
            id: id.to_string(),
            name: id.to_string(),
            name_en: None,
            role: String::new(),
            affiliation: String::new(),
            description: String::new(),
            image_url: String::new(),
            gallery: Vec::new(),
            position: Point::default(),
            group_id: group.map(str::to_string),
        }
    }

    fn rel(id: &str, from: &str, to: &str, bi: bool, dashed: bool) -> Relationship {
        Relationship {
            id: id.to_string(),
            from_id: from.to_string(),
            to_id: to.to_string(),
            label: String::new(),
            description: String::new(),
            type_id: String::new(),
            is_bi_directional: bi,
            is_dashed: dashed,
            curvature: None,
        }
    }

    #[test]
    fn no_selection_means_no_filter() {
        let chars = vec![character("a", None)];
        let rels = vec![];
        let hl = resolve(None, None, &chars, &rels);
        assert!(!hl.filter_active);
        assert!(!hl.char_dimmed("a"));
    }

    #[test]
    fn group_mode_emphasizes_members_and_internal_edges() {
        let chars = vec![
            character("a", Some("villains")),
            character("b", Some("villains")),
            character("c", None),
        ];
        let rels = vec![
            rel("r1", "a", "b", false, false),
            rel("r2", "a", "c", false, false),
        ];
        let hl = resolve(Some("villains"), None, &chars, &rels);
        assert!(hl.filter_active);
        assert!(!hl.char_dimmed("a"));
        assert!(!hl.char_dimmed("b"));
        assert!(hl.char_dimmed("c"));
        assert!(!hl.rel_dimmed("r1"));
        assert!(hl.rel_dimmed("r2"));
    }

    #[test]
    fn group_mode_wins_over_character_focus() {
        let chars = vec![character("a", Some("eden")), character("b", None)];
        let rels = vec![rel("r1", "b", "a", false, false)];
        let hl = resolve(Some("eden"), Some("b"), &chars, &rels);
        assert!(hl.char_dimmed("b"));
        assert!(!hl.char_dimmed("a"));
    }

    #[test]
    fn focus_emphasizes_outbound_and_undirected_edges() {
        let chars = vec![
            character("a", None),
            character("b", None),
            character("c", None),
            character("d", None),
        ];
        let rels = vec![
            rel("out", "a", "b", false, false),
            rel("bi", "c", "a", true, false),
            rel("dash", "d", "a", false, true),
        ];
        let hl = resolve(None, Some("a"), &chars, &rels);
        for id in ["a", "b", "c", "d"] {
            assert!(!hl.char_dimmed(id), "{id} should be lit");
        }
        assert!(!hl.rel_dimmed("out"));
        assert!(!hl.rel_dimmed("bi"));
        assert!(!hl.rel_dimmed("dash"));
    }

    #[test]
    fn inbound_plain_edge_stays_dim() {
        let chars = vec![character("a", None), character("b", None)];
        let rels = vec![rel("in", "b", "a", false, false)];
        let hl = resolve(None, Some("a"), &chars, &rels);
        assert!(!hl.char_dimmed("a"));
        assert!(hl.char_dimmed("b"));
        assert!(hl.rel_dimmed("in"));
    }

    #[test]
    fn parallel_rank_orders_by_id() {
        let rels = vec![
            rel("rb", "a", "b", false, false),
            rel("ra", "b", "a", false, false),
            rel("rc", "a", "b", false, false),
            rel("other", "a", "c", false, false),
        ];
        assert_eq!(parallel_rank(&rels, &rels[1]), (0, 3));
        assert_eq!(parallel_rank(&rels, &rels[0]), (1, 3));
        assert_eq!(parallel_rank(&rels, &rels[2]), (2, 3));
        assert_eq!(parallel_rank(&rels, &rels[3]), (0, 1));
    }
}
