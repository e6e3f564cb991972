use eframe::egui;
use serde::{Deserialize, Serialize};

/// Fixed card footprint in world units. Layout math, anchor points and hit
/// testing all assume this size.
pub const CARD_W: f32 = 160.0;
pub const CARD_H: f32 = 220.0;

/// Build-time board preset. Paste an exported board JSON between the quotes to
/// ship a pre-arranged board; leave empty to fall back to the demo data.
pub const PRELOADED_BOARD_JSON: &str = "";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub affiliation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub type_id: String,
    #[serde(default)]
    pub is_bi_directional: bool,
    #[serde(default)]
    pub is_dashed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curvature: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RelationshipTypeConfig {
    pub id: String,
    pub label: String,
    pub color: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub image_size: Size,
    pub name_font_size: f32,
    pub role_font_size: f32,
    pub desc_font_size: f32,
    pub spacing: f32,
    pub left_offset: f32,
    pub card_scale: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            image_size: Size {
                width: 204.0,
                height: 255.0,
            },
            name_font_size: 48.0,
            role_font_size: 12.0,
            desc_font_size: 14.0,
            spacing: 24.0,
            left_offset: 24.0,
            card_scale: 1.0,
        }
    }
}

/// Built-in narrative groups. The registry is fixed; only membership
/// (`Character::group_id`) lives in the board data.
pub struct GroupDef {
    pub id: &'static str,
    pub name: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

pub const GROUPS: &[GroupDef] = &[
    GroupDef {
        id: "villains",
        name: "SINNERS",
        label: "VI",
        color: "#ff4d4d",
    },
    GroupDef {
        id: "queen_bee",
        name: "QUEEN BEE",
        label: "QB",
        color: "#ec4899",
    },
    GroupDef {
        id: "angel_zoo",
        name: "ANGEL ZOO",
        label: "AZ",
        color: "#fbbf24",
    },
    GroupDef {
        id: "eden",
        name: "EAST OF EDEN",
        label: "ED",
        color: "#4da3ff",
    },
];

pub fn group_by_id(id: &str) -> Option<&'static GroupDef> {
    GROUPS.iter().find(|g| g.id == id)
}

/// The complete board snapshot. Serialized as camelCase JSON so exports stay
/// interchangeable with share strings and older archive files. Every field has
/// a default so partial snapshots hydrate instead of failing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardData {
    pub characters: Vec<Character>,
    pub relationships: Vec<Relationship>,
    pub rel_types: Vec<RelationshipTypeConfig>,
    pub layout_config: LayoutConfig,
    pub title_white: String,
    pub title_yellow: String,
    pub sidebar_width: f32,
    pub is_global_black_and_white: bool,
    pub background_style: String,
    pub card_style: String,
    pub title_style: String,
}

impl Default for BoardData {
    fn default() -> Self {
        Self {
            characters: demo_characters(),
            relationships: demo_relationships(),
            rel_types: default_rel_types(),
            layout_config: LayoutConfig::default(),
            title_white: "CHIRAKA".to_string(),
            title_yellow: "NEXUS".to_string(),
            sidebar_width: 320.0,
            is_global_black_and_white: false,
            background_style: "default".to_string(),
            card_style: "default".to_string(),
            title_style: "comic".to_string(),
        }
    }
}

pub fn default_rel_types() -> Vec<RelationshipTypeConfig> {
    let entries = [
        ("love", "ROMANCE", "#ff4d4d"),
        ("friendship", "FRIENDSHIP", "#ffffff"),
        ("rivalry", "RIVALRY", "#ffaa00"),
        ("childhood", "CHILDHOOD", "#4da3ff"),
        ("colleague", "BUSINESS", "#00ffaa"),
    ];
    entries
        .iter()
        .map(|(id, label, color)| RelationshipTypeConfig {
            id: id.to_string(),
            label: label.to_string(),
            color: color.to_string(),
        })
        .collect()
}

fn demo_characters() -> Vec<Character> {
    vec![
        Character {
            id: "c1".to_string(),
            name: "Blonde Singer".to_string(),
            name_en: Some("BLONDE SINGER".to_string()),
            role: "Resident vocalist".to_string(),
            affiliation: "CHIRAKA Bar".to_string(),
            description: "The soul of the bar. Once pulled a drowning boy out of the river \
                          and forgot about it by the weekend."
                .to_string(),
            image_url: String::new(),
            gallery: Vec::new(),
            position: Point { x: 500.0, y: 150.0 },
            group_id: None,
        },
        Character {
            id: "c2".to_string(),
            name: "Mafia Heir".to_string(),
            name_en: Some("MAFIA HEIR".to_string()),
            role: "Underworld successor".to_string(),
            affiliation: "Underworld".to_string(),
            description: "Keeps a silent watch over the singer's world. She is his only \
                          weakness. An old acquaintance of the fraudster."
                .to_string(),
            image_url: String::new(),
            gallery: Vec::new(),
            position: Point { x: 200.0, y: 150.0 },
            group_id: None,
        },
        Character {
            id: "c6".to_string(),
            name: "Master Fraud".to_string(),
            name_en: Some("MASTER FRAUD".to_string()),
            role: "Career con artist".to_string(),
            affiliation: "Unknown".to_string(),
            description: "The heir's closest friend. Runs cons across the city and keeps \
                          crossing paths with everyone on this board."
                .to_string(),
            image_url: String::new(),
            gallery: Vec::new(),
            position: Point { x: 200.0, y: 450.0 },
            group_id: None,
        },
    ]
}

fn demo_relationships() -> Vec<Relationship> {
    vec![
        Relationship {
            id: "r1".to_string(),
            from_id: "c2".to_string(),
            to_id: "c1".to_string(),
            label: "Silent Devotion".to_string(),
            description: "You saved me once. I only want to guard you from a distance."
                .to_string(),
            type_id: "love".to_string(),
            is_bi_directional: false,
            is_dashed: false,
            curvature: None,
        },
        Relationship {
            id: "r3".to_string(),
            from_id: "c2".to_string(),
            to_id: "c6".to_string(),
            label: "Sworn Friends".to_string(),
            description: "Old acquaintances with a long trail of jobs behind them.".to_string(),
            type_id: "friendship".to_string(),
            is_bi_directional: true,
            is_dashed: false,
            curvature: None,
        },
    ]
}

impl BoardData {
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn character_mut(&mut self, id: &str) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    pub fn relationship_mut(&mut self, id: &str) -> Option<&mut Relationship> {
        self.relationships.iter_mut().find(|r| r.id == id)
    }

    pub fn rel_type(&self, id: &str) -> Option<&RelationshipTypeConfig> {
        self.rel_types.iter().find(|t| t.id == id)
    }

    /// Removes a character and every relationship touching it.
    pub fn remove_character(&mut self, id: &str) {
        self.characters.retain(|c| c.id != id);
        self.relationships
            .retain(|r| r.from_id != id && r.to_id != id);
    }

    pub fn remove_relationship(&mut self, id: &str) {
        self.relationships.retain(|r| r.id != id);
    }

    /// Links two existing cards. No-op when the endpoints coincide or either
    /// one is missing; returns the new relationship id otherwise.
    pub fn create_link(&mut self, from_id: &str, to_id: &str) -> Option<String> {
        if from_id == to_id {
            return None;
        }
        if self.character(from_id).is_none() || self.character(to_id).is_none() {
            return None;
        }
        let id = format!("r-{}", uuid::Uuid::now_v7());
        self.relationships.push(Relationship {
            id: id.clone(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            label: "NEW LINK".to_string(),
            description: String::new(),
            type_id: "colleague".to_string(),
            is_bi_directional: false,
            is_dashed: false,
            curvature: Some(40.0),
        });
        Some(id)
    }

    /// Spawns an empty card so its center lands on the given world point.
    pub fn spawn_character(&mut self, world: egui::Pos2) -> String {
        let id = format!("c-{}", uuid::Uuid::now_v7());
        self.characters.push(Character {
            id: id.clone(),
            name: "NEW ASSET".to_string(),
            name_en: None,
            role: "UNKNOWN".to_string(),
            affiliation: String::new(),
            description: String::new(),
            image_url: String::new(),
            gallery: Vec::new(),
            position: Point {
                x: world.x - CARD_W / 2.0,
                y: world.y - CARD_H / 2.0,
            },
            group_id: None,
        });
        id
    }

    /// Simple force-directed spread: cards closer than their footprint plus
    /// padding repel each other, then the whole layout is recentered.
    pub fn auto_arrange(&mut self) {
        const ITERATIONS: usize = 50;
        const PADDING: f32 = 100.0;
        let min_dx = CARD_W + PADDING;
        let min_dy = CARD_H + PADDING;
        for _ in 0..ITERATIONS {
            for i in 0..self.characters.len() {
                for j in (i + 1)..self.characters.len() {
                    let a = self.characters[i].position;
                    let b = self.characters[j].position;
                    let dx = b.x - a.x;
                    let dy = b.y - a.y;
                    if dx.abs() < min_dx && dy.abs() < min_dy {
                        let push_x = (min_dx - dx.abs()) / 2.0 * if dx < 0.0 { -1.0 } else { 1.0 };
                        let push_y = (min_dy - dy.abs()) / 2.0 * if dy < 0.0 { -1.0 } else { 1.0 };
                        if dx.abs() / min_dx > dy.abs() / min_dy {
                            self.characters[i].position.x -= push_x;
                            self.characters[j].position.x += push_x;
                        } else {
                            self.characters[i].position.y -= push_y;
                            self.characters[j].position.y += push_y;
                        }
                    }
                }
            }
        }
        if self.characters.is_empty() {
            return;
        }
        let n = self.characters.len() as f32;
        let avg_x = self.characters.iter().map(|c| c.position.x).sum::<f32>() / n;
        let avg_y = self.characters.iter().map(|c| c.position.y).sum::<f32>() / n;
        for c in &mut self.characters {
            c.position.x += 800.0 - avg_x;
            c.position.y += 400.0 - avg_y;
        }
    }
}

/// Parses `#rrggbb` (with or without the hash). Falls back to white, the same
/// fallback the renderer uses for unknown relationship types.
pub fn color_from_hex(hex: &str) -> egui::Color32 {
    let hex = hex.trim_start_matches('#');
    // The length check counts bytes; byte-slicing below needs ASCII too,
    // and the color field is free-text user input.
    if hex.len() != 6 || !hex.is_ascii() {
        return egui::Color32::WHITE;
    }
    let parse = |s: &str| u8::from_str_radix(s, 16).unwrap_or(255);
    egui::Color32::from_rgb(parse(&hex[0..2]), parse(&hex[2..4]), parse(&hex[4..6]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_hydrates_demo_board() {
        let board: BoardData = serde_json::from_str("{}").unwrap();
        assert_eq!(board.characters.len(), 3);
        assert_eq!(board.relationships.len(), 2);
        assert_eq!(board.rel_types.len(), 5);
        assert_eq!(board.title_white, "CHIRAKA");
        assert_eq!(board.title_yellow, "NEXUS");
        assert_eq!(board.sidebar_width, 320.0);
    }

    #[test]
    fn partial_snapshot_keeps_present_fields_and_defaults_the_rest() {
        let json = r#"{
            "characters": [
                {"id": "x1", "name": "Ghost", "position": {"x": 10.0, "y": 20.0}}
            ],
            "relationships": []
        }"#;
        let board: BoardData = serde_json::from_str(json).unwrap();
        assert_eq!(board.characters.len(), 1);
        assert!(board.relationships.is_empty());
        assert_eq!(board.rel_types, default_rel_types());
        let c = &board.characters[0];
        assert_eq!(c.id, "x1");
        assert!(c.gallery.is_empty());
        assert!(c.group_id.is_none());
    }

    #[test]
    fn board_round_trips_through_camel_case_json() {
        let board = BoardData::default();
        let json = serde_json::to_string(&board).unwrap();
        assert!(json.contains("\"fromId\""));
        assert!(json.contains("\"isBiDirectional\""));
        assert!(json.contains("\"relTypes\""));
        assert!(json.contains("\"titleWhite\""));
        let back: BoardData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }

    #[test]
    fn remove_character_cascades_relationships() {
        let mut board = BoardData::default();
        board.remove_character("c2");
        assert!(board.character("c2").is_none());
        assert!(
            board
                .relationships
                .iter()
                .all(|r| r.from_id != "c2" && r.to_id != "c2")
        );
        assert!(board.relationships.is_empty());
    }

    #[test]
    fn create_link_rejects_self_and_missing_endpoints() {
        let mut board = BoardData::default();
        assert!(board.create_link("c1", "c1").is_none());
        assert!(board.create_link("c1", "nope").is_none());
        let before = board.relationships.len();
        let id = board.create_link("c1", "c6").unwrap();
        assert_eq!(board.relationships.len(), before + 1);
        let rel = board.relationship(&id).unwrap();
        assert_eq!(rel.type_id, "colleague");
        assert!(!rel.is_bi_directional);
        assert!(!rel.is_dashed);
        assert_eq!(rel.curvature, Some(40.0));
    }

    #[test]
    fn spawn_character_centers_on_click_point() {
        let mut board = BoardData::default();
        let id = board.spawn_character(egui::pos2(400.0, 300.0));
        let c = board.character(&id).unwrap();
        assert_eq!(c.position.x, 400.0 - CARD_W / 2.0);
        assert_eq!(c.position.y, 300.0 - CARD_H / 2.0);
    }

    #[test]
    fn auto_arrange_separates_overlapping_cards() {
        let mut board = BoardData::default();
        for c in &mut board.characters {
            c.position = Point { x: 100.0, y: 100.0 };
        }
        board.auto_arrange();
        for i in 0..board.characters.len() {
            for j in (i + 1)..board.characters.len() {
                let a = board.characters[i].position;
                let b = board.characters[j].position;
                let overlap_x = (a.x - b.x).abs() < CARD_W + 100.0;
                let overlap_y = (a.y - b.y).abs() < CARD_H + 100.0;
                assert!(!(overlap_x && overlap_y), "cards {i} and {j} still overlap");
            }
        }
    }

    #[test]
    fn color_from_hex_parses_and_falls_back() {
        assert_eq!(color_from_hex("#ff4d4d"), egui::Color32::from_rgb(255, 77, 77));
        assert_eq!(color_from_hex("00ffaa"), egui::Color32::from_rgb(0, 255, 170));
        assert_eq!(color_from_hex("bogus"), egui::Color32::WHITE);
    }

    #[test]
    fn color_from_hex_survives_multibyte_input() {
        // Six bytes but two chars; must fall back instead of byte-slicing
        // inside a character.
        assert_eq!(color_from_hex("€€"), egui::Color32::WHITE);
        assert_eq!(color_from_hex("#€€"), egui::Color32::WHITE);
    }
}
