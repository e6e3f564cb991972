use crate::model;
use eframe::egui;

use super::{NexusApp, SessionMode};

/// Resolves the startup precedence: share string, then the local archive,
/// then the build-time preset, then the demo board. Returns the board plus
/// whether the session must be forced read-only (share strings always are).
/// Every parse failure falls through to the next source silently.
pub(super) fn hydrate(
    share: Option<&str>,
    archive_json: Option<&str>,
    preset: &str,
) -> (model::BoardData, bool) {
    if let Some(share) = share {
        if let Some(board) = decode_share_string(share) {
            return (board, true);
        }
        log::warn!("ignoring malformed share string");
    }
    if let Some(json) = archive_json {
        if let Ok(board) = serde_json::from_str(json) {
            return (board, false);
        }
        log::warn!("ignoring corrupt local archive");
    }
    if !preset.trim().is_empty() {
        if let Ok(board) = serde_json::from_str(preset) {
            return (board, false);
        }
        log::warn!("ignoring malformed preloaded board data");
    }
    (model::BoardData::default(), false)
}

/// Compact JSON compressed to a URI-safe token.
pub(super) fn encode_share_string(board: &model::BoardData) -> Option<String> {
    let json = serde_json::to_string(board).ok()?;
    Some(lz_str::compress_to_encoded_uri_component(json.as_str()))
}

/// Accepts a bare token, a `s=token` query fragment, or a full share URL.
pub(super) fn decode_share_string(input: &str) -> Option<model::BoardData> {
    let token = match input.rsplit_once("s=") {
        Some((_, rest)) => rest,
        None => input,
    };
    let token = token.split('&').next().unwrap_or(token).trim();
    if token.is_empty() {
        return None;
    }
    let wide = lz_str::decompress_from_encoded_uri_component(token)?;
    let json = String::from_utf16(&wide).ok()?;
    serde_json::from_str(&json).ok()
}

pub(super) fn share_url(base: &str, board: &model::BoardData) -> Option<String> {
    let token = encode_share_string(board)?;
    Some(format!("{base}?s={token}"))
}

/// Single archive slot under the user's data directory. Written only on
/// explicit imports, never on ordinary edits or undo/redo.
pub(super) fn archive_path() -> Option<std::path::PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        std::path::PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("nexus-board")
            .join("archive.json"),
    )
}

pub(super) fn load_archive() -> Option<String> {
    let path = archive_path()?;
    std::fs::read_to_string(path).ok()
}

pub(super) fn write_archive(board: &model::BoardData) -> Result<(), String> {
    let path = archive_path().ok_or_else(|| "no home directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let json = serde_json::to_string(board).map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| e.to_string())
}

pub(super) fn export_file_name() -> String {
    format!("CHIRAKA_Nexus_{}.json", iso_date())
}

fn iso_date() -> String {
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    iso_date_from_days(since_epoch.as_secs() / 86400)
}

// Crude calendar math; close enough for a filename, but the clamps keep the
// last days of a year from spilling into month 13.
fn iso_date_from_days(days: u64) -> String {
    let years_since_1970 = days / 365;
    let year = 1970 + years_since_1970;
    let remaining_days = days % 365;
    let month = ((remaining_days / 30) + 1).min(12);
    let day = ((remaining_days % 30) + 1).min(31);
    format!("{year:04}-{month:02}-{day:02}")
}

impl NexusApp {
    pub(super) fn export_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name(export_file_name())
            .save_file()
        else {
            return;
        };
        match serde_json::to_string_pretty(&self.board) {
            Ok(json) => match std::fs::write(&path, json) {
                Ok(()) => self.status = Some(format!("Exported {}", path.display())),
                Err(e) => self.status = Some(format!("Export failed: {e}")),
            },
            Err(e) => self.status = Some(format!("Export failed: {e}")),
        }
    }

    /// In-session import. Replaces the board through history and writes the
    /// archive; a parse failure raises a blocking alert and leaves the board
    /// untouched.
    pub(super) fn import_dialog(&mut self) {
        if !self.can_edit() {
            return;
        }
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        else {
            return;
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                self.status = Some(format!("Import failed: {e}"));
                return;
            }
        };
        match serde_json::from_str::<model::BoardData>(&text) {
            Ok(board) => {
                self.history.record(self.board.clone());
                self.board = board;
                self.focused_char_id = None;
                self.active_group_id = None;
                self.form = None;
                if let Err(e) = write_archive(&self.board) {
                    log::warn!("failed to write archive: {e}");
                }
                self.status = Some("INTEL IMPORTED".to_string());
            }
            Err(e) => {
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Error)
                    .set_title("IMPORT FAILED")
                    .set_description(format!("Not a valid board file: {e}"))
                    .set_buttons(rfd::MessageButtons::Ok)
                    .show();
            }
        }
    }

    /// Import offered on the gate screen. A successful load replaces the
    /// board, archives it, and enters observer mode.
    pub(super) fn startup_import_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        else {
            return;
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            return;
        };
        match serde_json::from_str::<model::BoardData>(&text) {
            Ok(board) => {
                self.board = board;
                self.history.clear();
                if let Err(e) = write_archive(&self.board) {
                    log::warn!("failed to write archive: {e}");
                }
                self.mode = SessionMode::Observer;
            }
            Err(e) => {
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Error)
                    .set_title("IMPORT FAILED")
                    .set_description(format!("Not a valid board file: {e}"))
                    .set_buttons(rfd::MessageButtons::Ok)
                    .show();
            }
        }
    }

    pub(super) fn copy_share_link(&mut self, ctx: &egui::Context) {
        match share_url(&self.settings.share_base_url, &self.board) {
            Some(url) => {
                ctx.copy_text(url);
                self.status = Some("LINK COPIED".to_string());
            }
            None => {
                log::error!("failed to encode share string");
                self.status = Some("SHARE FAILED".to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_string_round_trips() {
        let board = model::BoardData::default();
        let token = encode_share_string(&board).unwrap();
        assert!(!token.is_empty());
        // URI-component safe: no characters needing percent-encoding.
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "+-$".contains(c))
        );
        let back = decode_share_string(&token).unwrap();
        assert_eq!(back, board);
    }

    #[test]
    fn decode_accepts_full_share_url() {
        let board = model::BoardData::default();
        let url = share_url("https://nexus.example/board", &board).unwrap();
        assert!(url.contains("?s="));
        let back = decode_share_string(&url).unwrap();
        assert_eq!(back, board);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_share_string("not a token !!!").is_none());
        assert!(decode_share_string("").is_none());
    }

    #[test]
    fn share_string_wins_and_forces_read_only() {
        let mut shared = model::BoardData::default();
        shared.title_yellow = "SHARED".to_string();
        let token = encode_share_string(&shared).unwrap();

        let mut archived = model::BoardData::default();
        archived.title_yellow = "ARCHIVED".to_string();
        let archive_json = serde_json::to_string(&archived).unwrap();

        let (board, read_only) = hydrate(Some(&token), Some(&archive_json), "");
        assert_eq!(board.title_yellow, "SHARED");
        assert!(read_only);
    }

    #[test]
    fn bad_share_string_falls_through_to_archive() {
        let mut archived = model::BoardData::default();
        archived.title_yellow = "ARCHIVED".to_string();
        let archive_json = serde_json::to_string(&archived).unwrap();

        let (board, read_only) = hydrate(Some("garbage!!!"), Some(&archive_json), "");
        assert_eq!(board.title_yellow, "ARCHIVED");
        assert!(!read_only);
    }

    #[test]
    fn preset_beats_demo_but_not_archive() {
        let mut preset = model::BoardData::default();
        preset.title_yellow = "PRESET".to_string();
        let preset_json = serde_json::to_string(&preset).unwrap();

        let (board, read_only) = hydrate(None, None, &preset_json);
        assert_eq!(board.title_yellow, "PRESET");
        assert!(!read_only);

        let mut archived = model::BoardData::default();
        archived.title_yellow = "ARCHIVED".to_string();
        let archive_json = serde_json::to_string(&archived).unwrap();
        let (board, _) = hydrate(None, Some(&archive_json), &preset_json);
        assert_eq!(board.title_yellow, "ARCHIVED");
    }

    #[test]
    fn everything_empty_yields_demo_board() {
        let (board, read_only) = hydrate(None, None, "");
        assert_eq!(board, model::BoardData::default());
        assert!(!read_only);
    }

    #[test]
    fn export_name_carries_iso_date() {
        let name = export_file_name();
        assert!(name.starts_with("CHIRAKA_Nexus_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn year_end_dates_stay_within_twelve_months() {
        // Day 364 of a year lands past 12 * 30; the month must clamp.
        assert_eq!(iso_date_from_days(364), "1970-12-05");
        assert_eq!(iso_date_from_days(0), "1970-01-01");
        for offset in 0..365 {
            let date = iso_date_from_days(20_000 + offset);
            let month: u32 = date[5..7].parse().unwrap();
            let day: u32 = date[8..10].parse().unwrap();
            assert!((1..=12).contains(&month), "{date}");
            assert!((1..=31).contains(&day), "{date}");
        }
    }
}
