use crate::model;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::mpsc;

/// Additions proposed by an external analyzer, in the same camelCase shape as
/// board exports so an analyzer can be prompted with an export and answer in
/// kind.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct AnalysisSuggestion {
    pub characters: Vec<model::Character>,
    pub relationships: Vec<model::Relationship>,
}

pub(super) trait IntelAnalyzer: Send {
    fn analyze(&self, prompt: &str) -> Result<AnalysisSuggestion, String>;
}

/// Shells out to a user-configured command: prompt on stdin, suggestion JSON
/// on stdout.
pub(super) struct CommandAnalyzer {
    pub command: String,
}

impl IntelAnalyzer for CommandAnalyzer {
    fn analyze(&self, prompt: &str) -> Result<AnalysisSuggestion, String> {
        let mut child = std::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| format!("failed to launch analyzer: {e}"))?;
        if let Some(stdin) = child.stdin.take() {
            let mut stdin = stdin;
            stdin
                .write_all(prompt.as_bytes())
                .map_err(|e| format!("failed to feed analyzer: {e}"))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| format!("analyzer did not finish: {e}"))?;
        if !output.status.success() {
            return Err(format!("analyzer exited with {}", output.status));
        }
        let text = String::from_utf8(output.stdout)
            .map_err(|_| "analyzer produced non-UTF-8 output".to_string())?;
        serde_json::from_str(&text).map_err(|e| format!("bad analyzer output: {e}"))
    }
}

pub(super) enum Poll {
    Pending,
    Done(Result<AnalysisSuggestion, String>),
}

pub(super) struct AnalysisJob {
    rx: mpsc::Receiver<Result<AnalysisSuggestion, String>>,
}

impl AnalysisJob {
    pub fn poll(&self) -> Poll {
        match self.rx.try_recv() {
            Ok(result) => Poll::Done(result),
            Err(mpsc::TryRecvError::Empty) => Poll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                Poll::Done(Err("analyzer worker vanished".to_string()))
            }
        }
    }
}

/// Runs the analyzer on a worker thread; the UI keeps polling the returned
/// job from its update loop. There is no cancellation, results for a board
/// that changed meanwhile are defused by the merge-time staleness check.
pub(super) fn spawn(analyzer: Box<dyn IntelAnalyzer>, prompt: String) -> AnalysisJob {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = analyzer.analyze(&prompt);
        let _ = tx.send(result);
    });
    AnalysisJob { rx }
}

/// Merges a suggestion into the board. Characters with fresh ids are added
/// (blank ids get one minted); suggested relationships are dropped unless
/// both endpoints exist after the character pass and the id is unused.
/// Returns how many entities were added.
pub(super) fn apply_suggestion(
    board: &mut model::BoardData,
    suggestion: AnalysisSuggestion,
) -> usize {
    let mut added = 0;
    for mut c in suggestion.characters {
        if c.id.is_empty() {
            c.id = format!("c-{}", uuid::Uuid::now_v7());
        }
        if board.character(&c.id).is_some() {
            continue;
        }
        board.characters.push(c);
        added += 1;
    }
    for mut r in suggestion.relationships {
        if r.id.is_empty() {
            r.id = format!("r-{}", uuid::Uuid::now_v7());
        }
        if board.relationship(&r.id).is_some() {
            continue;
        }
        if board.character(&r.from_id).is_none() || board.character(&r.to_id).is_none() {
            continue;
        }
        board.relationships.push(r);
        added += 1;
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Character, Point, Relationship};

    struct Scripted(Result<AnalysisSuggestion, String>);

    impl IntelAnalyzer for Scripted {
        fn analyze(&self, _prompt: &str) -> Result<AnalysisSuggestion, String> {
            self.0.clone()
        }
    }

    fn character(id: &str) -> Character {
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
            group_id: None,
        }
    }

    fn rel(id: &str, from: &str, to: &str) -> Relationship {
        Relationship {
            id: id.to_string(),
            from_id: from.to_string(),
            to_id: to.to_string(),
            label: String::new(),
            description: String::new(),
            type_id: String::new(),
            is_bi_directional: false,
            is_dashed: false,
            curvature: None,
        }
    }

    #[test]
    fn worker_delivers_result_through_channel() {
        let suggestion = AnalysisSuggestion {
            characters: vec![character("n1")],
            relationships: vec![],
        };
        let job = spawn(Box::new(Scripted(Ok(suggestion.clone()))), "hint".to_string());
        let result = loop {
            match job.poll() {
                Poll::Done(result) => break result,
                Poll::Pending => std::thread::yield_now(),
            }
        };
        assert_eq!(result.unwrap(), suggestion);
    }

    #[test]
    fn worker_delivers_errors_too() {
        let job = spawn(
            Box::new(Scripted(Err("no signal".to_string()))),
            String::new(),
        );
        let result = loop {
            match job.poll() {
                Poll::Done(result) => break result,
                Poll::Pending => std::thread::yield_now(),
            }
        };
        assert_eq!(result.unwrap_err(), "no signal");
    }

    #[test]
    fn merge_drops_stale_relationships() {
        let mut board = model::BoardData::default();
        let suggestion = AnalysisSuggestion {
            characters: vec![character("c9")],
            relationships: vec![
                rel("keep", "c9", "c1"),
                // Endpoint deleted between request and response.
                rel("stale", "c9", "deleted"),
            ],
        };
        let added = apply_suggestion(&mut board, suggestion);
        assert_eq!(added, 2);
        assert!(board.relationship("keep").is_some());
        assert!(board.relationship("stale").is_none());
    }

    #[test]
    fn merge_skips_existing_ids_and_mints_blank_ones() {
        let mut board = model::BoardData::default();
        let chars_before = board.characters.len();
        let mut anonymous = character("");
        anonymous.name = "Stranger".to_string();
        let suggestion = AnalysisSuggestion {
            characters: vec![character("c1"), anonymous],
            relationships: vec![],
        };
        let added = apply_suggestion(&mut board, suggestion);
        assert_eq!(added, 1);
        assert_eq!(board.characters.len(), chars_before + 1);
        assert!(board.characters.iter().any(|c| c.name == "Stranger" && !c.id.is_empty()));
    }
}
