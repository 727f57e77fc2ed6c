//! Revert and undo planning.
//!
//! Both operations produce an [`EditDraft`] that is saved through the normal
//! edit path. Revert copies a historical revision verbatim and cannot
//! conflict. Undo reverses a single historical change by patching the
//! page's *current* content, and reports a conflict instead of guessing
//! when the patch does not apply cleanly.

use serde::{Deserialize, Serialize};

use crate::diff::{cleanup_semantic, diff, DiffOp, DiffOptions};
use crate::history::Author;
use crate::patch::PatchEngine;
use crate::types::{DbId, Timestamp};

/// The parts of a stored revision that planning needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionSnapshot {
    pub id: DbId,
    pub content: String,
    pub author: Author,
    pub created_at: Timestamp,
}

/// Content and edit summary ready to populate an edit form or be saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDraft {
    pub content: String,
    pub description: String,
}

/// An undo whose reverse patch did not apply to the current content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndoConflict {
    /// Revision preceding the undone one; `None` when the undone revision
    /// was the first.
    pub from_revision_id: Option<DbId>,
    /// The revision whose change was being undone.
    pub to_revision_id: DbId,
    pub failed_hunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Ready(EditDraft),
    Conflict(UndoConflict),
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Largest fraction of a hunk's context that may have changed before an
/// undo hunk counts as a conflict. An engine configured stricter keeps its
/// own limit.
pub const UNDO_CONTEXT_THRESHOLD: f64 = 0.2;

/// Edit summary for reverting to `target`.
pub fn revert_summary(target: &RevisionSnapshot) -> String {
    let time = target.created_at.format(TIME_FORMAT);
    match target.author.username() {
        Some(user) => format!("Reverted to revision of {time} by {user}."),
        None => format!("Reverted to anonymous revision of {time}."),
    }
}

/// Edit summary for undoing `target`.
pub fn undo_summary(target: &RevisionSnapshot) -> String {
    let time = target.created_at.format(TIME_FORMAT);
    match target.author.username() {
        Some(user) => format!("Undid revision of {time} by {user}."),
        None => format!("Undid anonymous revision of {time}."),
    }
}

/// Draft that restores the content of `target` exactly.
pub fn plan_revert(target: &RevisionSnapshot) -> EditDraft {
    EditDraft {
        content: target.content.clone(),
        description: revert_summary(target),
    }
}

/// Reverse the change introduced by `target` on top of `current_content`.
///
/// The reverse patch is built from `target`'s content back to `preceding`'s
/// (empty when `target` was the first revision) and fuzzily applied to the
/// current content. A hunk whose surrounding text drifted by more than
/// [`UNDO_CONTEXT_THRESHOLD`] fails. Any failed hunk turns the whole undo
/// into a conflict; nothing is partially applied.
pub fn plan_undo(
    target: &RevisionSnapshot,
    preceding: Option<&RevisionSnapshot>,
    current_content: &str,
    engine: &PatchEngine,
) -> UndoOutcome {
    let prior = preceding.map_or("", |p| p.content.as_str());
    let patches = engine.make(&target.content, prior);
    let threshold = engine
        .config
        .context_threshold
        .map_or(UNDO_CONTEXT_THRESHOLD, |t| t.min(UNDO_CONTEXT_THRESHOLD));
    let (content, results) = engine
        .with_context_threshold(threshold)
        .apply(&patches, current_content);

    let failed_hunks = results.iter().filter(|ok| !**ok).count();
    if failed_hunks > 0 {
        return UndoOutcome::Conflict(UndoConflict {
            from_revision_id: preceding.map(|p| p.id),
            to_revision_id: target.id,
            failed_hunks,
        });
    }

    UndoOutcome::Ready(EditDraft {
        content,
        description: undo_summary(target),
    })
}

// ---------------------------------------------------------------------------
// Diff view
// ---------------------------------------------------------------------------

/// One display fragment of a revision comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffFragment {
    pub kind: DiffOp,
    pub text: String,
}

/// Human-oriented diff between two revision contents: line mode first,
/// then semantic cleanup so fragments break on words and lines.
pub fn diff_view(from: &str, to: &str, options: &DiffOptions) -> Vec<DiffFragment> {
    let options = DiffOptions {
        line_mode: true,
        ..options.clone()
    };
    let mut diffs = diff(from, to, &options);
    cleanup_semantic(&mut diffs);
    diffs
        .into_iter()
        .map(|d| DiffFragment {
            kind: d.op,
            text: d.text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn snapshot(id: DbId, content: &str, author: Author) -> RevisionSnapshot {
        RevisionSnapshot {
            id,
            content: content.to_string(),
            author,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap() + chrono::Duration::minutes(id),
        }
    }

    fn history() -> Vec<RevisionSnapshot> {
        vec![
            snapshot(1, "", Author::user(1, "ada")),
            snapshot(2, "Hello", Author::user(1, "ada")),
            snapshot(3, "Hello World", Author::user(2, "grace")),
        ]
    }

    // -- revert --------------------------------------------------------------

    #[test]
    fn revert_copies_content_verbatim() {
        let target = snapshot(9, "Y", Author::user(1, "ada"));
        let draft = plan_revert(&target);
        assert_eq!(draft.content, "Y");
        assert_eq!(
            draft.description,
            "Reverted to revision of 2024-03-01 09:39 by ada."
        );
    }

    #[test]
    fn revert_summary_for_anonymous_author() {
        let target = snapshot(2, "Y", Author::Anonymous);
        assert_eq!(
            revert_summary(&target),
            "Reverted to anonymous revision of 2024-03-01 09:32."
        );
    }

    // -- undo ----------------------------------------------------------------

    #[test]
    fn undo_latest_change_restores_previous_text() {
        let revs = history();
        let outcome = plan_undo(&revs[2], Some(&revs[1]), "Hello World", &PatchEngine::default());
        assert_matches!(outcome, UndoOutcome::Ready(draft) => {
            assert_eq!(draft.content, "Hello");
            assert_eq!(draft.description, "Undid revision of 2024-03-01 09:33 by grace.");
        });
    }

    #[test]
    fn undo_older_change_keeps_later_edits() {
        let engine = PatchEngine::default();
        let target = snapshot(2, "Intro.\n\nAlpha paragraph.\n\nOmega paragraph.\n", Author::Anonymous);
        let preceding = snapshot(1, "Intro.\n\nOmega paragraph.\n", Author::Anonymous);
        let current = "Intro text.\n\nAlpha paragraph.\n\nOmega paragraph, revised.\n";
        let outcome = plan_undo(&target, Some(&preceding), current, &engine);
        assert_matches!(outcome, UndoOutcome::Ready(draft) => {
            assert_eq!(draft.content, "Intro text.\n\nOmega paragraph, revised.\n");
            assert_eq!(draft.description, "Undid anonymous revision of 2024-03-01 09:32.");
        });
    }

    #[test]
    fn undo_conflict_when_text_diverged() {
        let revs = history();
        let outcome = plan_undo(&revs[1], Some(&revs[0]), "Goodbye World", &PatchEngine::default());
        assert_matches!(outcome, UndoOutcome::Conflict(conflict) => {
            assert_eq!(conflict.from_revision_id, Some(1));
            assert_eq!(conflict.to_revision_id, 2);
            assert!(conflict.failed_hunks >= 1);
        });
    }

    #[test]
    fn undo_latest_change_conflicts_after_rewrite() {
        let revs = history();
        let outcome = plan_undo(&revs[2], Some(&revs[1]), "Goodbye World", &PatchEngine::default());
        assert_matches!(outcome, UndoOutcome::Conflict(conflict) => {
            assert_eq!(conflict.from_revision_id, Some(2));
            assert_eq!(conflict.to_revision_id, 3);
            assert!(conflict.failed_hunks >= 1);
        });
    }

    #[test]
    fn undo_keeps_engine_stricter_context_threshold() {
        let revs = history();
        let engine = PatchEngine::default().with_context_threshold(0.0);
        let outcome = plan_undo(&revs[2], Some(&revs[1]), "Hello World!", &engine);
        assert_matches!(outcome, UndoOutcome::Conflict(_));
    }

    #[test]
    fn undo_first_revision_diffs_against_empty() {
        let target = snapshot(1, "Hello", Author::user(1, "ada"));
        let outcome = plan_undo(&target, None, "Hello", &PatchEngine::default());
        assert_matches!(outcome, UndoOutcome::Ready(draft) => {
            assert_eq!(draft.content, "");
        });
    }

    #[test]
    fn undo_first_revision_conflict_has_no_from_revision() {
        let target = snapshot(1, "Hello", Author::user(1, "ada"));
        let outcome = plan_undo(&target, None, "Goodbye World", &PatchEngine::default());
        assert_matches!(outcome, UndoOutcome::Conflict(conflict) => {
            assert_eq!(conflict.from_revision_id, None);
            assert_eq!(conflict.to_revision_id, 1);
        });
    }

    #[test]
    fn undo_of_no_op_revision_is_identity() {
        let target = snapshot(2, "Same", Author::Anonymous);
        let preceding = snapshot(1, "Same", Author::Anonymous);
        let outcome = plan_undo(&target, Some(&preceding), "Changed since", &PatchEngine::default());
        assert_matches!(outcome, UndoOutcome::Ready(draft) => {
            assert_eq!(draft.content, "Changed since");
        });
    }

    // -- diff view -----------------------------------------------------------

    #[test]
    fn diff_view_reconstructs_both_sides() {
        let from = "The cat sat.\nOn the mat.\n";
        let to = "The cow sat.\nOn the mat.\nThe end.\n";
        let fragments = diff_view(from, to, &DiffOptions::default());
        let source: String = fragments
            .iter()
            .filter(|f| f.kind != DiffOp::Insert)
            .map(|f| f.text.as_str())
            .collect();
        let target: String = fragments
            .iter()
            .filter(|f| f.kind != DiffOp::Delete)
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(source, from);
        assert_eq!(target, to);
    }

    #[test]
    fn diff_view_of_identical_revisions_is_single_equal() {
        let fragments = diff_view("same", "same", &DiffOptions::default());
        assert_eq!(
            fragments,
            vec![DiffFragment {
                kind: DiffOp::Equal,
                text: "same".into()
            }]
        );
    }
}
