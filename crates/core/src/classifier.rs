//! Decides where a note belongs and moves it there.

use tracing::{debug, info, warn};

use crate::config::ClassificationConfig;
use crate::models::{Classification, MoveOutcome, Note};
use crate::paths;
use crate::rules;
use crate::store::NoteStore;

/// Pure routing decision: ignored prefix, else first matching rule, else the
/// default folder.
pub fn classify(note: &Note, config: &ClassificationConfig) -> Classification {
    if paths::is_ignored(&note.path, &config.ignored_path_prefixes) {
        return Classification::Ignored;
    }
    match rules::first_match(&config.rules, &note.tags) {
        Some(rule) => Classification::Destination(rule.folder.clone()),
        None => Classification::Destination(config.default_folder.clone()),
    }
}

/// What `classify_and_move` would do, without touching the store.
pub fn plan(note: &Note, config: &ClassificationConfig) -> MoveOutcome {
    match classify(note, config) {
        Classification::Ignored => MoveOutcome::Skipped,
        Classification::Destination(folder) if paths::same_folder(&folder, &note.folder()) => {
            MoveOutcome::AlreadyInPlace
        }
        Classification::Destination(folder) => MoveOutcome::Planned { folder },
    }
}

pub async fn classify_and_move(
    note: &Note,
    config: &ClassificationConfig,
    store: &dyn NoteStore,
) -> MoveOutcome {
    let folder = match plan(note, config) {
        MoveOutcome::Planned { folder } => folder,
        other => {
            debug!(path = %note.path, outcome = other.label(), "no move needed");
            return other;
        }
    };
    match store.move_note(&note.path, &folder).await {
        Ok(path) => {
            info!(from = %note.path, to = %path, "moved note");
            MoveOutcome::Moved { folder, path }
        }
        Err(error) => {
            warn!(path = %note.path, folder = %folder, %error, "move failed");
            MoveOutcome::MoveFailed { error }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FolderRule;

    fn scenario_config() -> ClassificationConfig {
        ClassificationConfig::new(
            vec![FolderRule::new("Person", "/03 People", "person")],
            "/02 Concepts",
            vec!["/10 Files".to_string()],
        )
    }

    #[test]
    fn untagged_note_goes_to_default_folder() {
        let cfg = scenario_config();
        let note = Note::untagged("/00 Home/z.md");
        assert_eq!(
            classify(&note, &cfg),
            Classification::Destination("/02 Concepts".into())
        );
    }

    #[test]
    fn ignored_prefix_wins_over_tags() {
        let cfg = scenario_config();
        let note = Note::new("/10 Files/x.md", ["person"]);
        assert_eq!(classify(&note, &cfg), Classification::Ignored);
        assert_eq!(plan(&note, &cfg), MoveOutcome::Skipped);
    }

    #[test]
    fn first_matching_rule_wins() {
        let cfg = ClassificationConfig::new(
            vec![FolderRule::new("A", "/A", "a"), FolderRule::new("B", "/B", "b")],
            "/Default",
            vec![],
        );
        let note = Note::new("/inbox/n.md", ["a", "b"]);
        assert_eq!(classify(&note, &cfg), Classification::Destination("/A".into()));
    }

    #[test]
    fn empty_rules_and_tags_are_legal() {
        let cfg = ClassificationConfig::new(vec![], "/", vec![]);
        let note = Note::untagged("/x.md");
        assert_eq!(classify(&note, &cfg), Classification::Destination("/".into()));
        assert_eq!(plan(&note, &cfg), MoveOutcome::AlreadyInPlace);
    }

    #[test]
    fn plan_reports_target_folder() {
        let cfg = scenario_config();
        let note = Note::new("/00 Home/y.md", ["person"]);
        assert_eq!(
            plan(&note, &cfg),
            MoveOutcome::Planned {
                folder: "/03 People".into()
            }
        );
        let placed = Note::new("/03 People/y.md", ["person"]);
        assert_eq!(plan(&placed, &cfg), MoveOutcome::AlreadyInPlace);
    }
}
