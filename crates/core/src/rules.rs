use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::paths;

/// Routes notes carrying `tag` into `folder`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FolderRule {
    #[serde(alias = "type")]
    pub concept_type: String,
    pub folder: String,
    pub tag: String,
}

impl FolderRule {
    pub fn new(concept_type: &str, folder: &str, tag: &str) -> Self {
        FolderRule {
            concept_type: concept_type.to_string(),
            folder: folder.to_string(),
            tag: tag.to_string(),
        }
        .normalized()
    }

    /// Strips a leading `#` from the tag and normalizes the folder path.
    pub fn normalized(self) -> Self {
        FolderRule {
            tag: self.tag.trim().trim_start_matches('#').to_string(),
            folder: paths::normalize(&self.folder),
            concept_type: self.concept_type,
        }
    }

    /// Exact, case-sensitive tag match.
    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        tags.contains(&self.tag)
    }
}

/// First rule, in configured order, whose tag the note carries.
pub fn first_match<'a>(rules: &'a [FolderRule], tags: &BTreeSet<String>) -> Option<&'a FolderRule> {
    rules.iter().find(|rule| rule.matches(tags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_rule_in_order_wins() {
        let rules = vec![
            FolderRule::new("A", "/A", "a"),
            FolderRule::new("B", "/B", "b"),
        ];
        let hit = first_match(&rules, &tags(&["b", "a"])).unwrap();
        assert_eq!(hit.folder, "/A");
    }

    #[test]
    fn duplicate_tags_resolve_to_first_occurrence() {
        let rules = vec![
            FolderRule::new("Meeting", "/04 Meetings", "meeting"),
            FolderRule::new("Projects", "/05 Projects", "meeting"),
        ];
        let hit = first_match(&rules, &tags(&["meeting"])).unwrap();
        assert_eq!(hit.concept_type, "Meeting");
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let rules = vec![FolderRule::new("Person", "/03 People", "person")];
        assert!(first_match(&rules, &tags(&["Person"])).is_none());
        assert!(first_match(&rules, &tags(&["person/friend"])).is_none());
        assert!(first_match(&rules, &tags(&["person"])).is_some());
    }

    #[test]
    fn normalization_strips_hash_and_slashes() {
        let rule = FolderRule::new("Person", "03 People/", "#person");
        assert_eq!(rule.tag, "person");
        assert_eq!(rule.folder, "/03 People");
    }
}
