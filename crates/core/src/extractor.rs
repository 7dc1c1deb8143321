//! Tag extraction from markdown notes: YAML frontmatter `tags`/`tag` plus
//! inline `#tags` in the body.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn inline_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[\s(])#([\p{L}\p{N}_/-]+)").expect("inline tag pattern is valid")
    })
}

/// Splits `content` into its frontmatter block (without fences) and body.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let rest = match content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    {
        Some(rest) => rest,
        None => return (None, content),
    };
    if let Some(body) = rest.strip_prefix("---\n").or_else(|| rest.strip_prefix("---\r\n")) {
        return (Some(""), body);
    }
    let closing = rest
        .find("\n---\n")
        .map(|i| (i, i + 5))
        .or_else(|| rest.find("\n---\r\n").map(|i| (i, i + 6)))
        .or_else(|| rest.ends_with("\n---").then(|| (rest.len() - 4, rest.len())));
    match closing {
        Some((yaml_end, body_start)) => (Some(&rest[..yaml_end]), &rest[body_start..]),
        None => (None, content),
    }
}

/// Every tag in the note, without leading `#`.
pub fn extract_tags(content: &str) -> BTreeSet<String> {
    let (frontmatter, body) = split_frontmatter(content);
    let mut tags = BTreeSet::new();
    if let Some(yaml) = frontmatter {
        tags.extend(frontmatter_tags(yaml));
    }
    tags.extend(inline_tags(body));
    tags
}

fn frontmatter_tags(yaml: &str) -> Vec<String> {
    let value: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let mut out = Vec::new();
    for key in ["tags", "tag"] {
        match value.get(key) {
            Some(serde_yaml::Value::Sequence(items)) => {
                for item in items {
                    match item {
                        serde_yaml::Value::String(s) => out.extend(clean(s)),
                        serde_yaml::Value::Number(n) => out.extend(clean(&n.to_string())),
                        _ => {}
                    }
                }
            }
            Some(serde_yaml::Value::String(s)) => {
                for part in s.split([',', ' ']) {
                    out.extend(clean(part));
                }
            }
            _ => {}
        }
    }
    out
}

fn inline_tags(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut fence: Option<&str> = None;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if let Some(open) = fence {
            if trimmed.starts_with(open) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }
        for cap in inline_tag_re().captures_iter(line) {
            let tag = cap[1].trim_end_matches('/');
            if !tag.is_empty() && !tag.chars().all(|c| c.is_ascii_digit()) {
                out.push(tag.to_string());
            }
        }
    }
    out
}

fn clean(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#');
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reads_frontmatter_list() {
        let note = "---\ntitle: Ada\ntags:\n  - person\n  - \"#friend\"\n---\n# Ada\n";
        assert_eq!(extract_tags(note), set(&["person", "friend"]));
    }

    #[test]
    fn reads_frontmatter_string_forms() {
        let note = "---\ntags: person, meeting/1-1\n---\nbody\n";
        assert_eq!(extract_tags(note), set(&["person", "meeting/1-1"]));
        let single = "---\ntag: concept\n---\n";
        assert_eq!(extract_tags(single), set(&["concept"]));
    }

    #[test]
    fn reads_inline_tags_outside_code() {
        let note = "# Heading\nMet #person today (#meeting/1-1).\n```\n#notatag\n```\nissue #42 and url http://x.io/#frag\n";
        assert_eq!(extract_tags(note), set(&["person", "meeting/1-1"]));
    }

    #[test]
    fn merges_both_sources() {
        let note = "---\ntags: [concept]\n---\nSee #project\n";
        assert_eq!(extract_tags(note), set(&["concept", "project"]));
    }

    #[test]
    fn broken_frontmatter_contributes_nothing() {
        let note = "---\ntags: [unclosed\n---\nplain #inline\n";
        assert_eq!(extract_tags(note), set(&["inline"]));
    }

    #[test]
    fn no_frontmatter_means_whole_text_is_body() {
        let (fm, body) = split_frontmatter("hello #world");
        assert!(fm.is_none());
        assert_eq!(body, "hello #world");
        assert!(extract_tags("").is_empty());
    }
}
