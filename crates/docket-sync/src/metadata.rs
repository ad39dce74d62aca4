//! Frontmatter parsing and work-item metadata extraction.
//!
//! A file may open with a YAML frontmatter block delimited by `---` lines.
//! Metadata is resolved field by field:
//!
//! | field       | first match wins                                                |
//! |-------------|-----------------------------------------------------------------|
//! | key         | frontmatter `task_key` (or `key`), filename `task_key` capture |
//! | title       | frontmatter, filename slug, first `# ` heading                  |
//! | description | frontmatter, first prose paragraph (500 chars max)              |

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::scanner::DiscoveredFile;
use crate::text::{first_heading, first_paragraph, non_blank, title_case};

/// Longest description taken from the document body.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("frontmatter block is not terminated")]
    Unterminated,

    #[error("invalid frontmatter YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Frontmatter fields Docket reads. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Frontmatter {
    #[serde(default, alias = "key")]
    pub task_key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A markdown document split into frontmatter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document<'a> {
    pub frontmatter: Option<Frontmatter>,
    pub body: &'a str,
}

/// Split `content` into the raw frontmatter YAML (if any) and the body.
///
/// # Errors
///
/// Returns `FrontmatterError::Unterminated` if an opening `---` has no closing line.
pub fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), FrontmatterError> {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok((None, content));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Ok((Some(&rest[..offset]), &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(FrontmatterError::Unterminated)
}

/// Parse `content` into frontmatter and body.
///
/// # Errors
///
/// Returns `FrontmatterError` if the block is unterminated or its YAML is invalid.
pub fn parse_document(content: &str) -> Result<Document<'_>, FrontmatterError> {
    let (yaml, body) = split_frontmatter(content)?;
    let frontmatter = match yaml {
        Some(yaml) if yaml.trim().is_empty() => Some(Frontmatter::default()),
        Some(yaml) => Some(serde_yaml::from_str(yaml)?),
        None => None,
    };
    Ok(Document { frontmatter, body })
}

/// Metadata taken from one file before its key is final.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub key: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Extract key, title and description from `file`'s `content`.
///
/// # Errors
///
/// Returns `FrontmatterError` if the frontmatter cannot be parsed; callers
/// report that as a warning and skip the file.
pub fn extract(file: &DiscoveredFile, content: &str) -> Result<ExtractedMetadata, FrontmatterError> {
    let document = parse_document(content)?;
    let frontmatter = document.frontmatter.unwrap_or_default();

    let key = non_blank(frontmatter.task_key.as_deref())
        .or_else(|| non_blank(file.matched.task_key()));

    let title = non_blank(frontmatter.title.as_deref())
        .or_else(|| non_blank(file.matched.slug()).map(|slug| title_case(&slug)))
        .or_else(|| first_heading(document.body));

    let description = non_blank(frontmatter.description.as_deref())
        .or_else(|| first_paragraph(document.body, MAX_DESCRIPTION_CHARS));

    Ok(ExtractedMetadata {
        key,
        title,
        description,
    })
}

/// File-side view of a task, compared against the stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMetadata {
    pub key: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_path: String,
    pub modified_at: DateTime<Utc>,
}

impl ParsedMetadata {
    #[must_use]
    pub fn new(key: String, extracted: ExtractedMetadata, file: &DiscoveredFile) -> Self {
        Self {
            key,
            title: extracted.title,
            description: extracted.description,
            file_path: file.path_string(),
            modified_at: file.modified_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::patterns::PatternMatch;

    fn file(name: &str, captures: &[(&str, &str)]) -> DiscoveredFile {
        DiscoveredFile {
            path: PathBuf::from("/plan").join(name),
            file_name: name.to_string(),
            epic_key: None,
            feature_key: None,
            modified_at: Utc::now(),
            matched: PatternMatch {
                pattern: "test".into(),
                captures: captures
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect::<BTreeMap<_, _>>(),
            },
        }
    }

    #[test]
    fn frontmatter_wins_over_everything() {
        let content = "---\ntask_key: T-E01-F01-004\ntitle: From FM\ndescription: FM desc\n---\n# Heading\n\nBody.\n";
        let meta = extract(
            &file("T-E01-F01-001-slug.md", &[("task_key", "T-E01-F01-001"), ("slug", "slug")]),
            content,
        )
        .unwrap();
        assert_eq!(
            meta,
            ExtractedMetadata {
                key: Some("T-E01-F01-004".into()),
                title: Some("From FM".into()),
                description: Some("FM desc".into()),
            }
        );
    }

    #[test]
    fn key_alias_is_accepted() {
        let meta = extract(&file("x.md", &[]), "---\nkey: T-E02-F03-007\n---\n").unwrap();
        assert_eq!(meta.key.as_deref(), Some("T-E02-F03-007"));
    }

    #[test]
    fn falls_back_to_filename_then_body() {
        let content = "# Task: Ignored heading\n\nFirst paragraph.\n";
        let meta = extract(
            &file("01-add-login.md", &[("number", "01"), ("slug", "add-login")]),
            content,
        )
        .unwrap();
        assert_eq!(meta.key, None);
        assert_eq!(meta.title.as_deref(), Some("Add Login"));
        assert_eq!(meta.description.as_deref(), Some("First paragraph."));
    }

    #[test]
    fn heading_title_when_no_slug() {
        let meta = extract(
            &file("T-E01-F01-001.md", &[("task_key", "T-E01-F01-001")]),
            "# Task: Build cache\n",
        )
        .unwrap();
        assert_eq!(meta.key.as_deref(), Some("T-E01-F01-001"));
        assert_eq!(meta.title.as_deref(), Some("Build cache"));
        assert_eq!(meta.description, None);
    }

    #[test]
    fn no_title_anywhere() {
        let meta = extract(&file("T-E01-F01-001.md", &[]), "Just prose.\n").unwrap();
        assert_eq!(meta.title, None);
        assert_eq!(meta.description.as_deref(), Some("Just prose."));
    }

    #[test]
    fn blank_frontmatter_values_are_ignored() {
        let meta = extract(
            &file("T-E01-F01-001.md", &[("task_key", "T-E01-F01-001")]),
            "---\ntitle: \"  \"\ntask_key: \"\"\n---\n# Heading\n",
        )
        .unwrap();
        assert_eq!(meta.key.as_deref(), Some("T-E01-F01-001"));
        assert_eq!(meta.title.as_deref(), Some("Heading"));
    }

    #[test]
    fn empty_frontmatter_block_is_valid() {
        let doc = parse_document("---\n---\nbody").unwrap();
        assert_eq!(doc.frontmatter, Some(Frontmatter::default()));
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn unterminated_frontmatter_is_an_error() {
        assert!(matches!(
            parse_document("---\ntitle: x\n# body\n"),
            Err(FrontmatterError::Unterminated)
        ));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(
            parse_document("---\ntitle: [unclosed\n---\n"),
            Err(FrontmatterError::Yaml(_))
        ));
    }

    #[test]
    fn crlf_frontmatter_is_split() {
        let (yaml, body) = split_frontmatter("---\r\ntitle: x\r\n---\r\nbody").unwrap();
        assert_eq!(yaml, Some("title: x\r\n"));
        assert_eq!(body, "body");
    }

    #[test]
    fn content_without_frontmatter_is_all_body() {
        let (yaml, body) = split_frontmatter("# Hi\n---\n").unwrap();
        assert_eq!(yaml, None);
        assert_eq!(body, "# Hi\n---\n");
    }
}
