//! Folder naming grammar per validation level.
//!
//! | level      | epic folders                         | feature folders                               |
//! |------------|--------------------------------------|-----------------------------------------------|
//! | strict     | `E04-kebab-slug`                     | `E04-F07-kebab-slug`                          |
//! | balanced   | strict + `tech-debt`/`bugs`/`change-cards` | strict + `E09-P02-F01-slug`, `F07-slug` |
//! | permissive | any case, `-`/`_`/space separators   | any case, optional epic/project prefix        |

use std::sync::LazyLock;

use docket_core::enums::ValidationLevel;
use regex::Regex;

struct Rules {
    epic: Vec<Regex>,
    feature: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

static STRICT: LazyLock<Rules> = LazyLock::new(|| Rules {
    epic: compile(&[r"^(?P<epic>E\d{2})-(?P<slug>[a-z0-9]+(?:-[a-z0-9]+)*)$"]),
    feature: compile(&[
        r"^(?P<epic>E\d{2})-(?P<feature>F\d{2})-(?P<slug>[a-z0-9]+(?:-[a-z0-9]+)*)$",
    ]),
});

static BALANCED: LazyLock<Rules> = LazyLock::new(|| Rules {
    epic: compile(&[
        r"^(?P<epic>E\d{2})-(?P<slug>[a-z0-9][a-z0-9-]*)$",
        r"^(?P<special>tech-debt|bugs|change-cards)$",
    ]),
    feature: compile(&[
        r"^(?P<epic>E\d{2})(?:-(?P<project>P\d{2}))?-(?P<feature>F\d{2})-(?P<slug>[a-z0-9][a-z0-9-]*)$",
        r"^(?P<feature>F\d{2})-(?P<slug>[a-z0-9][a-z0-9-]*)$",
    ]),
});

static PERMISSIVE: LazyLock<Rules> = LazyLock::new(|| Rules {
    epic: compile(&[
        r"(?i)^(?P<epic>E\d{2})(?:[-_ ](?P<slug>.+))?$",
        r"(?i)^(?P<special>tech-debt|bugs|change-cards)$",
    ]),
    feature: compile(&[
        r"(?i)^(?:(?P<epic>E\d{2})[-_ ])?(?:(?P<project>P\d{2})[-_ ])?(?P<feature>F\d{2})(?:[-_ ](?P<slug>.+))?$",
    ]),
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpicName {
    pub key: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureName {
    pub key: String,
    pub epic_key: String,
    pub slug: Option<String>,
}

/// Folder-name classifier for one validation level.
#[derive(Clone, Copy)]
pub struct FolderGrammar {
    rules: &'static Rules,
}

impl FolderGrammar {
    #[must_use]
    pub fn new(level: ValidationLevel) -> Self {
        let rules: &'static Rules = match level {
            ValidationLevel::Strict => &STRICT,
            ValidationLevel::Balanced => &BALANCED,
            ValidationLevel::Permissive => &PERMISSIVE,
        };
        Self { rules }
    }

    /// Parse an epic folder name. Names that also read as a full feature name are rejected.
    #[must_use]
    pub fn epic(&self, name: &str) -> Option<EpicName> {
        if self.feature(name, None).is_some() {
            return None;
        }
        self.rules.epic.iter().find_map(|rule| {
            let caps = rule.captures(name)?;
            let key = match (caps.name("epic"), caps.name("special")) {
                (Some(epic), _) => epic.as_str().to_ascii_uppercase(),
                (None, Some(special)) => special.as_str().to_ascii_lowercase(),
                (None, None) => return None,
            };
            Some(EpicName {
                key,
                slug: caps.name("slug").map(|m| m.as_str().to_string()),
            })
        })
    }

    /// Parse a feature folder name.
    ///
    /// Short names (`F07-slug`) take their epic from `parent_epic`.
    #[must_use]
    pub fn feature(&self, name: &str, parent_epic: Option<&str>) -> Option<FeatureName> {
        self.rules.feature.iter().find_map(|rule| {
            let caps = rule.captures(name)?;
            let epic_key = match caps.name("epic") {
                Some(epic) => epic.as_str().to_ascii_uppercase(),
                None => parent_epic?.to_string(),
            };
            let feature = caps["feature"].to_ascii_uppercase();
            let key = match caps.name("project") {
                Some(project) => format!("{epic_key}-{}-{feature}", project.as_str().to_ascii_uppercase()),
                None => format!("{epic_key}-{feature}"),
            };
            Some(FeatureName {
                key,
                epic_key,
                slug: caps.name("slug").map(|m| m.as_str().to_string()),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn epic_key(level: ValidationLevel, name: &str) -> Option<String> {
        FolderGrammar::new(level).epic(name).map(|e| e.key)
    }

    fn feature_key(level: ValidationLevel, name: &str, parent: Option<&str>) -> Option<String> {
        FolderGrammar::new(level).feature(name, parent).map(|f| f.key)
    }

    #[rstest]
    #[case(ValidationLevel::Strict, "E04-user-auth", Some("E04"))]
    #[case(ValidationLevel::Strict, "tech-debt", None)]
    #[case(ValidationLevel::Strict, "E04_user_auth", None)]
    #[case(ValidationLevel::Strict, "E04-F07-login", None)]
    #[case(ValidationLevel::Balanced, "tech-debt", Some("tech-debt"))]
    #[case(ValidationLevel::Balanced, "E04-user-auth", Some("E04"))]
    #[case(ValidationLevel::Balanced, "e04-user-auth", None)]
    #[case(ValidationLevel::Permissive, "e04_User Auth", Some("E04"))]
    #[case(ValidationLevel::Permissive, "BUGS", Some("bugs"))]
    #[case(ValidationLevel::Permissive, "E04-F07-login", None)]
    #[case(ValidationLevel::Permissive, "notes", None)]
    fn epic_names(#[case] level: ValidationLevel, #[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(epic_key(level, name).as_deref(), expected);
    }

    #[rstest]
    #[case(ValidationLevel::Strict, "E04-F07-login", None, Some("E04-F07"))]
    #[case(ValidationLevel::Strict, "E09-P02-F01-sync", None, None)]
    #[case(ValidationLevel::Strict, "F07-login", Some("E04"), None)]
    #[case(ValidationLevel::Balanced, "E09-P02-F01-sync", None, Some("E09-P02-F01"))]
    #[case(ValidationLevel::Balanced, "F07-login", Some("E04"), Some("E04-F07"))]
    #[case(ValidationLevel::Balanced, "F07-login", None, None)]
    #[case(ValidationLevel::Balanced, "F01-crash", Some("bugs"), Some("bugs-F01"))]
    #[case(ValidationLevel::Permissive, "e04 f07 Login Flow", None, Some("E04-F07"))]
    #[case(ValidationLevel::Permissive, "f07", Some("E04"), Some("E04-F07"))]
    fn feature_names(
        #[case] level: ValidationLevel,
        #[case] name: &str,
        #[case] parent: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(feature_key(level, name, parent).as_deref(), expected);
    }

    #[test]
    fn slugs_are_captured() {
        let grammar = FolderGrammar::new(ValidationLevel::Balanced);
        assert_eq!(
            grammar.epic("E04-user-auth"),
            Some(EpicName {
                key: "E04".into(),
                slug: Some("user-auth".into())
            })
        );
        let feature = grammar.feature("E04-F07-login-flow", None).unwrap();
        assert_eq!(feature.epic_key, "E04");
        assert_eq!(feature.slug.as_deref(), Some("login-flow"));
    }
}
