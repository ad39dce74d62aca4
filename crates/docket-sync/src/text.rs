//! Small markdown text helpers shared by metadata extraction and discovery.

/// Title prefixes stripped from a leading `# ` heading.
const TITLE_PREFIXES: [&str; 4] = ["Task:", "PRP:", "TODO:", "WIP:"];

/// `add-user-login` -> `Add User Login`.
pub(crate) fn title_case(slug: &str) -> String {
    slug.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first `# ` heading, without work-item prefixes.
pub(crate) fn first_heading(body: &str) -> Option<String> {
    let heading = body
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))?
        .trim();
    let stripped = TITLE_PREFIXES
        .iter()
        .find_map(|prefix| {
            heading
                .get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &heading[prefix.len()..])
        })
        .unwrap_or(heading)
        .trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// First prose paragraph of `body`, joined to one line and capped at `max_chars`.
///
/// Headings before the paragraph are skipped; a heading or blank line ends it.
pub(crate) fn first_paragraph(body: &str, max_chars: usize) -> Option<String> {
    let mut lines = Vec::new();
    for line in body.lines().map(str::trim) {
        if line.starts_with('#') {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        if line.is_empty() {
            if lines.is_empty() {
                continue;
            }
            break;
        }
        lines.push(line);
    }
    let paragraph = lines.join(" ");
    let paragraph: String = paragraph.chars().take(max_chars).collect();
    let paragraph = paragraph.trim();
    (!paragraph.is_empty()).then(|| paragraph.to_string())
}

/// `Some(trimmed)` unless `value` is missing or blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
