//! URL slugs for category names

use regex::Regex;
use std::sync::LazyLock;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Convert a display name into a URL slug.
///
/// Non-ASCII characters are dropped, anything that is not a word character,
/// whitespace or hyphen is removed, and runs of whitespace/hyphens collapse
/// into a single `-`. Leading and trailing separators are trimmed.
pub fn slugify(name: &str) -> String {
    let ascii: String = name.chars().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(cleaned.trim(), "-");
    joined.trim_matches(|c| c == '-' || c == '_').to_string()
}
