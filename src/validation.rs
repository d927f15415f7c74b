//! Input validation for user-submitted specs, suggestions and repo identifiers.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ValidationError;

/// Minimum trimmed length of a project spec.
pub const MIN_SPEC_LEN: usize = 3;

/// Minimum trimmed length of a refinement suggestion.
pub const MIN_SUGGESTION_LEN: usize = 3;

/// Default slug length used for auto-generated repository names.
pub const DEFAULT_SLUG_LEN: usize = 28;

/// Slug used when a spec contains no alphanumeric characters.
pub const FALLBACK_SLUG: &str = "macc-project";

static REPO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<owner>[A-Za-z0-9][A-Za-z0-9._-]*)/(?P<name>[A-Za-z0-9._-]+)$")
        .expect("repo regex is a valid static pattern")
});

/// A validated `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

pub fn validate_spec(spec: &str) -> Result<&str, ValidationError> {
    let trimmed = spec.trim();
    if trimmed.chars().count() < MIN_SPEC_LEN {
        return Err(ValidationError::SpecTooShort { min: MIN_SPEC_LEN });
    }
    Ok(trimmed)
}

pub fn validate_suggestion(suggestion: &str) -> Result<&str, ValidationError> {
    let trimmed = suggestion.trim();
    if trimmed.chars().count() < MIN_SUGGESTION_LEN {
        return Err(ValidationError::SuggestionTooShort {
            min: MIN_SUGGESTION_LEN,
        });
    }
    Ok(trimmed)
}

/// Parse an optional repository identifier.
///
/// Blank input means "auto-generate a name" and yields `Ok(None)`.
pub fn parse_repo(input: &str) -> Result<Option<RepoRef>, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let malformed = || ValidationError::MalformedRepo {
        input: trimmed.to_string(),
    };
    let caps = REPO_RE.captures(trimmed).ok_or_else(malformed)?;
    let name = &caps["name"];
    if name == "." || name == ".." {
        return Err(malformed());
    }
    Ok(Some(RepoRef {
        owner: caps["owner"].to_string(),
        name: name.to_string(),
    }))
}

/// Build a repository-safe slug from free text: lowercase ASCII alphanumerics joined by `-`.
pub fn safe_slug(text: &str, max_len: usize) -> String {
    let slug = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { FALLBACK_SLUG } else { slug };
    slug.chars()
        .take(max_len)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}
