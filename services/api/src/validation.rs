//! Input validation for pages, templates and sections

use std::sync::OnceLock;

use regex::Regex;

pub const MAX_SLUG_LENGTH: usize = 100;
pub const MAX_NAME_LENGTH: usize = 200;

fn slug_regex() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid slug pattern"))
}

/// Lowercase alphanumeric words joined by single dashes
pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("Slug is required".to_string());
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(format!("Slug must be at most {MAX_SLUG_LENGTH} characters"));
    }
    if !slug_regex().is_match(slug) {
        return Err(
            "Slug may only contain lowercase letters, digits and single dashes".to_string(),
        );
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("Name must be at most {MAX_NAME_LENGTH} characters"));
    }
    Ok(())
}

pub fn validate_section_type(section_type: &str) -> Result<(), String> {
    if section_type.trim().is_empty() {
        return Err("Section type is required".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dashed_slugs() {
        for slug in ["launch", "spring-sale-2025", "a1-b2-c3"] {
            assert!(validate_slug(slug).is_ok(), "{slug}");
        }
    }

    #[test]
    fn rejects_malformed_slugs() {
        for slug in ["", "Launch", "double--dash", "-leading", "trailing-", "with space", "ü"] {
            assert!(validate_slug(slug).is_err(), "{slug}");
        }
        assert!(validate_slug(&"a".repeat(MAX_SLUG_LENGTH + 1)).is_err());
        assert!(validate_slug(&"a".repeat(MAX_SLUG_LENGTH)).is_ok());
    }

    #[test]
    fn name_bounds() {
        assert!(validate_name("Launch").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"n".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }
}
