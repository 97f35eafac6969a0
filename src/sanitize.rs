use std::sync::OnceLock;

use regex::Regex;

use crate::utils::{Error, Result};

/// Turns a free-form name into a slug made of `[a-z0-9-_]` that neither
/// starts nor ends with a hyphen. Input with no usable character yields an
/// empty string.
pub fn sanitize(raw: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid = INVALID.get_or_init(|| Regex::new(r"[^a-z0-9_-]+").unwrap());
    let lowered = raw.trim().to_lowercase().replace(' ', "-");
    invalid
        .replace_all(&lowered, "")
        .trim_matches('-')
        .to_string()
}

/// Sanitized value of a name-like flag, rejecting values that sanitize to
/// nothing.
pub fn slug(flag: &str, raw: &str) -> Result<String> {
    let value = sanitize(raw);
    if value.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{flag}: '{raw}' has no usable character (allowed: a-z, 0-9, '-', '_')"
        )));
    }
    Ok(value)
}

pub fn project_name(raw: &str) -> Result<String> {
    slug("--name", raw)
}

/// Host name as used in a Traefik `Host()` rule.
pub fn host(flag: &str, raw: &str) -> Result<String> {
    let host = allowed_host(flag, raw)?;
    if host.starts_with('.') {
        return Err(Error::InvalidInput(format!(
            "{flag}: '{raw}' is a suffix, a full host name is required"
        )));
    }
    Ok(host)
}

/// Entry of an allowed-hosts list. A leading dot is accepted for suffix
/// matches such as `.local`.
pub fn allowed_host(flag: &str, raw: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^\.?[a-z0-9]([a-z0-9.-]*[a-z0-9])?$").unwrap());
    let host = raw.trim().to_lowercase();
    if host.is_empty() {
        return Err(Error::InvalidInput(format!("{flag} must not be empty")));
    }
    if !pattern.is_match(&host) {
        return Err(Error::InvalidInput(format!(
            "{flag}: '{raw}' is not a valid host name"
        )));
    }
    Ok(host)
}

/// Dotted runtime version such as `22.19.0` or `7.0`.
pub fn runtime_version(flag: &str, raw: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"^[0-9]+(\.[0-9]+)*$").unwrap());
    let version = raw.trim().trim_start_matches('v');
    if !pattern.is_match(version) {
        return Err(Error::InvalidInput(format!(
            "{flag}: '{raw}' is not a version number"
        )));
    }
    Ok(version.to_string())
}

/// Release tag of a template repository, e.g. `v1.0.0` or `1.2.3-rc.1`.
pub fn tag(raw: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^v?[0-9]+\.[0-9]+\.[0-9]+(-[0-9A-Za-z.-]+)?$").unwrap()
    });
    let tag = raw.trim();
    if !pattern.is_match(tag) {
        return Err(Error::InvalidInput(format!(
            "--version: '{raw}' is not a release tag (expected e.g. v1.0.0)"
        )));
    }
    Ok(tag.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_slug(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
            && !s.starts_with('-')
            && !s.ends_with('-')
    }

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(sanitize("My Cool App"), "my-cool-app");
        assert_eq!(sanitize("  Shop_2024  "), "shop_2024");
    }

    #[test]
    fn strips_forbidden_characters_and_edge_hyphens() {
        assert_eq!(sanitize("-/etc/passwd-"), "etcpasswd");
        assert_eq!(sanitize("ça va?"), "a-va");
        assert_eq!(sanitize(" -- name -- "), "name");
        assert_eq!(sanitize("a.b@c"), "abc");
    }

    #[test]
    fn output_is_always_a_slug() {
        let samples = [
            "Hello World",
            "---x---",
            "Ünïcödé Name",
            "tabs\tand\nnewlines",
            "_under_",
            "9lives",
            "a - b",
            "émoji 🚀 launch",
        ];
        for sample in samples {
            let out = sanitize(sample);
            assert!(is_slug(&out), "{sample:?} sanitized to {out:?}");
        }
    }

    #[test]
    fn all_invalid_input_becomes_empty() {
        for sample in ["", "   ", "!!!", "@#$%^&*()", "---", "ÉÈÀ", "🚀🚀"] {
            assert_eq!(sanitize(sample), "", "{sample:?}");
        }
    }

    #[test]
    fn empty_project_name_is_rejected() {
        assert!(matches!(project_name("***"), Err(Error::InvalidInput(_))));
        assert_eq!(project_name("My App").unwrap(), "my-app");
        let err = slug("--db-name", "!!").unwrap_err();
        assert!(err.to_string().contains("--db-name"));
    }

    #[test]
    fn validates_runtime_versions() {
        assert_eq!(runtime_version("--node-version", "v22.19.0").unwrap(), "22.19.0");
        assert_eq!(runtime_version("--node-version", "7.0").unwrap(), "7.0");
        assert!(runtime_version("--node-version", "lts").is_err());
        assert!(runtime_version("--node-version", "22.").is_err());
    }

    #[test]
    fn validates_hosts() {
        assert_eq!(host("--host", "Shop.Local").unwrap(), "shop.local");
        assert_eq!(allowed_host("--allowed-host", ".local").unwrap(), ".local");
        assert!(host("--host", ".local").is_err());
        assert!(allowed_host("--allowed-host", "..").is_err());
        assert!(host("--host", "").is_err());
        assert!(host("--host", "bad host").is_err());
        assert!(host("--host", "x`)||Host(`y").is_err());
    }

    #[test]
    fn validates_tags() {
        assert_eq!(tag("v1.0.0").unwrap(), "v1.0.0");
        assert_eq!(tag("2.10.3-rc.1").unwrap(), "2.10.3-rc.1");
        assert!(tag("main").is_err());
        assert!(tag("v1.0").is_err());
    }
}
