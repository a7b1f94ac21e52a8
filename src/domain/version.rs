use crate::error::{GitVersioningError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn version_regex() -> &'static Regex {
    static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();
    VERSION_REGEX.get_or_init(|| {
        Regex::new(
            r"^\D*(?<core>(?<major>\d+)(?:\.(?<minor>\d+)(?:\.(?<patch>\d+))?)?)(?:[-+._](?<label>.*))?",
        )
        .expect("version grammar is a valid regex")
    })
}

/// Semantic components extracted from a version-like string
///
/// Components keep their original text so that zero padding survives
/// (`"2024.01"` has minor `"01"`, not `1`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionExpression {
    pub core: Option<String>,
    pub major: Option<String>,
    pub minor: Option<String>,
    pub patch: Option<String>,
    pub label: Option<String>,
}

impl VersionExpression {
    /// Parse a version or tag string (e.g., "v1.2.3-rc.1")
    ///
    /// Leading non-digits are skipped, then `major(.minor(.patch)?)?` is read.
    /// Whatever follows a separator (`-`, `+`, `.`, `_`) becomes the label.
    /// A string without any digit yields an empty expression.
    pub fn parse(version: &str) -> Self {
        let Some(captures) = version_regex().captures(version) else {
            return VersionExpression::default();
        };
        let group = |name: &str| captures.name(name).map(|m| m.as_str().to_string());

        VersionExpression {
            core: group("core"),
            major: group("major"),
            minor: group("minor"),
            patch: group("patch"),
            label: group("label"),
        }
    }

    /// Core version (`major.minor.patch` as written), `"0"` when absent
    pub fn core_or_default(&self) -> &str {
        self.core.as_deref().unwrap_or("0")
    }

    /// Major component, `"0"` when absent
    pub fn major_or_default(&self) -> &str {
        self.major.as_deref().unwrap_or("0")
    }

    /// Minor component, `"0"` when absent
    pub fn minor_or_default(&self) -> &str {
        self.minor.as_deref().unwrap_or("0")
    }

    /// Patch component, `"0"` when absent
    pub fn patch_or_default(&self) -> &str {
        self.patch.as_deref().unwrap_or("0")
    }

    /// Label, empty when absent
    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }

    /// Label prefixed with `-`, or empty when there is no label
    pub fn label_prefixed(&self) -> String {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => format!("-{}", label),
            _ => String::new(),
        }
    }
}

impl fmt::Display for VersionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.core_or_default(), self.label_prefixed())
    }
}

/// Add `delta` to a numeric token, keeping the token's digit width
///
/// `increase("09", 1) == "10"`, `increase("007", 5) == "012"`. The result
/// only grows past the original width when it has to.
///
/// # Errors
/// * `InvalidIncrement` - if `token` is not an unsigned integer or the result
///   would be negative
pub fn increase(token: &str, delta: i64) -> Result<String> {
    let value: u64 = token
        .parse()
        .ok()
        .filter(|_| token.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| GitVersioningError::invalid_increment(token, delta))?;

    let increased = i128::from(value) + i128::from(delta);
    if increased < 0 {
        return Err(GitVersioningError::invalid_increment(token, delta));
    }

    Ok(format!("{:0width$}", increased, width = token.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let v = VersionExpression::parse("1.2.3");
        assert_eq!(v.core.as_deref(), Some("1.2.3"));
        assert_eq!(v.major.as_deref(), Some("1"));
        assert_eq!(v.minor.as_deref(), Some("2"));
        assert_eq!(v.patch.as_deref(), Some("3"));
        assert_eq!(v.label, None);
    }

    #[test]
    fn test_parse_skips_prefix() {
        let v = VersionExpression::parse("release-v2.0.4");
        assert_eq!(v.major.as_deref(), Some("2"));
        assert_eq!(v.patch.as_deref(), Some("4"));
    }

    #[test]
    fn test_parse_label() {
        let v = VersionExpression::parse("2.0.4-677");
        assert_eq!(v.core.as_deref(), Some("2.0.4"));
        assert_eq!(v.label.as_deref(), Some("677"));

        let v = VersionExpression::parse("1.0.0-SNAPSHOT");
        assert_eq!(v.label.as_deref(), Some("SNAPSHOT"));
    }

    #[test]
    fn test_parse_partial_version_defaults() {
        let v = VersionExpression::parse("v7");
        assert_eq!(v.major.as_deref(), Some("7"));
        assert_eq!(v.minor, None);
        assert_eq!(v.minor_or_default(), "0");
        assert_eq!(v.patch_or_default(), "0");
        assert_eq!(v.label_or_default(), "");
    }

    #[test]
    fn test_parse_four_components_puts_rest_in_label() {
        let v = VersionExpression::parse("1.2.3.4");
        assert_eq!(v.patch.as_deref(), Some("3"));
        assert_eq!(v.label.as_deref(), Some("4"));
    }

    #[test]
    fn test_parse_without_digits() {
        let v = VersionExpression::parse("unspecified");
        assert_eq!(v, VersionExpression::default());
        assert_eq!(v.major_or_default(), "0");
        assert_eq!(v.to_string(), "0");
    }

    #[test]
    fn test_parse_keeps_zero_padding() {
        let v = VersionExpression::parse("2024.01.09");
        assert_eq!(v.minor.as_deref(), Some("01"));
        assert_eq!(v.patch.as_deref(), Some("09"));
    }

    #[test]
    fn test_label_prefixed() {
        assert_eq!(VersionExpression::parse("1.0-rc1").label_prefixed(), "-rc1");
        assert_eq!(VersionExpression::parse("1.0").label_prefixed(), "");
    }

    #[test]
    fn test_display() {
        assert_eq!(VersionExpression::parse("v1.2.3-beta").to_string(), "1.2.3-beta");
    }

    #[test]
    fn test_increase() {
        assert_eq!(increase("09", 1).unwrap(), "10");
        assert_eq!(increase("9", 1).unwrap(), "10");
        assert_eq!(increase("0", 1).unwrap(), "1");
        assert_eq!(increase("007", 5).unwrap(), "012");
        assert_eq!(increase("10", -3).unwrap(), "07");
        assert_eq!(increase("677", 2).unwrap(), "679");
    }

    #[test]
    fn test_increase_negative_result_fails() {
        let err = increase("5", -6).unwrap_err();
        assert!(matches!(err, GitVersioningError::InvalidIncrement { .. }));
    }

    #[test]
    fn test_increase_non_numeric_fails() {
        assert!(increase("rc1", 1).is_err());
        assert!(increase("", 1).is_err());
        assert!(increase("+5", 1).is_err());
    }
}
