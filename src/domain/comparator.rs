//! Ordering of version-like strings, used to rank tags
//!
//! The order follows dependency-resolution conventions rather than SemVer
//! precedence: release segments compare numerically, a missing qualifier ranks
//! above any qualifier, and qualifiers compare lexically. Under SemVer
//! `1.0.0-alpha.10 > 1.0.0-alpha.2`; here it is the other way around.

use std::cmp::Ordering;

/// A version-like string split into its comparable parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparableVersion<'a> {
    raw: &'a str,
    prefix: &'a str,
    release: Vec<&'a str>,
    qualifier: Option<&'a str>,
}

impl<'a> ComparableVersion<'a> {
    /// Split `raw` into prefix, release segments and qualifier
    pub fn new(raw: &'a str) -> Self {
        let release_start = raw
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(raw.len());
        let prefix = &raw[..release_start];

        let mut release = Vec::new();
        let mut rest = &raw[release_start..];
        loop {
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits == 0 {
                break;
            }
            release.push(&rest[..digits]);
            rest = &rest[digits..];

            // only continue the release on ".<digit>"
            match rest.strip_prefix('.') {
                Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
                _ => break,
            }
        }

        let qualifier = if rest.is_empty() {
            None
        } else {
            Some(rest.strip_prefix(['-', '.', '_', '+']).unwrap_or(rest))
        };

        ComparableVersion {
            raw,
            prefix,
            release,
            qualifier,
        }
    }

    /// The original string
    pub fn as_str(&self) -> &'a str {
        self.raw
    }
}

impl Ord for ComparableVersion<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_release(&self.release, &other.release)
            .then_with(|| match (self.qualifier, other.qualifier) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
            .then_with(|| self.prefix.cmp(other.prefix))
            .then_with(|| self.raw.cmp(other.raw))
    }
}

impl PartialOrd for ComparableVersion<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_release(left: &[&str], right: &[&str]) -> Ordering {
    let len = left.len().max(right.len());
    (0..len)
        .map(|i| {
            compare_numeric(
                left.get(i).copied().unwrap_or("0"),
                right.get(i).copied().unwrap_or("0"),
            )
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Compare two digit strings by value without parsing, so any length works
fn compare_numeric(left: &str, right: &str) -> Ordering {
    let left = left.trim_start_matches('0');
    let right = right.trim_start_matches('0');
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

/// Compare two version-like strings
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    ComparableVersion::new(left).cmp(&ComparableVersion::new(right))
}

/// Sort version-like strings from highest to lowest
pub fn sort_descending<S: AsRef<str>>(versions: &mut [S]) {
    versions.sort_by(|a, b| compare_versions(b.as_ref(), a.as_ref()));
}

/// The highest version-like string, if any
pub fn highest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}
