use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of ref a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Branch,
    Tag,
    Commit,
}

impl RefType {
    /// Lowercase name, also used as placeholder key (`${branch}`, `${tag}`)
    pub fn name(&self) -> &'static str {
        match self {
            RefType::Branch => "branch",
            RefType::Tag => "tag",
            RefType::Commit => "commit",
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A regex that must match a whole ref name
#[derive(Debug, Clone)]
pub struct RefPattern {
    source: String,
    regex: Regex,
}

impl RefPattern {
    /// Compile `pattern`, anchored at both ends
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(RefPattern {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written in configuration
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whole-string match
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// Named groups of a whole-string match, `None` if `value` does not match
    ///
    /// Groups that did not participate in the match map to an empty string.
    pub fn captures(&self, value: &str) -> Option<BTreeMap<String, String>> {
        let captures = self.regex.captures(value)?;
        Some(
            self.regex
                .capture_names()
                .flatten()
                .map(|name| {
                    let group = captures.name(name).map_or("", |m| m.as_str());
                    (name.to_string(), group.to_string())
                })
                .collect(),
        )
    }
}

impl PartialEq for RefPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Versioning rule for a ref type, selected by the rule matcher
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub ref_type: RefType,
    pub pattern: Option<RefPattern>,
    pub version_format: String,
    pub properties: BTreeMap<String, String>,
    pub describe_tag_pattern: Option<RefPattern>,
    pub first_parent: Option<bool>,
}

impl Rule {
    /// Create a rule without pattern, properties or overrides
    pub fn new(ref_type: RefType, version_format: impl Into<String>) -> Self {
        Rule {
            ref_type,
            pattern: None,
            version_format: version_format.into(),
            properties: BTreeMap::new(),
            describe_tag_pattern: None,
            first_parent: None,
        }
    }

    /// Branch rule
    pub fn branch(version_format: impl Into<String>) -> Self {
        Rule::new(RefType::Branch, version_format)
    }

    /// Tag rule
    pub fn tag(version_format: impl Into<String>) -> Self {
        Rule::new(RefType::Tag, version_format)
    }

    /// Commit rule
    pub fn commit(version_format: impl Into<String>) -> Self {
        Rule::new(RefType::Commit, version_format)
    }

    /// Restrict the rule to refs matching `pattern`
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(RefPattern::new(pattern)?);
        Ok(self)
    }

    /// Add a property format
    pub fn with_property(mut self, name: impl Into<String>, format: impl Into<String>) -> Self {
        self.properties.insert(name.into(), format.into());
        self
    }

    /// Override the describe tag pattern when this rule matches
    pub fn with_describe_tag_pattern(mut self, pattern: &str) -> Result<Self> {
        self.describe_tag_pattern = Some(RefPattern::new(pattern)?);
        Ok(self)
    }

    /// Override first-parent describe walking when this rule matches
    pub fn with_first_parent(mut self, first_parent: bool) -> Self {
        self.first_parent = Some(first_parent);
        self
    }

    /// Absent pattern matches everything
    pub fn accepts(&self, ref_name: &str) -> bool {
        self.pattern.as_ref().map_or(true, |p| p.matches(ref_name))
    }
}
