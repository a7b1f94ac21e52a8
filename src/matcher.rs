//! Selection of the versioning rule that applies to a [GitSituation]
//!
//! Rule order is precedence. Branch and tag rules are tried first, in list
//! order; commit rules from the list come next; the commit fallback, when
//! configured, catches everything else. Nothing matching is a normal outcome
//! ([MatchOutcome::NoMatch]) so the host decides whether to skip versioning.

use crate::domain::{comparator, RefType, Rule};
use crate::error::{GitVersioningError, Result};
use crate::git::GitSituation;
use std::collections::BTreeMap;
use tracing::debug;

/// Options influencing rule matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Let tag rules match while a branch is checked out
    pub consider_tags_on_branches: bool,
}

/// The rule that matched and the concrete ref it matched
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch<'r> {
    pub rule: &'r Rule,
    pub ref_type: RefType,
    pub ref_name: String,
    /// Named groups of the rule pattern captured from the ref name
    pub groups: BTreeMap<String, String>,
}

/// Result of matching rules against a situation
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'r> {
    Matched(RuleMatch<'r>),
    NoMatch,
}

impl<'r> MatchOutcome<'r> {
    /// The match, or `NoMatch` as an error for hosts treating it as fatal
    pub fn require(self) -> Result<RuleMatch<'r>> {
        match self {
            MatchOutcome::Matched(rule_match) => Ok(rule_match),
            MatchOutcome::NoMatch => Err(GitVersioningError::NoMatch),
        }
    }

    /// The match, if any
    pub fn matched(self) -> Option<RuleMatch<'r>> {
        match self {
            MatchOutcome::Matched(rule_match) => Some(rule_match),
            MatchOutcome::NoMatch => None,
        }
    }
}

/// Find the first rule matching `situation`
///
/// * Branch rules are skipped while detached; otherwise they match when their
///   pattern (absent = any) matches the whole branch name.
/// * Tag rules are only tried while detached, or on a branch when
///   `options.consider_tags_on_branches` is set. Tags at HEAD are tried from
///   the highest version down; the first one the pattern accepts wins.
/// * Commit rules from `rules` match the head revision.
/// * `commit_fallback` matches unconditionally.
pub fn match_rules<'r>(
    situation: &GitSituation,
    rules: &'r [Rule],
    commit_fallback: Option<&'r Rule>,
    options: &MatchOptions,
) -> MatchOutcome<'r> {
    let ref_rules = rules
        .iter()
        .filter(|rule| rule.ref_type != RefType::Commit);
    for rule in ref_rules {
        let candidate = match rule.ref_type {
            RefType::Branch => match_branch(situation, rule),
            RefType::Tag => match_tag(situation, rule, options),
            RefType::Commit => None,
        };
        if let Some(rule_match) = candidate {
            debug!(
                ref_type = %rule_match.ref_type,
                ref_name = %rule_match.ref_name,
                "matched ref rule"
            );
            return MatchOutcome::Matched(rule_match);
        }
    }

    let commit_rules = rules
        .iter()
        .filter(|rule| rule.ref_type == RefType::Commit);
    for rule in commit_rules {
        if rule.accepts(situation.head_revision()) {
            debug!(revision = situation.head_revision(), "matched commit rule");
            return MatchOutcome::Matched(commit_match(situation, rule));
        }
    }

    if let Some(rule) = commit_fallback {
        debug!(revision = situation.head_revision(), "using commit fallback");
        return MatchOutcome::Matched(RuleMatch {
            rule,
            ref_type: RefType::Commit,
            ref_name: situation.head_revision().to_string(),
            groups: BTreeMap::new(),
        });
    }

    debug!(
        branch = ?situation.branch(),
        tags = ?situation.tags(),
        "no rule matched"
    );
    MatchOutcome::NoMatch
}

fn match_branch<'r>(situation: &GitSituation, rule: &'r Rule) -> Option<RuleMatch<'r>> {
    let branch = situation.branch()?;
    ref_match(rule, RefType::Branch, branch)
}

fn match_tag<'r>(
    situation: &GitSituation,
    rule: &'r Rule,
    options: &MatchOptions,
) -> Option<RuleMatch<'r>> {
    if !situation.is_detached() && !options.consider_tags_on_branches {
        return None;
    }

    let mut tags: Vec<&str> = situation.tags().iter().map(String::as_str).collect();
    comparator::sort_descending(&mut tags);

    tags.into_iter()
        .find_map(|tag| ref_match(rule, RefType::Tag, tag))
}

fn commit_match<'r>(situation: &GitSituation, rule: &'r Rule) -> RuleMatch<'r> {
    let revision = situation.head_revision();
    let groups = rule
        .pattern
        .as_ref()
        .and_then(|pattern| pattern.captures(revision))
        .unwrap_or_default();

    RuleMatch {
        rule,
        ref_type: RefType::Commit,
        ref_name: revision.to_string(),
        groups,
    }
}

fn ref_match<'r>(rule: &'r Rule, ref_type: RefType, ref_name: &str) -> Option<RuleMatch<'r>> {
    let groups = match &rule.pattern {
        Some(pattern) => pattern.captures(ref_name)?,
        None => BTreeMap::new(),
    };

    Some(RuleMatch {
        rule,
        ref_type,
        ref_name: ref_name.to_string(),
        groups,
    })
}
