//! Version resolution: match a rule, build placeholders, render
//!
//! [resolve] matches the rules against a [GitSituation], applies the matched
//! rule's describe overrides and returns a [Resolution]. The resolution owns
//! the global placeholder store; every render layers a short-lived child
//! store over it with the keys derived from the value being rendered.

use crate::domain::{increase, slugify, RefType, Rule, Slugifier, VersionExpression};
use crate::error::{GitVersioningError, Result};
use crate::git::GitSituation;
use crate::matcher::{match_rules, MatchOptions};
use crate::placeholder::PlaceholderStore;
use crate::template;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Formats of the `commit.timestamp.*` keys and their value without commits
const TIMESTAMP_KEYS: [(&str, &str, &str); 7] = [
    ("commit.timestamp.year", "%Y", "0000"),
    ("commit.timestamp.month", "%m", "00"),
    ("commit.timestamp.day", "%d", "00"),
    ("commit.timestamp.hour", "%H", "00"),
    ("commit.timestamp.minute", "%M", "00"),
    ("commit.timestamp.second", "%S", "00"),
    ("commit.timestamp.datetime", "%Y%m%d.%H%M%S", "00000000.000000"),
];

/// `git.commit.timestamp.datetime` format and its value without commits
const GIT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const GIT_DATETIME_ZERO: &str = "0000-00-00T00:00:00Z";

/// Components that support `.next` and `.plus.describe.distance`
const INCREMENTABLE: [&str; 4] = ["major", "minor", "patch", "label"];

/// Options for [resolve]
#[derive(Clone, Copy)]
pub struct ResolveOptions {
    /// Let tag rules match while a branch is checked out
    pub consider_tags_on_branches: bool,
    /// Applied to every rendered version
    pub slugifier: Slugifier,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            consider_tags_on_branches: false,
            slugifier: slugify,
        }
    }
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("consider_tags_on_branches", &self.consider_tags_on_branches)
            .finish_non_exhaustive()
    }
}

impl ResolveOptions {
    fn match_options(&self) -> MatchOptions {
        MatchOptions {
            consider_tags_on_branches: self.consider_tags_on_branches,
        }
    }
}

/// Match `rules` against `situation` and prepare rendering
///
/// The matched rule's `describe_tag_pattern` and `first_parent` overrides are
/// applied to the situation, which is then frozen.
///
/// # Returns
/// * `Ok(Some(Resolution))` - A rule matched
/// * `Ok(None)` - No rule matched and there is no fallback
/// * `Err` - If an override cannot be applied or the commit time is invalid
pub fn resolve<'s>(
    situation: &'s mut GitSituation,
    rules: &[Rule],
    commit_fallback: Option<&Rule>,
    options: &ResolveOptions,
) -> Result<Option<Resolution<'s>>> {
    let Some(rule_match) =
        match_rules(situation, rules, commit_fallback, &options.match_options()).matched()
    else {
        return Ok(None);
    };

    if let Some(pattern) = &rule_match.rule.describe_tag_pattern {
        situation.set_describe_tag_pattern(Some(pattern.clone()))?;
    }
    if let Some(first_parent) = rule_match.rule.first_parent {
        situation.set_first_parent(first_parent)?;
    }

    let situation: &'s GitSituation = situation;
    situation.freeze();

    let placeholders = global_placeholders(
        situation,
        rule_match.ref_type,
        &rule_match.ref_name,
        &rule_match.groups,
    )?;
    debug!(
        ref_type = %rule_match.ref_type,
        ref_name = %rule_match.ref_name,
        keys = placeholders.keys().len(),
        "built placeholder store"
    );

    Ok(Some(Resolution {
        situation,
        rule: rule_match.rule.clone(),
        ref_type: rule_match.ref_type,
        ref_name: rule_match.ref_name,
        groups: rule_match.groups,
        slugifier: options.slugifier,
        placeholders,
    }))
}

/// A matched rule ready to render versions and properties
pub struct Resolution<'s> {
    situation: &'s GitSituation,
    rule: Rule,
    ref_type: RefType,
    ref_name: String,
    groups: BTreeMap<String, String>,
    slugifier: Slugifier,
    placeholders: PlaceholderStore<'s>,
}

impl<'s> Resolution<'s> {
    pub fn ref_type(&self) -> RefType {
        self.ref_type
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn situation(&self) -> &GitSituation {
        self.situation
    }

    /// Global placeholders shared by every render
    pub fn placeholders(&self) -> &PlaceholderStore<'s> {
        &self.placeholders
    }

    /// Render the rule's version format for a project at `original_version`
    ///
    /// The result is passed through the slugifier.
    pub fn render_version(&self, original_version: &str) -> Result<String> {
        let store = self.render_store(original_version, None);
        let version = template::render(&self.rule.version_format, &store)?;
        Ok((self.slugifier)(&version))
    }

    /// Render the rule's format for property `name`
    ///
    /// # Returns
    /// * `Ok(Some(value))` - The rendered value
    /// * `Ok(None)` - If the rule has no format for `name`
    pub fn render_property(
        &self,
        original_version: &str,
        name: &str,
        original_value: &str,
    ) -> Result<Option<String>> {
        let Some(format) = self.rule.properties.get(name) else {
            return Ok(None);
        };
        let store = self.render_store(original_version, Some(original_value));
        template::render(format, &store).map(Some)
    }

    /// Render every property the rule configures
    ///
    /// Entries of `properties` without a format are returned unchanged;
    /// configured properties missing from `properties` render with an
    /// empty `${value}`.
    pub fn render_properties(
        &self,
        original_version: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let mut rendered = properties.clone();
        for name in self.rule.properties.keys() {
            let original = properties.get(name).map_or("", String::as_str);
            if let Some(value) = self.render_property(original_version, name, original)? {
                rendered.insert(name.clone(), value);
            }
        }
        Ok(rendered)
    }

    /// `git.*` properties describing the resolved situation
    pub fn git_properties(&self) -> Result<BTreeMap<String, String>> {
        let mut properties = BTreeMap::new();
        for key in ["commit", "commit.timestamp", "ref"] {
            properties.insert(
                format!("git.{}", key),
                self.placeholders.get(key)?.to_string(),
            );
        }
        properties.insert(
            "git.commit.timestamp.datetime".to_string(),
            commit_time(self.situation)?.map_or_else(
                || GIT_DATETIME_ZERO.to_string(),
                |time| time.format(GIT_DATETIME_FORMAT).to_string(),
            ),
        );
        properties.insert(
            format!("git.{}", self.ref_type.name()),
            self.ref_name.clone(),
        );
        properties.insert(
            "git.dirty".to_string(),
            (!self.situation.is_clean()).to_string(),
        );
        Ok(properties)
    }

    fn render_store(&self, original_version: &str, value: Option<&str>) -> PlaceholderStore<'_> {
        let mut store = PlaceholderStore::with_parent(&self.placeholders);

        store.put("version", original_version);
        store.put(
            "version.release",
            original_version
                .strip_suffix(SNAPSHOT_SUFFIX)
                .unwrap_or(original_version),
        );
        let original = original_version.to_string();
        put_version_keys(&mut store, "version", self.situation, move |_| {
            Ok(original.clone())
        });

        if let Some(value) = value {
            store.put("value", value);
        }
        put_groups(&mut store, &self.groups);
        store
    }
}

impl fmt::Debug for Resolution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("ref_type", &self.ref_type)
            .field("ref_name", &self.ref_name)
            .field("rule", &self.rule)
            .field("placeholders", &self.placeholders)
            .finish_non_exhaustive()
    }
}

fn global_placeholders<'s>(
    situation: &'s GitSituation,
    ref_type: RefType,
    ref_name: &str,
    groups: &BTreeMap<String, String>,
) -> Result<PlaceholderStore<'s>> {
    let mut store = PlaceholderStore::new();

    let revision = situation.head_revision();
    store.put("commit", revision);
    store.put("commit.short", revision.get(..7).unwrap_or(revision));
    store.put("commit.timestamp", situation.head_timestamp().to_string());

    let time = commit_time(situation)?;
    for (key, format, zero) in TIMESTAMP_KEYS {
        store.put_lazy(key, move |_| {
            Ok(time.map_or_else(
                || zero.to_string(),
                |time| time.format(format).to_string(),
            ))
        });
    }

    store.put("ref", ref_name);
    store.put("ref.slug", slugify(ref_name));
    if ref_type != RefType::Commit {
        store.put(ref_type.name(), ref_name);
        store.put(format!("{}.slug", ref_type.name()), slugify(ref_name));
    }

    let (dirty, snapshot) = if situation.is_clean() {
        ("", "")
    } else {
        ("-DIRTY", SNAPSHOT_SUFFIX)
    };
    store.put("dirty", dirty);
    store.put("dirty.snapshot", snapshot);

    store.put_lazy("describe", move |_| Ok(situation.describe()?.to_string()));
    store.put_lazy("describe.tag", move |_| {
        Ok(situation.describe()?.tag_or_root().to_string())
    });
    store.put_lazy("describe.distance", move |_| {
        Ok(situation.describe()?.distance.to_string())
    });
    store.put_lazy("describe.tag.version", |s| {
        Ok(VersionExpression::parse(s.get("describe.tag")?).to_string())
    });
    put_version_keys(&mut store, "describe.tag.version", situation, |s| {
        s.get("describe.tag").map(str::to_string)
    });

    put_groups(&mut store, groups);
    Ok(store)
}

fn commit_time(situation: &GitSituation) -> Result<Option<DateTime<Utc>>> {
    if !situation.has_commits() {
        return Ok(None);
    }
    let timestamp = situation.head_timestamp();
    DateTime::from_timestamp(timestamp, 0)
        .map(Some)
        .ok_or_else(|| {
            GitVersioningError::repository(format!("Commit time out of range: {}", timestamp))
        })
}

/// Register `<prefix>.core`, `.major`, ... for the version read by `source`
fn put_version_keys<'a, F>(
    store: &mut PlaceholderStore<'a>,
    prefix: &str,
    situation: &'a GitSituation,
    source: F,
) where
    F: Fn(&PlaceholderStore<'_>) -> Result<String> + Clone + Send + Sync + 'a,
{
    let parts: [(&str, fn(&VersionExpression) -> String); 6] = [
        ("core", |v: &VersionExpression| v.core_or_default().to_string()),
        ("major", |v: &VersionExpression| v.major_or_default().to_string()),
        ("minor", |v: &VersionExpression| v.minor_or_default().to_string()),
        ("patch", |v: &VersionExpression| v.patch_or_default().to_string()),
        ("label", |v: &VersionExpression| v.label_or_default().to_string()),
        ("label.prefixed", VersionExpression::label_prefixed),
    ];
    for (part, read) in parts {
        let source = source.clone();
        store.put_lazy(format!("{}.{}", prefix, part), move |s| {
            Ok(read(&VersionExpression::parse(&source(s)?)))
        });
    }

    for part in INCREMENTABLE {
        let component = format!("{}.{}", prefix, part);

        let key = component.clone();
        store.put_lazy(format!("{}.next", component), move |s| {
            increase_component(s.get(&key)?, 1)
        });

        let key = component.clone();
        store.put_lazy(
            format!("{}.plus.describe.distance", component),
            move |s| {
                let distance = i64::try_from(situation.describe()?.distance).unwrap_or(i64::MAX);
                increase_component(s.get(&key)?, distance)
            },
        );
    }
}

/// An absent component counts as `0`
fn increase_component(token: &str, delta: i64) -> Result<String> {
    increase(if token.is_empty() { "0" } else { token }, delta)
}

fn put_groups(store: &mut PlaceholderStore<'_>, groups: &BTreeMap<String, String>) {
    for (name, value) in groups {
        store.put(name.as_str(), value.as_str());
        store.put(format!("{}.slug", name), slugify(value));
    }
}
