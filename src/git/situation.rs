//! Snapshot of repository state for one version resolution
//!
//! A [GitSituation] is read from a [Repository] once. Hosts may override
//! branch, tags and describe settings before placeholders are computed; once
//! a value has been observed the situation is frozen and further changes fail
//! with [GitVersioningError::StaleMutation].

use crate::domain::comparator;
use crate::domain::RefPattern;
use crate::error::{GitVersioningError, Result};
use crate::git::Repository;
use git2::Oid;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Revision reported when the repository has no commits
pub const NO_COMMIT: &str = "0000000000000000000000000000000000000000";

/// Tag name reported by `describe` when no matching ancestor tag exists
pub const DESCRIBE_ROOT: &str = "root";

/// Nearest matching ancestor tag and the number of commits since it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Describe {
    /// Head revision the description was computed for
    pub commit: String,
    /// Nearest matching tag, `None` if the searched history has none
    pub tag: Option<String>,
    /// Commits between HEAD and the tag, or all visited commits without a tag
    pub distance: usize,
    /// The walk hit `describe_max_depth` with commits left to visit
    pub truncated: bool,
}

impl Describe {
    /// Tag name, or `root` when no tag was found
    pub fn tag_or_root(&self) -> &str {
        self.tag.as_deref().unwrap_or(DESCRIBE_ROOT)
    }
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-g{}",
            self.tag_or_root(),
            self.distance,
            &self.commit[..7]
        )
    }
}

/// Read-only view of HEAD, refs and working tree for one resolution
pub struct GitSituation {
    repository: Box<dyn Repository>,
    head: Option<Oid>,
    revision: String,
    timestamp: i64,
    branch: Option<String>,
    tags: Vec<String>,
    clean: bool,
    tag_targets: HashMap<Oid, Vec<String>>,
    describe_tag_pattern: Option<RefPattern>,
    first_parent: bool,
    describe_max_depth: Option<usize>,
    describe: OnceLock<Describe>,
    observed: AtomicBool,
}

impl GitSituation {
    /// Read the current situation of `repository`
    ///
    /// Head, timestamp, branch, tags at HEAD and cleanliness are read here,
    /// once. The describe walk runs lazily on first use.
    ///
    /// # Returns
    /// * `Ok(GitSituation)` - Snapshot of the repository
    /// * `Err` - If the repository cannot be read
    pub fn from_repository<R: Repository + 'static>(repository: R) -> Result<Self> {
        let head = repository.head_oid()?;
        let timestamp = match head {
            Some(oid) => repository.commit_time(oid)?,
            None => 0,
        };
        let branch = repository.head_branch()?;
        let clean = repository.is_clean()?;
        let tag_targets = repository.tag_targets()?;

        let mut tags = head
            .and_then(|oid| tag_targets.get(&oid).cloned())
            .unwrap_or_default();
        tags.sort();

        let revision = head.map_or_else(|| NO_COMMIT.to_string(), |oid| oid.to_string());
        debug!(
            revision = %revision,
            branch = ?branch,
            tags = ?tags,
            clean,
            "read git situation"
        );

        Ok(GitSituation {
            repository: Box::new(repository),
            head,
            revision,
            timestamp,
            branch,
            tags,
            clean,
            tag_targets,
            describe_tag_pattern: None,
            first_parent: false,
            describe_max_depth: None,
            describe: OnceLock::new(),
            observed: AtomicBool::new(false),
        })
    }

    /// 40-character head revision, [NO_COMMIT] for an empty repository
    pub fn head_revision(&self) -> &str {
        &self.revision
    }

    /// Whether the repository has at least one commit
    pub fn has_commits(&self) -> bool {
        self.head.is_some()
    }

    /// Head commit time in seconds since the epoch, `0` without commits
    pub fn head_timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Current branch, `None` when detached
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Whether HEAD is detached
    pub fn is_detached(&self) -> bool {
        self.branch.is_none()
    }

    /// Tags pointing at HEAD
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether the working tree has no uncommitted modifications
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Pattern restricting describe tags, `None` accepts all tags
    pub fn describe_tag_pattern(&self) -> Option<&RefPattern> {
        self.describe_tag_pattern.as_ref()
    }

    /// Whether the describe walk only follows first parents
    pub fn first_parent(&self) -> bool {
        self.first_parent
    }

    /// Maximum number of commits the describe walk visits
    pub fn describe_max_depth(&self) -> Option<usize> {
        self.describe_max_depth
    }

    /// Override the branch; `None` detaches HEAD
    pub fn set_branch(&mut self, branch: Option<String>) -> Result<()> {
        if self.branch == branch {
            return Ok(());
        }
        self.ensure_mutable("branch")?;
        self.branch = branch;
        Ok(())
    }

    /// Override the tags pointing at HEAD
    pub fn set_tags(&mut self, mut tags: Vec<String>) -> Result<()> {
        tags.sort();
        if self.tags == tags {
            return Ok(());
        }
        self.ensure_mutable("tags")?;
        self.tags = tags;
        Ok(())
    }

    /// Override working tree cleanliness
    pub fn set_clean(&mut self, clean: bool) -> Result<()> {
        if self.clean == clean {
            return Ok(());
        }
        self.ensure_mutable("clean")?;
        self.clean = clean;
        Ok(())
    }

    /// Restrict which tags `describe` considers
    pub fn set_describe_tag_pattern(&mut self, pattern: Option<RefPattern>) -> Result<()> {
        if self.describe_tag_pattern == pattern {
            return Ok(());
        }
        self.ensure_mutable("describe tag pattern")?;
        self.describe_tag_pattern = pattern;
        Ok(())
    }

    /// Follow only first parents in the describe walk
    pub fn set_first_parent(&mut self, first_parent: bool) -> Result<()> {
        if self.first_parent == first_parent {
            return Ok(());
        }
        self.ensure_mutable("first parent")?;
        self.first_parent = first_parent;
        Ok(())
    }

    /// Cap the describe walk at `max_depth` commits
    pub fn set_describe_max_depth(&mut self, max_depth: Option<usize>) -> Result<()> {
        if self.describe_max_depth == max_depth {
            return Ok(());
        }
        self.ensure_mutable("describe max depth")?;
        self.describe_max_depth = max_depth;
        Ok(())
    }

    /// Whether placeholders have been computed from this situation
    pub fn is_frozen(&self) -> bool {
        self.observed.load(Ordering::Acquire)
    }

    /// Freeze the situation; later changes fail with `StaleMutation`
    pub(crate) fn freeze(&self) {
        self.observed.store(true, Ordering::Release);
    }

    fn ensure_mutable(&self, attribute: &str) -> Result<()> {
        if self.is_frozen() {
            return Err(GitVersioningError::stale_mutation(attribute));
        }
        Ok(())
    }

    /// Nearest matching ancestor tag and distance, computed once
    ///
    /// The walk is breadth-first from HEAD, so the first tagged commit found
    /// is the nearest one. When several matching tags point at that commit the
    /// highest version wins.
    pub fn describe(&self) -> Result<&Describe> {
        if let Some(describe) = self.describe.get() {
            return Ok(describe);
        }

        self.freeze();
        let describe = self.walk_describe()?;
        debug!(tag = ?describe.tag, distance = describe.distance, "described head");

        // a concurrent first access may have won; both computed the same value
        Ok(self.describe.get_or_init(|| describe))
    }

    /// The cached describe result, without triggering the walk
    pub fn computed_describe(&self) -> Option<&Describe> {
        self.describe.get()
    }

    fn walk_describe(&self) -> Result<Describe> {
        let Some(head) = self.head else {
            return Ok(Describe {
                commit: self.revision.clone(),
                tag: None,
                distance: 0,
                truncated: false,
            });
        };

        let mut queue = VecDeque::from([head]);
        let mut seen = HashSet::from([head]);
        let mut distance = 0;
        let mut truncated = false;

        while let Some(oid) = queue.pop_front() {
            if let Some(limit) = self.describe_max_depth {
                if distance >= limit {
                    warn!(
                        max_depth = limit,
                        "describe walk stopped before finding a matching tag"
                    );
                    truncated = true;
                    break;
                }
            }

            if let Some(tag) = self.best_tag_at(oid) {
                return Ok(Describe {
                    commit: self.revision.clone(),
                    tag: Some(tag),
                    distance,
                    truncated: false,
                });
            }
            distance += 1;

            let parents = self.repository.commit_parents(oid)?;
            let parents = if self.first_parent {
                parents.into_iter().take(1).collect()
            } else {
                parents
            };
            for parent in parents {
                if seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }

        Ok(Describe {
            commit: self.revision.clone(),
            tag: None,
            distance,
            truncated,
        })
    }

    fn best_tag_at(&self, oid: Oid) -> Option<String> {
        let tags = self.tag_targets.get(&oid)?;
        let matching = tags.iter().map(String::as_str).filter(|tag| {
            self.describe_tag_pattern
                .as_ref()
                .map_or(true, |pattern| pattern.matches(tag))
        });
        comparator::highest(matching).map(str::to_string)
    }
}

impl fmt::Debug for GitSituation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitSituation")
            .field("revision", &self.revision)
            .field("timestamp", &self.timestamp)
            .field("branch", &self.branch)
            .field("tags", &self.tags)
            .field("clean", &self.clean)
            .field("first_parent", &self.first_parent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    #[test]
    fn test_empty_repository_uses_sentinels() {
        let situation = GitSituation::from_repository(MockRepository::new()).unwrap();
        assert_eq!(situation.head_revision(), NO_COMMIT);
        assert_eq!(situation.head_timestamp(), 0);
        assert!(!situation.has_commits());
        assert!(situation.tags().is_empty());

        let describe = situation.describe().unwrap();
        assert_eq!(describe.tag, None);
        assert_eq!(describe.distance, 0);
    }

    #[test]
    fn test_describe_tag_at_head() {
        let mut repo = MockRepository::new();
        repo.commit();
        repo.tag_head("v1.0.0");

        let situation = GitSituation::from_repository(repo).unwrap();
        let describe = situation.describe().unwrap();
        assert_eq!(describe.tag.as_deref(), Some("v1.0.0"));
        assert_eq!(describe.distance, 0);
    }

    #[test]
    fn test_describe_counts_distance() {
        let mut repo = MockRepository::new();
        repo.commit();
        repo.tag_head("2.0.4-677");
        repo.commit();
        repo.commit();

        let situation = GitSituation::from_repository(repo).unwrap();
        let describe = situation.describe().unwrap();
        assert_eq!(describe.tag.as_deref(), Some("2.0.4-677"));
        assert_eq!(describe.distance, 2);
    }

    #[test]
    fn test_describe_without_tags_counts_all_commits() {
        let mut repo = MockRepository::new();
        repo.commit();
        repo.commit();
        repo.commit();

        let situation = GitSituation::from_repository(repo).unwrap();
        let describe = situation.describe().unwrap();
        assert_eq!(describe.tag, None);
        assert_eq!(describe.distance, 3);
        assert!(describe.to_string().starts_with("root-3-g"));
    }

    #[test]
    fn test_describe_picks_highest_tag_on_same_commit() {
        let mut repo = MockRepository::new();
        repo.commit();
        repo.tag_head("v1.2.0");
        repo.tag_head("v1.10.0");
        repo.tag_head("v1.9.0");

        let situation = GitSituation::from_repository(repo).unwrap();
        assert_eq!(
            situation.describe().unwrap().tag.as_deref(),
            Some("v1.10.0")
        );
    }

    #[test]
    fn test_describe_respects_tag_pattern() {
        let mut repo = MockRepository::new();
        repo.commit();
        repo.tag_head("v1.0.0");
        repo.commit();
        repo.tag_head("nightly");
        repo.commit();

        let mut situation = GitSituation::from_repository(repo).unwrap();
        situation
            .set_describe_tag_pattern(Some(RefPattern::new(r"v\d+.*").unwrap()))
            .unwrap();

        let describe = situation.describe().unwrap();
        assert_eq!(describe.tag.as_deref(), Some("v1.0.0"));
        assert_eq!(describe.distance, 2);
    }

    #[test]
    fn test_describe_first_parent_skips_merged_tags() {
        let mut repo = MockRepository::new();
        let base = repo.commit();
        repo.tag_head("v1.0.0");
        let side = repo.commit_with_parents(vec![base]);
        repo.add_tag("v2.0.0", side);
        let main = repo.commit_with_parents(vec![base]);
        repo.commit_with_parents(vec![main, side]);

        let all_parents = GitSituation::from_repository(repo.clone()).unwrap();
        assert_eq!(
            all_parents.describe().unwrap().tag.as_deref(),
            Some("v2.0.0")
        );

        let mut first_parent = GitSituation::from_repository(repo).unwrap();
        first_parent.set_first_parent(true).unwrap();
        let describe = first_parent.describe().unwrap();
        assert_eq!(describe.tag.as_deref(), Some("v1.0.0"));
        assert_eq!(describe.distance, 2);
    }

    #[test]
    fn test_describe_max_depth_stops_walk() {
        let mut repo = MockRepository::new();
        repo.commit();
        repo.tag_head("v1.0.0");
        for _ in 0..5 {
            repo.commit();
        }

        let mut situation = GitSituation::from_repository(repo).unwrap();
        situation.set_describe_max_depth(Some(3)).unwrap();
        let describe = situation.describe().unwrap();
        assert_eq!(describe.tag, None);
        assert_eq!(describe.distance, 3);
        assert!(describe.truncated);
    }

    #[test]
    fn test_mutation_after_describe_is_stale() {
        let mut repo = MockRepository::new();
        repo.commit();
        let mut situation = GitSituation::from_repository(repo).unwrap();

        situation.set_branch(Some("develop".to_string())).unwrap();
        situation.describe().unwrap();

        let err = situation.set_first_parent(true).unwrap_err();
        assert!(matches!(err, GitVersioningError::StaleMutation(_)));
        assert!(situation.set_branch(None).is_err());
        // unchanged values are not mutations
        assert!(situation.set_branch(Some("develop".to_string())).is_ok());
    }

    #[test]
    fn test_detached_situation() {
        let mut repo = MockRepository::new();
        let oid = repo.commit();
        repo.detach(oid);

        let situation = GitSituation::from_repository(repo).unwrap();
        assert!(situation.is_detached());
        assert_eq!(situation.branch(), None);
        assert_eq!(situation.head_revision(), oid.to_string());
    }
}
