use crate::error::{GitVersioningError, Result};
use crate::git::Repository;
use git2::Oid;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<Oid>,
    time: i64,
}

/// Mock repository for testing without actual git operations
///
/// Commits are added oldest first; `commit` moves HEAD (and the current
/// branch, unless detached) to the new commit like `git commit` would.
#[derive(Debug, Clone)]
pub struct MockRepository {
    commits: HashMap<Oid, MockCommit>,
    tags: HashMap<String, Oid>,
    head: Option<Oid>,
    branch: Option<String>,
    clean: bool,
    next_id: u32,
}

impl MockRepository {
    /// Create a new empty mock repository on branch `master`
    pub fn new() -> Self {
        MockRepository {
            commits: HashMap::new(),
            tags: HashMap::new(),
            head: None,
            branch: Some("master".to_string()),
            clean: true,
            next_id: 1,
        }
    }

    /// Deterministic OID for the n-th mock commit
    pub fn oid(n: u32) -> Oid {
        let mut bytes = [0u8; 20];
        for chunk in bytes.chunks_mut(4) {
            chunk.copy_from_slice(&n.to_be_bytes());
        }
        // from_bytes only fails for slices that are not 20 bytes long
        Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
    }

    /// Commit on top of HEAD and move HEAD to it
    pub fn commit(&mut self) -> Oid {
        let parents = self.head.into_iter().collect();
        self.commit_with_parents(parents)
    }

    /// Commit with explicit parents (first parent first) and move HEAD to it
    pub fn commit_with_parents(&mut self, parents: Vec<Oid>) -> Oid {
        let oid = Self::oid(self.next_id);
        let time = 1_600_000_000 + i64::from(self.next_id) * 60;
        self.next_id += 1;

        self.commits.insert(oid, MockCommit { parents, time });
        self.head = Some(oid);
        oid
    }

    /// Add a tag pointing to an OID
    pub fn add_tag(&mut self, name: impl Into<String>, oid: Oid) {
        self.tags.insert(name.into(), oid);
    }

    /// Tag the current HEAD
    pub fn tag_head(&mut self, name: impl Into<String>) {
        if let Some(head) = self.head {
            self.add_tag(name, head);
        }
    }

    /// Point HEAD at `oid` without a branch
    pub fn detach(&mut self, oid: Oid) {
        self.head = Some(oid);
        self.branch = None;
    }

    /// Point HEAD at `oid` on branch `name`
    pub fn checkout_branch(&mut self, name: impl Into<String>, oid: Oid) {
        self.head = Some(oid);
        self.branch = Some(name.into());
    }

    /// Set the working tree cleanliness
    pub fn set_clean(&mut self, clean: bool) {
        self.clean = clean;
    }

    fn find_commit(&self, oid: Oid) -> Result<&MockCommit> {
        self.commits
            .get(&oid)
            .ok_or_else(|| GitVersioningError::repository(format!("Commit not found: {}", oid)))
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn head_oid(&self) -> Result<Option<Oid>> {
        Ok(self.head)
    }

    fn head_branch(&self) -> Result<Option<String>> {
        Ok(self.branch.clone())
    }

    fn commit_time(&self, oid: Oid) -> Result<i64> {
        Ok(self.find_commit(oid)?.time)
    }

    fn commit_parents(&self, oid: Oid) -> Result<Vec<Oid>> {
        Ok(self.find_commit(oid)?.parents.clone())
    }

    fn tag_targets(&self) -> Result<HashMap<Oid, Vec<String>>> {
        let mut targets: HashMap<Oid, Vec<String>> = HashMap::new();
        for (name, oid) in &self.tags {
            targets.entry(*oid).or_default().push(name.clone());
        }
        Ok(targets)
    }

    fn is_clean(&self) -> Result<bool> {
        Ok(self.clean)
    }
}
