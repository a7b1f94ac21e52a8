use crate::error::{GitVersioningError, Result};
use git2::{ErrorCode, Oid, Repository as Git2Repo, StatusOptions};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Wrapper around git2::Repository with our trait interface
///
/// `git2::Repository` is `Send` but not `Sync`; access goes through a mutex.
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn repo(&self) -> Result<MutexGuard<'_, Git2Repo>> {
        self.repo
            .lock()
            .map_err(|_| GitVersioningError::repository("repository handle is poisoned"))
    }
}

impl super::Repository for Git2Repository {
    fn head_oid(&self) -> Result<Option<Oid>> {
        let repo = self.repo()?;

        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        let commit = head.peel_to_commit()?;
        Ok(Some(commit.id()))
    }

    fn head_branch(&self) -> Result<Option<String>> {
        let repo = self.repo()?;

        if repo.head_detached()? {
            return Ok(None);
        }

        // read HEAD itself so that an unborn branch still has a name
        let head = repo.find_reference("HEAD")?;
        let branch = head
            .symbolic_target()
            .map(|target| target.trim_start_matches("refs/heads/").to_string());

        Ok(branch)
    }

    fn commit_time(&self, oid: Oid) -> Result<i64> {
        let repo = self.repo()?;
        let commit = repo.find_commit(oid)?;

        Ok(commit.time().seconds())
    }

    fn commit_parents(&self, oid: Oid) -> Result<Vec<Oid>> {
        let repo = self.repo()?;
        let commit = repo.find_commit(oid)?;

        Ok(commit.parent_ids().collect())
    }

    fn tag_targets(&self) -> Result<HashMap<Oid, Vec<String>>> {
        let repo = self.repo()?;
        let mut targets: HashMap<Oid, Vec<String>> = HashMap::new();

        for reference in repo.references_glob("refs/tags/*")? {
            let reference = reference?;
            let Some(name) = reference.shorthand() else {
                continue;
            };
            let name = name.to_string();

            // tags on trees or blobs cannot be an ancestor of HEAD
            if let Ok(commit) = reference.peel_to_commit() {
                targets.entry(commit.id()).or_default().push(name);
            }
        }

        Ok(targets)
    }

    fn is_clean(&self) -> Result<bool> {
        let repo = self.repo()?;

        if repo.is_bare() {
            return Ok(true);
        }

        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = repo.statuses(Some(&mut options))?;

        Ok(statuses.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;

    #[test]
    fn test_git2_repository_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        Git2Repo::init(dir.path()).unwrap();

        let repo = Git2Repository::open(dir.path()).unwrap();
        assert_eq!(repo.head_oid().unwrap(), None);
        assert!(repo.tag_targets().unwrap().is_empty());
        assert!(repo.is_clean().unwrap());
        assert!(repo.head_branch().unwrap().is_some());
    }
}
