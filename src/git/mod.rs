//! Git access abstraction layer
//!
//! This module provides a trait-based abstraction over the read-only git
//! queries version resolution needs, allowing for multiple implementations
//! including real git repositories and in-memory mocks for testing.
//!
//! # Overview
//!
//! The primary abstraction is the [Repository] trait. The concrete
//! implementations include:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: A mock implementation for testing
//!
//! [GitSituation] takes a snapshot of a repository once and answers every
//! later question (including the `git describe` style ancestor search) from
//! that snapshot.
//!
//! # Usage
//!
//! ```rust
//! # use git_versioning::git::{GitSituation, Repository};
//! # fn example<R: Repository + 'static>(repo: R) -> Result<(), Box<dyn std::error::Error>> {
//! let situation = GitSituation::from_repository(repo)?;
//! let describe = situation.describe()?;
//! println!("{:?} +{}", describe.tag, describe.distance);
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;
pub mod situation;

pub use mock::MockRepository;
pub use repository::Git2Repository;
pub use situation::{Describe, GitSituation, NO_COMMIT};

use crate::error::Result;
use git2::Oid;
use std::collections::HashMap;

/// Read-only git operations needed to build a [GitSituation]
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync` so that a situation (and the
/// placeholder stores borrowing it) can be shared across threads.
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map
/// underlying errors (like `git2::Error`) to
/// [crate::error::GitVersioningError] variants.
pub trait Repository: Send + Sync {
    /// OID of the commit HEAD resolves to
    ///
    /// # Returns
    /// * `Ok(Some(Oid))` - HEAD points at a commit
    /// * `Ok(None)` - The repository has no commits yet
    fn head_oid(&self) -> Result<Option<Oid>>;

    /// Name of the branch HEAD is attached to
    ///
    /// For an empty repository this is the unborn branch HEAD names.
    ///
    /// # Returns
    /// * `Ok(Some(name))` - Short branch name (e.g., "main")
    /// * `Ok(None)` - HEAD is detached
    fn head_branch(&self) -> Result<Option<String>>;

    /// Commit time of `oid` in seconds since the Unix epoch
    fn commit_time(&self, oid: Oid) -> Result<i64>;

    /// Parent OIDs of `oid`, first parent first
    fn commit_parents(&self, oid: Oid) -> Result<Vec<Oid>>;

    /// All tags, keyed by the commit they (possibly after peeling) point to
    ///
    /// Handles both lightweight and annotated tags. Tags on non-commit
    /// objects are left out.
    fn tag_targets(&self) -> Result<HashMap<Oid, Vec<String>>>;

    /// Whether the working tree has no uncommitted modifications
    ///
    /// Untracked files count as modifications, ignored files do not.
    fn is_clean(&self) -> Result<bool>;
}

impl<R: Repository + ?Sized> Repository for Box<R> {
    fn head_oid(&self) -> Result<Option<Oid>> {
        (**self).head_oid()
    }

    fn head_branch(&self) -> Result<Option<String>> {
        (**self).head_branch()
    }

    fn commit_time(&self, oid: Oid) -> Result<i64> {
        (**self).commit_time(oid)
    }

    fn commit_parents(&self, oid: Oid) -> Result<Vec<Oid>> {
        (**self).commit_parents(oid)
    }

    fn tag_targets(&self) -> Result<HashMap<Oid, Vec<String>>> {
        (**self).tag_targets()
    }

    fn is_clean(&self) -> Result<bool> {
        (**self).is_clean()
    }
}
