//! Domain logic - pure versioning rules independent of git access

pub mod comparator;
pub mod rule;
pub mod slug;
pub mod version;

pub use comparator::{compare_versions, sort_descending, ComparableVersion};
pub use rule::{RefPattern, RefType, Rule};
pub use slug::{slugify, Slugifier};
pub use version::{increase, VersionExpression};
