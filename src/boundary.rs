use crate::git::GitSituation;
use std::fmt;

/// Conditions at the edges of the repository history worth telling the user
/// about. None of them stop version resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Neither a ref rule nor the commit fallback matched
    NoMatchingRule {
        branch: Option<String>,
        tags: Vec<String>,
    },
    /// The repository has no commits; commit placeholders use sentinels
    EmptyRepository,
    /// The describe walk found no matching tag in the whole history
    NoDescribeTag {
        pattern: Option<String>,
        distance: usize,
    },
    /// The describe walk hit its depth limit before finding a tag
    DescribeLimitReached { max_depth: usize },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NoMatchingRule { branch, tags } => {
                let head = match branch {
                    Some(branch) => format!("branch '{}'", branch),
                    None => "detached HEAD".to_string(),
                };
                if tags.is_empty() {
                    write!(f, "No versioning rule matches {}", head)
                } else {
                    write!(
                        f,
                        "No versioning rule matches {} (tags: {})",
                        head,
                        tags.join(", ")
                    )
                }
            }
            BoundaryWarning::EmptyRepository => {
                write!(f, "Repository has no commits yet")
            }
            BoundaryWarning::NoDescribeTag { pattern, distance } => match pattern {
                Some(pattern) => write!(
                    f,
                    "No tag matching '{}' in {} commits, describing from root",
                    pattern, distance
                ),
                None => write!(
                    f,
                    "No tag in {} commits, describing from root",
                    distance
                ),
            },
            BoundaryWarning::DescribeLimitReached { max_depth } => {
                write!(
                    f,
                    "Describe stopped after {} commits without finding a tag",
                    max_depth
                )
            }
        }
    }
}

/// Warnings for a finished resolution
///
/// `matched` tells whether a rule matched. Describe warnings are only
/// reported when a placeholder actually needed the describe walk.
pub fn collect_warnings(situation: &GitSituation, matched: bool) -> Vec<BoundaryWarning> {
    let mut warnings = Vec::new();

    if !situation.has_commits() {
        warnings.push(BoundaryWarning::EmptyRepository);
    }

    if !matched {
        warnings.push(BoundaryWarning::NoMatchingRule {
            branch: situation.branch().map(str::to_string),
            tags: situation.tags().to_vec(),
        });
    }

    if let Some(describe) = situation.computed_describe() {
        if situation.has_commits() && describe.tag.is_none() {
            let limited = situation
                .describe_max_depth()
                .filter(|_| describe.truncated);
            warnings.push(match limited {
                Some(max_depth) => BoundaryWarning::DescribeLimitReached { max_depth },
                None => BoundaryWarning::NoDescribeTag {
                    pattern: situation
                        .describe_tag_pattern()
                        .map(|pattern| pattern.as_str().to_string()),
                    distance: describe.distance,
                },
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    #[test]
    fn test_no_warnings_for_plain_resolution() {
        let mut repo = MockRepository::new();
        repo.commit();
        let situation = GitSituation::from_repository(repo).unwrap();
        assert!(collect_warnings(&situation, true).is_empty());
    }

    #[test]
    fn test_empty_repository_warning() {
        let situation = GitSituation::from_repository(MockRepository::new()).unwrap();
        situation.describe().unwrap();
        assert_eq!(
            collect_warnings(&situation, true),
            vec![BoundaryWarning::EmptyRepository]
        );
    }

    #[test]
    fn test_no_matching_rule_warning() {
        let mut repo = MockRepository::new();
        let oid = repo.commit();
        repo.detach(oid);
        repo.tag_head("nightly");
        let situation = GitSituation::from_repository(repo).unwrap();

        assert_eq!(
            collect_warnings(&situation, false),
            vec![BoundaryWarning::NoMatchingRule {
                branch: None,
                tags: vec!["nightly".to_string()],
            }]
        );
    }

    #[test]
    fn test_describe_warnings_only_after_describe() {
        let mut repo = MockRepository::new();
        repo.commit();
        repo.commit();
        let situation = GitSituation::from_repository(repo).unwrap();
        assert!(collect_warnings(&situation, true).is_empty());

        situation.describe().unwrap();
        assert_eq!(
            collect_warnings(&situation, true),
            vec![BoundaryWarning::NoDescribeTag {
                pattern: None,
                distance: 2,
            }]
        );
    }

    #[test]
    fn test_describe_limit_warning() {
        let mut repo = MockRepository::new();
        for _ in 0..4 {
            repo.commit();
        }
        let mut situation = GitSituation::from_repository(repo).unwrap();
        situation.set_describe_max_depth(Some(2)).unwrap();
        situation.describe().unwrap();

        assert_eq!(
            collect_warnings(&situation, true),
            vec![BoundaryWarning::DescribeLimitReached { max_depth: 2 }]
        );
    }

    #[test]
    fn test_history_ending_at_depth_limit_is_not_truncated() {
        let mut repo = MockRepository::new();
        repo.commit();
        repo.commit();
        let mut situation = GitSituation::from_repository(repo).unwrap();
        situation.set_describe_max_depth(Some(2)).unwrap();
        assert!(!situation.describe().unwrap().truncated);

        assert_eq!(
            collect_warnings(&situation, true),
            vec![BoundaryWarning::NoDescribeTag {
                pattern: None,
                distance: 2,
            }]
        );
    }
}
