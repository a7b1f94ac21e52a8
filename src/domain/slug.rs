/// Signature of a function normalizing ref names into version-safe values
pub type Slugifier = fn(&str) -> String;

/// Normalize a ref name for embedding in a version string
///
/// `/` is unsafe in artifact identifiers and becomes `-`
/// (`feature/login` -> `feature-login`).
pub fn slugify(value: &str) -> String {
    value.replace('/', "-")
}
