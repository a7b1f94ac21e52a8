//! `${key}` template rendering against a [PlaceholderStore]

use crate::error::Result;
use crate::placeholder::PlaceholderStore;

/// Render `template`, replacing every `${key}` with its placeholder value
///
/// Tokens are not nested and the output is never scanned again, so values
/// containing `${...}` (e.g. from branch names) come out literally. An
/// unterminated `${` is copied as is.
///
/// # Errors
/// * `UnknownPlaceholder` - for the first key the store does not know
/// * any error raised while computing a referenced placeholder
///
/// # Example
/// ```rust
/// # use git_versioning::placeholder::PlaceholderStore;
/// # use git_versioning::template::render;
/// let mut store = PlaceholderStore::new();
/// store.put("ref", "main");
/// assert_eq!(render("${ref}-SNAPSHOT", &store).unwrap(), "main-SNAPSHOT");
/// ```
pub fn render(template: &str, store: &PlaceholderStore<'_>) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let Some(length) = rest[start + 2..].find('}') else {
            break;
        };
        let key = &rest[start + 2..start + 2 + length];

        output.push_str(&rest[..start]);
        output.push_str(store.get(key)?);
        rest = &rest[start + 2 + length + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Keys referenced by `template`, in order of appearance
pub fn placeholder_keys(template: &str) -> Vec<&str> {
    let mut keys = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let Some(length) = rest[start + 2..].find('}') else {
            break;
        };
        keys.push(&rest[start + 2..start + 2 + length]);
        rest = &rest[start + 2 + length + 1..];
    }

    keys
}
