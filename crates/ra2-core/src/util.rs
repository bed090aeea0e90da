//! Small shared helpers

/// Slugify a display name for use in identifiers
///
/// Lowercases alphanumerics and collapses every other run of characters
/// into a single underscore.
pub fn slugify(name: &str) -> String {
    let mut result = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
    }
    result.trim_end_matches('_').to_string()
}
