//! Small helpers shared across the core crate.

/// Truncate a string to a maximum number of bytes without breaking UTF-8.
/// Returns the original string if it is already within the limit.
pub fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    if max_bytes == 0 {
        return String::new();
    }
    let mut end = max_bytes.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Extract the origin (`scheme://host[:port]`) from a URL string, without
/// normalization. Returns the input unchanged when it carries no scheme,
/// so opaque origins stay opaque.
pub fn origin_of(url: &str) -> String {
    let Some(idx) = url.find("://") else {
        return url.to_string();
    };
    let after = &url[idx + 3..];
    let end = after
        .find(['/', '?', '#'])
        .unwrap_or(after.len());
    format!("{}{}", &url[..idx + 3], &after[..end])
}
