//! URL utilities used by link filters and pagination.

use url::Url;

/// Check if a string is an absolute http(s) URL with a host.
///
/// # Returns
/// * `(is_absolute, parsed_url)` - Whether URL is absolute and the parsed URL if valid
#[must_use]
pub fn is_absolute_url(s: &str) -> (bool, Option<Url>) {
    let s = s.trim();

    if !s.starts_with("http://") && !s.starts_with("https://") {
        return (false, None);
    }

    match Url::parse(s) {
        Ok(url) if url.host().is_some() => (true, Some(url)),
        _ => (false, None),
    }
}

/// Convert a relative or absolute link to absolute form.
///
/// `data:`, `javascript:`, `mailto:` and `tel:` links are kept unchanged, as
/// are links that cannot be resolved against `base`.
#[must_use]
pub fn absolute_url(link: &str, base: &Url) -> String {
    let link = link.trim();

    if link.is_empty() {
        return String::new();
    }

    if link.starts_with("data:")
        || link.starts_with("javascript:")
        || link.starts_with("mailto:")
        || link.starts_with("tel:")
    {
        return link.to_string();
    }

    if is_absolute_url(link).0 {
        return link.to_string();
    }

    match base.join(link) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => link.to_string(),
    }
}

/// Resolve `link` against an optional page URL.
#[must_use]
pub fn resolve(link: &str, base: Option<&Url>) -> String {
    match base {
        Some(base) => absolute_url(link, base),
        None => link.trim().to_string(),
    }
}

/// All values of query parameter `key` in `link`, decoded.
///
/// Relative links are accepted: they are parsed against a dummy base.
#[must_use]
pub fn query_values(link: &str, key: &str) -> Vec<String> {
    #[allow(clippy::expect_used)]
    static DUMMY: std::sync::LazyLock<Url> =
        std::sync::LazyLock::new(|| Url::parse("http://localhost/").expect("valid base"));

    let parsed = match Url::parse(link.trim()) {
        Ok(url) => url,
        Err(_) => match DUMMY.join(link.trim()) {
            Ok(url) => url,
            Err(_) => return Vec::new(),
        },
    };

    parsed
        .query_pairs()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .collect()
}
