//! Configuration options for pagination and output.
//!
//! The `Options` struct controls how many pages are followed and how the
//! extracted records are rendered.

use crate::context::Record;

/// Configuration options for a scraping run.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use rs_sift::Options;
///
/// let options = Options {
///     max_pages: Some(5),
///     ..Options::default()
/// };
/// assert!(options.keep_empty);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Stop following `next_page` links after this many pages.
    ///
    /// Pagination otherwise runs until a page has no next page; making
    /// progress is the caller's contract.
    ///
    /// Default: `None`
    pub max_pages: Option<usize>,

    /// Keep fields whose value is empty when rendering records.
    ///
    /// Default: `true`
    pub keep_empty: bool,

    /// Pretty-print JSON output instead of one record per line.
    ///
    /// Default: `false`
    pub pretty: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_pages: None,
            keep_empty: true,
            pretty: false,
        }
    }
}

impl Options {
    /// JSON object of `record` under these options.
    #[must_use]
    pub fn render(&self, record: &Record<'_>) -> serde_json::Value {
        let mut json = record.to_json();
        if !self.keep_empty {
            if let serde_json::Value::Object(map) = &mut json {
                map.retain(|_, v| !v.is_null());
            }
        }
        json
    }
}
