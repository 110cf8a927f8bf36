//! Error types for rs-sift.
//!
//! Every failure raised while selecting, filtering or iterating elements is a
//! variant of [`Error`], so callers can catch broadly with `?` or match a
//! specific variant (`ColumnNotFound`, `Regexp`, `ItemNotFound`, ...).

/// Error type for filter and element operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A filter could not turn its input into the expected value.
    #[error("{filter}: unable to parse {input:?}: {reason}")]
    Parse {
        filter: &'static str,
        input: String,
        reason: String,
    },

    /// A path selector matched nothing.
    #[error("{filter}: nothing matches {selector:?}")]
    NotFound {
        filter: &'static str,
        selector: String,
    },

    /// The selected element does not carry the requested attribute.
    #[error("{filter}: attribute {attr:?} not found")]
    AttributeNotFound { filter: &'static str, attr: String },

    /// A table cell was requested for a column that was never resolved.
    #[error("unable to find column {0}")]
    ColumnNotFound(String),

    /// A regular expression did not match.
    #[error("unable to find {ordinal} {pattern} in {input:?}")]
    Regexp {
        ordinal: String,
        pattern: String,
        input: String,
    },

    /// A key has no entry in a `Map` filter.
    #[error("unable to handle {key:?} in map")]
    ItemNotFound { key: String },

    /// An `Env` filter read a name absent from the item context.
    #[error("environment variable {0} not found")]
    EnvNotFound(String),

    /// A `Field` filter read a field not yet computed on the current object.
    #[error("field {0} not found on the current object")]
    FieldNotFound(String),

    /// A CSS selector failed to compile.
    #[error("invalid selector {selector:?}")]
    InvalidSelector { selector: String },

    /// A regular expression failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Explicit signal to drop the current item without aborting iteration.
    #[error("item skipped")]
    Skip,

    /// Data returned by a page is incoherent (for example duplicate ids).
    #[error("incoherent data: {0}")]
    Data(String),

    /// An asynchronous page load failed.
    #[error("unable to load {name}: {reason}")]
    Load { name: String, reason: String },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O failure (CLI and schema loading).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An extraction schema is malformed.
    #[error("invalid schema: {0}")]
    Schema(String),
}

impl Error {
    /// Builds a [`Error::Parse`] for `filter` failing on `input`.
    pub(crate) fn parse(
        filter: &'static str,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Parse {
            filter,
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// True for "the data is not there" failures, which a filter default
    /// replaces even when they come from a nested selector.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AttributeNotFound { .. })
    }

    /// True for the explicit skip signal.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Result type alias for filter operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_errors_are_classified() {
        let not_found = Error::NotFound {
            filter: "CleanText",
            selector: "td.amount".into(),
        };
        assert!(not_found.is_missing());
        assert!(!Error::ColumnNotFound("date".into()).is_missing());
        assert!(!Error::Skip.is_missing());
        assert!(Error::Skip.is_skip());
    }

    #[test]
    fn test_messages_name_the_filter_and_input() {
        let err = Error::parse("CleanDecimal", "12,a", "invalid decimal");
        let msg = err.to_string();
        assert!(msg.contains("CleanDecimal"));
        assert!(msg.contains("12,a"));
    }
}
