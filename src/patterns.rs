//! Compiled regex patterns shared by the filters.
//!
//! All patterns are compiled once at first use using `LazyLock`.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

/// Line boundaries, including `\r`, form feeds and Unicode separators.
pub static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n|[\n\r\x0b\x0c\x1c-\x1e\x{85}\x{2028}\x{2029}]").expect("LINE_BREAK regex")
});

/// Any run of Unicode whitespace (includes non-breaking spaces).
pub static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE regex"));

/// Everything a decimal literal cannot contain once separators are normalized.
pub static NON_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9\-.]").expect("NON_DECIMAL regex"));

/// Non alphanumeric ASCII, replaced by spaces when slugifying.
pub static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("NON_SLUG regex"));

/// Clock time such as `14:05`, `14h05` or `14:05:30`.
pub static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<hh>\d+)[:h]?(?P<mm>\d+)(?:[:m](?P<ss>\d+))?").expect("TIME regex")
});

/// Elapsed duration such as `1:02:03` or `02;03`.
pub static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?P<hh>\d+)[:;])?(?P<mm>\d+)[;:](?P<ss>\d+)").expect("DURATION regex")
});

/// Time of day embedded in a date string: `10:30`, `10h30`, `10:30:15`,
/// optionally followed by fractional seconds.
pub static DATE_CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})[:h](\d{2})(?::(\d{2})(?:[.,](\d{1,9}))?)?\b")
        .expect("DATE_CLOCK regex")
});

/// Tokens of a free-form date: numbers and words.
pub static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+|[^\W\d_]+").expect("DATE_TOKEN regex"));

/// Day and month separated by `/` or `-`, as read by `DateGuesser`.
pub static DAY_MONTH_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/-]").expect("DAY_MONTH_SPLIT regex"));
