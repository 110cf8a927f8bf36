//! Regular expression filter.

use std::fmt;

use regex::{Captures, Regex};

use super::{filter_ops, FilterBase, Selector, Transform};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;

/// Which match of the pattern to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nth {
    /// 0-based index; negative values count from the last match.
    Index(isize),
    /// Every match, in order, as a list.
    All,
}

impl Default for Nth {
    fn default() -> Self {
        Nth::Index(0)
    }
}

impl fmt::Display for Nth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Nth::All => f.write_str("all"),
            Nth::Index(-1) => f.write_str("last"),
            Nth::Index(i) if i < 0 => write!(f, "{} last", ordinal(i.unsigned_abs())),
            Nth::Index(i) => f.write_str(&ordinal(i.unsigned_abs() + 1)),
        }
    }
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

type TemplateFn = dyn Fn(&Captures<'_>) -> String;

enum Template {
    /// `$1` / `${name}` expansion.
    Text(String),
    Func(Box<TemplateFn>),
}

/// Apply a regular expression to the text of the selection.
///
/// Without a template, the first participating group is returned (the whole
/// match when the pattern has no group). Flags are set inline, e.g. `(?i)`.
///
/// ```rust
/// use rs_sift::{Context, Page, Value};
/// use rs_sift::filters::{CleanText, Filter, Nth, Regexp};
///
/// let page = Page::html("<p>Date: <span>13/08/1988</span></p>");
/// let ctx = Context::new(&page);
///
/// let iso = Regexp::new(CleanText::new("p"), r"(\d+)/(\d+)/(\d+)").template("$3-$2-$1");
/// assert_eq!(iso.call(&ctx)?, Value::from("1988-08-13"));
///
/// let last = Regexp::new(CleanText::new("p"), r"(\d+)").nth(Nth::Index(-1));
/// assert_eq!(last.call(&ctx)?, Value::from("1988"));
/// # Ok::<(), rs_sift::Error>(())
/// ```
pub struct Regexp {
    base: FilterBase,
    pattern: String,
    compiled: std::result::Result<Regex, regex::Error>,
    template: Option<Template>,
    nth: Nth,
}

impl Regexp {
    /// A pattern that fails to compile is reported as
    /// [`Error::InvalidPattern`] when the filter runs.
    pub fn new(selector: impl Into<Selector>, pattern: &str) -> Self {
        Self {
            base: FilterBase::new(selector),
            pattern: pattern.to_string(),
            compiled: Regex::new(pattern),
            template: None,
            nth: Nth::default(),
        }
    }

    /// Expand matches with `template` (`$1`, `${name}`).
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(Template::Text(template.into()));
        self
    }

    /// Build the result of each match with `f`.
    #[must_use]
    pub fn template_fn(mut self, f: impl Fn(&Captures<'_>) -> String + 'static) -> Self {
        self.template = Some(Template::Func(Box::new(f)));
        self
    }

    #[must_use]
    pub fn nth(mut self, nth: Nth) -> Self {
        self.nth = nth;
        self
    }

    fn expand(&self, caps: &Captures<'_>) -> String {
        match &self.template {
            None => caps
                .iter()
                .skip(1)
                .flatten()
                .next()
                .or_else(|| caps.get(0))
                .map_or_else(String::new, |m| m.as_str().to_string()),
            Some(Template::Text(template)) => {
                let mut out = String::new();
                caps.expand(template, &mut out);
                out
            }
            Some(Template::Func(f)) => f(caps),
        }
    }

    fn pick<'t>(&self, regex: &Regex, text: &'t str) -> Option<Captures<'t>> {
        match self.nth {
            Nth::Index(0) => regex.captures(text),
            Nth::Index(i) if i > 0 => regex.captures_iter(text).nth(i.unsigned_abs()),
            Nth::Index(i) => {
                let all: Vec<Captures<'t>> = regex.captures_iter(text).collect();
                let idx = all.len().checked_sub(i.unsigned_abs())?;
                all.into_iter().nth(idx)
            }
            Nth::All => None,
        }
    }
}

impl fmt::Debug for Regexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Regexp")
            .field("base", &self.base)
            .field("pattern", &self.pattern)
            .field("nth", &self.nth)
            .finish_non_exhaustive()
    }
}

impl Transform for Regexp {
    const NAME: &'static str = "Regexp";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        let regex = self
            .compiled
            .as_ref()
            .map_err(|e| Error::InvalidPattern(e.clone()))?;
        let Some(text) = value.to_text() else {
            return self
                .base
                .default_or_raise(Error::parse(Self::NAME, "", "no text to match"));
        };

        if self.nth == Nth::All {
            let items = regex
                .captures_iter(&text)
                .map(|caps| Value::Text(self.expand(&caps)))
                .collect();
            return Ok(Value::List(items));
        }

        match self.pick(regex, &text) {
            Some(caps) => Ok(Value::Text(self.expand(&caps))),
            None => self.base.default_or_raise(Error::Regexp {
                ordinal: self.nth.to_string(),
                pattern: self.pattern.clone(),
                input: text,
            }),
        }
    }
}

filter_ops!(Regexp);
