//! Filter infrastructure
//!
//! A filter is a small, stateless transform with an optional upstream
//! [`Selector`] and an optional default value. Filters compose by nesting
//! (`CleanDecimal::new(Regexp::new("td.amount", r"([\d,.]+)"))`) or with the
//! operators every filter of this crate implements:
//!
//! - `filter | value` sets the default returned instead of failing,
//! - `left & right` makes `right` read its input from `left`.
//!
//! ```rust
//! use rs_sift::{Context, Page, Value};
//! use rs_sift::filters::{CleanDecimal, CleanText, Filter, Regexp};
//!
//! let page = Page::html(r#"<p class="total">Total : 1 234,50 EUR</p>"#);
//! let ctx = Context::new(&page);
//!
//! let amount = CleanText::new("p.total") & CleanDecimal::french();
//! assert_eq!(amount.call(&ctx)?.to_string(), "1234.50");
//!
//! let missing = CleanText::new("p.nope") | "n/a";
//! assert_eq!(missing.call(&ctx)?, Value::from("n/a"));
//!
//! let year = Regexp::new("p.total", r"(\d+),").call(&ctx)?;
//! assert_eq!(year, Value::from("234"));
//! # Ok::<(), rs_sift::Error>(())
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::context::Context;
use crate::dom::{self, Matcher};
use crate::error::{Error, Result};
use crate::json;
use crate::value::Value;

pub mod date;
pub mod html;
pub mod json_path;
pub mod load;
pub mod number;
pub mod regexp;
pub mod structure;
pub mod text;
pub mod url;

pub use date::{CombineDate, Date, DateConfig, DateGuesser, DateTime, Duration, Time};
pub use html::{AbsoluteLink, Attr, Css, HasElement, Link, TableCell};
pub use json_path::Dict;
pub use load::{Async, AsyncLoad};
pub use number::{CleanDecimal, Separators, Type, TypeKind};
pub use regexp::{Nth, Regexp};
pub use structure::{Base, Env, Eval, Field, Format, Map, MultiFilter};
pub use text::{
    Capitalize, CleanText, Currency, Join, Lower, Normalization, RawText, Slugify, TextCleaner,
    Upper,
};
pub use url::{Decode, QueryValue};

/// A composable extraction step.
pub trait Filter {
    /// Name used in error messages and trace output.
    fn name(&self) -> &'static str;

    /// Evaluate the filter in `ctx`.
    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>>;

    /// Upstream selector slot, for filters that read one.
    fn selector_mut(&mut self) -> Option<&mut Selector> {
        None
    }

    /// Default slot, for filters that accept a default.
    fn default_mut(&mut self) -> Option<&mut Option<Value<'static>>> {
        None
    }
}

impl Filter for Box<dyn Filter> {
    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
        self.as_ref().call(ctx)
    }

    fn selector_mut(&mut self) -> Option<&mut Selector> {
        self.as_mut().selector_mut()
    }

    fn default_mut(&mut self) -> Option<&mut Option<Value<'static>>> {
        self.as_mut().default_mut()
    }
}

/// Builder helpers available on every filter.
pub trait FilterExt: Filter + Sized {
    /// Set the default value (`filter | value`).
    fn or(mut self, default: impl Into<Value<'static>>) -> Self {
        if let Some(slot) = self.default_mut() {
            *slot = Some(default.into());
        }
        self
    }

    /// Replace the upstream selector (`selector & filter`).
    fn on(mut self, selector: impl Into<Selector>) -> Self {
        if let Some(slot) = self.selector_mut() {
            *slot = selector.into();
        }
        self
    }

    fn boxed(self) -> Box<dyn Filter>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<F: Filter> FilterExt for F {}

/// A CSS selector (HTML pages) or slash path (JSON pages), compiled once.
pub struct Path {
    raw: String,
    css: Option<Matcher>,
}

impl Path {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let css = dom::compile(&raw).ok();
        Self { raw, css }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Query the path below `node` on behalf of `filter`.
    ///
    /// An empty HTML selection or a missing JSON key is [`Error::NotFound`].
    pub fn query<'a>(&self, node: &Value<'a>, filter: &'static str) -> Result<Value<'a>> {
        let not_found = || Error::NotFound {
            filter,
            selector: self.raw.clone(),
        };
        match node {
            Value::Nodes(nodes) => {
                let matcher = self.css.as_ref().ok_or_else(|| Error::InvalidSelector {
                    selector: self.raw.clone(),
                })?;
                let found: Vec<_> = nodes
                    .iter()
                    .flat_map(|n| dom::select(*n, matcher))
                    .collect();
                if found.is_empty() {
                    Err(not_found())
                } else {
                    Ok(Value::Nodes(found))
                }
            }
            Value::Json(Cow::Borrowed(root)) => match json::lookup(root, &self.raw) {
                Some(json::Found::One(v)) => Ok(Value::json(v)),
                Some(json::Found::Many(vs)) => Ok(Value::List(vs.into_iter().map(Value::json).collect())),
                None => Err(not_found()),
            },
            Value::Json(Cow::Owned(root)) => match json::lookup(root, &self.raw) {
                Some(json::Found::One(v)) => Ok(Value::from(v.clone())),
                Some(json::Found::Many(vs)) => Ok(Value::List(
                    vs.into_iter().map(|v| Value::from(v.clone())).collect(),
                )),
                None => Err(not_found()),
            },
            other => Err(Error::parse(
                filter,
                other.to_text().unwrap_or_default(),
                format!("cannot query {:?} on a {} value", self.raw, other.kind()),
            )),
        }
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.raw)
    }
}

type SelectFn = dyn for<'a> Fn(&Context<'a>) -> Result<Value<'a>>;

/// Where a filter reads its input from.
#[derive(Default)]
pub enum Selector {
    /// The current node of the context.
    #[default]
    Current,
    /// A CSS or JSON path relative to the current node.
    Path(Path),
    /// The result of another filter, evaluated in the same context.
    Filter(Box<dyn Filter>),
    /// A plain function of the context.
    Func(Box<SelectFn>),
    /// A constant.
    Literal(Value<'static>),
}

impl Selector {
    /// Selector calling `f` on the context.
    pub fn func<F>(f: F) -> Self
    where
        F: for<'a> Fn(&Context<'a>) -> Result<Value<'a>> + 'static,
    {
        Selector::Func(Box::new(f))
    }

    /// Constant selector.
    pub fn literal(value: impl Into<Value<'static>>) -> Self {
        Selector::Literal(value.into())
    }

    /// Resolve the selector in `ctx` on behalf of `filter`.
    pub fn select<'a>(&self, ctx: &Context<'a>, filter: &'static str) -> Result<Value<'a>> {
        match self {
            Selector::Current => Ok(ctx.node().clone()),
            Selector::Path(path) => path.query(ctx.node(), filter),
            Selector::Filter(f) => f.call(ctx),
            Selector::Func(f) => f(ctx),
            Selector::Literal(v) => Ok(v.clone()),
        }
    }

    /// Printable form for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Selector::Current => ".".to_string(),
            Selector::Path(p) => p.as_str().to_string(),
            Selector::Filter(f) => f.name().to_string(),
            Selector::Func(_) => "<fn>".to_string(),
            Selector::Literal(v) => format!("{v:?}"),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self.describe())
    }
}

impl From<&str> for Selector {
    fn from(path: &str) -> Self {
        Selector::Path(Path::new(path))
    }
}

impl From<String> for Selector {
    fn from(path: String) -> Self {
        Selector::Path(Path::new(path))
    }
}

impl From<Value<'static>> for Selector {
    fn from(value: Value<'static>) -> Self {
        Selector::Literal(value)
    }
}

impl<F: Filter + 'static> From<F> for Selector {
    fn from(filter: F) -> Self {
        Selector::Filter(Box::new(filter))
    }
}

/// Selector and default shared by most filters.
#[derive(Debug, Default)]
pub struct FilterBase {
    pub selector: Selector,
    pub default: Option<Value<'static>>,
}

impl FilterBase {
    #[must_use]
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
            default: None,
        }
    }

    /// The configured default, or `err`.
    pub fn default_or_raise<'a>(&self, err: Error) -> Result<Value<'a>> {
        match &self.default {
            Some(value) => Ok(value.clone()),
            None => Err(err),
        }
    }
}

/// A filter reading one upstream value and transforming it.
///
/// Implementors get [`Filter`] for free: the upstream selector is resolved,
/// missing data is replaced by the default, and the result goes through
/// [`Transform::filter`].
pub trait Transform {
    const NAME: &'static str;

    fn base(&self) -> &FilterBase;

    fn base_mut(&mut self) -> &mut FilterBase;

    fn filter<'a>(&self, value: Value<'a>, ctx: &Context<'a>) -> Result<Value<'a>>;
}

impl<T: Transform> Filter for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
        let base = self.base();
        let out = match base.selector.select(ctx, T::NAME) {
            Ok(value) => self.filter(value, ctx),
            Err(e) if e.is_missing() => base.default_or_raise(e),
            Err(e) => Err(e),
        };
        trace_result(T::NAME, &out);
        out
    }

    fn selector_mut(&mut self) -> Option<&mut Selector> {
        Some(&mut self.base_mut().selector)
    }

    fn default_mut(&mut self) -> Option<&mut Option<Value<'static>>> {
        Some(&mut self.base_mut().default)
    }
}

pub(crate) fn trace_result(name: &'static str, out: &Result<Value<'_>>) {
    match out {
        Ok(value) => tracing::trace!(target: "rs_sift::filters", filter = name, value = ?value),
        Err(err) => tracing::trace!(target: "rs_sift::filters", filter = name, error = %err),
    }
}

/// Resolve every selector of an n-ary filter, in order.
pub(crate) fn select_all<'a>(
    selectors: &[Selector],
    ctx: &Context<'a>,
    filter: &'static str,
) -> Result<Vec<Value<'a>>> {
    selectors.iter().map(|s| s.select(ctx, filter)).collect()
}

/// Implements `|` (default) and `&` (chaining) for filter types.
macro_rules! filter_ops {
    ($($ty:ty),* $(,)?) => {$(
        impl<V: Into<$crate::value::Value<'static>>> ::std::ops::BitOr<V> for $ty {
            type Output = Self;

            fn bitor(self, default: V) -> Self {
                $crate::filters::FilterExt::or(self, default)
            }
        }

        impl<R: $crate::filters::Filter + 'static> ::std::ops::BitAnd<R> for $ty {
            type Output = R;

            fn bitand(self, rhs: R) -> R {
                $crate::filters::FilterExt::on(rhs, self)
            }
        }
    )*};
}

pub(crate) use filter_ops;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;

    #[test]
    fn test_path_on_html_page() {
        let page = Page::html("<ul><li>a</li><li>b</li></ul>");
        let ctx = Context::new(&page);
        let value = Selector::from("li").select(&ctx, "test").unwrap();
        assert_eq!(value.to_text().as_deref(), Some("a b"));
    }

    #[test]
    fn test_empty_path_is_not_found() {
        let page = Page::html("<ul></ul>");
        let ctx = Context::new(&page);
        let err = Selector::from("li").select(&ctx, "CleanText").unwrap_err();
        assert!(err.is_missing());
        assert!(err.to_string().contains("CleanText"));
        assert!(err.to_string().contains("li"));
    }

    #[test]
    fn test_path_on_json_page() {
        let page = Page::json(r#"{"account": {"balance": 12.5}}"#).unwrap();
        let ctx = Context::new(&page);
        let value = Selector::from("account/balance").select(&ctx, "test").unwrap();
        assert_eq!(value.to_json(), serde_json::json!(12.5));
    }

    #[test]
    fn test_invalid_css_reported_on_html_only() {
        let page = Page::html("<p/>");
        let ctx = Context::new(&page);
        let err = Selector::from("p[[").select(&ctx, "test").unwrap_err();
        assert!(matches!(err, Error::InvalidSelector { .. }));
    }

    #[test]
    fn test_literal_and_func_selectors() {
        let page = Page::html("<p/>");
        let ctx = Context::new(&page);
        let lit = Selector::literal("x").select(&ctx, "test").unwrap();
        assert_eq!(lit, Value::from("x"));
        let func = Selector::func(|_ctx| Ok(Value::Int(3)));
        assert_eq!(func.select(&ctx, "test").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_default_replaces_missing_data() {
        let page = Page::html("<p>1</p>");
        let ctx = Context::new(&page);
        let f = CleanText::new("span") | "none";
        assert_eq!(f.call(&ctx).unwrap(), Value::from("none"));
        let err = CleanText::new("span").call(&ctx).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_and_chains_left_into_right() {
        let page = Page::html("<p>Ref: ABC-42</p>");
        let ctx = Context::new(&page);
        let f = CleanText::new("p") & Regexp::new(Selector::Current, r"-(\d+)");
        assert_eq!(f.call(&ctx).unwrap(), Value::from("42"));
    }
}
