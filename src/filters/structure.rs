//! Structural filters: context lookups, rebasing, mapping and n-ary
//! combinations of other filters.

use std::collections::HashMap;
use std::fmt;

use rust_decimal::prelude::ToPrimitive;

use super::{filter_ops, select_all, trace_result, Filter, FilterBase, Selector, Transform};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::value::Value;

/// Selectors and default shared by filters combining several inputs.
#[derive(Debug, Default)]
pub struct MultiFilter {
    pub selectors: Vec<Selector>,
    pub default: Option<Value<'static>>,
}

impl MultiFilter {
    #[must_use]
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self {
            selectors,
            default: None,
        }
    }

    /// Resolve every selector and hand the values to `combine`.
    ///
    /// Missing data in any input gives the default, as for single-input
    /// filters.
    pub fn apply<'a>(
        &self,
        ctx: &Context<'a>,
        name: &'static str,
        combine: impl FnOnce(Vec<Value<'a>>) -> Result<Value<'a>>,
    ) -> Result<Value<'a>> {
        let out = match select_all(&self.selectors, ctx, name) {
            Ok(values) => combine(values),
            Err(e) if e.is_missing() => match &self.default {
                Some(default) => Ok(default.clone()),
                None => Err(e),
            },
            Err(e) => Err(e),
        };
        trace_result(name, &out);
        out
    }
}

/// Implements [`Filter`] for a type holding a `multi: MultiFilter` field and
/// a `combine(&self, values)` method.
macro_rules! multi_filter {
    ($($ty:ident),* $(,)?) => {$(
        impl Filter for $ty {
            fn name(&self) -> &'static str {
                stringify!($ty)
            }

            fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
                self.multi.apply(ctx, stringify!($ty), |values| self.combine(values))
            }

            fn default_mut(&mut self) -> Option<&mut Option<Value<'static>>> {
                Some(&mut self.multi.default)
            }
        }
    )*};
}

pub(crate) use multi_filter;

/// Value of a name in the item environment.
///
/// The environment holds the page parameters, the list element arguments
/// and whatever a `parse` hook stored.
#[derive(Debug)]
pub struct Env {
    name: String,
    default: Option<Value<'static>>,
}

impl Env {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }
}

impl Filter for Env {
    fn name(&self) -> &'static str {
        "Env"
    }

    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
        let out = match ctx.env(&self.name) {
            Some(value) => Ok(value.clone()),
            None => match &self.default {
                Some(default) => Ok(default.clone()),
                None => Err(Error::EnvNotFound(self.name.clone())),
            },
        };
        trace_result("Env", &out);
        out
    }

    fn default_mut(&mut self) -> Option<&mut Option<Value<'static>>> {
        Some(&mut self.default)
    }
}

/// Value of a field already computed on the current object.
#[derive(Debug)]
pub struct Field {
    name: String,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Filter for Field {
    fn name(&self) -> &'static str {
        "Field"
    }

    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
        let out = ctx
            .field(&self.name)
            .cloned()
            .ok_or_else(|| Error::FieldNotFound(self.name.clone()));
        trace_result("Field", &out);
        out
    }
}

/// Evaluates `selector` with the result of `base` as the current node.
///
/// ```rust
/// use rs_sift::{Context, Page, Value};
/// use rs_sift::filters::{Base, CleanText, Filter};
///
/// let page = Page::html(r#"<div class="card"><h1>Title</h1></div><h1>Other</h1>"#);
/// let ctx = Context::new(&page);
/// let title = Base::new("div.card", CleanText::new("h1"));
/// assert_eq!(title.call(&ctx)?, Value::from("Title"));
/// # Ok::<(), rs_sift::Error>(())
/// ```
#[derive(Debug)]
pub struct Base {
    base: Selector,
    inner: FilterBase,
}

impl Base {
    pub fn new(base: impl Into<Selector>, selector: impl Into<Selector>) -> Self {
        Self {
            base: base.into(),
            inner: FilterBase::new(selector),
        }
    }
}

impl Filter for Base {
    fn name(&self) -> &'static str {
        "Base"
    }

    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
        let out = self
            .base
            .select(ctx, "Base")
            .and_then(|node| self.inner.selector.select(&ctx.rebase(node), "Base"))
            .or_else(|e| {
                if e.is_missing() {
                    self.inner.default_or_raise(e)
                } else {
                    Err(e)
                }
            });
        trace_result("Base", &out);
        out
    }

    fn selector_mut(&mut self) -> Option<&mut Selector> {
        Some(&mut self.inner.selector)
    }

    fn default_mut(&mut self) -> Option<&mut Option<Value<'static>>> {
        Some(&mut self.inner.default)
    }
}

/// Maps the text of the selection through a lookup table.
///
/// A key absent from the table is [`Error::ItemNotFound`], unless a default
/// is set.
#[derive(Debug)]
pub struct Map {
    base: FilterBase,
    map: HashMap<String, Value<'static>>,
}

impl Map {
    pub fn new<I, K, V>(selector: impl Into<Selector>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value<'static>>,
    {
        Self {
            base: FilterBase::new(selector),
            map: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Transform for Map {
    const NAME: &'static str = "Map";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        let key = value.to_text().unwrap_or_default();
        match self.map.get(&key) {
            Some(mapped) => Ok(mapped.clone()),
            None => self.base.default_or_raise(Error::ItemNotFound { key }),
        }
    }
}

/// `printf`-style formatting of several filter results.
///
/// `%s` inserts the text of a value, `%d` its integer part and `%%` a
/// literal percent sign.
#[derive(Debug)]
pub struct Format {
    fmt: String,
    multi: MultiFilter,
}

impl Format {
    pub fn new<I, S>(fmt: impl Into<String>, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        Self {
            fmt: fmt.into(),
            multi: MultiFilter::new(selectors.into_iter().map(Into::into).collect()),
        }
    }

    fn combine<'a>(&self, values: Vec<Value<'a>>) -> Result<Value<'a>> {
        render(&self.fmt, &values).map(Value::Text)
    }
}

/// Render `fmt` with `values`, one per `%s`/`%d` placeholder.
pub fn render(fmt: &str, values: &[Value<'_>]) -> Result<String> {
    let fail = |reason: String| Error::parse("Format", fmt, reason);
    let mut out = String::with_capacity(fmt.len());
    let mut args = values.iter();
    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(spec @ ('s' | 'd')) => {
                let value = args
                    .next()
                    .ok_or_else(|| fail("not enough arguments".to_string()))?;
                if spec == 's' {
                    out.push_str(&value.to_text().unwrap_or_default());
                } else {
                    out.push_str(&integer_part(value).ok_or_else(|| {
                        fail(format!("%d needs a number, got {}", value.kind()))
                    })?);
                }
            }
            other => return Err(fail(format!("unsupported conversion %{}", other.unwrap_or(' ')))),
        }
    }
    if args.next().is_some() {
        return Err(fail("too many arguments".to_string()));
    }
    Ok(out)
}

fn integer_part(value: &Value<'_>) -> Option<String> {
    match value {
        Value::Int(i) => Some(i.to_string()),
        Value::Bool(b) => Some(i64::from(*b).to_string()),
        Value::Decimal(d) => d.trunc().to_i64().map(|i| i.to_string()),
        Value::Json(j) => j
            .as_i64()
            .or_else(|| j.as_f64().map(|f| f.trunc() as i64))
            .map(|i| i.to_string()),
        other => other
            .to_text()
            .and_then(|t| t.trim().parse::<i64>().ok())
            .map(|i| i.to_string()),
    }
}

type EvalFn = dyn for<'v> Fn(&[Value<'v>]) -> Result<Value<'static>>;

/// Applies a function to the results of several filters.
///
/// ```rust
/// use rs_sift::{Context, Page, Value};
/// use rs_sift::filters::{Eval, Filter, Selector};
///
/// let page = Page::html("<p/>");
/// let ctx = Context::new(&page);
/// let product = Eval::new(
///     |values| {
///         let total: i64 = values.iter().filter_map(|v| match v {
///             Value::Int(i) => Some(*i),
///             _ => None,
///         }).product();
///         Ok(Value::Int(total + 1))
///     },
///     [Selector::literal(3), Selector::literal(7)],
/// );
/// assert_eq!(product.call(&ctx)?, Value::Int(22));
/// # Ok::<(), rs_sift::Error>(())
/// ```
pub struct Eval {
    func: Box<EvalFn>,
    multi: MultiFilter,
}

impl Eval {
    pub fn new<F, I, S>(func: F, selectors: I) -> Self
    where
        F: for<'v> Fn(&[Value<'v>]) -> Result<Value<'static>> + 'static,
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        Self {
            func: Box::new(func),
            multi: MultiFilter::new(selectors.into_iter().map(Into::into).collect()),
        }
    }

    fn combine<'a>(&self, values: Vec<Value<'a>>) -> Result<Value<'a>> {
        (self.func)(&values)
    }
}

impl fmt::Debug for Eval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eval")
            .field("multi", &self.multi)
            .finish_non_exhaustive()
    }
}

multi_filter!(Format, Eval);
filter_ops!(Env, Field, Base, Map, Format, Eval);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{CleanDecimal, CleanText, FilterExt};
    use crate::page::Page;
    use rust_decimal::Decimal;

    #[test]
    fn test_env_lookup_and_default() {
        let page = Page::html("<p/>").with_param("account", "FR76");
        let ctx = Context::new(&page);
        assert_eq!(Env::new("account").call(&ctx).unwrap(), Value::from("FR76"));
        assert!(matches!(Env::new("missing").call(&ctx), Err(Error::EnvNotFound(_))));
        assert_eq!((Env::new("missing") | 0).call(&ctx).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_field_reads_previous_fields() {
        let page = Page::html("<p/>");
        let mut ctx = Context::new(&page);
        ctx.record_mut().insert("label", Value::from("Rent"));
        assert_eq!(Field::new("label").call(&ctx).unwrap(), Value::from("Rent"));
        assert!(matches!(Field::new("amount").call(&ctx), Err(Error::FieldNotFound(_))));
    }

    #[test]
    fn test_base_changes_current_node() {
        let page = Page::html(r#"<div class="a"><b>1</b></div><div class="b"><b>2</b></div>"#);
        let ctx = Context::new(&page);
        let f = Base::new("div.b", CleanText::new("b"));
        assert_eq!(f.call(&ctx).unwrap(), Value::from("2"));
        let f = Base::new("div.c", CleanText::new("b")) | "none";
        assert_eq!(f.call(&ctx).unwrap(), Value::from("none"));
    }

    #[test]
    fn test_map_item_not_found() {
        let page = Page::html("<p>Concert</p><span>Opera</span>");
        let ctx = Context::new(&page);
        let types = [("Concert", 1), ("Cinema", 2)];
        let f = Map::new(CleanText::new("p"), types);
        assert_eq!(f.call(&ctx).unwrap(), Value::Int(1));
        let f = Map::new(CleanText::new("span"), types);
        assert!(matches!(f.call(&ctx), Err(Error::ItemNotFound { key }) if key == "Opera"));
        let f = Map::new(CleanText::new("span"), types) | 0;
        assert_eq!(f.call(&ctx).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_format_placeholders() {
        let page = Page::html("<h1>Title</h1><h2>Sub</h2><p>12,50</p>");
        let ctx = Context::new(&page);
        let f = Format::new(
            "%s (%s) %d%%",
            [
                Selector::from(CleanText::new("h1")),
                Selector::from(CleanText::new("h2")),
                Selector::from(CleanDecimal::french().on("p")),
            ],
        );
        assert_eq!(f.call(&ctx).unwrap(), Value::from("Title (Sub) 12%"));
    }

    #[test]
    fn test_format_argument_count() {
        assert!(render("%s %s", &[Value::from("a")]).is_err());
        assert!(render("%s", &[Value::from("a"), Value::from("b")]).is_err());
        assert!(render("%x", &[Value::Int(1)]).is_err());
        assert_eq!(render("%d", &[Value::Decimal(Decimal::new(-1999, 2))]).unwrap(), "-19");
    }

    #[test]
    fn test_multi_filter_default_on_missing_input() {
        let page = Page::html("<h1>Title</h1>");
        let ctx = Context::new(&page);
        let f = Format::new("%s-%s", ["h1", "h2"]);
        assert!(f.call(&ctx).unwrap_err().is_missing());
        let f = Format::new("%s-%s", ["h1", "h2"]) | "untitled";
        assert_eq!(f.call(&ctx).unwrap(), Value::from("untitled"));
    }
}
