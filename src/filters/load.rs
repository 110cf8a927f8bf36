//! Filters reading pages loaded next to the current one.
//!
//! An item element declares named loaders, each an [`AsyncLoad`] giving the
//! URL to open. Every load is started through the context's fetcher before
//! the fields are evaluated, then [`Async`] waits for the named page when a
//! field needs it:
//!
//! ```rust
//! use std::sync::Arc;
//! use rs_sift::{Context, ItemElement, Page, Record, Value};
//! use rs_sift::fetch::StaticFetcher;
//! use rs_sift::filters::{Async, AsyncLoad, CleanText, Field, Link};
//!
//! let fetcher = StaticFetcher::new()
//!     .with_html("https://shop.example/p/1", "<h3>Blue mug</h3>");
//! let page = Page::html(r#"<a href="/p/1">mug</a>"#)
//!     .with_url("https://shop.example/".parse()?);
//! let ctx = Context::new(&page).with_fetcher(Arc::new(fetcher));
//!
//! let item = ItemElement::<Record>::new()
//!     .field("url", Link::new("a"))
//!     .loader("details", AsyncLoad::new(Field::new("url")))
//!     .field("title", Async::new("details", CleanText::new("h3")));
//! let record = item.build(&ctx)?.expect("not skipped");
//! assert_eq!(record.get("title"), Some(&Value::from("Blue mug")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::ops::{BitAnd, BitOr};

use super::{filter_ops, trace_result, Filter, FilterBase, Selector, Transform};
use crate::context::Context;
use crate::error::Result;
use crate::url_utils;
use crate::value::Value;

/// URL of a page to load, resolved against the current page URL.
///
/// An empty link gives [`Value::Empty`]: nothing is loaded and the matching
/// [`Async`] fields are empty.
#[derive(Debug, Default)]
pub struct AsyncLoad {
    base: FilterBase,
}

impl AsyncLoad {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
        }
    }
}

impl Transform for AsyncLoad {
    const NAME: &'static str = "AsyncLoad";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, ctx: &Context<'a>) -> Result<Value<'a>> {
        match value.to_text() {
            Some(link) if !link.trim().is_empty() => {
                Ok(Value::Text(url_utils::resolve(&link, ctx.url())))
            }
            _ => Ok(Value::Empty),
        }
    }
}

/// Evaluate `selector` against the page loaded under `name`.
///
/// Waits for the load if it is still running. The result is detached from
/// the loaded page, so HTML selections come back as text.
#[derive(Debug)]
pub struct Async {
    name: String,
    selector: Selector,
    default: Option<Value<'static>>,
}

impl Async {
    pub fn new(name: impl Into<String>, selector: impl Into<Selector>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            default: None,
        }
    }
}

impl Filter for Async {
    fn name(&self) -> &'static str {
        "Async"
    }

    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
        let out = match ctx.loaded(&self.name)? {
            None => Ok(Value::Empty),
            Some(page) => {
                let mut loaded = Context::new(&page);
                if let Some(fetcher) = ctx.fetcher() {
                    loaded = loaded.with_fetcher(fetcher.clone());
                }
                match self.selector.select(&loaded, "Async") {
                    Ok(value) => Ok(value.detach()),
                    Err(e) if e.is_missing() => match &self.default {
                        Some(value) => Ok(value.clone()),
                        None => Err(e),
                    },
                    Err(e) => Err(e),
                }
            }
        };
        trace_result(self.name(), &out);
        out
    }

    fn selector_mut(&mut self) -> Option<&mut Selector> {
        Some(&mut self.selector)
    }

    fn default_mut(&mut self) -> Option<&mut Option<Value<'static>>> {
        Some(&mut self.default)
    }
}

/// `Async::new(name, Selector::Current) & filter` reads `filter` on the
/// loaded page.
impl<R: Filter + 'static> BitAnd<R> for Async {
    type Output = Async;

    fn bitand(mut self, rhs: R) -> Async {
        self.selector = Selector::from(rhs);
        self
    }
}

impl<V: Into<Value<'static>>> BitOr<V> for Async {
    type Output = Async;

    fn bitor(mut self, default: V) -> Async {
        self.default = Some(default.into());
        self
    }
}

filter_ops!(AsyncLoad);

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;
    use crate::fetch::StaticFetcher;
    use crate::filters::{CleanText, Link};
    use crate::page::Page;

    fn page() -> Page {
        Page::html(r#"<a class="ok" href="/d/1">x</a><a class="empty" href="">y</a>"#)
            .with_url("https://bank.example/list".parse().unwrap())
    }

    fn fetcher() -> Arc<StaticFetcher> {
        Arc::new(
            StaticFetcher::new()
                .with_html("https://bank.example/d/1", "<h3> Savings </h3><p>ok</p>")
                .with_json("https://bank.example/api", r#"{"balance": "10.5"}"#),
        )
    }

    #[test]
    fn test_async_load_resolves_link() {
        let page = page();
        let ctx = Context::new(&page);
        let f = AsyncLoad::new(Link::new("a.ok"));
        assert_eq!(f.call(&ctx).unwrap(), Value::from("https://bank.example/d/1"));
        let f = AsyncLoad::new(Link::new("a.empty"));
        assert_eq!(f.call(&ctx).unwrap(), Value::Empty);
    }

    #[test]
    fn test_async_reads_loaded_page() {
        let page = page();
        let ctx = Context::new(&page).with_fetcher(fetcher());
        ctx.start_load("details", Some("https://bank.example/d/1")).unwrap();
        let f = Async::new("details", CleanText::new("h3"));
        assert_eq!(f.call(&ctx).unwrap(), Value::from("Savings"));
        let f = Async::new("details", Selector::Current) & CleanText::new("p");
        assert_eq!(f.call(&ctx).unwrap(), Value::from("ok"));
    }

    #[test]
    fn test_async_without_url_is_empty() {
        let page = page();
        let ctx = Context::new(&page).with_fetcher(fetcher());
        ctx.start_load("details", None).unwrap();
        let f = Async::new("details", CleanText::new("h3"));
        assert_eq!(f.call(&ctx).unwrap(), Value::Empty);
    }

    #[test]
    fn test_async_missing_data_and_unknown_load() {
        let page = page();
        let ctx = Context::new(&page).with_fetcher(fetcher());
        ctx.start_load("api", Some("https://bank.example/api")).unwrap();
        let f = Async::new("api", "missing");
        assert!(f.call(&ctx).unwrap_err().is_missing());
        let f = Async::new("api", "missing") | "none";
        assert_eq!(f.call(&ctx).unwrap(), Value::from("none"));
        let f = Async::new("other", "balance");
        assert!(matches!(f.call(&ctx), Err(Error::Load { .. })));
    }
}
