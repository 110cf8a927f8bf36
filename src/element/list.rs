use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use super::{Extract, FromRecord, ItemElement, Listing};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::filters::{Path, Selector};
use crate::url_utils;
use crate::value::Value;

/// Runs item elements on every node matched by an item path.
///
/// Without an item path, the current node itself is the only candidate. On
/// JSON pages, a path leading to an array iterates its elements and one
/// leading to an object iterates its values.
///
/// ```rust
/// use rs_sift::{Context, Extract, ItemElement, ListElement, Page, Record};
/// use rs_sift::filters::{AbsoluteLink, CleanText, Selector};
///
/// let page = Page::html(r#"<ul><li>a</li><li>b</li></ul><a class="next" href="?p=2">next</a>"#)
///     .with_url("https://example.com/list".parse()?);
/// let list = ListElement::new("li")
///     .item(ItemElement::<Record>::new().field("name", CleanText::new(Selector::Current)))
///     .next_page(AbsoluteLink::new("a.next"));
/// let listing = list.extract(&Context::new(&page))?;
/// assert_eq!(listing.items.len(), 2);
/// assert_eq!(listing.next_page.as_deref(), Some("https://example.com/list?p=2"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ListElement<T> {
    item_path: Option<Path>,
    items: Vec<ItemElement<T>>,
    ignore_duplicate: bool,
    flush_at_end: bool,
    next_page: Option<Selector>,
    args: Vec<(String, Value<'static>)>,
}

impl<T: FromRecord> ListElement<T> {
    /// List of the nodes matching `item_path`.
    pub fn new(item_path: impl Into<String>) -> Self {
        Self {
            item_path: Some(Path::new(item_path)),
            ..Self::root()
        }
    }

    /// List whose only candidate is the current node.
    #[must_use]
    pub fn root() -> Self {
        Self {
            item_path: None,
            items: Vec::new(),
            ignore_duplicate: false,
            flush_at_end: false,
            next_page: None,
            args: Vec::new(),
        }
    }

    /// Run `item` on every candidate. Several item elements run in
    /// declaration order.
    #[must_use]
    pub fn item(mut self, item: ItemElement<T>) -> Self {
        self.items.push(item);
        self
    }

    /// Log and drop objects whose id was already seen instead of failing.
    #[must_use]
    pub fn ignore_duplicate(mut self, ignore: bool) -> Self {
        self.ignore_duplicate = ignore;
        self
    }

    /// Yield nothing until every candidate of the page was built.
    #[must_use]
    pub fn flush_at_end(mut self, flush: bool) -> Self {
        self.flush_at_end = flush;
        self
    }

    /// Selector giving the URL of the next page.
    #[must_use]
    pub fn next_page(mut self, selector: impl Into<Selector>) -> Self {
        self.next_page = Some(selector.into());
        self
    }

    /// Env value visible to every item of the list.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value<'static>>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    fn candidates<'a>(&self, ctx: &Context<'a>) -> Result<Vec<Value<'a>>> {
        let Some(path) = &self.item_path else {
            return Ok(vec![ctx.node().clone()]);
        };
        let found = match path.query(ctx.node(), "ListElement") {
            Ok(found) => found,
            Err(e) if e.is_missing() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(match found {
            Value::Nodes(nodes) => nodes.into_iter().map(Value::node).collect(),
            Value::Json(Cow::Borrowed(json)) => match json {
                serde_json::Value::Array(items) => items.iter().map(Value::json).collect(),
                serde_json::Value::Object(map) => map.values().map(Value::json).collect(),
                other => vec![Value::json(other)],
            },
            Value::Json(Cow::Owned(json)) => match json {
                serde_json::Value::Array(items) => items.into_iter().map(Value::from).collect(),
                serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| Value::from(v)).collect(),
                other => vec![Value::from(other)],
            },
            Value::List(items) => items,
            other => vec![other],
        })
    }

    /// Iterate the objects of the page.
    ///
    /// Loaders of every candidate are started before the first object is
    /// built.
    pub fn iter<'e, 'a>(&'e self, ctx: &Context<'a>) -> Result<Items<'e, 'a, T>> {
        let mut scope = ctx.clone();
        for (name, value) in &self.args {
            scope.set_env(name.as_str(), value.clone());
        }
        let mut prepared = Vec::new();
        for node in self.candidates(&scope)? {
            for item in &self.items {
                prepared.push((item, item.prepare(&scope, node.clone())));
            }
        }
        tracing::debug!(candidates = prepared.len(), "list prepared");
        Ok(Items {
            list: self,
            pending: prepared.into_iter(),
            seen: HashSet::new(),
            flushed: None,
        })
    }

    /// URL of the next page, resolved against the page URL.
    ///
    /// Missing elements or attributes and empty values mean there is no next
    /// page.
    pub fn next_page_url(&self, ctx: &Context<'_>) -> Result<Option<String>> {
        let Some(selector) = &self.next_page else {
            return Ok(None);
        };
        let value = match selector.select(ctx, "next_page") {
            Ok(value) => value,
            Err(e) if e.is_missing() => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(value
            .to_text()
            .filter(|link| !link.trim().is_empty())
            .map(|link| url_utils::resolve(&link, ctx.url())))
    }

    fn store(&self, seen: &mut HashSet<String>, obj: T) -> Result<Option<T>> {
        let Some(id) = obj.id() else {
            return Ok(Some(obj));
        };
        if seen.insert(id.clone()) {
            return Ok(Some(obj));
        }
        if self.ignore_duplicate {
            tracing::warn!(id = %id, "there are two objects with the same id");
            Ok(None)
        } else {
            Err(Error::Data(format!("there are two objects with the same id: {id}")))
        }
    }
}

impl<T: FromRecord> Extract<T> for ListElement<T> {
    fn extract(&self, ctx: &Context<'_>) -> Result<Listing<T>> {
        let items = self.iter(ctx)?.collect::<Result<Vec<_>>>()?;
        let next_page = self.next_page_url(ctx)?;
        Ok(Listing { items, next_page })
    }
}

impl<T> fmt::Debug for ListElement<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListElement")
            .field("item_path", &self.item_path)
            .field("items", &self.items)
            .field("ignore_duplicate", &self.ignore_duplicate)
            .field("flush_at_end", &self.flush_at_end)
            .field("next_page", &self.next_page)
            .finish_non_exhaustive()
    }
}

/// Objects of a list, built lazily in document order.
///
/// Iteration stops after the first error.
pub struct Items<'e, 'a, T> {
    list: &'e ListElement<T>,
    pending: std::vec::IntoIter<(&'e ItemElement<T>, Context<'a>)>,
    seen: HashSet<String>,
    flushed: Option<std::vec::IntoIter<T>>,
}

impl<T: FromRecord> Items<'_, '_, T> {
    fn produce(&mut self) -> Option<Result<T>> {
        while let Some((item, ctx)) = self.pending.next() {
            let stored = item
                .complete(ctx)
                .and_then(|obj| match obj {
                    Some(obj) => self.list.store(&mut self.seen, obj),
                    None => Ok(None),
                });
            match stored {
                Ok(Some(obj)) => return Some(Ok(obj)),
                Ok(None) => {}
                Err(e) => {
                    self.pending = Vec::new().into_iter();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl<T: FromRecord> Iterator for Items<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if !self.list.flush_at_end {
            return self.produce();
        }
        if self.flushed.is_none() {
            let mut all = Vec::new();
            while let Some(next) = self.produce() {
                match next {
                    Ok(obj) => all.push(obj),
                    Err(e) => {
                        self.flushed = Some(Vec::new().into_iter());
                        return Some(Err(e));
                    }
                }
            }
            self.flushed = Some(all.into_iter());
        }
        self.flushed.as_mut().and_then(Iterator::next).map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Record;
    use crate::filters::{CleanText, Dict, Env, Link};
    use crate::page::Page;

    const BODY: &str = r#"
        <ul>
            <li><a href="/a/1">One</a></li>
            <li><a href="/a/2">Two</a></li>
            <li><a href="/a/1">One again</a></li>
        </ul>"#;

    fn link_list() -> ListElement<Record<'static>> {
        ListElement::new("li").item(
            ItemElement::new()
                .field("id", Link::new("a"))
                .field("label", CleanText::new("a")),
        )
    }

    #[test]
    fn test_duplicate_ids_fail_after_earlier_objects() {
        let page = Page::html(BODY);
        let ctx = Context::new(&page);
        let list = link_list();
        let mut items = list.iter(&ctx).unwrap();
        assert!(items.next().unwrap().is_ok());
        assert!(items.next().unwrap().is_ok());
        assert!(matches!(items.next(), Some(Err(Error::Data(_)))));
        assert!(items.next().is_none());
    }

    #[test]
    fn test_ignore_duplicate_drops_object() {
        let page = Page::html(BODY);
        let ctx = Context::new(&page);
        let listing = link_list().ignore_duplicate(true).extract(&ctx).unwrap();
        let labels: Vec<_> = listing.items.iter().map(|r| r.get("label").cloned()).collect();
        assert_eq!(labels, vec![Some(Value::from("One")), Some(Value::from("Two"))]);
        assert_eq!(listing.next_page, None);
    }

    #[test]
    fn test_flush_at_end_yields_nothing_on_error() {
        let page = Page::html(BODY);
        let ctx = Context::new(&page);
        let list = link_list().flush_at_end(true);
        let mut items = list.iter(&ctx).unwrap();
        assert!(matches!(items.next(), Some(Err(Error::Data(_)))));
        assert!(items.next().is_none());
    }

    #[test]
    fn test_flush_at_end_yields_all_in_order() {
        let page = Page::html(
            r#"<ul><li><a href="/a/1">One</a></li><li><a href="/a/2">Two</a></li><li><a href="/a/3">Three</a></li></ul>"#,
        );
        let ctx = Context::new(&page);
        let list = link_list().flush_at_end(true);
        let labels: Vec<_> = list
            .iter(&ctx)
            .unwrap()
            .map(|r| r.unwrap().get("label").cloned())
            .collect();
        assert_eq!(
            labels,
            vec![
                Some(Value::from("One")),
                Some(Value::from("Two")),
                Some(Value::from("Three"))
            ]
        );
    }

    #[test]
    fn test_json_list_and_args() {
        let page = Page::json(r#"{"ops": {"a": {"l": "x"}, "b": {"l": "y"}}}"#).unwrap();
        let ctx = Context::new(&page);
        let list = ListElement::new("ops")
            .arg("account", "main")
            .item(
                ItemElement::<Record>::new()
                    .field("label", Dict::new("l"))
                    .field("account", Env::new("account")),
            );
        let listing = list.extract(&ctx).unwrap();
        assert_eq!(listing.items.len(), 2);
        assert_eq!(listing.items[1].get("label"), Some(&Value::from("y")));
        assert_eq!(listing.items[0].get("account"), Some(&Value::from("main")));
    }

    #[test]
    fn test_missing_item_path_is_empty_list() {
        let page = Page::html(BODY);
        let ctx = Context::new(&page);
        let list = ListElement::new("tr").item(ItemElement::<Record>::new());
        assert!(list.extract(&ctx).unwrap().items.is_empty());
    }

    #[test]
    fn test_next_page_missing_or_empty() {
        let page = Page::html(r#"<a class="next" href="">x</a>"#);
        let ctx = Context::new(&page);
        let list = link_list().next_page(Link::new("a.next"));
        assert_eq!(list.next_page_url(&ctx).unwrap(), None);
        let list = link_list().next_page(Link::new("a.more"));
        assert_eq!(list.next_page_url(&ctx).unwrap(), None);
        let list = link_list().next_page(Selector::literal(Value::Empty));
        assert_eq!(list.next_page_url(&ctx).unwrap(), None);
    }
}
