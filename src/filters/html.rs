//! HTML-specific filters: raw selections, attributes, links and table cells.

use super::{filter_ops, trace_result, Filter, FilterBase, Selector, Transform};
use crate::context::Context;
use crate::dom::{self, NodeRef};
use crate::error::{Error, Result};
use crate::url_utils;
use crate::value::Value;

/// The selection itself, unchanged.
#[derive(Debug, Default)]
pub struct Css {
    base: FilterBase,
}

impl Css {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
        }
    }
}

impl Transform for Css {
    const NAME: &'static str = "Css";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        Ok(value)
    }
}

fn first_node<'a>(value: &Value<'a>) -> Option<NodeRef<'a>> {
    match value {
        Value::Nodes(nodes) => nodes.first().copied(),
        _ => None,
    }
}

fn read_attr(
    base: &FilterBase,
    value: &Value<'_>,
    attr: &str,
    filter: &'static str,
) -> Result<Option<String>> {
    let found = first_node(value).and_then(|node| dom::get_attribute(&node, attr));
    match found {
        Some(text) => Ok(Some(text)),
        None if base.default.is_some() => Ok(None),
        None => {
            tracing::warn!(filter, attr, "attribute not found on the selected element");
            Err(Error::AttributeNotFound {
                filter,
                attr: attr.to_string(),
            })
        }
    }
}

/// Attribute of the first selected element.
///
/// ```rust
/// use rs_sift::{Context, Page, Value};
/// use rs_sift::filters::{Attr, Filter};
///
/// let page = Page::html(r#"<img src="a.png" alt="Logo">"#);
/// let ctx = Context::new(&page);
/// assert_eq!(Attr::new("img", "alt").call(&ctx)?, Value::from("Logo"));
/// # Ok::<(), rs_sift::Error>(())
/// ```
#[derive(Debug)]
pub struct Attr {
    base: FilterBase,
    attr: String,
}

impl Attr {
    pub fn new(selector: impl Into<Selector>, attr: impl Into<String>) -> Self {
        Self {
            base: FilterBase::new(selector),
            attr: attr.into(),
        }
    }
}

impl Transform for Attr {
    const NAME: &'static str = "Attr";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        match read_attr(&self.base, &value, &self.attr, Self::NAME)? {
            Some(text) => Ok(Value::Text(text)),
            None => self.base.default_or_raise(Error::AttributeNotFound {
                filter: Self::NAME,
                attr: self.attr.clone(),
            }),
        }
    }
}

/// `href` of the first selected element, as written in the page.
#[derive(Debug)]
pub struct Link {
    base: FilterBase,
    attr: String,
}

impl Link {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
            attr: "href".to_string(),
        }
    }

    /// Read another attribute (`src`, `data-href` ...).
    #[must_use]
    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = attr.into();
        self
    }
}

impl Transform for Link {
    const NAME: &'static str = "Link";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        match read_attr(&self.base, &value, &self.attr, Self::NAME)? {
            Some(text) => Ok(Value::Text(text.trim().to_string())),
            None => self.base.default_or_raise(Error::AttributeNotFound {
                filter: Self::NAME,
                attr: self.attr.clone(),
            }),
        }
    }
}

/// Like [`Link`], resolved against the page URL.
///
/// ```rust
/// use rs_sift::{Context, Page, Value};
/// use rs_sift::filters::{AbsoluteLink, Filter};
///
/// let page = Page::html(r#"<a href="../next?p=2">next</a>"#)
///     .with_url("https://example.com/list/page".parse()?);
/// let ctx = Context::new(&page);
/// assert_eq!(
///     AbsoluteLink::new("a").call(&ctx)?,
///     Value::from("https://example.com/next?p=2")
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct AbsoluteLink {
    link: Link,
}

impl AbsoluteLink {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            link: Link::new(selector),
        }
    }

    #[must_use]
    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.link = self.link.attr(attr);
        self
    }
}

impl Transform for AbsoluteLink {
    const NAME: &'static str = "AbsoluteLink";

    fn base(&self) -> &FilterBase {
        &self.link.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.link.base
    }

    fn filter<'a>(&self, value: Value<'a>, ctx: &Context<'a>) -> Result<Value<'a>> {
        match self.link.filter(value, ctx)? {
            Value::Text(link) => Ok(Value::Text(url_utils::resolve(&link, ctx.url()))),
            other => Ok(other),
        }
    }
}

/// `yes` when the selector matches something, `no` otherwise.
#[derive(Debug)]
pub struct HasElement {
    selector: Selector,
    yes: Value<'static>,
    no: Value<'static>,
}

impl HasElement {
    /// Returns `true` / `false` by default.
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
            yes: Value::Bool(true),
            no: Value::Bool(false),
        }
    }

    #[must_use]
    pub fn values(mut self, yes: impl Into<Value<'static>>, no: impl Into<Value<'static>>) -> Self {
        self.yes = yes.into();
        self.no = no.into();
        self
    }
}

impl Filter for HasElement {
    fn name(&self) -> &'static str {
        "HasElement"
    }

    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
        let out = match self.selector.select(ctx, self.name()) {
            Ok(value) if !value.is_empty() => Ok(self.yes.clone()),
            Ok(_) => Ok(self.no.clone()),
            Err(e) if e.is_missing() => Ok(self.no.clone()),
            Err(e) => Err(e),
        };
        trace_result(self.name(), &out);
        out
    }

    fn selector_mut(&mut self) -> Option<&mut Selector> {
        Some(&mut self.selector)
    }
}

/// Cell of the current table row, by column name.
///
/// Only meaningful inside a `TableElement`: the column names are resolved
/// from the table head before the rows are iterated. The first name that
/// resolved wins.
#[derive(Debug)]
pub struct TableCell {
    names: Vec<String>,
    support_th: bool,
    default: Option<Value<'static>>,
}

impl TableCell {
    pub fn new(name: impl Into<String>) -> Self {
        Self::any([name])
    }

    /// Cell of the first resolved column among `names`.
    pub fn any<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            support_th: false,
            default: None,
        }
    }

    /// Count `<th>` cells of the row as well as `<td>` ones.
    #[must_use]
    pub fn support_th(mut self, support_th: bool) -> Self {
        self.support_th = support_th;
        self
    }

    fn cells<'a>(&self, row: &Value<'a>) -> Vec<NodeRef<'a>> {
        let Some(row) = first_node(row) else {
            return Vec::new();
        };
        dom::element_children(&row)
            .into_iter()
            .filter(|cell| match dom::tag_name(cell).as_deref() {
                Some("td") => true,
                Some("th") => self.support_th,
                _ => false,
            })
            .collect()
    }
}

impl Filter for TableCell {
    fn name(&self) -> &'static str {
        "TableCell"
    }

    fn call<'a>(&self, ctx: &Context<'a>) -> Result<Value<'a>> {
        let index = ctx
            .columns()
            .and_then(|columns| self.names.iter().find_map(|name| columns.get(name)));
        let out = match index {
            Some(index) => Ok(Value::Nodes(
                self.cells(ctx.node()).into_iter().skip(index).take(1).collect(),
            )),
            None => match &self.default {
                Some(value) => Ok(value.clone()),
                None => Err(Error::ColumnNotFound(self.names.join(" or "))),
            },
        };
        trace_result(self.name(), &out);
        out
    }

    fn default_mut(&mut self) -> Option<&mut Option<Value<'static>>> {
        Some(&mut self.default)
    }
}

filter_ops!(Css, Attr, Link, AbsoluteLink, HasElement, TableCell);
