//! URL filters.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

use super::{filter_ops, FilterBase, Selector, Transform};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::url_utils;
use crate::value::Value;

/// Value of a query-string parameter of the selected URL.
///
/// ```rust
/// use rs_sift::{Context, Page, Value};
/// use rs_sift::filters::{Filter, Link, QueryValue};
///
/// let page = Page::html(r#"<a href="http://example.org/view?id=1234">x</a>"#);
/// let ctx = Context::new(&page);
/// assert_eq!(QueryValue::new(Link::new("a"), "id").call(&ctx)?, Value::from("1234"));
/// # Ok::<(), rs_sift::Error>(())
/// ```
#[derive(Debug)]
pub struct QueryValue {
    base: FilterBase,
    key: String,
}

impl QueryValue {
    pub fn new(selector: impl Into<Selector>, key: impl Into<String>) -> Self {
        Self {
            base: FilterBase::new(selector),
            key: key.into(),
        }
    }
}

impl Transform for QueryValue {
    const NAME: &'static str = "QueryValue";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, _ctx: &Context<'a>) -> Result<Value<'a>> {
        let link = value.to_text().unwrap_or_default();
        let mut values = url_utils::query_values(&link, &self.key);
        match values.len() {
            0 => self.base.default_or_raise(Error::parse(
                Self::NAME,
                link,
                format!("key {} not found", self.key),
            )),
            1 => Ok(Value::Text(values.remove(0))),
            _ => Err(Error::parse(
                Self::NAME,
                link,
                format!("more than one value for key {}", self.key),
            )),
        }
    }
}

/// URL-decodes (`%XX` escapes) the selected text using the page encoding.
///
/// `+` is kept as is. Text that is not ASCII, or whose unquoted bytes are
/// not valid in the page encoding, is returned unchanged.
#[derive(Debug)]
pub struct Decode {
    base: FilterBase,
}

impl Decode {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            base: FilterBase::new(selector),
        }
    }
}

impl Transform for Decode {
    const NAME: &'static str = "Decode";

    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter<'a>(&self, value: Value<'a>, ctx: &Context<'a>) -> Result<Value<'a>> {
        let text = value.to_text().unwrap_or_default();
        if !text.is_ascii() {
            return Ok(Value::Text(text));
        }
        let bytes: Cow<'_, [u8]> = percent_decode_str(&text).into();
        let decoded = ctx
            .page()
            .encoding()
            .decode_without_bom_handling_and_without_replacement(&bytes)
            .map(Cow::into_owned);
        match decoded {
            Some(decoded) => Ok(Value::Text(decoded)),
            None => {
                tracing::debug!(text = %text, encoding = ctx.page().encoding().name(), "undecodable escapes");
                Ok(Value::Text(text))
            }
        }
    }
}

filter_ops!(QueryValue, Decode);
